//! In-memory [`ObjectStore`](bucketfs_core::ObjectStore) backend.
//!
//! [`MemoryStore`] keeps every bucket as a sorted key space and mirrors the S3
//! behaviors the filesystem facade relies on: inclusive range reads,
//! delimiter listing with opaque continuation tokens, sequential multipart
//! uploads, canned ACLs and idempotent deletes.
//!
//! It also supports fault injection ([`MemoryStore::fail_operation`]) and
//! call counting ([`MemoryStore::call_count`]) so failure paths can be tested
//! without a live endpoint.

mod checksums;
mod fault;
mod list;
mod store;

pub use fault::{InjectedFailure, StoreOperation};
pub use store::MemoryStore;
