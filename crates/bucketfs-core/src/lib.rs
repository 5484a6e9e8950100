//! Core types, path normalization, and the object store contract for bucketfs.
//!
//! This crate provides the vocabulary shared by the filesystem facade and by
//! every object store backend: canonical object keys, file metadata, upload
//! properties, configuration, and the [`ObjectStore`] trait that backends
//! implement.
//!
//! # Architecture
//!
//! ```text
//! bucketfs (ObjectFs / ObjectFile)
//!        |
//!        v
//!   ObjectStore trait (this crate)
//!        |
//!        +--> MemoryStore (bucketfs-memory)
//!        +--> S3Store     (bucketfs-s3)
//! ```

mod config;
mod error;
pub mod path;
pub mod store;
mod types;

pub use config::FsConfig;
pub use error::{StoreError, StoreResult};
pub use path::{ObjectKey, PathNormalizer};
pub use store::{
    ByteRange, ListPage, ListRequest, ObjectMeta, ObjectReader, ObjectStore, UploadOptions,
};
pub use types::{CannedAcl, FileInfo, ObjectProperties, ParseCannedAclError, UploadProperties};
