//! Amazon S3 backend for bucketfs.
//!
//! [`S3Store`] implements [`ObjectStore`](bucketfs_core::ObjectStore) on top
//! of `aws-sdk-s3`. Any S3-compatible endpoint works; point
//! [`S3StoreConfig::endpoint_url`] at it and enable path-style addressing when
//! the endpoint does not support virtual hosts.
//!
//! ```no_run
//! use bucketfs_s3::{S3Store, S3StoreConfig};
//!
//! # async fn run() {
//! let config = S3StoreConfig::builder()
//!     .endpoint_url("http://localhost:4566")
//!     .force_path_style(true)
//!     .build();
//! let store = S3Store::connect(&config).await;
//! # let _ = store;
//! # }
//! ```

mod config;
mod convert;
mod store;
mod upload;

pub use config::S3StoreConfig;
pub use store::S3Store;
