//! A hierarchical filesystem over S3-compatible object stores.
//!
//! Object stores offer whole-object PUT and GET, ranged reads, prefix
//! listing, copy and delete. This crate builds files and directories on top
//! of that: seekable read handles, streamed write handles, directory markers,
//! paginated directory listing, recursive removal and copy-then-delete rename.
//!
//! # Architecture
//!
//! ```text
//! ObjectFs (FileSystem)  ---opens--->  ObjectFile (VirtualFile)
//!     |                                   |        |
//!     |                         DirectoryLister   UploadStream
//!     |                                   |        |  (background task)
//!     v                                   v        v
//!                  Arc<dyn ObjectStore> (bucketfs-core)
//! ```
//!
//! # Consistency
//!
//! Nothing here is transactional. `rename` and `remove_all` are sequences of
//! single-object calls and stop at the first failure, leaving whatever was
//! already changed. A write is only committed by
//! [`close`](VirtualFile::close); check its result.

mod error;
mod file;
mod fs;
mod lister;
mod options;
mod pipe;
mod traits;

pub use bucketfs_core::{
    CannedAcl, FileInfo, FsConfig, ObjectKey, ObjectStore, StoreError, UploadProperties,
};
pub use error::{FsError, FsResult};
pub use file::ObjectFile;
pub use fs::ObjectFs;
pub use options::{OpenOptions, SeekFrom};
pub use traits::{FileSystem, VirtualFile};
