//! Filesystem error types.

use std::io;

use bucketfs_core::StoreError;

/// Error returned by filesystem and file handle operations.
///
/// Path-level failures carry the operation name, the path as given by the
/// caller, and the backend cause.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FsError {
    /// The path does not exist: no object and no children under it.
    #[error("{op} {path}: file does not exist")]
    NotExist {
        /// Operation that failed (e.g. `"stat"`).
        op: &'static str,
        /// Path as given by the caller.
        path: String,
    },

    /// The backend failed while operating on a path.
    #[error("{op} {path}: {source}")]
    Path {
        /// Operation that failed.
        op: &'static str,
        /// Path as given by the caller.
        path: String,
        /// Backend cause.
        #[source]
        source: StoreError,
    },

    /// The object store cannot express the requested operation.
    #[error("{op}: operation not supported")]
    NotSupported {
        /// Operation that was rejected.
        op: &'static str,
    },

    /// The handle already has an open stream.
    #[error("stream already opened")]
    AlreadyOpened,

    /// A seek would move before the start of the file.
    #[error("invalid seek: resulting offset {offset} is negative")]
    InvalidSeek {
        /// The computed offset.
        offset: i64,
    },

    /// The handle was closed.
    #[error("file already closed")]
    Closed,

    /// A byte stream was requested on a directory handle.
    #[error("{path}: is a directory")]
    IsDirectory {
        /// Path as given by the caller.
        path: String,
    },

    /// The background upload of a write handle failed.
    #[error("upload of {key} failed: {source}")]
    Upload {
        /// Object key being written.
        key: String,
        /// Backend cause.
        #[source]
        source: StoreError,
    },
}

impl FsError {
    /// Wrap a backend error for `op` on `path`. A missing key becomes
    /// [`FsError::NotExist`].
    pub(crate) fn from_store(op: &'static str, path: &str, source: StoreError) -> Self {
        if source.is_not_found() {
            Self::NotExist {
                op,
                path: path.to_owned(),
            }
        } else {
            Self::Path {
                op,
                path: path.to_owned(),
                source,
            }
        }
    }

    /// Whether the path does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotExist { .. })
    }

    /// Whether the operation is unsupported by the object store.
    #[must_use]
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported { .. })
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        let kind = match &err {
            FsError::NotExist { .. } => io::ErrorKind::NotFound,
            FsError::NotSupported { .. } => io::ErrorKind::Unsupported,
            FsError::InvalidSeek { .. } => io::ErrorKind::InvalidInput,
            FsError::IsDirectory { .. } => io::ErrorKind::IsADirectory,
            FsError::AlreadyOpened | FsError::Closed => io::ErrorKind::Other,
            FsError::Path { source, .. } | FsError::Upload { source, .. } => match source {
                StoreError::Io { kind, .. } => *kind,
                StoreError::Timeout { .. } => io::ErrorKind::TimedOut,
                _ => io::ErrorKind::Other,
            },
        };
        io::Error::new(kind, err)
    }
}

/// Convenience result type for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;
