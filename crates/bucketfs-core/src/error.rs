//! Error types reported by object store backends.

use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Error returned by an [`ObjectStore`](crate::ObjectStore) backend.
///
/// The type is `Clone` so a single upload failure can be reported both by the
/// `write` call that observes it and by the `close` that follows.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The bucket does not exist.
    #[error("The specified bucket does not exist: {bucket}")]
    NoSuchBucket {
        /// The bucket name that was not found.
        bucket: String,
    },

    /// The key does not exist.
    #[error("The specified key does not exist: {key}")]
    NotFound {
        /// The key that was not found.
        key: String,
    },

    /// The requested byte range cannot be served.
    #[error("The requested range is not satisfiable: {key} bytes={start}-{end}")]
    InvalidRange {
        /// The key that was read.
        key: String,
        /// First requested byte.
        start: u64,
        /// Last requested byte (inclusive).
        end: u64,
    },

    /// An argument (continuation token, part size, ...) is invalid.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// The object did not become visible within the allotted time.
    #[error("timed out after {waited:?} waiting for {key} to exist")]
    Timeout {
        /// The key being waited on.
        key: String,
        /// How long the caller waited.
        waited: Duration,
    },

    /// Local I/O failure, typically while reading an upload body.
    #[error("I/O error ({kind:?}): {message}")]
    Io {
        /// The I/O error kind.
        kind: io::ErrorKind,
        /// The rendered I/O error.
        message: String,
    },

    /// Transport or service failure reported by the backend client.
    #[error("{operation} failed: {source}")]
    Backend {
        /// The backend operation that failed (e.g. `"PutObject"`).
        operation: &'static str,
        /// The underlying client error.
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Wrap a backend client error.
    pub fn backend(
        operation: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            operation,
            source: Arc::new(source),
        }
    }

    /// Whether this error means the key (not the bucket) is missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Convenience result type for object store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_classify_not_found() {
        let err = StoreError::NotFound {
            key: "a/b".to_owned(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "The specified key does not exist: a/b");

        let err = StoreError::NoSuchBucket {
            bucket: "b".to_owned(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_should_keep_backend_source() {
        let io = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let err = StoreError::backend("HeadObject", io);
        assert_eq!(err.to_string(), "HeadObject failed: connection refused");
        assert!(std::error::Error::source(&err).is_some());

        let cloned = err.clone();
        assert_eq!(cloned.to_string(), err.to_string());
    }

    #[test]
    fn test_should_convert_io_error() {
        let err: StoreError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert!(matches!(
            err,
            StoreError::Io {
                kind: io::ErrorKind::BrokenPipe,
                ..
            }
        ));
    }
}
