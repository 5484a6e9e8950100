//! Fault injection and call accounting.

use std::fmt;

use bucketfs_core::StoreError;
use dashmap::DashMap;

/// An [`ObjectStore`](bucketfs_core::ObjectStore) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `head`
    Head,
    /// `get`
    Get,
    /// `put`
    Put,
    /// `upload`
    Upload,
    /// `list`
    List,
    /// `copy`
    Copy,
    /// `delete`
    Delete,
    /// `set_acl`
    SetAcl,
}

impl StoreOperation {
    /// The S3 API name of the operation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "HeadObject",
            Self::Get => "GetObject",
            Self::Put => "PutObject",
            Self::Upload => "MultipartUpload",
            Self::List => "ListObjectsV2",
            Self::Copy => "CopyObject",
            Self::Delete => "DeleteObject",
            Self::SetAcl => "PutObjectAcl",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error carried by an injected [`StoreError::Backend`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("injected failure: {message}")]
pub struct InjectedFailure {
    /// Message supplied to [`MemoryStore::fail_operation`](crate::MemoryStore::fail_operation).
    pub message: String,
}

/// Armed failures and per-operation call counters.
#[derive(Debug, Default)]
pub(crate) struct Faults {
    armed: DashMap<StoreOperation, String>,
    calls: DashMap<StoreOperation, usize>,
}

impl Faults {
    pub(crate) fn arm(&self, op: StoreOperation, message: String) {
        self.armed.insert(op, message);
    }

    pub(crate) fn clear(&self) {
        self.armed.clear();
    }

    pub(crate) fn calls(&self, op: StoreOperation) -> usize {
        self.calls.get(&op).map_or(0, |c| *c)
    }

    /// Record a call to `op` and fail it if a failure is armed.
    pub(crate) fn enter(&self, op: StoreOperation) -> Result<(), StoreError> {
        *self.calls.entry(op).or_insert(0) += 1;
        match self.armed.get(&op) {
            Some(message) => Err(StoreError::backend(
                op.as_str(),
                InjectedFailure {
                    message: message.clone(),
                },
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_fail_armed_operation_until_cleared() {
        let faults = Faults::default();
        assert!(faults.enter(StoreOperation::Copy).is_ok());

        faults.arm(StoreOperation::Copy, "boom".to_owned());
        let err = faults.enter(StoreOperation::Copy).unwrap_err();
        assert_eq!(err.to_string(), "CopyObject failed: injected failure: boom");
        assert!(faults.enter(StoreOperation::Delete).is_ok());

        faults.clear();
        assert!(faults.enter(StoreOperation::Copy).is_ok());
        assert_eq!(faults.calls(StoreOperation::Copy), 3);
        assert_eq!(faults.calls(StoreOperation::Head), 0);
    }
}
