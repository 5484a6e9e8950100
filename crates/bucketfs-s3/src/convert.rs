//! Conversions between SDK types and bucketfs types.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::DateTime as SmithyDateTime;
use aws_sdk_s3::types::ObjectCannedAcl;
use bucketfs_core::{CannedAcl, StoreError};
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left unescaped in an `x-amz-copy-source` value.
const COPY_SOURCE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the `x-amz-copy-source` value for `key` in `bucket`.
pub(crate) fn copy_source(bucket: &str, key: &str) -> String {
    format!("{bucket}/{}", utf8_percent_encode(key, COPY_SOURCE))
}

/// Convert an SDK timestamp.
pub(crate) fn to_chrono(time: Option<&SmithyDateTime>) -> DateTime<Utc> {
    time.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Convert a canned ACL.
pub(crate) fn to_object_acl(acl: CannedAcl) -> ObjectCannedAcl {
    ObjectCannedAcl::from(acl.as_str())
}

/// Convert a byte count reported by the SDK.
pub(crate) fn to_size(size: Option<i64>) -> u64 {
    size.and_then(|s| u64::try_from(s).ok()).unwrap_or(0)
}

/// Map an SDK failure onto [`StoreError`].
///
/// Missing keys (`NoSuchKey`, or a bare 404 on HEAD) become
/// [`StoreError::NotFound`] and a missing bucket [`StoreError::NoSuchBucket`].
pub(crate) fn map_sdk_error<E>(
    operation: &'static str,
    bucket: &str,
    key: &str,
    err: SdkError<E, HttpResponse>,
) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match err.code() {
        Some("NoSuchKey" | "NotFound") => {
            return StoreError::NotFound {
                key: key.to_owned(),
            };
        }
        Some("NoSuchBucket") => {
            return StoreError::NoSuchBucket {
                bucket: bucket.to_owned(),
            };
        }
        _ => {}
    }

    let status = err.raw_response().map(|r| r.status().as_u16());
    if status == Some(404) && matches!(err, SdkError::ServiceError(_)) {
        return StoreError::NotFound {
            key: key.to_owned(),
        };
    }

    StoreError::backend(operation, err)
}

#[cfg(test)]
mod tests {
    use std::io;

    use aws_sdk_s3::operation::head_object::HeadObjectError;

    use super::*;

    #[test]
    fn test_should_percent_encode_copy_source() {
        assert_eq!(copy_source("b", "dir1/file 1.txt"), "b/dir1/file%201.txt");
        assert_eq!(copy_source("b", "a+b/ü~x"), "b/a%2Bb/%C3%BC~x");
    }

    #[test]
    fn test_should_convert_timestamps() {
        let t = SmithyDateTime::from_secs_and_nanos(1_700_000_000, 5);
        let converted = to_chrono(Some(&t));
        assert_eq!(converted.timestamp(), 1_700_000_000);
        assert_eq!(converted.timestamp_subsec_nanos(), 5);
        assert_eq!(to_chrono(None), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_should_convert_sizes_and_acls() {
        assert_eq!(to_size(Some(42)), 42);
        assert_eq!(to_size(Some(-1)), 0);
        assert_eq!(to_size(None), 0);
        assert_eq!(
            to_object_acl(CannedAcl::PublicReadWrite),
            ObjectCannedAcl::PublicReadWrite
        );
    }

    #[test]
    fn test_should_wrap_transport_errors() {
        let err: SdkError<HeadObjectError, HttpResponse> = SdkError::construction_failure(
            io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
        );
        let mapped = map_sdk_error("HeadObject", "b", "k", err);
        assert!(matches!(
            mapped,
            StoreError::Backend {
                operation: "HeadObject",
                ..
            }
        ));
    }
}
