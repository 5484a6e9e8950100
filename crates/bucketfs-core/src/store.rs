//! The object store contract consumed by the filesystem facade.
//!
//! A backend only needs whole-object PUT, streamed upload, ranged GET, HEAD,
//! delimiter listing, COPY, DELETE and ACL updates. Everything that looks like
//! a directory is derived from these by the `bucketfs` crate.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::types::{CannedAcl, ObjectProperties};

/// Streaming body used for downloads and uploads.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send + Sync>>;

/// Initial delay between existence polls.
const WAIT_INITIAL_DELAY: Duration = Duration::from_millis(50);
/// Upper bound for the delay between existence polls.
const WAIT_MAX_DELAY: Duration = Duration::from_secs(2);

/// An inclusive byte range, as in an HTTP `Range: bytes=start-end` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte (inclusive).
    pub start: u64,
    /// Last byte (inclusive).
    pub end: u64,
}

impl ByteRange {
    /// Create a range covering `start..=end`.
    #[must_use]
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start) + 1
    }

    /// Always `false`: an inclusive range covers at least one byte.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Render as a `Range` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Metadata returned by HEAD and LIST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Full object key.
    pub key: String,
    /// Content length in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Entity tag, when the backend reports one.
    pub etag: Option<String>,
    /// `Content-Type`, when the backend reports one.
    pub content_type: Option<String>,
    /// `Cache-Control`, when the backend reports one.
    pub cache_control: Option<String>,
}

/// One paginated LIST request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Only keys starting with this prefix are returned.
    pub prefix: String,
    /// Keys containing the delimiter after the prefix are rolled up into
    /// common prefixes.
    pub delimiter: Option<String>,
    /// Opaque token from a previous page.
    pub continuation_token: Option<String>,
    /// Maximum number of keys plus common prefixes in the page.
    pub max_keys: usize,
}

impl ListRequest {
    /// List the immediate children of `prefix`, `max_keys` at a time.
    #[must_use]
    pub fn children(prefix: impl Into<String>, max_keys: usize) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: Some("/".to_owned()),
            continuation_token: None,
            max_keys,
        }
    }
}

/// One page of LIST results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Rolled-up prefixes, each ending with the delimiter.
    pub common_prefixes: Vec<String>,
    /// Objects directly under the prefix.
    pub objects: Vec<ObjectMeta>,
    /// Token for the next page, if any.
    pub next_continuation_token: Option<String>,
    /// Whether more results are available.
    pub is_truncated: bool,
}

/// Options for a streamed upload.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Properties stamped on the object.
    pub properties: ObjectProperties,
    /// Size of each uploaded part in bytes.
    pub part_size: usize,
    /// Number of parts uploaded concurrently.
    pub concurrency: usize,
}

/// A remote object store holding buckets of flat keys.
///
/// Implementations must be cheap to share (`Arc<dyn ObjectStore>`). `delete`
/// of a missing key succeeds.
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Short name of the backend (`"s3"`, `"memory"`).
    fn scheme(&self) -> &'static str;

    /// Fetch object metadata. A missing key is [`StoreError::NotFound`].
    async fn head(&self, bucket: &str, key: &str) -> StoreResult<ObjectMeta>;

    /// Open a download stream, optionally restricted to `range`.
    async fn get(
        &self,
        bucket: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> StoreResult<ObjectReader>;

    /// Store `body` as the whole content of `key`.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        properties: &ObjectProperties,
    ) -> StoreResult<()>;

    /// Stream `body` to `key` until it reports end of data.
    ///
    /// An error from `body` must abort the upload without creating the object.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectReader,
        options: &UploadOptions,
    ) -> StoreResult<()>;

    /// Fetch one page of keys.
    async fn list(&self, bucket: &str, request: &ListRequest) -> StoreResult<ListPage>;

    /// Server-side copy of `src` onto `dst` within `bucket`.
    async fn copy(&self, bucket: &str, src: &str, dst: &str) -> StoreResult<()>;

    /// Delete `key`.
    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<()>;

    /// Replace the ACL of `key`.
    async fn set_acl(&self, bucket: &str, key: &str, acl: CannedAcl) -> StoreResult<()>;

    /// Poll [`head`](Self::head) until `key` is visible or `timeout` elapses.
    async fn wait_until_exists(
        &self,
        bucket: &str,
        key: &str,
        timeout: Duration,
    ) -> StoreResult<ObjectMeta> {
        let started = Instant::now();
        let mut delay = WAIT_INITIAL_DELAY;

        loop {
            match self.head(bucket, key).await {
                Ok(meta) => return Ok(meta),
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(StoreError::Timeout {
                    key: key.to_owned(),
                    waited,
                });
            }

            trace!(bucket, key, ?delay, "object not visible yet");
            tokio::time::sleep(delay.min(timeout - waited)).await;
            delay = (delay * 2).min(WAIT_MAX_DELAY);
        }
    }
}

/// Read up to `size` bytes, stopping early only at end of stream.
///
/// An empty result means the stream is exhausted.
///
/// # Examples
///
/// ```
/// use bucketfs_core::ObjectReader;
/// use bucketfs_core::store::read_chunk;
///
/// tokio_test::block_on(async {
///     let mut reader: ObjectReader = Box::pin(&b"hello world"[..]);
///     let chunk = read_chunk(&mut reader, 5).await.unwrap();
///     assert_eq!(&chunk[..], b"hello");
///     let rest = read_chunk(&mut reader, 100).await.unwrap();
///     assert_eq!(&rest[..], b" world");
///     assert!(read_chunk(&mut reader, 100).await.unwrap().is_empty());
/// });
/// ```
pub async fn read_chunk(reader: &mut ObjectReader, size: usize) -> std::io::Result<Bytes> {
    let mut buf = BytesMut::zeroed(size);
    let mut filled = 0;
    while filled < size {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf.freeze())
}
