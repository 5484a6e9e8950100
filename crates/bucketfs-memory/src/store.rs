//! The in-memory object store.

use std::collections::BTreeMap;
use std::io::Cursor;

use async_trait::async_trait;
use bucketfs_core::store::read_chunk;
use bucketfs_core::{
    ByteRange, CannedAcl, ListPage, ListRequest, ObjectMeta, ObjectProperties, ObjectReader,
    ObjectStore, StoreError, StoreResult, UploadOptions,
};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::checksums;
use crate::fault::{Faults, StoreOperation};
use crate::list::list_from_btree;

/// Fallback part size when an upload asks for zero-sized parts.
const DEFAULT_PART_SIZE: usize = 5 * 1024 * 1024;

// ---------------------------------------------------------------------------
// StoredObject
// ---------------------------------------------------------------------------

/// One object body with its metadata.
#[derive(Debug, Clone)]
pub(crate) struct StoredObject {
    data: Bytes,
    etag: String,
    last_modified: DateTime<Utc>,
    properties: ObjectProperties,
}

impl StoredObject {
    pub(crate) fn new(data: Bytes, properties: ObjectProperties) -> Self {
        let etag = checksums::compute_etag(&data);
        Self::with_etag(data, etag, properties)
    }

    fn with_etag(data: Bytes, etag: String, properties: ObjectProperties) -> Self {
        Self {
            data,
            etag,
            last_modified: Utc::now(),
            properties,
        }
    }

    pub(crate) fn meta(&self, key: &str) -> ObjectMeta {
        ObjectMeta {
            key: key.to_owned(),
            size: self.data.len() as u64,
            last_modified: self.last_modified,
            etag: Some(self.etag.clone()),
            content_type: Some(self.properties.content_type.clone()),
            cache_control: self.properties.cache_control.clone(),
        }
    }
}

/// Sorted key space of one bucket.
type Bucket = RwLock<BTreeMap<String, StoredObject>>;

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Thread-safe in-memory object store.
///
/// Buckets must be created with [`create_bucket`](Self::create_bucket) before
/// use; any operation on an unknown bucket fails with
/// [`StoreError::NoSuchBucket`].
///
/// # Examples
///
/// ```
/// use bucketfs_core::{ObjectProperties, ObjectStore};
/// use bucketfs_memory::MemoryStore;
/// use bytes::Bytes;
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// store.create_bucket("media");
/// store
///     .put("media", "hello.txt", Bytes::from("hello"), &ObjectProperties::default())
///     .await
///     .unwrap();
///
/// let meta = store.head("media", "hello.txt").await.unwrap();
/// assert_eq!(meta.size, 5);
/// assert_eq!(store.object_count("media"), 1);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: DashMap<String, Bucket>,
    faults: Faults,
}

impl MemoryStore {
    /// Create an empty store without buckets.
    #[must_use]
    pub fn new() -> Self {
        debug!("creating MemoryStore");
        Self::default()
    }

    /// Create `bucket` if it does not exist yet.
    pub fn create_bucket(&self, bucket: &str) {
        self.buckets
            .entry(bucket.to_owned())
            .or_insert_with(|| RwLock::new(BTreeMap::new()));
    }

    /// Number of objects stored in `bucket` (0 for an unknown bucket).
    #[must_use]
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets.get(bucket).map_or(0, |b| b.read().len())
    }

    /// All keys in `bucket`, sorted.
    #[must_use]
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .get(bucket)
            .map(|b| b.read().keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Properties stamped on `key`, if it exists.
    #[must_use]
    pub fn object_properties(&self, bucket: &str, key: &str) -> Option<ObjectProperties> {
        self.buckets
            .get(bucket)
            .and_then(|b| b.read().get(key).map(|o| o.properties.clone()))
    }

    /// Make every later call to `op` fail with `message` until
    /// [`clear_failures`](Self::clear_failures).
    pub fn fail_operation(&self, op: StoreOperation, message: impl Into<String>) {
        self.faults.arm(op, message.into());
    }

    /// Disarm all injected failures.
    pub fn clear_failures(&self) {
        self.faults.clear();
    }

    /// How many times `op` has been called.
    #[must_use]
    pub fn call_count(&self, op: StoreOperation) -> usize {
        self.faults.calls(op)
    }

    /// Run `f` against the key space of `bucket`.
    fn with_bucket<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&Bucket) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket {
                bucket: bucket.to_owned(),
            })?;
        f(entry.value())
    }

    fn insert(&self, bucket: &str, key: &str, object: StoredObject) -> StoreResult<()> {
        self.with_bucket(bucket, |objects| {
            trace!(bucket, key, size = object.data.len(), "stored object");
            objects.write().insert(key.to_owned(), object);
            Ok(())
        })
    }

    fn not_found(key: &str) -> StoreError {
        StoreError::NotFound {
            key: key.to_owned(),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn scheme(&self) -> &'static str {
        "memory"
    }

    async fn head(&self, bucket: &str, key: &str) -> StoreResult<ObjectMeta> {
        self.faults.enter(StoreOperation::Head)?;
        self.with_bucket(bucket, |objects| {
            objects
                .read()
                .get(key)
                .map(|o| o.meta(key))
                .ok_or_else(|| Self::not_found(key))
        })
    }

    async fn get(
        &self,
        bucket: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> StoreResult<ObjectReader> {
        self.faults.enter(StoreOperation::Get)?;
        let data = self.with_bucket(bucket, |objects| {
            objects
                .read()
                .get(key)
                .map(|o| o.data.clone())
                .ok_or_else(|| Self::not_found(key))
        })?;

        let body = match range {
            Some(range) => {
                let len = data.len() as u64;
                if range.start >= len || range.start > range.end {
                    return Err(StoreError::InvalidRange {
                        key: key.to_owned(),
                        start: range.start,
                        end: range.end,
                    });
                }
                let end = range.end.min(len - 1);
                trace!(bucket, key, start = range.start, end, "serving range");
                let start = usize::try_from(range.start).unwrap_or(usize::MAX);
                let end = usize::try_from(end).unwrap_or(usize::MAX);
                data.slice(start..=end)
            }
            None => data,
        };

        Ok(Box::pin(Cursor::new(body)))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        properties: &ObjectProperties,
    ) -> StoreResult<()> {
        self.faults.enter(StoreOperation::Put)?;
        self.insert(bucket, key, StoredObject::new(body, properties.clone()))
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        mut body: ObjectReader,
        options: &UploadOptions,
    ) -> StoreResult<()> {
        self.faults.enter(StoreOperation::Upload)?;
        self.with_bucket(bucket, |_| Ok(()))?;

        let upload_id = Uuid::new_v4().to_string();
        let part_size = if options.part_size == 0 {
            DEFAULT_PART_SIZE
        } else {
            options.part_size
        };
        debug!(bucket, key, %upload_id, part_size, "starting multipart upload");

        let mut combined = BytesMut::new();
        let mut part_md5_hexes = Vec::new();
        loop {
            let part = read_chunk(&mut body, part_size).await?;
            if part.is_empty() {
                break;
            }
            trace!(
                %upload_id,
                part_number = part_md5_hexes.len() + 1,
                size = part.len(),
                "stored part"
            );
            part_md5_hexes.push(checksums::compute_md5(&part));
            combined.extend_from_slice(&part);
        }

        let data = combined.freeze();
        let etag = if part_md5_hexes.len() > 1 {
            checksums::compute_multipart_etag(&part_md5_hexes)
        } else {
            checksums::compute_etag(&data)
        };
        debug!(
            bucket,
            key,
            %upload_id,
            size = data.len(),
            parts = part_md5_hexes.len(),
            "completed multipart upload"
        );
        self.insert(
            bucket,
            key,
            StoredObject::with_etag(data, etag, options.properties.clone()),
        )
    }

    async fn list(&self, bucket: &str, request: &ListRequest) -> StoreResult<ListPage> {
        self.faults.enter(StoreOperation::List)?;
        self.with_bucket(bucket, |objects| list_from_btree(&objects.read(), request))
    }

    async fn copy(&self, bucket: &str, src: &str, dst: &str) -> StoreResult<()> {
        self.faults.enter(StoreOperation::Copy)?;
        self.with_bucket(bucket, |objects| {
            let mut objects = objects.write();
            let source = objects.get(src).ok_or_else(|| Self::not_found(src))?;
            let copied = StoredObject::with_etag(
                source.data.clone(),
                source.etag.clone(),
                source.properties.clone(),
            );
            debug!(bucket, src, dst, size = copied.data.len(), "copying object");
            objects.insert(dst.to_owned(), copied);
            Ok(())
        })
    }

    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.faults.enter(StoreOperation::Delete)?;
        self.with_bucket(bucket, |objects| {
            if objects.write().remove(key).is_some() {
                trace!(bucket, key, "deleted object");
            }
            Ok(())
        })
    }

    async fn set_acl(&self, bucket: &str, key: &str, acl: CannedAcl) -> StoreResult<()> {
        self.faults.enter(StoreOperation::SetAcl)?;
        self.with_bucket(bucket, |objects| {
            let mut objects = objects.write();
            let object = objects.get_mut(key).ok_or_else(|| Self::not_found(key))?;
            object.properties.acl = acl;
            Ok(())
        })
    }
}
