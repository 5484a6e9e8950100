//! [`ObjectStore`] over `aws-sdk-s3`.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use bucketfs_core::{
    ByteRange, CannedAcl, ListPage, ListRequest, ObjectMeta, ObjectProperties, ObjectReader,
    ObjectStore, StoreResult, UploadOptions,
};
use bytes::Bytes;
use tracing::{debug, trace};

use crate::config::S3StoreConfig;
use crate::convert::{copy_source, map_sdk_error, to_chrono, to_object_acl, to_size};
use crate::upload::MultipartUpload;

/// Object store backed by Amazon S3 or any S3-compatible service.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build a client from `config` and the default AWS credential chain.
    pub async fn connect(config: &S3StoreConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        debug!(
            region = %config.region,
            endpoint = ?config.endpoint_url,
            force_path_style = config.force_path_style,
            "creating S3Store"
        );
        Self::from_client(Client::from_conf(builder.build()))
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// The underlying SDK client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn scheme(&self) -> &'static str {
        "s3"
    }

    async fn head(&self, bucket: &str, key: &str) -> StoreResult<ObjectMeta> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error("HeadObject", bucket, key, e))?;

        Ok(ObjectMeta {
            key: key.to_owned(),
            size: to_size(output.content_length()),
            last_modified: to_chrono(output.last_modified()),
            etag: output.e_tag().map(ToOwned::to_owned),
            content_type: output.content_type().map(ToOwned::to_owned),
            cache_control: output.cache_control().map(ToOwned::to_owned),
        })
    }

    async fn get(
        &self,
        bucket: &str,
        key: &str,
        range: Option<ByteRange>,
    ) -> StoreResult<ObjectReader> {
        let range = range.map(|r| r.header_value());
        trace!(bucket, key, range = ?range, "GetObject");
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .set_range(range)
            .send()
            .await
            .map_err(|e| map_sdk_error("GetObject", bucket, key, e))?;

        Ok(Box::pin(output.body.into_async_read()))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        properties: &ObjectProperties,
    ) -> StoreResult<()> {
        trace!(bucket, key, size = body.len(), "PutObject");
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .acl(to_object_acl(properties.acl))
            .content_type(&properties.content_type)
            .set_cache_control(properties.cache_control.clone())
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| map_sdk_error("PutObject", bucket, key, e))?;
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectReader,
        options: &UploadOptions,
    ) -> StoreResult<()> {
        MultipartUpload::new(&self.client, bucket, key, options)
            .run(body)
            .await
    }

    async fn list(&self, bucket: &str, request: &ListRequest) -> StoreResult<ListPage> {
        let max_keys = i32::try_from(request.max_keys).unwrap_or(i32::MAX);
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(&request.prefix)
            .set_delimiter(request.delimiter.clone())
            .set_continuation_token(request.continuation_token.clone())
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| map_sdk_error("ListObjectsV2", bucket, &request.prefix, e))?;

        let common_prefixes = output
            .common_prefixes()
            .iter()
            .filter_map(|cp| cp.prefix().map(ToOwned::to_owned))
            .collect();
        let objects = output
            .contents()
            .iter()
            .filter_map(|obj| {
                obj.key().map(|key| ObjectMeta {
                    key: key.to_owned(),
                    size: to_size(obj.size()),
                    last_modified: to_chrono(obj.last_modified()),
                    etag: obj.e_tag().map(ToOwned::to_owned),
                    content_type: None,
                    cache_control: None,
                })
            })
            .collect();

        Ok(ListPage {
            common_prefixes,
            objects,
            next_continuation_token: output.next_continuation_token().map(ToOwned::to_owned),
            is_truncated: output.is_truncated().unwrap_or(false),
        })
    }

    async fn copy(&self, bucket: &str, src: &str, dst: &str) -> StoreResult<()> {
        debug!(bucket, src, dst, "CopyObject");
        self.client
            .copy_object()
            .bucket(bucket)
            .key(dst)
            .copy_source(copy_source(bucket, src))
            .send()
            .await
            .map_err(|e| map_sdk_error("CopyObject", bucket, src, e))?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<()> {
        trace!(bucket, key, "DeleteObject");
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error("DeleteObject", bucket, key, e))?;
        Ok(())
    }

    async fn set_acl(&self, bucket: &str, key: &str, acl: CannedAcl) -> StoreResult<()> {
        debug!(bucket, key, %acl, "PutObjectAcl");
        self.client
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(to_object_acl(acl))
            .send()
            .await
            .map_err(|e| map_sdk_error("PutObjectAcl", bucket, key, e))?;
        Ok(())
    }
}
