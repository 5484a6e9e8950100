//! Streamed multipart upload.

use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bucketfs_core::store::read_chunk;
use bucketfs_core::{ObjectReader, StoreError, StoreResult, UploadOptions};
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, trace, warn};

use crate::convert::{map_sdk_error, to_object_acl};

/// Smallest part size S3 accepts for every part but the last.
pub(crate) const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// S3 part numbers start at 1 and stop at 10000.
const MAX_PARTS: i32 = 10_000;

/// Part size actually used for a requested one.
pub(crate) fn effective_part_size(requested: usize) -> usize {
    requested.max(MIN_PART_SIZE)
}

/// Uploads one object body, part by part.
#[derive(Debug)]
pub(crate) struct MultipartUpload<'a> {
    client: &'a Client,
    bucket: &'a str,
    key: &'a str,
    options: &'a UploadOptions,
}

impl<'a> MultipartUpload<'a> {
    pub(crate) fn new(
        client: &'a Client,
        bucket: &'a str,
        key: &'a str,
        options: &'a UploadOptions,
    ) -> Self {
        Self {
            client,
            bucket,
            key,
            options,
        }
    }

    fn part_size(&self) -> usize {
        effective_part_size(self.options.part_size)
    }

    /// Upload `body`. A body shorter than one part goes out as a single PUT.
    pub(crate) async fn run(self, mut body: ObjectReader) -> StoreResult<()> {
        let part_size = self.part_size();
        let first = read_chunk(&mut body, part_size).await?;
        if first.len() < part_size {
            trace!(
                bucket = self.bucket,
                key = self.key,
                size = first.len(),
                "single part upload"
            );
            return self.put_single(first).await;
        }

        let upload_id = self.create().await?;
        debug!(
            bucket = self.bucket,
            key = self.key,
            %upload_id,
            part_size,
            "started multipart upload"
        );

        match self.upload_parts(&upload_id, first, body).await {
            Ok(parts) => self.complete(&upload_id, parts).await,
            Err(err) => {
                warn!(
                    bucket = self.bucket,
                    key = self.key,
                    %upload_id,
                    error = %err,
                    "aborting multipart upload"
                );
                self.abort(&upload_id).await;
                Err(err)
            }
        }
    }

    async fn put_single(&self, data: Bytes) -> StoreResult<()> {
        let props = &self.options.properties;
        self.client
            .put_object()
            .bucket(self.bucket)
            .key(self.key)
            .acl(to_object_acl(props.acl))
            .content_type(&props.content_type)
            .set_cache_control(props.cache_control.clone())
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_sdk_error("PutObject", self.bucket, self.key, e))?;
        Ok(())
    }

    async fn create(&self) -> StoreResult<String> {
        let props = &self.options.properties;
        let output = self
            .client
            .create_multipart_upload()
            .bucket(self.bucket)
            .key(self.key)
            .acl(to_object_acl(props.acl))
            .content_type(&props.content_type)
            .set_cache_control(props.cache_control.clone())
            .send()
            .await
            .map_err(|e| map_sdk_error("CreateMultipartUpload", self.bucket, self.key, e))?;

        output
            .upload_id()
            .map(ToOwned::to_owned)
            .ok_or_else(|| StoreError::InvalidArgument {
                message: "CreateMultipartUpload returned no upload id".to_owned(),
            })
    }

    /// Read the rest of `body` and upload it, keeping at most
    /// `options.concurrency` parts in flight.
    async fn upload_parts(
        &self,
        upload_id: &str,
        first: Bytes,
        mut body: ObjectReader,
    ) -> StoreResult<Vec<CompletedPart>> {
        let part_size = self.part_size();
        let concurrency = self.options.concurrency.max(1);
        let mut in_flight = FuturesUnordered::new();
        let mut completed = Vec::new();
        let mut next = Some(first);
        let mut part_number = 0i32;

        loop {
            while in_flight.len() < concurrency {
                let data = match next.take() {
                    Some(data) => data,
                    None => read_chunk(&mut body, part_size).await?,
                };
                if data.is_empty() {
                    break;
                }
                part_number += 1;
                if part_number > MAX_PARTS {
                    return Err(StoreError::InvalidArgument {
                        message: format!("upload exceeds {MAX_PARTS} parts of {part_size} bytes"),
                    });
                }
                in_flight.push(self.upload_part(upload_id, part_number, data));
            }

            match in_flight.next().await {
                Some(part) => completed.push(part?),
                None => break,
            }
        }

        completed.sort_by_key(|p: &CompletedPart| p.part_number());
        Ok(completed)
    }

    async fn upload_part(
        &self,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> StoreResult<CompletedPart> {
        let size = data.len();
        let output = self
            .client
            .upload_part()
            .bucket(self.bucket)
            .key(self.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_sdk_error("UploadPart", self.bucket, self.key, e))?;
        trace!(key = self.key, part_number, size, "uploaded part");

        Ok(CompletedPart::builder()
            .set_e_tag(output.e_tag().map(ToOwned::to_owned))
            .part_number(part_number)
            .build())
    }

    async fn complete(&self, upload_id: &str, parts: Vec<CompletedPart>) -> StoreResult<()> {
        let count = parts.len();
        self.client
            .complete_multipart_upload()
            .bucket(self.bucket)
            .key(self.key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| map_sdk_error("CompleteMultipartUpload", self.bucket, self.key, e))?;
        debug!(
            bucket = self.bucket,
            key = self.key,
            parts = count,
            "completed multipart upload"
        );
        Ok(())
    }

    async fn abort(&self, upload_id: &str) {
        if let Err(e) = self
            .client
            .abort_multipart_upload()
            .bucket(self.bucket)
            .key(self.key)
            .upload_id(upload_id)
            .send()
            .await
        {
            warn!(key = self.key, upload_id, error = %e, "failed to abort multipart upload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_raise_part_size_to_minimum() {
        assert_eq!(effective_part_size(1024), MIN_PART_SIZE);
        assert_eq!(effective_part_size(0), MIN_PART_SIZE);
        assert_eq!(effective_part_size(8 * 1024 * 1024), 8 * 1024 * 1024);
    }
}
