/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::ops::Range;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
};
use bytes::Bytes;

use crate::error::{self, Error};
use crate::store::ObjectStore;
use crate::types::{Listing, ObjectSummary, UploadedPart};

/// Region where buckets are created without a location constraint
const DEFAULT_REGION: &str = "us-east-1";

/// An [`ObjectStore`] that sends requests to Amazon S3 or an S3-compatible service.
///
/// Signing, retries and timeouts are handled by the wrapped SDK client.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    /// Wrap an existing S3 client.
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Create a store from shared AWS configuration.
    pub fn from_conf(sdk_config: &aws_types::SdkConfig) -> Self {
        Self::new(aws_sdk_s3::Client::new(sdk_config))
    }

    /// The underlying S3 client
    pub fn client(&self) -> &aws_sdk_s3::Client {
        &self.client
    }

    fn location_constraint(&self) -> Option<CreateBucketConfiguration> {
        let region = self.client.config().region()?;
        if region.as_ref() == DEFAULT_REGION {
            return None;
        }
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region.as_ref()))
                .build(),
        )
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn create_bucket(&self, bucket: &str) -> Result<(), Error> {
        self.client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(self.location_constraint())
            .send()
            .await?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), Error> {
        self.client.delete_bucket().bucket(bucket).send().await?;
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, content: Bytes) -> Result<(), Error> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(content.len() as i64)
            .body(ByteStream::from(content))
            .send()
            .await?;
        Ok(())
    }

    async fn get_object_range(
        &self,
        bucket: &str,
        key: &str,
        range: Range<u64>,
    ) -> Result<Bytes, Error> {
        if range.is_empty() {
            return Ok(Bytes::new());
        }

        // HTTP byte ranges are inclusive
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .range(format!("bytes={}-{}", range.start, range.end - 1))
            .send()
            .await?;

        let body = resp.body.collect().await?;
        Ok(body.into_bytes())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, Error> {
        let resp = self.client.head_object().bucket(bucket).key(key).send().await;
        match resp {
            Ok(output) => Ok(Some(output.content_length().unwrap_or_default().max(0) as u64)),
            Err(err) if err.as_service_error().map(|e| e.is_not_found()) == Some(true) => {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
    ) -> Result<Listing, Error> {
        let mut listing = Listing::default();
        let mut continuation_token = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_delimiter(delimiter.map(str::to_owned))
                .set_continuation_token(continuation_token.take())
                .send()
                .await?;

            listing.objects.extend(resp.contents().iter().filter_map(|obj| {
                obj.key().map(|key| ObjectSummary {
                    key: key.to_owned(),
                    size: obj.size().unwrap_or_default().max(0) as u64,
                })
            }));
            listing.common_prefixes.extend(
                resp.common_prefixes()
                    .iter()
                    .filter_map(|cp| cp.prefix().map(str::to_owned)),
            );

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or_default() => {
                    tracing::trace!("listing `{prefix}` continues with next page");
                    continuation_token = Some(token.to_owned());
                }
                _ => break,
            }
        }

        Ok(listing)
    }

    async fn prefix_exists(&self, bucket: &str, prefix: &str) -> Result<bool, Error> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(1)
            .send()
            .await?;
        Ok(!resp.contents().is_empty())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), Error> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String, Error> {
        let resp = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;

        resp.upload_id()
            .map(str::to_owned)
            .ok_or_else(|| error::io_error(format!("no upload id returned for `{key}`")))
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        content: Bytes,
    ) -> Result<UploadedPart, Error> {
        let resp = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .content_length(content.len() as i64)
            .body(ByteStream::from(content))
            .send()
            .await?;

        let e_tag = resp.e_tag().ok_or_else(|| {
            error::io_error(format!("no etag returned for part {part_number} of `{key}`"))
        })?;
        Ok(UploadedPart {
            part_number,
            e_tag: e_tag.to_owned(),
        })
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), Error> {
        let parts = parts
            .iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(part.e_tag.clone())
                    .build()
            })
            .collect();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await?;
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), Error> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await?;
        Ok(())
    }
}
