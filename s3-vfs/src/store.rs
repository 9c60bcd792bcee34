/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Object store clients.
//!
//! The filesystem never talks to the network directly. Every request goes through the
//! [`ObjectStore`] trait, which mirrors the subset of the S3 API needed to emulate a
//! filesystem: bucket management, whole and ranged object access, prefix listing and the
//! multipart upload lifecycle.

use std::fmt::Debug;
use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Error;
use crate::types::{Listing, UploadedPart};

/// In-memory object store enforcing S3 multipart rules
pub mod in_memory;

/// Object store backed by the AWS SDK for Rust
pub mod s3;

pub use in_memory::InMemoryObjectStore;
pub use s3::S3ObjectStore;

/// A client for an S3-compatible object store.
///
/// Implementations report failures through [`Error`] using the same kinds the filesystem
/// exposes: a missing bucket, key or upload is `NotFound`, an unsatisfiable range is
/// `OutOfRange`, and transport failures are `IOError`.
///
/// # Multipart uploads
///
/// An upload is started with [`create_multipart_upload`](ObjectStore::create_multipart_upload),
/// receives parts through [`upload_part`](ObjectStore::upload_part) and becomes visible as a
/// single object once [`complete_multipart_upload`](ObjectStore::complete_multipart_upload)
/// succeeds. Every part except the last must meet the store's minimum part size. Uploading a
/// part number twice replaces the earlier part.
#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    /// Create a new bucket.
    async fn create_bucket(&self, bucket: &str) -> Result<(), Error>;

    /// Delete an empty bucket.
    async fn delete_bucket(&self, bucket: &str) -> Result<(), Error>;

    /// Store `content` as a single object, replacing any existing object at `key`.
    async fn put_object(&self, bucket: &str, key: &str, content: Bytes) -> Result<(), Error>;

    /// Fetch the bytes of an object in `range`.
    ///
    /// The returned bytes may be shorter than the range when the object ends inside it.
    async fn get_object_range(
        &self,
        bucket: &str,
        key: &str,
        range: Range<u64>,
    ) -> Result<Bytes, Error>;

    /// Return the size of the object at `key`, or `None` if it does not exist.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, Error>;

    /// List every object whose key starts with `prefix`.
    ///
    /// With a delimiter, keys containing the delimiter after the prefix are rolled up into
    /// [`Listing::common_prefixes`].
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
    ) -> Result<Listing, Error>;

    /// Whether at least one object key starts with `prefix`.
    ///
    /// Fetches a single key at most, unlike [`list_objects`](ObjectStore::list_objects).
    async fn prefix_exists(&self, bucket: &str, prefix: &str) -> Result<bool, Error>;

    /// Delete the object at `key`. Deleting a missing key succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), Error>;

    /// Start a multipart upload and return its upload id.
    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String, Error>;

    /// Upload a single part of a multipart upload.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        content: Bytes,
    ) -> Result<UploadedPart, Error>;

    /// Combine the given parts, in part number order, into the final object.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), Error>;

    /// Discard a multipart upload and any parts uploaded for it.
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), Error>;
}
