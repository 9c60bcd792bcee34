/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::RwLock;

use crate::error::{self, Error};
use crate::store::ObjectStore;
use crate::types::{Listing, ObjectSummary, UploadedPart};
use crate::MIN_MULTIPART_PART_SIZE_BYTES;

const MAX_PART_NUMBER: i32 = 10_000;

/// Requests understood by [`InMemoryObjectStore`], used to inject faults and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Operation {
    /// `create_bucket`
    CreateBucket,
    /// `delete_bucket`
    DeleteBucket,
    /// `put_object`
    PutObject,
    /// `get_object_range`
    GetObject,
    /// `head_object`
    HeadObject,
    /// `list_objects`
    ListObjects,
    /// `delete_object`
    DeleteObject,
    /// `create_multipart_upload`
    CreateMultipartUpload,
    /// `upload_part`
    UploadPart,
    /// `complete_multipart_upload`
    CompleteMultipartUpload,
    /// `abort_multipart_upload`
    AbortMultipartUpload,
}

/// An [`ObjectStore`] that keeps every bucket in memory.
///
/// It follows the S3 rules the filesystem depends on: keys are flat, delimited listings roll
/// up common prefixes, and completing a multipart upload rejects any part other than the
/// last that is smaller than the minimum part size. Faults can be queued per operation with
/// [`fail_next`](InMemoryObjectStore::fail_next).
///
/// Cloning is cheap and clones share the same state.
#[derive(Debug, Clone)]
pub struct InMemoryObjectStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    min_part_size: u64,
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    buckets: HashMap<String, Bucket>,
    // (operation, calls to let through before failing)
    faults: VecDeque<(Operation, usize)>,
    requests: HashMap<Operation, usize>,
    next_id: u64,
}

#[derive(Debug, Default)]
struct Bucket {
    objects: BTreeMap<String, Bytes>,
    uploads: HashMap<String, MultipartUpload>,
}

#[derive(Debug)]
struct MultipartUpload {
    key: String,
    // part number -> (etag, content)
    parts: BTreeMap<i32, (String, Bytes)>,
}

impl State {
    /// Count the request and consume a queued fault for it, if any.
    fn begin(&mut self, op: Operation) -> Result<(), Error> {
        *self.requests.entry(op).or_default() += 1;
        let Some(idx) = self.faults.iter().position(|(f, _)| *f == op) else {
            return Ok(());
        };
        let (_, skip) = &mut self.faults[idx];
        if *skip > 0 {
            *skip -= 1;
            return Ok(());
        }
        self.faults.remove(idx);
        Err(error::io_error(format!("injected {op:?} failure")))
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn bucket(&self, name: &str) -> Result<&Bucket, Error> {
        self.buckets
            .get(name)
            .ok_or_else(|| error::not_found(format!("bucket `{name}` does not exist")))
    }

    fn bucket_mut(&mut self, name: &str) -> Result<&mut Bucket, Error> {
        self.buckets
            .get_mut(name)
            .ok_or_else(|| error::not_found(format!("bucket `{name}` does not exist")))
    }
}

impl Bucket {
    fn upload_mut(&mut self, key: &str, upload_id: &str) -> Result<&mut MultipartUpload, Error> {
        match self.uploads.get_mut(upload_id) {
            Some(upload) if upload.key == key => Ok(upload),
            _ => Err(error::not_found(format!(
                "upload `{upload_id}` for key `{key}` does not exist"
            ))),
        }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    /// Create an empty store using the S3 minimum part size.
    pub fn new() -> Self {
        Self::with_min_part_size(MIN_MULTIPART_PART_SIZE_BYTES)
    }

    /// Create an empty store that requires every non-final part to be at least
    /// `min_part_size` bytes.
    pub fn with_min_part_size(min_part_size: u64) -> Self {
        Self {
            inner: Arc::new(Inner {
                min_part_size,
                state: RwLock::new(State::default()),
            }),
        }
    }

    /// Make the next call of `op` fail with an `IOError`.
    ///
    /// Faults queue up, so calling this twice fails the next two calls.
    pub async fn fail_next(&self, op: Operation) {
        self.fail_after(op, 0).await;
    }

    /// Let `successes` calls of `op` through, then fail the one after with an `IOError`.
    pub async fn fail_after(&self, op: Operation, successes: usize) {
        self.inner
            .state
            .write()
            .await
            .faults
            .push_back((op, successes));
    }

    /// Number of times `op` has been requested, including failed requests.
    pub async fn request_count(&self, op: Operation) -> usize {
        let state = self.inner.state.read().await;
        state.requests.get(&op).copied().unwrap_or_default()
    }

    /// Number of multipart uploads started in `bucket` that were neither completed nor aborted.
    pub async fn pending_uploads(&self, bucket: &str) -> usize {
        let state = self.inner.state.read().await;
        state
            .buckets
            .get(bucket)
            .map(|b| b.uploads.len())
            .unwrap_or_default()
    }

    /// Contents of the object at `key`, bypassing fault injection.
    pub async fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let state = self.inner.state.read().await;
        state.buckets.get(bucket)?.objects.get(key).cloned()
    }

    /// Every key stored in `bucket`, in lexicographic order.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let state = self.inner.state.read().await;
        state
            .buckets
            .get(bucket)
            .map(|b| b.objects.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn create_bucket(&self, bucket: &str) -> Result<(), Error> {
        let mut state = self.inner.state.write().await;
        state.begin(Operation::CreateBucket)?;
        if state.buckets.contains_key(bucket) {
            return Err(error::already_exists(format!(
                "bucket `{bucket}` already exists"
            )));
        }
        state.buckets.insert(bucket.to_owned(), Bucket::default());
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), Error> {
        let mut state = self.inner.state.write().await;
        state.begin(Operation::DeleteBucket)?;
        if !state.bucket(bucket)?.objects.is_empty() {
            return Err(error::invalid_state(format!(
                "bucket `{bucket}` is not empty"
            )));
        }
        state.buckets.remove(bucket);
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, content: Bytes) -> Result<(), Error> {
        let mut state = self.inner.state.write().await;
        state.begin(Operation::PutObject)?;
        state
            .bucket_mut(bucket)?
            .objects
            .insert(key.to_owned(), content);
        Ok(())
    }

    async fn get_object_range(
        &self,
        bucket: &str,
        key: &str,
        range: Range<u64>,
    ) -> Result<Bytes, Error> {
        let mut state = self.inner.state.write().await;
        state.begin(Operation::GetObject)?;
        let data = state
            .bucket(bucket)?
            .objects
            .get(key)
            .ok_or_else(|| error::not_found(format!("key `{key}` does not exist")))?;

        let len = data.len() as u64;
        if range.start >= len || range.start > range.end {
            return Err(error::out_of_range(format!(
                "range {range:?} is not satisfiable for `{key}` of {len} bytes"
            )));
        }
        let end = range.end.min(len);
        Ok(data.slice(range.start as usize..end as usize))
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, Error> {
        let mut state = self.inner.state.write().await;
        state.begin(Operation::HeadObject)?;
        let size = state
            .bucket(bucket)?
            .objects
            .get(key)
            .map(|data| data.len() as u64);
        Ok(size)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
    ) -> Result<Listing, Error> {
        let mut state = self.inner.state.write().await;
        state.begin(Operation::ListObjects)?;
        let objects = &state.bucket(bucket)?.objects;

        let mut listing = Listing::default();
        let mut common_prefixes = BTreeSet::new();
        let matching = objects
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix));

        for (key, data) in matching {
            let rest = &key[prefix.len()..];
            match delimiter.and_then(|d| rest.find(d).map(|idx| idx + d.len())) {
                Some(end) => {
                    common_prefixes.insert(format!("{prefix}{}", &rest[..end]));
                }
                None => listing.objects.push(ObjectSummary {
                    key: key.clone(),
                    size: data.len() as u64,
                }),
            }
        }

        listing.common_prefixes = common_prefixes.into_iter().collect();
        Ok(listing)
    }

    async fn prefix_exists(&self, bucket: &str, prefix: &str) -> Result<bool, Error> {
        let mut state = self.inner.state.write().await;
        state.begin(Operation::ListObjects)?;
        let exists = state
            .bucket(bucket)?
            .objects
            .range(prefix.to_owned()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(prefix));
        Ok(exists)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), Error> {
        let mut state = self.inner.state.write().await;
        state.begin(Operation::DeleteObject)?;
        state.bucket_mut(bucket)?.objects.remove(key);
        Ok(())
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String, Error> {
        let mut state = self.inner.state.write().await;
        state.begin(Operation::CreateMultipartUpload)?;
        let upload_id = format!("upload-{}", state.next_id());
        state.bucket_mut(bucket)?.uploads.insert(
            upload_id.clone(),
            MultipartUpload {
                key: key.to_owned(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        content: Bytes,
    ) -> Result<UploadedPart, Error> {
        let mut state = self.inner.state.write().await;
        state.begin(Operation::UploadPart)?;
        if !(1..=MAX_PART_NUMBER).contains(&part_number) {
            return Err(error::invalid_argument(format!(
                "part number {part_number} must be between 1 and {MAX_PART_NUMBER}"
            )));
        }

        let e_tag = format!("\"etag-{}\"", state.next_id());
        let upload = state.bucket_mut(bucket)?.upload_mut(key, upload_id)?;
        upload
            .parts
            .insert(part_number, (e_tag.clone(), content));

        Ok(UploadedPart { part_number, e_tag })
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), Error> {
        let min_part_size = self.inner.min_part_size;
        let mut state = self.inner.state.write().await;
        state.begin(Operation::CompleteMultipartUpload)?;
        let bucket = state.bucket_mut(bucket)?;
        let upload = bucket.upload_mut(key, upload_id)?;

        if parts.is_empty() {
            return Err(error::invalid_argument(
                "a multipart upload must be completed with at least one part",
            ));
        }
        if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
            return Err(error::invalid_argument(
                "parts must be listed in ascending part number order",
            ));
        }

        let mut combined = BytesMut::new();
        for (idx, part) in parts.iter().enumerate() {
            let (e_tag, content) = match upload.parts.get(&part.part_number) {
                Some(stored) => stored,
                None => {
                    return Err(error::invalid_argument(format!(
                        "part {} was never uploaded",
                        part.part_number
                    )))
                }
            };
            if *e_tag != part.e_tag {
                return Err(error::invalid_argument(format!(
                    "etag mismatch for part {}",
                    part.part_number
                )));
            }
            let is_last = idx == parts.len() - 1;
            if !is_last && (content.len() as u64) < min_part_size {
                return Err(error::io_error(format!(
                    "part {} is {} bytes, smaller than the minimum of {min_part_size}",
                    part.part_number,
                    content.len()
                )));
            }
            combined.extend_from_slice(content);
        }

        bucket.uploads.remove(upload_id);
        bucket.objects.insert(key.to_owned(), combined.freeze());
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), Error> {
        let mut state = self.inner.state.write().await;
        state.begin(Operation::AbortMultipartUpload)?;
        let bucket = state.bucket_mut(bucket)?;
        bucket.upload_mut(key, upload_id)?;
        bucket.uploads.remove(upload_id);
        Ok(())
    }
}
