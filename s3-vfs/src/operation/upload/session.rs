/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use bytes::Bytes;

use crate::error::{self, Error};
use crate::io::PartBuffer;
use crate::store::ObjectStore;
use crate::types::UploadedPart;
use crate::uri::ObjectUri;

/// Lifecycle of a single file upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UploadState {
    /// Nothing buffered
    Idle,
    /// Bytes buffered below the part size
    Accumulating,
    /// A full part is being sent to the store
    PartPending,
    /// The upload is being finalized, further writes are rejected
    Completing,
    /// The object is stored
    Completed,
    /// The upload was discarded
    Aborted,
}

/// Session state captured before a write starts sending parts.
#[derive(Debug)]
struct Snapshot {
    state: UploadState,
    buffered: usize,
    parts: usize,
    bytes_committed: u64,
    // first part taken by the write, its head is the buffer contents from before the write
    first_part: Option<Bytes>,
}

/// An in-progress write of one file.
///
/// Appended bytes accumulate in a part sized buffer. Every time the buffer fills up it is sent
/// as the next part of a multipart upload, which is created when the first part is sent.
/// Flushing sends whatever is left and finalizes the object.
#[derive(Debug)]
pub(crate) struct UploadSession {
    uri: ObjectUri,
    upload_id: Option<String>,
    parts: Vec<UploadedPart>,
    buffer: PartBuffer,
    bytes_committed: u64,
    state: UploadState,
    snapshot: Option<Snapshot>,
}

impl UploadSession {
    pub(crate) fn new(uri: ObjectUri, part_size: usize) -> Self {
        Self {
            uri,
            upload_id: None,
            parts: Vec::new(),
            buffer: PartBuffer::new(part_size),
            bytes_committed: 0,
            state: UploadState::Idle,
            snapshot: None,
        }
    }

    pub(crate) fn state(&self) -> UploadState {
        self.state
    }

    /// Total bytes accepted by this session, sent or still buffered.
    pub(crate) fn bytes_written(&self) -> u64 {
        self.bytes_committed + self.buffer.len() as u64
    }

    /// Append `data` to the file, sending every part that fills up.
    ///
    /// If sending a part fails, the session is rolled back to where it was before this call so
    /// the same write can be retried.
    pub(crate) async fn write(&mut self, store: &dyn ObjectStore, data: &[u8]) -> Result<(), Error> {
        self.recover();
        match self.state {
            UploadState::Idle | UploadState::Accumulating => {}
            state => {
                return Err(error::invalid_state(format!(
                    "cannot write to `{}` while the upload is {state:?}",
                    self.uri
                )))
            }
        }
        if data.is_empty() {
            return Ok(());
        }

        self.snapshot = Some(Snapshot {
            state: self.state,
            buffered: self.buffer.len(),
            parts: self.parts.len(),
            bytes_committed: self.bytes_committed,
            first_part: None,
        });

        match self.send_full_parts(store, data).await {
            Ok(()) => {
                self.snapshot = None;
                Ok(())
            }
            Err(err) => {
                tracing::debug!("rolling back failed write to `{}`: {err}", self.uri);
                self.rollback();
                Err(err)
            }
        }
    }

    async fn send_full_parts(&mut self, store: &dyn ObjectStore, data: &[u8]) -> Result<(), Error> {
        let mut rest = data;
        loop {
            rest = self.buffer.fill(rest);
            if !self.buffer.is_full() {
                break;
            }

            let part = self.buffer.take();
            if let Some(snapshot) = self.snapshot.as_mut() {
                snapshot.first_part.get_or_insert_with(|| part.clone());
            }
            self.state = UploadState::PartPending;
            self.send_part(store, part).await?;
        }

        self.state = if self.buffer.is_empty() {
            UploadState::Idle
        } else {
            UploadState::Accumulating
        };
        Ok(())
    }

    /// Send `part` as the next part, creating the multipart upload first if needed.
    async fn send_part(&mut self, store: &dyn ObjectStore, part: Bytes) -> Result<(), Error> {
        let bucket = self.uri.bucket();
        let key = self.uri.key();

        let upload_id = match self.upload_id.clone() {
            Some(upload_id) => upload_id,
            None => {
                let upload_id = store.create_multipart_upload(bucket, key).await?;
                tracing::debug!("created multipart upload {upload_id} for `{}`", self.uri);
                self.upload_id = Some(upload_id.clone());
                upload_id
            }
        };

        let part_number = self.parts.len() as i32 + 1;
        let part_len = part.len() as u64;
        tracing::trace!("sending part {part_number} ({part_len} bytes) of `{}`", self.uri);
        let uploaded = store
            .upload_part(bucket, key, &upload_id, part_number, part)
            .await?;

        self.parts.push(uploaded);
        self.bytes_committed += part_len;
        Ok(())
    }

    /// Undo a write that did not run to completion.
    ///
    /// Parts sent by the interrupted write are forgotten; resending them reuses their part
    /// numbers, which replaces them in the store.
    fn rollback(&mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };
        match snapshot.first_part {
            Some(part) => self.buffer.reset(&part[..snapshot.buffered]),
            None => self.buffer.truncate(snapshot.buffered),
        }
        self.parts.truncate(snapshot.parts);
        self.bytes_committed = snapshot.bytes_committed;
        self.state = snapshot.state;
    }

    /// Roll back a write whose future was dropped while a part was in flight.
    fn recover(&mut self) {
        if self.state == UploadState::PartPending {
            tracing::debug!("recovering interrupted write to `{}`", self.uri);
            self.rollback();
        }
    }

    /// Store everything written so far as the final object.
    ///
    /// A session that never sent a part is stored with a single put. Otherwise the buffered
    /// remainder becomes the last part and the upload is completed. On failure the session
    /// stays `Completing` and the flush can be retried without resending stored parts.
    pub(crate) async fn flush(&mut self, store: &dyn ObjectStore) -> Result<(), Error> {
        self.recover();
        if matches!(self.state, UploadState::Completed | UploadState::Aborted) {
            return Ok(());
        }
        self.state = UploadState::Completing;

        let has_data = !self.parts.is_empty() || !self.buffer.is_empty();

        match self.upload_id.clone() {
            Some(upload_id) if has_data => {
                if !self.buffer.is_empty() {
                    let last_part = Bytes::copy_from_slice(&self.buffer);
                    self.send_part(store, last_part).await?;
                    self.buffer.truncate(0);
                }
                store
                    .complete_multipart_upload(
                        self.uri.bucket(),
                        self.uri.key(),
                        &upload_id,
                        &self.parts,
                    )
                    .await?;
                tracing::debug!(
                    "completed multipart upload {upload_id} for `{}` with {} parts",
                    self.uri,
                    self.parts.len()
                );
            }
            upload_id => {
                let (bucket, key) = (self.uri.bucket(), self.uri.key());
                store
                    .put_object(bucket, key, Bytes::copy_from_slice(&self.buffer))
                    .await?;

                if let Some(upload_id) = upload_id {
                    // every part send failed, nothing references this upload
                    if let Err(err) = store.abort_multipart_upload(bucket, key, &upload_id).await {
                        tracing::warn!("failed to abort unused upload {upload_id}: {err}");
                    }
                }
                tracing::debug!("stored `{}` with a single put", self.uri);
                self.buffer.truncate(0);
            }
        }

        self.state = UploadState::Completed;
        Ok(())
    }

    /// Discard the session, aborting the multipart upload if one was started.
    pub(crate) async fn abort(&mut self, store: &dyn ObjectStore) -> Result<(), Error> {
        self.recover();
        if matches!(self.state, UploadState::Completed | UploadState::Aborted) {
            return Ok(());
        }

        if let Some(upload_id) = &self.upload_id {
            store
                .abort_multipart_upload(self.uri.bucket(), self.uri.key(), upload_id)
                .await?;
            tracing::debug!("aborted multipart upload {upload_id} for `{}`", self.uri);
        }

        self.upload_id = None;
        self.parts.clear();
        self.buffer.truncate(0);
        self.state = UploadState::Aborted;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::ops::Range;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::{UploadSession, UploadState};
    use crate::error::{Error, ErrorKind};
    use crate::store::in_memory::Operation;
    use crate::store::{InMemoryObjectStore, ObjectStore};
    use crate::types::{Listing, UploadedPart};
    use crate::uri::ObjectUri;

    const PART_SIZE: usize = 4;

    async fn setup() -> (InMemoryObjectStore, UploadSession) {
        let store = InMemoryObjectStore::with_min_part_size(PART_SIZE as u64);
        store.create_bucket("test-bucket").await.unwrap();
        let uri = ObjectUri::parse("s3://test-bucket/dir/file").unwrap();
        (store, UploadSession::new(uri, PART_SIZE))
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let (store, mut session) = setup().await;
        assert_eq!(UploadState::Idle, session.state());

        session.write(&store, b"ab").await.unwrap();
        assert_eq!(UploadState::Accumulating, session.state());

        session.write(&store, b"cd").await.unwrap();
        assert_eq!(UploadState::Idle, session.state());
        assert_eq!(1, store.request_count(Operation::UploadPart).await);

        session.write(&store, b"efghi").await.unwrap();
        assert_eq!(UploadState::Accumulating, session.state());
        assert_eq!(9, session.bytes_written());

        session.flush(&store).await.unwrap();
        assert_eq!(UploadState::Completed, session.state());
        assert_eq!(
            Some(Bytes::from_static(b"abcdefghi")),
            store.object("test-bucket", "dir/file").await
        );
        assert_eq!(1, store.request_count(Operation::CreateMultipartUpload).await);
        assert_eq!(3, store.request_count(Operation::UploadPart).await);

        let err = session.write(&store, b"more").await.unwrap_err();
        assert_eq!(&ErrorKind::InvalidState, err.kind());
    }

    #[tokio::test]
    async fn test_small_file_uses_put_object() {
        let (store, mut session) = setup().await;
        session.write(&store, b"abc").await.unwrap();
        session.flush(&store).await.unwrap();

        assert_eq!(0, store.request_count(Operation::CreateMultipartUpload).await);
        assert_eq!(1, store.request_count(Operation::PutObject).await);
        assert_eq!(
            Some(Bytes::from_static(b"abc")),
            store.object("test-bucket", "dir/file").await
        );
    }

    #[tokio::test]
    async fn test_failed_part_rolls_back() {
        let (store, mut session) = setup().await;
        session.write(&store, b"ab").await.unwrap();

        // second part of this write fails after the first was stored
        store.fail_after(Operation::UploadPart, 1).await;
        let err = session.write(&store, b"cdefghij").await.unwrap_err();
        assert_eq!(&ErrorKind::IOError, err.kind());
        assert_eq!(UploadState::Accumulating, session.state());
        assert_eq!(2, session.bytes_written());

        // retrying the same write resends from the same part number
        session.write(&store, b"cdefghij").await.unwrap();
        session.flush(&store).await.unwrap();
        assert_eq!(
            Some(Bytes::from_static(b"abcdefghij")),
            store.object("test-bucket", "dir/file").await
        );
        assert_eq!(0, store.pending_uploads("test-bucket").await);
    }

    #[tokio::test]
    async fn test_rollback_after_partial_write() {
        let (store, mut session) = setup().await;
        session.write(&store, b"a").await.unwrap();

        // first part succeeds, second fails
        session.write(&store, b"bcd").await.unwrap();
        session.write(&store, b"e").await.unwrap();
        let before = session.bytes_written();

        store.fail_next(Operation::UploadPart).await;
        let err = session.write(&store, b"fgh").await.unwrap_err();
        assert_eq!(&ErrorKind::IOError, err.kind());
        assert_eq!(before, session.bytes_written());

        session.write(&store, b"fgh").await.unwrap();
        session.flush(&store).await.unwrap();
        assert_eq!(
            Some(Bytes::from_static(b"abcdefgh")),
            store.object("test-bucket", "dir/file").await
        );
    }

    #[tokio::test]
    async fn test_failed_completion_retry_skips_parts() {
        let (store, mut session) = setup().await;
        session.write(&store, b"abcdef").await.unwrap();

        store.fail_next(Operation::CompleteMultipartUpload).await;
        let err = session.flush(&store).await.unwrap_err();
        assert_eq!(&ErrorKind::IOError, err.kind());
        assert_eq!(UploadState::Completing, session.state());

        let err = session.write(&store, b"x").await.unwrap_err();
        assert_eq!(&ErrorKind::InvalidState, err.kind());

        let parts_sent = store.request_count(Operation::UploadPart).await;
        session.flush(&store).await.unwrap();
        assert_eq!(parts_sent, store.request_count(Operation::UploadPart).await);
        assert_eq!(
            Some(Bytes::from_static(b"abcdef")),
            store.object("test-bucket", "dir/file").await
        );
    }

    #[tokio::test]
    async fn test_failed_first_part_falls_back_to_put() {
        let (store, mut session) = setup().await;
        store.fail_next(Operation::UploadPart).await;
        session.write(&store, b"abcd").await.unwrap_err();
        assert_eq!(UploadState::Idle, session.state());
        assert_eq!(1, store.pending_uploads("test-bucket").await);

        // nothing was stored, so the upload is dropped and the empty file is put
        session.flush(&store).await.unwrap();
        assert_eq!(Some(Bytes::new()), store.object("test-bucket", "dir/file").await);
        assert_eq!(0, store.pending_uploads("test-bucket").await);
    }

    #[tokio::test]
    async fn test_abort() {
        let (store, mut session) = setup().await;
        session.write(&store, b"abcdefg").await.unwrap();
        assert_eq!(1, store.pending_uploads("test-bucket").await);

        session.abort(&store).await.unwrap();
        assert_eq!(UploadState::Aborted, session.state());
        assert_eq!(0, store.pending_uploads("test-bucket").await);
        assert_eq!(None, store.object("test-bucket", "dir/file").await);

        let err = session.write(&store, b"x").await.unwrap_err();
        assert_eq!(&ErrorKind::InvalidState, err.kind());
    }

    /// Store whose `upload_part` never returns for one part number.
    #[derive(Debug)]
    struct StallingStore {
        inner: InMemoryObjectStore,
        stalled_part: i32,
    }

    #[async_trait]
    impl ObjectStore for StallingStore {
        async fn create_bucket(&self, bucket: &str) -> Result<(), Error> {
            self.inner.create_bucket(bucket).await
        }

        async fn delete_bucket(&self, bucket: &str) -> Result<(), Error> {
            self.inner.delete_bucket(bucket).await
        }

        async fn put_object(&self, bucket: &str, key: &str, content: Bytes) -> Result<(), Error> {
            self.inner.put_object(bucket, key, content).await
        }

        async fn get_object_range(
            &self,
            bucket: &str,
            key: &str,
            range: Range<u64>,
        ) -> Result<Bytes, Error> {
            self.inner.get_object_range(bucket, key, range).await
        }

        async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, Error> {
            self.inner.head_object(bucket, key).await
        }

        async fn list_objects(
            &self,
            bucket: &str,
            prefix: &str,
            delimiter: Option<&str>,
        ) -> Result<Listing, Error> {
            self.inner.list_objects(bucket, prefix, delimiter).await
        }

        async fn prefix_exists(&self, bucket: &str, prefix: &str) -> Result<bool, Error> {
            self.inner.prefix_exists(bucket, prefix).await
        }

        async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), Error> {
            self.inner.delete_object(bucket, key).await
        }

        async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String, Error> {
            self.inner.create_multipart_upload(bucket, key).await
        }

        async fn upload_part(
            &self,
            bucket: &str,
            key: &str,
            upload_id: &str,
            part_number: i32,
            content: Bytes,
        ) -> Result<UploadedPart, Error> {
            if part_number == self.stalled_part {
                std::future::pending::<()>().await;
            }
            self.inner
                .upload_part(bucket, key, upload_id, part_number, content)
                .await
        }

        async fn complete_multipart_upload(
            &self,
            bucket: &str,
            key: &str,
            upload_id: &str,
            parts: &[UploadedPart],
        ) -> Result<(), Error> {
            self.inner
                .complete_multipart_upload(bucket, key, upload_id, parts)
                .await
        }

        async fn abort_multipart_upload(
            &self,
            bucket: &str,
            key: &str,
            upload_id: &str,
        ) -> Result<(), Error> {
            self.inner
                .abort_multipart_upload(bucket, key, upload_id)
                .await
        }
    }

    #[tokio::test]
    async fn test_dropped_write_is_recovered() {
        let (store, mut session) = setup().await;
        let stalling = StallingStore {
            inner: store.clone(),
            stalled_part: 2,
        };
        session.write(&stalling, b"ab").await.unwrap();

        // give up on the write while its second part is in flight
        let dropped =
            tokio::time::timeout(Duration::from_millis(50), session.write(&stalling, b"cdefghij"))
                .await;
        assert!(dropped.is_err());
        assert_eq!(UploadState::PartPending, session.state());

        session.write(&store, b"cdefghij").await.unwrap();
        assert_eq!(UploadState::Accumulating, session.state());
        assert_eq!(10, session.bytes_written());
        session.flush(&store).await.unwrap();
        assert_eq!(
            Some(Bytes::from_static(b"abcdefghij")),
            store.object("test-bucket", "dir/file").await
        );
        assert_eq!(0, store.pending_uploads("test-bucket").await);
    }
}
