/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{self, Error};
use crate::operation::{self, directory, read, upload};
use crate::store::ObjectStore;
use crate::types::{ConcurrencySetting, PartSize};
use crate::uri::ObjectUri;
use crate::{Config, DEFAULT_CONCURRENCY, MIN_MULTIPART_PART_SIZE_BYTES};

/// Filesystem client over an S3-compatible object store.
///
/// Paths are URIs of the form `s3://bucket/path/to/file`. Directories are emulated with zero
/// byte marker objects and prefix listings. Files are append-only: bytes written with
/// [`write_to_file`](Client::write_to_file) are buffered and sent in parts, and become
/// visible once [`flush_file`](Client::flush_file) succeeds.
///
/// A client starts disconnected; every operation other than [`connect`](Client::connect)
/// fails with `InvalidState` until it is connected.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) handle: Arc<Handle>,
}

/// Whatever is needed to carry out operations, e.g. config, open upload sessions
#[derive(Debug)]
pub(crate) struct Handle {
    pub(crate) config: Config,
    pub(crate) sessions: upload::SessionTable,
    connected: AtomicBool,
}

impl Handle {
    /// Get the concrete number of workers to use based on the concurrency setting.
    pub(crate) fn num_workers(&self) -> usize {
        match self.config.concurrency() {
            ConcurrencySetting::Explicit(concurrency) => (*concurrency).max(1),
            ConcurrencySetting::Auto => DEFAULT_CONCURRENCY,
        }
    }

    /// Get the concrete part size to use for file writes
    pub(crate) fn upload_part_size_bytes(&self) -> Result<usize, Error> {
        let part_size = match self.config.part_size() {
            PartSize::Auto => MIN_MULTIPART_PART_SIZE_BYTES,
            PartSize::Target(explicit) => *explicit,
        };
        usize::try_from(part_size).map_err(error::invalid_argument)
    }

    pub(crate) fn store(&self) -> &dyn ObjectStore {
        self.config.store()
    }

    fn ensure_connected(&self) -> Result<(), Error> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(error::not_connected())
        }
    }

    /// Parse `uri` for an operation, failing if the client is disconnected.
    fn resolve(&self, uri: &str) -> Result<ObjectUri, Error> {
        self.ensure_connected()?;
        ObjectUri::parse_with_scheme(uri, self.config.scheme())
    }
}

impl Client {
    /// Creates a new, disconnected client from a config.
    pub fn new(config: Config) -> Client {
        let handle = Arc::new(Handle {
            config,
            sessions: upload::SessionTable::default(),
            connected: AtomicBool::new(false),
        });
        Client { handle }
    }

    /// Returns the client's configuration
    pub fn config(&self) -> &Config {
        &self.handle.config
    }

    /// Whether [`connect`](Client::connect) has been called more recently than
    /// [`disconnect`](Client::disconnect).
    pub fn is_connected(&self) -> bool {
        self.handle.connected.load(Ordering::Acquire)
    }

    /// Enable operations on this client. Connecting twice is a no-op.
    #[tracing::instrument(skip_all, level = "debug")]
    pub async fn connect(&self) -> Result<(), Error> {
        if !self.handle.connected.swap(true, Ordering::AcqRel) {
            tracing::debug!("connected");
        }
        Ok(())
    }

    /// Disable operations on this client.
    ///
    /// Open upload sessions are kept and can be flushed after connecting again.
    #[tracing::instrument(skip_all, level = "debug")]
    pub async fn disconnect(&self) -> Result<(), Error> {
        if self.handle.connected.swap(false, Ordering::AcqRel) {
            let open = self.handle.sessions.len();
            if open > 0 {
                tracing::warn!("disconnecting with {open} unflushed file(s)");
            }
            tracing::debug!("disconnected");
        }
        Ok(())
    }

    /// Create a bucket. Fails with `AlreadyExists` if it exists.
    #[tracing::instrument(skip_all, fields(bucket = %bucket), level = "debug")]
    pub async fn create_bucket(&self, bucket: &str) -> Result<(), Error> {
        self.handle.ensure_connected()?;
        operation::bucket::create_bucket(&self.handle, bucket).await
    }

    /// Delete an empty bucket.
    ///
    /// Fails with `InvalidState` if the bucket still holds objects, see
    /// [`empty_bucket`](Client::empty_bucket).
    #[tracing::instrument(skip_all, fields(bucket = %bucket), level = "debug")]
    pub async fn delete_bucket(&self, bucket: &str) -> Result<(), Error> {
        self.handle.ensure_connected()?;
        operation::bucket::delete_bucket(&self.handle, bucket).await
    }

    /// Delete every object in a bucket.
    #[tracing::instrument(skip_all, fields(bucket = %bucket), level = "debug")]
    pub async fn empty_bucket(&self, bucket: &str) -> Result<(), Error> {
        self.handle.ensure_connected()?;
        operation::bucket::empty_bucket(&self.handle, bucket).await
    }

    /// Create a directory. Creating an existing directory succeeds.
    ///
    /// Parent directories are not created, they exist implicitly once anything is stored
    /// below them.
    #[tracing::instrument(skip_all, fields(uri = %uri), level = "debug")]
    pub async fn create_dir(&self, uri: &str) -> Result<(), Error> {
        let uri = self.handle.resolve(uri)?;
        directory::create_dir(&self.handle, &uri).await
    }

    /// Whether `uri` is a directory, either created explicitly or implied by its contents.
    #[tracing::instrument(skip_all, fields(uri = %uri), level = "debug")]
    pub async fn is_dir(&self, uri: &str) -> Result<bool, Error> {
        let uri = self.handle.resolve(uri)?;
        directory::is_dir(&self.handle, &uri).await
    }

    /// Whether `uri` is a stored file.
    ///
    /// Files with unflushed writes do not exist until they are flushed.
    #[tracing::instrument(skip_all, fields(uri = %uri), level = "debug")]
    pub async fn is_file(&self, uri: &str) -> Result<bool, Error> {
        let uri = self.handle.resolve(uri)?;
        read::is_file(&self.handle, &uri).await
    }

    /// Remove a file or a directory with everything below it.
    ///
    /// Removal is not atomic. If some objects could not be deleted the error reports how many,
    /// and the path should be listed again to see what remains.
    #[tracing::instrument(skip_all, fields(uri = %uri), level = "debug")]
    pub async fn remove_path(&self, uri: &str) -> Result<(), Error> {
        let uri = self.handle.resolve(uri)?;
        directory::remove_path(&self.handle, &uri).await
    }

    /// List the immediate children of a directory as full URIs, sorted.
    ///
    /// The bucket root can be listed. A missing directory has no children.
    #[tracing::instrument(skip_all, fields(uri = %uri), level = "debug")]
    pub async fn ls(&self, uri: &str) -> Result<Vec<String>, Error> {
        let uri = self.handle.resolve(uri)?;
        directory::ls(&self.handle, &uri).await
    }

    /// Append `data` to a file.
    ///
    /// Only one write, flush or abort may be in progress per path; a concurrent call on the
    /// same path fails with `InvalidState`. If the write fails it can be retried with the same
    /// data.
    #[tracing::instrument(skip_all, fields(uri = %uri, len = data.len()), level = "debug")]
    pub async fn write_to_file(&self, uri: &str, data: &[u8]) -> Result<(), Error> {
        let uri = self.handle.resolve(uri)?;
        upload::write(&self.handle, &uri, data).await
    }

    /// Store everything written to a file so far.
    ///
    /// Flushing a path with no pending writes succeeds without doing anything. Writing after a
    /// flush starts a new object that replaces the flushed one on its own flush.
    #[tracing::instrument(skip_all, fields(uri = %uri), level = "debug")]
    pub async fn flush_file(&self, uri: &str) -> Result<(), Error> {
        let uri = self.handle.resolve(uri)?;
        upload::flush(&self.handle, &uri).await
    }

    /// Discard pending writes to a file without storing them.
    #[tracing::instrument(skip_all, fields(uri = %uri), level = "debug")]
    pub async fn abort_file(&self, uri: &str) -> Result<(), Error> {
        let uri = self.handle.resolve(uri)?;
        upload::abort(&self.handle, &uri).await
    }

    /// Size in bytes of a stored file.
    ///
    /// Fails with `InvalidState` while the file has unflushed writes.
    #[tracing::instrument(skip_all, fields(uri = %uri), level = "debug")]
    pub async fn file_size(&self, uri: &str) -> Result<u64, Error> {
        let uri = self.handle.resolve(uri)?;
        read::file_size(&self.handle, &uri).await
    }

    /// Fill `buf` with the bytes of a file starting at `offset`.
    ///
    /// Fails with `OutOfRange` if the file ends before `buf` is filled.
    #[tracing::instrument(skip_all, fields(uri = %uri, offset = offset, len = buf.len()), level = "debug")]
    pub async fn read_from_file(&self, uri: &str, offset: u64, buf: &mut [u8]) -> Result<(), Error> {
        let uri = self.handle.resolve(uri)?;
        read::read(&self.handle, &uri, offset, buf).await
    }
}
