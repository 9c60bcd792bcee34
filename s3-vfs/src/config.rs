/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::cmp;
use std::sync::Arc;

use crate::store::ObjectStore;
use crate::types::{ConcurrencySetting, PartSize};
use crate::uri::DEFAULT_SCHEME;
use crate::MIN_MULTIPART_PART_SIZE_BYTES;

/// Load configuration from the environment
pub mod loader;

/// Configuration for a [`Client`](crate::client::Client)
#[derive(Debug, Clone)]
pub struct Config {
    target_part_size: PartSize,
    concurrency: ConcurrencySetting,
    scheme: String,
    store: Arc<dyn ObjectStore>,
}

impl Config {
    /// Create a new `Config` builder
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Returns a reference to the part size used to split file writes
    pub fn part_size(&self) -> &PartSize {
        &self.target_part_size
    }

    /// Returns the concurrency setting used by operations that touch many objects at once.
    pub fn concurrency(&self) -> &ConcurrencySetting {
        &self.concurrency
    }

    /// The URI scheme accepted by the client
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The object store all requests are sent to.
    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }
}

/// Fluent style builder for [Config]
#[derive(Debug, Clone, Default)]
pub struct Builder {
    target_part_size: PartSize,
    concurrency: ConcurrencySetting,
    scheme: Option<String>,
    store: Option<Arc<dyn ObjectStore>>,
}

impl Builder {
    /// The size of each part when a file is written through a multipart upload.
    ///
    /// Files that never grow past one part are stored with a single [`PutObject`] request when
    /// flushed. The minimum part size is 5 MiB, any part size less than that will be rounded up.
    ///
    /// Default is [PartSize::Auto]
    ///
    /// [`PutObject`]: https://docs.aws.amazon.com/AmazonS3/latest/API/API_PutObject.html
    pub fn part_size(self, part_size: PartSize) -> Self {
        let part_size = match part_size {
            PartSize::Target(part_size) => {
                PartSize::Target(cmp::max(part_size, MIN_MULTIPART_PART_SIZE_BYTES))
            }
            tps => tps,
        };

        self.set_target_part_size(part_size)
    }

    /// Target part size for file writes.
    ///
    /// NOTE: This does not validate the setting and is meant for internal use only.
    pub(crate) fn set_target_part_size(mut self, part_size: PartSize) -> Self {
        self.target_part_size = part_size;
        self
    }

    /// Set the concurrency level this component is allowed to use.
    ///
    /// This sets the maximum number of in-flight requests for recursive removal and bucket
    /// emptying. Default is [ConcurrencySetting::Auto].
    pub fn concurrency(mut self, concurrency: ConcurrencySetting) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the URI scheme accepted by the client. Default is `s3`.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Set the object store to use.
    pub fn store(mut self, store: impl ObjectStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Consumes the builder and constructs a [`Config`](crate::config::Config)
    pub fn build(self) -> Config {
        Config {
            target_part_size: self.target_part_size,
            concurrency: self.concurrency,
            scheme: self
                .scheme
                .unwrap_or_else(|| DEFAULT_SCHEME.to_owned())
                .to_ascii_lowercase(),
            store: self.store.expect("object store set"),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::store::InMemoryObjectStore;
    use crate::types::PartSize;

    #[test]
    fn test_part_size_rounded_up_to_minimum() {
        let config = crate::Config::builder()
            .part_size(PartSize::Target(1024))
            .store(InMemoryObjectStore::new())
            .build();
        assert!(matches!(
            config.part_size(),
            PartSize::Target(part_size) if *part_size == 5 * crate::MEBIBYTE
        ));
        assert_eq!("s3", config.scheme());
    }

    #[test]
    fn test_internal_part_size_not_validated() {
        let config = crate::Config::builder()
            .set_target_part_size(PartSize::Target(16))
            .scheme("MinIO")
            .store(InMemoryObjectStore::new())
            .build();
        assert!(matches!(config.part_size(), PartSize::Target(16)));
        assert_eq!("minio", config.scheme());
    }
}
