/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::config::Builder;
use crate::store::S3ObjectStore;
use crate::types::{ConcurrencySetting, PartSize};
use crate::Config;

/// Load filesystem [`Config`] from the environment.
///
/// Credentials, region and retry settings are resolved by `aws-config`. The resulting S3
/// client is wrapped in an [`S3ObjectStore`].
#[derive(Default, Debug)]
pub struct ConfigLoader {
    builder: Builder,
    endpoint_url: Option<String>,
    force_path_style: bool,
}

impl ConfigLoader {
    /// The size of each part when a file is written through a multipart upload.
    ///
    /// The minimum part size is 5 MiB, any part size less than that will be rounded up.
    /// Default is [PartSize::Auto]
    pub fn part_size(mut self, part_size: PartSize) -> Self {
        self.builder = self.builder.part_size(part_size);
        self
    }

    /// Set the concurrency level this component is allowed to use.
    ///
    /// Default is [ConcurrencySetting::Auto].
    pub fn concurrency(mut self, concurrency: ConcurrencySetting) -> Self {
        self.builder = self.builder.concurrency(concurrency);
        self
    }

    /// Set the URI scheme accepted by the client. Default is `s3`.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.builder = self.builder.scheme(scheme);
        self
    }

    /// Send requests to a custom endpoint, such as a MinIO deployment.
    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    ///
    /// Most S3-compatible services other than Amazon S3 require this.
    pub fn force_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }

    /// Load the default configuration
    ///
    /// If fields have been overridden during builder construction, the override values will be
    /// used. Otherwise, the default values for each field will be provided.
    pub async fn load(self) -> Config {
        let shared_config = aws_config::from_env().load().await;
        let mut s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .force_path_style(self.force_path_style);
        if let Some(endpoint_url) = self.endpoint_url {
            tracing::debug!("using custom endpoint {endpoint_url}");
            s3_config = s3_config.endpoint_url(endpoint_url);
        }

        let client = aws_sdk_s3::Client::from_conf(s3_config.build());
        self.builder.store(S3ObjectStore::new(client)).build()
    }
}
