/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
/* End of automatically managed default lints */

//! Virtual filesystem over S3-compatible object stores
//!
//! Object stores only offer flat, immutable objects. This crate layers a POSIX-like view on
//! top: `s3://bucket/a/b/c` paths, directories emulated with marker objects and prefix
//! listings, and append-only files whose writes are buffered into multipart upload parts.
//!
//! # Examples
//!
//! Load the config from the environment and write a file:
//!
//! ```no_run
//! # async fn example() -> Result<(), s3_vfs::error::Error> {
//! let config = s3_vfs::from_env().load().await;
//! let client = s3_vfs::Client::new(config);
//! client.connect().await?;
//!
//! client.create_dir("s3://my-bucket/logs").await?;
//! client.write_to_file("s3://my-bucket/logs/today", b"hello").await?;
//! client.flush_file("s3://my-bucket/logs/today").await?;
//!
//! let children = client.ls("s3://my-bucket/logs").await?;
//! assert_eq!(vec!["s3://my-bucket/logs/today"], children);
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_debug_implementations,
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

pub(crate) const MEBIBYTE: u64 = 1024 * 1024;

/// Minimum upload part size in bytes
pub(crate) const MIN_MULTIPART_PART_SIZE_BYTES: u64 = 5 * MEBIBYTE;

pub(crate) const DEFAULT_CONCURRENCY: usize = 8;

/// Error types emitted by `s3-vfs`
pub mod error;

/// Common types used by `s3-vfs`
pub mod types;

/// Translation between filesystem URIs and object keys
pub mod uri;

/// Object store clients
pub mod store;

/// Buffering of file writes into upload parts
pub(crate) mod io;

/// Filesystem client
pub mod client;

/// Filesystem operations
pub(crate) mod operation;

/// Filesystem client configuration
pub mod config;

pub use self::client::Client;
pub use self::config::Config;
use self::config::loader::ConfigLoader;

/// Create a config loader
pub fn from_env() -> ConfigLoader {
    ConfigLoader::default()
}
