/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/// The part size used to split file writes into multipart upload parts.
#[derive(Debug, Clone, Default)]
pub enum PartSize {
    /// Use the minimum part size the object store accepts (5 MiB for S3).
    #[default]
    Auto,

    /// Part size explicitly given.
    ///
    /// NOTE: Values below the S3 minimum part size are rounded up when set through
    /// [`Builder::part_size`](crate::config::Builder::part_size).
    Target(u64),
}

/// The concurrency settings used by operations that fan out to many objects
/// (e.g. recursive removal).
#[derive(Debug, Clone, Default)]
pub enum ConcurrencySetting {
    /// Automatically configure a reasonable concurrency setting.
    #[default]
    Auto,

    /// Explicitly configured concurrency setting.
    Explicit(usize),
}

/// Summary of a single object returned from a prefix listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Full object key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
}

/// Result of listing a prefix in the object store.
///
/// When a delimiter is used, keys that contain the delimiter after the prefix are rolled up
/// into `common_prefixes` (each ending with the delimiter) instead of appearing in `objects`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Objects directly matching the listing
    pub objects: Vec<ObjectSummary>,
    /// Rolled up key prefixes, only populated for delimited listings
    pub common_prefixes: Vec<String>,
}

/// A single successfully uploaded part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    /// 1-indexed part number
    pub part_number: i32,
    /// Identifier returned by the store for this part, required to complete the upload
    pub e_tag: String,
}
