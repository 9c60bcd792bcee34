/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/// Bucket creation and deletion
pub(crate) mod bucket;

/// Directory emulation over prefix listings and marker objects
pub(crate) mod directory;

/// Ranged reads and object metadata
pub(crate) mod read;

/// Buffered, append-only file writes through multipart uploads
pub(crate) mod upload;
