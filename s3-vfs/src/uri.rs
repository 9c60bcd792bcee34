/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::str::FromStr;

use crate::error::{self, Error};

/// Delimiter separating path segments in object keys
pub(crate) const DELIMITER: &str = "/";

/// URI scheme accepted when none is configured
pub(crate) const DEFAULT_SCHEME: &str = "s3";

/// A normalized `scheme://bucket/path` reference to a file or directory in an object store.
///
/// The key never has a leading or trailing delimiter and never contains empty, `.` or `..`
/// segments. An empty key refers to the root of the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUri {
    scheme: String,
    bucket: String,
    key: String,
}

impl ObjectUri {
    /// Parse a URI using the default `s3` scheme.
    pub fn parse(uri: &str) -> Result<Self, Error> {
        Self::parse_with_scheme(uri, DEFAULT_SCHEME)
    }

    /// Parse a URI, accepting only the given scheme.
    pub fn parse_with_scheme(uri: &str, scheme: &str) -> Result<Self, Error> {
        let (uri_scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| error::invalid_argument(format!("`{uri}` is missing a scheme")))?;

        if !uri_scheme.eq_ignore_ascii_case(scheme) {
            return Err(error::invalid_argument(format!(
                "unsupported scheme `{uri_scheme}` in `{uri}`, expected `{scheme}`"
            )));
        }

        let (bucket, path) = rest.split_once(DELIMITER).unwrap_or((rest, ""));
        validate_bucket_name(bucket)?;

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            bucket: bucket.to_owned(),
            key: normalize_key(path)?,
        })
    }

    /// Build a URI from an object key as returned by the store.
    ///
    /// A trailing delimiter (directory marker) is dropped, so a marker key and the directory it
    /// represents map to the same URI. Keys are not resolved: a key with empty, `.` or `..`
    /// segments has no URI of its own and is rejected with `InvalidArgument`.
    pub fn from_key(scheme: &str, bucket: &str, key: &str) -> Result<Self, Error> {
        validate_bucket_name(bucket)?;
        let key = key.strip_suffix(DELIMITER).unwrap_or(key);
        if !key.is_empty() && !key.split(DELIMITER).all(is_path_segment) {
            return Err(error::invalid_argument(format!(
                "key `{key}` cannot be expressed as a path"
            )));
        }
        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        })
    }

    /// The URI scheme
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The object key this URI maps to when it names a file
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether this URI points at the root of the bucket
    pub fn is_root(&self) -> bool {
        self.key.is_empty()
    }

    /// The key prefix shared by everything inside this URI when treated as a directory.
    ///
    /// This is also the key of the directory marker object. The bucket root maps to the empty
    /// prefix.
    pub fn dir_key(&self) -> String {
        if self.is_root() {
            String::new()
        } else {
            format!("{}{DELIMITER}", self.key)
        }
    }

    /// The last path segment, or `None` for the bucket root
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.key.rsplit(DELIMITER).next()
    }

    /// Append a relative path to this URI.
    pub fn join(&self, path: &str) -> Result<Self, Error> {
        let joined = if self.is_root() {
            path.to_owned()
        } else {
            format!("{}{DELIMITER}{path}", self.key)
        };
        Ok(Self {
            scheme: self.scheme.clone(),
            bucket: self.bucket.clone(),
            key: normalize_key(&joined)?,
        })
    }

    /// The parent directory, or `None` for the bucket root
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let key = match self.key.rsplit_once(DELIMITER) {
            Some((parent, _)) => parent.to_owned(),
            None => String::new(),
        };
        Some(Self {
            scheme: self.scheme.clone(),
            bucket: self.bucket.clone(),
            key,
        })
    }

    /// Fails with `InvalidArgument` if this URI is the bucket root.
    pub(crate) fn require_path(&self) -> Result<(), Error> {
        if self.is_root() {
            return Err(error::invalid_argument(format!(
                "`{self}` does not name a path inside the bucket"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "{}://{}", self.scheme, self.bucket)
        } else {
            write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
        }
    }
}

impl FromStr for ObjectUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Returns true if `key` is a directory marker key (ends with the delimiter).
pub fn is_directory_key(key: &str) -> bool {
    key.ends_with(DELIMITER)
}

/// Whether `segment` survives normalization unchanged.
pub(crate) fn is_path_segment(segment: &str) -> bool {
    !matches!(segment, "" | "." | "..")
}

/// Canonicalize a slash separated path into an object key.
///
/// Empty and `.` segments are dropped and `..` is resolved lexically. Paths that climb above
/// the bucket root are rejected.
pub(crate) fn normalize_key(path: &str) -> Result<String, Error> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(DELIMITER) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(error::invalid_argument(format!(
                        "path `{path}` resolves outside of the bucket"
                    )));
                }
            }
            segment => segments.push(segment),
        }
    }
    Ok(segments.join(DELIMITER))
}

/// Validate a bucket name against the S3 naming rules.
pub(crate) fn validate_bucket_name(name: &str) -> Result<(), Error> {
    let invalid = |reason: &str| {
        Err(error::invalid_argument(format!(
            "invalid bucket name `{name}`: {reason}"
        )))
    };

    if name.len() < 3 || name.len() > 63 {
        return invalid("must be between 3 and 63 characters long");
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return invalid("only lowercase letters, digits, '-' and '.' are allowed");
    }
    let first = name.as_bytes()[0];
    let last = name.as_bytes()[name.len() - 1];
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return invalid("must begin and end with a letter or digit");
    }
    if name.contains("..") {
        return invalid("must not contain adjacent periods");
    }
    Ok(())
}
