/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};

/// A boxed error that is `Send` and `Sync`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by this library
///
/// NOTE: Use [`aws_smithy_types::error::display::DisplayErrorContext`] or similar to display
/// the entire error cause/source chain.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: BoxError,
}

/// General categories of filesystem errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed URI, bucket name, or other operation input
    InvalidArgument,

    /// Object, bucket, or path does not exist
    NotFound,

    /// Bucket creation collided with an existing bucket
    AlreadyExists,

    /// Transport or store level failure, including partially failed multipart uploads and
    /// partially completed recursive removals
    IOError,

    /// The operation is not valid in the current state (e.g. reading the size of an unflushed
    /// file, writing to a path that is being flushed, using a disconnected client)
    InvalidState,

    /// A read started at or ran past the end of an object
    OutOfRange,
}

impl Error {
    /// Creates a new [`Error`] from a known kind of error as well as an arbitrary error
    /// source.
    pub fn new<E>(kind: ErrorKind, err: E) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            kind,
            source: err.into(),
        }
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "invalid argument"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::AlreadyExists => write!(f, "already exists"),
            ErrorKind::IOError => write!(f, "I/O error"),
            ErrorKind::InvalidState => write!(f, "invalid state"),
            ErrorKind::OutOfRange => write!(f, "out of range"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.source)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::new(ErrorKind::IOError, value)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::new(ErrorKind::IOError, value)
    }
}

impl From<aws_smithy_types::byte_stream::error::Error> for Error {
    fn from(value: aws_smithy_types::byte_stream::error::Error) -> Self {
        Self::new(ErrorKind::IOError, value)
    }
}

impl<E> From<SdkError<E, aws_smithy_runtime_api::http::Response>> for Error
where
    E: std::error::Error + ProvideErrorMetadata + Send + Sync + 'static,
{
    fn from(value: SdkError<E, aws_smithy_runtime_api::http::Response>) -> Self {
        let kind = match value.code() {
            Some("NotFound" | "NoSuchKey" | "NoSuchUpload" | "NoSuchBucket") => ErrorKind::NotFound,
            Some("BucketAlreadyExists" | "BucketAlreadyOwnedByYou") => ErrorKind::AlreadyExists,
            Some("BucketNotEmpty") => ErrorKind::InvalidState,
            Some("InvalidRange") => ErrorKind::OutOfRange,
            Some("InvalidBucketName" | "InvalidArgument") => ErrorKind::InvalidArgument,
            _ => match value.raw_response().map(|resp| resp.status().as_u16()) {
                Some(404) => ErrorKind::NotFound,
                Some(416) => ErrorKind::OutOfRange,
                _ => ErrorKind::IOError,
            },
        };

        Error::new(kind, value)
    }
}

pub(crate) fn invalid_argument<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::InvalidArgument, err)
}

pub(crate) fn not_found<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::NotFound, err)
}

pub(crate) fn already_exists<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::AlreadyExists, err)
}

pub(crate) fn invalid_state<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::InvalidState, err)
}

pub(crate) fn out_of_range<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::OutOfRange, err)
}

pub(crate) fn io_error<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::IOError, err)
}

static DISCONNECTED_ERROR: &str = "client is not connected, call `connect` first";

pub(crate) fn not_connected() -> Error {
    Error::new(ErrorKind::InvalidState, DISCONNECTED_ERROR)
}
