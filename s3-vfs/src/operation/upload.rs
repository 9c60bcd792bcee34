/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

mod session;
mod table;

pub(crate) use session::{UploadSession, UploadState};
pub(crate) use table::SessionTable;

use crate::client::Handle;
use crate::error::Error;
use crate::uri::ObjectUri;

/// Append `data` to the file at `uri`, opening an upload session on first write.
pub(crate) async fn write(handle: &Handle, uri: &ObjectUri, data: &[u8]) -> Result<(), Error> {
    uri.require_path()?;
    let part_size = handle.upload_part_size_bytes()?;
    let mut claimed = handle.sessions.claim_or_open(uri, part_size)?;
    claimed.session().write(handle.store(), data).await
}

/// Finalize the file at `uri`. Paths without an open session are left untouched.
pub(crate) async fn flush(handle: &Handle, uri: &ObjectUri) -> Result<(), Error> {
    uri.require_path()?;
    let Some(mut claimed) = handle.sessions.claim(uri)? else {
        tracing::trace!("no open upload for `{uri}`, nothing to flush");
        return Ok(());
    };

    let session = claimed.session();
    session.flush(handle.store()).await?;
    tracing::debug!("flushed {} bytes to `{uri}`", session.bytes_written());
    debug_assert_eq!(UploadState::Completed, session.state());
    handle.sessions.remove(uri, claimed);
    Ok(())
}

/// Discard the open upload for `uri`, if any.
pub(crate) async fn abort(handle: &Handle, uri: &ObjectUri) -> Result<(), Error> {
    uri.require_path()?;
    let Some(mut claimed) = handle.sessions.claim(uri)? else {
        return Ok(());
    };

    claimed.session().abort(handle.store()).await?;
    handle.sessions.remove(uri, claimed);
    Ok(())
}
