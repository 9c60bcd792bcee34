/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::client::Handle;
use crate::error::{self, Error};
use crate::uri::ObjectUri;

/// Fill `buf` with the bytes of the object at `uri` starting at `offset`.
pub(crate) async fn read(
    handle: &Handle,
    uri: &ObjectUri,
    offset: u64,
    buf: &mut [u8],
) -> Result<(), Error> {
    uri.require_path()?;
    if buf.is_empty() {
        return Ok(());
    }

    let end = offset
        .checked_add(buf.len() as u64)
        .ok_or_else(|| error::out_of_range(format!("read at offset {offset} overflows")))?;
    let data = handle
        .store()
        .get_object_range(uri.bucket(), uri.key(), offset..end)
        .await?;

    if data.len() < buf.len() {
        return Err(error::out_of_range(format!(
            "`{uri}` ends at {}, cannot read {} bytes at offset {offset}",
            offset + data.len() as u64,
            buf.len()
        )));
    }
    tracing::trace!("read {} bytes at offset {offset} of `{uri}`", buf.len());
    buf.copy_from_slice(&data[..buf.len()]);
    Ok(())
}

/// Size of the stored object at `uri`.
pub(crate) async fn file_size(handle: &Handle, uri: &ObjectUri) -> Result<u64, Error> {
    uri.require_path()?;
    if handle.sessions.contains(uri) {
        return Err(error::invalid_state(format!(
            "`{uri}` has unflushed writes"
        )));
    }

    handle
        .store()
        .head_object(uri.bucket(), uri.key())
        .await?
        .ok_or_else(|| error::not_found(format!("`{uri}` does not exist")))
}

/// Whether a stored object exists at `uri`.
pub(crate) async fn is_file(handle: &Handle, uri: &ObjectUri) -> Result<bool, Error> {
    uri.require_path()?;
    let size = handle.store().head_object(uri.bucket(), uri.key()).await?;
    Ok(size.is_some())
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use crate::error::ErrorKind;
    use crate::store::{InMemoryObjectStore, ObjectStore};
    use crate::test_util::test_client;
    use crate::uri::ObjectUri;

    async fn store_with_file() -> InMemoryObjectStore {
        let store = InMemoryObjectStore::new();
        store.create_bucket("test-bucket").await.unwrap();
        store
            .put_object(
                "test-bucket",
                "file",
                Bytes::from_static(b"abcdefghijklmnopqrstuvwxyz"),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_ranged_read() {
        let store = store_with_file().await;
        let client = test_client(&store, 16).await;
        let uri = ObjectUri::parse("s3://test-bucket/file").unwrap();

        let mut buf = [0u8; 5];
        super::read(&client.handle, &uri, 11, &mut buf).await.unwrap();
        assert_eq!(b"lmnop", &buf);

        let mut buf = [0u8; 26];
        super::read(&client.handle, &uri, 0, &mut buf).await.unwrap();
        assert_eq!(b"abcdefghijklmnopqrstuvwxyz", &buf);
    }

    #[tokio::test]
    async fn test_read_out_of_range() {
        let store = store_with_file().await;
        let client = test_client(&store, 16).await;
        let uri = ObjectUri::parse("s3://test-bucket/file").unwrap();

        let mut buf = [0u8; 4];
        let err = super::read(&client.handle, &uri, 26, &mut buf)
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::OutOfRange, err.kind());

        let err = super::read(&client.handle, &uri, 24, &mut buf)
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::OutOfRange, err.kind());

        let missing = ObjectUri::parse("s3://test-bucket/missing").unwrap();
        let err = super::read(&client.handle, &missing, 0, &mut buf)
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::NotFound, err.kind());

        // empty reads never touch the store
        super::read(&client.handle, &missing, 100, &mut [])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_file_size() {
        let store = store_with_file().await;
        let client = test_client(&store, 16).await;
        let uri = ObjectUri::parse("s3://test-bucket/file").unwrap();

        assert_eq!(26, super::file_size(&client.handle, &uri).await.unwrap());
        assert!(super::is_file(&client.handle, &uri).await.unwrap());

        let missing = ObjectUri::parse("s3://test-bucket/missing").unwrap();
        let err = super::file_size(&client.handle, &missing)
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::NotFound, err.kind());
        assert!(!super::is_file(&client.handle, &missing).await.unwrap());
    }

    #[tokio::test]
    async fn test_file_size_of_unflushed_file() {
        let store = store_with_file().await;
        let client = test_client(&store, 16).await;
        let uri = ObjectUri::parse("s3://test-bucket/file").unwrap();

        crate::operation::upload::write(&client.handle, &uri, b"more")
            .await
            .unwrap();
        let err = super::file_size(&client.handle, &uri).await.unwrap_err();
        assert_eq!(&ErrorKind::InvalidState, err.kind());
    }
}
