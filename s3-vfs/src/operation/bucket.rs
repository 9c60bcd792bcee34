/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::client::Handle;
use crate::error::Error;
use crate::uri::validate_bucket_name;

pub(crate) async fn create_bucket(handle: &Handle, bucket: &str) -> Result<(), Error> {
    validate_bucket_name(bucket)?;
    handle.store().create_bucket(bucket).await?;
    tracing::debug!("created bucket `{bucket}`");
    Ok(())
}

pub(crate) async fn delete_bucket(handle: &Handle, bucket: &str) -> Result<(), Error> {
    validate_bucket_name(bucket)?;
    handle.store().delete_bucket(bucket).await?;
    tracing::debug!("deleted bucket `{bucket}`");
    Ok(())
}

pub(crate) async fn empty_bucket(handle: &Handle, bucket: &str) -> Result<(), Error> {
    validate_bucket_name(bucket)?;
    super::directory::empty_bucket(handle, bucket).await
}

#[cfg(test)]
mod test {
    use crate::error::ErrorKind;
    use crate::store::InMemoryObjectStore;
    use crate::test_util::test_client;

    #[tokio::test]
    async fn test_bucket_name_validated() {
        let store = InMemoryObjectStore::new();
        let client = test_client(&store, 16).await;

        let err = super::create_bucket(&client.handle, "No_Such")
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::InvalidArgument, err.kind());
        assert!(store.keys("No_Such").await.is_empty());
    }

    #[tokio::test]
    async fn test_create_and_delete() {
        let store = InMemoryObjectStore::new();
        let client = test_client(&store, 16).await;

        super::create_bucket(&client.handle, "test-bucket")
            .await
            .unwrap();
        let err = super::create_bucket(&client.handle, "test-bucket")
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::AlreadyExists, err.kind());

        super::delete_bucket(&client.handle, "test-bucket")
            .await
            .unwrap();
        let err = super::delete_bucket(&client.handle, "test-bucket")
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::NotFound, err.kind());
    }
}
