/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::BTreeSet;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

use crate::client::Handle;
use crate::error::{self, Error};
use crate::uri::{is_path_segment, ObjectUri, DELIMITER};

/// Write the zero byte marker object for directory `uri`.
pub(crate) async fn create_dir(handle: &Handle, uri: &ObjectUri) -> Result<(), Error> {
    uri.require_path()?;
    handle
        .store()
        .put_object(uri.bucket(), &uri.dir_key(), Bytes::new())
        .await?;
    tracing::debug!("created directory marker for `{uri}`");
    Ok(())
}

/// A directory exists if its marker exists or any object lives below it.
pub(crate) async fn is_dir(handle: &Handle, uri: &ObjectUri) -> Result<bool, Error> {
    uri.require_path()?;
    handle.store().prefix_exists(uri.bucket(), &uri.dir_key()).await
}

/// Immediate children of `uri` as sorted, de-duplicated URIs.
pub(crate) async fn ls(handle: &Handle, uri: &ObjectUri) -> Result<Vec<String>, Error> {
    let prefix = uri.dir_key();
    let listing = handle
        .store()
        .list_objects(uri.bucket(), &prefix, Some(DELIMITER))
        .await?;

    let keys = listing
        .objects
        .iter()
        .map(|obj| obj.key.as_str())
        .filter(|key| *key != prefix)
        .chain(listing.common_prefixes.iter().map(String::as_str));

    let mut children = BTreeSet::new();
    for key in keys {
        let Some(name) = key.strip_prefix(prefix.as_str()) else {
            continue;
        };
        let name = name.strip_suffix(DELIMITER).unwrap_or(name);
        if !is_path_segment(name) || name.contains(DELIMITER) {
            tracing::trace!("skipping key `{key}` in `{uri}`, it has no path form");
            continue;
        }
        children.insert(uri.join(name)?.to_string());
    }

    Ok(children.into_iter().collect())
}

/// Delete the object at `uri` and everything below it.
pub(crate) async fn remove_path(handle: &Handle, uri: &ObjectUri) -> Result<(), Error> {
    uri.require_path()?;
    let listing = handle
        .store()
        .list_objects(uri.bucket(), &uri.dir_key(), None)
        .await?;

    // deleting a missing key succeeds, so the file key is always included
    let keys: Vec<String> = std::iter::once(uri.key().to_owned())
        .chain(listing.objects.into_iter().map(|obj| obj.key))
        .collect();

    delete_keys(handle, uri.bucket(), keys)
        .await
        .map_err(|failed| {
            error::io_error(format!(
                "failed to remove {failed} object(s) under `{uri}`, list the path again to see what remains"
            ))
        })
}

/// Delete every object in `bucket`.
pub(crate) async fn empty_bucket(handle: &Handle, bucket: &str) -> Result<(), Error> {
    let listing = handle.store().list_objects(bucket, "", None).await?;
    let keys = listing.objects.into_iter().map(|obj| obj.key).collect();

    delete_keys(handle, bucket, keys).await.map_err(|failed| {
        error::io_error(format!(
            "failed to remove {failed} object(s) from bucket `{bucket}`"
        ))
    })
}

/// Delete `keys` with bounded concurrency. Returns the number of failed deletes on error.
async fn delete_keys(handle: &Handle, bucket: &str, keys: Vec<String>) -> Result<(), usize> {
    let total = keys.len();
    let store = handle.store();

    let failed = stream::iter(keys)
        .map(|key| async move {
            let result = store.delete_object(bucket, &key).await;
            (key, result)
        })
        .buffer_unordered(handle.num_workers())
        .fold(0, |failed, (key, result)| async move {
            match result {
                Ok(()) => {
                    tracing::trace!("deleted `{key}`");
                    failed
                }
                Err(err) => {
                    tracing::warn!("failed to delete `{key}` in `{bucket}`: {err}");
                    failed + 1
                }
            }
        })
        .await;

    tracing::debug!("deleted {} of {total} objects in `{bucket}`", total - failed);
    if failed > 0 {
        return Err(failed);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use crate::error::ErrorKind;
    use crate::store::in_memory::Operation;
    use crate::store::{InMemoryObjectStore, ObjectStore};
    use crate::test_util::test_client;
    use crate::uri::ObjectUri;

    async fn store_with(keys: &[&str]) -> InMemoryObjectStore {
        let store = InMemoryObjectStore::new();
        store.create_bucket("test-bucket").await.unwrap();
        for key in keys {
            store
                .put_object("test-bucket", key, Bytes::from_static(b"data"))
                .await
                .unwrap();
        }
        store
    }

    fn uri(path: &str) -> ObjectUri {
        ObjectUri::parse(&format!("s3://test-bucket/{path}")).unwrap()
    }

    #[tokio::test]
    async fn test_create_dir_is_idempotent() {
        let store = store_with(&[]).await;
        let client = test_client(&store, 16).await;

        super::create_dir(&client.handle, &uri("dir")).await.unwrap();
        super::create_dir(&client.handle, &uri("dir/")).await.unwrap();
        assert_eq!(vec!["dir/".to_owned()], store.keys("test-bucket").await);
        assert!(super::is_dir(&client.handle, &uri("dir")).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_dir_implied_by_prefix() {
        let store = store_with(&["a/b/c/file"]).await;
        let client = test_client(&store, 16).await;

        assert!(super::is_dir(&client.handle, &uri("a")).await.unwrap());
        assert!(super::is_dir(&client.handle, &uri("a/b/c")).await.unwrap());
        assert!(!super::is_dir(&client.handle, &uri("a/b/c/file")).await.unwrap());
        assert!(!super::is_dir(&client.handle, &uri("a/b/x")).await.unwrap());
        // sibling with a shared name prefix is not a child
        assert!(!super::is_dir(&client.handle, &uri("a/b/c/fi")).await.unwrap());
    }

    #[tokio::test]
    async fn test_ls_lists_immediate_children() {
        let store = store_with(&[
            "dir/",
            "dir/file1",
            "dir/file2",
            "dir/sub/",
            "dir/sub/nested",
            "dir/implicit/deep/file",
            "dirx",
        ])
        .await;
        let client = test_client(&store, 16).await;

        let children = super::ls(&client.handle, &uri("dir")).await.unwrap();
        assert_eq!(
            vec![
                "s3://test-bucket/dir/file1",
                "s3://test-bucket/dir/file2",
                "s3://test-bucket/dir/implicit",
                "s3://test-bucket/dir/sub",
            ],
            children
        );

        let root = ObjectUri::parse("s3://test-bucket").unwrap();
        let children = super::ls(&client.handle, &root).await.unwrap();
        assert_eq!(
            vec!["s3://test-bucket/dir", "s3://test-bucket/dirx"],
            children
        );

        assert!(super::ls(&client.handle, &uri("missing"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_ls_skips_keys_without_path_form() {
        let store = store_with(&["dir/a", "dir/..", "dir/./hidden", "dir//x", ".."]).await;
        let client = test_client(&store, 16).await;

        let children = super::ls(&client.handle, &uri("dir")).await.unwrap();
        assert_eq!(vec!["s3://test-bucket/dir/a"], children);

        let root = ObjectUri::parse("s3://test-bucket").unwrap();
        let children = super::ls(&client.handle, &root).await.unwrap();
        assert_eq!(vec!["s3://test-bucket/dir"], children);
    }

    #[tokio::test]
    async fn test_remove_path() {
        let store = store_with(&["dir/", "dir/a", "dir/sub/", "dir/sub/b", "dirx", "other"]).await;
        let client = test_client(&store, 16).await;

        super::remove_path(&client.handle, &uri("dir")).await.unwrap();
        assert!(!super::is_dir(&client.handle, &uri("dir")).await.unwrap());
        assert!(super::ls(&client.handle, &uri("dir/sub"))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            vec!["dirx".to_owned(), "other".to_owned()],
            store.keys("test-bucket").await
        );

        // removing a single file
        super::remove_path(&client.handle, &uri("dirx")).await.unwrap();
        assert_eq!(vec!["other".to_owned()], store.keys("test-bucket").await);
    }

    #[tokio::test]
    async fn test_remove_path_reports_partial_failure() {
        let store = store_with(&["dir", "dir/a", "dir/b"]).await;
        let client = test_client(&store, 16).await;

        store.fail_after(Operation::DeleteObject, 1).await;
        let err = super::remove_path(&client.handle, &uri("dir"))
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::IOError, err.kind());
        assert!(err.to_string().contains("1 object(s)"));
        assert_eq!(1, store.keys("test-bucket").await.len());
    }

    #[tokio::test]
    async fn test_empty_bucket() {
        let store = store_with(&["a", "b/c", "d/"]).await;
        let client = test_client(&store, 16).await;

        super::empty_bucket(&client.handle, "test-bucket")
            .await
            .unwrap();
        assert!(store.keys("test-bucket").await.is_empty());
        store.delete_bucket("test-bucket").await.unwrap();
    }
}
