//! Directory emulation integration tests.

#[cfg(test)]
mod tests {
    use bucketfs::{FileSystem, VirtualFile};

    use crate::{cleanup_bucket, create_test_bucket, object_fs, s3_client};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_remove_all_nested_directories() -> anyhow::Result<()> {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "removeall").await;
        let fs = object_fs(&client, &bucket);

        fs.mkdir("/dir1", 0o755).await?;
        fs.mkdir("/dir1/dir2", 0o755).await?;
        let mut file = fs.create("/dir1/file1").await?;
        file.close().await?;

        fs.remove_all("/dir1").await?;

        let mut root = fs.open("/").await?;
        let entries = root.readdir(-1).await?.unwrap_or_default();
        assert!(entries.is_empty(), "root should be empty: {entries:?}");

        let resp = client.list_objects_v2().bucket(&bucket).send().await?;
        assert_eq!(resp.key_count(), Some(0));

        cleanup_bucket(&client, &bucket).await;
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_stat_mkdir_all_directory() -> anyhow::Result<()> {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "mkdirall").await;
        let fs = object_fs(&client, &bucket);

        fs.mkdir_all("/dir3/dir4", 0o755).await?;
        let info = fs.stat("/dir3/dir4").await?;
        assert!(info.is_dir);
        assert_eq!(info.name, "dir4");
        assert!(fs.stat("/dir3").await?.is_dir);

        cleanup_bucket(&client, &bucket).await;
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_paginate_readdir() -> anyhow::Result<()> {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "readdir").await;
        let fs = object_fs(&client, &bucket);

        for dir in ["/a", "/b", "/c"] {
            fs.mkdir(dir, 0o755).await?;
        }

        let mut root = fs.open("/").await?;
        let first = root.readdir_names(2).await?.unwrap_or_default();
        assert_eq!(first, ["a", "b"]);
        let second = root.readdir_names(2).await?.unwrap_or_default();
        assert_eq!(second, ["c"]);
        assert!(root.readdir_names(2).await?.is_none());

        cleanup_bucket(&client, &bucket).await;
        Ok(())
    }
}
