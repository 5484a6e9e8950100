//! Rename and permission integration tests.

#[cfg(test)]
mod tests {
    use aws_sdk_s3::types::Permission;
    use bucketfs::{FileSystem, VirtualFile};

    use crate::{cleanup_bucket, create_test_bucket, object_fs, s3_client};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_rename_file() -> anyhow::Result<()> {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "rename").await;
        let fs = object_fs(&client, &bucket);

        let mut file = fs.create("/old name.txt").await?;
        file.write_str("moved content").await?;
        file.close().await?;

        fs.rename("/old name.txt", "/new name.txt").await?;

        assert!(fs.stat("/old name.txt").await.unwrap_err().is_not_found());
        assert_eq!(fs.stat("/new name.txt").await?.size, 13);

        cleanup_bucket(&client, &bucket).await;
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_rename_directory_tree() -> anyhow::Result<()> {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "renamedir").await;
        let fs = object_fs(&client, &bucket);

        fs.mkdir("/src", 0o755).await?;
        for path in ["/src/a.txt", "/src/nested/b.txt"] {
            let mut file = fs.create(path).await?;
            file.write_str(path).await?;
            file.close().await?;
        }

        fs.rename("/src", "/dst").await?;

        assert!(fs.stat("/src").await.unwrap_err().is_not_found());
        assert!(fs.stat("/dst").await?.is_dir);
        assert_eq!(fs.stat("/dst/nested/b.txt").await?.size, 17);

        cleanup_bucket(&client, &bucket).await;
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_grant_public_read_on_chmod() -> anyhow::Result<()> {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "chmod").await;
        let fs = object_fs(&client, &bucket);

        let mut file = fs.create("/shared.txt").await?;
        file.close().await?;
        fs.chmod("/shared.txt", 0o644).await?;

        let acl = client
            .get_object_acl()
            .bucket(&bucket)
            .key("shared.txt")
            .send()
            .await?;
        assert!(
            acl.grants()
                .iter()
                .any(|g| g.permission() == Some(&Permission::Read)),
            "expected a READ grant"
        );

        cleanup_bucket(&client, &bucket).await;
        Ok(())
    }
}
