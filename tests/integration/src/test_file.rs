//! File handle integration tests.

#[cfg(test)]
mod tests {
    use bucketfs::{FileSystem, OpenOptions, SeekFrom, VirtualFile};

    use crate::{cleanup_bucket, create_test_bucket, object_fs, payload, s3_client};

    const MIB: usize = 1024 * 1024;

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_seek_and_read_small_file() -> anyhow::Result<()> {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "seek").await;
        let fs = object_fs(&client, &bucket);

        let mut file = fs.create("/file1").await?;
        file.write_str("Hello world !").await?;
        file.close().await?;

        let mut file = fs.open("/file1").await?;
        file.seek(SeekFrom::Start(6)).await?;
        let mut buf = [0u8; 5];
        assert_eq!(file.read(&mut buf).await?, 5);
        assert_eq!(&buf, b"world");
        file.close().await?;

        cleanup_bucket(&client, &bucket).await;
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_stream_multipart_upload() -> anyhow::Result<()> {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "multipart").await;
        let fs = object_fs(&client, &bucket);
        let data = payload(10 * MIB, 42);

        let mut file = fs
            .open_file("/big.bin", &OpenOptions::new().write(true))
            .await?;
        for chunk in data.chunks(MIB) {
            file.write_all(chunk).await?;
        }
        file.close().await?;

        let info = fs.stat("/big.bin").await?;
        assert_eq!(info.size, (10 * MIB) as u64);

        let mut file = fs.open("/big.bin").await?;
        file.seek(SeekFrom::Current(i64::try_from(5 * MIB)?)).await?;
        let mut rest = Vec::new();
        file.read_to_end(&mut rest).await?;
        assert!(rest == data[5 * MIB..], "tail should match");

        cleanup_bucket(&client, &bucket).await;
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_stamp_guessed_content_type() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "ctype").await;
        let fs = object_fs(&client, &bucket);

        let mut file = fs.create("/page.html").await.expect("create");
        file.write_str("<html></html>").await.expect("write");
        file.close().await.expect("close");

        let resp = client
            .head_object()
            .bucket(&bucket)
            .key("page.html")
            .send()
            .await
            .expect("head_object");
        assert_eq!(resp.content_type(), Some("text/html"));
        assert_eq!(resp.content_length(), Some(13));

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_create_then_remove_file() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "create").await;
        let fs = object_fs(&client, &bucket);

        let _file = fs.create("/file1").await.expect("create");
        let info = fs.stat("/file1").await.expect("stat");
        assert_eq!(info.size, 0);

        fs.remove("/file1").await.expect("remove");
        assert!(fs.stat("/file1").await.unwrap_err().is_not_found());

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_missing_bucket_on_close() {
        let client = s3_client();
        let fs = object_fs(&client, "bucketfs-does-not-exist");

        let mut file = fs
            .open_file("/file1", &OpenOptions::new().write(true))
            .await
            .expect("open for write");
        let _ = file.write_str("lost").await;
        assert!(file.close().await.is_err());
    }
}
