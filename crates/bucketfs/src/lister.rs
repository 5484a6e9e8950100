//! Paginated directory enumeration.

use std::sync::Arc;

use bucketfs_core::path::base_name;
use bucketfs_core::{FileInfo, ListRequest, ObjectKey, ObjectStore};
use chrono::DateTime;
use tracing::trace;

use crate::error::{FsError, FsResult};

/// Stateful, forward-only listing of one directory.
///
/// Each call to [`readdir`](Self::readdir) continues where the previous one
/// stopped. Once the backend reports the last page, the lister is exhausted
/// and every later call returns `Ok(None)`; listing again needs a new handle.
#[derive(Debug)]
pub(crate) struct DirectoryLister {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    /// Path as given by the caller, for error context.
    path: String,
    prefix: String,
    continuation_token: Option<String>,
    exhausted: bool,
    page_size: usize,
}

impl DirectoryLister {
    pub(crate) fn new(
        store: Arc<dyn ObjectStore>,
        bucket: &str,
        path: &str,
        key: &ObjectKey,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            bucket: bucket.to_owned(),
            path: path.to_owned(),
            prefix: key.dir_prefix(),
            continuation_token: None,
            exhausted: false,
            page_size: page_size.max(1),
        }
    }

    /// Return up to `n` entries, or every remaining entry when `n <= 0`.
    ///
    /// `Ok(None)` marks the end of the listing.
    pub(crate) async fn readdir(&mut self, n: i64) -> FsResult<Option<Vec<FileInfo>>> {
        if self.exhausted {
            return Ok(None);
        }

        match usize::try_from(n) {
            Ok(n) if n > 0 => self.next_page(n).await.map(Some),
            _ => {
                let mut entries = Vec::new();
                while !self.exhausted {
                    entries.extend(self.next_page(self.page_size).await?);
                }
                Ok(Some(entries))
            }
        }
    }

    /// Like [`readdir`](Self::readdir), keeping only the base names.
    pub(crate) async fn readdir_names(&mut self, n: i64) -> FsResult<Option<Vec<String>>> {
        Ok(self
            .readdir(n)
            .await?
            .map(|entries| entries.into_iter().map(|e| e.name).collect()))
    }

    /// Fetch pages until one yields an entry or the listing ends.
    async fn next_page(&mut self, max_keys: usize) -> FsResult<Vec<FileInfo>> {
        loop {
            let mut request = ListRequest::children(self.prefix.clone(), max_keys);
            request.continuation_token = self.continuation_token.take();

            let page = self
                .store
                .list(&self.bucket, &request)
                .await
                .map_err(|e| FsError::from_store("readdir", &self.path, e))?;

            self.continuation_token = page.next_continuation_token;
            if !page.is_truncated || self.continuation_token.is_none() {
                self.exhausted = true;
            }

            let mut entries: Vec<FileInfo> = page
                .common_prefixes
                .iter()
                .map(|cp| FileInfo::dir(base_name(cp), DateTime::UNIX_EPOCH))
                .collect();
            entries.extend(
                page.objects
                    .iter()
                    .filter(|obj| obj.key != self.prefix && !obj.key.ends_with('/'))
                    .map(|obj| FileInfo::file(base_name(&obj.key), obj.size, obj.last_modified)),
            );

            trace!(
                bucket = %self.bucket,
                prefix = %self.prefix,
                entries = entries.len(),
                exhausted = self.exhausted,
                "listed page"
            );

            if !entries.is_empty() || self.exhausted {
                return Ok(entries);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bucketfs_core::ObjectProperties;
    use bucketfs_memory::MemoryStore;
    use bytes::Bytes;

    use super::*;

    const BUCKET: &str = "lister-bucket";

    async fn store_with(keys: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.create_bucket(BUCKET);
        for key in keys {
            store
                .put(BUCKET, key, Bytes::from_static(b"x"), &ObjectProperties::default())
                .await
                .unwrap();
        }
        store
    }

    fn lister(store: &Arc<MemoryStore>, dir: &str) -> DirectoryLister {
        DirectoryLister::new(store.clone(), BUCKET, dir, &ObjectKey::new(dir), 100)
    }

    fn names(entries: &[FileInfo]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_should_page_through_directories() {
        let store = store_with(&["a/", "b/", "c/"]).await;
        let mut lister = lister(&store, "");

        let first = lister.readdir(2).await.unwrap().unwrap();
        assert_eq!(names(&first), ["a", "b"]);
        assert!(first.iter().all(|e| e.is_dir));

        let second = lister.readdir(2).await.unwrap().unwrap();
        assert_eq!(names(&second), ["c"]);
        assert!(lister.readdir(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_list_everything_when_n_is_not_positive() {
        let store = store_with(&["d/", "d/x", "d/y/z", "d/z", "other"]).await;
        let mut lister = DirectoryLister::new(store.clone(), BUCKET, "/d", &ObjectKey::new("d"), 1);

        let entries = lister.readdir(0).await.unwrap().unwrap();
        assert_eq!(names(&entries), ["x", "y", "z"]);
        assert_eq!(entries[0].size, 1);
        assert!(entries[1].is_dir);
        assert!(lister.readdir(-1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_skip_own_marker_without_returning_empty_page() {
        let store = store_with(&["d/", "d/file1"]).await;
        let mut lister = lister(&store, "d/");

        let page = lister.readdir(1).await.unwrap().unwrap();
        assert_eq!(names(&page), ["file1"]);
        assert!(lister.readdir(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_return_empty_listing_for_empty_directory() {
        let store = store_with(&["d/"]).await;
        let mut lister = lister(&store, "d");
        assert_eq!(lister.readdir(-1).await.unwrap(), Some(Vec::new()));
        assert!(lister.readdir(-1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_project_names() {
        let store = store_with(&["d/one", "d/two/"]).await;
        let mut lister = lister(&store, "d");
        let names = lister.readdir_names(-1).await.unwrap().unwrap();
        assert_eq!(names, ["two", "one"]);
    }
}
