//! The filesystem facade.
//!
//! Directories do not exist in the key space. A directory is either a
//! zero-byte marker object whose key ends in `/`, or is implied by any key
//! below its prefix. Every directory-level operation here is derived from
//! those two facts.

use std::sync::Arc;

use async_trait::async_trait;
use bucketfs_core::{
    CannedAcl, FileInfo, FsConfig, ListRequest, ObjectKey, ObjectStore, PathNormalizer,
    UploadProperties,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::error::{FsError, FsResult};
use crate::file::ObjectFile;
use crate::lister::DirectoryLister;
use crate::options::OpenOptions;
use crate::traits::FileSystem;

/// State shared by a filesystem and every handle it opened.
#[derive(Debug)]
pub(crate) struct FsShared {
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) config: FsConfig,
    pub(crate) normalizer: PathNormalizer,
    pub(crate) properties: UploadProperties,
}

impl FsShared {
    pub(crate) fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Resolve `key` to file or directory metadata.
    ///
    /// HEAD answers for objects. On a miss, any key under `key/` makes it an
    /// implicit directory.
    pub(crate) async fn stat(
        &self,
        op: &'static str,
        path: &str,
        key: &ObjectKey,
    ) -> FsResult<FileInfo> {
        if key.is_root() {
            return Ok(FileInfo::dir("/", DateTime::UNIX_EPOCH));
        }

        match self.store.head(self.bucket(), key.as_str()).await {
            Ok(meta) if key.has_dir_hint() => {
                return Ok(FileInfo::dir(key.base_name(), meta.last_modified));
            }
            Ok(meta) => return Ok(FileInfo::file(key.base_name(), meta.size, meta.last_modified)),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(FsError::from_store(op, path, err)),
        }

        let prefix = key.dir_prefix();
        let request = ListRequest {
            prefix: prefix.clone(),
            max_keys: 1,
            ..ListRequest::default()
        };
        let page = self
            .store
            .list(self.bucket(), &request)
            .await
            .map_err(|e| FsError::from_store(op, path, e))?;

        match page.objects.first() {
            Some(marker) if marker.key == prefix => {
                Ok(FileInfo::dir(key.base_name(), marker.last_modified))
            }
            Some(_) => Ok(FileInfo::dir(key.base_name(), DateTime::UNIX_EPOCH)),
            None => Err(FsError::NotExist {
                op,
                path: path.to_owned(),
            }),
        }
    }

    fn lister(&self, path: &str, key: &ObjectKey) -> DirectoryLister {
        DirectoryLister::new(
            self.store.clone(),
            self.bucket(),
            path,
            key,
            self.config.readdir_page_size,
        )
    }
}

/// Path of the child `name` of `path`, for error messages.
fn join_path(path: &str, name: &str) -> String {
    format!("{}/{name}", path.trim_end_matches('/'))
}

/// A hierarchical filesystem over one bucket of an [`ObjectStore`].
///
/// Cloning is cheap; clones share configuration and store.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use bucketfs::{FileSystem, ObjectFs, VirtualFile};
/// use bucketfs_core::FsConfig;
/// use bucketfs_memory::MemoryStore;
///
/// tokio_test::block_on(async {
///     let store = Arc::new(MemoryStore::new());
///     store.create_bucket("media");
///     let fs = ObjectFs::new(store, FsConfig::builder().bucket("media".into()).build());
///
///     let mut file = fs.create("/notes/today.txt").await.unwrap();
///     file.write_all(b"hello").await.unwrap();
///     file.close().await.unwrap();
///
///     let info = fs.stat("/notes").await.unwrap();
///     assert!(info.is_dir);
///     assert_eq!(fs.stat("/notes/today.txt").await.unwrap().size, 5);
/// });
/// ```
#[derive(Debug, Clone)]
pub struct ObjectFs {
    shared: Arc<FsShared>,
}

impl ObjectFs {
    /// Create a filesystem over `config.bucket` of `store`.
    pub fn new(store: Arc<dyn ObjectStore>, config: FsConfig) -> Self {
        debug!(
            scheme = store.scheme(),
            bucket = %config.bucket,
            prefix = ?config.key_prefix,
            "creating ObjectFs"
        );
        let normalizer = config.normalizer();
        let properties = config.upload_properties();
        Self {
            shared: Arc::new(FsShared {
                store,
                config,
                normalizer,
                properties,
            }),
        }
    }

    /// The configuration this filesystem was built with.
    #[must_use]
    pub fn config(&self) -> &FsConfig {
        &self.shared.config
    }

    /// The underlying object store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.shared.store
    }

    /// The key `path` maps to.
    #[must_use]
    pub fn key_for(&self, path: &str) -> ObjectKey {
        self.shared.normalizer.normalize(path)
    }

    fn bucket(&self) -> &str {
        self.shared.bucket()
    }

    async fn delete_key(&self, op: &'static str, path: &str, key: &str) -> FsResult<()> {
        debug!(bucket = self.bucket(), key, "deleting object");
        self.shared
            .store
            .delete(self.bucket(), key)
            .await
            .map_err(|e| FsError::from_store(op, path, e))
    }

    /// Delete every descendant of `key`, then its marker.
    fn remove_tree<'a>(&'a self, path: String, key: ObjectKey) -> BoxFuture<'a, FsResult<()>> {
        async move {
            let mut lister = self.shared.lister(&path, &key);
            let entries = lister.readdir(-1).await?.unwrap_or_default();

            for entry in entries {
                let child = key.join(&entry.name);
                let child_path = join_path(&path, &entry.name);
                if entry.is_dir {
                    self.remove_tree(child_path, child).await?;
                } else {
                    self.delete_key("remove_all", &child_path, child.file_key())
                        .await?;
                }
            }

            let marker = key.dir_prefix();
            if !marker.is_empty() {
                self.delete_key("remove_all", &path, &marker).await?;
            }
            Ok(())
        }
        .boxed()
    }

    /// Move every descendant of `from` under `to`, then the marker if any.
    fn rename_tree<'a>(
        &'a self,
        path: String,
        from: ObjectKey,
        to: ObjectKey,
    ) -> BoxFuture<'a, FsResult<()>> {
        async move {
            let mut lister = self.shared.lister(&path, &from);
            let entries = lister.readdir(-1).await?.unwrap_or_default();

            for entry in entries {
                let src = from.join(&entry.name);
                let dst = to.join(&entry.name);
                let child_path = join_path(&path, &entry.name);
                if entry.is_dir {
                    self.rename_tree(child_path, src, dst).await?;
                } else {
                    self.move_object(&child_path, src.file_key(), dst.file_key())
                        .await?;
                }
            }

            let marker = from.dir_prefix();
            match self.shared.store.head(self.bucket(), &marker).await {
                Ok(_) => self.move_object(&path, &marker, &to.dir_prefix()).await,
                Err(err) if err.is_not_found() => Ok(()),
                Err(err) => Err(FsError::from_store("rename", &path, err)),
            }
        }
        .boxed()
    }

    /// COPY `src` to `dst`, then DELETE `src`.
    ///
    /// A failed DELETE leaves both objects in place.
    async fn move_object(&self, path: &str, src: &str, dst: &str) -> FsResult<()> {
        debug!(bucket = self.bucket(), src, dst, "moving object");
        self.shared
            .store
            .copy(self.bucket(), src, dst)
            .await
            .map_err(|e| FsError::from_store("rename", path, e))?;

        if let Err(err) = self.shared.store.delete(self.bucket(), src).await {
            warn!(
                bucket = self.bucket(),
                src,
                dst,
                error = %err,
                "copied object but failed to delete the source"
            );
            return Err(FsError::from_store("rename", path, err));
        }
        Ok(())
    }
}

#[async_trait]
impl FileSystem for ObjectFs {
    type File = ObjectFile;

    fn name(&self) -> &str {
        self.shared.store.scheme()
    }

    async fn create(&self, path: &str) -> FsResult<ObjectFile> {
        let key = self.key_for(path);
        let properties = self.shared.properties.resolve(key.as_str());
        debug!(bucket = self.bucket(), key = %key, "creating object");

        self.shared
            .store
            .put(self.bucket(), key.as_str(), Bytes::new(), &properties)
            .await
            .map_err(|e| FsError::from_store("create", path, e))?;

        let mut file = ObjectFile::new(self.shared.clone(), path, key);
        file.open_write_stream()?;

        self.shared
            .store
            .wait_until_exists(
                self.bucket(),
                file.key().as_str(),
                self.shared.config.create_timeout(),
            )
            .await
            .map_err(|e| FsError::from_store("create", path, e))?;
        Ok(file)
    }

    async fn mkdir(&self, path: &str, _perm: u32) -> FsResult<()> {
        let key = self.key_for(path);
        if key.is_root() {
            return Ok(());
        }

        let marker = key.dir_prefix();
        let properties = self.shared.properties.resolve(&marker);
        debug!(bucket = self.bucket(), %marker, "creating directory marker");
        self.shared
            .store
            .put(self.bucket(), &marker, Bytes::new(), &properties)
            .await
            .map_err(|e| FsError::from_store("mkdir", path, e))
    }

    async fn mkdir_all(&self, path: &str, perm: u32) -> FsResult<()> {
        self.mkdir(path, perm).await
    }

    async fn open(&self, path: &str) -> FsResult<ObjectFile> {
        self.open_file(path, &OpenOptions::new().read(true)).await
    }

    async fn open_file(&self, path: &str, options: &OpenOptions) -> FsResult<ObjectFile> {
        if options.is_unsupported() {
            return Err(FsError::NotSupported { op: "open" });
        }

        let key = self.key_for(path);
        let mut file = ObjectFile::new(self.shared.clone(), path, key);
        if options.is_write() {
            file.open_write_stream()?;
            return Ok(file);
        }

        let info = self.shared.stat("open", path, file.key()).await?;
        Ok(file.with_info(info))
    }

    async fn remove(&self, path: &str) -> FsResult<()> {
        let key = self.key_for(path);
        if key.is_root() {
            return Err(FsError::NotSupported { op: "remove" });
        }

        let info = self.shared.stat("remove", path, &key).await?;
        let target = if info.is_dir {
            key.dir_prefix()
        } else {
            key.file_key().to_owned()
        };
        self.delete_key("remove", path, &target).await
    }

    async fn remove_all(&self, path: &str) -> FsResult<()> {
        let key = self.key_for(path);
        debug!(bucket = self.bucket(), key = %key, "removing tree");
        self.remove_tree(path.to_owned(), key.clone()).await?;
        if !key.is_root() {
            self.delete_key("remove_all", path, key.file_key()).await?;
        }
        Ok(())
    }

    async fn rename(&self, old: &str, new: &str) -> FsResult<()> {
        let from = self.key_for(old);
        let to = self.key_for(new);
        if from.file_key() == to.file_key() {
            return Ok(());
        }
        if from.is_root() || to.is_root() {
            return Err(FsError::NotSupported { op: "rename" });
        }

        let info = self.shared.stat("rename", old, &from).await?;
        if info.is_dir {
            debug!(bucket = self.bucket(), from = %from, to = %to, "renaming directory");
            self.rename_tree(old.to_owned(), from, to).await
        } else {
            self.move_object(old, from.file_key(), to.file_key()).await
        }
    }

    async fn stat(&self, path: &str) -> FsResult<FileInfo> {
        let key = self.key_for(path);
        self.shared.stat("stat", path, &key).await
    }

    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        let key = self.key_for(path);
        let acl = CannedAcl::from_mode(mode);
        debug!(bucket = self.bucket(), key = %key, %acl, "setting ACL");
        self.shared
            .store
            .set_acl(self.bucket(), key.as_str(), acl)
            .await
            .map_err(|e| FsError::from_store("chmod", path, e))
    }

    async fn chown(&self, _path: &str, _uid: u32, _gid: u32) -> FsResult<()> {
        Err(FsError::NotSupported { op: "chown" })
    }

    async fn chtimes(
        &self,
        _path: &str,
        _atime: DateTime<Utc>,
        _mtime: DateTime<Utc>,
    ) -> FsResult<()> {
        Err(FsError::NotSupported { op: "chtimes" })
    }
}
