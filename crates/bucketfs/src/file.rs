//! File handles over single objects.
//!
//! A handle owns at most one stream. Reads are served by short-lived ranged
//! GETs starting at the logical offset, so seeking never touches the network.
//! Writes go through an [`UploadStream`] whose result is only final once the
//! handle is closed.

use std::fmt;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bucketfs_core::{ByteRange, FileInfo, ObjectKey, ObjectReader, StoreError};
use tokio::io::AsyncReadExt;
use tracing::{debug, trace};

use crate::error::{FsError, FsResult};
use crate::fs::FsShared;
use crate::lister::DirectoryLister;
use crate::options::SeekFrom;
use crate::pipe::UploadStream;
use crate::traits::VirtualFile;

enum StreamState {
    Unopened,
    /// Open for reading; `range` is the GET currently being drained.
    Reading {
        range: Option<ObjectReader>,
    },
    Writing(UploadStream),
    Closed,
}

impl fmt::Debug for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unopened => f.write_str("Unopened"),
            Self::Reading { range } => f
                .debug_struct("Reading")
                .field("range_open", &range.is_some())
                .finish(),
            Self::Writing(stream) => f.debug_tuple("Writing").field(stream).finish(),
            Self::Closed => f.write_str("Closed"),
        }
    }
}

/// An open file or directory of an [`ObjectFs`](crate::ObjectFs).
///
/// Handles are not shared: every method takes `&mut self`. Always
/// [`close`](VirtualFile::close) a handle opened for writing, since that is
/// where the upload is committed and where its failure is reported.
#[derive(Debug)]
pub struct ObjectFile {
    shared: Arc<FsShared>,
    name: String,
    key: ObjectKey,
    offset: u64,
    size: Option<u64>,
    info: Option<FileInfo>,
    state: StreamState,
    lister: Option<DirectoryLister>,
    upload_error: Option<StoreError>,
}

impl ObjectFile {
    pub(crate) fn new(shared: Arc<FsShared>, name: &str, key: ObjectKey) -> Self {
        Self {
            shared,
            name: name.to_owned(),
            key,
            offset: 0,
            size: None,
            info: None,
            state: StreamState::Unopened,
            lister: None,
            upload_error: None,
        }
    }

    /// Attach metadata from a prior stat.
    pub(crate) fn with_info(mut self, info: FileInfo) -> Self {
        if !info.is_dir {
            self.size = Some(info.size);
        }
        self.info = Some(info);
        self
    }

    /// The object key behind this handle.
    #[must_use]
    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    /// Current logical offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether the handle was opened on a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.info.as_ref().is_some_and(|info| info.is_dir)
    }

    /// Whether the handle is open for writing.
    #[must_use]
    pub fn is_writing(&self) -> bool {
        matches!(self.state, StreamState::Writing(_))
    }

    /// Switch the handle to writing.
    pub(crate) fn open_write_stream(&mut self) -> FsResult<()> {
        match self.state {
            StreamState::Reading { .. } | StreamState::Writing(_) => Err(FsError::AlreadyOpened),
            StreamState::Closed => Err(FsError::Closed),
            StreamState::Unopened => {
                let properties = self.shared.properties.resolve(self.key.as_str());
                let stream = UploadStream::new(
                    self.shared.store.clone(),
                    self.shared.bucket(),
                    self.key.as_str(),
                    properties,
                    self.shared.config.part_size,
                );
                debug!(key = %self.key, "opened write stream");
                self.state = StreamState::Writing(stream);
                Ok(())
            }
        }
    }

    fn upload_failed(&self, source: StoreError) -> FsError {
        FsError::Upload {
            key: self.key.to_string(),
            source,
        }
    }

    /// Object size, fetched once with HEAD.
    async fn ensure_size(&mut self, op: &'static str) -> FsResult<u64> {
        if let Some(size) = self.size {
            return Ok(size);
        }
        let meta = self
            .shared
            .store
            .head(self.shared.bucket(), self.key.as_str())
            .await
            .map_err(|e| FsError::from_store(op, &self.name, e))?;
        self.size = Some(meta.size);
        Ok(meta.size)
    }

    fn take_range(&mut self) -> Option<ObjectReader> {
        match &mut self.state {
            StreamState::Reading { range } => range.take(),
            _ => None,
        }
    }

    /// GET `[offset, offset + len - 1]`, clamped to the object.
    async fn open_range(&self, size: u64, len: usize) -> FsResult<ObjectReader> {
        let len = u64::try_from(len).unwrap_or(u64::MAX);
        let end = self.offset.saturating_add(len - 1).min(size - 1);
        let range = ByteRange::new(self.offset, end);
        trace!(key = %self.key, %range, "opening range");
        self.shared
            .store
            .get(self.shared.bucket(), self.key.as_str(), Some(range))
            .await
            .map_err(|e| FsError::from_store("read", &self.name, e))
    }

    fn check_open(&self, op: &'static str) -> FsResult<()> {
        match self.state {
            StreamState::Closed => Err(FsError::Closed),
            StreamState::Writing(_) => Err(FsError::NotSupported { op }),
            _ => Ok(()),
        }
    }

    /// Listing state, created on the first readdir.
    fn lister(&mut self) -> FsResult<&mut DirectoryLister> {
        if matches!(self.state, StreamState::Closed) {
            return Err(FsError::Closed);
        }
        Ok(self.lister.get_or_insert_with(|| {
            DirectoryLister::new(
                self.shared.store.clone(),
                self.shared.bucket(),
                &self.name,
                &self.key,
                self.shared.config.readdir_page_size,
            )
        }))
    }
}

#[async_trait]
impl VirtualFile for ObjectFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        self.check_open("read")?;
        if self.is_dir() {
            return Err(FsError::IsDirectory {
                path: self.name.clone(),
            });
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let size = self.ensure_size("read").await?;
        loop {
            if self.offset >= size {
                self.state = StreamState::Reading { range: None };
                return Ok(0);
            }

            let (mut reader, fresh) = match self.take_range() {
                Some(reader) => (reader, false),
                None => (self.open_range(size, buf.len()).await?, true),
            };
            self.state = StreamState::Reading { range: None };

            let n = reader
                .read(buf)
                .await
                .map_err(|e| FsError::from_store("read", &self.name, e.into()))?;
            if n == 0 {
                if fresh {
                    return Err(FsError::from_store(
                        "read",
                        &self.name,
                        StoreError::Io {
                            kind: io::ErrorKind::UnexpectedEof,
                            message: format!("object ended before offset {}", self.offset),
                        },
                    ));
                }
                // End of this range; continue with a fresh one.
                continue;
            }

            self.offset += n as u64;
            if self.offset < size {
                self.state = StreamState::Reading {
                    range: Some(reader),
                };
            }
            return Ok(n);
        }
    }

    async fn read_at(&mut self, buf: &mut [u8], offset: i64) -> FsResult<usize> {
        self.seek(SeekFrom::Start(offset)).await?;
        self.read(buf).await
    }

    async fn write(&mut self, data: &[u8]) -> FsResult<usize> {
        if let Some(err) = self.upload_error.clone() {
            return Err(self.upload_failed(err));
        }

        let result = match &mut self.state {
            StreamState::Closed => return Err(FsError::Closed),
            StreamState::Writing(stream) => stream.write(data).await,
            _ => return Err(FsError::NotSupported { op: "write" }),
        };

        match result {
            Ok(n) => {
                self.offset += n as u64;
                Ok(n)
            }
            Err(err) => {
                self.upload_error = Some(err.clone());
                Err(self.upload_failed(err))
            }
        }
    }

    async fn write_at(&mut self, data: &[u8], offset: i64) -> FsResult<usize> {
        self.seek(SeekFrom::Start(offset)).await?;
        self.write(data).await
    }

    async fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        self.check_open("seek")?;

        let current = i64::try_from(self.offset).unwrap_or(i64::MAX);
        let target = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::Current(delta) => current.saturating_add(delta),
            SeekFrom::End(_) if self.is_dir() => {
                return Err(FsError::IsDirectory {
                    path: self.name.clone(),
                });
            }
            SeekFrom::End(delta) => {
                let size = self.ensure_size("seek").await?;
                i64::try_from(size).unwrap_or(i64::MAX).saturating_sub(delta)
            }
        };
        let offset = u64::try_from(target).map_err(|_| FsError::InvalidSeek { offset: target })?;

        if let StreamState::Reading { range } = &mut self.state {
            *range = None;
        }
        self.offset = offset;
        Ok(offset)
    }

    async fn close(&mut self) -> FsResult<()> {
        let state = std::mem::replace(&mut self.state, StreamState::Closed);
        self.lister = None;

        if let StreamState::Writing(mut stream) = state {
            match stream.close().await {
                Ok(()) => debug!(key = %self.key, size = self.offset, "write handle closed"),
                Err(err) => {
                    if self.upload_error.is_none() {
                        self.upload_error = Some(err);
                    }
                }
            }
        }

        match self.upload_error.clone() {
            Some(err) => Err(self.upload_failed(err)),
            None => Ok(()),
        }
    }

    async fn readdir(&mut self, n: i64) -> FsResult<Option<Vec<FileInfo>>> {
        self.lister()?.readdir(n).await
    }

    async fn readdir_names(&mut self, n: i64) -> FsResult<Option<Vec<String>>> {
        self.lister()?.readdir_names(n).await
    }

    async fn stat(&self) -> FsResult<FileInfo> {
        self.shared.stat("stat", &self.name, &self.key).await
    }

    async fn sync(&mut self) -> FsResult<()> {
        Ok(())
    }

    async fn truncate(&mut self, _size: u64) -> FsResult<()> {
        Err(FsError::NotSupported { op: "truncate" })
    }
}
