//! Filesystem and file handle capabilities.

use async_trait::async_trait;
use bucketfs_core::FileInfo;
use chrono::{DateTime, Utc};

use crate::error::FsResult;
use crate::options::{OpenOptions, SeekFrom};

/// Chunk size used by [`VirtualFile::read_to_end`].
const READ_CHUNK: usize = 64 * 1024;

/// Filesystem-wide operations.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Handle type returned by [`open`](Self::open) and friends.
    type File: VirtualFile;

    /// Name of the filesystem implementation.
    fn name(&self) -> &str;

    /// Create (or replace) `path` and return a handle open for writing.
    async fn create(&self, path: &str) -> FsResult<Self::File>;

    /// Create the directory `path`.
    async fn mkdir(&self, path: &str, perm: u32) -> FsResult<()>;

    /// Create the directory `path` along with any missing parents.
    async fn mkdir_all(&self, path: &str, perm: u32) -> FsResult<()>;

    /// Open `path` for reading.
    async fn open(&self, path: &str) -> FsResult<Self::File>;

    /// Open `path` with explicit flags.
    async fn open_file(&self, path: &str, options: &OpenOptions) -> FsResult<Self::File>;

    /// Remove the file or empty directory `path`.
    async fn remove(&self, path: &str) -> FsResult<()>;

    /// Remove `path` and everything below it.
    async fn remove_all(&self, path: &str) -> FsResult<()>;

    /// Move `old` to `new`.
    async fn rename(&self, old: &str, new: &str) -> FsResult<()>;

    /// Metadata for `path`.
    async fn stat(&self, path: &str) -> FsResult<FileInfo>;

    /// Change the permission bits of `path`.
    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()>;

    /// Change the owner of `path`.
    async fn chown(&self, path: &str, uid: u32, gid: u32) -> FsResult<()>;

    /// Change the access and modification times of `path`.
    async fn chtimes(&self, path: &str, atime: DateTime<Utc>, mtime: DateTime<Utc>)
    -> FsResult<()>;
}

/// Per-file operations.
///
/// `read` returns `Ok(0)` at end of file.
#[async_trait]
pub trait VirtualFile: Send {
    /// Path the handle was opened with.
    fn name(&self) -> &str;

    /// Read into `buf` at the current offset.
    async fn read(&mut self, buf: &mut [u8]) -> FsResult<usize>;

    /// Seek to `offset`, then read.
    async fn read_at(&mut self, buf: &mut [u8], offset: i64) -> FsResult<usize>;

    /// Write `data` at the current offset.
    async fn write(&mut self, data: &[u8]) -> FsResult<usize>;

    /// Seek to `offset`, then write.
    async fn write_at(&mut self, data: &[u8], offset: i64) -> FsResult<usize>;

    /// Move the current offset, returning the new one.
    async fn seek(&mut self, pos: SeekFrom) -> FsResult<u64>;

    /// Release the handle, flushing any pending write.
    async fn close(&mut self) -> FsResult<()>;

    /// Next `n` directory entries, or all remaining ones when `n <= 0`.
    /// `Ok(None)` marks the end of the listing.
    async fn readdir(&mut self, n: i64) -> FsResult<Option<Vec<FileInfo>>>;

    /// Like [`readdir`](Self::readdir), returning base names only.
    async fn readdir_names(&mut self, n: i64) -> FsResult<Option<Vec<String>>>;

    /// Metadata for the file.
    async fn stat(&self) -> FsResult<FileInfo>;

    /// Flush buffered state.
    async fn sync(&mut self) -> FsResult<()>;

    /// Resize the file.
    async fn truncate(&mut self, size: u64) -> FsResult<()>;

    /// Read until end of file, appending to `out`. Returns the byte count.
    async fn read_to_end(&mut self, out: &mut Vec<u8>) -> FsResult<usize> {
        let mut buf = vec![0u8; READ_CHUNK];
        let mut total = 0;
        loop {
            let n = self.read(&mut buf).await?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&buf[..n]);
            total += n;
        }
    }

    /// Write all of `data`.
    async fn write_all(&mut self, mut data: &[u8]) -> FsResult<()> {
        while !data.is_empty() {
            let n = self.write(data).await?;
            data = &data[n..];
        }
        Ok(())
    }

    /// Write a string.
    async fn write_str(&mut self, s: &str) -> FsResult<usize> {
        self.write_all(s.as_bytes()).await?;
        Ok(s.len())
    }
}
