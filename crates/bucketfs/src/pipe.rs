//! In-process pipe feeding a background upload.
//!
//! Writes go into one half of a [`tokio::io::duplex`] pair. The other half is
//! handed to [`ObjectStore::upload`] in a spawned task, which reports its
//! terminal result over a oneshot channel.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, ready};

use bucketfs_core::{ObjectProperties, ObjectStore, StoreError, StoreResult, UploadOptions};
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::sync::oneshot;
use tracing::{debug, warn};

pin_project! {
    /// Read half of the pipe as seen by the upload task.
    ///
    /// End of data is only clean once the writer has been closed. If the write
    /// half goes away without that, the body fails with `UnexpectedEof` so the
    /// backend abandons the upload instead of committing a truncated object.
    pub(crate) struct UploadBody {
        #[pin]
        inner: DuplexStream,
        finished: Arc<AtomicBool>,
    }
}

impl AsyncRead for UploadBody {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        let before = buf.filled().len();
        ready!(this.inner.poll_read(cx, buf))?;

        let eof = buf.filled().len() == before && buf.remaining() > 0;
        if eof && !this.finished.load(Ordering::Acquire) {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "write handle dropped before close",
            )));
        }
        Poll::Ready(Ok(()))
    }
}

/// Everything the upload task needs, held until the first write or close.
struct PendingUpload {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    options: UploadOptions,
    body: UploadBody,
}

/// Write side of a streamed upload.
pub(crate) struct UploadStream {
    key: String,
    writer: Option<DuplexStream>,
    pending: Option<PendingUpload>,
    result: Option<oneshot::Receiver<StoreResult<()>>>,
    finished: Arc<AtomicBool>,
}

impl UploadStream {
    /// Prepare an upload of `key`. Nothing is sent until the first write or
    /// close.
    pub(crate) fn new(
        store: Arc<dyn ObjectStore>,
        bucket: &str,
        key: &str,
        properties: ObjectProperties,
        part_size: usize,
    ) -> Self {
        let (writer, reader) = tokio::io::duplex(part_size.max(1));
        let finished = Arc::new(AtomicBool::new(false));
        let body = UploadBody {
            inner: reader,
            finished: finished.clone(),
        };

        Self {
            key: key.to_owned(),
            writer: Some(writer),
            pending: Some(PendingUpload {
                store,
                bucket: bucket.to_owned(),
                options: UploadOptions {
                    properties,
                    part_size,
                    concurrency: 1,
                },
                body,
            }),
            result: None,
            finished,
        }
    }

    /// Spawn the upload task if it is not running yet.
    fn launch(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let (tx, rx) = oneshot::channel();
        let key = self.key.clone();
        debug!(bucket = %pending.bucket, %key, "starting background upload");
        tokio::spawn(async move {
            let result = pending
                .store
                .upload(&pending.bucket, &key, Box::pin(pending.body), &pending.options)
                .await;
            match &result {
                Ok(()) => debug!(bucket = %pending.bucket, %key, "background upload finished"),
                Err(err) => warn!(bucket = %pending.bucket, %key, error = %err, "background upload failed"),
            }
            let _ = tx.send(result);
        });
        self.result = Some(rx);
    }

    /// Push `data` into the pipe, waiting while the buffer is full.
    ///
    /// If the upload task has already failed, its error is returned rather
    /// than the broken pipe.
    pub(crate) async fn write(&mut self, data: &[u8]) -> StoreResult<usize> {
        self.launch();
        let Some(writer) = self.writer.as_mut() else {
            return Err(StoreError::Io {
                kind: io::ErrorKind::BrokenPipe,
                message: "upload stream already finished".to_owned(),
            });
        };

        match writer.write_all(data).await {
            Ok(()) => Ok(data.len()),
            Err(err) => {
                self.writer = None;
                match self.outcome().await {
                    Err(cause) => Err(cause),
                    Ok(()) => Err(err.into()),
                }
            }
        }
    }

    /// Signal end of data and wait for the backend's verdict.
    pub(crate) async fn close(&mut self) -> StoreResult<()> {
        self.launch();
        self.finished.store(true, Ordering::Release);
        self.writer = None;
        self.outcome().await
    }

    async fn outcome(&mut self) -> StoreResult<()> {
        let Some(rx) = self.result.take() else {
            return Ok(());
        };
        rx.await.unwrap_or_else(|_| {
            Err(StoreError::Io {
                kind: io::ErrorKind::Other,
                message: "upload task ended without reporting a result".to_owned(),
            })
        })
    }
}

impl Drop for UploadStream {
    fn drop(&mut self) {
        if self.writer.is_some() && self.pending.is_none() {
            warn!(key = %self.key, "write handle dropped without close, abandoning upload");
        }
    }
}

impl std::fmt::Debug for UploadStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadStream")
            .field("key", &self.key)
            .field("started", &self.pending.is_none())
            .field("open", &self.writer.is_some())
            .finish_non_exhaustive()
    }
}
