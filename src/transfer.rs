//! Chunked download and upload over [`RemoteOperations`] streams.

use bytes::Bytes;
use futures::{
    stream::{self, BoxStream},
    Stream, StreamExt,
};
use std::{
    fmt,
    future::Future,
    io,
    ops::Deref,
    pin::{pin, Pin},
    task::{Context, Poll},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    runtime::Handle,
    sync::oneshot,
};

use crate::{
    connection::Lease,
    error::{Error, Result},
    operations::{ByteReader, RemoteOperations},
};

/// Chunk size used when none is configured
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Outcome of a transfer or of a batch of mutations.
///
/// `count` is bytes for transfers and entries for mutations. A failure keeps
/// the progress made before the error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferResult {
    Success { count: u64 },
    Failure { count: u64, error: Error },
}

impl TransferResult {
    pub fn success(count: u64) -> Self {
        Self::Success { count }
    }

    pub fn failure(count: u64, error: Error) -> Self {
        Self::Failure { count, error }
    }

    pub fn count(&self) -> u64 {
        match self {
            Self::Success { count } | Self::Failure { count, .. } => *count,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    /// Converts into a `Result`, dropping the progress of a failure
    pub fn into_result(self) -> Result<u64> {
        match self {
            Self::Success { count } => Ok(count),
            Self::Failure { error, .. } => Err(error),
        }
    }
}

/// Counts progress and delivers exactly one [`TransferResult`].
///
/// Dropped without an explicit outcome, it reports success with the progress
/// so far: the consumer stopped pulling.
struct Reporter {
    tx: Option<oneshot::Sender<TransferResult>>,
    count: u64,
}

impl Reporter {
    fn new() -> (Self, PendingResult) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Some(tx),
                count: 0,
            },
            PendingResult { rx },
        )
    }

    fn add(&mut self, n: usize) {
        self.count += n as u64;
    }

    fn finish(&mut self, result: TransferResult) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(result);
        }
    }

    fn succeed(&mut self) {
        self.finish(TransferResult::success(self.count));
    }

    /// Moves the pending outcome into a new reporter, leaving this one inert.
    fn hand_off(&mut self) -> Self {
        Self {
            tx: self.tx.take(),
            count: self.count,
        }
    }

    fn fail(&mut self, error: Error) -> Error {
        self.finish(TransferResult::failure(self.count, error.clone()));
        error
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if self.tx.is_some() {
            debug!("transfer cancelled after {} bytes", self.count);
            self.succeed();
        }
    }
}

/// The eventual [`TransferResult`] of a [`Download`]
pub struct PendingResult {
    rx: oneshot::Receiver<TransferResult>,
}

impl Future for PendingResult {
    type Output = TransferResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|result| {
            result.unwrap_or_else(|_| {
                TransferResult::failure(
                    0,
                    Error::TransferInterrupted("transfer ended without a result".to_owned()),
                )
            })
        })
    }
}

/// Lazy sequence of chunks read from a remote file, plus its eventual result.
///
/// Nothing is opened until the stream is first polled. The result resolves
/// once the stream has ended, failed or been dropped.
pub struct Download {
    chunks: BoxStream<'static, Result<Bytes>>,
    result: PendingResult,
}

impl Download {
    pub fn split(self) -> (BoxStream<'static, Result<Bytes>>, PendingResult) {
        (self.chunks, self.result)
    }
}

impl Stream for Download {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.chunks.poll_next_unpin(cx)
    }
}

/// Operations and lease a download reads through, plus the open reader
struct Source<A, L> {
    operations: A,
    lease: L,
    reader: Option<ByteReader>,
}

impl<A, L> Source<A, L>
where
    A: Deref + Send + Sync,
    A::Target: RemoteOperations<Handle = L::Handle>,
    L: Lease,
{
    /// Drops the reader, then concludes the transfer on the handle.
    async fn close(&mut self) -> Result<()> {
        if self.reader.take().is_none() {
            return Ok(());
        }

        let handle = self.lease.handle().await?;
        self.operations.complete_transfer(handle).await
    }
}

struct ReadState<A, L>
where
    A: Deref + Send + Sync + 'static,
    A::Target: RemoteOperations<Handle = L::Handle>,
    L: Lease + 'static,
{
    path: String,
    chunk_size: usize,
    offset: u64,
    finished: bool,
    source: Option<Source<A, L>>,
    reporter: Reporter,
}

impl<A, L> ReadState<A, L>
where
    A: Deref + Send + Sync + 'static,
    A::Target: RemoteOperations<Handle = L::Handle>,
    L: Lease + 'static,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        match self.read().await {
            Ok(Some(chunk)) => {
                self.reporter.add(chunk.len());
                Ok(Some(chunk))
            }
            Ok(None) => {
                self.finished = true;
                self.close().await.map_err(|e| self.reporter.fail(e))?;
                self.reporter.succeed();
                Ok(None)
            }
            Err(error) => {
                self.finished = true;
                if let Err(e) = self.close().await {
                    warn!("closing {} after failure: {}", self.path, e);
                }
                Err(self.reporter.fail(error))
            }
        }
    }

    async fn read(&mut self) -> Result<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };

        let reader = match source.reader.take() {
            Some(reader) => reader,
            None => {
                debug!("opening {} at offset {}", self.path, self.offset);
                let handle = source.lease.handle().await?;
                source
                    .operations
                    .open_read(&self.path, handle, self.offset)
                    .await?
            }
        };
        let reader = source.reader.insert(reader);

        let mut buf = vec![0; self.chunk_size];
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }

        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }

    async fn close(&mut self) -> Result<()> {
        match self.source.as_mut() {
            Some(source) => {
                debug!("closing {}", self.path);
                source.close().await
            }
            None => Ok(()),
        }
    }
}

/// A download dropped mid-transfer still has its reader open. The transfer
/// is concluded on the runtime before the handle goes back and the result
/// is reported.
impl<A, L> Drop for ReadState<A, L>
where
    A: Deref + Send + Sync + 'static,
    A::Target: RemoteOperations<Handle = L::Handle>,
    L: Lease + 'static,
{
    fn drop(&mut self) {
        let Some(mut source) = self.source.take() else {
            return;
        };
        if source.reader.is_none() {
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("no runtime to conclude cancelled transfer of {}", self.path);
            return;
        };

        let reporter = self.reporter.hand_off();
        let path = std::mem::take(&mut self.path);

        let _ = runtime.spawn(async move {
            if let Err(e) = source.close().await {
                warn!("closing cancelled transfer of {}: {}", path, e);
            }
            drop(source);
            drop(reporter);
        });
    }
}

/// Streams the file at `path` in chunks of at most `chunk_size` bytes,
/// starting at byte `offset`.
///
/// A read error ends the stream with that error; the result then carries
/// the bytes delivered before it. The reader is closed and the transfer
/// concluded on every exit path, including a consumer that stops early.
pub fn download<A, L>(
    path: impl Into<String>,
    operations: A,
    lease: L,
    chunk_size: usize,
    offset: u64,
) -> Download
where
    A: Deref + Send + Sync + 'static,
    A::Target: RemoteOperations<Handle = L::Handle>,
    L: Lease + 'static,
{
    let (reporter, result) = Reporter::new();
    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };

    let state = ReadState {
        path: path.into(),
        chunk_size,
        offset,
        finished: false,
        source: Some(Source {
            operations,
            lease,
            reader: None,
        }),
        reporter,
    };

    let chunks = stream::try_unfold(state, |mut state| async move {
        let chunk = state.next_chunk().await?;
        Ok::<_, Error>(chunk.map(|chunk| (chunk, state)))
    })
    .boxed();

    Download { chunks, result }
}

/// Writes `chunks` to `path` in order and reports how many bytes were written.
///
/// Each chunk is written completely before the next one is requested. A
/// failing input or a failing write ends the upload with a failure result
/// carrying the bytes the writer accepted, including those of a partly
/// written chunk; the writer is closed exactly once either way.
pub async fn upload<O, L, S, E>(
    path: &str,
    operations: &O,
    mut lease: L,
    append: bool,
    chunks: S,
) -> TransferResult
where
    O: RemoteOperations<Handle = L::Handle> + ?Sized,
    L: Lease,
    S: Stream<Item = std::result::Result<Bytes, E>> + Send,
    E: fmt::Display,
{
    let handle = match lease.handle().await {
        Ok(handle) => handle,
        Err(error) => return TransferResult::failure(0, error),
    };

    debug!("opening {} for writing, append: {}", path, append);
    let mut writer = match operations.open_write(path, handle, append).await {
        Ok(writer) => writer,
        Err(error) => return TransferResult::failure(0, error),
    };

    let mut chunks = pin!(chunks);
    let mut written = 0u64;

    let outcome = 'chunks: loop {
        let chunk = match chunks.next().await {
            None => break Ok(()),
            Some(Err(e)) => break Err(Error::UpstreamProducer(e.to_string())),
            Some(Ok(chunk)) => chunk,
        };

        let mut pos = 0;
        while pos < chunk.len() {
            match writer.write(&chunk[pos..]).await {
                Ok(0) => {
                    break 'chunks Err(Error::from(io::Error::from(io::ErrorKind::WriteZero)))
                }
                Ok(n) => {
                    pos += n;
                    written += n as u64;
                }
                Err(e) => break 'chunks Err(Error::from(e)),
            }
        }
    };

    let shutdown = writer.shutdown().await.map_err(Error::from);
    drop(writer);
    let completion = operations.complete_transfer(handle).await;

    debug!("closed {} after {} bytes", path, written);

    match (outcome, shutdown, completion) {
        (Ok(()), Ok(()), Ok(())) => TransferResult::success(written),
        (Err(error), shutdown, completion) => {
            if let Err(e) = shutdown.and(completion) {
                warn!("closing {} after failure: {}", path, e);
            }
            TransferResult::failure(written, error)
        }
        (Ok(()), Err(error), _) | (Ok(()), Ok(()), Err(error)) => {
            TransferResult::failure(written, error)
        }
    }
}
