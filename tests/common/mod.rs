#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use std::{
    collections::{BTreeMap, HashSet},
    io,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use remote_fs_connector::{
    operations::{
        ByteReader, ByteWriter, FtpClient, FtpError, FtpFile, FtpFileKind, FtpOperations,
        FtpResult, FtpsClient,
    },
    path, ConnectionProvider, Connector, Error,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

#[derive(Debug, Default)]
pub struct Counters {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub readers_closed: AtomicUsize,
    pub writer_shutdowns: AtomicUsize,
    pub completions: AtomicUsize,
    pub protections: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize) {
        let _ = counter.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn load(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

#[derive(Debug, Default)]
struct FsState {
    nodes: BTreeMap<String, Node>,
    list_calls: Vec<String>,
    unlistable: HashSet<String>,
    fail_reads_after: Option<usize>,
    fail_writes_after: Option<usize>,
    require_protection: bool,
    refuse_connections: bool,
}

fn parent(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_owned(),
        Some((parent, _)) => parent.to_owned(),
    }
}

/// In-memory remote file system shared by every handle it hands out
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    state: Arc<Mutex<FsState>>,
    counters: Arc<Counters>,
}

impl MemoryFs {
    pub fn new() -> Self {
        let fs = Self::default();
        let _ = fs.state().nodes.insert("/".to_owned(), Node::Dir);
        fs
    }

    fn state(&self) -> MutexGuard<'_, FsState> {
        self.state.lock().unwrap()
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn mkdir(&self, path: &str) {
        let _ = self.state().nodes.insert(path::normalize(path), Node::Dir);
    }

    pub fn put(&self, path: &str, content: impl Into<Vec<u8>>) {
        let _ = self
            .state()
            .nodes
            .insert(path::normalize(path), Node::File(content.into()));
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        match self.state().nodes.get(path) {
            Some(Node::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.state().nodes.contains_key(path)
    }

    pub fn list_calls(&self) -> Vec<String> {
        self.state().list_calls.clone()
    }

    pub fn make_unlistable(&self, path: &str) {
        let _ = self.state().unlistable.insert(path.to_owned());
    }

    pub fn fail_reads_after(&self, bytes: usize) {
        self.state().fail_reads_after = Some(bytes);
    }

    pub fn fail_writes_after(&self, bytes: usize) {
        self.state().fail_writes_after = Some(bytes);
    }

    pub fn require_protection(&self) {
        self.state().require_protection = true;
    }

    pub fn refuse_connections(&self) {
        self.state().refuse_connections = true;
    }

    pub fn client(&self) -> MemoryFtp {
        MemoryFtp {
            fs: self.clone(),
            restart: 0,
            protected: false,
        }
    }

    pub fn provider(&self) -> MemoryProvider {
        MemoryProvider { fs: self.clone() }
    }

    pub fn connector(&self) -> Connector<MemoryProvider, FtpOperations<MemoryFtp>> {
        Connector::new(self.provider(), FtpOperations::new())
    }
}

/// Root with 9 files and 3 directories of 10 files each
pub fn scenario_tree() -> MemoryFs {
    let fs = MemoryFs::new();
    for i in 0..9 {
        fs.put(&format!("/file{i}.txt"), format!("root file {i}"));
    }
    for d in 0..3 {
        fs.mkdir(&format!("/dir{d}"));
        for i in 0..10 {
            fs.put(&format!("/dir{d}/sample{i}.bin"), vec![d as u8; i + 1]);
        }
    }
    fs
}

/// Deterministic content of `len` bytes
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Splits `content` into an upload input of `chunk`-sized pieces
pub fn chunked(content: &[u8], chunk: usize) -> Vec<Result<Bytes, io::Error>> {
    content
        .chunks(chunk)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect()
}

fn unavailable(message: &str) -> FtpError {
    FtpError::reply(550, message)
}

/// Native handle onto a [`MemoryFs`]
#[derive(Debug)]
pub struct MemoryFtp {
    fs: MemoryFs,
    restart: u64,
    protected: bool,
}

impl MemoryFtp {
    fn check_data_channel(&self) -> FtpResult<()> {
        if self.fs.state().require_protection && !self.protected {
            return Err(FtpError::reply(521, "data connection must be protected"));
        }
        Ok(())
    }

    fn open_writer(&mut self, path: &str, truncate: bool) -> FtpResult<Option<ByteWriter>> {
        self.check_data_channel()?;
        let path = path::normalize(path);

        let fail_after = {
            let mut state = self.fs.state();
            if !matches!(state.nodes.get(&parent(&path)), Some(Node::Dir)) {
                return Err(FtpError::reply(553, "could not create file"));
            }

            match state.nodes.get_mut(&path) {
                Some(Node::Dir) => return Err(FtpError::reply(553, "is a directory")),
                Some(Node::File(content)) if truncate => content.clear(),
                Some(Node::File(_)) => {}
                None => {
                    let _ = state.nodes.insert(path.clone(), Node::File(Vec::new()));
                }
            }

            state.fail_writes_after
        };

        Ok(Some(Box::new(MemoryWriter {
            fs: self.fs.clone(),
            path,
            written: 0,
            fail_after,
        })))
    }
}

#[async_trait]
impl FtpClient for MemoryFtp {
    async fn list_files(&mut self, path: &str) -> FtpResult<Vec<FtpFile>> {
        self.check_data_channel()?;
        let mut state = self.fs.state();
        state.list_calls.push(path.to_owned());

        if state.unlistable.contains(path) {
            return Err(FtpError::Io("connection reset".to_owned()));
        }
        if !matches!(state.nodes.get(path), Some(Node::Dir)) {
            return Err(unavailable("no such directory"));
        }

        let timestamp = DateTime::from_timestamp(1_700_000_000, 0);
        let dots = [".", ".."].map(|name| FtpFile {
            name: name.to_owned(),
            kind: FtpFileKind::Directory,
            size: 0,
            timestamp,
            mode: 0o755,
        });

        let children = state
            .nodes
            .iter()
            .filter(|(p, _)| p.as_str() != "/" && parent(p) == path)
            .map(|(p, node)| {
                let (kind, size, mode) = match node {
                    Node::Dir => (FtpFileKind::Directory, 4096, 0o755),
                    Node::File(content) => (FtpFileKind::File, content.len() as u64, 0o644),
                };
                FtpFile {
                    name: path::file_name(p).to_owned(),
                    kind,
                    size,
                    timestamp,
                    mode,
                }
            });

        Ok(dots.into_iter().chain(children).collect())
    }

    async fn set_restart_offset(&mut self, offset: u64) -> FtpResult<()> {
        self.restart = offset;
        Ok(())
    }

    async fn retrieve(&mut self, path: &str) -> FtpResult<Option<ByteReader>> {
        self.check_data_channel()?;
        let offset = std::mem::take(&mut self.restart) as usize;

        let state = self.fs.state();
        match state.nodes.get(path) {
            Some(Node::File(content)) => {
                let data = content.get(offset..).unwrap_or_default().to_vec();
                Ok(Some(Box::new(MemoryReader {
                    data,
                    pos: 0,
                    fail_after: state.fail_reads_after,
                    counters: self.fs.counters.clone(),
                })))
            }
            Some(Node::Dir) => Ok(None),
            None => Err(unavailable("no such file")),
        }
    }

    async fn store(&mut self, path: &str) -> FtpResult<Option<ByteWriter>> {
        self.open_writer(path, true)
    }

    async fn append(&mut self, path: &str) -> FtpResult<Option<ByteWriter>> {
        self.open_writer(path, false)
    }

    async fn complete_pending_command(&mut self) -> FtpResult<()> {
        Counters::bump(&self.fs.counters.completions);
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()> {
        let mut state = self.fs.state();
        if !matches!(state.nodes.get(&parent(to)), Some(Node::Dir)) {
            return Err(unavailable("target directory missing"));
        }

        let moved: Vec<String> = state
            .nodes
            .keys()
            .filter(|p| p.as_str() == from || p.starts_with(&format!("{from}/")))
            .cloned()
            .collect();
        if moved.is_empty() {
            return Err(unavailable("no such file"));
        }

        for old in moved {
            if let Some(node) = state.nodes.remove(&old) {
                let new = format!("{to}{}", &old[from.len()..]);
                let _ = state.nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn delete_file(&mut self, path: &str) -> FtpResult<()> {
        let mut state = self.fs.state();
        match state.nodes.get(path) {
            Some(Node::File(_)) => {
                let _ = state.nodes.remove(path);
                Ok(())
            }
            _ => Err(unavailable("no such file")),
        }
    }

    async fn make_directory(&mut self, path: &str) -> FtpResult<()> {
        let mut state = self.fs.state();
        if state.nodes.contains_key(path) {
            return Err(unavailable("already exists"));
        }
        if !matches!(state.nodes.get(&parent(path)), Some(Node::Dir)) {
            return Err(unavailable("parent missing"));
        }
        let _ = state.nodes.insert(path.to_owned(), Node::Dir);
        Ok(())
    }
}

#[async_trait]
impl FtpsClient for MemoryFtp {
    fn is_data_channel_protected(&self) -> bool {
        self.protected
    }

    async fn protect_data_channel(&mut self) -> FtpResult<()> {
        Counters::bump(&self.fs.counters.protections);
        self.protected = true;
        Ok(())
    }
}

struct MemoryReader {
    data: Vec<u8>,
    pos: usize,
    fail_after: Option<usize>,
    counters: Arc<Counters>,
}

impl AsyncRead for MemoryReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let limit = this.fail_after.unwrap_or(usize::MAX).min(this.data.len());

        if this.pos >= limit && this.pos < this.data.len() {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }

        let end = limit.min(this.pos + buf.remaining());
        buf.put_slice(&this.data[this.pos..end]);
        this.pos = end;
        Poll::Ready(Ok(()))
    }
}

impl Drop for MemoryReader {
    fn drop(&mut self) {
        Counters::bump(&self.counters.readers_closed);
    }
}

struct MemoryWriter {
    fs: MemoryFs,
    path: String,
    written: usize,
    fail_after: Option<usize>,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let allowed = this
            .fail_after
            .map_or(buf.len(), |limit| limit.saturating_sub(this.written).min(buf.len()));

        if allowed == 0 && !buf.is_empty() {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "data connection closed",
            )));
        }

        if let Some(Node::File(content)) = this.fs.state().nodes.get_mut(&this.path) {
            content.extend_from_slice(&buf[..allowed]);
        }
        this.written += allowed;
        Poll::Ready(Ok(allowed))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Counters::bump(&self.fs.counters.writer_shutdowns);
        Poll::Ready(Ok(()))
    }
}

/// Hands out [`MemoryFtp`] handles and counts acquisitions and releases
pub struct MemoryProvider {
    fs: MemoryFs,
}

#[async_trait]
impl ConnectionProvider for MemoryProvider {
    type Handle = MemoryFtp;
    type Error = Error;

    async fn acquire(&self) -> Result<MemoryFtp, Error> {
        if self.fs.state().refuse_connections {
            return Err(Error::Connection("connection refused".to_owned()));
        }

        Counters::bump(&self.fs.counters.acquired);
        Ok(self.fs.client())
    }

    fn release(&self, _handle: MemoryFtp) {
        Counters::bump(&self.fs.counters.released);
    }
}
