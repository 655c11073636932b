use chrono::{DateTime, Utc};
use std::{fmt, marker::PhantomData};

use super::{ByteReader, ByteWriter, RemoteOperations};
use crate::{
    entry::{Permissions, RemoteEntry},
    error::{Error, Result},
    path,
};

/// Reply code for a file that is unavailable (not found, no access)
pub const FILE_UNAVAILABLE: u32 = 550;

pub type FtpResult<T> = std::result::Result<T, FtpError>;

/// Failure reported by a native FTP client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FtpError {
    /// Negative reply from the server
    #[error("{code} {message}")]
    Reply { code: u32, message: String },
    /// Any errors related to I/O on the control connection
    #[error("I/O: {0}")]
    Io(String),
}

impl FtpError {
    pub fn reply(code: u32, message: impl Into<String>) -> Self {
        Self::Reply {
            code,
            message: message.into(),
        }
    }

    /// Reply code, if the server answered at all
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Reply { code, .. } => Some(*code),
            Self::Io(_) => None,
        }
    }
}

impl From<std::io::Error> for FtpError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpFileKind {
    File,
    Directory,
    SymbolicLink,
    Unknown,
}

/// One parsed line of a native `LIST`/`MLSD` reply
#[derive(Debug, Clone)]
pub struct FtpFile {
    pub name: String,
    pub kind: FtpFileKind,
    pub size: u64,
    pub timestamp: Option<DateTime<Utc>>,
    /// Unix mode bits as printed by the server, e.g. `0o644`
    pub mode: u32,
}

/// Native FTP client handle. This is `async_trait`
///
/// Models the command surface of a control connection: data-channel
/// commands hand out an owned stream, and the final reply of such a command
/// is read with [`complete_pending_command`](FtpClient::complete_pending_command)
/// once that stream has been closed.
#[async_trait]
pub trait FtpClient: Send {
    /// `LIST`/`MLSD` of one directory
    async fn list_files(&mut self, path: &str) -> FtpResult<Vec<FtpFile>>;

    /// `REST` for the next `RETR`
    async fn set_restart_offset(&mut self, offset: u64) -> FtpResult<()>;

    /// `RETR`; `None` when the server did not open a data connection
    async fn retrieve(&mut self, path: &str) -> FtpResult<Option<ByteReader>>;

    /// `STOR`; `None` when the server did not open a data connection
    async fn store(&mut self, path: &str) -> FtpResult<Option<ByteWriter>>;

    /// `APPE`; `None` when the server did not open a data connection
    async fn append(&mut self, path: &str) -> FtpResult<Option<ByteWriter>>;

    /// Reads the reply that concludes a data transfer
    async fn complete_pending_command(&mut self) -> FtpResult<()>;

    /// `RNFR` followed by `RNTO`
    async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()>;

    /// `DELE`
    async fn delete_file(&mut self, path: &str) -> FtpResult<()>;

    /// `MKD`
    async fn make_directory(&mut self, path: &str) -> FtpResult<()>;
}

fn message(error: impl fmt::Display) -> String {
    error.to_string()
}

fn into_entry(base_path: &str, file: FtpFile) -> RemoteEntry {
    let modified = file.timestamp.map_or(0, |t| t.timestamp_millis());

    RemoteEntry::new(
        base_path,
        file.name,
        file.kind == FtpFileKind::Directory,
        file.size,
        modified,
        Permissions::from_mode(file.mode),
    )
}

// Shared by the plain and TLS variants, which differ only in how the data
// channel is prepared.

pub(super) async fn list<C>(client: &mut C, base_path: &str) -> Result<Vec<RemoteEntry>>
where
    C: FtpClient + ?Sized,
{
    let base = path::normalize(base_path);
    debug!("listing {}", base);

    let files = client.list_files(&base).await.map_err(|e| Error::Listing {
        path: base.clone(),
        message: message(e),
    })?;

    Ok(files
        .into_iter()
        .filter(|f| f.name != "." && f.name != "..")
        .map(|f| into_entry(&base, f))
        .collect())
}

pub(super) async fn open_read<C>(client: &mut C, path: &str, offset: u64) -> Result<ByteReader>
where
    C: FtpClient + ?Sized,
{
    let not_found = |message: String| Error::NotFound {
        path: path.to_owned(),
        message,
    };

    if offset > 0 {
        client
            .set_restart_offset(offset)
            .await
            .map_err(|e| not_found(message(e)))?;
    }

    match client.retrieve(path).await {
        Ok(Some(reader)) => Ok(reader),
        Ok(None) => Err(not_found("no data connection".to_owned())),
        Err(e) => Err(not_found(message(e))),
    }
}

pub(super) async fn open_write<C>(client: &mut C, path: &str, append: bool) -> Result<ByteWriter>
where
    C: FtpClient + ?Sized,
{
    let result = if append {
        client.append(path).await
    } else {
        client.store(path).await
    };

    let write_open = |message: String| Error::WriteOpen {
        path: path.to_owned(),
        message,
    };

    match result {
        Ok(Some(writer)) => Ok(writer),
        Ok(None) => Err(write_open("no data connection".to_owned())),
        Err(e) => Err(write_open(message(e))),
    }
}

pub(super) async fn complete_transfer<C>(client: &mut C) -> Result<()>
where
    C: FtpClient + ?Sized,
{
    client
        .complete_pending_command()
        .await
        .map_err(|e| Error::TransferInterrupted(message(e)))
}

pub(super) async fn move_entry<C>(client: &mut C, from: &str, to: &str) -> Result<()>
where
    C: FtpClient + ?Sized,
{
    client.rename(from, to).await.map_err(|e| Error::Move {
        from: from.to_owned(),
        to: to.to_owned(),
        message: message(e),
    })
}

pub(super) async fn remove<C>(client: &mut C, path: &str) -> Result<()>
where
    C: FtpClient + ?Sized,
{
    client.delete_file(path).await.map_err(|e| Error::Remove {
        path: path.to_owned(),
        message: message(e),
    })
}

pub(super) async fn make_directory<C>(client: &mut C, base_path: &str, name: &str) -> Result<()>
where
    C: FtpClient + ?Sized,
{
    let target = path::join(base_path, name);
    client
        .make_directory(&target)
        .await
        .map_err(|e| Error::MakeDirectory {
            path: target.clone(),
            message: message(e),
        })
}

/// Plain FTP variant over any [`FtpClient`] handle
pub struct FtpOperations<C> {
    _client: PhantomData<fn() -> C>,
}

impl<C> FtpOperations<C> {
    pub fn new() -> Self {
        Self {
            _client: PhantomData,
        }
    }
}

impl<C> Default for FtpOperations<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C> RemoteOperations for FtpOperations<C>
where
    C: FtpClient,
{
    type Handle = C;

    async fn list(&self, base_path: &str, handle: &mut C) -> Result<Vec<RemoteEntry>> {
        list(handle, base_path).await
    }

    async fn open_read(&self, path: &str, handle: &mut C, offset: u64) -> Result<ByteReader> {
        open_read(handle, path, offset).await
    }

    async fn open_write(&self, path: &str, handle: &mut C, append: bool) -> Result<ByteWriter> {
        open_write(handle, path, append).await
    }

    async fn complete_transfer(&self, handle: &mut C) -> Result<()> {
        complete_transfer(handle).await
    }

    async fn move_entry(&self, from: &str, to: &str, handle: &mut C) -> Result<()> {
        move_entry(handle, from, to).await
    }

    async fn remove(&self, path: &str, handle: &mut C) -> Result<()> {
        remove(handle, path).await
    }

    async fn make_directory(&self, base_path: &str, name: &str, handle: &mut C) -> Result<()> {
        make_directory(handle, base_path, name).await
    }
}
