use std::marker::PhantomData;

use super::{
    ftp::{self, FtpResult},
    ByteReader, ByteWriter, FtpClient, RemoteOperations,
};
use crate::{
    entry::RemoteEntry,
    error::{Error, Result},
    path,
};

/// Native FTP client whose control connection runs over TLS. This is `async_trait`
#[async_trait]
pub trait FtpsClient: FtpClient {
    /// Whether data connections are currently encrypted
    fn is_data_channel_protected(&self) -> bool;

    /// `PBSZ 0` followed by `PROT P`
    async fn protect_data_channel(&mut self) -> FtpResult<()>;
}

async fn ensure_protected<C>(client: &mut C) -> FtpResult<()>
where
    C: FtpsClient + ?Sized,
{
    if client.is_data_channel_protected() {
        return Ok(());
    }

    debug!("protecting data channel");
    client.protect_data_channel().await
}

/// FTP over TLS variant.
///
/// Identical to [`FtpOperations`](super::FtpOperations) except that every
/// command using a data connection first makes sure that connection is
/// private.
pub struct FtpsOperations<C> {
    _client: PhantomData<fn() -> C>,
}

impl<C> FtpsOperations<C> {
    pub fn new() -> Self {
        Self {
            _client: PhantomData,
        }
    }
}

impl<C> Default for FtpsOperations<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C> RemoteOperations for FtpsOperations<C>
where
    C: FtpsClient,
{
    type Handle = C;

    async fn list(&self, base_path: &str, handle: &mut C) -> Result<Vec<RemoteEntry>> {
        ensure_protected(handle).await.map_err(|e| Error::Listing {
            path: path::normalize(base_path),
            message: e.to_string(),
        })?;
        ftp::list(handle, base_path).await
    }

    async fn open_read(&self, path: &str, handle: &mut C, offset: u64) -> Result<ByteReader> {
        ensure_protected(handle).await.map_err(|e| Error::NotFound {
            path: path.to_owned(),
            message: e.to_string(),
        })?;
        ftp::open_read(handle, path, offset).await
    }

    async fn open_write(&self, path: &str, handle: &mut C, append: bool) -> Result<ByteWriter> {
        ensure_protected(handle).await.map_err(|e| Error::WriteOpen {
            path: path.to_owned(),
            message: e.to_string(),
        })?;
        ftp::open_write(handle, path, append).await
    }

    async fn complete_transfer(&self, handle: &mut C) -> Result<()> {
        ftp::complete_transfer(handle).await
    }

    async fn move_entry(&self, from: &str, to: &str, handle: &mut C) -> Result<()> {
        ftp::move_entry(handle, from, to).await
    }

    async fn remove(&self, path: &str, handle: &mut C) -> Result<()> {
        ftp::remove(handle, path).await
    }

    async fn make_directory(&self, base_path: &str, name: &str, handle: &mut C) -> Result<()> {
        ftp::make_directory(handle, base_path, name).await
    }
}
