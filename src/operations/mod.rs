//! Uniform operation set over the native protocol handles.
//!
//! Each protocol variant binds [`RemoteOperations`] to its own handle type
//! and translates the native results into [`RemoteEntry`] values, byte
//! streams and [`Error`](crate::error::Error). Traversal, transfer and
//! mutation logic only ever sees this trait.

pub mod ftp;
pub mod ftps;
pub mod sftp;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::{entry::RemoteEntry, error::Result};

pub use self::{
    ftp::{FtpClient, FtpError, FtpFile, FtpFileKind, FtpOperations, FtpResult},
    ftps::{FtpsClient, FtpsOperations},
    sftp::SftpOperations,
};

/// Readable data stream opened on a remote file
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Writable data stream opened on a remote file
pub type ByteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Operations one protocol variant provides against its native handle.
/// This is `async_trait`
///
/// Callers never issue two operations concurrently against the same handle;
/// a stream returned by `open_read` or `open_write` is closed before the next
/// operation on that handle.
#[async_trait]
pub trait RemoteOperations: Send + Sync {
    /// Native, already authenticated connection
    type Handle: Send;

    /// Lists the immediate children of `base_path`, without the `.` and `..`
    /// pseudo entries.
    async fn list(&self, base_path: &str, handle: &mut Self::Handle) -> Result<Vec<RemoteEntry>>;

    /// Opens `path` for reading starting at byte `offset`.
    async fn open_read(
        &self,
        path: &str,
        handle: &mut Self::Handle,
        offset: u64,
    ) -> Result<ByteReader>;

    /// Opens `path` for writing, appending to it or truncating it.
    async fn open_write(
        &self,
        path: &str,
        handle: &mut Self::Handle,
        append: bool,
    ) -> Result<ByteWriter>;

    /// Called once a stream from `open_read`/`open_write` has been closed.
    #[allow(unused_variables)]
    async fn complete_transfer(&self, handle: &mut Self::Handle) -> Result<()> {
        Ok(())
    }

    /// Renames or moves one entry.
    async fn move_entry(&self, from: &str, to: &str, handle: &mut Self::Handle) -> Result<()>;

    /// Deletes one entry.
    async fn remove(&self, path: &str, handle: &mut Self::Handle) -> Result<()>;

    /// Creates the directory `name` inside `base_path`.
    async fn make_directory(
        &self,
        base_path: &str,
        name: &str,
        handle: &mut Self::Handle,
    ) -> Result<()>;
}
