use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Enum for connector errors.
///
/// Native failures (FTP replies, SFTP status packets, I/O errors) are kept
/// only as their message so that one error value can both terminate a
/// stream and be stored in a [`TransferResult`](crate::transfer::TransferResult).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The native listing call failed, e.g. the path does not exist
    #[error("Listing {path} failed: {message}")]
    Listing { path: String, message: String },
    /// The path could not be opened for reading
    #[error("No such file {path}: {message}")]
    NotFound { path: String, message: String },
    /// The server refused to open the path for writing
    #[error("Cannot open {path} for writing: {message}")]
    WriteOpen { path: String, message: String },
    #[error("Moving {from} to {to} failed: {message}")]
    Move {
        from: String,
        to: String,
        message: String,
    },
    #[error("Removing {path} failed: {message}")]
    Remove { path: String, message: String },
    #[error("Creating directory {path} failed: {message}")]
    MakeDirectory { path: String, message: String },
    /// Network-level failure while a data stream was open
    #[error("Transfer interrupted: {0}")]
    TransferInterrupted(String),
    /// Failure raised by the caller-supplied input of an upload or mutation
    #[error("Upstream failed: {0}")]
    UpstreamProducer(String),
    /// The connection provider could not supply a handle
    #[error("Connection: {0}")]
    Connection(String),
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::TransferInterrupted(error.to_string())
    }
}
