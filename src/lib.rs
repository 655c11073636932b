//! Streaming access to remote file servers over FTP, FTP over TLS and SFTP.
//!
//! One [`RemoteOperations`] implementation per protocol adapts the native
//! handle; directory traversal, chunked transfers and batched mutations are
//! written once on top of it and exposed through [`Connector`].

#[macro_use]
extern crate log;
#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate async_trait;

pub mod connection;
pub mod connector;
pub mod entry;
mod error;
pub mod mutation;
/// Protocol variants
pub mod operations;
pub mod path;
pub mod settings;
pub mod transfer;
pub mod traverse;

pub use connection::{Connection, ConnectionProvider, Lease};
pub use connector::Connector;
pub use entry::{Permissions, RemoteEntry};
pub use error::{Error, Result};
pub use operations::RemoteOperations;
pub use settings::ConnectorSettings;
pub use transfer::{Download, PendingResult, TransferResult};
