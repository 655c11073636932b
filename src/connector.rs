use bytes::Bytes;
use futures::{stream::BoxStream, Stream, StreamExt};
use std::{fmt, sync::Arc};

use crate::{
    connection::{Connection, ConnectionProvider, Lease},
    entry::RemoteEntry,
    error::Result,
    mutation::{self, Mutation},
    operations::RemoteOperations,
    settings::ConnectorSettings,
    transfer::{self, Download, TransferResult},
    traverse,
};

/// Public surface over one protocol variant.
///
/// Every call takes its own handle from the provider and gives it back when
/// the call, or the stream it returned, is done. Calls are independent and
/// may run concurrently; each one drives its handle sequentially.
pub struct Connector<P, O> {
    provider: Arc<P>,
    operations: Arc<O>,
    settings: ConnectorSettings,
}

impl<P, O> Clone for Connector<P, O> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            operations: self.operations.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<P, O> Connector<P, O>
where
    P: ConnectionProvider + 'static,
    O: RemoteOperations<Handle = P::Handle> + 'static,
{
    pub fn new(provider: P, operations: O) -> Self {
        Self {
            provider: Arc::new(provider),
            operations: Arc::new(operations),
            settings: ConnectorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ConnectorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ConnectorSettings {
        &self.settings
    }

    fn connection(&self) -> Connection<P> {
        Connection::new(self.provider.clone())
    }

    /// Lists `base_path` recursively.
    pub fn list(&self, base_path: &str) -> BoxStream<'static, Result<RemoteEntry>> {
        self.list_with(base_path, traverse::always)
    }

    /// Lists `base_path`, descending only into directories accepted by
    /// `branch_selector`.
    pub fn list_with<F>(
        &self,
        base_path: &str,
        branch_selector: F,
    ) -> BoxStream<'static, Result<RemoteEntry>>
    where
        F: FnMut(&RemoteEntry) -> bool + Send + 'static,
    {
        traverse::traverse(
            base_path.to_owned(),
            self.operations.clone(),
            self.connection(),
            self.settings.traverse_options(),
            branch_selector,
        )
        .boxed()
    }

    /// Streams the whole file at `path`.
    pub fn download(&self, path: &str) -> Download {
        self.download_from(path, 0)
    }

    /// Streams the file at `path` starting at byte `offset`.
    pub fn download_from(&self, path: &str, offset: u64) -> Download {
        self.download_with(path, self.settings.chunk_size(), offset)
    }

    pub fn download_with(&self, path: &str, chunk_size: usize, offset: u64) -> Download {
        transfer::download(
            path,
            self.operations.clone(),
            self.connection(),
            chunk_size,
            offset,
        )
    }

    /// Writes `chunks` to `path`, replacing the file or appending to it.
    pub async fn upload<S, E>(&self, path: &str, append: bool, chunks: S) -> TransferResult
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send,
        E: fmt::Display,
    {
        transfer::upload(path, &*self.operations, self.connection(), append, chunks).await
    }

    /// Moves every entry to the path computed by `destination`.
    pub async fn apply_move<S, E, F>(&self, entries: S, destination: F) -> TransferResult
    where
        S: Stream<Item = std::result::Result<RemoteEntry, E>> + Send,
        E: fmt::Display,
        F: FnMut(&RemoteEntry) -> String + Send,
    {
        mutation::apply_to_each(
            entries,
            &*self.operations,
            self.connection(),
            Mutation::Move(Box::new(destination)),
        )
        .await
    }

    /// Removes every entry.
    pub async fn apply_remove<S, E>(&self, entries: S) -> TransferResult
    where
        S: Stream<Item = std::result::Result<RemoteEntry, E>> + Send,
        E: fmt::Display,
    {
        mutation::apply_to_each(
            entries,
            &*self.operations,
            self.connection(),
            Mutation::Remove,
        )
        .await
    }

    /// Creates the directory `name` inside `base_path`.
    pub async fn make_directory(&self, base_path: &str, name: &str) -> Result<()> {
        let mut connection = self.connection();
        let handle = connection.handle().await?;
        self.operations.make_directory(base_path, name, handle).await
    }
}
