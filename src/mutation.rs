use futures::{Stream, StreamExt};
use std::{fmt, pin::pin};

use crate::{
    connection::Lease,
    entry::RemoteEntry,
    error::{Error, Result},
    operations::RemoteOperations,
    transfer::TransferResult,
};

/// Computes the destination path of a moved entry
pub type DestinationFn<'f> = Box<dyn FnMut(&RemoteEntry) -> String + Send + 'f>;

/// What to do with each entry reaching a mutation sink
pub enum Mutation<'f> {
    Move(DestinationFn<'f>),
    Remove,
}

impl fmt::Debug for Mutation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move(_) => f.write_str("Move"),
            Self::Remove => f.write_str("Remove"),
        }
    }
}

impl Mutation<'_> {
    async fn apply<O>(
        &mut self,
        entry: &RemoteEntry,
        operations: &O,
        handle: &mut O::Handle,
    ) -> Result<()>
    where
        O: RemoteOperations + ?Sized,
    {
        match self {
            Self::Move(destination) => {
                let to = destination(entry);
                debug!("moving {} to {}", entry.path(), to);
                operations.move_entry(entry.path(), &to, handle).await
            }
            Self::Remove => {
                debug!("removing {}", entry.path());
                operations.remove(entry.path(), handle).await
            }
        }
    }
}

/// Applies `mutation` to every entry of `entries`, one at a time.
///
/// The handle is acquired with the first entry. The first failure, from the
/// input or from the server, stops the sink; the result then counts only the
/// entries applied before it.
pub async fn apply_to_each<O, L, S, E>(
    entries: S,
    operations: &O,
    mut lease: L,
    mut mutation: Mutation<'_>,
) -> TransferResult
where
    O: RemoteOperations<Handle = L::Handle> + ?Sized,
    L: Lease,
    S: Stream<Item = std::result::Result<RemoteEntry, E>> + Send,
    E: fmt::Display,
{
    let mut entries = pin!(entries);
    let mut applied = 0u64;

    while let Some(entry) = entries.next().await {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                return TransferResult::failure(applied, Error::UpstreamProducer(e.to_string()))
            }
        };

        let handle = match lease.handle().await {
            Ok(handle) => handle,
            Err(error) => return TransferResult::failure(applied, error),
        };

        if let Err(error) = mutation.apply(&entry, operations, handle).await {
            return TransferResult::failure(applied, error);
        }
        applied += 1;
    }

    TransferResult::success(applied)
}
