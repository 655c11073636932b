//! Recursive, prunable directory listing.
//!
//! The walk keeps a queue of directories still to be listed and only lists
//! the next one once every entry of the previous listing has been pulled by
//! the consumer, so memory use is bounded by the largest single directory.

use futures::{stream, Stream};
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, ops::Deref};

use crate::{
    connection::Lease,
    entry::RemoteEntry,
    error::{Error, Result},
    operations::RemoteOperations,
};

/// Order in which discovered directories are listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalOrder {
    /// The subtree of a directory is walked before its later siblings
    #[default]
    DepthFirst,
    /// All directories of one level are listed before the next level
    BreadthFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraverseOptions {
    pub order: TraversalOrder,
    /// Whether directories the walk descends into are emitted themselves
    pub emit_traversed_directories: bool,
}

impl Default for TraverseOptions {
    fn default() -> Self {
        Self {
            order: TraversalOrder::default(),
            emit_traversed_directories: true,
        }
    }
}

/// A directory waiting to be listed
#[derive(Debug)]
struct TraversalFrame {
    path: String,
    depth: usize,
}

struct Traversal<A, L, F> {
    operations: A,
    lease: L,
    should_descend: F,
    options: TraverseOptions,
    pending: VecDeque<TraversalFrame>,
    /// Entries of the current listing not yet pulled
    listed: VecDeque<RemoteEntry>,
    /// Directories found in the current listing, in listing order
    discovered: Vec<TraversalFrame>,
    depth: usize,
}

impl<A, O, L, F> Traversal<A, L, F>
where
    A: Deref<Target = O> + Send + Sync,
    O: RemoteOperations<Handle = L::Handle>,
    L: Lease,
    F: FnMut(&RemoteEntry) -> bool + Send,
{
    async fn next_entry(&mut self) -> Result<Option<RemoteEntry>> {
        loop {
            if let Some(entry) = self.listed.pop_front() {
                if entry.is_directory() && (self.should_descend)(&entry) {
                    self.discovered.push(TraversalFrame {
                        path: entry.path().to_owned(),
                        depth: self.depth + 1,
                    });

                    if !self.options.emit_traversed_directories {
                        continue;
                    }
                }

                return Ok(Some(entry));
            }

            self.schedule_discovered();

            let Some(frame) = self.pending.pop_front() else {
                return Ok(None);
            };

            debug!("traversing {} at depth {}", frame.path, frame.depth);
            let handle = self.lease.handle().await?;
            let entries = self.operations.list(&frame.path, handle).await?;

            self.depth = frame.depth;
            self.listed.extend(entries);
        }
    }

    fn schedule_discovered(&mut self) {
        match self.options.order {
            TraversalOrder::BreadthFirst => self.pending.extend(self.discovered.drain(..)),
            TraversalOrder::DepthFirst => {
                for frame in self.discovered.drain(..).rev() {
                    self.pending.push_front(frame);
                }
            }
        }
    }
}

/// Lists `root` and, recursively, every directory accepted by `should_descend`.
///
/// Entries of one directory come out contiguously and in listing order, and
/// always before the entries of any directory discovered through them. A
/// listing failure ends the stream with that error; entries already emitted
/// stay valid. Restart by calling again, the stream is not resumable.
pub fn traverse<A, O, L, F>(
    root: String,
    operations: A,
    lease: L,
    options: TraverseOptions,
    should_descend: F,
) -> impl Stream<Item = Result<RemoteEntry>>
where
    A: Deref<Target = O> + Send + Sync,
    O: RemoteOperations<Handle = L::Handle>,
    L: Lease,
    F: FnMut(&RemoteEntry) -> bool + Send,
{
    let traversal = Traversal {
        operations,
        lease,
        should_descend,
        options,
        pending: VecDeque::from([TraversalFrame {
            path: root,
            depth: 0,
        }]),
        listed: VecDeque::new(),
        discovered: Vec::new(),
        depth: 0,
    };

    stream::try_unfold(traversal, |mut traversal| async move {
        let entry = traversal.next_entry().await?;
        Ok::<_, Error>(entry.map(|entry| (entry, traversal)))
    })
}

/// Predicate that descends into every directory
pub fn always(_: &RemoteEntry) -> bool {
    true
}

/// Predicate that never descends, giving a single-level listing
pub fn never(_: &RemoteEntry) -> bool {
    false
}
