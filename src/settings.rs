use serde::{Deserialize, Serialize};

use crate::{
    transfer::DEFAULT_CHUNK_SIZE,
    traverse::{TraversalOrder, TraverseOptions},
};

/// Tunables of a [`Connector`](crate::connector::Connector).
///
/// Every field has a default, so a partial document deserializes fine.
/// Hosts, credentials and timeouts belong to the connection provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorSettings {
    /// Largest chunk emitted by a download; `0` means the default
    pub chunk_size: usize,
    pub traversal_order: TraversalOrder,
    /// Whether listings emit the directories they descend into
    pub emit_traversed_directories: bool,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            traversal_order: TraversalOrder::default(),
            emit_traversed_directories: true,
        }
    }
}

impl ConnectorSettings {
    pub fn chunk_size(&self) -> usize {
        if self.chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        }
    }

    pub fn traverse_options(&self) -> TraverseOptions {
        TraverseOptions {
            order: self.traversal_order,
            emit_traversed_directories: self.emit_traversed_directories,
        }
    }
}
