use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path;

/// Permission set of a remote entry.
///
/// Bits match the lower nine bits of a unix mode, so native bitmasks
/// translate with [`Permissions::from_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Permissions(u32);

bitflags! {
    impl Permissions: u32 {
        const OWNER_READ = 0o400;
        const OWNER_WRITE = 0o200;
        const OWNER_EXECUTE = 0o100;
        const GROUP_READ = 0o040;
        const GROUP_WRITE = 0o020;
        const GROUP_EXECUTE = 0o010;
        const OTHERS_READ = 0o004;
        const OTHERS_WRITE = 0o002;
        const OTHERS_EXECUTE = 0o001;
    }
}

impl Permissions {
    /// Keeps the permission bits of a unix mode and drops file type,
    /// setuid, setgid and sticky bits.
    pub fn from_mode(mode: u32) -> Self {
        Self::from_bits_truncate(mode & 0o777)
    }

    /// Unix mode bits for these permissions
    pub fn mode(self) -> u32 {
        self.bits()
    }
}

/// One file or directory returned by a directory listing.
///
/// Entries are built by [`RemoteOperations::list`](crate::operations::RemoteOperations::list)
/// and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    name: String,
    path: String,
    is_directory: bool,
    size: u64,
    last_modified: i64,
    permissions: Permissions,
}

impl RemoteEntry {
    /// Creates an entry for `name` listed under `parent`.
    ///
    /// `last_modified` is in milliseconds since the unix epoch. The size of
    /// a directory is always stored as zero.
    pub fn new(
        parent: &str,
        name: impl Into<String>,
        is_directory: bool,
        size: u64,
        last_modified: i64,
        permissions: Permissions,
    ) -> Self {
        let name = name.into();
        Self {
            path: path::join(parent, &name),
            name,
            is_directory,
            size: if is_directory { 0 } else { size },
            last_modified,
            permissions,
        }
    }

    /// Returns the file name for the file that this entry points at.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized absolute path of this entry
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory
    }

    /// Size in bytes, zero for directories
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last modification time in milliseconds since the unix epoch
    pub fn last_modified(&self) -> i64 {
        self.last_modified
    }

    /// Returns the last modification time
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.last_modified)
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }
}

/// Converts the seconds used by wire protocols into epoch milliseconds
pub(crate) fn unix_millis(secs: u32) -> i64 {
    i64::from(secs) * 1000
}
