use russh_sftp::{
    client::{fs::Metadata, SftpSession},
    protocol::OpenFlags,
};
use std::io::SeekFrom;
use tokio::io::AsyncSeekExt;

use super::{ByteReader, ByteWriter, RemoteOperations};
use crate::{
    entry::{unix_millis, Permissions, RemoteEntry},
    error::{Error, Result},
    path,
};

fn into_entry(base_path: &str, name: String, metadata: &Metadata) -> RemoteEntry {
    RemoteEntry::new(
        base_path,
        name,
        metadata.is_dir(),
        metadata.size.unwrap_or(0),
        metadata.mtime.map_or(0, unix_millis),
        Permissions::from_mode(metadata.permissions.unwrap_or(0)),
    )
}

fn write_flags(append: bool) -> OpenFlags {
    let mode = if append {
        OpenFlags::APPEND
    } else {
        OpenFlags::TRUNCATE
    };

    OpenFlags::CREATE | OpenFlags::WRITE | mode
}

/// SSH file transfer variant over a [`SftpSession`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SftpOperations;

impl SftpOperations {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RemoteOperations for SftpOperations {
    type Handle = SftpSession;

    async fn list(&self, base_path: &str, handle: &mut SftpSession) -> Result<Vec<RemoteEntry>> {
        let base = path::normalize(base_path);
        debug!("listing {}", base);

        let dir = handle.read_dir(base.as_str()).await.map_err(|e| Error::Listing {
            path: base.clone(),
            message: e.to_string(),
        })?;

        Ok(dir
            .filter_map(|entry| {
                let name = entry.file_name();
                if name == "." || name == ".." {
                    return None;
                }

                Some(into_entry(&base, name, &entry.metadata()))
            })
            .collect())
    }

    async fn open_read(
        &self,
        path: &str,
        handle: &mut SftpSession,
        offset: u64,
    ) -> Result<ByteReader> {
        let not_found = |message: String| Error::NotFound {
            path: path.to_owned(),
            message,
        };

        let mut file = handle
            .open(path)
            .await
            .map_err(|e| not_found(e.to_string()))?;

        if offset > 0 {
            let _ = file
                .seek(SeekFrom::Start(offset))
                .await
                .map_err(|e| not_found(e.to_string()))?;
        }

        Ok(Box::new(file))
    }

    async fn open_write(
        &self,
        path: &str,
        handle: &mut SftpSession,
        append: bool,
    ) -> Result<ByteWriter> {
        let write_open = |message: String| Error::WriteOpen {
            path: path.to_owned(),
            message,
        };

        let mut file = handle
            .open_with_flags(path, write_flags(append))
            .await
            .map_err(|e| write_open(e.to_string()))?;

        // Writes carry an explicit offset, so appending starts at the
        // current end of the file.
        if append {
            let end = file
                .seek(SeekFrom::End(0))
                .await
                .map_err(|e| write_open(e.to_string()))?;
            debug!("appending to {} at {}", path, end);
        }

        Ok(Box::new(file))
    }

    async fn move_entry(&self, from: &str, to: &str, handle: &mut SftpSession) -> Result<()> {
        handle.rename(from, to).await.map_err(|e| Error::Move {
            from: from.to_owned(),
            to: to.to_owned(),
            message: e.to_string(),
        })
    }

    async fn remove(&self, path: &str, handle: &mut SftpSession) -> Result<()> {
        handle.remove_file(path).await.map_err(|e| Error::Remove {
            path: path.to_owned(),
            message: e.to_string(),
        })
    }

    async fn make_directory(
        &self,
        base_path: &str,
        name: &str,
        handle: &mut SftpSession,
    ) -> Result<()> {
        let target = path::join(base_path, name);
        handle
            .create_dir(target.as_str())
            .await
            .map_err(|e| Error::MakeDirectory {
                path: target.clone(),
                message: e.to_string(),
            })
    }
}
