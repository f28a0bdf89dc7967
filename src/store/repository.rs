use std::{
    io::{ErrorKind, SeekFrom},
    ops::Deref,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::UserId;

use super::entities::{sort_canonical, EntryDraft, EntryId, TimesheetEntry};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage is unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode entry: {0}")]
    Encoding(#[from] serde_json::Error),
    /// The backend refused the request (permissions, constraints and similar).
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Interface for the collection that persists entries. Every operation is scoped by the owning
/// user, a user can never observe or modify rows of another user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// All entries of the user in canonical order.
    async fn list(&self, user_id: &UserId) -> Result<Vec<TimesheetEntry>, PersistenceError>;

    /// Saves a draft and returns it with the assigned id.
    async fn insert(
        &self,
        user_id: &UserId,
        draft: EntryDraft,
    ) -> Result<TimesheetEntry, PersistenceError>;

    /// Replaces the fields of an entry. Succeeds without changes if nothing matches.
    async fn update(
        &self,
        id: &EntryId,
        user_id: &UserId,
        patch: EntryDraft,
    ) -> Result<(), PersistenceError>;

    /// Succeeds without changes if nothing matches.
    async fn delete(&self, id: &EntryId, user_id: &UserId) -> Result<(), PersistenceError>;
}

#[async_trait]
impl<T> EntryRepository for T
where
    T: Deref + Send + Sync,
    T::Target: EntryRepository,
{
    async fn list(&self, user_id: &UserId) -> Result<Vec<TimesheetEntry>, PersistenceError> {
        self.deref().list(user_id).await
    }

    async fn insert(
        &self,
        user_id: &UserId,
        draft: EntryDraft,
    ) -> Result<TimesheetEntry, PersistenceError> {
        self.deref().insert(user_id, draft).await
    }

    async fn update(
        &self,
        id: &EntryId,
        user_id: &UserId,
        patch: EntryDraft,
    ) -> Result<(), PersistenceError> {
        self.deref().update(id, user_id, patch).await
    }

    async fn delete(&self, id: &EntryId, user_id: &UserId) -> Result<(), PersistenceError> {
        self.deref().delete(id, user_id).await
    }
}

/// A line of the collection file.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct EntryRow {
    user_id: UserId,
    #[serde(flatten)]
    entry: TimesheetEntry,
}

const COLLECTION_FILE: &str = "entries.jsonl";

/// The main realization of [EntryRepository]. All users share one json lines file, each line
/// holding an entry together with its owner.
pub struct FileEntryRepository {
    collection_path: PathBuf,
}

impl FileEntryRepository {
    pub fn new(dir: &Path) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(dir)?;

        Ok(Self {
            collection_path: dir.join(COLLECTION_FILE),
        })
    }

    async fn read_rows(&self) -> Result<Vec<EntryRow>, PersistenceError> {
        let mut file = match File::open(&self.collection_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => Err(e)?,
        };
        file.lock_shared()?;
        let mut content = String::new();
        let result = file.read_to_string(&mut content).await;
        file.unlock_async().await?;
        result?;

        Ok(parse_rows(&self.collection_path, &content))
    }

    /// Reads every row, lets `modify` change them and writes the result back while holding an
    /// exclusive lock.
    async fn modify_rows<F, R>(&self, modify: F) -> Result<R, PersistenceError>
    where
        F: FnOnce(&mut Vec<EntryRow>) -> R + Send,
        R: Send,
    {
        let mut file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.collection_path)
            .await?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = Self::rewrite_with_file(&mut file, &self.collection_path, modify).await;
        file.unlock_async().await?;
        result
    }

    async fn rewrite_with_file<F, R>(
        file: &mut File,
        path: &Path,
        modify: F,
    ) -> Result<R, PersistenceError>
    where
        F: FnOnce(&mut Vec<EntryRow>) -> R + Send,
        R: Send,
    {
        let mut content = String::new();
        file.read_to_string(&mut content).await?;
        let mut rows = parse_rows(path, &content);

        let result = modify(&mut rows);

        let mut buffer = Vec::<u8>::new();
        for row in &rows {
            serde_json::to_writer(&mut buffer, row)?;
            buffer.push(b'\n');
        }

        file.set_len(0).await?;
        file.rewind().await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(result)
    }
}

/// Empty files count as terminated.
async fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

fn parse_rows(path: &Path, content: &str) -> Vec<EntryRow> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<EntryRow>(line) {
            Ok(row) => Some(row),
            Err(e) => {
                // ignore illegal values. Might happen after an interrupted write
                warn!("During parsing in path {path:?} found illegal json string {line}: {e}");
                None
            }
        })
        .collect()
}

#[async_trait]
impl EntryRepository for FileEntryRepository {
    async fn list(&self, user_id: &UserId) -> Result<Vec<TimesheetEntry>, PersistenceError> {
        let mut entries = self
            .read_rows()
            .await?
            .into_iter()
            .filter(|row| &row.user_id == user_id)
            .map(|row| row.entry)
            .collect::<Vec<_>>();
        sort_canonical(&mut entries);
        debug!("Listed {} entries for {user_id}", entries.len());
        Ok(entries)
    }

    async fn insert(
        &self,
        user_id: &UserId,
        draft: EntryDraft,
    ) -> Result<TimesheetEntry, PersistenceError> {
        let row = EntryRow {
            user_id: user_id.clone(),
            entry: TimesheetEntry::from_draft(Uuid::new_v4().to_string().into(), draft),
        };
        let mut line = serde_json::to_vec(&row)?;
        line.push(b'\n');

        let mut file = File::options()
            .read(true)
            .create(true)
            .append(true)
            .open(&self.collection_path)
            .await?;
        file.lock_exclusive()?;
        let written = async {
            // A torn last line must not swallow the new row.
            if !ends_with_newline(&mut file).await? {
                line.insert(0, b'\n');
            }
            file.write_all(&line).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        written?;

        debug!("Inserted entry {} for {user_id}", row.entry.id);
        Ok(row.entry)
    }

    async fn update(
        &self,
        id: &EntryId,
        user_id: &UserId,
        patch: EntryDraft,
    ) -> Result<(), PersistenceError> {
        let matched = self
            .modify_rows(|rows| {
                let mut matched = 0;
                for row in rows
                    .iter_mut()
                    .filter(|row| &row.entry.id == id && &row.user_id == user_id)
                {
                    row.entry.apply(patch.clone());
                    matched += 1;
                }
                matched
            })
            .await?;
        debug!("Update of {id} matched {matched} rows");
        Ok(())
    }

    async fn delete(&self, id: &EntryId, user_id: &UserId) -> Result<(), PersistenceError> {
        let removed = self
            .modify_rows(|rows| {
                let before = rows.len();
                rows.retain(|row| !(&row.entry.id == id && &row.user_id == user_id));
                before - rows.len()
            })
            .await?;
        debug!("Delete of {id} removed {removed} rows");
        Ok(())
    }
}
