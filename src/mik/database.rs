//! Mixed In Key SQLite database access

use super::model::{CollectionKey, MikCollection, MikStats, NewMembership, ResetSummary};
use super::ResetConfirmation;
use crate::error::SyncError;
use crate::paths::normalize;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const REQUIRED_TABLES: [&str; 3] = ["Collection", "Song", "SongCollectionMembership"];

/// Rows matching this are owned by Mixed In Key itself and survive a reset
const SYSTEM_ROW: &str = "IsSystem = 1";

pub struct MikDatabase {
    conn: Connection,
    path: PathBuf,
}

impl MikDatabase {
    /// Open an existing database read-write. It is never created.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(SyncError::DatabaseMissing(path.to_path_buf()).into());
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
            .with_context(|| format!("Failed to open Mixed In Key database: {:?}", path))?;

        for table in REQUIRED_TABLES {
            let found: Option<String> = conn
                .query_row(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    params![table],
                    |row| row.get(0),
                )
                .optional()?;
            if found.is_none() {
                return Err(SyncError::InvalidDatabase(format!("missing table {table}")).into());
            }
        }

        log::info!("Opened Mixed In Key database: {:?}", path);
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every collection keyed by (parent, name, is_folder). On duplicates the
    /// oldest row wins, matching what a lookup by natural key would return.
    pub fn existing_collections(&self) -> Result<HashMap<CollectionKey, String>> {
        let mut stmt = self.conn.prepare(
            "SELECT Id, Name, ParentFolderId, IsFolder FROM Collection ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([], map_collection)?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;

        let mut existing = HashMap::with_capacity(rows.len());
        for c in rows {
            let key = CollectionKey::new(c.parent_id.as_deref(), &c.name, c.is_folder);
            existing.entry(key).or_insert(c.id);
        }
        log::debug!("Loaded {} existing collections", existing.len());
        Ok(existing)
    }

    /// Normalized song path -> Song Id
    pub fn song_path_index(&self) -> Result<HashMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT Id, File FROM Song ORDER BY rowid ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;

        let mut index = HashMap::with_capacity(rows.len());
        for (id, file) in rows {
            let key = normalize(file.as_deref().unwrap_or_default());
            if key.is_empty() {
                continue;
            }
            index.entry(key).or_insert(id);
        }
        log::debug!("Indexed {} songs by path", index.len());
        Ok(index)
    }

    /// Insert a folder or playlist and return its new Id
    pub fn create_collection(
        &self,
        parent_id: Option<&str>,
        name: &str,
        is_folder: bool,
    ) -> Result<String> {
        let id = new_id();
        self.conn
            .execute(
                "INSERT INTO Collection (Id, Name, ParentFolderId, IsFolder, IsSystem)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![id, name, parent_id, is_folder],
            )
            .with_context(|| format!("Failed to create collection '{}'", name))?;
        Ok(id)
    }

    /// Highest Sequence in a playlist, or -1 when it has no members
    pub fn max_sequence_in_playlist(&self, playlist_id: &str) -> Result<i64> {
        let max: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(Sequence), -1) FROM SongCollectionMembership
             WHERE CollectionId = ?1",
            params![playlist_id],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    pub fn members_of(&self, playlist_id: &str) -> Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT SongId FROM SongCollectionMembership WHERE CollectionId = ?1")?;
        let ids = stmt
            .query_map(params![playlist_id], |row| row.get(0))?
            .collect::<Result<HashSet<String>, rusqlite::Error>>()?;
        Ok(ids)
    }

    pub fn insert_memberships(&self, rows: &[NewMembership]) -> Result<usize> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO SongCollectionMembership (Id, SongId, CollectionId, Sequence)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for row in rows {
            stmt.execute(params![new_id(), row.song_id, row.playlist_id, row.sequence])
                .with_context(|| {
                    format!(
                        "Failed to add song {} to playlist {}",
                        row.song_id, row.playlist_id
                    )
                })?;
        }
        Ok(rows.len())
    }

    /// Run `f` in one transaction: commit on `Ok`, roll back on `Err`
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit().context("Failed to commit transaction")?;
        Ok(out)
    }

    /// Delete every membership and every non-system collection, atomically
    pub fn reset_non_system_data(&self, _confirmed: ResetConfirmation) -> Result<ResetSummary> {
        self.with_transaction(|db| {
            let memberships_deleted = db
                .conn
                .execute("DELETE FROM SongCollectionMembership", [])?;
            let collections_deleted = db.conn.execute(
                &format!("DELETE FROM Collection WHERE NOT ({SYSTEM_ROW})"),
                [],
            )?;
            Ok(ResetSummary {
                collections_deleted,
                memberships_deleted,
            })
        })
        .inspect(|summary| {
            log::warn!(
                "Reset Mixed In Key database: {} collections and {} memberships deleted",
                summary.collections_deleted,
                summary.memberships_deleted
            )
        })
    }

    /// A folder with no parent, by exact name
    pub fn find_top_level_folder(&self, name: &str) -> Result<Option<MikCollection>> {
        let folder = self
            .conn
            .query_row(
                "SELECT Id, Name, ParentFolderId, IsFolder FROM Collection
                 WHERE ParentFolderId IS NULL AND IsFolder = 1 AND Name = ?1
                 ORDER BY rowid ASC LIMIT 1",
                params![name],
                map_collection,
            )
            .optional()?;
        Ok(folder)
    }

    /// Direct children of a folder, ordered by name
    pub fn child_collections(&self, parent_id: &str) -> Result<Vec<MikCollection>> {
        let mut stmt = self.conn.prepare(
            "SELECT Id, Name, ParentFolderId, IsFolder FROM Collection
             WHERE ParentFolderId = ?1 ORDER BY Name ASC, Id ASC",
        )?;
        let children = stmt
            .query_map(params![parent_id], map_collection)?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;
        Ok(children)
    }

    /// Song files of a playlist in Sequence order
    pub fn playlist_song_files(&self, playlist_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.File FROM SongCollectionMembership m
             JOIN Song s ON s.Id = m.SongId
             WHERE m.CollectionId = ?1
             ORDER BY m.Sequence ASC",
        )?;
        let files = stmt
            .query_map(params![playlist_id], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;
        Ok(files.into_iter().flatten().collect())
    }

    /// Snapshot the database to `<stem>.backup-<timestamp>.<ext>` next to it
    pub fn backup_copy(&self) -> Result<PathBuf> {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mik".to_string());
        let name = match self.path.extension() {
            Some(ext) => format!("{stem}.backup-{stamp}.{}", ext.to_string_lossy()),
            None => format!("{stem}.backup-{stamp}"),
        };
        let backup = self.path.with_file_name(name);
        if backup.exists() {
            return Err(SyncError::BackupExists(backup).into());
        }

        self.conn
            .execute("VACUUM INTO ?1", params![backup.to_string_lossy().into_owned()])
            .with_context(|| format!("Failed to back up database to {:?}", backup))?;
        log::info!("Backed up {:?} to {:?}", self.path, backup);
        Ok(backup)
    }

    pub fn stats(&self) -> Result<MikStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };
        Ok(MikStats {
            songs: count("SELECT COUNT(*) FROM Song")?,
            folders: count("SELECT COUNT(*) FROM Collection WHERE IsFolder = 1")?,
            playlists: count("SELECT COUNT(*) FROM Collection WHERE IsFolder = 0")?,
            memberships: count("SELECT COUNT(*) FROM SongCollectionMembership")?,
        })
    }
}

fn map_collection(row: &rusqlite::Row) -> Result<MikCollection, rusqlite::Error> {
    Ok(MikCollection {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        is_folder: row.get(3)?,
    })
}

fn new_id() -> String {
    Uuid::new_v4().to_string().to_uppercase()
}
