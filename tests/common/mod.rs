//! Fixtures shared by the integration tests

#![allow(dead_code)]

use mik_rekordbox_sync::paths::path_to_location;
use mik_rekordbox_sync::rekordbox::CollectionTrack;
use mik_rekordbox_sync::{MikDatabase, RekordboxXml};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SCHEMA: &str = r#"
    CREATE TABLE Collection (
        Id TEXT PRIMARY KEY,
        Name TEXT NOT NULL,
        ParentFolderId TEXT NULL,
        IsFolder INTEGER NOT NULL DEFAULT 0,
        IsSystem INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE Song (
        Id TEXT PRIMARY KEY,
        File TEXT
    );
    CREATE TABLE SongCollectionMembership (
        Id TEXT PRIMARY KEY,
        SongId TEXT NOT NULL,
        CollectionId TEXT NOT NULL,
        Sequence INTEGER NOT NULL
    );
    INSERT INTO Collection (Id, Name, ParentFolderId, IsFolder, IsSystem)
        VALUES ('LIB', 'Library', NULL, 0, 1);
"#;

/// An XML library and a Mixed In Key database in one temp directory
pub struct Stores {
    pub dir: TempDir,
    pub xml_path: PathBuf,
    pub db_path: PathBuf,
}

impl Stores {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let xml_path = dir.path().join("rekordbox.xml");
        let db_path = dir.path().join("MIKStore.db");
        Connection::open(&db_path)
            .unwrap()
            .execute_batch(SCHEMA)
            .unwrap();
        Self {
            dir,
            xml_path,
            db_path,
        }
    }

    /// Absolute path of a (not necessarily existing) music file
    pub fn music(&self, name: &str) -> PathBuf {
        self.dir.path().join("Music").join(name)
    }

    pub fn add_song(&self, id: &str, file: &str) {
        self.sql()
            .execute("INSERT INTO Song (Id, File) VALUES (?1, ?2)", params![id, file])
            .unwrap();
    }

    pub fn sql(&self) -> Connection {
        Connection::open(&self.db_path).unwrap()
    }

    pub fn open_db(&self) -> MikDatabase {
        MikDatabase::open(&self.db_path).unwrap()
    }

    pub fn load_xml(&self) -> RekordboxXml {
        RekordboxXml::load(&self.xml_path).unwrap()
    }

    /// Files in the temp directory whose name contains `.backup-`
    pub fn backups(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().contains(".backup-"))
            .collect()
    }

    pub fn count(&self, sql: &str) -> i64 {
        self.sql().query_row(sql, [], |row| row.get(0)).unwrap()
    }
}

pub fn track(id: &str, path: &Path) -> CollectionTrack {
    CollectionTrack::new(id).with_location(path_to_location(&path.to_string_lossy()))
}

/// Memberships of a playlist as (SongId, Sequence) in Sequence order
pub fn memberships(conn: &Connection, playlist_id: &str) -> Vec<(String, i64)> {
    let mut stmt = conn
        .prepare(
            "SELECT SongId, Sequence FROM SongCollectionMembership
             WHERE CollectionId = ?1 ORDER BY Sequence",
        )
        .unwrap();
    stmt.query_map(params![playlist_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
}

pub fn collection_id(conn: &Connection, parent: Option<&str>, name: &str) -> Option<String> {
    conn.query_row(
        "SELECT Id FROM Collection WHERE Name = ?1 AND ParentFolderId IS ?2",
        params![name, parent],
        |row| row.get(0),
    )
    .ok()
}
