//! Shard database schema
//!
//! One SQLite file per shard. Paths in `Track.path` are either absolute or
//! relative to the directory holding the database file. Ratings are stored as
//! 0-100, timestamps as unix seconds.

use crate::error::StorageContext;
use anyhow::Result;
use rusqlite::{params, Connection};
use std::path::Path;

pub const SCHEMA_VERSION: (i64, i64, i64) = (2, 18, 0);

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS Information (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL,
    schemaVersionMajor INTEGER,
    schemaVersionMinor INTEGER,
    schemaVersionPatch INTEGER
);

CREATE TABLE IF NOT EXISTS Pack (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    packId TEXT,
    changeLogDatabaseUuid TEXT,
    changeLogId INTEGER,
    lastPackTime INTEGER
);

CREATE TABLE IF NOT EXISTS Track (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT,
    artist TEXT,
    album TEXT,
    year INTEGER,
    path TEXT,
    filename TEXT,
    fileBytes INTEGER,
    rating INTEGER,
    dateAdded INTEGER,
    lastModified INTEGER,
    playCount INTEGER,
    originDatabaseUuid TEXT,
    originTrackId INTEGER,
    CONSTRAINT C_originDatabaseUuid_originTrackId UNIQUE (originDatabaseUuid, originTrackId),
    CONSTRAINT C_path UNIQUE (path)
);

CREATE TABLE IF NOT EXISTS Playlist (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT 'playlist',
    isFolder BOOLEAN NOT NULL DEFAULT 0,
    lastEditTime INTEGER
);

CREATE TABLE IF NOT EXISTS PlaylistEntity (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    listId INTEGER NOT NULL,
    trackId INTEGER NOT NULL,
    databaseUuid TEXT,
    trackNumber INTEGER NOT NULL,
    FOREIGN KEY (listId) REFERENCES Playlist (id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS ListParentList (
    listOriginId INTEGER NOT NULL,
    listParentId INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS ListHierarchy (
    listId INTEGER NOT NULL,
    listIdChild INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS index_PlaylistEntity_listId ON PlaylistEntity (listId);
CREATE INDEX IF NOT EXISTS index_ListParentList_listOriginId ON ListParentList (listOriginId);
";

/// Create (or upgrade in place) an empty shard database carrying `uuid`
pub fn create_shard(path: &Path, uuid: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| crate::error::LibraryError::io(format!("failed to create {:?}", parent), e))?;
    }

    let conn = Connection::open(path).storage_context(|| format!("failed to create shard {:?}", path))?;
    conn.execute_batch(SCHEMA)
        .storage_context(|| format!("failed to create schema in {:?}", path))?;

    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM Information", [], |r| r.get(0))
        .storage_context(|| format!("failed to read information in {:?}", path))?;
    if existing == 0 {
        conn.execute(
            "INSERT INTO Information (uuid, schemaVersionMajor, schemaVersionMinor, schemaVersionPatch)
             VALUES (?1, ?2, ?3, ?4)",
            params![uuid, SCHEMA_VERSION.0, SCHEMA_VERSION.1, SCHEMA_VERSION.2],
        )
        .storage_context(|| format!("failed to write information in {:?}", path))?;
    }

    log::info!("created shard {:?} with uuid {}", path, uuid);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_shard_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Engine Library/Database2/m.db");

        create_shard(&path, "uuid-1").unwrap();
        create_shard(&path, "uuid-2").unwrap();

        let conn = Connection::open(&path).unwrap();
        let uuids: Vec<String> = conn
            .prepare("SELECT uuid FROM Information")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(uuids, vec!["uuid-1".to_string()]);
    }
}
