#![allow(dead_code)]

use dj_library_sync::engine::{create_shard, EngineConfig, EngineLibrary, ENGINE_DB_RELATIVE};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// Create an empty shard under `root/<volume>` and return its database path
pub fn make_shard(root: &Path, volume: &str, uuid: &str) -> PathBuf {
    let db = root.join(volume).join(ENGINE_DB_RELATIVE);
    create_shard(&db, uuid).unwrap();
    db
}

pub struct Row<'a> {
    pub path: &'a str,
    pub title: &'a str,
    pub size: i64,
    pub rating: i64,
    pub play_count: i64,
    /// Artist, album and year filled in
    pub tagged: bool,
}

impl<'a> Row<'a> {
    pub fn new(path: &'a str, title: &'a str) -> Self {
        Self {
            path,
            title,
            size: 1000,
            rating: 0,
            play_count: 0,
            tagged: true,
        }
    }

    /// Only a title, as read from a file without tags
    pub fn untagged(mut self) -> Self {
        self.tagged = false;
        self
    }

    pub fn rating(mut self, percent: i64) -> Self {
        self.rating = percent;
        self
    }
}

pub fn insert_track(db: &Path, row: Row<'_>) -> i64 {
    let conn = Connection::open(db).unwrap();
    let (artist, album, year) = if row.tagged {
        ("Artist", "Album", 2020)
    } else {
        ("", "", 0)
    };
    conn.execute(
        "INSERT INTO Track (title, artist, album, year, path, filename, fileBytes, rating, playCount)
         VALUES (?1, ?7, ?8, ?9, ?2, ?3, ?4, ?5, ?6)",
        params![
            row.title,
            row.path,
            Path::new(row.path).file_name().unwrap().to_string_lossy(),
            row.size,
            row.rating,
            row.play_count,
            artist,
            album,
            year
        ],
    )
    .unwrap();
    conn.last_insert_rowid()
}

/// Insert a copy of `(origin_uuid, origin_id)` stored at `path`
pub fn insert_copy(db: &Path, path: &str, title: &str, origin_uuid: &str, origin_id: i64) -> i64 {
    let conn = Connection::open(db).unwrap();
    conn.execute(
        "INSERT INTO Track (title, artist, album, year, path, filename, fileBytes, rating, playCount,
                            originDatabaseUuid, originTrackId)
         VALUES (?1, 'Artist', 'Album', 2020, ?2, ?3, 1000, 0, 0, ?4, ?5)",
        params![
            title,
            path,
            Path::new(path).file_name().unwrap().to_string_lossy(),
            origin_uuid,
            origin_id
        ],
    )
    .unwrap();
    conn.last_insert_rowid()
}

pub fn column(db: &Path, id: i64, column: &str) -> i64 {
    Connection::open(db)
        .unwrap()
        .query_row(&format!("SELECT {} FROM Track WHERE id = ?1", column), [id], |r| r.get(0))
        .unwrap()
}

/// Main shard only
pub fn open_main(db: &Path) -> EngineLibrary {
    EngineLibrary::open(&EngineConfig::new(db.to_path_buf()).with_volume_discovery(false)).unwrap()
}

/// Main shard plus the given volume roots
pub fn open_with_volumes(db: &Path, volumes: &[PathBuf]) -> EngineLibrary {
    EngineLibrary::open(&EngineConfig::new(db.to_path_buf()).with_volume_roots(volumes.to_vec())).unwrap()
}
