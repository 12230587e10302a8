//! One physical shard database (main install or a removable volume)

use super::track::Ownership;
use crate::error::{LibraryError, StorageContext};
use crate::model::{normalize_path, relative_to, resolve_from};
use anyhow::Result;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Column list shared by every track query; also valid inside joins
pub(crate) const TRACK_COLUMNS: &str = "Track.id, Track.title, Track.artist, Track.album, \
    Track.year, Track.path, Track.fileBytes, Track.rating, Track.dateAdded, Track.lastModified, \
    Track.playCount, Track.originDatabaseUuid, Track.originTrackId";

/// Raw `Track` row
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRow {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: i32,
    /// As stored: absolute, or relative to the shard directory
    pub path: String,
    pub file_bytes: u64,
    /// 0-100
    pub rating: i64,
    pub date_added: Option<i64>,
    pub last_modified: Option<i64>,
    pub play_count: u32,
    pub ownership: Ownership,
}

pub(crate) fn row_to_track(row: &Row, own_uuid: &str) -> rusqlite::Result<TrackRow> {
    Ok(TrackRow {
        id: row.get(0)?,
        title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        artist: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        album: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        year: row.get::<_, Option<i32>>(4)?.unwrap_or(0),
        path: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        file_bytes: row.get::<_, Option<i64>>(6)?.unwrap_or(0).max(0) as u64,
        rating: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
        date_added: row.get(8)?,
        last_modified: row.get(9)?,
        play_count: row.get::<_, Option<i64>>(10)?.unwrap_or(0).max(0) as u32,
        ownership: Ownership::from_columns(own_uuid, row.get(11)?, row.get(12)?),
    })
}

/// Writable per-track statistic columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackColumn {
    Rating,
    DateAdded,
    LastModified,
    PlayCount,
}

impl TrackColumn {
    fn name(self) -> &'static str {
        match self {
            TrackColumn::Rating => "rating",
            TrackColumn::DateAdded => "dateAdded",
            TrackColumn::LastModified => "lastModified",
            TrackColumn::PlayCount => "playCount",
        }
    }
}

/// Values for a freshly added track
#[derive(Debug, Clone, Default)]
pub struct NewTrack {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: i32,
    pub path: String,
    pub file_bytes: u64,
    pub date_added: Option<i64>,
    pub last_modified: Option<i64>,
}

/// An open shard database
///
/// The connection is released by [`Shard::close`] (idempotent) or on drop;
/// every query after that fails with `LibraryError::Closed`.
pub struct Shard {
    uuid: String,

    /// Canonical directory holding the database; base for relative track paths
    origin: String,

    db_path: PathBuf,
    info: String,
    conn: RefCell<Option<Connection>>,

    /// Canonical file path -> track id
    paths: RefCell<HashMap<String, i64>>,
}

impl Shard {
    pub fn open(path: &Path) -> Result<Self> {
        log::info!("opening Engine database located at {:?}", path);

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .storage_context(|| format!("failed to open Engine database {:?}", path))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .storage_context(|| format!("failed to configure {:?}", path))?;

        let (uuid, major, minor, patch): (String, i64, i64, i64) = conn
            .query_row(
                "SELECT uuid, schemaVersionMajor, schemaVersionMinor, schemaVersionPatch
                 FROM Information LIMIT 1",
                [],
                |r| {
                    Ok((
                        r.get(0)?,
                        r.get::<_, Option<i64>>(1)?.unwrap_or(0),
                        r.get::<_, Option<i64>>(2)?.unwrap_or(0),
                        r.get::<_, Option<i64>>(3)?.unwrap_or(0),
                    ))
                },
            )
            .storage_context(|| format!("failed to fetch Engine database information from {:?}", path))?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let origin = normalize_path(&dir.to_string_lossy());

        let mut shard = Self {
            uuid,
            origin,
            db_path: path.to_path_buf(),
            info: String::new(),
            conn: RefCell::new(Some(conn)),
            paths: RefCell::new(HashMap::new()),
        };
        shard.build_path_index()?;
        shard.info = format!(
            "Engine: Database Version: {}.{}.{}, Track Count: {}, Path: {}",
            major,
            minor,
            patch,
            shard.paths.borrow().len(),
            shard.origin
        );
        log::info!("{}", shard.info);
        Ok(shard)
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn is_open(&self) -> bool {
        self.conn.borrow().is_some()
    }

    pub(crate) fn conn(&self) -> Result<Ref<'_, Connection>> {
        Ref::filter_map(self.conn.borrow(), Option::as_ref)
            .map_err(|_| LibraryError::Closed(format!("Engine database {:?}", self.db_path)).into())
    }

    pub fn close(&self) {
        if let Some(conn) = self.conn.borrow_mut().take() {
            if let Err((_, e)) = conn.close() {
                log::error!("failed to close Engine database {:?}: {}", self.db_path, e);
            }
            log::info!("Engine database '{}' closed", self.origin);
        }
    }

    /// Exported copies (packs) never aggregate removable volumes
    pub fn is_exported(&self) -> Result<bool> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM Pack", [], |r| r.get(0))
            .storage_context(|| format!("could not determine if '{}' is an export", self.origin))?;
        Ok(count != 0)
    }

    /// Canonical form of a stored track path
    pub fn resolve(&self, stored: &str) -> String {
        resolve_from(&self.origin, stored)
    }

    fn build_path_index(&self) -> Result<()> {
        let rows: Vec<(i64, String)> = {
            let conn = self.conn()?;
            let mut stmt = conn
                .prepare("SELECT id, path FROM Track")
                .storage_context(|| "failed to fetch track ids")?;
            let rows = stmt
                .query_map([], |r| {
                    Ok((r.get(0)?, r.get::<_, Option<String>>(1)?.unwrap_or_default()))
                })
                .storage_context(|| "failed to fetch track ids")?;
            rows.collect::<rusqlite::Result<_>>()
                .storage_context(|| "failed to fetch track ids")?
        };

        let mut paths = self.paths.borrow_mut();
        paths.clear();
        for (id, stored) in rows {
            let canonical = self.resolve(&stored);
            if let Some(previous) = paths.get(&canonical) {
                log::warn!(
                    "duplicate entry in '{}' for path '{}' (tracks {} and {})",
                    self.origin,
                    canonical,
                    previous,
                    id
                );
                continue;
            }
            paths.insert(canonical, id);
        }
        Ok(())
    }

    pub fn track_count(&self) -> usize {
        self.paths.borrow().len()
    }

    /// Track id for a canonical path
    pub fn track_id(&self, canonical: &str) -> Option<i64> {
        self.paths.borrow().get(canonical).copied()
    }

    pub fn fetch_track(&self, id: i64) -> Result<Option<TrackRow>> {
        let sql = format!("SELECT {} FROM Track WHERE id = ?1", TRACK_COLUMNS);
        let row = self
            .conn()?
            .query_row(&sql, [id], |r| row_to_track(r, &self.uuid))
            .optional()
            .storage_context(|| format!("failed to fetch track {} from '{}'", id, self.origin))?;
        Ok(row)
    }

    pub fn tracks(&self) -> Result<Vec<TrackRow>> {
        let sql = format!("SELECT {} FROM Track ORDER BY id", TRACK_COLUMNS);
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&sql)
            .storage_context(|| format!("query '{}' failed", sql))?;
        let rows = stmt
            .query_map([], |r| row_to_track(r, &self.uuid))
            .storage_context(|| format!("query '{}' failed", sql))?;
        let rows = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .storage_context(|| format!("failed to read tracks from '{}'", self.origin))?;
        Ok(rows)
    }

    pub fn update_track(&self, id: i64, column: TrackColumn, value: Option<i64>) -> Result<()> {
        let sql = format!("UPDATE Track SET {} = ?1 WHERE id = ?2", column.name());
        self.conn()?
            .execute(&sql, params![value, id])
            .storage_context(|| {
                format!("failed to set {} of track {} in '{}'", column.name(), id, self.origin)
            })?;
        Ok(())
    }

    /// Update every local copy pointing back at `(origin_uuid, origin_id)`
    pub fn update_copies(
        &self,
        origin_uuid: &str,
        origin_id: i64,
        column: TrackColumn,
        value: Option<i64>,
    ) -> Result<usize> {
        let sql = format!(
            "UPDATE Track SET {} = ?1 WHERE originDatabaseUuid = ?2 AND originTrackId = ?3",
            column.name()
        );
        let changed = self
            .conn()?
            .execute(&sql, params![value, origin_uuid, origin_id])
            .storage_context(|| format!("failed to update copies in '{}'", self.origin))?;
        Ok(changed)
    }

    /// Move a track to `new_path`, stored relative to the shard when possible
    pub fn update_path(&self, id: i64, new_path: &str) -> Result<String> {
        let stored = relative_to(&self.origin, new_path);
        let filename = Path::new(&stored)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.conn()?
            .execute(
                "UPDATE Track SET path = ?1, filename = ?2 WHERE id = ?3",
                params![stored, filename, id],
            )
            .storage_context(|| format!("failed to update location of track {} in '{}'", id, self.origin))?;

        let canonical = self.resolve(&stored);
        let mut paths = self.paths.borrow_mut();
        paths.retain(|_, v| *v != id);
        paths.insert(canonical, id);
        log::info!("path for track {} updated in '{}'", id, self.origin);
        Ok(stored)
    }

    pub fn insert_track(&self, track: &NewTrack) -> Result<i64> {
        let stored = relative_to(&self.origin, &track.path);
        let filename = Path::new(&stored)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        let id = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO Track (title, artist, album, year, path, filename, fileBytes,
                                    rating, dateAdded, lastModified, playCount)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, 0)",
                params![
                    track.title,
                    track.artist,
                    track.album,
                    track.year,
                    stored,
                    filename,
                    track.file_bytes as i64,
                    track.date_added,
                    track.last_modified,
                ],
            )
            .storage_context(|| format!("failed to add '{}' to '{}'", track.path, self.origin))?;
            conn.last_insert_rowid()
        };

        self.paths.borrow_mut().insert(self.resolve(&stored), id);
        Ok(id)
    }
}

impl Drop for Shard {
    fn drop(&mut self) {
        self.close();
    }
}

/// Every open shard of one aggregator, main shard first
pub struct ShardSet {
    shards: Vec<Rc<Shard>>,
}

impl ShardSet {
    pub fn new(main: Shard) -> Self {
        Self {
            shards: vec![Rc::new(main)],
        }
    }

    pub fn push(&mut self, shard: Shard) {
        self.shards.push(Rc::new(shard));
    }

    pub fn main(&self) -> &Rc<Shard> {
        &self.shards[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<Shard>> {
        self.shards.iter()
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn by_uuid(&self, uuid: &str) -> Option<&Rc<Shard>> {
        self.shards.iter().find(|s| s.uuid() == uuid)
    }

    pub fn contains(&self, shard: &Rc<Shard>) -> bool {
        self.shards.iter().any(|s| Rc::ptr_eq(s, shard))
    }

    pub fn close_all(&self) {
        for shard in &self.shards {
            shard.close();
        }
    }
}
