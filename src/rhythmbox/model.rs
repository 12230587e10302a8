//! Rhythmbox entries and their read-only track view

use crate::model::{normalize_path, unsupported, Rating, Track, TrackRecord};
use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::any::Any;
use std::fmt;

const FORMAT: &str = "rhythmbox";

/// Rhythmbox track entry (as stored in rhythmdb.xml)
#[derive(Debug, Clone, Default)]
pub struct RhythmboxEntry {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub location: Option<String>, // file:// URI
    pub file_size: Option<u64>,
    /// Days since 0001-01-01 (GLib julian day)
    pub date: Option<u32>,
    /// 0-5 stars
    pub rating: Option<u8>,
    pub play_count: Option<u32>,
    /// Unix seconds
    pub first_seen: Option<i64>,
    /// Unix seconds
    pub mtime: Option<i64>,
}

impl RhythmboxEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert the file:// URI to a canonical path
    pub fn file_path(&self) -> Option<String> {
        self.location.as_deref().and_then(uri_to_path)
    }

    /// Year of the release date, 0 when unknown
    pub fn year(&self) -> i32 {
        self.date
            .filter(|d| *d > 0)
            .and_then(|d| NaiveDate::from_num_days_from_ce_opt(d as i32))
            .map(|d| d.year())
            .unwrap_or(0)
    }

    pub fn into_record(self) -> Option<TrackRecord> {
        let file_path = self.file_path()?;
        let size = self
            .file_size
            .or_else(|| std::fs::metadata(&file_path).ok().map(|m| m.len()))
            .unwrap_or(0);

        Some(TrackRecord {
            year: self.year(),
            title: self.title.unwrap_or_default(),
            artist: self.artist.unwrap_or_default(),
            album: self.album.unwrap_or_default(),
            file_path,
            size,
            rating: Rating::new(self.rating.unwrap_or(0)),
            play_count: self.play_count.unwrap_or(0),
            added: self.first_seen.and_then(|s| DateTime::from_timestamp(s, 0)),
            modified: self.mtime.and_then(|s| DateTime::from_timestamp(s, 0)),
        })
    }
}

/// Decode a `file://` URI into a canonical path
pub fn uri_to_path(uri: &str) -> Option<String> {
    uri.strip_prefix("file://")
        .and_then(|path| urlencoding::decode(path).ok())
        .map(|decoded| normalize_path(&decoded))
}

/// Track read from rhythmdb.xml; every setter is unsupported
#[derive(Debug)]
pub struct RhythmboxTrack {
    record: TrackRecord,
}

impl RhythmboxTrack {
    pub fn new(record: TrackRecord) -> Self {
        Self { record }
    }
}

impl fmt::Display for RhythmboxTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.record.title.is_empty() {
            write!(f, "{}", self.record.file_path)
        } else {
            write!(f, "{}", self.record.title)
        }
    }
}

impl Track for RhythmboxTrack {
    fn title(&self) -> String {
        self.record.title.clone()
    }

    fn artist(&self) -> String {
        self.record.artist.clone()
    }

    fn album(&self) -> String {
        self.record.album.clone()
    }

    fn year(&self) -> i32 {
        self.record.year
    }

    fn file_path(&self) -> String {
        self.record.file_path.clone()
    }

    fn size(&self) -> u64 {
        self.record.size
    }

    fn rating(&self) -> Rating {
        self.record.rating
    }

    fn set_rating(&self, _rating: Rating) -> Result<()> {
        unsupported("SetRating", FORMAT)
    }

    fn added(&self) -> Option<DateTime<Utc>> {
        self.record.added
    }

    fn set_added(&self, _added: Option<DateTime<Utc>>) -> Result<()> {
        unsupported("SetAdded", FORMAT)
    }

    fn modified(&self) -> Option<DateTime<Utc>> {
        self.record.modified
    }

    fn set_modified(&self, _modified: Option<DateTime<Utc>>) -> Result<()> {
        unsupported("SetModified", FORMAT)
    }

    fn play_count(&self) -> u32 {
        self.record.play_count
    }

    fn set_play_count(&self, _count: u32) -> Result<()> {
        unsupported("SetPlayCount", FORMAT)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
