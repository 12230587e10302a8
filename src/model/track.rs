use crate::error::LibraryError;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Shared handle to a track view
pub type TrackRef = Rc<dyn Track>;

/// Star rating on a 0-5 scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const ZERO: Rating = Rating(0);
    pub const MAX: Rating = Rating(5);

    /// Build a rating, clamping anything above five stars
    pub fn new(stars: u8) -> Self {
        Rating(stars.min(5))
    }

    pub fn stars(self) -> u8 {
        self.0
    }

    /// Decode a 0-100 percentage as stored by DJ software
    pub fn from_percent(value: i64) -> Self {
        Rating::new((value.clamp(0, 100) / 20) as u8)
    }

    pub fn to_percent(self) -> i64 {
        self.0 as i64 * 20
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/5", self.0)
    }
}

/// A single music track as seen through one library
///
/// Implementations are cheap views over their storage: setters write through
/// immediately and take `&self`. A format that cannot persist a field returns
/// `LibraryError::Unsupported` from the matching setter.
pub trait Track: fmt::Display {
    fn title(&self) -> String;
    fn artist(&self) -> String;
    fn album(&self) -> String;
    fn year(&self) -> i32;

    /// Canonical file path (see [`crate::model::normalize_path`])
    fn file_path(&self) -> String;

    /// File size in bytes, 0 when unknown
    fn size(&self) -> u64;

    fn rating(&self) -> Rating;
    fn set_rating(&self, rating: Rating) -> Result<()>;

    fn added(&self) -> Option<DateTime<Utc>>;
    fn set_added(&self, added: Option<DateTime<Utc>>) -> Result<()>;

    fn modified(&self) -> Option<DateTime<Utc>>;
    fn set_modified(&self, modified: Option<DateTime<Utc>>) -> Result<()>;

    fn play_count(&self) -> u32;
    fn set_play_count(&self, count: u32) -> Result<()>;

    /// Concrete type access, used by adapters to reject foreign tracks
    fn as_any(&self) -> &dyn Any;
}

/// Serializable snapshot of a track (interchange format)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRecord {
    pub title: String,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub artist: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub album: String,
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "is_zero_rating")]
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub play_count: u32,
    #[serde(default)]
    pub size: u64,
}

fn is_zero_i32(v: &i32) -> bool {
    *v == 0
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

fn is_zero_rating(v: &Rating) -> bool {
    *v == Rating::ZERO
}

impl TrackRecord {
    /// Capture every field of a track
    pub fn from_track(track: &dyn Track) -> Self {
        Self {
            title: track.title(),
            file_path: track.file_path(),
            artist: track.artist(),
            album: track.album(),
            year: track.year(),
            modified: track.modified(),
            added: track.added(),
            rating: track.rating(),
            play_count: track.play_count(),
            size: track.size(),
        }
    }

    /// Wrap into a shareable track view
    pub fn into_track(self) -> Rc<RecordTrack> {
        Rc::new(RecordTrack::new(self))
    }
}

/// In-memory track backed by a [`TrackRecord`]; every setter succeeds
#[derive(Debug)]
pub struct RecordTrack {
    record: RefCell<TrackRecord>,

    /// Raised by every setter so the owning library knows to write back
    dirty: Option<Rc<Cell<bool>>>,
}

impl RecordTrack {
    pub fn new(record: TrackRecord) -> Self {
        Self {
            record: RefCell::new(record),
            dirty: None,
        }
    }

    /// Track whose setters raise `dirty`
    pub fn tracked(record: TrackRecord, dirty: Rc<Cell<bool>>) -> Self {
        Self {
            record: RefCell::new(record),
            dirty: Some(dirty),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut TrackRecord)) -> Result<()> {
        apply(&mut *self.record.borrow_mut());
        if let Some(dirty) = &self.dirty {
            dirty.set(true);
        }
        Ok(())
    }

    pub fn record(&self) -> TrackRecord {
        self.record.borrow().clone()
    }
}

impl fmt::Display for RecordTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.record.borrow();
        if r.title.is_empty() {
            write!(f, "{}", r.file_path)
        } else {
            write!(f, "{}", r.title)
        }
    }
}

impl Track for RecordTrack {
    fn title(&self) -> String {
        self.record.borrow().title.clone()
    }

    fn artist(&self) -> String {
        self.record.borrow().artist.clone()
    }

    fn album(&self) -> String {
        self.record.borrow().album.clone()
    }

    fn year(&self) -> i32 {
        self.record.borrow().year
    }

    fn file_path(&self) -> String {
        self.record.borrow().file_path.clone()
    }

    fn size(&self) -> u64 {
        self.record.borrow().size
    }

    fn rating(&self) -> Rating {
        self.record.borrow().rating
    }

    fn set_rating(&self, rating: Rating) -> Result<()> {
        self.update(|r| r.rating = rating)
    }

    fn added(&self) -> Option<DateTime<Utc>> {
        self.record.borrow().added
    }

    fn set_added(&self, added: Option<DateTime<Utc>>) -> Result<()> {
        self.update(|r| r.added = added)
    }

    fn modified(&self) -> Option<DateTime<Utc>> {
        self.record.borrow().modified
    }

    fn set_modified(&self, modified: Option<DateTime<Utc>>) -> Result<()> {
        self.update(|r| r.modified = modified)
    }

    fn play_count(&self) -> u32 {
        self.record.borrow().play_count
    }

    fn set_play_count(&self, count: u32) -> Result<()> {
        self.update(|r| r.play_count = count)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shorthand for setters a format cannot persist
pub fn unsupported<T>(operation: &'static str, format: &str) -> Result<T> {
    Err(LibraryError::unsupported(operation, format).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_percent_conversion() {
        assert_eq!(Rating::from_percent(60), Rating::new(3));
        assert_eq!(Rating::from_percent(100).to_percent(), 100);
        assert_eq!(Rating::from_percent(250), Rating::MAX);
        assert_eq!(Rating::from_percent(-4), Rating::ZERO);
        assert_eq!(Rating::new(9), Rating::MAX);
    }

    #[test]
    fn test_record_track_setters_write_through() {
        let track = TrackRecord {
            title: "Song".to_string(),
            file_path: "/m/song.mp3".to_string(),
            ..Default::default()
        }
        .into_track();

        track.set_rating(Rating::new(4)).unwrap();
        track.set_play_count(7).unwrap();

        assert_eq!(track.rating(), Rating::new(4));
        assert_eq!(track.record().play_count, 7);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = TrackRecord {
            title: "Song".to_string(),
            file_path: "/m/song.mp3".to_string(),
            play_count: 2,
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"filePath\":\"/m/song.mp3\""));
        assert!(json.contains("\"playCount\":2"));
        assert!(!json.contains("artist"));
    }
}
