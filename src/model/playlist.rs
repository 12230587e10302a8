use super::{TrackRecord, TrackRef};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Which bucket a tracklist lives in; formats without crates only use playlists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListKind {
    Playlist,
    Crate,
}

impl ListKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Playlist => "playlist",
            ListKind::Crate => "crate",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, hierarchical group of tracks (playlist or crate)
pub trait Tracklist {
    /// Leaf segment of the path
    fn name(&self) -> String;

    /// Slash-delimited hierarchical path, e.g. `Techno/Favorites`
    fn path(&self) -> String;

    fn tracks(&self) -> Result<Vec<TrackRef>>;

    fn count(&self) -> Result<usize> {
        Ok(self.tracks()?.len())
    }

    /// Replace the full member set, all-or-nothing
    fn set_tracks(&self, tracks: &[TrackRef]) -> Result<()>;
}

/// Last segment of a slash-delimited path
pub fn leaf_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// De-duplicate by file path, then sort by file path
pub fn dedupe(tracks: Vec<TrackRef>) -> Vec<TrackRef> {
    let mut by_path: BTreeMap<String, TrackRef> = BTreeMap::new();
    for track in tracks {
        by_path.entry(track.file_path()).or_insert(track);
    }
    by_path.into_values().collect()
}

pub fn file_paths(tracks: &[TrackRef]) -> Vec<String> {
    tracks.iter().map(|t| t.file_path()).collect()
}

/// Serializable snapshot of a tracklist (interchange format)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracklistRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub tracks: Vec<TrackRecord>,
}

impl TracklistRecord {
    pub fn from_tracklist(list: &dyn Tracklist) -> Result<Self> {
        let tracks: Vec<TrackRecord> = list
            .tracks()?
            .iter()
            .map(|t| TrackRecord::from_track(t.as_ref()))
            .collect();
        Ok(Self {
            name: list.name(),
            path: list.path(),
            count: tracks.len(),
            tracks,
        })
    }

    /// Path, falling back to the name for flat dumps
    pub fn effective_path(&self) -> &str {
        if self.path.is_empty() {
            &self.name
        } else {
            &self.path
        }
    }
}

/// In-memory tracklist; `set_tracks` swaps the whole vector
#[derive(Default)]
pub struct MemoryList {
    path: String,
    tracks: RefCell<Vec<TrackRef>>,
}

impl MemoryList {
    pub fn new(path: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            path: path.into(),
            tracks: RefCell::new(Vec::new()),
        })
    }

    pub fn with_tracks(path: impl Into<String>, tracks: Vec<TrackRef>) -> Rc<Self> {
        Rc::new(Self {
            path: path.into(),
            tracks: RefCell::new(tracks),
        })
    }
}

impl Tracklist for MemoryList {
    fn name(&self) -> String {
        leaf_name(&self.path).to_string()
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    fn tracks(&self) -> Result<Vec<TrackRef>> {
        Ok(self.tracks.borrow().clone())
    }

    fn set_tracks(&self, tracks: &[TrackRef]) -> Result<()> {
        *self.tracks.borrow_mut() = tracks.to_vec();
        Ok(())
    }
}

impl Tracklist for Rc<MemoryList> {
    fn name(&self) -> String {
        self.as_ref().name()
    }

    fn path(&self) -> String {
        self.as_ref().path()
    }

    fn tracks(&self) -> Result<Vec<TrackRef>> {
        self.as_ref().tracks()
    }

    fn set_tracks(&self, tracks: &[TrackRef]) -> Result<()> {
        self.as_ref().set_tracks(tracks)
    }
}
