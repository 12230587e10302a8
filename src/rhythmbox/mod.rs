//! Rhythmbox library parsing
//!
//! Parses Rhythmbox's XML database and playlist files into a read-only
//! library. Rhythmbox has no crates and no playlist folders.

mod database;
mod model;
mod playlists;

pub use database::parse_database;
pub use model::{uri_to_path, RhythmboxEntry, RhythmboxTrack};
pub use playlists::{parse_playlists, PlaylistEntry};

use crate::matcher::Matcher;
use crate::model::{
    normalize_path, unsupported, Library, TrackRef, TrackVisitor, Tracklist, Visit,
};
use anyhow::Result;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Directory Rhythmbox keeps its XML files in
pub fn default_directory() -> PathBuf {
    PathBuf::from(shellexpand::tilde("~/.local/share/rhythmbox").into_owned())
}

/// Static playlist; membership cannot be rewritten
pub struct RhythmboxPlaylist {
    name: String,
    tracks: Vec<TrackRef>,
}

impl Tracklist for RhythmboxPlaylist {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn path(&self) -> String {
        self.name.clone()
    }

    fn tracks(&self) -> Result<Vec<TrackRef>> {
        Ok(self.tracks.clone())
    }

    fn set_tracks(&self, _tracks: &[TrackRef]) -> Result<()> {
        unsupported("SetTracks", "rhythmbox")
    }
}

/// Read-only Rhythmbox library
pub struct RhythmboxLibrary {
    directory: PathBuf,
    tracks: Vec<TrackRef>,
    by_path: HashMap<String, usize>,
    playlists: Vec<RhythmboxPlaylist>,
    matcher: Matcher,
}

impl RhythmboxLibrary {
    /// Load `rhythmdb.xml` and, when present, `playlists.xml` from `directory`
    ///
    /// # Arguments
    /// * `directory` - Typically ~/.local/share/rhythmbox
    pub fn open(directory: &Path) -> Result<Self> {
        let directory = PathBuf::from(shellexpand::tilde(&directory.to_string_lossy()).into_owned());

        let db_path = directory.join("rhythmdb.xml");
        log::info!("Parsing Rhythmbox database from {:?}", db_path);
        let records = database::parse_database(&db_path)?;

        let mut tracks: Vec<TrackRef> = Vec::with_capacity(records.len());
        let mut by_path = HashMap::new();
        for record in records {
            if by_path.contains_key(&record.file_path) {
                log::warn!("duplicate entry for path '{}' in Rhythmbox", record.file_path);
            } else {
                by_path.insert(record.file_path.clone(), tracks.len());
            }
            tracks.push(Rc::new(RhythmboxTrack::new(record)));
        }

        let playlists_path = directory.join("playlists.xml");
        let entries = if playlists_path.is_file() {
            log::info!("Parsing Rhythmbox playlists from {:?}", playlists_path);
            playlists::parse_playlists(&playlists_path)?
        } else {
            log::warn!("No playlists found at {:?}", playlists_path);
            Vec::new()
        };

        let playlists = entries
            .into_iter()
            .map(|entry| {
                let members = entry
                    .locations
                    .iter()
                    .filter_map(|path| match by_path.get(path) {
                        Some(&idx) => Some(tracks[idx].clone()),
                        None => {
                            log::debug!("Track not found for path: {:?}", path);
                            None
                        }
                    })
                    .collect();
                RhythmboxPlaylist {
                    name: entry.name,
                    tracks: members,
                }
            })
            .collect();

        let library = Self {
            directory,
            tracks,
            by_path,
            playlists,
            matcher: Matcher::new(),
        };
        log::info!("Loaded library: {}", library);
        Ok(library)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

impl fmt::Display for RhythmboxLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rhythmbox: {} tracks, {} playlists, Path: {}",
            self.tracks.len(),
            self.playlists.len(),
            self.directory.display()
        )
    }
}

impl Library for RhythmboxLibrary {
    fn format(&self) -> &'static str {
        "rhythmbox"
    }

    fn close(&mut self) {}

    fn track(&self, path: &str) -> Result<Option<TrackRef>> {
        Ok(self
            .by_path
            .get(&normalize_path(path))
            .map(|&idx| self.tracks[idx].clone()))
    }

    fn playlists(&self) -> Result<Vec<Box<dyn Tracklist>>> {
        Ok(self
            .playlists
            .iter()
            .map(|p| {
                Box::new(RhythmboxPlaylist {
                    name: p.name.clone(),
                    tracks: p.tracks.clone(),
                }) as Box<dyn Tracklist>
            })
            .collect())
    }

    fn crates(&self) -> Result<Vec<Box<dyn Tracklist>>> {
        Ok(Vec::new())
    }

    fn for_each_track(&self, visitor: &mut TrackVisitor<'_>) -> Result<()> {
        let total = self.tracks.len();
        for (idx, track) in self.tracks.iter().enumerate() {
            match visitor(idx, total, track) {
                Visit::Continue => {}
                Visit::Stop => return Ok(()),
                Visit::Fail(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}
