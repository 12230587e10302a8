use super::{
    normalize_path, Library, LibraryExporter, MemoryList, RecordTrack, Track, TrackRecord,
    TrackRef, TrackVisitor, Tracklist, TracklistRecord, Visit,
};
use crate::interchange;
use crate::matcher::Matcher;
use anyhow::Result;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Library held entirely in memory
///
/// Used as the `dump` format: it can be loaded from an interchange file and,
/// as an exporter, writes its playlists back to one. Edits made through track
/// setters are written back to the output on `close()`.
pub struct MemoryLibrary {
    name: String,

    /// Tracks in insertion order
    tracks: Vec<Rc<RecordTrack>>,

    /// Canonical path -> index into `tracks` (first occurrence wins)
    by_path: HashMap<String, usize>,

    playlists: Vec<Rc<MemoryList>>,
    crates: Vec<Rc<MemoryList>>,

    /// Destination written by `export()`
    output: Option<PathBuf>,

    /// Set when a track was edited after the last write
    dirty: Rc<Cell<bool>>,

    matcher: Matcher,
}

impl MemoryLibrary {
    /// Create a new empty library
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
            by_path: HashMap::new(),
            playlists: Vec::new(),
            crates: Vec::new(),
            output: None,
            dirty: Rc::new(Cell::new(false)),
            matcher: Matcher::new(),
        }
    }

    /// Export target writing to `path` (extension picks the encoding)
    pub fn with_output(mut self, path: PathBuf) -> Self {
        self.output = Some(path);
        self
    }

    /// Load every tracklist of a dump file as a playlist
    pub fn load(path: &Path) -> Result<Self> {
        let lists = interchange::read_tracklists(path)?;
        let mut lib = Self::new(format!("Dump: {}", path.display())).with_output(path.to_path_buf());
        for list in lists {
            lib.insert_list(&list);
        }
        log::info!(
            "Loaded dump {:?}: {} tracks, {} playlists",
            path,
            lib.track_count(),
            lib.playlist_count()
        );
        Ok(lib)
    }

    /// Add a track record, returning the stored view
    ///
    /// A second record with the same canonical path is kept but not indexed.
    pub fn insert(&mut self, mut record: TrackRecord) -> Rc<RecordTrack> {
        record.file_path = normalize_path(&record.file_path);
        let track = Rc::new(RecordTrack::tracked(record, self.dirty.clone()));
        let path = track.file_path();
        if self.by_path.contains_key(&path) {
            log::warn!("duplicate entry for path '{}' in {}", path, self.name);
        } else {
            self.by_path.insert(path, self.tracks.len());
        }
        self.tracks.push(track.clone());
        track
    }

    /// Add a playlist from its record, reusing already-known tracks by path
    pub fn insert_list(&mut self, list: &TracklistRecord) -> Rc<MemoryList> {
        let tracks: Vec<TrackRef> = list
            .tracks
            .iter()
            .map(|record| self.resolve_or_insert(record.clone()))
            .collect();
        let playlist = MemoryList::with_tracks(list.effective_path(), tracks);
        self.playlists.push(playlist.clone());
        playlist
    }

    /// Add an (initially empty) crate
    pub fn insert_crate(&mut self, path: &str) -> Rc<MemoryList> {
        let list = MemoryList::new(path);
        self.crates.push(list.clone());
        list
    }

    fn resolve_or_insert(&mut self, record: TrackRecord) -> TrackRef {
        let path = normalize_path(&record.file_path);
        match self.by_path.get(&path) {
            Some(&idx) => self.tracks[idx].clone(),
            None => self.insert(record),
        }
    }

    /// True when tracks were edited since the last write
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Total number of tracks
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Total number of playlists
    pub fn playlist_count(&self) -> usize {
        self.playlists.len()
    }

    fn snapshot(&self) -> Result<Vec<TracklistRecord>> {
        self.playlists
            .iter()
            .chain(self.crates.iter())
            .map(|list| TracklistRecord::from_tracklist(list))
            .collect()
    }
}

impl fmt::Display for MemoryLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} tracks, {} playlists)",
            self.name,
            self.tracks.len(),
            self.playlists.len()
        )
    }
}

impl Drop for MemoryLibrary {
    fn drop(&mut self) {
        self.close();
    }
}

impl Library for MemoryLibrary {
    fn format(&self) -> &'static str {
        "dump"
    }

    fn close(&mut self) {
        if !self.dirty.get() {
            return;
        }
        if self.output.is_none() {
            log::warn!("{} was edited but has no output, changes are lost", self.name);
            self.dirty.set(false);
            return;
        }
        if let Err(e) = self.export() {
            log::error!("failed to write back {}: {:#}", self.name, e);
        }
    }

    fn track(&self, path: &str) -> Result<Option<TrackRef>> {
        Ok(self
            .by_path
            .get(&normalize_path(path))
            .map(|&idx| self.tracks[idx].clone() as TrackRef))
    }

    fn playlists(&self) -> Result<Vec<Box<dyn Tracklist>>> {
        Ok(self
            .playlists
            .iter()
            .map(|l| Box::new(l.clone()) as Box<dyn Tracklist>)
            .collect())
    }

    fn crates(&self) -> Result<Vec<Box<dyn Tracklist>>> {
        Ok(self
            .crates
            .iter()
            .map(|l| Box::new(l.clone()) as Box<dyn Tracklist>)
            .collect())
    }

    fn for_each_track(&self, visitor: &mut TrackVisitor<'_>) -> Result<()> {
        let total = self.tracks.len();
        for (idx, track) in self.tracks.iter().enumerate() {
            let track: TrackRef = track.clone();
            match visitor(idx, total, &track) {
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

    fn as_exporter(&mut self) -> Option<&mut dyn LibraryExporter> {
        Some(self)
    }
}

impl LibraryExporter for MemoryLibrary {
    fn add_track(&mut self, track: &dyn Track) -> Result<()> {
        self.insert(TrackRecord::from_track(track));
        Ok(())
    }

    fn add_playlist(&mut self, list: &dyn Tracklist) -> Result<()> {
        let record = TracklistRecord::from_tracklist(list)?;
        self.insert_list(&record);
        Ok(())
    }

    fn export(&mut self) -> Result<()> {
        let lists = self.snapshot()?;
        match &self.output {
            Some(path) => {
                interchange::write_tracklists(path, &lists)?;
                self.dirty.set(false);
                Ok(())
            }
            None => {
                log::info!("{} has no output configured, nothing written", self.name);
                Ok(())
            }
        }
    }
}
