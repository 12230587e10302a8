use super::{Track, TrackRef, Tracklist};
use crate::error::LibraryError;
use crate::matcher::Matcher;
use anyhow::Result;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Visitor verdict for [`Library::for_each_track`]
#[derive(Debug)]
pub enum Visit {
    Continue,
    /// Orderly early termination, not an error
    Stop,
    /// Abort the enumeration and surface the error
    Fail(anyhow::Error),
}

/// `(index, total, track)` callback used by [`Library::for_each_track`]
pub type TrackVisitor<'a> = dyn FnMut(usize, usize, &TrackRef) -> Visit + 'a;

/// Base capability every library format provides
pub trait Library: fmt::Display {
    /// Short format name used in logs and Unsupported errors
    fn format(&self) -> &'static str;

    /// Release storage handles; safe to call more than once
    fn close(&mut self);

    /// Look a track up by file path (normalized by the implementation)
    fn track(&self, path: &str) -> Result<Option<TrackRef>>;

    fn playlists(&self) -> Result<Vec<Box<dyn Tracklist>>>;
    fn crates(&self) -> Result<Vec<Box<dyn Tracklist>>>;

    /// Visit every track once
    fn for_each_track(&self, visitor: &mut TrackVisitor<'_>) -> Result<()>;

    /// Instance-scoped match index, built on first use
    fn matcher(&self) -> &Matcher;

    /// Candidate counterparts of `track` in this library, sorted by file path
    fn matches(&self, track: &dyn Track) -> Result<Vec<TrackRef>> {
        self.matcher().find(track, self)
    }

    fn as_editor(&self) -> Option<&dyn LibraryEditor> {
        None
    }

    fn as_exporter(&mut self) -> Option<&mut dyn LibraryExporter> {
        None
    }
}

/// Optional capability: structural edits
pub trait LibraryEditor {
    fn add_file(&self, path: &Path) -> Result<TrackRef>;
    fn create_playlist(&self, path: &str) -> Result<Box<dyn Tracklist>>;
    fn create_crate(&self, path: &str) -> Result<Box<dyn Tracklist>>;
    fn move_track(&self, track: &dyn Track, new_path: &str) -> Result<()>;
    fn supported_extensions(&self) -> FileExtensions;
}

/// Optional capability: bulk export into a durable form
pub trait LibraryExporter {
    fn add_track(&mut self, track: &dyn Track) -> Result<()>;
    fn add_playlist(&mut self, list: &dyn Tracklist) -> Result<()>;
    fn export(&mut self) -> Result<()>;
}

/// Query the editor capability, failing with `Unsupported` when absent
pub fn editor<'a>(library: &'a dyn Library, operation: &'static str) -> Result<&'a dyn LibraryEditor> {
    library
        .as_editor()
        .ok_or_else(|| LibraryError::unsupported(operation, library.format()).into())
}

/// Query the exporter capability, failing with `Unsupported` when absent
pub fn exporter<'a>(
    library: &'a mut dyn Library,
    operation: &'static str,
) -> Result<&'a mut dyn LibraryExporter> {
    let format = library.format();
    library
        .as_exporter()
        .ok_or_else(|| LibraryError::unsupported(operation, format).into())
}

/// Lowercase file extensions including the dot, e.g. `.mp3`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileExtensions(BTreeSet<String>);

impl FileExtensions {
    pub fn new<I, S>(exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(exts.into_iter().map(|e| e.as_ref().to_lowercase()).collect())
    }

    pub fn contains(&self, file: &Path) -> bool {
        file.extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .is_some_and(|ext| self.0.contains(&ext))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extensions_case_insensitive() {
        let exts = FileExtensions::new([".mp3", ".FLAC"]);
        assert!(exts.contains(Path::new("/m/a.MP3")));
        assert!(exts.contains(Path::new("/m/b.flac")));
        assert!(!exts.contains(Path::new("/m/c.wav")));
        assert!(!exts.contains(Path::new("/m/noext")));
    }
}
