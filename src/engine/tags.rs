//! Tag reading for newly added files

use anyhow::{Context, Result};
use lofty::file::TaggedFileExt;
use lofty::prelude::Accessor;
use lofty::probe::Probe;
use std::path::Path;

/// Descriptive tags of an audio file; empty strings when absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: i32,
}

impl FileTags {
    pub fn read(path: &Path) -> Result<Self> {
        let tagged_file = Probe::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?
            .read()
            .with_context(|| format!("Failed to read tags from: {}", path.display()))?;

        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            return Ok(Self::default());
        };

        Ok(Self {
            title: tag.title().map(|s| s.to_string()).unwrap_or_default(),
            artist: tag.artist().map(|s| s.to_string()).unwrap_or_default(),
            album: tag.album().map(|s| s.to_string()).unwrap_or_default(),
            year: tag.year().map(|y| y as i32).unwrap_or(0),
        })
    }

    /// Tags of `path`, falling back to the file stem as title when unreadable
    pub fn read_or_stem(path: &Path) -> Self {
        let mut tags = match Self::read(path) {
            Ok(tags) => tags,
            Err(e) => {
                log::warn!("{:#}", e);
                Self::default()
            }
        };
        if tags.title.is_empty() {
            tags.title = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_file_falls_back_to_stem() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("Artist - Song.mp3");
        std::fs::write(&path, b"not really audio").unwrap();

        let tags = FileTags::read_or_stem(&path);
        assert_eq!(tags.title, "Artist - Song");
        assert_eq!(tags.year, 0);
    }
}
