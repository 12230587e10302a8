//! Interchange files: human-readable dumps of tracklists
//!
//! The document is a sequence of [`TracklistRecord`]s. The encoding is picked
//! from the file extension (`.yaml`/`.yml` or `.json`); `-` writes YAML to
//! stdout.

use crate::error::LibraryError;
use crate::model::TracklistRecord;
use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Supported on-disk encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Yaml,
    Json,
}

impl Encoding {
    /// Pick the encoding from a file extension; no extension means YAML
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().map(|e| e.to_string_lossy().to_lowercase()) {
            None => Ok(Encoding::Yaml),
            Some(ext) if ext == "yaml" || ext == "yml" => Ok(Encoding::Yaml),
            Some(ext) if ext == "json" => Ok(Encoding::Json),
            Some(ext) => bail!("unsupported dump format '.{}' for {:?}", ext, path),
        }
    }
}

pub fn encode(lists: &[TracklistRecord], encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Yaml => serde_yaml::to_string(lists).context("failed to encode YAML dump"),
        Encoding::Json => {
            serde_json::to_string_pretty(lists).context("failed to encode JSON dump")
        }
    }
}

pub fn decode(content: &str, encoding: Encoding) -> Result<Vec<TracklistRecord>> {
    match encoding {
        Encoding::Yaml => serde_yaml::from_str(content).context("failed to parse YAML dump"),
        Encoding::Json => serde_json::from_str(content).context("failed to parse JSON dump"),
    }
}

/// Read a dump file
pub fn read_tracklists(path: &Path) -> Result<Vec<TracklistRecord>> {
    let encoding = Encoding::from_path(path)?;
    let content = fs::read_to_string(path)
        .map_err(|e| LibraryError::io(format!("failed to read dump {:?}", path), e))?;
    decode(&content, encoding).with_context(|| format!("invalid dump file {:?}", path))
}

/// Write a dump file, or YAML to stdout when `path` is `-`
pub fn write_tracklists(path: &Path, lists: &[TracklistRecord]) -> Result<()> {
    if path.as_os_str() == "-" {
        let content = encode(lists, Encoding::Yaml)?;
        std::io::stdout()
            .write_all(content.as_bytes())
            .context("failed to write dump to stdout")?;
        return Ok(());
    }

    let content = encode(lists, Encoding::from_path(path)?)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| LibraryError::io(format!("failed to create {:?}", parent), e))?;
    }
    fs::write(path, content)
        .map_err(|e| LibraryError::io(format!("failed to write dump {:?}", path), e))?;
    log::info!("wrote {} tracklist(s) to {:?}", lists.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rating, TrackRecord};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample() -> Vec<TracklistRecord> {
        vec![TracklistRecord {
            name: "Favorites".to_string(),
            path: "Techno/Favorites".to_string(),
            count: 1,
            tracks: vec![TrackRecord {
                title: "Song".to_string(),
                file_path: "/m/song.mp3".to_string(),
                artist: "Artist".to_string(),
                album: "Album".to_string(),
                year: 1999,
                modified: Some(Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap()),
                added: Some(Utc.with_ymd_and_hms(2019, 1, 2, 3, 4, 5).unwrap()),
                rating: Rating::new(4),
                play_count: 12,
                size: 4_000_000,
            }],
        }]
    }

    #[test]
    fn test_yaml_and_json_files_round_trip() {
        let dir = TempDir::new().unwrap();
        for name in ["dump.yaml", "dump.json"] {
            let path = dir.path().join(name);
            write_tracklists(&path, &sample()).unwrap();
            assert_eq!(read_tracklists(&path).unwrap(), sample());
        }
    }

    #[test]
    fn test_unknown_extension_rejected() {
        assert!(Encoding::from_path(Path::new("dump.bson")).is_err());
        assert_eq!(
            Encoding::from_path(Path::new("dump")).unwrap(),
            Encoding::Yaml
        );
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let lists = decode(
            "- name: Flat\n  tracks:\n    - title: A\n      filePath: /m/a.mp3\n",
            Encoding::Yaml,
        )
        .unwrap();
        assert_eq!(lists[0].effective_path(), "Flat");
        assert_eq!(lists[0].tracks[0].rating, Rating::ZERO);
        assert_eq!(lists[0].tracks[0].added, None);
    }
}
