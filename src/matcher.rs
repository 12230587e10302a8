//! Track identity resolution across libraries
//!
//! A needle track is resolved in a target library by exact canonical path
//! first, then by content hash. The hash index covers the whole target
//! catalog; it is built once, on the first hash lookup, and owned by the
//! target library instance.
//!
//! The index lives in a `OnceCell`: libraries share track views through `Rc`
//! and are therefore neither `Send` nor `Sync`, so construction cannot race.

use crate::model::{content_hash, dedupe, file_paths, normalize_path, Library, Track, TrackRef, Visit};
use anyhow::Result;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

/// Build-once cache of `content hash -> tracks` for one library instance
#[derive(Default)]
pub struct Matcher {
    index: OnceCell<HashMap<String, Vec<TrackRef>>>,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the hash index has been built yet
    pub fn is_built(&self) -> bool {
        self.index.get().is_some()
    }

    /// Find candidate counterparts of `needle` in `target`
    ///
    /// A plausible exact-path hit is returned alone. Otherwise every track
    /// sharing the needle's content hash is returned, de-duplicated and sorted
    /// by file path. No match yields an empty vector.
    pub fn find<L: Library + ?Sized>(&self, needle: &dyn Track, target: &L) -> Result<Vec<TrackRef>> {
        let path = normalize_path(&needle.file_path());
        if let Some(found) = target.track(&path)? {
            if is_plausible(needle, found.as_ref()) {
                log::debug!("exact path match for '{}' in {}", path, target.format());
                return Ok(vec![found]);
            }
            log::debug!(
                "path match for '{}' rejected: size {} != {}",
                path,
                found.size(),
                needle.size()
            );
        }

        let index = self.index(target)?;
        let candidates = index
            .get(&content_hash(needle))
            .cloned()
            .unwrap_or_default();
        Ok(dedupe(candidates))
    }

    fn index<L: Library + ?Sized>(&self, target: &L) -> Result<&HashMap<String, Vec<TrackRef>>> {
        if let Some(index) = self.index.get() {
            return Ok(index);
        }
        let built = build_index(target)?;
        Ok(self.index.get_or_init(|| built))
    }
}

fn build_index<L: Library + ?Sized>(target: &L) -> Result<HashMap<String, Vec<TrackRef>>> {
    let start = Instant::now();
    log::info!("constructing track hashes from {} metadata", target.format());

    let mut index: HashMap<String, Vec<TrackRef>> = HashMap::new();
    target.for_each_track(&mut |_, _, track| {
        let hash = content_hash(track.as_ref());
        let bucket = index.entry(hash).or_default();
        if !bucket.is_empty() {
            let mut paths = file_paths(bucket);
            paths.push(track.file_path());
            log::warn!(
                "duplicate metadata for '{}':\n  {}",
                track,
                paths.join("\n  ")
            );
        }
        bucket.push(track.clone());
        Visit::Continue
    })?;

    log::info!(
        "hashed {} distinct tracks in {:?}",
        index.len(),
        start.elapsed()
    );
    Ok(index)
}

/// The file still exists, or (without filesystem access) the sizes agree
fn is_plausible(needle: &dyn Track, found: &dyn Track) -> bool {
    if Path::new(&found.file_path()).exists() {
        return true;
    }
    needle.size() == 0 || found.size() == 0 || needle.size() == found.size()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemoryLibrary, Rating, TrackRecord};

    fn record(title: &str, path: &str) -> TrackRecord {
        TrackRecord {
            title: title.to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            year: 2001,
            file_path: path.to_string(),
            size: 1000,
            ..Default::default()
        }
    }

    fn library() -> MemoryLibrary {
        let mut lib = MemoryLibrary::new("test");
        lib.insert(record("One", "/lib/one.mp3"));
        lib.insert(record("Two", "/lib/two.mp3"));
        lib
    }

    #[test]
    fn test_exact_path_match_is_singleton() {
        let lib = library();
        // Same path, completely different metadata
        let needle = TrackRecord {
            title: "Other".to_string(),
            rating: Rating::new(2),
            ..record("Other", "/lib/one.mp3")
        }
        .into_track();

        let found = lib.matches(needle.as_ref()).unwrap();
        assert_eq!(file_paths(&found), vec!["/lib/one.mp3"]);
        assert!(!lib.matcher().is_built());
    }

    #[test]
    fn test_hash_match_when_path_differs() {
        let lib = library();
        let needle = record("Two", "/elsewhere/2.mp3").into_track();

        let found = lib.matches(needle.as_ref()).unwrap();
        assert_eq!(file_paths(&found), vec!["/lib/two.mp3"]);
        assert!(lib.matcher().is_built());
    }

    #[test]
    fn test_no_match_is_empty() {
        let lib = library();
        let needle = record("Three", "/elsewhere/3.mp3").into_track();
        assert!(lib.matches(needle.as_ref()).unwrap().is_empty());
    }

    #[test]
    fn test_size_mismatch_falls_back_to_hash() {
        let lib = library();
        let needle = TrackRecord {
            size: 5,
            ..record("Nope", "/lib/one.mp3")
        }
        .into_track();
        assert!(lib.matches(needle.as_ref()).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_metadata_keeps_both() {
        let mut lib = library();
        lib.insert(record("Two", "/lib/copy-of-two.mp3"));

        let needle = record("Two", "/elsewhere/2.mp3").into_track();
        let found = lib.matches(needle.as_ref()).unwrap();
        assert_eq!(
            file_paths(&found),
            vec!["/lib/copy-of-two.mp3", "/lib/two.mp3"]
        );
    }
}
