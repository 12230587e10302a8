//! Repairs for file references that went stale
//!
//! `duplicate` reports tracks whose paths only differ by case, which breaks
//! libraries copied to case-insensitive volumes. `missing` relinks tracks whose
//! file is gone to a file with the same metadata found under a search directory.

use crate::engine::FileTags;
use crate::model::{editor, FileExtensions, Library, MemoryLibrary, TrackRecord, TrackRef, Visit};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FixMode {
    /// Report tracks whose paths differ only by case
    Duplicate,
    /// Relink tracks whose file no longer exists
    Missing,
}

/// Groups of paths that collide once lowercased, in path order
pub fn find_duplicates(library: &dyn Library) -> Result<Vec<Vec<String>>> {
    let mut by_folded: BTreeMap<String, Vec<String>> = BTreeMap::new();
    library.for_each_track(&mut |_, _, track| {
        let path = track.file_path();
        by_folded.entry(path.to_lowercase()).or_default().push(path);
        Visit::Continue
    })?;

    let groups: Vec<Vec<String>> = by_folded
        .into_values()
        .filter(|paths| paths.len() > 1)
        .collect();
    for paths in &groups {
        log::warn!("paths differing only by case:\n  {}", paths.join("\n  "));
    }
    log::info!(
        "{} duplicate paths found in {}",
        groups.iter().map(Vec::len).sum::<usize>(),
        library.format()
    );
    Ok(groups)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixReport {
    pub missing: usize,
    /// Relinked, or would be on a dry run
    pub relinked: usize,
    pub unmatched: usize,
    pub errored: usize,
}

/// Library of every supported file under `dir`, described by its tags
pub fn scan_directory(dir: &Path, extensions: &FileExtensions) -> Result<MemoryLibrary> {
    let mut library = MemoryLibrary::new(format!("Files: {}", dir.display()));

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !extensions.contains(entry.path()) {
            continue;
        }

        let path = entry.path();
        let tags = FileTags::read_or_stem(path);
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        library.insert(TrackRecord {
            title: tags.title,
            artist: tags.artist,
            album: tags.album,
            year: tags.year,
            file_path: path.to_string_lossy().into_owned(),
            size,
            ..Default::default()
        });
    }

    log::info!("scanned {} files under {}", library.track_count(), dir.display());
    Ok(library)
}

/// Point tracks whose file is gone at a matching file under `search_path`
///
/// The first match wins when several files carry the same metadata.
pub fn fix_missing(library: &dyn Library, search_path: &Path, dry_run: bool) -> Result<FixReport> {
    let edit = editor(library, "MoveTrack")?;
    let search = scan_directory(search_path, &edit.supported_extensions())?;
    let mut report = FixReport::default();

    let mut missing: Vec<TrackRef> = Vec::new();
    library.for_each_track(&mut |_, _, track| {
        if !Path::new(&track.file_path()).exists() {
            missing.push(track.clone());
        }
        Visit::Continue
    })?;
    report.missing = missing.len();

    for track in &missing {
        let old_path = track.file_path();
        log::warn!("missing file for '{}': {}", track, old_path);

        let matches = match search.matches(track.as_ref()) {
            Ok(matches) => matches,
            Err(e) => {
                log::error!("failed to match '{}': {:#}", track, e);
                report.errored += 1;
                continue;
            }
        };
        let Some(first) = matches.first() else {
            log::error!("no match for '{}' under {}", track, search_path.display());
            report.unmatched += 1;
            continue;
        };
        let new_path = first.file_path();
        if matches.len() > 1 {
            log::info!("{} candidates for '{}', using {}", matches.len(), track, new_path);
        }

        if dry_run {
            log::info!("{} would be changed to {}", old_path, new_path);
            report.relinked += 1;
            continue;
        }
        match edit.move_track(track.as_ref(), &new_path) {
            Ok(()) => {
                log::info!("relinked {} to {}", old_path, new_path);
                report.relinked += 1;
            }
            Err(e) => {
                log::error!("failed to relink '{}': {:#}", track, e);
                report.errored += 1;
            }
        }
    }

    log::info!(
        "fix: {} missing, {} relinked, {} unmatched, {} errored",
        report.missing,
        report.relinked,
        report.unmatched,
        report.errored
    );
    Ok(report)
}
