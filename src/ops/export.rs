//! Export a whole library into an exporter target

use crate::model::{exporter, Library, Tracklist, Visit};
use anyhow::{Context, Result};
use std::collections::HashSet;

/// Configuration for the export process
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Specific list paths to export (None = export all)
    pub playlist_filter: Option<Vec<String>>,

    /// Also export crates
    pub include_crates: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self {
            playlist_filter: None,
            include_crates: true,
        }
    }

    /// Set specific lists to export
    pub fn with_playlists(mut self, playlists: Vec<String>) -> Self {
        self.playlist_filter = Some(playlists);
        self
    }

    pub fn with_crates(mut self, include: bool) -> Self {
        self.include_crates = include;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub tracks: usize,
    pub lists: usize,
}

/// Copy every track, then every selected list, of `source` into `target` and flush it
pub fn export_library(
    source: &dyn Library,
    target: &mut dyn Library,
    options: &ExportOptions,
) -> Result<ExportReport> {
    log::info!("Starting export from {} to {}", source.format(), target.format());
    let target_name = target.to_string();
    let out = exporter(target, "Export")?;

    let mut lists: Vec<Box<dyn Tracklist>> = source.playlists()?;
    if options.include_crates {
        lists.extend(source.crates()?);
    }

    // Filter lists if a filter is specified; only their tracks are exported
    let wanted: Option<HashSet<String>> = match &options.playlist_filter {
        Some(filter) => {
            log::info!("Filtering to lists: {:?}", filter);
            lists.retain(|l| filter.contains(&l.path()));
            let mut paths = HashSet::new();
            for list in &lists {
                for track in list.tracks()? {
                    paths.insert(track.file_path());
                }
            }
            Some(paths)
        }
        None => None,
    };

    let mut report = ExportReport::default();
    source.for_each_track(&mut |idx, total, track| {
        if wanted.as_ref().is_some_and(|w| !w.contains(&track.file_path())) {
            return Visit::Continue;
        }
        log::debug!("[{}/{}] Exporting: {} - {}", idx + 1, total, track.artist(), track.title());
        match out
            .add_track(track.as_ref())
            .with_context(|| format!("Failed to export track: {}", track.file_path()))
        {
            Ok(()) => {
                report.tracks += 1;
                Visit::Continue
            }
            Err(e) => Visit::Fail(e),
        }
    })?;

    for list in &lists {
        log::info!("Exporting list: {} ({} tracks)", list.path(), list.count()?);
        out.add_playlist(list.as_ref())
            .with_context(|| format!("Failed to export list: {}", list.path()))?;
        report.lists += 1;
    }

    out.export()
        .with_context(|| format!("Failed to write {}", target_name))?;
    log::info!(
        "Export complete: {} tracks, {} lists",
        report.tracks,
        report.lists
    );
    Ok(report)
}
