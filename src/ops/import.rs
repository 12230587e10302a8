//! Import tracklists from a dump file into an editable library

use crate::interchange;
use crate::model::{editor, Library, ListKind, TrackRef, TracklistRecord};
use anyhow::{Context, Result};
use std::path::Path;

/// Configuration for an import
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Create playlists or crates
    pub kind: ListKind,

    /// `*` wildcard patterns on the list path (empty = import all)
    pub filters: Vec<String>,

    /// Skip tracks with no match instead of failing their list
    pub ignore_not_found: bool,

    pub dry_run: bool,
}

impl ImportOptions {
    pub fn new(kind: ListKind) -> Self {
        Self {
            kind,
            filters: Vec::new(),
            ignore_not_found: false,
            dry_run: false,
        }
    }

    pub fn with_filters(mut self, filters: Vec<String>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_ignore_not_found(mut self, ignore: bool) -> Self {
        self.ignore_not_found = ignore;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn selects(&self, path: &str) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| wildcard_match(f, path))
    }
}

/// Outcome of an import
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub skipped: usize,
    /// Lists left untouched because a track had no match
    pub failed: Vec<String>,
    pub matched: usize,
    pub not_found: usize,
}

/// `*` matches any run of characters, everything else literally
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}

/// Import every selected list of the dump at `path` into `target`
pub fn import_tracklists(target: &dyn Library, path: &Path, options: &ImportOptions) -> Result<ImportReport> {
    let lists = interchange::read_tracklists(path)?;
    import_records(target, &lists, options)
}

/// Resolve each record through `target.matches` (first match wins) and
/// rewrite the list of the same path in `target`
pub fn import_records(
    target: &dyn Library,
    lists: &[TracklistRecord],
    options: &ImportOptions,
) -> Result<ImportReport> {
    let edit = editor(target, "Import")?;
    let mut report = ImportReport::default();

    for list in lists {
        let path = list.effective_path();
        if !options.selects(path) {
            log::debug!("skipping '{}'", path);
            report.skipped += 1;
            continue;
        }

        let mut tracks: Vec<TrackRef> = Vec::with_capacity(list.tracks.len());
        let mut missing = 0;
        for record in &list.tracks {
            let needle = record.clone().into_track();
            let found = target
                .matches(needle.as_ref())
                .with_context(|| format!("failed to match '{}'", record.file_path))?;
            match found.into_iter().next() {
                Some(track) => tracks.push(track),
                None => {
                    log::warn!("'{}': no match for {}", path, record.file_path);
                    missing += 1;
                }
            }
        }
        report.matched += tracks.len();
        report.not_found += missing;

        if missing > 0 && !options.ignore_not_found {
            log::error!("'{}': {} tracks not found, list not imported", path, missing);
            report.failed.push(path.to_string());
            continue;
        }

        if options.dry_run {
            log::info!("would set {} tracks on {} '{}'", tracks.len(), options.kind, path);
        } else {
            let created = match options.kind {
                ListKind::Playlist => edit.create_playlist(path)?,
                ListKind::Crate => edit.create_crate(path)?,
            };
            created.set_tracks(&tracks)?;
            log::info!("imported {} '{}' ({} tracks)", options.kind, path, tracks.len());
        }
        report.imported.push(path.to_string());
    }

    log::info!(
        "import: {} lists imported, {} skipped, {} failed; {} tracks matched, {} not found",
        report.imported.len(),
        report.skipped,
        report.failed.len(),
        report.matched,
        report.not_found
    );
    Ok(report)
}
