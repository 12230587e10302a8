//! Add audio files from a directory tree to an editable library

use crate::model::{editor, normalize_path, Library};
use anyhow::Result;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    pub added: usize,
    pub existing: usize,
    pub unsupported: usize,
    pub errored: usize,
}

/// Add every supported file under `dir` that `library` does not know yet
pub fn add_files(library: &dyn Library, dir: &Path, dry_run: bool) -> Result<AddReport> {
    let edit = editor(library, "AddFile")?;
    let extensions = edit.supported_extensions();
    let mut report = AddReport::default();

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                report.errored += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !extensions.contains(path) {
            report.unsupported += 1;
            continue;
        }
        if library.track(&normalize_path(&path.to_string_lossy()))?.is_some() {
            report.existing += 1;
            continue;
        }

        if dry_run {
            log::info!("would add {}", path.display());
            report.added += 1;
            continue;
        }
        match edit.add_file(path) {
            Ok(track) => {
                log::info!("added {}", track);
                report.added += 1;
            }
            Err(e) => {
                log::error!("failed to add {}: {:#}", path.display(), e);
                report.errored += 1;
            }
        }
    }

    log::info!(
        "add: {} added, {} already present, {} unsupported, {} errored",
        report.added,
        report.existing,
        report.unsupported,
        report.errored
    );
    Ok(report)
}
