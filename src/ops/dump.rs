//! Summaries of a library's tracklists

use crate::interchange;
use crate::model::{Library, ListKind, TracklistRecord};
use anyhow::Result;
use std::fmt;
use std::path::Path;

/// One line of a dump summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSummary {
    pub kind: ListKind,
    pub path: String,
    pub count: usize,
}

impl fmt::Display for ListSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<8} {:>5}  {}", self.kind, self.count, self.path)
    }
}

/// Summarise every playlist and crate of `library`; with `output`, also
/// write the full lists there in the interchange format
pub fn dump_library(library: &dyn Library, output: Option<&Path>) -> Result<Vec<ListSummary>> {
    let mut summaries = Vec::new();
    let mut records = Vec::new();

    for (kind, lists) in [
        (ListKind::Playlist, library.playlists()?),
        (ListKind::Crate, library.crates()?),
    ] {
        for list in lists {
            summaries.push(ListSummary {
                kind,
                path: list.path(),
                count: list.count()?,
            });
            if output.is_some() {
                records.push(TracklistRecord::from_tracklist(list.as_ref())?);
            }
        }
    }

    if let Some(path) = output {
        interchange::write_tracklists(path, &records)?;
    }
    log::info!("{}: {} lists", library, summaries.len());
    Ok(summaries)
}
