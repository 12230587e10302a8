//! Format-independent contracts for tracks, tracklists and libraries
//!
//! Every adapter (engine, rhythmbox, dump) produces values implementing the
//! traits defined here; the matcher, sync engine and orchestrators only ever
//! see these traits.

mod hash;
mod library;
mod memory;
mod path;
mod playlist;
mod track;

pub use hash::content_hash;
pub use library::{
    editor, exporter, FileExtensions, Library, LibraryEditor, LibraryExporter, TrackVisitor,
    Visit,
};
pub use memory::MemoryLibrary;
pub use path::{normalize_path, relative_to, remove_accents, resolve_from};
pub use playlist::{
    dedupe, file_paths, leaf_name, ListKind, MemoryList, Tracklist, TracklistRecord,
};
pub use track::{unsupported, Rating, RecordTrack, Track, TrackRecord, TrackRef};
