//! DJ Library Sync - reconcile DJ libraries across formats
//!
//! This library matches tracks between music libraries (Engine, Rhythmbox,
//! interchange dumps), syncs per-track metadata such as ratings and play
//! counts, and moves playlists and crates from one library to another.

pub mod engine;
pub mod error;
pub mod interchange;
pub mod matcher;
pub mod model;
pub mod ops;
pub mod rhythmbox;
pub mod sync;

pub use error::LibraryError;
pub use matcher::Matcher;
pub use model::{Library, Track, Tracklist};
pub use ops::{LibrarySpec, OpenOptions};
pub use sync::{sync, SyncField, SyncOptions, SyncReport};
