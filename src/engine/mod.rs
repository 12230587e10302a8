//! Engine DJ library adapter
//!
//! An Engine library is split across one SQLite shard per storage location:
//! the main install under `~/Music` plus one per removable volume. Every shard
//! shares the same schema and identifies itself by a UUID; tracks copied onto
//! a volume keep a back-reference to their origin shard and row.

mod library;
mod merged;
pub mod schema;
mod shard;
mod tags;
mod track;
mod tracklist;
mod volumes;

pub use library::{
    default_database, resolve_database, EngineConfig, EngineLibrary, ENGINE_DB_RELATIVE,
    SUPPORTED_EXTENSIONS,
};
pub use merged::MergedList;
pub use schema::create_shard;
pub use shard::{Shard, TrackRow};
pub use tags::FileTags;
pub use track::{EngineTrack, Ownership};
pub use tracklist::ShardList;
pub use volumes::{FixedVolumes, MountedVolumes, VolumeSource};
