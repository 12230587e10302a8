//! Orchestrators driving the core over whole libraries

pub mod add;
pub mod config;
pub mod dump;
pub mod export;
pub mod fix;
pub mod import;

pub use add::{add_files, AddReport};
pub use config::{LibrarySpec, OpenOptions};
pub use dump::{dump_library, ListSummary};
pub use export::{export_library, ExportOptions, ExportReport};
pub use fix::{find_duplicates, fix_missing, scan_directory, FixMode, FixReport};
pub use import::{import_records, import_tracklists, wildcard_match, ImportOptions, ImportReport};
pub use crate::sync::{sync, Direction, SyncChange, SyncField, SyncOptions, SyncReport};
