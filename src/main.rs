use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dj_library_sync::model::ListKind;
use dj_library_sync::ops::{
    add_files, dump_library, export_library, find_duplicates, fix_missing, import_tracklists, sync,
    Direction, ExportOptions, FixMode, ImportOptions, LibrarySpec, OpenOptions, SyncField,
    SyncOptions,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dj-library-sync")]
#[command(about = "Sync metadata and playlists between DJ libraries", long_about = None)]
struct Args {
    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Do not look for Engine databases on removable volumes
    #[arg(long, global = true)]
    no_volumes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy one per-track field from the source to the target library
    Sync {
        field: SyncField,

        /// Source library, `<engine|rhythmbox|dump>[:<path>]`
        #[arg(short = 's', long, default_value = "rhythmbox")]
        source: LibrarySpec,

        /// Target library
        #[arg(short = 't', long, default_value = "engine")]
        target: LibrarySpec,

        /// Library whose tracks are enumerated
        #[arg(long, value_enum, default_value_t = Direction::FromTarget)]
        walk: Direction,

        /// Write even when values are already equal
        #[arg(short = 'f', long)]
        force: bool,

        /// Report changes without writing them
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Create playlists or crates from a dump file
    Import {
        kind: KindArg,

        /// Dump file (.yaml, .yml or .json)
        #[arg(short = 'i', long)]
        input: PathBuf,

        #[arg(short = 't', long, default_value = "engine")]
        target: LibrarySpec,

        /// Import only lists whose path matches (`*` wildcard, repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Skip tracks that cannot be matched instead of skipping their list
        #[arg(long)]
        ignore_not_found: bool,

        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Copy a whole library into an exporting library (e.g. a dump)
    Export {
        #[arg(short = 's', long, default_value = "rhythmbox")]
        source: LibrarySpec,

        #[arg(short = 't', long)]
        target: LibrarySpec,

        /// Export only specific lists (can be specified multiple times)
        #[arg(long = "playlist")]
        playlists_filter: Vec<String>,

        /// Leave crates out
        #[arg(long)]
        no_crates: bool,
    },

    /// List playlists and crates, optionally writing them to a dump file
    Dump {
        #[arg(short = 's', long, default_value = "engine")]
        source: LibrarySpec,

        /// Dump file (`-` for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Add new audio files from a directory
    Add {
        dir: PathBuf,

        #[arg(short = 't', long, default_value = "engine")]
        target: LibrarySpec,

        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Report case-colliding paths or relink tracks whose file is gone
    Fix {
        mode: FixMode,

        #[arg(short = 's', long, default_value = "engine")]
        source: LibrarySpec,

        /// Directory searched for moved files (`missing` only)
        #[arg(short = 'p', long)]
        search_path: Option<PathBuf>,

        /// Report relinks without writing them
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Playlists,
    Crates,
}

impl From<KindArg> for ListKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Playlists => ListKind::Playlist,
            KindArg::Crates => ListKind::Crate,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let open = OpenOptions::new().with_volume_discovery(!args.no_volumes);

    match args.command {
        Command::Sync {
            field,
            source,
            target,
            walk,
            force,
            dry_run,
        } => {
            let mut source = source.open(&open)?;
            let mut target = target.open(&open)?;
            let options = SyncOptions::new(field)
                .with_direction(walk)
                .with_force(force)
                .with_dry_run(dry_run);
            let report = sync(source.as_ref(), target.as_ref(), &options);
            source.close();
            target.close();

            let report = report?;
            for change in &report.changes {
                println!("{}", change);
            }
            println!("{}", report);
            if report.errored > 0 {
                bail!("{} tracks could not be updated", report.errored);
            }
        }

        Command::Import {
            kind,
            input,
            target,
            filters,
            ignore_not_found,
            dry_run,
        } => {
            let mut target = target.open(&open)?;
            let options = ImportOptions::new(kind.into())
                .with_filters(filters)
                .with_ignore_not_found(ignore_not_found)
                .with_dry_run(dry_run);
            let report = import_tracklists(target.as_ref(), &input, &options);
            target.close();

            let report = report?;
            if !report.failed.is_empty() {
                bail!("lists not imported: {}", report.failed.join(", "));
            }
        }

        Command::Export {
            source,
            target,
            playlists_filter,
            no_crates,
        } => {
            let mut source = source.open(&open)?;
            let mut target = target.open(&open)?;

            let mut options = ExportOptions::new().with_crates(!no_crates);
            if !playlists_filter.is_empty() {
                log::info!(
                    "Filtering to {} list(s): {:?}",
                    playlists_filter.len(),
                    playlists_filter
                );
                options = options.with_playlists(playlists_filter);
            }
            let report = export_library(source.as_ref(), target.as_mut(), &options);
            source.close();
            target.close();
            report?;
        }

        Command::Dump { source, output } => {
            let mut source = source.open(&open)?;
            let summaries = dump_library(source.as_ref(), output.as_deref());
            source.close();

            // stdout is reserved for the dump itself
            if output.is_none() {
                for summary in summaries? {
                    println!("{}", summary);
                }
            } else {
                summaries?;
            }
        }

        Command::Add {
            dir,
            target,
            dry_run,
        } => {
            let mut target = target.open(&open)?;
            let report = add_files(target.as_ref(), &dir, dry_run);
            target.close();
            report?;
        }

        Command::Fix {
            mode,
            source,
            search_path,
            dry_run,
        } => match mode {
            FixMode::Duplicate => {
                let mut source = source.open(&open)?;
                let groups = find_duplicates(source.as_ref());
                source.close();
                for paths in groups? {
                    println!("{}", paths.join("\n"));
                    println!();
                }
            }
            FixMode::Missing => {
                let Some(search_path) = search_path else {
                    bail!("fix missing needs --search-path");
                };
                let mut source = source.open(&open)?;
                let report = fix_missing(source.as_ref(), &search_path, dry_run);
                source.close();

                let report = report?;
                if report.errored > 0 {
                    bail!("{} tracks could not be relinked", report.errored);
                }
            }
        },
    }

    Ok(())
}
