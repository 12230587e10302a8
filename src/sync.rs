//! Field-level metadata sync between two libraries
//!
//! One side is enumerated, its tracks are looked up by exact file path on the
//! other side and the selected field is copied from source to target when the
//! two values differ. The source is always authoritative; the direction only
//! picks which side drives the enumeration.

use crate::model::{Library, Rating, Track, Visit};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::{Duration, Instant};

/// Per-track field a sync pass reconciles
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SyncField {
    #[value(name = "ratings")]
    Rating,
    Added,
    Modified,
    #[value(name = "plays")]
    PlayCount,
}

impl SyncField {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncField::Rating => "rating",
            SyncField::Added => "added",
            SyncField::Modified => "modified",
            SyncField::PlayCount => "play count",
        }
    }

    /// Current value of this field on `track`
    pub fn read(self, track: &dyn Track) -> FieldValue {
        match self {
            SyncField::Rating => FieldValue::Rating(track.rating()),
            SyncField::Added => FieldValue::Time(track.added().map(|t| t.timestamp())),
            SyncField::Modified => FieldValue::Time(track.modified().map(|t| t.timestamp())),
            SyncField::PlayCount => FieldValue::Count(track.play_count()),
        }
    }

    /// Store `value` on `track`
    pub fn write(self, track: &dyn Track, value: &FieldValue) -> Result<()> {
        match (self, value) {
            (SyncField::Rating, FieldValue::Rating(r)) => track.set_rating(*r),
            (SyncField::Added, FieldValue::Time(t)) => track.set_added(to_time(*t)),
            (SyncField::Modified, FieldValue::Time(t)) => track.set_modified(to_time(*t)),
            (SyncField::PlayCount, FieldValue::Count(c)) => track.set_play_count(*c),
            (field, value) => anyhow::bail!("cannot store {} as {}", value, field),
        }
    }
}

impl fmt::Display for SyncField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn to_time(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

/// A field value, timestamps reduced to whole UTC seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Rating(Rating),
    Time(Option<i64>),
    Count(u32),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Rating(r) => write!(f, "{}", r),
            FieldValue::Count(c) => write!(f, "{}", c),
            FieldValue::Time(t) => match to_time(*t) {
                Some(t) => write!(f, "{}", t.to_rfc3339()),
                None => f.write_str("none"),
            },
        }
    }
}

/// Which library drives the enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Direction {
    /// Walk the target, look tracks up in the source
    #[default]
    #[value(name = "target")]
    FromTarget,
    /// Walk the source, look tracks up in the target
    #[value(name = "source")]
    FromSource,
}

/// Configuration for a sync pass
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub field: SyncField,
    pub direction: Direction,

    /// Report would-be changes without writing
    pub dry_run: bool,

    /// Write even when both values are already equal
    pub force: bool,
}

impl SyncOptions {
    pub fn new(field: SyncField) -> Self {
        Self {
            field,
            direction: Direction::default(),
            dry_run: false,
            force: false,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// One performed (or, in a dry run, planned) update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncChange {
    pub file_path: String,
    pub title: String,
    pub old: FieldValue,
    pub new: FieldValue,
}

impl fmt::Display for SyncChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {} ({})", self.title, self.old, self.new, self.file_path)
    }
}

/// Outcome of a sync pass
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub field: SyncField,
    pub dry_run: bool,
    pub visited: usize,
    /// Includes writes that then failed
    pub changed: usize,
    pub unchanged: usize,
    /// Failed lookups plus failed writes
    pub errored: usize,
    pub not_found: usize,
    pub elapsed: Duration,
    pub changes: Vec<SyncChange>,
}

impl SyncReport {
    fn new(options: &SyncOptions) -> Self {
        Self {
            field: options.field,
            dry_run: options.dry_run,
            visited: 0,
            changed: 0,
            unchanged: 0,
            errored: 0,
            not_found: 0,
            elapsed: Duration::ZERO,
            changes: Vec::new(),
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} sync: {} tracks, {} changed, {} unchanged, {} errored, {} not found in {:?}",
            if self.dry_run { "[dry run] " } else { "" },
            self.field,
            self.visited,
            self.changed,
            self.unchanged,
            self.errored,
            self.not_found,
            self.elapsed
        )
    }
}

/// Copy `options.field` from `source` onto the matching tracks of `target`
///
/// Missing counterparts, failed lookups and failed writes are tallied, never
/// fatal. Only a failed enumeration aborts the pass.
pub fn sync(source: &dyn Library, target: &dyn Library, options: &SyncOptions) -> Result<SyncReport> {
    let start = Instant::now();
    let field = options.field;
    let mut report = SyncReport::new(options);
    let mut lookup_failed = 0;

    let (walked, counterpart) = match options.direction {
        Direction::FromTarget => (target, source),
        Direction::FromSource => (source, target),
    };
    log::info!(
        "syncing {} from {} to {}{}",
        field,
        source.format(),
        target.format(),
        if options.dry_run { " (dry run)" } else { "" }
    );

    walked.for_each_track(&mut |idx, total, track| {
        report.visited += 1;
        let path = track.file_path();

        let other = match counterpart.track(&path) {
            Ok(Some(other)) => other,
            Ok(None) => {
                log::warn!("[{}/{}] not found in {}: {}", idx + 1, total, counterpart.format(), path);
                report.not_found += 1;
                return Visit::Continue;
            }
            Err(e) => {
                log::error!("[{}/{}] failed to look up '{}': {:#}", idx + 1, total, path, e);
                report.errored += 1;
                lookup_failed += 1;
                return Visit::Continue;
            }
        };

        let (from, to) = match options.direction {
            Direction::FromTarget => (other.clone(), track.clone()),
            Direction::FromSource => (track.clone(), other.clone()),
        };
        let new = field.read(from.as_ref());
        let old = field.read(to.as_ref());
        if old == new && !options.force {
            return Visit::Continue;
        }

        let change = SyncChange {
            file_path: to.file_path(),
            title: to.title(),
            old,
            new,
        };
        report.changed += 1;

        if options.dry_run {
            log::info!("[{}/{}] would update {}", idx + 1, total, change);
        } else if let Err(e) = field
            .write(to.as_ref(), &change.new)
            .with_context(|| format!("failed to update {} of '{}'", field, change.file_path))
        {
            log::error!("{:#}", e);
            report.errored += 1;
        } else {
            log::info!("[{}/{}] updated {}", idx + 1, total, change);
        }
        report.changes.push(change);
        Visit::Continue
    })?;

    report.unchanged = report.visited - report.changed - report.not_found - lookup_failed;
    report.elapsed = start.elapsed();
    log::info!("{}", report);
    Ok(report)
}
