use super::shard::{Shard, ShardSet, TrackColumn, TrackRow};
use crate::model::{Rating, Track};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Who owns a track row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    /// The row is the original
    Local,
    /// The row is a copy of `remote_id` in the shard identified by `shard_uuid`
    ExternalRef { shard_uuid: String, remote_id: i64 },
}

impl Ownership {
    pub(crate) fn from_columns(own_uuid: &str, uuid: Option<String>, id: Option<i64>) -> Self {
        match (uuid, id) {
            (Some(uuid), Some(id)) if !uuid.is_empty() && uuid != own_uuid => Ownership::ExternalRef {
                shard_uuid: uuid,
                remote_id: id,
            },
            _ => Ownership::Local,
        }
    }
}

pub(crate) fn to_time(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

pub(crate) fn from_time(time: Option<DateTime<Utc>>) -> Option<i64> {
    time.map(|t| t.timestamp())
}

/// Track view over one row of one shard
pub struct EngineTrack {
    shard: Rc<Shard>,
    set: Rc<ShardSet>,
    row: RefCell<TrackRow>,
}

impl EngineTrack {
    pub fn new(shard: Rc<Shard>, set: Rc<ShardSet>, row: TrackRow) -> Rc<Self> {
        Rc::new(Self {
            shard,
            set,
            row: RefCell::new(row),
        })
    }

    pub fn id(&self) -> i64 {
        self.row.borrow().id
    }

    pub fn shard(&self) -> &Rc<Shard> {
        &self.shard
    }

    pub fn ownership(&self) -> Ownership {
        self.row.borrow().ownership.clone()
    }

    /// `(shard uuid, row id)` of the original row
    pub fn origin_key(&self) -> (String, i64) {
        let row = self.row.borrow();
        match &row.ownership {
            Ownership::Local => (self.shard.uuid().to_string(), row.id),
            Ownership::ExternalRef {
                shard_uuid,
                remote_id,
            } => (shard_uuid.clone(), *remote_id),
        }
    }

    /// True when this view belongs to the aggregator owning `set`
    pub(crate) fn belongs_to(&self, set: &Rc<ShardSet>) -> bool {
        Rc::ptr_eq(&self.set, set)
    }

    /// Write a column on this row, then on the origin row and every other copy
    ///
    /// The cached row is refreshed as soon as the local write lands; shards
    /// that could not be brought in line are named in the returned error.
    fn write(
        &self,
        column: TrackColumn,
        value: Option<i64>,
        apply: impl FnOnce(&mut TrackRow),
    ) -> Result<()> {
        let id = self.id();
        self.shard
            .update_track(id, column, value)
            .with_context(|| format!("failed to update '{}'", self))?;
        apply(&mut *self.row.borrow_mut());

        let (origin_uuid, origin_id) = self.origin_key();
        let mut unsynced = Vec::new();
        for shard in self.set.iter() {
            if Rc::ptr_eq(shard, &self.shard) {
                continue;
            }
            if let Err(e) = self.propagate(shard, &origin_uuid, origin_id, column, value) {
                log::error!("failed to update '{}' in '{}': {:#}", self, shard.origin(), e);
                unsynced.push(shard.origin().to_string());
            }
        }
        if !unsynced.is_empty() {
            bail!(
                "'{}' updated locally but not in: {}",
                self,
                unsynced.join(", ")
            );
        }
        Ok(())
    }

    fn propagate(
        &self,
        shard: &Shard,
        origin_uuid: &str,
        origin_id: i64,
        column: TrackColumn,
        value: Option<i64>,
    ) -> Result<()> {
        if shard.uuid() == origin_uuid {
            shard.update_track(origin_id, column, value)?;
            log::debug!("updated origin of '{}' in '{}'", self, shard.origin());
        }
        let copies = shard.update_copies(origin_uuid, origin_id, column, value)?;
        if copies > 0 {
            log::debug!("updated {} copies of '{}' in '{}'", copies, self, shard.origin());
        }
        Ok(())
    }

    /// Relocate the underlying file reference
    pub(crate) fn set_path(&self, new_path: &str) -> Result<()> {
        let stored = self.shard.update_path(self.id(), new_path)?;
        self.row.borrow_mut().path = stored;
        Ok(())
    }
}

impl fmt::Display for EngineTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = self.row.borrow();
        if row.title.is_empty() {
            write!(f, "{}", row.path)
        } else {
            write!(f, "{}", row.title)
        }
    }
}

impl Track for EngineTrack {
    fn title(&self) -> String {
        self.row.borrow().title.clone()
    }

    fn artist(&self) -> String {
        self.row.borrow().artist.clone()
    }

    fn album(&self) -> String {
        self.row.borrow().album.clone()
    }

    fn year(&self) -> i32 {
        self.row.borrow().year
    }

    fn file_path(&self) -> String {
        self.shard.resolve(&self.row.borrow().path)
    }

    fn size(&self) -> u64 {
        self.row.borrow().file_bytes
    }

    fn rating(&self) -> Rating {
        Rating::from_percent(self.row.borrow().rating)
    }

    fn set_rating(&self, rating: Rating) -> Result<()> {
        let value = rating.to_percent();
        self.write(TrackColumn::Rating, Some(value), |row| row.rating = value)
    }

    fn added(&self) -> Option<DateTime<Utc>> {
        to_time(self.row.borrow().date_added)
    }

    fn set_added(&self, added: Option<DateTime<Utc>>) -> Result<()> {
        let value = from_time(added);
        self.write(TrackColumn::DateAdded, value, |row| row.date_added = value)
    }

    fn modified(&self) -> Option<DateTime<Utc>> {
        to_time(self.row.borrow().last_modified)
    }

    fn set_modified(&self, modified: Option<DateTime<Utc>>) -> Result<()> {
        let value = from_time(modified);
        self.write(TrackColumn::LastModified, value, |row| {
            row.last_modified = value
        })
    }

    fn play_count(&self) -> u32 {
        self.row.borrow().play_count
    }

    fn set_play_count(&self, count: u32) -> Result<()> {
        self.write(TrackColumn::PlayCount, Some(count as i64), |row| {
            row.play_count = count
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership_from_columns() {
        assert_eq!(Ownership::from_columns("a", None, None), Ownership::Local);
        assert_eq!(
            Ownership::from_columns("a", Some("a".to_string()), Some(4)),
            Ownership::Local
        );
        assert_eq!(
            Ownership::from_columns("a", Some(String::new()), Some(4)),
            Ownership::Local
        );
        assert_eq!(
            Ownership::from_columns("a", Some("b".to_string()), Some(4)),
            Ownership::ExternalRef {
                shard_uuid: "b".to_string(),
                remote_id: 4
            }
        );
    }

    #[test]
    fn test_time_conversion_keeps_seconds() {
        let t = DateTime::from_timestamp(1_700_000_000, 0);
        assert_eq!(to_time(from_time(t)), t);
        assert_eq!(to_time(None), None);
    }
}
