use super::shard::{Shard, ShardSet};
use super::track::EngineTrack;
use super::tracklist::{create_list_at, ShardList};
use crate::error::LibraryError;
use crate::model::{leaf_name, ListKind, TrackRef, Tracklist};
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::rc::Rc;

/// Logical tracklist: every shard's copy of one path, merged
///
/// Reads concatenate the copies in shard order. `set_tracks` partitions the
/// new members by owning shard and rewrites each copy on its own.
pub struct MergedList {
    path: String,
    kind: ListKind,
    parts: RefCell<Vec<ShardList>>,
    set: Rc<ShardSet>,
}

impl MergedList {
    pub fn new(set: Rc<ShardSet>, kind: ListKind, path: String, parts: Vec<ShardList>) -> Self {
        Self {
            path,
            kind,
            parts: RefCell::new(parts),
            set,
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    /// Per-shard copies in shard order
    pub fn parts(&self) -> Vec<ShardList> {
        self.parts.borrow().clone()
    }

    fn part_for(&self, shard: &Rc<Shard>) -> Option<ShardList> {
        self.parts
            .borrow()
            .iter()
            .find(|p| Rc::ptr_eq(p.shard(), shard))
            .cloned()
    }

    /// Copy in `shard`, created on demand
    fn ensure_part(&self, shard: &Rc<Shard>) -> Result<ShardList> {
        if let Some(part) = self.part_for(shard) {
            return Ok(part);
        }
        let id = create_list_at(shard, self.kind, &self.path)?;
        let part = ShardList::new(shard.clone(), self.set.clone(), id, self.path.clone());

        // keep shard order
        let mut parts = self.parts.borrow_mut();
        parts.push(part.clone());
        let order: Vec<Rc<Shard>> = self.set.iter().cloned().collect();
        parts.sort_by_key(|p| order.iter().position(|s| Rc::ptr_eq(s, p.shard())));
        Ok(part)
    }
}

impl Tracklist for MergedList {
    fn name(&self) -> String {
        leaf_name(&self.path).to_string()
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    fn tracks(&self) -> Result<Vec<TrackRef>> {
        let mut out = Vec::new();
        for part in self.parts() {
            out.extend(part.tracks()?);
        }
        Ok(out)
    }

    fn count(&self) -> Result<usize> {
        self.parts().iter().map(|p| p.count()).sum()
    }

    fn set_tracks(&self, tracks: &[TrackRef]) -> Result<()> {
        // validate everything before the first write
        let mut by_shard: Vec<(Rc<Shard>, Vec<i64>)> =
            self.set.iter().map(|s| (s.clone(), Vec::new())).collect();
        for track in tracks {
            let engine = track
                .as_any()
                .downcast_ref::<EngineTrack>()
                .filter(|t| t.belongs_to(&self.set));
            let Some(engine) = engine else {
                return Err(LibraryError::integrity(format!(
                    "'{}' is not a track of this library, cannot add it to '{}'",
                    track, self.path
                ))
                .into());
            };
            match by_shard.iter_mut().find(|(s, _)| Rc::ptr_eq(s, engine.shard())) {
                Some((_, ids)) => ids.push(engine.id()),
                None => {
                    return Err(LibraryError::integrity(format!(
                        "'{}' belongs to a closed shard, cannot add it to '{}'",
                        track, self.path
                    ))
                    .into())
                }
            }
        }

        let mut failed = Vec::new();
        for (shard, ids) in by_shard {
            let existing = self.part_for(&shard);
            if ids.is_empty() && existing.is_none() {
                continue;
            }
            let result = match existing {
                Some(part) => part.write_ids(&ids),
                None => self.ensure_part(&shard).and_then(|part| part.write_ids(&ids)),
            };
            if let Err(err) = result {
                log::error!("{:#}", err);
                failed.push(shard.origin().to_string());
            }
        }

        if failed.is_empty() {
            log::info!("set {} tracks on {} '{}'", tracks.len(), self.kind, self.path);
            Ok(())
        } else {
            Err(anyhow!(
                "failed to set tracks of '{}' in {} of {} shards: {}",
                self.path,
                failed.len(),
                self.set.len(),
                failed.join(", ")
            ))
        }
    }
}
