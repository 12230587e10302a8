//! Per-shard tracklist storage and mutation
//!
//! Lists live in `Playlist`; membership in `PlaylistEntity` ordered by a
//! 1-based `trackNumber`. Hierarchy is kept twice: `ListParentList` maps each
//! list to its parent (itself for roots) and `ListHierarchy` holds one
//! `(parent, child)` row per non-root list.

use super::shard::{row_to_track, Shard, ShardSet, TRACK_COLUMNS};
use super::track::EngineTrack;
use crate::error::{LibraryError, StorageContext};
use crate::model::{leaf_name, ListKind, TrackRef, Tracklist};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

fn kind_from_column(value: &str) -> ListKind {
    if value == ListKind::Crate.as_str() {
        ListKind::Crate
    } else {
        ListKind::Playlist
    }
}

#[derive(Debug, Clone)]
pub struct ListNode {
    pub id: i64,
    pub title: String,
    pub kind: ListKind,
    pub is_folder: bool,
    /// `None` for roots
    pub parent: Option<i64>,
}

/// Snapshot of every list node of a shard
#[derive(Debug, Default)]
pub struct ListTree {
    nodes: BTreeMap<i64, ListNode>,
}

impl ListTree {
    pub fn load(shard: &Shard) -> Result<Self> {
        let conn = shard.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT p.id, p.title, p.kind, p.isFolder, l.listParentId
                 FROM Playlist p LEFT JOIN ListParentList l ON l.listOriginId = p.id
                 ORDER BY p.id",
            )
            .storage_context(|| format!("failed to read lists of '{}'", shard.origin()))?;
        let rows = stmt
            .query_map([], |r| {
                let id: i64 = r.get(0)?;
                let parent: Option<i64> = r.get(4)?;
                Ok(ListNode {
                    id,
                    title: r.get(1)?,
                    kind: kind_from_column(&r.get::<_, String>(2)?),
                    is_folder: r.get(3)?,
                    parent: parent.filter(|p| *p != id),
                })
            })
            .storage_context(|| format!("failed to read lists of '{}'", shard.origin()))?;

        let mut nodes = BTreeMap::new();
        for node in rows {
            let node = node.storage_context(|| format!("failed to read lists of '{}'", shard.origin()))?;
            nodes.insert(node.id, node);
        }
        Ok(Self { nodes })
    }

    /// Full slash-delimited path, walking parent links up to the root marker
    pub fn path_of(&self, id: i64) -> Result<String> {
        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);

        while let Some(node_id) = current {
            if !seen.insert(node_id) {
                return Err(LibraryError::integrity(format!(
                    "list {} has a cyclic parent chain",
                    id
                ))
                .into());
            }
            let node = self.nodes.get(&node_id).ok_or_else(|| {
                LibraryError::integrity(format!("list {} has a dangling parent {}", id, node_id))
            })?;
            segments.push(node.title.as_str());
            current = node.parent;
        }

        segments.reverse();
        Ok(segments.join("/"))
    }

    /// Non-folder lists of `kind` with their paths
    pub fn leaves(&self, kind: ListKind) -> Result<Vec<(i64, String)>> {
        self.nodes
            .values()
            .filter(|n| n.kind == kind && !n.is_folder)
            .map(|n| Ok((n.id, self.path_of(n.id)?)))
            .collect()
    }

    pub fn find_child(&self, parent: Option<i64>, title: &str, kind: ListKind) -> Option<&ListNode> {
        self.nodes
            .values()
            .find(|n| n.parent == parent && n.kind == kind && n.title == title)
    }
}

/// Replace the parent links of `list_id`; `None` records it as a root
fn link_parent(conn: &Connection, list_id: i64, parent: Option<i64>) -> Result<()> {
    conn.execute("DELETE FROM ListParentList WHERE listOriginId = ?1", [list_id])
        .storage_context(|| format!("failed to unlink list {}", list_id))?;
    conn.execute("DELETE FROM ListHierarchy WHERE listIdChild = ?1", [list_id])
        .storage_context(|| format!("failed to unlink list {}", list_id))?;

    conn.execute(
        "INSERT INTO ListParentList (listOriginId, listParentId) VALUES (?1, ?2)",
        params![list_id, parent.unwrap_or(list_id)],
    )
    .storage_context(|| format!("failed to link list {}", list_id))?;
    if let Some(parent) = parent {
        conn.execute(
            "INSERT INTO ListHierarchy (listId, listIdChild) VALUES (?1, ?2)",
            params![parent, list_id],
        )
        .storage_context(|| format!("failed to link list {} under {}", list_id, parent))?;
    }
    Ok(())
}

/// Insert a list node under `parent` (a root when `None`); node and links commit together
pub fn insert_list(
    shard: &Shard,
    title: &str,
    kind: ListKind,
    is_folder: bool,
    parent: Option<i64>,
) -> Result<i64> {
    let conn = shard.conn()?;
    let tx = conn
        .unchecked_transaction()
        .storage_context(|| "failed to begin transaction")?;

    tx.execute(
        "INSERT INTO Playlist (title, kind, isFolder, lastEditTime) VALUES (?1, ?2, ?3, ?4)",
        params![title, kind.as_str(), is_folder, chrono::Utc::now().timestamp()],
    )
    .storage_context(|| format!("failed to create {} '{}' in '{}'", kind, title, shard.origin()))?;
    let id = tx.last_insert_rowid();
    link_parent(&tx, id, parent)?;

    tx.commit()
        .storage_context(|| format!("failed to commit {} '{}' in '{}'", kind, title, shard.origin()))?;
    Ok(id)
}

/// Create `path` in `shard`, making folder nodes for every missing parent segment.
/// An existing leaf at `path` is returned as is.
pub fn create_list_at(shard: &Shard, kind: ListKind, path: &str) -> Result<i64> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(LibraryError::integrity(format!("invalid {} path '{}'", kind, path)).into());
    }

    let tree = ListTree::load(shard)?;
    let last = segments.len() - 1;
    let mut parent: Option<i64> = None;

    for (idx, segment) in segments.iter().enumerate() {
        let terminal = idx == last;
        match tree.find_child(parent, segment, kind) {
            Some(node) if !terminal && !node.is_folder => {
                return Err(LibraryError::integrity(format!(
                    "cannot create folder '{}': a {} already exists there",
                    segments[..=idx].join("/"),
                    kind
                ))
                .into());
            }
            Some(node) if terminal && node.is_folder => {
                return Err(LibraryError::integrity(format!(
                    "cannot create {} '{}': a folder already exists there",
                    kind, path
                ))
                .into());
            }
            Some(node) => parent = Some(node.id),
            None => {
                let id = insert_list(shard, segment, kind, !terminal, parent)?;
                log::info!(
                    "created {} '{}' in '{}'",
                    if terminal { kind.as_str() } else { "folder" },
                    segments[..=idx].join("/"),
                    shard.origin()
                );
                parent = Some(id);
            }
        }
    }

    parent.ok_or_else(|| LibraryError::integrity(format!("invalid {} path '{}'", kind, path)).into())
}

pub fn member_count(shard: &Shard, list_id: i64) -> Result<usize> {
    let count: i64 = shard
        .conn()?
        .query_row(
            "SELECT COUNT(*) FROM PlaylistEntity e JOIN Track ON Track.id = e.trackId
             WHERE e.listId = ?1",
            [list_id],
            |r| r.get(0),
        )
        .storage_context(|| format!("failed to count members of list {}", list_id))?;
    Ok(count as usize)
}

/// Atomically replace the membership of `list_id` with `track_ids`, in order
pub fn rewrite_members(shard: &Shard, list_id: i64, track_ids: &[i64]) -> Result<()> {
    let conn = shard.conn()?;
    let tx = conn
        .unchecked_transaction()
        .storage_context(|| "failed to begin transaction")?;

    tx.execute("DELETE FROM PlaylistEntity WHERE listId = ?1", [list_id])
        .storage_context(|| format!("failed to clear list {}", list_id))?;
    {
        let mut insert = tx
            .prepare(
                "INSERT INTO PlaylistEntity (listId, trackId, databaseUuid, trackNumber)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .storage_context(|| "failed to prepare membership insert")?;
        for (idx, track_id) in track_ids.iter().enumerate() {
            insert
                .execute(params![list_id, track_id, shard.uuid(), idx as i64 + 1])
                .storage_context(|| format!("failed to add track {} to list {}", track_id, list_id))?;
        }
    }
    tx.execute(
        "UPDATE Playlist SET lastEditTime = ?1 WHERE id = ?2",
        params![chrono::Utc::now().timestamp(), list_id],
    )
    .storage_context(|| format!("failed to touch list {}", list_id))?;

    tx.commit()
        .storage_context(|| format!("failed to commit list {}", list_id))?;
    log::debug!(
        "list {} in '{}' now holds {} tracks",
        list_id,
        shard.origin(),
        track_ids.len()
    );
    Ok(())
}

/// One shard's copy of a tracklist
#[derive(Clone)]
pub struct ShardList {
    shard: Rc<Shard>,
    set: Rc<ShardSet>,
    id: i64,
    path: String,
}

impl ShardList {
    pub fn new(shard: Rc<Shard>, set: Rc<ShardSet>, id: i64, path: String) -> Self {
        Self {
            shard,
            set,
            id,
            path,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn shard(&self) -> &Rc<Shard> {
        &self.shard
    }

    /// Rewrite this copy with tracks already known to live in this shard
    pub(crate) fn write_ids(&self, ids: &[i64]) -> Result<()> {
        rewrite_members(&self.shard, self.id, ids)
            .with_context(|| format!("failed to set tracks of '{}' in '{}'", self.path, self.shard.origin()))
    }
}

impl Tracklist for ShardList {
    fn name(&self) -> String {
        leaf_name(&self.path).to_string()
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    fn tracks(&self) -> Result<Vec<TrackRef>> {
        let sql = format!(
            "SELECT {} FROM PlaylistEntity e JOIN Track ON Track.id = e.trackId
             WHERE e.listId = ?1 ORDER BY e.trackNumber",
            TRACK_COLUMNS
        );
        let rows = {
            let conn = self.shard.conn()?;
            let mut stmt = conn
                .prepare(&sql)
                .storage_context(|| format!("failed to read '{}'", self.path))?;
            let rows = stmt
                .query_map([self.id], |r| row_to_track(r, self.shard.uuid()))
                .storage_context(|| format!("failed to read '{}'", self.path))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .storage_context(|| format!("failed to read '{}'", self.path))?
        };

        Ok(rows
            .into_iter()
            .map(|row| EngineTrack::new(self.shard.clone(), self.set.clone(), row) as TrackRef)
            .collect())
    }

    fn count(&self) -> Result<usize> {
        member_count(&self.shard, self.id)
    }

    fn set_tracks(&self, tracks: &[TrackRef]) -> Result<()> {
        let mut ids = Vec::with_capacity(tracks.len());
        for track in tracks {
            match track.as_any().downcast_ref::<EngineTrack>() {
                Some(t) if t.belongs_to(&self.set) && Rc::ptr_eq(t.shard(), &self.shard) => {
                    ids.push(t.id())
                }
                _ => {
                    return Err(LibraryError::integrity(format!(
                        "'{}' does not belong to '{}' in '{}'",
                        track,
                        self.path,
                        self.shard.origin()
                    ))
                    .into())
                }
            }
        }
        self.write_ids(&ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schema::create_shard;
    use crate::engine::shard::NewTrack;
    use crate::error::is_integrity;
    use tempfile::TempDir;

    fn open_shard(dir: &TempDir) -> Shard {
        let path = dir.path().join("Database2/m.db");
        create_shard(&path, "uuid-main").unwrap();
        Shard::open(&path).unwrap()
    }

    #[test]
    fn test_create_nested_list_builds_folders() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir);

        let id = create_list_at(&shard, ListKind::Playlist, "Techno/Peak/Favorites").unwrap();
        let tree = ListTree::load(&shard).unwrap();

        assert_eq!(tree.path_of(id).unwrap(), "Techno/Peak/Favorites");
        let leaves = tree.leaves(ListKind::Playlist).unwrap();
        assert_eq!(leaves, vec![(id, "Techno/Peak/Favorites".to_string())]);
        assert!(tree.leaves(ListKind::Crate).unwrap().is_empty());

        // second call reuses the existing nodes
        let again = create_list_at(&shard, ListKind::Playlist, "Techno/Peak/Favorites").unwrap();
        assert_eq!(again, id);
        let sibling = create_list_at(&shard, ListKind::Playlist, "Techno/Warmup").unwrap();
        let tree = ListTree::load(&shard).unwrap();
        assert_eq!(tree.path_of(sibling).unwrap(), "Techno/Warmup");
        let techno = tree.find_child(None, "Techno", ListKind::Playlist).unwrap();
        assert!(techno.is_folder);
        let warmup = tree.find_child(Some(techno.id), "Warmup", ListKind::Playlist).unwrap();
        assert_eq!(warmup.id, sibling);
    }

    #[test]
    fn test_folder_over_leaf_is_rejected() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir);

        create_list_at(&shard, ListKind::Playlist, "Techno").unwrap();
        let err = create_list_at(&shard, ListKind::Playlist, "Techno/Favorites").unwrap_err();
        assert!(is_integrity(&err));

        create_list_at(&shard, ListKind::Crate, "House/Deep").unwrap();
        let err = create_list_at(&shard, ListKind::Crate, "House").unwrap_err();
        assert!(is_integrity(&err));
    }

    #[test]
    fn test_reparent_replaces_links() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir);

        let a = create_list_at(&shard, ListKind::Playlist, "A/Leaf").unwrap();
        let b = insert_list(&shard, "B", ListKind::Playlist, true, None).unwrap();
        link_parent(&shard.conn().unwrap(), a, Some(b)).unwrap();

        let tree = ListTree::load(&shard).unwrap();
        assert_eq!(tree.path_of(a).unwrap(), "B/Leaf");

        let links: i64 = shard
            .conn()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM ListHierarchy WHERE listIdChild = ?1",
                [a],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(links, 1);
    }

    #[test]
    fn test_parent_cycle_is_integrity_error() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir);

        let a = insert_list(&shard, "A", ListKind::Playlist, true, None).unwrap();
        let b = insert_list(&shard, "B", ListKind::Playlist, false, Some(a)).unwrap();
        link_parent(&shard.conn().unwrap(), a, Some(b)).unwrap();

        let tree = ListTree::load(&shard).unwrap();
        assert!(is_integrity(&tree.path_of(b).unwrap_err()));
    }

    #[test]
    fn test_rewrite_members_orders_from_one() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir);
        let ids: Vec<i64> = ["/m/a.mp3", "/m/b.mp3", "/m/c.mp3"]
            .iter()
            .map(|p| {
                shard
                    .insert_track(&NewTrack {
                        path: p.to_string(),
                        ..Default::default()
                    })
                    .unwrap()
            })
            .collect();
        let list = create_list_at(&shard, ListKind::Playlist, "Set").unwrap();

        rewrite_members(&shard, list, &[ids[2], ids[0], ids[1]]).unwrap();
        let rows: Vec<(i64, i64)> = shard
            .conn()
            .unwrap()
            .prepare(
                "SELECT trackNumber, trackId FROM PlaylistEntity WHERE listId = ?1 ORDER BY trackNumber",
            )
            .unwrap()
            .query_map([list], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(rows, vec![(1, ids[2]), (2, ids[0]), (3, ids[1])]);

        rewrite_members(&shard, list, &[]).unwrap();
        assert_eq!(member_count(&shard, list).unwrap(), 0);
    }

    #[test]
    fn test_count_skips_dangling_members() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir);
        let track = shard
            .insert_track(&NewTrack {
                path: "/m/a.mp3".to_string(),
                ..Default::default()
            })
            .unwrap();
        let list = create_list_at(&shard, ListKind::Crate, "Bin").unwrap();
        rewrite_members(&shard, list, &[track, track + 100]).unwrap();

        assert_eq!(member_count(&shard, list).unwrap(), 1);
    }

    #[test]
    fn test_failed_link_leaves_no_orphan_node() {
        let dir = TempDir::new().unwrap();
        let shard = open_shard(&dir);
        shard
            .conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER fail_link BEFORE INSERT ON ListParentList
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();

        assert!(create_list_at(&shard, ListKind::Playlist, "Techno/Peak").is_err());

        let nodes: i64 = shard
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM Playlist", [], |r| r.get(0))
            .unwrap();
        assert_eq!(nodes, 0);
    }
}
