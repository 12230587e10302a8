use super::merged::MergedList;
use super::shard::{NewTrack, Shard, ShardSet};
use super::tags::FileTags;
use super::track::{from_time, EngineTrack};
use super::tracklist::{create_list_at, ListTree, ShardList};
use super::volumes::{FixedVolumes, MountedVolumes, VolumeSource};
use crate::error::LibraryError;
use crate::matcher::Matcher;
use crate::model::{
    normalize_path, FileExtensions, Library, LibraryEditor, ListKind, Track, TrackRef,
    TrackVisitor, Tracklist, Visit,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Location of a shard relative to its volume (or the user's music folder)
pub const ENGINE_DB_RELATIVE: &str = "Engine Library/Database2/m.db";

/// File types Engine can play
pub const SUPPORTED_EXTENSIONS: [&str; 7] = [".mp3", ".flac", ".m4a", ".wav", ".aiff", ".aif", ".ogg"];

/// `~/Music/Engine Library/Database2/m.db`
pub fn default_database() -> PathBuf {
    PathBuf::from(shellexpand::tilde("~/Music").into_owned()).join(ENGINE_DB_RELATIVE)
}

/// Turn a user-supplied location into a database file path
///
/// Directories are searched for `m.db`, then `Database2/m.db`; failing that
/// the conventional relative path is appended.
pub fn resolve_database(path: &Path) -> PathBuf {
    let path = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
    if !path.is_dir() {
        return path;
    }
    for candidate in ["m.db", "Database2/m.db"] {
        let db = path.join(candidate);
        if db.is_file() {
            return db;
        }
    }
    path.join(ENGINE_DB_RELATIVE)
}

/// How to open an Engine library
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Main shard (file or directory, see [`resolve_database`])
    pub database: PathBuf,

    /// Look for shards on removable volumes
    pub discover_volumes: bool,

    /// Explicit volume roots instead of the mounted ones
    pub volume_roots: Option<Vec<PathBuf>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(default_database())
    }
}

impl EngineConfig {
    pub fn new(database: PathBuf) -> Self {
        Self {
            database,
            discover_volumes: true,
            volume_roots: None,
        }
    }

    pub fn with_volume_discovery(mut self, enabled: bool) -> Self {
        self.discover_volumes = enabled;
        self
    }

    pub fn with_volume_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.volume_roots = Some(roots);
        self
    }
}

/// Engine library aggregated over the main shard and every volume shard
pub struct EngineLibrary {
    shards: Rc<ShardSet>,
    matcher: Matcher,
}

impl EngineLibrary {
    pub fn open(config: &EngineConfig) -> Result<Self> {
        match &config.volume_roots {
            Some(roots) => Self::open_with(config, &FixedVolumes(roots.clone())),
            None => Self::open_with(config, &MountedVolumes),
        }
    }

    pub fn open_with(config: &EngineConfig, volumes: &dyn VolumeSource) -> Result<Self> {
        let db = resolve_database(&config.database);
        let main = Shard::open(&db)?;
        let exported = main.is_exported()?;
        let main_path = normalize_path(&db.to_string_lossy());
        let mut set = ShardSet::new(main);

        if exported {
            log::info!("'{}' is an exported library, not looking for volumes", set.main().origin());
        } else if config.discover_volumes {
            let roots = match volumes.volumes() {
                Ok(roots) => roots,
                Err(e) => {
                    set.close_all();
                    return Err(e.context("failed to list volumes"));
                }
            };

            for root in roots {
                let candidate = root.join(ENGINE_DB_RELATIVE);
                if !candidate.is_file() || normalize_path(&candidate.to_string_lossy()) == main_path {
                    continue;
                }
                let shard = match Shard::open(&candidate) {
                    Ok(shard) => shard,
                    Err(e) => {
                        set.close_all();
                        return Err(e.context(format!("failed to open volume {:?}", root)));
                    }
                };
                if set.by_uuid(shard.uuid()).is_some() {
                    log::warn!(
                        "skipping {:?}: database {} is already open",
                        candidate,
                        shard.uuid()
                    );
                    shard.close();
                    continue;
                }
                set.push(shard);
            }
        }

        let library = Self {
            shards: Rc::new(set),
            matcher: Matcher::new(),
        };
        log::info!("{}", library);
        Ok(library)
    }

    pub fn main_shard(&self) -> &Rc<Shard> {
        self.shards.main()
    }

    pub fn shards(&self) -> impl Iterator<Item = &Rc<Shard>> {
        self.shards.iter()
    }

    fn lists(&self, kind: ListKind) -> Result<Vec<MergedList>> {
        let mut merged: BTreeMap<String, Vec<ShardList>> = BTreeMap::new();
        for shard in self.shards.iter() {
            let tree = ListTree::load(shard)?;
            for (id, path) in tree.leaves(kind)? {
                let parts = merged.entry(path.clone()).or_default();
                if parts.iter().any(|p| Rc::ptr_eq(p.shard(), shard)) {
                    log::warn!("duplicate {} '{}' in '{}'", kind, path, shard.origin());
                }
                parts.push(ShardList::new(shard.clone(), self.shards.clone(), id, path));
            }
        }

        Ok(merged
            .into_iter()
            .map(|(path, parts)| MergedList::new(self.shards.clone(), kind, path, parts))
            .collect())
    }

    /// Logical list of `kind` at `path`, merged across shards
    pub fn list(&self, kind: ListKind, path: &str) -> Result<Option<MergedList>> {
        Ok(self.lists(kind)?.into_iter().find(|l| l.path() == path))
    }

    fn create(&self, kind: ListKind, path: &str) -> Result<Box<dyn Tracklist>> {
        create_list_at(self.main_shard(), kind, path)
            .with_context(|| format!("failed to create {} '{}'", kind, path))?;
        let list = self.list(kind, path)?.ok_or_else(|| {
            LibraryError::integrity(format!("{} '{}' vanished after creation", kind, path))
        })?;
        Ok(Box::new(list))
    }

    fn view(&self, shard: &Rc<Shard>, id: i64) -> Result<Option<TrackRef>> {
        Ok(shard
            .fetch_track(id)?
            .map(|row| EngineTrack::new(shard.clone(), self.shards.clone(), row) as TrackRef))
    }
}

impl fmt::Display for EngineLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.main_shard().info())?;
        if self.shards.len() > 1 {
            write!(f, " (+{} volumes)", self.shards.len() - 1)?;
        }
        Ok(())
    }
}

impl Drop for EngineLibrary {
    fn drop(&mut self) {
        self.shards.close_all();
    }
}

impl Library for EngineLibrary {
    fn format(&self) -> &'static str {
        "engine"
    }

    fn close(&mut self) {
        self.shards.close_all();
    }

    fn track(&self, path: &str) -> Result<Option<TrackRef>> {
        let canonical = normalize_path(path);
        for shard in self.shards.iter() {
            if let Some(id) = shard.track_id(&canonical) {
                if let Some(track) = self.view(shard, id)? {
                    return Ok(Some(track));
                }
            }
        }
        Ok(None)
    }

    fn playlists(&self) -> Result<Vec<Box<dyn Tracklist>>> {
        Ok(self
            .lists(ListKind::Playlist)?
            .into_iter()
            .map(|l| Box::new(l) as Box<dyn Tracklist>)
            .collect())
    }

    fn crates(&self) -> Result<Vec<Box<dyn Tracklist>>> {
        Ok(self
            .lists(ListKind::Crate)?
            .into_iter()
            .map(|l| Box::new(l) as Box<dyn Tracklist>)
            .collect())
    }

    /// Union of all shards; a row already seen in an earlier shard by path
    /// or by origin back-reference is skipped.
    fn for_each_track(&self, visitor: &mut TrackVisitor<'_>) -> Result<()> {
        let mut seen_paths: HashSet<String> = HashSet::new();
        let mut seen_origins: HashSet<(String, i64)> = HashSet::new();
        let mut tracks: Vec<TrackRef> = Vec::new();

        for shard in self.shards.iter() {
            let mut shard_paths = Vec::new();
            let mut shard_origins = Vec::new();
            for row in shard.tracks()? {
                let track = EngineTrack::new(shard.clone(), self.shards.clone(), row);
                let path = track.file_path();
                let origin = track.origin_key();
                if seen_paths.contains(&path) || seen_origins.contains(&origin) {
                    log::debug!("'{}' in '{}' already listed", path, shard.origin());
                    continue;
                }
                shard_paths.push(path);
                shard_origins.push(origin);
                tracks.push(track);
            }
            seen_paths.extend(shard_paths);
            seen_origins.extend(shard_origins);
        }

        let total = tracks.len();
        for (idx, track) in tracks.iter().enumerate() {
            match visitor(idx, total, track) {
                Visit::Continue => {}
                Visit::Stop => return Ok(()),
                Visit::Fail(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    fn as_editor(&self) -> Option<&dyn LibraryEditor> {
        Some(self)
    }
}

impl LibraryEditor for EngineLibrary {
    fn add_file(&self, path: &Path) -> Result<TrackRef> {
        let canonical = normalize_path(&path.to_string_lossy());
        if let Some(existing) = self.track(&canonical)? {
            return Ok(existing);
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| LibraryError::io(format!("failed to stat {:?}", path), e))?;
        let modified = metadata
            .modified()
            .ok()
            .map(DateTime::<Utc>::from);
        let tags = FileTags::read_or_stem(path);

        let main = self.main_shard();
        let id = main.insert_track(&NewTrack {
            title: tags.title,
            artist: tags.artist,
            album: tags.album,
            year: tags.year,
            path: canonical.clone(),
            file_bytes: metadata.len(),
            date_added: Some(Utc::now().timestamp()),
            last_modified: from_time(modified),
        })?;
        log::info!("added '{}' to '{}'", canonical, main.origin());

        self.view(main, id)?
            .ok_or_else(|| LibraryError::integrity(format!("track {} vanished after insert", id)).into())
    }

    fn create_playlist(&self, path: &str) -> Result<Box<dyn Tracklist>> {
        self.create(ListKind::Playlist, path)
    }

    fn create_crate(&self, path: &str) -> Result<Box<dyn Tracklist>> {
        self.create(ListKind::Crate, path)
    }

    fn move_track(&self, track: &dyn Track, new_path: &str) -> Result<()> {
        match track.as_any().downcast_ref::<EngineTrack>() {
            Some(engine) if engine.belongs_to(&self.shards) => engine
                .set_path(new_path)
                .with_context(|| format!("failed to move '{}' to '{}'", track, new_path)),
            _ => Err(LibraryError::integrity(format!(
                "'{}' is not a track of this library",
                track
            ))
            .into()),
        }
    }

    fn supported_extensions(&self) -> FileExtensions {
        FileExtensions::new(SUPPORTED_EXTENSIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schema::create_shard;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_database_variants() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            resolve_database(dir.path()),
            dir.path().join(ENGINE_DB_RELATIVE)
        );

        let db = dir.path().join("Database2/m.db");
        create_shard(&db, "u").unwrap();
        assert_eq!(resolve_database(dir.path()), db);
        assert_eq!(resolve_database(&db), db);
    }

    #[test]
    fn test_open_skips_duplicate_uuid_volume() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("home").join(ENGINE_DB_RELATIVE);
        let clone = dir.path().join("usb").join(ENGINE_DB_RELATIVE);
        create_shard(&main, "same").unwrap();
        create_shard(&clone, "same").unwrap();

        let config = EngineConfig::new(main).with_volume_roots(vec![
            dir.path().join("usb"),
            dir.path().join("empty"),
        ]);
        let lib = EngineLibrary::open(&config).unwrap();
        assert_eq!(lib.shards().count(), 1);
    }

    #[test]
    fn test_exported_library_ignores_volumes() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("pack").join(ENGINE_DB_RELATIVE);
        let usb = dir.path().join("usb").join(ENGINE_DB_RELATIVE);
        create_shard(&main, "pack").unwrap();
        create_shard(&usb, "usb").unwrap();
        rusqlite::Connection::open(&main)
            .unwrap()
            .execute("INSERT INTO Pack (packId) VALUES ('p')", [])
            .unwrap();

        let config = EngineConfig::new(main).with_volume_roots(vec![dir.path().join("usb")]);
        let lib = EngineLibrary::open(&config).unwrap();
        assert_eq!(lib.shards().count(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join(ENGINE_DB_RELATIVE);
        create_shard(&main, "m").unwrap();

        let mut lib = EngineLibrary::open(&EngineConfig::new(main).with_volume_discovery(false)).unwrap();
        lib.close();
        lib.close();
        assert!(lib.playlists().is_err());
    }

    #[test]
    fn test_move_track_updates_lookup() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join(ENGINE_DB_RELATIVE);
        create_shard(&main, "m").unwrap();
        let song = dir.path().join("song.mp3");
        std::fs::write(&song, b"abc").unwrap();

        let lib = EngineLibrary::open(&EngineConfig::new(main).with_volume_discovery(false)).unwrap();
        let track = lib.add_file(&song).unwrap();
        assert_eq!(track.title(), "song");
        assert_eq!(track.size(), 3);
        assert!(track.added().is_some());

        lib.move_track(track.as_ref(), "/moved/song.mp3").unwrap();
        assert!(lib.track(&song.to_string_lossy()).unwrap().is_none());
        assert!(lib.track("/moved/song.mp3").unwrap().is_some());
    }
}
