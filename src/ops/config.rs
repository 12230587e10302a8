//! Library selection from the command line

use crate::engine::{EngineConfig, EngineLibrary};
use crate::error::LibraryError;
use crate::model::{Library, MemoryLibrary};
use crate::rhythmbox::{self, RhythmboxLibrary};
use anyhow::{bail, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A library to open, written `<kind>[:<path>]`
///
/// `engine` and `rhythmbox` fall back to their default locations; `dump`
/// needs a file path (`-` for stdout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibrarySpec {
    Engine(Option<PathBuf>),
    Rhythmbox(Option<PathBuf>),
    Dump(PathBuf),
}

impl FromStr for LibrarySpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, path) = match s.split_once(':') {
            Some((kind, path)) if !path.is_empty() => (kind, Some(PathBuf::from(path))),
            Some((kind, _)) => (kind, None),
            None => (s, None),
        };

        match (kind.to_lowercase().as_str(), path) {
            ("engine", path) => Ok(LibrarySpec::Engine(path)),
            ("rhythmbox", path) => Ok(LibrarySpec::Rhythmbox(path)),
            ("dump", Some(path)) => Ok(LibrarySpec::Dump(path)),
            ("dump", None) => bail!("a dump library needs a file, e.g. dump:playlists.yaml"),
            (other, _) => bail!(
                "unknown library kind '{}' (expected engine, rhythmbox or dump)",
                other
            ),
        }
    }
}

impl fmt::Display for LibrarySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibrarySpec::Engine(None) => f.write_str("engine"),
            LibrarySpec::Engine(Some(p)) => write!(f, "engine:{}", p.display()),
            LibrarySpec::Rhythmbox(None) => f.write_str("rhythmbox"),
            LibrarySpec::Rhythmbox(Some(p)) => write!(f, "rhythmbox:{}", p.display()),
            LibrarySpec::Dump(p) => write!(f, "dump:{}", p.display()),
        }
    }
}

/// Settings applied when opening a [`LibrarySpec`]
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Look for Engine shards on removable volumes
    pub discover_volumes: bool,

    /// Explicit volume roots instead of the mounted ones
    pub volume_roots: Option<Vec<PathBuf>>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            discover_volumes: true,
            volume_roots: None,
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
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

impl LibrarySpec {
    pub fn open(&self, options: &OpenOptions) -> Result<Box<dyn Library>> {
        match self {
            LibrarySpec::Engine(path) => {
                let mut config = match path {
                    Some(path) => EngineConfig::new(path.clone()),
                    None => EngineConfig::default(),
                }
                .with_volume_discovery(options.discover_volumes);
                if let Some(roots) = &options.volume_roots {
                    config = config.with_volume_roots(roots.clone());
                }
                Ok(Box::new(EngineLibrary::open(&config)?))
            }
            LibrarySpec::Rhythmbox(path) => {
                let dir = path.clone().unwrap_or_else(rhythmbox::default_directory);
                Ok(Box::new(RhythmboxLibrary::open(&dir)?))
            }
            LibrarySpec::Dump(path) => Ok(Box::new(open_dump(path)?)),
        }
    }
}

/// Existing dumps are loaded; new ones start empty. Either way `export()` and
/// `close()` write back to `path`.
fn open_dump(path: &Path) -> Result<MemoryLibrary> {
    if path.as_os_str() == "-" || !path.exists() {
        return Ok(MemoryLibrary::new(format!("Dump: {}", path.display())).with_output(path.to_path_buf()));
    }
    if path.is_dir() {
        return Err(LibraryError::integrity(format!("dump {:?} is a directory", path)).into());
    }
    MemoryLibrary::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_specs() {
        assert_eq!("engine".parse::<LibrarySpec>().unwrap(), LibrarySpec::Engine(None));
        assert_eq!(
            "engine:/mnt/usb".parse::<LibrarySpec>().unwrap(),
            LibrarySpec::Engine(Some(PathBuf::from("/mnt/usb")))
        );
        assert_eq!(
            "Rhythmbox:".parse::<LibrarySpec>().unwrap(),
            LibrarySpec::Rhythmbox(None)
        );
        assert_eq!(
            "dump:out.json".parse::<LibrarySpec>().unwrap(),
            LibrarySpec::Dump(PathBuf::from("out.json"))
        );
        assert!("dump".parse::<LibrarySpec>().is_err());
        assert!("itunes".parse::<LibrarySpec>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for s in ["engine", "rhythmbox:/home/me/rb", "dump:-"] {
            assert_eq!(s.parse::<LibrarySpec>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_open_new_dump() {
        let dir = tempfile::TempDir::new().unwrap();
        let spec = LibrarySpec::Dump(dir.path().join("new.yaml"));
        let lib = spec.open(&OpenOptions::new()).unwrap();
        assert_eq!(lib.format(), "dump");
        assert!(lib.playlists().unwrap().is_empty());
    }
}
