//! Canonical file path form used as primary track identity
//!
//! Canonical means: absolute, lexically cleaned (`.` and `..` resolved),
//! forward slashes, lowercase on case-insensitive platforms and stripped of
//! combining diacritics.

use std::path::{Component, Path, PathBuf};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Remove combining marks: "Beyoncé" -> "Beyonce"
pub fn remove_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// Normalize a path string into its canonical identity form
pub fn normalize_path(path: &str) -> String {
    let slashed = path.replace('\\', "/");
    let mut absolute = PathBuf::from(&slashed);
    if !absolute.is_absolute() && !is_drive_path(&slashed) {
        if let Ok(cwd) = std::env::current_dir() {
            absolute = cwd.join(absolute);
        }
    }

    let mut out = clean(&absolute).to_string_lossy().replace('\\', "/");
    if cfg!(windows) {
        out = out.to_lowercase();
    }
    remove_accents(&out)
}

/// Join a path stored relative to `origin` (a shard's directory) and normalize it.
/// Absolute inputs are normalized as-is.
pub fn resolve_from(origin: &str, path: &str) -> String {
    let slashed = path.replace('\\', "/");
    if Path::new(&slashed).is_absolute() || is_drive_path(&slashed) {
        normalize_path(&slashed)
    } else {
        normalize_path(&format!("{}/{}", origin.trim_end_matches('/'), slashed))
    }
}

/// Express `path` relative to `origin` when it lives below it; otherwise return it unchanged
pub fn relative_to(origin: &str, path: &str) -> String {
    let origin = normalize_path(origin);
    let path = normalize_path(path);
    match path.strip_prefix(&origin) {
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
        _ => path,
    }
}

fn is_drive_path(p: &str) -> bool {
    let bytes = p.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_accents() {
        assert_eq!(remove_accents("Beyoncé"), "Beyonce");
        assert_eq!(remove_accents("Motörhead/Ça va"), "Motorhead/Ca va");
        assert_eq!(remove_accents("plain"), "plain");
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_absolute_path() {
        assert_eq!(normalize_path("/m/song.mp3"), "/m/song.mp3");
        assert_eq!(normalize_path("/m/./a/../song.mp3"), "/m/song.mp3");
        assert_eq!(normalize_path("/m/Café/song.mp3"), "/m/Cafe/song.mp3");
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_relative_to_origin() {
        assert_eq!(
            resolve_from("/vol/Engine Library/Database2", "../../Music/a.mp3"),
            "/vol/Music/a.mp3"
        );
        assert_eq!(resolve_from("/vol/db", "/abs/a.mp3"), "/abs/a.mp3");
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to("/vol/db", "/vol/db/music/a.mp3"), "music/a.mp3");
        assert_eq!(relative_to("/vol/db", "/elsewhere/a.mp3"), "/elsewhere/a.mp3");
        assert_eq!(relative_to("/vol/db", "/vol/dbx/a.mp3"), "/vol/dbx/a.mp3");
    }
}
