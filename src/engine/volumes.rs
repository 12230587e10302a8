//! Removable volume discovery

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Produces candidate volume roots that may carry an external shard
pub trait VolumeSource {
    fn volumes(&self) -> Result<Vec<PathBuf>>;
}

/// Children of the platform's mount roots
#[derive(Debug, Default, Clone, Copy)]
pub struct MountedVolumes;

impl MountedVolumes {
    fn mount_roots() -> Vec<PathBuf> {
        if cfg!(target_os = "macos") {
            vec![PathBuf::from("/Volumes")]
        } else if cfg!(windows) {
            Vec::new()
        } else {
            let mut roots = Vec::new();
            if let Ok(user) = std::env::var("USER") {
                roots.push(Path::new("/media").join(&user));
                roots.push(Path::new("/run/media").join(&user));
            }
            roots.push(PathBuf::from("/media"));
            roots.push(PathBuf::from("/mnt"));
            roots
        }
    }
}

impl VolumeSource for MountedVolumes {
    fn volumes(&self) -> Result<Vec<PathBuf>> {
        if cfg!(windows) {
            return Ok((b'A'..=b'Z')
                .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
                .filter(|p| p.exists())
                .collect());
        }

        let mut volumes = Vec::new();
        for root in Self::mount_roots() {
            let Ok(entries) = std::fs::read_dir(&root) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() && !volumes.contains(&path) {
                    volumes.push(path);
                }
            }
        }
        log::debug!("found {} mounted volumes", volumes.len());
        Ok(volumes)
    }
}

/// A fixed list of volume roots
#[derive(Debug, Default, Clone)]
pub struct FixedVolumes(pub Vec<PathBuf>);

impl VolumeSource for FixedVolumes {
    fn volumes(&self) -> Result<Vec<PathBuf>> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_volumes() {
        let source = FixedVolumes(vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(source.volumes().unwrap().len(), 2);
    }
}
