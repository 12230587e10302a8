//! Rhythmbox playlists (playlists.xml) parser
//!
//! Only static playlists carry an explicit track list; automatic (smart)
//! and queue playlists are skipped.

use super::model::uri_to_path;
use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A static playlist as listed in playlists.xml
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub name: String,
    /// Canonical file paths in playlist order
    pub locations: Vec<String>,
}

/// Parse playlists.xml and extract all static playlists
pub fn parse_playlists(path: &Path) -> Result<Vec<PlaylistEntry>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open Rhythmbox playlists: {:?}", path))?;

    let mut reader = Reader::from_reader(BufReader::new(file));
    reader.config_mut().trim_text(true);

    let mut playlists = Vec::new();
    let mut current: Option<PlaylistEntry> = None;
    let mut in_location = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"playlist" => {
                    let mut name = String::from("Unnamed");
                    let mut kind = String::from("static");
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => name = String::from_utf8_lossy(&attr.value).to_string(),
                            b"type" => kind = String::from_utf8_lossy(&attr.value).to_string(),
                            _ => {}
                        }
                    }
                    if kind == "static" {
                        current = Some(PlaylistEntry {
                            name,
                            locations: Vec::new(),
                        });
                    } else {
                        log::debug!("Skipping {} playlist '{}'", kind, name);
                    }
                }
                b"location" => in_location = current.is_some(),
                _ => {}
            },

            Ok(Event::Text(e)) => {
                if in_location {
                    if let Some(ref mut playlist) = current {
                        let text = e.unescape().unwrap_or_default().to_string();
                        match uri_to_path(&text) {
                            Some(path) => playlist.locations.push(path),
                            None => log::debug!("Ignoring non-file location: {}", text),
                        }
                    }
                }
            }

            Ok(Event::End(e)) => match e.name().as_ref() {
                b"playlist" => {
                    if let Some(playlist) = current.take() {
                        playlists.push(playlist);
                    }
                }
                b"location" => in_location = false,
                _ => {}
            },

            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("XML parsing error: {:?}", e);
            }
            _ => {}
        }

        buf.clear();
    }

    log::info!("Parsed {} playlists from Rhythmbox", playlists.len());
    Ok(playlists)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_playlists_only() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("playlists.xml");
        std::fs::write(
            &path,
            r#"<?xml version="1.0"?>
<rhythmdb-playlists>
  <playlist name="Party" show-browser="false" type="static">
    <location>file:///music/b.mp3</location>
    <location>file:///music/a.mp3</location>
  </playlist>
  <playlist name="Recently Added" type="automatic">
    <conjunction><equals prop="type">song</equals></conjunction>
  </playlist>
  <playlist name="Play Queue" type="queue"/>
</rhythmdb-playlists>"#,
        )
        .unwrap();

        let playlists = parse_playlists(&path).unwrap();
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].name, "Party");
        assert_eq!(playlists[0].locations, vec!["/music/b.mp3", "/music/a.mp3"]);
    }
}
