//! Rhythmbox database (rhythmdb.xml) parser

use super::model::RhythmboxEntry;
use crate::model::TrackRecord;
use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Parse rhythmdb.xml and extract all song entries
pub fn parse_database(path: &Path) -> Result<Vec<TrackRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open Rhythmbox database: {:?}", path))?;

    let mut reader = Reader::from_reader(BufReader::new(file));
    reader.config_mut().trim_text(true);

    let mut tracks = Vec::new();
    let mut current_entry: Option<RhythmboxEntry> = None;
    let mut current_element = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match name.as_ref() {
                    b"entry" => {
                        let is_song = e
                            .attributes()
                            .flatten()
                            .any(|a| a.key.as_ref() == b"type" && a.value.as_ref() == b"song");
                        if is_song {
                            current_entry = Some(RhythmboxEntry::new());
                        }
                    }
                    _ => {
                        if current_entry.is_some() {
                            current_element = String::from_utf8_lossy(name.as_ref()).to_string();
                        }
                    }
                }
            }

            Ok(Event::Text(e)) => {
                if let Some(ref mut entry) = current_entry {
                    let text = e.unescape().unwrap_or_default().to_string();

                    match current_element.as_str() {
                        "title" => entry.title = Some(text),
                        "artist" => entry.artist = Some(text),
                        "album" => entry.album = Some(text),
                        "location" => entry.location = Some(text),
                        "file-size" => entry.file_size = text.parse().ok(),
                        "date" => entry.date = text.parse().ok(),
                        "rating" => entry.rating = text.parse::<f64>().ok().map(|r| r.round().clamp(0.0, 5.0) as u8),
                        "play-count" => entry.play_count = text.parse().ok(),
                        "first-seen" => entry.first_seen = text.parse().ok(),
                        "mtime" => entry.mtime = text.parse().ok(),
                        _ => {}
                    }
                }
            }

            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"entry" {
                    if let Some(entry) = current_entry.take() {
                        match entry.into_record() {
                            Some(record) => tracks.push(record),
                            None => log::debug!("Skipping entry without a file location"),
                        }
                    }
                }
                current_element.clear();
            }

            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!(
                    "XML parsing error at position {}: {:?}",
                    reader.buffer_position(),
                    e
                );
            }
            _ => {}
        }

        buf.clear();
    }

    log::info!("Parsed {} tracks from Rhythmbox database", tracks.len());
    Ok(tracks)
}
