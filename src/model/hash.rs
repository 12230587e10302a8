//! Content identity hash

use super::Track;
use sha1::{Digest, Sha1};

/// Fingerprint of a track's descriptive metadata
///
/// SHA-1 over title, album, artist and year (in that order, no separators).
/// Storage location and play statistics do not participate, and no case or
/// diacritic folding is applied.
pub fn content_hash(track: &dyn Track) -> String {
    hash_fields(&track.title(), &track.album(), &track.artist(), track.year())
}

fn hash_fields(title: &str, album: &str, artist: &str, year: i32) -> String {
    let mut hasher = Sha1::new();
    hasher.update(title.as_bytes());
    hasher.update(album.as_bytes());
    hasher.update(artist.as_bytes());
    hasher.update(year.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rating, TrackRecord};
    use chrono::{TimeZone, Utc};

    fn record() -> TrackRecord {
        TrackRecord {
            title: "Enter The Lovely".to_string(),
            album: "Sines And Singularities".to_string(),
            artist: "Bluetech".to_string(),
            year: 2005,
            file_path: "/m/bluetech/01.mp3".to_string(),
            size: 1234,
            ..Default::default()
        }
    }

    #[test]
    fn test_hash_ignores_location_and_stats() {
        let track = record().into_track();
        let before = content_hash(track.as_ref());

        track.set_rating(Rating::new(5)).unwrap();
        track.set_play_count(42).unwrap();
        track
            .set_added(Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()))
            .unwrap();
        track
            .set_modified(Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()))
            .unwrap();

        let moved = TrackRecord {
            file_path: "/elsewhere/x.flac".to_string(),
            size: 99,
            ..record()
        }
        .into_track();

        assert_eq!(before, content_hash(track.as_ref()));
        assert_eq!(before, content_hash(moved.as_ref()));
    }

    #[test]
    fn test_hash_depends_on_metadata() {
        let a = record().into_track();
        let b = TrackRecord {
            year: 2006,
            ..record()
        }
        .into_track();

        assert_ne!(content_hash(a.as_ref()), content_hash(b.as_ref()));
        assert_eq!(content_hash(a.as_ref()).len(), 40);
    }

    #[test]
    fn test_hash_is_case_sensitive() {
        let a = record().into_track();
        let b = TrackRecord {
            title: "enter the lovely".to_string(),
            ..record()
        }
        .into_track();
        assert_ne!(content_hash(a.as_ref()), content_hash(b.as_ref()));
    }
}
