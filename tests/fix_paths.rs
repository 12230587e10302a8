mod common;

use common::*;
use dj_library_sync::model::Library;
use dj_library_sync::ops::{find_duplicates, fix_missing};
use tempfile::TempDir;

#[test]
fn test_duplicate_reports_case_only_differences() {
    let dir = TempDir::new().unwrap();
    let db = make_shard(dir.path(), "home", "main");
    insert_track(&db, Row::new("/m/Techno/Song.mp3", "Song"));
    insert_track(&db, Row::new("/m/techno/song.mp3", "Song"));
    insert_track(&db, Row::new("/m/other.mp3", "Other"));

    let lib = open_main(&db);
    let groups = find_duplicates(&lib).unwrap();
    assert_eq!(
        groups,
        vec![vec!["/m/Techno/Song.mp3".to_string(), "/m/techno/song.mp3".to_string()]]
    );

    // nothing is rewritten
    assert!(lib.track("/m/Techno/Song.mp3").unwrap().is_some());
    assert!(lib.track("/m/techno/song.mp3").unwrap().is_some());
}

#[test]
fn test_missing_relinks_to_first_match() {
    let dir = TempDir::new().unwrap();
    let db = make_shard(dir.path(), "home", "main");
    let music = dir.path().join("music");
    std::fs::create_dir_all(music.join("found")).unwrap();
    std::fs::write(music.join("found/Lost Song.mp3"), b"not really audio").unwrap();
    std::fs::write(music.join("present.mp3"), b"not really audio").unwrap();

    let present = music.join("present.mp3").to_string_lossy().into_owned();
    insert_track(&db, Row::new(&present, "present").untagged());
    insert_track(&db, Row::new("/gone/Lost Song.mp3", "Lost Song").untagged());
    insert_track(&db, Row::new("/gone/Nowhere.mp3", "Nowhere").untagged());
    let new_path = music.join("found/Lost Song.mp3").to_string_lossy().into_owned();

    let lib = open_main(&db);
    let report = fix_missing(&lib, &music, true).unwrap();
    assert_eq!(report.missing, 2);
    assert_eq!(report.relinked, 1);
    assert_eq!(report.unmatched, 1);
    assert_eq!(report.errored, 0);
    assert!(lib.track("/gone/Lost Song.mp3").unwrap().is_some());

    let report = fix_missing(&lib, &music, false).unwrap();
    assert_eq!(report.relinked, 1);
    assert_eq!(report.unmatched, 1);
    assert!(lib.track("/gone/Lost Song.mp3").unwrap().is_none());
    assert!(lib.track("/gone/Nowhere.mp3").unwrap().is_some());

    // the new location survives a reopen
    drop(lib);
    let reopened = open_main(&db);
    let moved = reopened.track(&new_path).unwrap().unwrap();
    assert_eq!(moved.title(), "Lost Song");

    let report = fix_missing(&reopened, &music, false).unwrap();
    assert_eq!(report.missing, 1);
    assert_eq!(report.relinked, 0);
}
