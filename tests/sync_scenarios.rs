mod common;

use common::*;
use dj_library_sync::model::{Library, MemoryLibrary, Rating, TrackRecord};
use dj_library_sync::ops::{Direction, LibrarySpec, OpenOptions};
use dj_library_sync::rhythmbox::RhythmboxLibrary;
use dj_library_sync::{sync, SyncField, SyncOptions};
use std::path::Path;
use tempfile::TempDir;

fn dump_source(tracks: &[(&str, u8, u32)]) -> MemoryLibrary {
    let mut lib = MemoryLibrary::new("source");
    for (path, stars, plays) in tracks {
        lib.insert(TrackRecord {
            title: path.to_string(),
            file_path: path.to_string(),
            rating: Rating::new(*stars),
            play_count: *plays,
            ..Default::default()
        });
    }
    lib
}

fn write_rhythmbox(dir: &Path) {
    std::fs::write(
        dir.join("rhythmdb.xml"),
        r#"<rhythmdb version="2.0">
  <entry type="song">
    <title>Song</title>
    <location>file:///m/song.mp3</location>
    <file-size>1000</file-size>
    <rating>4</rating>
    <play-count>7</play-count>
  </entry>
  <entry type="iradio"><title>Radio</title><location>http://radio</location></entry>
</rhythmdb>"#,
    )
    .unwrap();
}

#[test]
fn test_rating_lands_in_engine_and_persists() {
    let dir = TempDir::new().unwrap();
    let db = make_shard(dir.path(), "home", "main");
    let song = insert_track(&db, Row::new("/m/song.mp3", "Song"));
    insert_track(&db, Row::new("/m/unknown.mp3", "Unknown").rating(40));

    let source = dump_source(&[("/m/song.mp3", 3, 0)]);
    let mut target = open_main(&db);
    let report = sync(&source, &target, &SyncOptions::new(SyncField::Rating)).unwrap();
    target.close();

    assert_eq!(report.visited, 2);
    assert_eq!(report.changed, 1);
    assert_eq!(report.not_found, 1);
    assert_eq!(report.unchanged, 0);
    assert_eq!(report.errored, 0);
    assert_eq!(report.changes[0].file_path, "/m/song.mp3");
    assert_eq!(column(&db, song, "rating"), 60);

    let reopened = open_main(&db);
    let track = reopened.track("/m/song.mp3").unwrap().unwrap();
    assert_eq!(track.rating(), Rating::new(3));
    assert_eq!(reopened.track("/m/unknown.mp3").unwrap().unwrap().rating(), Rating::new(2));
}

#[test]
fn test_dry_run_reports_without_writing() {
    let dir = TempDir::new().unwrap();
    let db = make_shard(dir.path(), "home", "main");
    let song = insert_track(&db, Row::new("/m/song.mp3", "Song"));

    let source = dump_source(&[("/m/song.mp3", 0, 12)]);
    let target = open_main(&db);
    let options = SyncOptions::new(SyncField::PlayCount).with_dry_run(true);

    let report = sync(&source, &target, &options).unwrap();
    assert!(report.dry_run);
    assert_eq!(report.changed, 1);
    assert_eq!(column(&db, song, "playCount"), 0);

    let report = sync(&source, &target, &options.with_dry_run(false)).unwrap();
    assert_eq!(report.changed, 1);
    assert_eq!(column(&db, song, "playCount"), 12);

    // nothing left to do
    let report = sync(&source, &target, &SyncOptions::new(SyncField::PlayCount)).unwrap();
    assert_eq!(report.changed, 0);
    assert_eq!(report.unchanged, 1);
}

#[test]
fn test_force_rewrites_equal_values() {
    let dir = TempDir::new().unwrap();
    let db = make_shard(dir.path(), "home", "main");
    insert_track(&db, Row::new("/m/song.mp3", "Song").rating(60));

    let source = dump_source(&[("/m/song.mp3", 3, 0)]);
    let target = open_main(&db);

    let report = sync(&source, &target, &SyncOptions::new(SyncField::Rating)).unwrap();
    assert_eq!(report.changed, 0);

    let report = sync(
        &source,
        &target,
        &SyncOptions::new(SyncField::Rating).with_force(true),
    )
    .unwrap();
    assert_eq!(report.changed, 1);
    assert_eq!(report.errored, 0);
}

#[test]
fn test_rhythmbox_to_engine_walking_source() {
    let dir = TempDir::new().unwrap();
    let rb = dir.path().join("rhythmbox");
    std::fs::create_dir_all(&rb).unwrap();
    write_rhythmbox(&rb);

    let db = make_shard(dir.path(), "home", "main");
    let song = insert_track(&db, Row::new("/m/song.mp3", "Song"));

    let source = LibrarySpec::Rhythmbox(Some(rb)).open(&OpenOptions::new()).unwrap();
    let target = LibrarySpec::Engine(Some(db.clone()))
        .open(&OpenOptions::new().with_volume_discovery(false))
        .unwrap();
    let options = SyncOptions::new(SyncField::Rating).with_direction(Direction::FromSource);

    let report = sync(source.as_ref(), target.as_ref(), &options).unwrap();
    assert_eq!(report.visited, 1);
    assert_eq!(report.changed, 1);
    assert_eq!(column(&db, song, "rating"), 80);
}

#[test]
fn test_read_only_target_counts_errors() {
    let dir = TempDir::new().unwrap();
    write_rhythmbox(dir.path());
    let db = make_shard(dir.path(), "home", "main");
    insert_track(&db, Row::new("/m/song.mp3", "Song").rating(20));

    let source = open_main(&db);
    let target = RhythmboxLibrary::open(dir.path()).unwrap();

    let report = sync(&source, &target, &SyncOptions::new(SyncField::Rating)).unwrap();
    assert_eq!(report.changed, 1);
    assert_eq!(report.errored, 1);
    assert_eq!(target.track("/m/song.mp3").unwrap().unwrap().rating(), Rating::new(4));
}

#[test]
fn test_sync_into_dump_persists_after_close() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lists.yaml");
    dj_library_sync::interchange::write_tracklists(
        &path,
        &[dj_library_sync::model::TracklistRecord {
            name: "Set".to_string(),
            path: "Set".to_string(),
            tracks: vec![TrackRecord {
                title: "Song".to_string(),
                file_path: "/m/song.mp3".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }],
    )
    .unwrap();

    let source = dump_source(&[("/m/song.mp3", 3, 0)]);
    let mut target = LibrarySpec::Dump(path.clone()).open(&OpenOptions::new()).unwrap();
    let report = sync(&source, target.as_ref(), &SyncOptions::new(SyncField::Rating)).unwrap();
    assert_eq!(report.changed, 1);
    target.close();

    let reopened = LibrarySpec::Dump(path).open(&OpenOptions::new()).unwrap();
    let song = reopened.track("/m/song.mp3").unwrap().unwrap();
    assert_eq!(song.rating(), Rating::new(3));
    assert_eq!(song.title(), "Song");
}
