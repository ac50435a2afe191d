mod common;

use common::Stores;
use mik_rekordbox_sync::paths::path_to_location;
use mik_rekordbox_sync::sync::check;
use mik_rekordbox_sync::{EnergyColorMap, RekordboxXml, SyncConfig, TagSync};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Write a library file with one M4A and one MP3 track whose audio files exist
fn write_library(stores: &Stores) -> (PathBuf, PathBuf) {
    let m4a = stores.music("Archangel.m4a");
    let mp3 = stores.music("Night Drive.mp3");
    fs::create_dir_all(m4a.parent().unwrap()).unwrap();
    fs::write(&m4a, b"audio").unwrap();
    fs::write(&mp3, b"audio").unwrap();

    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<DJ_PLAYLISTS Version="1.0.0">
  <PRODUCT Name="rekordbox" Version="6.8.5" Company="AlphaTheta"/>
  <COLLECTION Entries="2">
    <TRACK TrackID="1" Name="Archangel" Artist="Burial" Kind="M4A File" Location="{}" Tonality="3A" Colour="0x000000">
      <TEMPO Inizio="0.025" Bpm="139.00" Metro="4/4" Battito="1"/>
    </TRACK>
    <TRACK TrackID="2" Name="Night Drive" Kind="MP3 File" Location="{}" Tonality="8A"/>
  </COLLECTION>
  <PLAYLISTS>
    <NODE Type="0" Name="ROOT" Count="1">
      <NODE Type="0" Name="MIK" Count="0"/>
    </NODE>
  </PLAYLISTS>
</DJ_PLAYLISTS>
"#,
        path_to_location(&m4a.to_string_lossy()),
        path_to_location(&mp3.to_string_lossy()),
    );
    fs::write(&stores.xml_path, xml).unwrap();
    (m4a, mp3)
}

fn colors() -> EnergyColorMap {
    EnergyColorMap::from_toml("[energy]\n6 = \"0xFFFF00\"\n7 = \"0xff0000\"\n").unwrap()
}

#[test]
fn test_fix_tags_end_to_end() {
    let stores = Stores::new();
    let (m4a, mp3) = write_library(&stores);
    let comments = HashMap::from([
        (m4a, "5A - Energy 6".to_string()),
        (mp3, "9A - Energy 7".to_string()),
    ]);

    let mut doc = RekordboxXml::load(&stores.xml_path).unwrap();
    let report = TagSync::new(SyncConfig::new(), colors(), comments)
        .run(&mut doc)
        .unwrap();

    assert_eq!(report.tracks_processed, 2);
    assert_eq!(report.key_fixed, 1);
    assert_eq!(report.color_fixed, 2);
    assert_eq!(report.wrong_format_skipped, 1);
    assert_eq!(stores.backups().len(), 1);

    let saved = RekordboxXml::load(&stores.xml_path).unwrap();
    let archangel = saved.track_by_id("1").unwrap();
    assert_eq!(archangel.tonality.as_deref(), Some("5A"));
    assert_eq!(archangel.colour.as_deref(), Some("0xFFFF00"));
    assert_eq!(archangel.attr("Artist"), Some("Burial"));

    // MP3 keys are left to Rekordbox
    let night_drive = saved.track_by_id("2").unwrap();
    assert_eq!(night_drive.tonality.as_deref(), Some("8A"));
    assert_eq!(night_drive.colour.as_deref(), Some("0xFF0000"));

    let key_list = saved.playlist_by_path(&["MIK"], "Key Analysis").unwrap();
    let color_list = saved.playlist_by_path(&["MIK"], "Color Analysis").unwrap();
    assert_eq!(saved.playlist_track_ids(key_list), vec!["1"]);
    assert_eq!(saved.playlist_track_ids(color_list), vec!["1", "2"]);
    assert!(check(&saved, None).unwrap().is_consistent());

    let text = fs::read_to_string(&stores.xml_path).unwrap();
    assert!(text.contains(r#"<TEMPO Inizio="0.025" Bpm="139.00" Metro="4/4" Battito="1"/>"#));
}

#[test]
fn test_fix_tags_second_run_changes_nothing() {
    let stores = Stores::new();
    let (m4a, mp3) = write_library(&stores);
    let comments = HashMap::from([
        (m4a, "5A - Energy 6".to_string()),
        (mp3, "9A - Energy 7".to_string()),
    ]);
    let sync = TagSync::new(SyncConfig::new(), colors(), comments);

    let mut doc = RekordboxXml::load(&stores.xml_path).unwrap();
    sync.run(&mut doc).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(1100));
    let mut doc = RekordboxXml::load(&stores.xml_path).unwrap();
    let second = sync.run(&mut doc).unwrap();
    assert_eq!(second.key_fixed, 0);
    assert_eq!(second.color_fixed, 0);

    // Review playlists are rebuilt per run, so they end up empty
    let key_list = doc.playlist_by_path(&["MIK"], "Key Analysis").unwrap();
    assert_eq!(doc.reference_count(key_list), 0);
    assert_eq!(doc.entry_count(key_list), 0);
}

#[test]
fn test_fix_tags_dry_run_writes_nothing() {
    let stores = Stores::new();
    let (m4a, _mp3) = write_library(&stores);
    let before = fs::read(&stores.xml_path).unwrap();
    let comments = HashMap::from([(m4a, "5A - Energy 6".to_string())]);

    let mut doc = RekordboxXml::load(&stores.xml_path).unwrap();
    let config = SyncConfig::new().with_dry_run(true);
    let report = TagSync::new(config, colors(), comments).run(&mut doc).unwrap();

    assert_eq!(report.key_fixed, 1);
    assert_eq!(report.tag_read_failed, 1);
    assert_eq!(doc.track_by_id("1").unwrap().tonality.as_deref(), Some("3A"));
    assert!(doc.playlist_by_path(&["MIK"], "Key Analysis").is_none());
    assert_eq!(fs::read(&stores.xml_path).unwrap(), before);
    assert!(stores.backups().is_empty());
}
