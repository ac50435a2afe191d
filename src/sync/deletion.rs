//! Delete the audio files of tracks listed in the removal playlist
//!
//! Only the files go; the XML is not modified. Rekordbox shows the tracks as
//! missing afterwards and the operator removes them there.

use super::report::DeletionReport;
use super::{enter, Phase};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::paths::normalize_opt;
use crate::rekordbox::RekordboxXml;
use anyhow::Result;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

const OPERATION: &str = "file removal";

pub struct RemovalDeleter {
    config: SyncConfig,
}

impl RemovalDeleter {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, doc: &RekordboxXml) -> Result<DeletionReport> {
        enter(OPERATION, Phase::Validating);
        let management = &self.config.management_folder;
        doc.management_folder(management)?;
        let playlist = doc
            .playlist_by_path(&[management.as_str()], &self.config.removal_playlist)
            .ok_or_else(|| SyncError::PlaylistMissing {
                folder: management.clone(),
                playlist: self.config.removal_playlist.clone(),
            })?;

        let mut report = DeletionReport {
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        enter(OPERATION, Phase::Processing);
        let mut seen = HashSet::new();
        for entry in doc.playlist_entries(playlist) {
            let track_id = match entry {
                Ok(id) => id,
                Err(key) => {
                    log::warn!("Removal playlist references a location outside the collection: {}", key);
                    report.unresolved += 1;
                    continue;
                }
            };
            if !seen.insert(track_id.clone()) {
                continue;
            }
            let Some(track) = doc.track_by_id(&track_id) else {
                log::warn!("Removal playlist references unknown track {}", track_id);
                report.unresolved += 1;
                continue;
            };

            let path = PathBuf::from(normalize_opt(track.location.as_deref()));
            if path.as_os_str().is_empty() || !path.exists() {
                log::warn!("Already gone: {}", path.display());
                report.missing += 1;
                continue;
            }

            if self.config.dry_run {
                log::info!("Would delete {}", path.display());
                report.deleted += 1;
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    log::info!("Deleted {}", path.display());
                    report.deleted += 1;
                }
                Err(e) => {
                    log::error!("Failed to delete {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        enter(OPERATION, Phase::Reporting);
        log::info!(
            "{} of {} listed files {}",
            report.deleted,
            seen.len(),
            if report.dry_run { "would be deleted" } else { "deleted" }
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::path_to_location;
    use crate::rekordbox::CollectionTrack;
    use tempfile::TempDir;

    fn fixture(dir: &TempDir, files: &[&str], listed: &[&str]) -> RekordboxXml {
        let mut doc = RekordboxXml::empty(dir.path().join("rekordbox.xml"));
        for (i, name) in files.iter().enumerate() {
            let path = dir.path().join(name);
            fs::write(&path, b"audio").unwrap();
            doc.add_collection_track(
                CollectionTrack::new((i + 1).to_string())
                    .with_location(path_to_location(&path.to_string_lossy())),
            );
        }
        let folder = doc.get_or_create_folder(&["MIK"]);
        let remove = doc.get_or_create_playlist(folder, "Remove");
        for id in listed {
            doc.add_track_reference(remove, id);
        }
        doc
    }

    #[test]
    fn test_deletes_listed_files_only() {
        let dir = TempDir::new().unwrap();
        let doc = fixture(&dir, &["a.mp3", "b.mp3"], &["1", "1", "9"]);

        let report = RemovalDeleter::new(SyncConfig::new()).run(&doc).unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(report.unresolved, 1);
        assert!(!dir.path().join("a.mp3").exists());
        assert!(dir.path().join("b.mp3").exists());

        // Second run finds the file already gone
        let again = RemovalDeleter::new(SyncConfig::new()).run(&doc).unwrap();
        assert_eq!(again.deleted, 0);
        assert_eq!(again.missing, 1);
    }

    #[test]
    fn test_dry_run_keeps_files() {
        let dir = TempDir::new().unwrap();
        let doc = fixture(&dir, &["a.mp3", "b.mp3"], &["1", "2"]);

        let config = SyncConfig::new().with_dry_run(true);
        let report = RemovalDeleter::new(config).run(&doc).unwrap();
        assert!(report.dry_run);
        assert_eq!(report.deleted, 2);
        assert!(dir.path().join("a.mp3").exists());
        assert!(dir.path().join("b.mp3").exists());
    }

    #[test]
    fn test_failed_delete_does_not_stop_the_batch() {
        let dir = TempDir::new().unwrap();
        let doc = fixture(&dir, &["a.mp3", "b.mp3"], &["1", "2"]);
        // A directory where track 1's file should be cannot be removed as a file
        let blocked = dir.path().join("a.mp3");
        fs::remove_file(&blocked).unwrap();
        fs::create_dir(&blocked).unwrap();

        let report = RemovalDeleter::new(SyncConfig::new()).run(&doc).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.deleted, 1);
        assert!(blocked.is_dir());
        assert!(!dir.path().join("b.mp3").exists());
    }

    #[test]
    fn test_location_keyed_stray_entry_is_unresolved() {
        let dir = TempDir::new().unwrap();
        let kept = dir.path().join("kept.mp3");
        fs::write(&kept, b"audio").unwrap();
        let kept_location = path_to_location(&kept.to_string_lossy());
        let stray_location = path_to_location(&dir.path().join("Gone.mp3").to_string_lossy());

        let xml = format!(
            r#"<DJ_PLAYLISTS Version="1.0.0">
  <COLLECTION Entries="1">
    <TRACK TrackID="1" Location="{kept_location}"/>
  </COLLECTION>
  <PLAYLISTS>
    <NODE Type="0" Name="ROOT" Count="1">
      <NODE Type="0" Name="MIK" Count="1">
        <NODE Name="Remove" Type="1" KeyType="1" Entries="2">
          <TRACK Key="{stray_location}"/>
          <TRACK Key="{kept_location}"/>
        </NODE>
      </NODE>
    </NODE>
  </PLAYLISTS>
</DJ_PLAYLISTS>"#
        );
        let doc = RekordboxXml::from_xml(&xml, dir.path().join("rekordbox.xml")).unwrap();

        let report = RemovalDeleter::new(SyncConfig::new()).run(&doc).unwrap();
        assert_eq!(report.unresolved, 1);
        assert_eq!(report.deleted, 1);
        assert!(!kept.exists());
    }

    #[test]
    fn test_missing_removal_playlist_aborts() {
        let dir = TempDir::new().unwrap();
        let mut doc = RekordboxXml::empty(dir.path().join("rekordbox.xml"));
        doc.get_or_create_folder(&["MIK"]);

        let err = RemovalDeleter::new(SyncConfig::new()).run(&doc).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::PlaylistMissing { .. })
        ));
    }
}
