//! Rewrite Tonality and Colour from Mixed In Key comments
//!
//! Rekordbox ignores the key Mixed In Key stores in some formats (M4A), so
//! the key token at the start of the comment is copied into `Tonality` for
//! those kinds. The `Energy N` token is mapped through the energy color
//! table into `Colour` for every kind. Changed tracks are collected in two
//! review playlists under the management folder.

use super::report::TagSyncReport;
use super::{enter, Phase};
use crate::config::{same_color, EnergyColorMap, SyncConfig};
use crate::paths::normalize_opt;
use crate::rekordbox::{NodeId, RekordboxXml};
use crate::tags::{parse_energy, parse_initial_key, TagReader};
use anyhow::Result;
use std::path::PathBuf;

const OPERATION: &str = "tag sync";

/// Key/color fixer over every collection track
pub struct TagSync<R: TagReader> {
    config: SyncConfig,
    colors: EnergyColorMap,
    reader: R,
}

struct ReviewPlaylists {
    key: NodeId,
    color: NodeId,
}

impl<R: TagReader> TagSync<R> {
    pub fn new(config: SyncConfig, colors: EnergyColorMap, reader: R) -> Self {
        Self {
            config,
            colors,
            reader,
        }
    }

    /// Run over the whole collection. In dry-run mode `doc` is left untouched.
    pub fn run(&self, doc: &mut RekordboxXml) -> Result<TagSyncReport> {
        enter(OPERATION, Phase::Validating);
        doc.management_folder(&self.config.management_folder)?;

        let mut report = TagSyncReport {
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        let mut scratch;
        let target = if self.config.dry_run {
            scratch = doc.clone();
            &mut scratch
        } else {
            enter(OPERATION, Phase::BackingUp);
            report.backup = Some(doc.backup_copy()?);
            doc
        };

        enter(OPERATION, Phase::Processing);
        let review = ReviewPlaylists {
            key: target.reset_or_create_management_playlist(
                &self.config.management_folder,
                &self.config.key_playlist,
            )?,
            color: target.reset_or_create_management_playlist(
                &self.config.management_folder,
                &self.config.color_playlist,
            )?,
        };

        let ids: Vec<String> = target
            .collection_tracks()
            .iter()
            .map(|t| t.id.clone())
            .collect();
        for (i, id) in ids.iter().enumerate() {
            log::debug!("[{}/{}] Track {}", i + 1, ids.len(), id);
            self.process_track(target, id, &review, &mut report);
        }

        target.set_entry_count(review.key, report.key_fixed);
        target.set_entry_count(review.color, report.color_fixed);

        if !self.config.dry_run {
            enter(OPERATION, Phase::Persisting);
            target.save_in_place()?;
        }

        enter(OPERATION, Phase::Reporting);
        log::info!(
            "Tag sync: {} tracks, {} keys fixed, {} colors fixed",
            report.tracks_processed,
            report.key_fixed,
            report.color_fixed
        );
        Ok(report)
    }

    fn process_track(
        &self,
        doc: &mut RekordboxXml,
        id: &str,
        review: &ReviewPlaylists,
        report: &mut TagSyncReport,
    ) {
        let Some(track) = doc.track_by_id(id) else {
            return;
        };
        let kind = track.kind.clone();
        let tonality = track.tonality.clone();
        let colour = track.colour.clone();
        let path = PathBuf::from(normalize_opt(track.location.as_deref()));

        report.tracks_processed += 1;

        if path.as_os_str().is_empty() || !path.exists() {
            log::warn!("File not found for track {}: {:?}", id, path);
            report.file_missing += 1;
            return;
        }

        let comment = match self.reader.read_comment(&path) {
            Ok(comment) => comment,
            Err(e) => {
                log::error!("{}", e);
                report.tag_read_failed += 1;
                return;
            }
        };

        match parse_energy(&comment) {
            None => {
                log::warn!("No energy in comment of {:?}: {:?}", path, comment);
                report.missing_energy += 1;
            }
            Some(level) => match self.colors.color_for(level) {
                None => {
                    log::debug!("No color configured for energy {} ({:?})", level, path);
                    report.energy_unmapped += 1;
                }
                Some(expected) => {
                    let current_matches = colour.as_deref().is_some_and(|c| same_color(c, expected));
                    if !current_matches {
                        log::info!(
                            "Color {:?} -> {} for {:?}",
                            colour.as_deref().unwrap_or(""),
                            expected,
                            path
                        );
                        let expected = expected.to_string();
                        if let Some(track) = doc.track_by_id_mut(id) {
                            track.colour = Some(expected);
                        }
                        doc.add_track_reference(review.color, id);
                        report.color_fixed += 1;
                    }
                }
            },
        }

        if !self.config.needs_key_fix(kind.as_deref()) {
            report.wrong_format_skipped += 1;
            return;
        }

        match parse_initial_key(&comment) {
            None => {
                log::warn!("No valid key in comment of {:?}: {:?}", path, comment);
                report.missing_key += 1;
            }
            Some(key) if tonality.as_deref() != Some(key) => {
                log::info!(
                    "Key {:?} -> {} for {:?}",
                    tonality.as_deref().unwrap_or(""),
                    key,
                    path
                );
                let key = key.to_string();
                if let Some(track) = doc.track_by_id_mut(id) {
                    track.tonality = Some(key);
                }
                doc.add_track_reference(review.key, id);
                report.key_fixed += 1;
            }
            Some(_) => {}
        }
    }
}
