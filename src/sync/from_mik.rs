//! Mirror one Mixed In Key folder tree into the Rekordbox XML
//!
//! The copy lands under `<management>/<mirror folder>/<top folder>/...`,
//! keeping the database's folder shape. Songs are matched to collection
//! tracks by normalized path; references already in a playlist are kept.

use super::report::MirrorReport;
use super::{enter, Phase};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::mik::MikDatabase;
use crate::paths::normalize;
use crate::rekordbox::{NodeId, RekordboxXml};
use anyhow::Result;
use std::collections::VecDeque;

const OPERATION: &str = "MIK -> XML mirror";

/// Mixed In Key -> Rekordbox XML mirror
pub struct MikToXml {
    config: SyncConfig,
}

/// A database folder or playlist, addressed by its names below the top folder
#[derive(Debug)]
struct SourceNode {
    /// Folder names from the top folder (inclusive) down to the parent
    folders: Vec<String>,
    name: String,
    /// Song files in `Sequence` order; `None` for folders
    files: Option<Vec<String>>,
}

impl MikToXml {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    /// Mirror the top-level database folder `folder` into `doc`.
    /// In dry-run mode `doc` is left untouched.
    pub fn run(&self, db: &MikDatabase, doc: &mut RekordboxXml, folder: &str) -> Result<MirrorReport> {
        enter(OPERATION, Phase::Validating);
        doc.management_folder(&self.config.management_folder)?;
        let top = db
            .find_top_level_folder(folder)?
            .ok_or_else(|| SyncError::MikFolderMissing(folder.to_string()))?;

        let source = collect_tree(db, &top.id, &top.name)?;
        log::info!(
            "Collected {} folders and playlists under '{}'",
            source.len(),
            top.name
        );

        let mut report = MirrorReport {
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
        let root = target.playlists_root();
        let base = self.ensure_folders(
            target,
            root,
            &[
                self.config.management_folder.as_str(),
                self.config.mirror_folder.as_str(),
                top.name.as_str(),
            ],
            &mut report,
        );

        for node in &source {
            let segments: Vec<&str> = node.folders[1..].iter().map(String::as_str).collect();
            let parent = self.ensure_folders(target, base, &segments, &mut report);
            match &node.files {
                None => {
                    if target.find_child(parent, &node.name, true).is_some() {
                        report.collections_existing += 1;
                    } else {
                        report.folders_created += 1;
                        target.get_or_create_child_folder(parent, &node.name);
                    }
                }
                Some(files) => {
                    let playlist = match target.find_child(parent, &node.name, false) {
                        Some(id) => {
                            report.collections_existing += 1;
                            id
                        }
                        None => {
                            report.playlists_created += 1;
                            target.get_or_create_playlist(parent, &node.name)
                        }
                    };
                    fill_playlist(target, playlist, files, &mut report);
                }
            }
        }

        if !self.config.dry_run {
            enter(OPERATION, Phase::Persisting);
            target.save_in_place()?;
        }

        enter(OPERATION, Phase::Reporting);
        log::info!(
            "Mirrored '{}' into the XML: {} tracks added, {} already present",
            top.name,
            report.memberships_added,
            report.memberships_existing
        );
        Ok(report)
    }

    /// Walk `segments` below `start`, creating folders as needed
    fn ensure_folders(
        &self,
        doc: &mut RekordboxXml,
        start: NodeId,
        segments: &[&str],
        report: &mut MirrorReport,
    ) -> NodeId {
        let mut current = start;
        for segment in segments {
            current = match doc.find_child(current, segment, true) {
                Some(id) => id,
                None => {
                    report.folders_created += 1;
                    doc.get_or_create_child_folder(current, segment)
                }
            };
        }
        current
    }
}

/// Breadth-first list of everything below `top_id`, parents before children
fn collect_tree(db: &MikDatabase, top_id: &str, top_name: &str) -> Result<Vec<SourceNode>> {
    let mut nodes = Vec::new();
    let mut queue = VecDeque::from([(top_id.to_string(), vec![top_name.to_string()])]);

    while let Some((folder_id, path)) = queue.pop_front() {
        for child in db.child_collections(&folder_id)? {
            if child.is_folder {
                let mut child_path = path.clone();
                child_path.push(child.name.clone());
                queue.push_back((child.id, child_path));
                nodes.push(SourceNode {
                    folders: path.clone(),
                    name: child.name,
                    files: None,
                });
            } else {
                let files = db.playlist_song_files(&child.id)?;
                nodes.push(SourceNode {
                    folders: path.clone(),
                    name: child.name,
                    files: Some(files),
                });
            }
        }
    }
    Ok(nodes)
}

fn fill_playlist(
    doc: &mut RekordboxXml,
    playlist: NodeId,
    files: &[String],
    report: &mut MirrorReport,
) {
    for file in files {
        let path = normalize(file);
        let Some(track_id) = doc.track_id_for_path(&path).map(str::to_string) else {
            log::warn!("Not in the Rekordbox collection: {}", file);
            report.tracks_missing += 1;
            continue;
        };
        if doc.has_track_reference(playlist, &track_id) {
            report.memberships_existing += 1;
            continue;
        }
        doc.add_track_reference(playlist, &track_id);
        report.memberships_added += 1;
    }
    let actual = doc.reference_count(playlist);
    doc.set_entry_count(playlist, actual);
    log::debug!("'{}' now holds {} tracks", doc.node_path(playlist), actual);
}
