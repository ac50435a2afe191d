//! Mirror the Rekordbox playlist tree into Mixed In Key
//!
//! Folders and playlists are matched by (parent, name, is_folder); tracks
//! by normalized file path. Only missing collections and memberships are
//! created, so running twice adds nothing the second time. Everything runs
//! in a single transaction: either the whole mirror lands or none of it.

use super::report::MirrorReport;
use super::{enter, Phase};
use crate::config::SyncConfig;
use crate::mik::{CollectionKey, MikDatabase, NewMembership, ResetConfirmation};
use crate::paths::normalize_opt;
use crate::rekordbox::{NodeId, RekordboxXml};
use anyhow::Result;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

const OPERATION: &str = "XML -> MIK mirror";

/// Placeholder IDs handed out in dry-run mode; never a valid UUID
const DRY_RUN_ID_PREFIX: &str = "dry-run:";

/// Rekordbox XML -> Mixed In Key mirror
pub struct XmlToMik {
    config: SyncConfig,
}

/// Members already in a playlist and the next free sequence number
struct PlaylistMembers {
    songs: HashSet<String>,
    next_sequence: i64,
}

/// Run-local state threaded through the traversal
struct MirrorContext<'a> {
    db: &'a MikDatabase,
    dry_run: bool,
    management: NodeId,
    existing: HashMap<CollectionKey, String>,
    songs_by_path: HashMap<String, String>,
    playlists: HashMap<String, PlaylistMembers>,
    placeholders: usize,
    report: MirrorReport,
}

impl XmlToMik {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    /// Mirror `doc` into `db`. A reset, when confirmed, wipes the database's
    /// non-system collections first (skipped in dry-run mode).
    pub fn run(
        &self,
        doc: &RekordboxXml,
        db: &MikDatabase,
        reset: Option<ResetConfirmation>,
    ) -> Result<MirrorReport> {
        enter(OPERATION, Phase::Validating);
        let management = doc.management_folder(&self.config.management_folder)?;
        let dry_run = self.config.dry_run;

        let mut report = MirrorReport {
            dry_run,
            ..Default::default()
        };

        if !dry_run {
            enter(OPERATION, Phase::BackingUp);
            report.backup = Some(db.backup_copy()?);
        }

        if let Some(token) = reset {
            if dry_run {
                log::info!("Dry run: not resetting the Mixed In Key database");
            } else {
                report.reset = Some(db.reset_non_system_data(token)?);
            }
        }

        let mut ctx = MirrorContext {
            db,
            dry_run,
            management,
            existing: db.existing_collections()?,
            songs_by_path: db.song_path_index()?,
            playlists: HashMap::new(),
            placeholders: 0,
            report,
        };

        enter(OPERATION, Phase::Processing);
        let root = doc.playlists_root();
        if dry_run {
            self.mirror_folder(doc, root, None, &mut ctx)?;
        } else {
            db.with_transaction(|_| self.mirror_folder(doc, root, None, &mut ctx))?;
            enter(OPERATION, Phase::Persisting);
        }

        enter(OPERATION, Phase::Reporting);
        let report = ctx.report;
        log::info!(
            "Mirrored into Mixed In Key: {} collections created, {} tracks added",
            report.collections_created(),
            report.memberships_added
        );
        Ok(report)
    }

    fn mirror_folder(
        &self,
        doc: &RekordboxXml,
        folder: NodeId,
        parent_id: Option<&str>,
        ctx: &mut MirrorContext,
    ) -> Result<()> {
        for &child in doc.children(folder) {
            if child == ctx.management {
                log::debug!("Skipping management folder '{}'", doc.node_path(child));
                continue;
            }
            let node = doc.node(child);
            if !node.is_folder() && self.config.is_skipped_playlist(&node.name) {
                log::debug!("Skipping playlist '{}'", doc.node_path(child));
                continue;
            }

            let id = ctx.collection_id(parent_id, &node.name, node.is_folder())?;
            if node.is_folder() {
                self.mirror_folder(doc, child, Some(&id), ctx)?;
            } else {
                mirror_playlist(doc, child, &id, ctx)?;
            }
        }
        Ok(())
    }
}

impl MirrorContext<'_> {
    /// Existing ID for the natural key, or a newly created one
    fn collection_id(&mut self, parent_id: Option<&str>, name: &str, is_folder: bool) -> Result<String> {
        let key = CollectionKey::new(parent_id, name, is_folder);
        if let Some(id) = self.existing.get(&key) {
            self.report.collections_existing += 1;
            return Ok(id.clone());
        }

        let id = if self.dry_run {
            self.placeholders += 1;
            format!("{DRY_RUN_ID_PREFIX}{}", self.placeholders)
        } else {
            self.db.create_collection(parent_id, name, is_folder)?
        };
        log::info!(
            "Created {} '{}'",
            if is_folder { "folder" } else { "playlist" },
            name
        );
        if is_folder {
            self.report.folders_created += 1;
        } else {
            self.report.playlists_created += 1;
        }
        self.existing.insert(key, id.clone());
        Ok(id)
    }
}

fn mirror_playlist(
    doc: &RekordboxXml,
    playlist: NodeId,
    playlist_id: &str,
    ctx: &mut MirrorContext,
) -> Result<()> {
    let members = match ctx.playlists.entry(playlist_id.to_string()) {
        Entry::Occupied(e) => e.into_mut(),
        Entry::Vacant(e) => {
            let loaded = if playlist_id.starts_with(DRY_RUN_ID_PREFIX) {
                PlaylistMembers {
                    songs: HashSet::new(),
                    next_sequence: 0,
                }
            } else {
                PlaylistMembers {
                    songs: ctx.db.members_of(playlist_id)?,
                    next_sequence: ctx.db.max_sequence_in_playlist(playlist_id)? + 1,
                }
            };
            e.insert(loaded)
        }
    };

    let mut pending = Vec::new();
    for entry in doc.playlist_entries(playlist) {
        let track_id = match entry {
            Ok(id) => id,
            Err(key) => {
                log::warn!(
                    "Playlist '{}' references a location outside the collection: {}",
                    doc.node_path(playlist),
                    key
                );
                ctx.report.tracks_unresolved += 1;
                continue;
            }
        };
        let Some(track) = doc.track_by_id(&track_id) else {
            log::warn!(
                "Playlist '{}' references unknown track {}",
                doc.node_path(playlist),
                track_id
            );
            ctx.report.tracks_unresolved += 1;
            continue;
        };

        let path = normalize_opt(track.location.as_deref());
        let Some(song_id) = ctx.songs_by_path.get(&path) else {
            log::warn!("Not in Mixed In Key: {}", path);
            ctx.report.tracks_missing += 1;
            continue;
        };

        if !members.songs.insert(song_id.clone()) {
            ctx.report.memberships_existing += 1;
            continue;
        }

        pending.push(NewMembership {
            song_id: song_id.clone(),
            playlist_id: playlist_id.to_string(),
            sequence: members.next_sequence,
        });
        members.next_sequence += 1;
    }

    if !pending.is_empty() {
        log::debug!(
            "Adding {} tracks to '{}'",
            pending.len(),
            doc.node_path(playlist)
        );
        if !ctx.dry_run {
            ctx.db.insert_memberships(&pending)?;
        }
        ctx.report.memberships_added += pending.len();
    }
    Ok(())
}
