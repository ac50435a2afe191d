//! In-memory Rekordbox library: collection tracks plus the playlist tree
//!
//! The tree is an arena of [`PlaylistNode`]s addressed by [`NodeId`]. Each
//! folder keeps a (name, is_folder) index of its children so lookups never
//! scan. All mutation happens in memory; disk is only touched by
//! [`RekordboxXml::backup_copy`] and [`RekordboxXml::save_in_place`].

use super::model::{CollectionTrack, KeyType, NodeId, NodeKind, PlaylistNode, RawElement};
use super::{parser, writer};
use crate::error::SyncError;
use crate::paths::normalize;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

/// A loaded `DJ_PLAYLISTS` document
#[derive(Debug, Clone)]
pub struct RekordboxXml {
    path: PathBuf,
    pub(super) root_attributes: Vec<(String, String)>,
    /// `PRODUCT` and anything else outside COLLECTION/PLAYLISTS
    pub(super) other_elements: Vec<RawElement>,
    tracks: Vec<CollectionTrack>,
    track_index: HashMap<String, usize>,
    /// Normalized location -> TrackID (first track wins)
    location_index: HashMap<String, String>,
    pub(super) nodes: Vec<PlaylistNode>,
    pub(super) root: NodeId,
}

/// A playlist or folder whose stored count disagrees with its contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountMismatch {
    pub path: String,
    pub declared: usize,
    pub actual: usize,
}

impl RekordboxXml {
    /// A document with an empty collection and a bare ROOT folder
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            root_attributes: vec![("Version".to_string(), "1.0.0".to_string())],
            other_elements: Vec::new(),
            tracks: Vec::new(),
            track_index: HashMap::new(),
            location_index: HashMap::new(),
            nodes: vec![PlaylistNode::folder("ROOT", None)],
            root: NodeId(0),
        }
    }

    /// Load a document from disk
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open Rekordbox XML: {:?}", path))?;
        parser::parse_document(BufReader::new(file), path.to_path_buf())
            .with_context(|| format!("Failed to parse Rekordbox XML: {:?}", path))
    }

    /// Parse a document held in memory; `path` is where it would be saved
    pub fn from_xml(xml: &str, path: PathBuf) -> Result<Self> {
        parser::parse_document(xml.as_bytes(), path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ----- collection -----

    pub(crate) fn push_track(&mut self, track: CollectionTrack) {
        if self.track_index.contains_key(&track.id) {
            log::warn!("Duplicate TrackID {} in collection, keeping the first", track.id);
            return;
        }
        if let Some(location) = track.location.as_deref() {
            let key = normalize(location);
            if !key.is_empty() {
                self.location_index.entry(key).or_insert_with(|| track.id.clone());
            }
        }
        self.track_index.insert(track.id.clone(), self.tracks.len());
        self.tracks.push(track);
    }

    /// Add a track to the collection (used to assemble documents programmatically)
    pub fn add_collection_track(&mut self, track: CollectionTrack) {
        self.push_track(track);
    }

    pub fn collection_tracks(&self) -> &[CollectionTrack] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track_by_id(&self, id: &str) -> Option<&CollectionTrack> {
        self.track_index.get(id).map(|&i| &self.tracks[i])
    }

    pub fn track_by_id_mut(&mut self, id: &str) -> Option<&mut CollectionTrack> {
        match self.track_index.get(id) {
            Some(&i) => Some(&mut self.tracks[i]),
            None => None,
        }
    }

    /// TrackID of the collection track at a normalized path
    pub fn track_id_for_path(&self, normalized: &str) -> Option<&str> {
        self.location_index.get(normalized).map(String::as_str)
    }

    /// Collection track at a path or location URI, in any spelling
    pub fn track_by_location(&self, location: &str) -> Option<&CollectionTrack> {
        self.track_id_for_path(&normalize(location))
            .and_then(|id| self.track_by_id(id))
    }

    // ----- tree navigation -----

    pub fn playlists_root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &PlaylistNode {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id.0].kind {
            NodeKind::Folder { children, .. } => children,
            NodeKind::Playlist { .. } => &[],
        }
    }

    pub fn find_child(&self, parent: NodeId, name: &str, is_folder: bool) -> Option<NodeId> {
        match &self.nodes[parent.0].kind {
            NodeKind::Folder { index, .. } => index.get(&(name.to_string(), is_folder)).copied(),
            NodeKind::Playlist { .. } => None,
        }
    }

    /// The required top-level folder holding this tool's playlists
    pub fn management_folder(&self, name: &str) -> Result<NodeId, SyncError> {
        self.find_child(self.root, name, true)
            .ok_or_else(|| SyncError::ManagementFolderMissing(name.to_string()))
    }

    /// Slash-joined names from ROOT's children down to `id`
    pub fn node_path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                break;
            }
            let node = &self.nodes[node_id.0];
            names.push(node.name.as_str());
            current = node.parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Look up a folder chain starting at ROOT, never creating anything
    pub fn folder_by_path(&self, segments: &[&str]) -> Option<NodeId> {
        segments
            .iter()
            .try_fold(self.root, |current, segment| self.find_child(current, segment, true))
    }

    /// Look up a playlist by its folder path, never creating anything
    pub fn playlist_by_path(&self, folders: &[&str], name: &str) -> Option<NodeId> {
        let folder = self.folder_by_path(folders)?;
        self.find_child(folder, name, false)
    }

    // ----- tree mutation -----

    fn add_child(&mut self, parent: NodeId, node: PlaylistNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        let key = (node.name.clone(), node.is_folder());
        self.nodes.push(node);
        if let NodeKind::Folder {
            children,
            index,
            count,
        } = &mut self.nodes[parent.0].kind
        {
            children.push(id);
            index.entry(key).or_insert(id);
            *count = children.len();
        }
        id
    }

    /// Find or create the folder `parent/name`
    pub fn get_or_create_child_folder(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(id) = self.find_child(parent, name, true) {
            return id;
        }
        log::debug!("Creating folder '{}' under '{}'", name, self.node_path(parent));
        self.add_child(parent, PlaylistNode::folder(name, Some(parent)))
    }

    /// Find or create a folder chain starting at ROOT
    pub fn get_or_create_folder(&mut self, segments: &[&str]) -> NodeId {
        let mut current = self.root;
        for segment in segments {
            current = self.get_or_create_child_folder(current, segment);
        }
        current
    }

    /// Find or create a playlist directly under `folder`
    pub fn get_or_create_playlist(&mut self, folder: NodeId, name: &str) -> NodeId {
        if let Some(id) = self.find_child(folder, name, false) {
            return id;
        }
        log::debug!("Creating playlist '{}' under '{}'", name, self.node_path(folder));
        self.add_child(folder, PlaylistNode::playlist(name, Some(folder)))
    }

    /// Find or create a playlist under the management folder and empty it
    pub fn reset_or_create_management_playlist(
        &mut self,
        management_folder: &str,
        name: &str,
    ) -> Result<NodeId, SyncError> {
        let folder = self.management_folder(management_folder)?;
        let id = self.get_or_create_playlist(folder, name);
        if let NodeKind::Playlist {
            entries,
            entry_count,
            ..
        } = &mut self.nodes[id.0].kind
        {
            entries.clear();
            *entry_count = 0;
        }
        Ok(id)
    }

    /// Append a reference to `track_id`. Does not touch the `Entries` attribute.
    pub fn add_track_reference(&mut self, playlist: NodeId, track_id: &str) {
        let location = self.track_by_id(track_id).and_then(|t| t.location.clone());
        if let NodeKind::Playlist {
            key_type, entries, ..
        } = &mut self.nodes[playlist.0].kind
        {
            match (*key_type, location) {
                (KeyType::Location, Some(location)) => entries.push(location),
                _ => entries.push(track_id.to_string()),
            }
        }
    }

    /// Whether `playlist` already references `track_id`
    pub fn has_track_reference(&self, playlist: NodeId, track_id: &str) -> bool {
        match &self.nodes[playlist.0].kind {
            NodeKind::Playlist {
                key_type: KeyType::TrackId,
                entries,
                ..
            } => entries.iter().any(|e| e == track_id),
            NodeKind::Playlist {
                key_type: KeyType::Location,
                entries,
                ..
            } => entries
                .iter()
                .any(|e| self.track_id_for_path(&normalize(e)) == Some(track_id)),
            NodeKind::Folder { .. } => false,
        }
    }

    /// A playlist's references in order: `Ok(track_id)`, or `Err(raw_key)`
    /// for a location-keyed entry no collection track sits at
    pub fn playlist_entries(&self, playlist: NodeId) -> Vec<Result<String, String>> {
        match &self.nodes[playlist.0].kind {
            NodeKind::Playlist {
                key_type: KeyType::TrackId,
                entries,
                ..
            } => entries.iter().cloned().map(Ok).collect(),
            NodeKind::Playlist {
                key_type: KeyType::Location,
                entries,
                ..
            } => entries
                .iter()
                .map(|e| match self.track_id_for_path(&normalize(e)) {
                    Some(id) => Ok(id.to_string()),
                    None => Err(e.clone()),
                })
                .collect(),
            NodeKind::Folder { .. } => Vec::new(),
        }
    }

    /// Track IDs referenced by a playlist, in order, unresolved entries left out
    pub fn playlist_track_ids(&self, playlist: NodeId) -> Vec<String> {
        self.playlist_entries(playlist)
            .into_iter()
            .filter_map(Result::ok)
            .collect()
    }

    /// Number of references actually present in a playlist
    pub fn reference_count(&self, playlist: NodeId) -> usize {
        self.nodes[playlist.0].actual_count()
    }

    /// Set the stored `Entries` (playlist) or `Count` (folder) attribute
    pub fn set_entry_count(&mut self, node: NodeId, n: usize) {
        match &mut self.nodes[node.0].kind {
            NodeKind::Playlist { entry_count, .. } => *entry_count = n,
            NodeKind::Folder { count, .. } => *count = n,
        }
    }

    pub fn entry_count(&self, node: NodeId) -> usize {
        self.nodes[node.0].declared_count()
    }

    /// Every node whose stored count differs from what it contains
    pub fn entry_count_mismatches(&self) -> Vec<CountMismatch> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|&id| id != self.root)
            .filter_map(|id| {
                let node = &self.nodes[id.0];
                let (declared, actual) = (node.declared_count(), node.actual_count());
                (declared != actual).then(|| CountMismatch {
                    path: self.node_path(id),
                    declared,
                    actual,
                })
            })
            .collect()
    }

    // ----- persistence -----

    /// Serialize the whole document
    pub fn to_xml_string(&self) -> Result<String> {
        writer::write_document(self)
    }

    /// Copy the on-disk document to `<stem>.backup-<timestamp>.<ext>`.
    /// Refuses to overwrite an existing backup.
    pub fn backup_copy(&self) -> Result<PathBuf> {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let backup = backup_path(&self.path, &stamp.to_string());

        let mut dest = match OpenOptions::new().write(true).create_new(true).open(&backup) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(SyncError::BackupExists(backup).into());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create backup: {:?}", backup))
            }
        };
        let mut src = File::open(&self.path)
            .with_context(|| format!("Failed to open {:?} for backup", self.path))?;
        std::io::copy(&mut src, &mut dest)
            .with_context(|| format!("Failed to write backup: {:?}", backup))?;

        log::info!("Backed up {:?} to {:?}", self.path, backup);
        Ok(backup)
    }

    /// Write the document back to where it was loaded from.
    /// The new content goes to a sibling temp file first and is renamed over
    /// the original, so a crash leaves either the old or the new file.
    pub fn save_in_place(&self) -> Result<()> {
        let xml = self.to_xml_string()?;
        let tmp = self.path.with_extension("xml.tmp");
        let mut file =
            File::create(&tmp).with_context(|| format!("Failed to create {:?}", tmp))?;
        file.write_all(xml.as_bytes())
            .and_then(|()| file.sync_all())
            .with_context(|| format!("Failed to write {:?}", tmp))?;
        drop(file);
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {:?}", self.path))?;
        log::info!("Saved Rekordbox XML: {:?}", self.path);
        Ok(())
    }

    pub(super) fn tracks_for_writer(&self) -> &[CollectionTrack] {
        &self.tracks
    }
}

fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "library".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{stem}.backup-{stamp}.{}", ext.to_string_lossy()),
        None => format!("{stem}.backup-{stamp}"),
    };
    path.with_file_name(name)
}
