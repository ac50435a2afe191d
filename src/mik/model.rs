//! Rows of the Mixed In Key database

/// Natural key of a collection: no two siblings share (name, is_folder)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    pub parent_id: Option<String>,
    pub name: String,
    pub is_folder: bool,
}

impl CollectionKey {
    pub fn new(parent_id: Option<&str>, name: &str, is_folder: bool) -> Self {
        Self {
            parent_id: parent_id.map(str::to_string),
            name: name.to_string(),
            is_folder,
        }
    }
}

/// A folder or playlist (`Collection` row)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MikCollection {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub is_folder: bool,
}

/// A `SongCollectionMembership` row waiting to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMembership {
    pub song_id: String,
    pub playlist_id: String,
    pub sequence: i64,
}

/// Row counts, for the `check` command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MikStats {
    pub songs: usize,
    pub folders: usize,
    pub playlists: usize,
    pub memberships: usize,
}

/// What a reset removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    pub collections_deleted: usize,
    pub memberships_deleted: usize,
}
