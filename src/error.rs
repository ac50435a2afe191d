//! Precondition failures that abort a run before anything is mutated

use std::path::PathBuf;
use thiserror::Error;

/// A run was aborted because a required structure or file is absent,
/// or because a destructive step was not confirmed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("management folder '{0}' not found at the top level of the playlist tree")]
    ManagementFolderMissing(String),

    #[error("playlist '{playlist}' not found in folder '{folder}'")]
    PlaylistMissing { folder: String, playlist: String },

    #[error("top-level Mixed In Key folder '{0}' not found")]
    MikFolderMissing(String),

    #[error("Mixed In Key database not found: {0:?}")]
    DatabaseMissing(PathBuf),

    #[error("not a Mixed In Key database: {0}")]
    InvalidDatabase(String),

    #[error("energy color table not found: {0:?}")]
    EnergyTableMissing(PathBuf),

    #[error("backup already exists: {0:?}")]
    BackupExists(PathBuf),

    #[error("reset of the Mixed In Key database was not confirmed")]
    ResetNotConfirmed,

    #[error("invalid library document: {0}")]
    InvalidDocument(String),
}
