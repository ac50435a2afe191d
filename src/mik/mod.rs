//! Mixed In Key library database
//!
//! Folders and playlists live in `Collection`, files in `Song`, and
//! playlist contents in `SongCollectionMembership` ordered by `Sequence`.

mod database;
mod model;

pub use database::MikDatabase;
pub use model::{CollectionKey, MikCollection, MikStats, NewMembership, ResetSummary};

use crate::error::SyncError;

/// Text the operator must type to allow a reset
pub const RESET_PHRASE: &str = "RESET";

/// Proof that an operator confirmed wiping all non-system collections.
/// Only obtainable from the exact confirmation phrase.
#[derive(Debug)]
pub struct ResetConfirmation(());

impl ResetConfirmation {
    pub fn from_operator_input(input: &str) -> Result<Self, SyncError> {
        if input.trim() == RESET_PHRASE {
            Ok(Self(()))
        } else {
            Err(SyncError::ResetNotConfirmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_requires_exact_phrase() {
        assert!(ResetConfirmation::from_operator_input("RESET\n").is_ok());
        assert!(ResetConfirmation::from_operator_input("reset").is_err());
        assert!(ResetConfirmation::from_operator_input("y").is_err());
        assert!(ResetConfirmation::from_operator_input("").is_err());
    }
}
