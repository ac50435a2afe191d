//! Run summaries

use crate::mik::ResetSummary;
use std::fmt;
use std::path::PathBuf;

fn header(f: &mut fmt::Formatter<'_>, title: &str, dry_run: bool) -> fmt::Result {
    if dry_run {
        writeln!(f, "{title} (dry run, nothing written)")
    } else {
        writeln!(f, "{title}")
    }
}

fn backup_line(f: &mut fmt::Formatter<'_>, backup: &Option<PathBuf>) -> fmt::Result {
    match backup {
        Some(path) => writeln!(f, "  backup:                 {}", path.display()),
        None => Ok(()),
    }
}

/// Outcome of a key/color fix pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSyncReport {
    pub dry_run: bool,
    pub backup: Option<PathBuf>,
    pub tracks_processed: usize,
    pub key_fixed: usize,
    pub color_fixed: usize,
    pub missing_key: usize,
    pub missing_energy: usize,
    /// Energy found but the color table has no entry for that level
    pub energy_unmapped: usize,
    pub wrong_format_skipped: usize,
    pub file_missing: usize,
    pub tag_read_failed: usize,
}

impl fmt::Display for TagSyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        header(f, "Key/color sync", self.dry_run)?;
        backup_line(f, &self.backup)?;
        writeln!(f, "  tracks processed:       {}", self.tracks_processed)?;
        writeln!(f, "  keys fixed:             {}", self.key_fixed)?;
        writeln!(f, "  colors fixed:           {}", self.color_fixed)?;
        writeln!(f, "  missing key:            {}", self.missing_key)?;
        writeln!(f, "  missing energy:         {}", self.missing_energy)?;
        writeln!(f, "  energy without color:   {}", self.energy_unmapped)?;
        writeln!(f, "  skipped (wrong format): {}", self.wrong_format_skipped)?;
        writeln!(f, "  file missing:           {}", self.file_missing)?;
        write!(f, "  tag read failed:        {}", self.tag_read_failed)
    }
}

/// Outcome of a mirror in either direction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub dry_run: bool,
    pub backup: Option<PathBuf>,
    pub reset: Option<ResetSummary>,
    pub folders_created: usize,
    pub playlists_created: usize,
    pub collections_existing: usize,
    pub memberships_added: usize,
    pub memberships_existing: usize,
    /// Track present in the source but not found in the target store
    pub tracks_missing: usize,
    /// Playlist reference to a track the source collection does not contain
    pub tracks_unresolved: usize,
}

impl MirrorReport {
    pub fn collections_created(&self) -> usize {
        self.folders_created + self.playlists_created
    }
}

impl fmt::Display for MirrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        header(f, "Mirror", self.dry_run)?;
        backup_line(f, &self.backup)?;
        if let Some(reset) = &self.reset {
            writeln!(
                f,
                "  reset:                  {} collections, {} memberships deleted",
                reset.collections_deleted, reset.memberships_deleted
            )?;
        }
        writeln!(f, "  folders created:        {}", self.folders_created)?;
        writeln!(f, "  playlists created:      {}", self.playlists_created)?;
        writeln!(f, "  collections existing:   {}", self.collections_existing)?;
        writeln!(f, "  tracks added:           {}", self.memberships_added)?;
        writeln!(f, "  tracks already present: {}", self.memberships_existing)?;
        writeln!(f, "  missing in target:      {}", self.tracks_missing)?;
        write!(f, "  unresolved references:  {}", self.tracks_unresolved)
    }
}

/// Outcome of deleting files listed in the removal playlist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub dry_run: bool,
    pub deleted: usize,
    pub failed: usize,
    pub missing: usize,
    pub unresolved: usize,
}

impl fmt::Display for DeletionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        header(f, "File removal", self.dry_run)?;
        let verb = if self.dry_run { "would delete" } else { "deleted" };
        writeln!(f, "  {verb:<23} {}", self.deleted)?;
        writeln!(f, "  failed:                 {}", self.failed)?;
        writeln!(f, "  already absent:         {}", self.missing)?;
        write!(f, "  unresolved references:  {}", self.unresolved)
    }
}
