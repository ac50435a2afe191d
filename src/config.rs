//! Sync configuration and the energy color table

use crate::error::SyncError;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Names and switches shared by every reconciler
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Top-level folder in the XML that holds this tool's own playlists
    pub management_folder: String,

    /// Review playlist for tracks whose key was rewritten
    pub key_playlist: String,

    /// Review playlist for tracks whose color was rewritten
    pub color_playlist: String,

    /// Playlist listing tracks whose files should be deleted
    pub removal_playlist: String,

    /// Folder (under the management folder) receiving mirrored Mixed In Key collections
    pub mirror_folder: String,

    /// Track kinds whose Tonality must be rewritten from the comment
    pub key_fix_kinds: Vec<String>,

    /// Extra playlist names never mirrored into Mixed In Key
    pub skip_playlists: Vec<String>,

    /// Compute and report only; never back up, write or delete
    pub dry_run: bool,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self {
            management_folder: "MIK".to_string(),
            key_playlist: "Key Analysis".to_string(),
            color_playlist: "Color Analysis".to_string(),
            removal_playlist: "Remove".to_string(),
            mirror_folder: "From MIK".to_string(),
            key_fix_kinds: vec!["M4A File".to_string()],
            skip_playlists: Vec::new(),
            dry_run: false,
        }
    }

    pub fn with_management_folder(mut self, name: impl Into<String>) -> Self {
        self.management_folder = name.into();
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_skip_playlists(mut self, names: Vec<String>) -> Self {
        self.skip_playlists = names;
        self
    }

    /// Whether the key workaround applies to a track of this kind
    pub fn needs_key_fix(&self, kind: Option<&str>) -> bool {
        kind.is_some_and(|kind| {
            self.key_fix_kinds
                .iter()
                .any(|k| k.eq_ignore_ascii_case(kind.trim()))
        })
    }

    /// Playlist names the XML -> MIK mirror must leave alone
    pub fn is_skipped_playlist(&self, name: &str) -> bool {
        name == self.key_playlist
            || name == self.color_playlist
            || name == self.removal_playlist
            || self.skip_playlists.iter().any(|n| n == name)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct EnergyColorFile {
    energy: BTreeMap<String, String>,
}

/// Energy level -> Rekordbox `Colour` value (`0xRRGGBB`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnergyColorMap {
    colors: HashMap<u8, String>,
}

impl EnergyColorMap {
    /// Load the table from a TOML file with an `[energy]` section
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SyncError::EnergyTableMissing(path.to_path_buf()).into());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read energy color table: {:?}", path))?;
        Self::from_toml(&text).with_context(|| format!("Invalid energy color table: {:?}", path))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let file: EnergyColorFile = toml::from_str(text)?;
        let mut map = Self::default();
        for (level, color) in file.energy {
            let level: u8 = level
                .trim()
                .parse()
                .with_context(|| format!("energy level is not a number: {level:?}"))?;
            if !(1..=99).contains(&level) {
                bail!("energy level out of range: {level}");
            }
            map.insert(level, &color)?;
        }
        log::debug!("Loaded {} energy colors", map.len());
        Ok(map)
    }

    pub fn insert(&mut self, level: u8, color: &str) -> Result<()> {
        let color = normalize_color(color)
            .with_context(|| format!("invalid color for energy {level}: {color:?}"))?;
        self.colors.insert(level, color);
        Ok(())
    }

    pub fn color_for(&self, level: u8) -> Option<&str> {
        self.colors.get(&level).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// `0xffff00` / `0xFFFF00` -> `0xFFFF00`
fn normalize_color(color: &str) -> Result<String> {
    let hex = color
        .trim()
        .strip_prefix("0x")
        .or_else(|| color.trim().strip_prefix("0X"))
        .context("missing 0x prefix")?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("expected six hex digits");
    }
    Ok(format!("0x{}", hex.to_ascii_uppercase()))
}

/// Compare two `Colour` values ignoring hex-digit case
pub fn same_color(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_table() {
        let map = EnergyColorMap::from_toml(
            r#"
            [energy]
            1 = "0x0000ff"
            6 = "0xFFFF00"
            "#,
        )
        .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.color_for(1), Some("0x0000FF"));
        assert_eq!(map.color_for(6), Some("0xFFFF00"));
        assert_eq!(map.color_for(7), None);
    }

    #[test]
    fn test_bad_entries_rejected() {
        assert!(EnergyColorMap::from_toml("[energy]\nx = \"0xFFFF00\"").is_err());
        assert!(EnergyColorMap::from_toml("[energy]\n0 = \"0xFFFF00\"").is_err());
        assert!(EnergyColorMap::from_toml("[energy]\n5 = \"yellow\"").is_err());
        assert!(EnergyColorMap::from_toml("[energy]\n5 = \"0xFFF\"").is_err());
    }

    #[test]
    fn test_missing_file_is_precondition_error() {
        let dir = TempDir::new().unwrap();
        let err = EnergyColorMap::load(&dir.path().join("colors.toml")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::EnergyTableMissing(_))
        ));
    }

    #[test]
    fn test_key_fix_kinds() {
        let config = SyncConfig::new();
        assert!(config.needs_key_fix(Some("M4A File")));
        assert!(config.needs_key_fix(Some("m4a file")));
        assert!(!config.needs_key_fix(Some("MP3 File")));
        assert!(!config.needs_key_fix(None));
    }

    #[test]
    fn test_skipped_playlists() {
        let config = SyncConfig::new().with_skip_playlists(vec!["Scratch".to_string()]);
        assert!(config.is_skipped_playlist("Key Analysis"));
        assert!(config.is_skipped_playlist("Remove"));
        assert!(config.is_skipped_playlist("Scratch"));
        assert!(!config.is_skipped_playlist("Peak Time"));
    }
}
