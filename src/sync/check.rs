//! Read-only consistency report over both stores

use crate::mik::{MikDatabase, MikStats};
use crate::rekordbox::{CountMismatch, RekordboxXml};
use anyhow::Result;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub document_tracks: usize,
    pub mismatches: Vec<CountMismatch>,
    pub mik: Option<MikStats>,
}

impl CheckReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Check")?;
        writeln!(f, "  collection tracks:      {}", self.document_tracks)?;
        if let Some(mik) = &self.mik {
            writeln!(f, "  Mixed In Key songs:     {}", mik.songs)?;
            writeln!(f, "  Mixed In Key folders:   {}", mik.folders)?;
            writeln!(f, "  Mixed In Key playlists: {}", mik.playlists)?;
            writeln!(f, "  Mixed In Key entries:   {}", mik.memberships)?;
        }
        write!(f, "  count mismatches:       {}", self.mismatches.len())?;
        for m in &self.mismatches {
            write!(
                f,
                "\n    {}: stored {}, actual {}",
                m.path, m.declared, m.actual
            )?;
        }
        Ok(())
    }
}

/// Inspect the document (and the database, when given) without changing either
pub fn check(doc: &RekordboxXml, db: Option<&MikDatabase>) -> Result<CheckReport> {
    let mismatches = doc.entry_count_mismatches();
    for m in &mismatches {
        log::warn!(
            "'{}' declares {} entries but holds {}",
            m.path,
            m.declared,
            m.actual
        );
    }
    let mik = db.map(MikDatabase::stats).transpose()?;
    Ok(CheckReport {
        document_tracks: doc.track_count(),
        mismatches,
        mik,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_reports_stale_entries_attribute() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<DJ_PLAYLISTS Version="1.0.0">
  <COLLECTION Entries="1">
    <TRACK TrackID="1" Location="file://localhost/C:/Music/A.mp3"/>
  </COLLECTION>
  <PLAYLISTS>
    <NODE Type="0" Name="ROOT" Count="1">
      <NODE Name="Stale" Type="1" KeyType="0" Entries="3">
        <TRACK Key="1"/>
      </NODE>
    </NODE>
  </PLAYLISTS>
</DJ_PLAYLISTS>"#;
        let doc = RekordboxXml::from_xml(xml, PathBuf::from("x.xml")).unwrap();
        let report = check(&doc, None).unwrap();

        assert_eq!(report.document_tracks, 1);
        assert!(!report.is_consistent());
        assert_eq!(report.mismatches[0].path, "Stale");
        assert_eq!(report.mismatches[0].declared, 3);
        assert_eq!(report.mismatches[0].actual, 1);
        assert!(report.to_string().contains("Stale: stored 3, actual 1"));
    }
}
