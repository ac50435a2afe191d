//! MIK Rekordbox Sync - keep a Rekordbox XML library and a Mixed In Key
//! database in step
//!
//! Fixes keys and colors in the XML from Mixed In Key's comment tags,
//! mirrors playlist trees in both directions, and deletes files the
//! operator has marked for removal.

pub mod config;
pub mod error;
pub mod mik;
pub mod paths;
pub mod rekordbox;
pub mod sync;
pub mod tags;

pub use config::{EnergyColorMap, SyncConfig};
pub use error::SyncError;
pub use mik::{MikDatabase, ResetConfirmation};
pub use rekordbox::RekordboxXml;
pub use sync::{MikToXml, RemovalDeleter, TagSync, XmlToMik};
