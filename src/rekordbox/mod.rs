//! Rekordbox XML library
//!
//! Loads a `DJ_PLAYLISTS` export into a typed, in-memory model (collection
//! tracks plus an arena-backed playlist tree), lets the reconcilers mutate
//! it, and writes it back without losing anything it does not model.

mod document;
mod model;
mod parser;
mod writer;

pub use document::{CountMismatch, RekordboxXml};
pub use model::{CollectionTrack, KeyType, NodeId, NodeKind, PlaylistNode, RawElement};
