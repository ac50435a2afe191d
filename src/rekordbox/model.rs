//! Typed nodes of a Rekordbox XML library

use std::collections::HashMap;

/// An element the sync never interprets, kept verbatim so a load/save
/// cycle does not lose cue points, tempo markers and the like
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<RawElement>,
}

impl RawElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A `TRACK` entry of the `COLLECTION`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionTrack {
    /// `TrackID`, unique within the document
    pub id: String,

    /// `Location` as stored (`file://localhost/...`, percent-encoded)
    pub location: Option<String>,

    /// `Kind` (e.g. "M4A File")
    pub kind: Option<String>,

    /// `Tonality`, the musical key Rekordbox displays
    pub tonality: Option<String>,

    /// `Colour` (e.g. "0xFFFF00")
    pub colour: Option<String>,

    /// All attributes in document order, including the modeled ones
    pub(crate) attributes: Vec<(String, String)>,

    /// `TEMPO`, `POSITION_MARK`, ...
    pub(crate) children: Vec<RawElement>,
}

impl CollectionTrack {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: None,
            kind: None,
            tonality: None,
            colour: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_tonality(mut self, tonality: impl Into<String>) -> Self {
        self.tonality = Some(tonality.into());
        self
    }

    pub fn with_colour(mut self, colour: impl Into<String>) -> Self {
        self.colour = Some(colour.into());
        self
    }

    /// Any unmodeled attribute, e.g. `Name` or `Artist`
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn from_raw(raw: RawElement) -> Option<Self> {
        let id = raw.attr("TrackID")?.to_string();
        let get = |key: &str| raw.attr(key).map(str::to_string);
        Some(Self {
            location: get("Location"),
            kind: get("Kind"),
            tonality: get("Tonality"),
            colour: get("Colour"),
            id,
            attributes: raw.attributes,
            children: raw.children,
        })
    }

    /// Attributes to write: original order with modeled values substituted,
    /// then modeled values that were not in the source element
    pub(crate) fn output_attributes(&self) -> Vec<(&str, &str)> {
        let modeled: [(&str, Option<&str>); 5] = [
            ("TrackID", Some(self.id.as_str())),
            ("Kind", self.kind.as_deref()),
            ("Location", self.location.as_deref()),
            ("Tonality", self.tonality.as_deref()),
            ("Colour", self.colour.as_deref()),
        ];

        let mut out = Vec::with_capacity(self.attributes.len() + 2);
        for (key, value) in &self.attributes {
            match modeled.iter().find(|(k, _)| k == key) {
                Some((_, Some(v))) => out.push((key.as_str(), *v)),
                Some((_, None)) => {}
                None => out.push((key.as_str(), value.as_str())),
            }
        }
        for (key, value) in modeled {
            if let Some(v) = value {
                if !self.attributes.iter().any(|(k, _)| k == key) {
                    out.push((key, v));
                }
            }
        }
        out
    }
}

/// Index of a node in the playlist tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// How a playlist's `TRACK Key="..."` references are spelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// `Key` is a `TrackID`
    TrackId,
    /// `Key` is a `Location`
    Location,
}

impl KeyType {
    pub(crate) fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("1") => KeyType::Location,
            _ => KeyType::TrackId,
        }
    }

    pub(crate) fn as_attr(self) -> &'static str {
        match self {
            KeyType::TrackId => "0",
            KeyType::Location => "1",
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Folder {
        children: Vec<NodeId>,
        /// First child per (name, is_folder)
        index: HashMap<(String, bool), NodeId>,
        /// `Count` attribute
        count: usize,
    },
    Playlist {
        key_type: KeyType,
        /// Raw `Key` values in order
        entries: Vec<String>,
        /// `Entries` attribute
        entry_count: usize,
    },
}

/// A `NODE` of the playlist tree
#[derive(Debug, Clone)]
pub struct PlaylistNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub(crate) extra_attributes: Vec<(String, String)>,
}

impl PlaylistNode {
    pub(crate) fn folder(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            parent,
            kind: NodeKind::Folder {
                children: Vec::new(),
                index: HashMap::new(),
                count: 0,
            },
            extra_attributes: Vec::new(),
        }
    }

    pub(crate) fn playlist(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            parent,
            kind: NodeKind::Playlist {
                key_type: KeyType::TrackId,
                entries: Vec::new(),
                entry_count: 0,
            },
            extra_attributes: Vec::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    /// The stored `Count`/`Entries` attribute
    pub fn declared_count(&self) -> usize {
        match &self.kind {
            NodeKind::Folder { count, .. } => *count,
            NodeKind::Playlist { entry_count, .. } => *entry_count,
        }
    }

    /// Number of child nodes or track references actually present
    pub fn actual_count(&self) -> usize {
        match &self.kind {
            NodeKind::Folder { children, .. } => children.len(),
            NodeKind::Playlist { entries, .. } => entries.len(),
        }
    }
}
