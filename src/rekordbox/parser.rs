//! Rekordbox XML (DJ_PLAYLISTS) parser

use super::document::RekordboxXml;
use super::model::{CollectionTrack, KeyType, NodeId, NodeKind, PlaylistNode, RawElement};
use crate::error::SyncError;
use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::PathBuf;

/// Parse a whole document from any buffered reader
pub fn parse_document<R: BufRead>(source: R, path: PathBuf) -> Result<RekordboxXml> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let root = read_tree(&mut reader)?;
    if root.name != "DJ_PLAYLISTS" {
        return Err(SyncError::InvalidDocument(format!(
            "root element is <{}>, expected <DJ_PLAYLISTS>",
            root.name
        ))
        .into());
    }

    build_document(root, path)
}

/// Read the element tree; a malformed document is an error, never partially loaded
fn read_tree<R: BufRead>(reader: &mut Reader<R>) -> Result<RawElement> {
    let mut stack: Vec<RawElement> = Vec::new();
    let mut root: Option<RawElement> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => stack.push(element_from_start(&e)?),
            Ok(Event::Empty(e)) => {
                let element = element_from_start(&e)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| SyncError::InvalidDocument("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SyncError::InvalidDocument(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
                .into());
            }
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(SyncError::InvalidDocument("unexpected end of document".into()).into());
    }
    root.ok_or_else(|| SyncError::InvalidDocument("empty document".into()).into())
}

fn element_from_start(e: &BytesStart) -> Result<RawElement> {
    let mut element = RawElement::new(String::from_utf8_lossy(e.name().as_ref()));
    for attr in e.attributes() {
        let attr = attr.context("Malformed attribute")?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .with_context(|| format!("Bad value for attribute {key}"))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [RawElement], root: &mut Option<RawElement>, element: RawElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn build_document(root: RawElement, path: PathBuf) -> Result<RekordboxXml> {
    let mut doc = RekordboxXml::empty(path);
    doc.root_attributes = root.attributes;

    let mut saw_playlists = false;
    for child in root.children {
        match child.name.as_str() {
            "COLLECTION" => {
                for raw in child.children {
                    if raw.name != "TRACK" {
                        continue;
                    }
                    match CollectionTrack::from_raw(raw) {
                        Some(track) => doc.push_track(track),
                        None => log::warn!("Skipping collection TRACK without TrackID"),
                    }
                }
            }
            "PLAYLISTS" => {
                saw_playlists = true;
                let root_node = child
                    .children
                    .into_iter()
                    .find(|n| n.name == "NODE")
                    .ok_or_else(|| SyncError::InvalidDocument("PLAYLISTS has no ROOT node".into()))?;
                doc.nodes.clear();
                build_node(&mut doc.nodes, root_node, None);
                doc.root = NodeId(0);
            }
            _ => doc.other_elements.push(child),
        }
    }

    if !saw_playlists {
        log::warn!("Document has no PLAYLISTS section, starting with an empty ROOT");
    }

    log::info!(
        "Parsed {} tracks and {} playlist nodes from {:?}",
        doc.track_count(),
        doc.nodes.len(),
        doc.path()
    );
    Ok(doc)
}

fn build_node(nodes: &mut Vec<PlaylistNode>, raw: RawElement, parent: Option<NodeId>) -> NodeId {
    let id = NodeId(nodes.len());
    let name = raw.attr("Name").unwrap_or_default().to_string();
    let is_folder = raw.attr("Type") != Some("1");

    let extra_attributes: Vec<(String, String)> = raw
        .attributes
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "Type" | "Name" | "Count" | "KeyType" | "Entries"))
        .cloned()
        .collect();

    if is_folder {
        let count = raw.attr("Count").and_then(|c| c.parse().ok()).unwrap_or(0);
        let mut node = PlaylistNode::folder(name, parent);
        node.extra_attributes = extra_attributes;
        if let NodeKind::Folder { count: c, .. } = &mut node.kind {
            *c = count;
        }
        nodes.push(node);

        let mut children = Vec::new();
        let mut index = HashMap::new();
        for child in raw.children.into_iter().filter(|c| c.name == "NODE") {
            let child_id = build_node(nodes, child, Some(id));
            let key = (nodes[child_id.0].name.clone(), nodes[child_id.0].is_folder());
            index.entry(key).or_insert(child_id);
            children.push(child_id);
        }
        if let NodeKind::Folder {
            children: c,
            index: i,
            ..
        } = &mut nodes[id.0].kind
        {
            *c = children;
            *i = index;
        }
    } else {
        let key_type = KeyType::from_attr(raw.attr("KeyType"));
        let entry_count = raw.attr("Entries").and_then(|c| c.parse().ok()).unwrap_or(0);
        let entries: Vec<String> = raw
            .children
            .iter()
            .filter(|c| c.name == "TRACK")
            .filter_map(|c| c.attr("Key").map(str::to_string))
            .collect();

        let mut node = PlaylistNode::playlist(name, parent);
        node.extra_attributes = extra_attributes;
        node.kind = NodeKind::Playlist {
            key_type,
            entries,
            entry_count,
        };
        nodes.push(node);
    }

    id
}
