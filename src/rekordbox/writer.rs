//! Rekordbox XML serialization

use super::document::RekordboxXml;
use super::model::{NodeId, NodeKind, RawElement};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::Write;

/// Serialize a document to a UTF-8 string with two-space indentation
pub fn write_document(doc: &RekordboxXml) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("DJ_PLAYLISTS");
    for (k, v) in &doc.root_attributes {
        root.push_attribute((k.as_str(), v.as_str()));
    }
    writer.write_event(Event::Start(root))?;

    for element in &doc.other_elements {
        write_raw(&mut writer, element)?;
    }

    write_collection(&mut writer, doc)?;

    writer.write_event(Event::Start(BytesStart::new("PLAYLISTS")))?;
    write_node(&mut writer, doc, doc.playlists_root())?;
    writer.write_event(Event::End(BytesEnd::new("PLAYLISTS")))?;

    writer.write_event(Event::End(BytesEnd::new("DJ_PLAYLISTS")))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(String::from_utf8(bytes)?)
}

fn write_collection<W: Write>(writer: &mut Writer<W>, doc: &RekordboxXml) -> Result<()> {
    let tracks = doc.tracks_for_writer();
    let count = tracks.len().to_string();
    let mut start = BytesStart::new("COLLECTION");
    start.push_attribute(("Entries", count.as_str()));

    if tracks.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for track in tracks {
        let mut element = BytesStart::new("TRACK");
        for (k, v) in track.output_attributes() {
            element.push_attribute((k, v));
        }
        write_with_children(writer, element, "TRACK", &track.children)?;
    }
    writer.write_event(Event::End(BytesEnd::new("COLLECTION")))?;
    Ok(())
}

fn write_node<W: Write>(writer: &mut Writer<W>, doc: &RekordboxXml, id: NodeId) -> Result<()> {
    let node = doc.node(id);
    let mut start = BytesStart::new("NODE");

    match &node.kind {
        NodeKind::Folder {
            children, count, ..
        } => {
            let count = count.to_string();
            start.push_attribute(("Type", "0"));
            start.push_attribute(("Name", node.name.as_str()));
            for (k, v) in &node.extra_attributes {
                start.push_attribute((k.as_str(), v.as_str()));
            }
            start.push_attribute(("Count", count.as_str()));

            if children.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for &child in children {
                    write_node(writer, doc, child)?;
                }
                writer.write_event(Event::End(BytesEnd::new("NODE")))?;
            }
        }
        NodeKind::Playlist {
            key_type,
            entries,
            entry_count,
        } => {
            let entry_count = entry_count.to_string();
            start.push_attribute(("Name", node.name.as_str()));
            start.push_attribute(("Type", "1"));
            for (k, v) in &node.extra_attributes {
                start.push_attribute((k.as_str(), v.as_str()));
            }
            start.push_attribute(("KeyType", key_type.as_attr()));
            start.push_attribute(("Entries", entry_count.as_str()));

            if entries.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for key in entries {
                    let mut track = BytesStart::new("TRACK");
                    track.push_attribute(("Key", key.as_str()));
                    writer.write_event(Event::Empty(track))?;
                }
                writer.write_event(Event::End(BytesEnd::new("NODE")))?;
            }
        }
    }
    Ok(())
}

fn write_raw<W: Write>(writer: &mut Writer<W>, element: &RawElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (k, v) in &element.attributes {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    write_with_children(writer, start, &element.name, &element.children)
}

fn write_with_children<W: Write>(
    writer: &mut Writer<W>,
    start: BytesStart,
    name: &str,
    children: &[RawElement],
) -> Result<()> {
    if children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for child in children {
        write_raw(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::rekordbox::{CollectionTrack, RekordboxXml};
    use std::path::PathBuf;

    const SOURCE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DJ_PLAYLISTS Version="1.0.0">
  <PRODUCT Name="rekordbox" Version="6.8.5" Company="AlphaTheta"/>
  <COLLECTION Entries="1">
    <TRACK TrackID="1" Name="Drum &amp; Bass &quot;Live&quot;" Kind="M4A File" Location="file://localhost/C:/Music/A%20B.m4a" Tonality="3A" Colour="0x000000">
      <TEMPO Inizio="0.025" Bpm="128.00" Metro="4/4" Battito="1"/>
      <POSITION_MARK Name="" Type="0" Start="12.3" Num="-1"/>
    </TRACK>
  </COLLECTION>
  <PLAYLISTS>
    <NODE Type="0" Name="ROOT" Count="1">
      <NODE Name="Peak" Type="1" KeyType="0" Entries="1">
        <TRACK Key="1"/>
      </NODE>
    </NODE>
  </PLAYLISTS>
</DJ_PLAYLISTS>
"#;

    fn parse(xml: &str) -> RekordboxXml {
        RekordboxXml::from_xml(xml, PathBuf::from("rekordbox.xml")).unwrap()
    }

    #[test]
    fn test_save_preserves_unmodeled_content() {
        let doc = parse(SOURCE);
        let out = doc.to_xml_string().unwrap();

        assert!(out.contains(r#"<PRODUCT Name="rekordbox" Version="6.8.5" Company="AlphaTheta"/>"#));
        assert!(out.contains("Drum &amp; Bass &quot;Live&quot;"));
        assert!(out.contains(r#"<TEMPO Inizio="0.025" Bpm="128.00" Metro="4/4" Battito="1"/>"#));
        assert!(out.contains("POSITION_MARK"));
        assert!(out.contains(r#"<TRACK Key="1"/>"#));
    }

    #[test]
    fn test_output_parses_back_identically() {
        let doc = parse(SOURCE);
        let first = doc.to_xml_string().unwrap();
        let second = parse(&first).to_xml_string().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_modified_values_written() {
        let mut doc = parse(SOURCE);
        let track = doc.track_by_id_mut("1").unwrap();
        track.tonality = Some("5A".to_string());
        track.colour = Some("0xFFFF00".to_string());

        let out = doc.to_xml_string().unwrap();
        assert!(out.contains(r#"Tonality="5A""#));
        assert!(out.contains(r#"Colour="0xFFFF00""#));
        assert!(!out.contains("3A"));
    }

    #[test]
    fn test_collection_entries_matches_track_count() {
        let mut doc = parse(SOURCE);
        doc.add_collection_track(CollectionTrack::new("2").with_location("file://localhost/x.mp3"));
        let out = doc.to_xml_string().unwrap();
        assert!(out.contains(r#"<COLLECTION Entries="2">"#));
    }

    #[test]
    fn test_new_nodes_written_with_counts() {
        let mut doc = parse(SOURCE);
        let folder = doc.get_or_create_folder(&["MIK"]);
        let playlist = doc.get_or_create_playlist(folder, "Key Analysis");
        doc.add_track_reference(playlist, "1");
        doc.set_entry_count(playlist, 1);

        let out = doc.to_xml_string().unwrap();
        assert!(out.contains(r#"<NODE Type="0" Name="ROOT" Count="2">"#));
        assert!(out.contains(r#"<NODE Type="0" Name="MIK" Count="1">"#));
        assert!(out.contains(r#"<NODE Name="Key Analysis" Type="1" KeyType="0" Entries="1">"#));
    }
}
