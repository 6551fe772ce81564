//! DOCX package reading.

use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::document::{BibliographicEntry, Contributor, Document, UNTITLED};
use crate::error::{Error, Result};
use crate::util::{decode_text, resolve_entity};

use super::parser::parse_document_xml;

/// Read a .docx file from disk into a canonical [`Document`].
pub fn read_docx<P: AsRef<Path>>(path: P) -> Result<Document> {
    let file = std::fs::File::open(path)?;
    read_docx_from_reader(file)
}

/// Read a .docx package from any `Read + Seek` source.
pub fn read_docx_from_reader<R: Read + Seek>(reader: R) -> Result<Document> {
    let mut archive = ZipArchive::new(reader)?;

    let document_xml = read_archive_file(&mut archive, "word/document.xml")
        .map_err(|_| Error::Parse("package is missing word/document.xml".to_string()))?;
    let contents = parse_document_xml(&document_xml)?;

    let core = read_archive_file(&mut archive, "docProps/core.xml").ok();
    let properties = core.as_deref().map(parse_core_xml).unwrap_or_default();

    let mut document = Document::new(
        properties
            .title
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string()),
    )
    .with_contents(contents);
    if let Some(subject) = properties.subject {
        document.subject = Some(subject);
    }
    if !properties.creators.is_empty() {
        let entry = document
            .bibliographic_entry
            .get_or_insert_with(BibliographicEntry::default);
        entry.author = properties
            .creators
            .into_iter()
            .map(|name| Contributor::named(name))
            .collect();
    }
    Ok(document)
}

fn read_archive_file<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut file = archive.by_name(name)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(decode_text(&bytes, None).to_string())
}

#[derive(Default)]
struct CoreProperties {
    title: Option<String>,
    subject: Option<String>,
    creators: Vec<String>,
}

/// Pull Dublin Core fields out of `docProps/core.xml`.
fn parse_core_xml(xml: &str) -> CoreProperties {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut properties = CoreProperties::default();
    let mut current: Option<&'static str> = None;
    let mut buffer = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                current = match start.name().as_ref().rsplit(|&b| b == b':').next() {
                    Some(b"title") => Some("title"),
                    Some(b"subject") => Some("subject"),
                    Some(b"creator") => Some("creator"),
                    _ => None,
                };
                buffer.clear();
            }
            Ok(Event::Text(text)) => {
                if current.is_some() {
                    buffer.push_str(&String::from_utf8_lossy(text.as_ref()));
                }
            }
            Ok(Event::GeneralRef(entity)) => {
                if current.is_some() {
                    let name = String::from_utf8_lossy(entity.as_ref()).to_string();
                    buffer.push_str(&resolve_entity(&name).unwrap_or(format!("&{name};")));
                }
            }
            Ok(Event::End(_)) => {
                match current.take() {
                    Some("title") => properties.title = Some(buffer.clone()),
                    Some("subject") => properties.subject = Some(buffer.clone()),
                    Some("creator") => properties.creators.push(buffer.clone()),
                    _ => {}
                }
                buffer.clear();
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    properties
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_core_xml() {
        let xml = r#"<?xml version="1.0"?>
<cp:coreProperties xmlns:cp="x" xmlns:dc="y">
  <dc:title>A Title &amp; More</dc:title>
  <dc:subject>Physics</dc:subject>
  <dc:creator>Ada Lovelace</dc:creator>
</cp:coreProperties>"#;
        let properties = parse_core_xml(xml);
        assert_eq!(properties.title.as_deref(), Some("A Title & More"));
        assert_eq!(properties.subject.as_deref(), Some("Physics"));
        assert_eq!(properties.creators, vec!["Ada Lovelace".to_string()]);
    }
}
