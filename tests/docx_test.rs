//! DOCX package structure and file round-trip tests.

mod common;

use std::io::Cursor;

use tempfile::TempDir;
use zip::ZipArchive;

use weft::{
    BidirectionalRenderer, DocxRenderer, ParseOptions, RenderOptions, read_docx, write_docx,
};

fn rendered_package_bytes() -> Vec<u8> {
    use base64::Engine;
    let renderer = DocxRenderer::new();
    let result = renderer
        .render(&common::rich_document(), &RenderOptions::default())
        .unwrap();
    base64::engine::general_purpose::STANDARD
        .decode(result.content.as_bytes())
        .unwrap()
}

#[test]
fn test_package_contains_required_parts() {
    let bytes = rendered_package_bytes();
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

    for part in [
        "[Content_Types].xml",
        "_rels/.rels",
        "word/document.xml",
        "word/styles.xml",
        "word/numbering.xml",
        "word/_rels/document.xml.rels",
        "docProps/core.xml",
    ] {
        assert!(archive.by_name(part).is_ok(), "package is missing {part}");
    }
}

#[test]
fn test_document_xml_uses_heading_and_quote_styles() {
    use std::io::Read;
    let bytes = rendered_package_bytes();
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut document_xml)
        .unwrap();

    assert!(document_xml.contains("w:pStyle w:val=\"Heading1\""));
    assert!(document_xml.contains("w:pStyle w:val=\"Heading3\""));
    assert!(document_xml.contains("w:pStyle w:val=\"Quote\""));
    assert!(document_xml.contains("w:pStyle w:val=\"CodeBlock\""));
    assert!(document_xml.contains("<w:tblHeader/>"));
    assert!(document_xml.contains("w:numId w:val=\"2\""));
}

#[test]
fn test_write_and_read_docx_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixture.docx");

    let document = common::rich_document();
    write_docx(&document, &path).unwrap();

    let read_back = read_docx(&path).unwrap();
    assert_eq!(read_back.title(), "The Complete Fixture");
    assert_eq!(read_back.subject.as_deref(), Some("Testing"));
    assert!(!read_back.contents().is_empty());
}

#[test]
fn test_write_docx_rejects_invalid_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("never-written.docx");

    let mut document = common::rich_document();
    document.body_matter = None;
    assert!(write_docx(&document, &path).is_err());
}

#[test]
fn test_zero_byte_and_garbage_buffers_recover() {
    let renderer = DocxRenderer::new();

    for garbage in [&b""[..], &b"PK\x03\x04 but truncated"[..], &b"@@not-base64@@"[..]] {
        let parsed = renderer.parse(garbage, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.document.bibliographic_entry.unwrap().title, "Untitled Document");
        assert!(!parsed.errors.is_empty());
    }
}

#[test]
fn test_validate_accepts_own_output() {
    let renderer = DocxRenderer::new();
    let bytes = rendered_package_bytes();
    assert!(renderer.validate(&bytes).valid);

    let result = renderer
        .render(&common::rich_document(), &RenderOptions::default())
        .unwrap();
    // Base64 text form validates too
    assert!(renderer.validate(result.content.as_bytes()).valid);
}

#[test]
fn test_metadata_reports_package_entries() {
    let renderer = DocxRenderer::new();
    let bytes = rendered_package_bytes();
    let metadata = renderer.metadata(&bytes);
    assert_eq!(metadata.attributes.get("packageEntries").unwrap(), "7");
}
