//! DOCX package assembly.
//!
//! A .docx file is a zip archive of OOXML parts. This writer emits the
//! minimal conformant package: content types, package relationships, the
//! main `word/document.xml`, style and numbering definitions, and Dublin
//! Core metadata in `docProps/core.xml`.

use std::io::{Seek, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::document::Document;
use crate::error::Result;
use crate::render::{RenderOptions, Renderer};
use crate::util::escape_xml;

use super::DocxRenderer;

/// Main WordprocessingML namespace.
pub(super) const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

pub(super) const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
  <Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>
</Relationships>"#;

/// Bullet (numId 1) and decimal (numId 2) list definitions.
const NUMBERING_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:abstractNum w:abstractNumId="0">
    <w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/><w:lvlText w:val="&#8226;"/></w:lvl>
  </w:abstractNum>
  <w:abstractNum w:abstractNumId="1">
    <w:lvl w:ilvl="0"><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/></w:lvl>
  </w:abstractNum>
  <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
  <w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>
</w:numbering>"#;

/// Write the full package to any `Write + Seek` destination.
pub(super) fn write_package<W: Write + Seek>(
    renderer: &DocxRenderer,
    document: &Document,
    options: &RenderOptions,
    writer: W,
) -> Result<()> {
    let mut zip = ZipWriter::new(writer);
    let deflate = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", deflate)?;
    zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

    zip.start_file("_rels/.rels", deflate)?;
    zip.write_all(ROOT_RELS_XML.as_bytes())?;

    zip.start_file("docProps/core.xml", deflate)?;
    zip.write_all(generate_core_xml(document).as_bytes())?;

    zip.start_file("word/_rels/document.xml.rels", deflate)?;
    zip.write_all(DOCUMENT_RELS_XML.as_bytes())?;

    zip.start_file("word/styles.xml", deflate)?;
    zip.write_all(generate_styles_xml().as_bytes())?;

    zip.start_file("word/numbering.xml", deflate)?;
    zip.write_all(NUMBERING_XML.as_bytes())?;

    zip.start_file("word/document.xml", deflate)?;
    zip.write_all(generate_document_xml(renderer, document, options).as_bytes())?;

    zip.finish()?;
    Ok(())
}

pub(super) fn generate_document_xml(
    renderer: &DocxRenderer,
    document: &Document,
    options: &RenderOptions,
) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.push_str(&format!("<w:document xmlns:w=\"{NS_W}\">\n<w:body>\n"));
    xml.push_str(&renderer.render_contents(document.contents(), options, 0));
    xml.push_str("</w:body>\n</w:document>\n");
    xml
}

fn generate_core_xml(document: &Document) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
    );
    xml.push_str(&format!(
        "  <dc:title>{}</dc:title>\n",
        escape_xml(document.title())
    ));
    if let Some(subject) = &document.subject {
        xml.push_str(&format!(
            "  <dc:subject>{}</dc:subject>\n",
            escape_xml(subject)
        ));
    }
    if let Some(entry) = &document.bibliographic_entry {
        for author in &entry.author {
            xml.push_str(&format!(
                "  <dc:creator>{}</dc:creator>\n",
                escape_xml(&author.display_name())
            ));
        }
    }
    xml.push_str("</cp:coreProperties>");
    xml
}

fn generate_styles_xml() -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.push_str(&format!("<w:styles xmlns:w=\"{NS_W}\">\n"));

    for level in 1..=6u8 {
        // Heading sizes step down from 32 half-points
        let size = 34 - 2 * u32::from(level);
        xml.push_str(&format!(
            "  <w:style w:type=\"paragraph\" w:styleId=\"Heading{level}\">\
             <w:name w:val=\"heading {level}\"/>\
             <w:pPr><w:outlineLvl w:val=\"{}\"/></w:pPr>\
             <w:rPr><w:b/><w:sz w:val=\"{size}\"/></w:rPr></w:style>\n",
            level - 1
        ));
    }

    let paragraph_styles: &[(&str, &str, &str)] = &[
        ("Quote", "Quote", "<w:rPr><w:i/></w:rPr>"),
        ("QuoteAttribution", "Quote Attribution", "<w:rPr><w:i/></w:rPr>"),
        (
            "CodeBlock",
            "Code Block",
            "<w:rPr><w:rFonts w:ascii=\"Consolas\" w:hAnsi=\"Consolas\"/></w:rPr>",
        ),
        ("MathBlock", "Math Block", ""),
        ("Caption", "Caption", "<w:rPr><w:i/><w:sz w:val=\"18\"/></w:rPr>"),
        ("Figure", "Figure", ""),
        ("UnsupportedBlock", "Unsupported Block", ""),
        ("ListParagraph", "List Paragraph", ""),
    ];
    for (id, name, props) in paragraph_styles {
        xml.push_str(&format!(
            "  <w:style w:type=\"paragraph\" w:styleId=\"{id}\"><w:name w:val=\"{name}\"/>{props}</w:style>\n"
        ));
    }

    let character_styles: &[(&str, &str, &str)] = &[
        (
            "InlineCode",
            "Inline Code",
            "<w:rPr><w:rFonts w:ascii=\"Consolas\" w:hAnsi=\"Consolas\"/></w:rPr>",
        ),
        ("Citation", "Citation", ""),
        ("MathInline", "Math Inline", ""),
        ("Hyperlink", "Hyperlink", "<w:rPr><w:u w:val=\"single\"/></w:rPr>"),
    ];
    for (id, name, props) in character_styles {
        xml.push_str(&format!(
            "  <w:style w:type=\"character\" w:styleId=\"{id}\"><w:name w:val=\"{name}\"/>{props}</w:style>\n"
        ));
    }

    xml.push_str("</w:styles>");
    xml
}
