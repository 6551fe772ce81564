//! Word/OOXML (.docx) renderer, the high-fidelity reference implementation.
//!
//! A .docx is a zip package of XML parts. Rendering maps containers to
//! `Heading{n}` paragraph styles, blocks to dedicated paragraph styles, and
//! inline runs to run properties, so the parser can invert every mapping.
//! Because [`RenderResult`](crate::render::RenderResult) carries a `String`,
//! the rendered package is base64-encoded; `parse` accepts both raw zip
//! bytes (`PK…`) and base64 text. Byte-level I/O is available through
//! [`write_docx`]/[`read_docx`] and their `_writer`/`_reader` variants.

mod parser;
mod reader;
mod writer;

pub use reader::{read_docx, read_docx_from_reader};

use std::io::{Cursor, Seek, Write};
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::Reader as XmlReader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::document::{BlockContent, ContentBlock, Document, Run, StructuralContainer};
use crate::document::validate_document;
use crate::error::{Error, Result};
use crate::render::{
    BidirectionalRenderer, DocumentMetadata, ErrorHandler, Format, FormatValidationResult,
    ParseOptions, RenderOptions, Renderer, RendererCore,
};
use crate::util::escape_xml;

/// Write a canonical [`Document`] to a .docx file on disk.
pub fn write_docx<P: AsRef<Path>>(document: &Document, path: P) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_docx_to_writer(document, file)
}

/// Write a .docx package to any `Write + Seek` destination.
pub fn write_docx_to_writer<W: Write + Seek>(document: &Document, destination: W) -> Result<()> {
    validate_document(document)?;
    let renderer = DocxRenderer::new();
    writer::write_package(&renderer, document, &RenderOptions::default(), destination)
}

/// Bidirectional Word/OOXML renderer.
#[derive(Debug, Default)]
pub struct DocxRenderer {
    core: RendererCore,
}

impl DocxRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_handler(handler: ErrorHandler) -> Self {
        Self {
            core: RendererCore::with_error_handler(handler),
        }
    }
}

fn text_run(props: &str, text: &str) -> String {
    format!(
        "<w:r>{props}<w:t xml:space=\"preserve\">{}</w:t></w:r>",
        escape_xml(text)
    )
}

fn styled_paragraph(style: Option<&str>, extra_ppr: &str, runs: &str) -> String {
    let ppr = match style {
        Some(style) => format!("<w:pPr><w:pStyle w:val=\"{style}\"/>{extra_ppr}</w:pPr>"),
        None if !extra_ppr.is_empty() => format!("<w:pPr>{extra_ppr}</w:pPr>"),
        None => String::new(),
    };
    format!("<w:p>{ppr}{runs}</w:p>\n")
}

/// Heading style level for a container at the given depth.
fn heading_style_level(depth: usize) -> usize {
    (depth + 1).min(6)
}

impl Renderer for DocxRenderer {
    fn format(&self) -> Format {
        Format::Docx
    }

    fn core(&self) -> &RendererCore {
        &self.core
    }

    fn escape_text(&self, text: &str) -> String {
        escape_xml(text)
    }

    fn render_run(&self, run: &Run) -> String {
        match run {
            Run::Text { text } => text_run("", text),
            Run::Emphasis { text } => text_run("<w:rPr><w:i/></w:rPr>", text),
            Run::Strong { text } => text_run("<w:rPr><w:b/></w:rPr>", text),
            Run::Code { text } => {
                text_run("<w:rPr><w:rStyle w:val=\"InlineCode\"/></w:rPr>", text)
            }
            Run::Reference { text, target } => format!(
                "<w:hyperlink w:anchor=\"{}\">{}</w:hyperlink>",
                escape_xml(target),
                text_run("<w:rPr><w:rStyle w:val=\"Hyperlink\"/></w:rPr>", text)
            ),
            Run::Citation { ref_id } => {
                text_run("<w:rPr><w:rStyle w:val=\"Citation\"/></w:rPr>", ref_id)
            }
            Run::MathInline { math } => {
                text_run("<w:rPr><w:rStyle w:val=\"MathInline\"/></w:rPr>", math)
            }
            Run::Unknown(value) => value
                .get("text")
                .and_then(serde_json::Value::as_str)
                .map(|text| text_run("", text))
                .unwrap_or_default(),
        }
    }

    fn render_block_body(&self, block: &ContentBlock, depth: usize) -> String {
        match &block.content {
            BlockContent::Paragraph { text } => {
                styled_paragraph(None, "", &self.render_semantic_text(text))
            }
            BlockContent::Heading { level, text } => {
                let level = level
                    .map(|l| usize::from(l).clamp(1, 6))
                    .unwrap_or_else(|| heading_style_level(depth));
                styled_paragraph(
                    Some(&format!("Heading{level}")),
                    "",
                    &self.render_semantic_text(text),
                )
            }
            BlockContent::List { ordered, items } => {
                let num_id = if *ordered { 2 } else { 1 };
                let num_pr = format!(
                    "<w:numPr><w:ilvl w:val=\"0\"/><w:numId w:val=\"{num_id}\"/></w:numPr>"
                );
                items
                    .iter()
                    .map(|item| {
                        styled_paragraph(
                            Some("ListParagraph"),
                            &num_pr,
                            &self.render_semantic_text(item),
                        )
                    })
                    .collect()
            }
            BlockContent::Blockquote { text, attribution } => {
                let mut out =
                    styled_paragraph(Some("Quote"), "", &self.render_semantic_text(text));
                if let Some(attribution) = attribution {
                    out.push_str(&styled_paragraph(
                        Some("QuoteAttribution"),
                        "",
                        &self.render_semantic_text(attribution),
                    ));
                }
                out
            }
            BlockContent::CodeBlock { code, .. } => {
                let lines: Vec<String> = code
                    .lines()
                    .map(|line| {
                        format!("<w:t xml:space=\"preserve\">{}</w:t>", escape_xml(line))
                    })
                    .collect();
                let run = format!("<w:r>{}</w:r>", lines.join("<w:br/>"));
                styled_paragraph(Some("CodeBlock"), "", &run)
            }
            BlockContent::MathBlock { math, .. } => {
                styled_paragraph(Some("MathBlock"), "", &text_run("", math))
            }
            BlockContent::Table {
                caption,
                headers,
                rows,
            } => {
                let mut out = String::from(
                    "<w:tbl><w:tblPr><w:tblStyle w:val=\"TableGrid\"/></w:tblPr>\n",
                );
                let cell = |text: &crate::document::SemanticText| {
                    format!(
                        "<w:tc><w:p>{}</w:p></w:tc>",
                        self.render_semantic_text(text)
                    )
                };
                if !headers.is_empty() {
                    out.push_str("<w:tr><w:trPr><w:tblHeader/></w:trPr>");
                    for header in headers {
                        out.push_str(&cell(header));
                    }
                    out.push_str("</w:tr>\n");
                }
                for row in rows {
                    out.push_str("<w:tr>");
                    for value in row {
                        out.push_str(&cell(value));
                    }
                    out.push_str("</w:tr>\n");
                }
                out.push_str("</w:tbl>\n");
                if let Some(caption) = caption {
                    out.push_str(&styled_paragraph(
                        Some("Caption"),
                        "",
                        &self.render_semantic_text(caption),
                    ));
                }
                out
            }
            BlockContent::Figure { src, alt, caption } => {
                let alt_text = alt.as_deref().unwrap_or("figure");
                let body = if src.is_empty() {
                    text_run("", alt_text)
                } else {
                    format!(
                        "<w:hyperlink w:anchor=\"{}\">{}</w:hyperlink>",
                        escape_xml(src),
                        text_run("<w:rPr><w:rStyle w:val=\"Hyperlink\"/></w:rPr>", alt_text)
                    )
                };
                let mut out = styled_paragraph(Some("Figure"), "", &body);
                if let Some(caption) = caption {
                    out.push_str(&styled_paragraph(
                        Some("Caption"),
                        "",
                        &self.render_semantic_text(caption),
                    ));
                }
                out
            }
            BlockContent::Unknown(value) => {
                let text = BlockContent::fallback_text(value)
                    .map(|text| text.display_text())
                    .unwrap_or_else(|| format!("[unsupported block: {}]", block.local_name()));
                styled_paragraph(Some("UnsupportedBlock"), "", &text_run("", &text))
            }
        }
    }

    fn container_prefix(&self, container: &StructuralContainer, depth: usize) -> String {
        match &container.title {
            Some(title) if !title.is_empty() => styled_paragraph(
                Some(&format!("Heading{}", heading_style_level(depth))),
                "",
                &self.render_semantic_text(title),
            ),
            _ => String::new(),
        }
    }

    fn container_suffix(&self, _container: &StructuralContainer, _depth: usize) -> String {
        String::new()
    }
}

/// Recover raw package bytes from either raw zip input or base64 text.
fn package_bytes(input: &[u8]) -> Result<Vec<u8>> {
    if input.starts_with(b"PK") {
        return Ok(input.to_vec());
    }
    let text = std::str::from_utf8(input)
        .map_err(|_| Error::Parse("input is neither a zip package nor base64 text".to_string()))?;
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64
        .decode(cleaned.as_bytes())
        .map_err(|error| Error::Parse(format!("input is not a valid base64 package: {error}")))
}

impl BidirectionalRenderer for DocxRenderer {
    fn write_document(&self, document: &Document, options: &RenderOptions) -> Result<String> {
        let mut cursor = Cursor::new(Vec::new());
        writer::write_package(self, document, options, &mut cursor)?;
        Ok(BASE64.encode(cursor.into_inner()))
    }

    fn parse_document(&self, input: &[u8], _options: &ParseOptions) -> Result<Document> {
        let bytes = package_bytes(input)?;
        read_docx_from_reader(Cursor::new(bytes))
    }

    fn validate(&self, input: &[u8]) -> FormatValidationResult {
        let bytes = match package_bytes(input) {
            Ok(bytes) => bytes,
            Err(error) => return FormatValidationResult::invalid(error.to_string()),
        };
        let mut archive = match ZipArchive::new(Cursor::new(bytes)) {
            Ok(archive) => archive,
            Err(error) => {
                return FormatValidationResult::invalid(format!("not a zip package: {error}"));
            }
        };
        if archive.by_name("[Content_Types].xml").is_err() {
            return FormatValidationResult::invalid("package is missing [Content_Types].xml");
        }
        let document_xml = {
            let Ok(mut file) = archive.by_name("word/document.xml") else {
                return FormatValidationResult::invalid("package is missing word/document.xml");
            };
            let mut content = String::new();
            if std::io::Read::read_to_string(&mut file, &mut content).is_err() {
                return FormatValidationResult::invalid("word/document.xml is not readable text");
            }
            content
        };
        let mut reader = XmlReader::from_str(&document_xml);
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => return FormatValidationResult::ok(),
                Ok(_) => {}
                Err(error) => {
                    return FormatValidationResult::invalid(format!(
                        "word/document.xml is not well-formed: {error}"
                    ));
                }
            }
        }
    }

    fn metadata(&self, input: &[u8]) -> DocumentMetadata {
        let mut metadata = DocumentMetadata::probe(self.format(), input);
        if let Ok(bytes) = package_bytes(input)
            && let Ok(archive) = ZipArchive::new(Cursor::new(bytes))
        {
            metadata
                .attributes
                .insert("packageEntries".to_string(), archive.len().to_string());
        }
        metadata
    }
}
