//! # weft
//!
//! Bidirectional rendering between a canonical structured document model and
//! HTML, Markdown, plain text, and Word/OOXML (.docx).
//!
//! ## Features
//!
//! - One [`Document`] model: containers (units/chapters/sections) holding
//!   typed content blocks and rich inline [`SemanticText`]
//! - Render to and parse from four formats through one
//!   [`BidirectionalRenderer`] contract
//! - Round-trip fidelity scoring (content/structure/formatting) instead of
//!   pretending byte-exact equality is achievable
//! - Forward-compatible handling of unknown block types (opaque passthrough,
//!   never a panic)
//! - A [`PluginRegistry`] for attaching format-scoped renderer extensions at
//!   runtime
//!
//! ## Quick Start
//!
//! ```
//! use weft::{Document, MarkdownRenderer, BidirectionalRenderer, RenderOptions, ParseOptions};
//!
//! let document = Document::new("My Book").with_subject("Examples");
//! let renderer = MarkdownRenderer::new();
//!
//! let rendered = renderer.render(&document, &RenderOptions::default()).unwrap();
//! assert!(rendered.content.contains("# My Book"));
//!
//! let parsed = renderer.parse(rendered.content.as_bytes(), &ParseOptions::default()).unwrap();
//! assert_eq!(parsed.document.title(), "My Book");
//! ```
//!
//! ## Round-trip testing
//!
//! ```
//! use weft::{Document, MarkdownRenderer, BidirectionalRenderer, RoundTripOptions};
//!
//! let document = Document::new("My Book");
//! let renderer = MarkdownRenderer::new();
//! let result = renderer.test_round_trip(&document, &RoundTripOptions::default()).unwrap();
//! assert!(result.success);
//! ```

pub mod analysis;
pub mod document;
pub mod docx;
pub mod error;
pub mod fidelity;
pub mod html;
pub mod markdown;
pub mod plugin;
pub mod render;
pub mod text;
pub(crate) mod util;

pub use document::{
    BackMatter, BibliographicEntry, BlockContent, BodyMatter, ContainerKind, ContentBlock,
    ContentNode, Contributor, Document, FrontMatter, GlossaryEntry, IndexEntry, Run, SemanticText,
    StructuralContainer, UNTITLED, validate_document, vocab,
};
pub use docx::{DocxRenderer, read_docx, read_docx_from_reader, write_docx, write_docx_to_writer};
pub use error::{Error, Result};
pub use fidelity::{FidelityTester, FidelityWeights, RoundTripResult};
pub use html::HtmlRenderer;
pub use markdown::MarkdownRenderer;
pub use plugin::{
    DiscoveryReport, PluginInfo, PluginRegistry, PluginSource, RegistryStatistics, RendererPlugin,
};
pub use render::{
    BidirectionalRenderer, DocumentMetadata, ErrorHandler, Format, FormatValidationResult, Issue,
    IssueKind, ParseOptions, ParseResult, RenderMetrics, RenderOptions, RenderResult, Renderer,
    RendererCore, RendererId, RoundTripOptions, Severity,
};
pub use text::TextRenderer;

/// Construct the built-in renderer for a format.
pub fn renderer_for(format: Format) -> Box<dyn BidirectionalRenderer> {
    match format {
        Format::Html => Box::new(HtmlRenderer::new()),
        Format::Markdown => Box::new(MarkdownRenderer::new()),
        Format::Text => Box::new(TextRenderer::new()),
        Format::Docx => Box::new(DocxRenderer::new()),
    }
}
