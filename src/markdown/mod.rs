//! Markdown renderer: canonical document ↔ CommonMark-compatible subset.
//!
//! - [`escape`]: pure escaping utilities
//! - [`render`]: document → Markdown (via the [`Renderer`] dispatch)
//! - [`parser`]: Markdown → document (heading-outline reconstruction)
//!
//! [`Renderer`]: crate::render::Renderer

mod escape;
mod parser;
mod render;

pub use escape::{escape_markdown, fence_length, inline_code_ticks, unescape_markdown};

use crate::document::Document;
use crate::error::Result;
use crate::render::{
    BidirectionalRenderer, ErrorHandler, FormatValidationResult, ParseOptions, RenderOptions,
    Renderer, RendererCore,
};
use crate::util::{decode_text, strip_bom};

/// Bidirectional Markdown renderer.
#[derive(Debug, Default)]
pub struct MarkdownRenderer {
    pub(crate) core: RendererCore,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_handler(handler: ErrorHandler) -> Self {
        Self {
            core: RendererCore::with_error_handler(handler),
        }
    }
}

impl BidirectionalRenderer for MarkdownRenderer {
    fn write_document(&self, document: &Document, options: &RenderOptions) -> Result<String> {
        let mut out = String::new();
        let title = document.title();
        if !title.is_empty() {
            out.push_str("# ");
            out.push_str(&self.escape_text(title));
            out.push_str("\n\n");
        }
        out.push_str(&self.render_contents(document.contents(), options, 0));
        let mut content = out.trim_end().to_string();
        content.push('\n');
        Ok(content)
    }

    fn parse_document(&self, input: &[u8], _options: &ParseOptions) -> Result<Document> {
        let text = decode_text(strip_bom(input), None);
        parser::parse_markdown(&text)
    }

    fn validate(&self, input: &[u8]) -> FormatValidationResult {
        match std::str::from_utf8(strip_bom(input)) {
            Ok(_) => FormatValidationResult::ok(),
            Err(error) => {
                FormatValidationResult::invalid(format!("input is not valid UTF-8 text: {error}"))
            }
        }
    }
}
