//! HTML renderer: canonical document ↔ structural HTML subset.

mod escape;
mod parser;
mod render;

pub use escape::{escape_attr, escape_html};

use crate::document::Document;
use crate::error::Result;
use crate::render::{
    BidirectionalRenderer, ErrorHandler, FormatValidationResult, ParseOptions, RenderOptions,
    Renderer, RendererCore,
};
use crate::util::{decode_text, strip_bom};

/// Bidirectional HTML renderer.
///
/// Output is a structural/accessibility subset: semantic sectioning with
/// explicit container discriminants, headings by depth, and class-marked
/// spans for math and unsupported blocks. Every element is closed so the
/// output parses as well-formed markup.
#[derive(Debug, Default)]
pub struct HtmlRenderer {
    pub(crate) core: RendererCore,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_handler(handler: ErrorHandler) -> Self {
        Self {
            core: RendererCore::with_error_handler(handler),
        }
    }
}

impl BidirectionalRenderer for HtmlRenderer {
    fn write_document(&self, document: &Document, options: &RenderOptions) -> Result<String> {
        let title = self.escape_text(document.title());
        let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\"/>\n");
        out.push_str(&format!("<title>{title}</title>\n"));
        if let Some(subject) = &document.subject {
            out.push_str(&format!(
                "<meta name=\"subject\" content=\"{}\"/>\n",
                escape::escape_attr(subject)
            ));
        }
        if let Some(entry) = &document.bibliographic_entry {
            for author in &entry.author {
                out.push_str(&format!(
                    "<meta name=\"author\" content=\"{}\"/>\n",
                    escape::escape_attr(&author.display_name())
                ));
            }
        }
        out.push_str("</head>\n<body>\n");
        if !document.title().is_empty() {
            out.push_str(&format!("<h1>{title}</h1>\n"));
        }
        out.push_str(&self.render_contents(document.contents(), options, 0));
        out.push_str("</body>\n</html>\n");
        Ok(out)
    }

    fn parse_document(&self, input: &[u8], _options: &ParseOptions) -> Result<Document> {
        let text = decode_text(strip_bom(input), None);
        parser::parse_html(&text)
    }

    fn validate(&self, input: &[u8]) -> FormatValidationResult {
        let text = decode_text(strip_bom(input), None);
        if text.trim().is_empty() {
            return FormatValidationResult::invalid("empty input");
        }
        match parser::build_tree(&text) {
            Ok(_) => FormatValidationResult::ok(),
            Err(error) => FormatValidationResult::invalid(format!("markup is not well-formed: {error}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ContentBlock, ContentNode};

    #[test]
    fn test_render_emits_head_and_body() {
        let document = Document::new("Title & Co").with_contents(vec![ContentNode::Block(
            ContentBlock::paragraph("Body text."),
        )]);
        let renderer = HtmlRenderer::new();
        let result = renderer.render(&document, &RenderOptions::default()).unwrap();
        assert!(result.content.contains("<title>Title &amp; Co</title>"));
        assert!(result.content.contains("<p>Body text.</p>"));
        assert!(result.content.ends_with("</html>\n"));
    }

    #[test]
    fn test_validate_balanced_markup() {
        let renderer = HtmlRenderer::new();
        assert!(renderer.validate(b"<p>fine</p>").valid);
        assert!(!renderer.validate(b"<p>broken").valid);
    }
}
