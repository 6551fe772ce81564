//! Document → Markdown rendering.
//!
//! Pure string assembly; dispatch comes from the [`Renderer`] contract.
//! Conventions follow Pandoc's Markdown writer where CommonMark is silent:
//! dynamic code-fence length, `Table:` captions, `[@key]` citations.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::document::{BlockContent, ContentBlock, Run, StructuralContainer};
use crate::render::{Format, Renderer, RendererCore};

use super::MarkdownRenderer;
use super::escape::{escape_markdown, fence_length, inline_code_ticks};

/// Characters percent-encoded inside link targets.
const TARGET_SET: &AsciiSet = &CONTROLS.add(b' ').add(b'<').add(b'>').add(b'(').add(b')');

fn heading_line(level: usize, text: &str) -> String {
    let level = level.clamp(1, 6);
    let mut out = "#".repeat(level);
    out.push(' ');
    out.push_str(text);
    out.push_str("\n\n");
    out
}

/// Heading level for a container title at the given depth; level 1 is
/// reserved for the document title.
pub(super) fn container_level(depth: usize) -> usize {
    (depth + 2).min(6)
}

impl Renderer for MarkdownRenderer {
    fn format(&self) -> Format {
        Format::Markdown
    }

    fn core(&self) -> &RendererCore {
        &self.core
    }

    fn escape_text(&self, text: &str) -> String {
        escape_markdown(text)
    }

    fn render_run(&self, run: &Run) -> String {
        match run {
            Run::Text { text } => escape_markdown(text),
            Run::Emphasis { text } => format!("*{}*", escape_markdown(text)),
            Run::Strong { text } => format!("**{}**", escape_markdown(text)),
            Run::Code { text } => {
                let ticks = "`".repeat(inline_code_ticks(text));
                let spacer = if text.starts_with('`') || text.ends_with('`') {
                    " "
                } else {
                    ""
                };
                format!("{ticks}{spacer}{text}{spacer}{ticks}")
            }
            Run::Reference { text, target } => {
                if target.is_empty() {
                    escape_markdown(text)
                } else {
                    format!(
                        "[{}]({})",
                        escape_markdown(text),
                        utf8_percent_encode(target, TARGET_SET)
                    )
                }
            }
            Run::Citation { ref_id } => format!("[@{ref_id}]"),
            Run::MathInline { math } => format!("${math}$"),
            Run::Unknown(value) => value
                .get("text")
                .and_then(serde_json::Value::as_str)
                .map(escape_markdown)
                .unwrap_or_default(),
        }
    }

    fn render_block_body(&self, block: &ContentBlock, depth: usize) -> String {
        match &block.content {
            BlockContent::Paragraph { text } => {
                format!("{}\n\n", self.render_semantic_text(text))
            }
            BlockContent::Heading { level, text } => {
                let level = level.map(usize::from).unwrap_or(container_level(depth));
                heading_line(level, &self.render_semantic_text(text))
            }
            BlockContent::List { ordered, items } => {
                let mut out = String::new();
                for (index, item) in items.iter().enumerate() {
                    if *ordered {
                        out.push_str(&format!("{}. ", index + 1));
                    } else {
                        out.push_str("- ");
                    }
                    out.push_str(&self.render_semantic_text(item));
                    out.push('\n');
                }
                out.push('\n');
                out
            }
            BlockContent::Blockquote { text, attribution } => {
                let mut out = String::new();
                for line in self.render_semantic_text(text).lines() {
                    out.push_str("> ");
                    out.push_str(line);
                    out.push('\n');
                }
                if let Some(attribution) = attribution {
                    out.push_str("> -- ");
                    out.push_str(&self.render_semantic_text(attribution));
                    out.push('\n');
                }
                out.push('\n');
                out
            }
            BlockContent::CodeBlock { code, language } => {
                let fence = "`".repeat(fence_length(code, '`'));
                let mut out = fence.clone();
                out.push_str(language.as_deref().unwrap_or(""));
                out.push('\n');
                for line in code.lines() {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str(&fence);
                out.push_str("\n\n");
                out
            }
            BlockContent::MathBlock { math, .. } => {
                format!("$$\n{math}\n$$\n\n")
            }
            BlockContent::Table {
                caption,
                headers,
                rows,
            } => {
                let mut out = String::new();
                let columns = headers.len().max(
                    rows.iter().map(Vec::len).max().unwrap_or(0),
                );
                if columns == 0 {
                    return out;
                }
                let cell = |text: &crate::document::SemanticText| self.render_semantic_text(text);

                let header_cells: Vec<String> = (0..columns)
                    .map(|i| headers.get(i).map(&cell).unwrap_or_default())
                    .collect();
                out.push_str(&format!("| {} |\n", header_cells.join(" | ")));
                out.push_str(&format!("|{}\n", " --- |".repeat(columns)));
                for row in rows {
                    let row_cells: Vec<String> = (0..columns)
                        .map(|i| row.get(i).map(&cell).unwrap_or_default())
                        .collect();
                    out.push_str(&format!("| {} |\n", row_cells.join(" | ")));
                }
                if let Some(caption) = caption {
                    out.push_str("Table: ");
                    out.push_str(&self.render_semantic_text(caption));
                    out.push('\n');
                }
                out.push('\n');
                out
            }
            BlockContent::Figure { src, alt, caption } => {
                let alt = alt.as_deref().map(escape_markdown).unwrap_or_default();
                let mut out = format!("![{alt}]({}", utf8_percent_encode(src, TARGET_SET));
                if let Some(caption) = caption {
                    out.push_str(&format!(
                        " \"{}\"",
                        caption.display_text().replace('"', "\\\"")
                    ));
                }
                out.push_str(")\n\n");
                out
            }
            BlockContent::Unknown(value) => match BlockContent::fallback_text(value) {
                Some(text) => format!("{}\n\n", self.render_semantic_text(&text)),
                None => format!("<!-- unsupported block: {} -->\n\n", block.local_name()),
            },
        }
    }

    fn container_prefix(&self, container: &StructuralContainer, depth: usize) -> String {
        match &container.title {
            Some(title) if !title.is_empty() => heading_line(
                container_level(depth),
                &self.render_semantic_text(title),
            ),
            _ => String::new(),
        }
    }

    fn container_suffix(&self, _container: &StructuralContainer, _depth: usize) -> String {
        String::new()
    }
}
