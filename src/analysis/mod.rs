//! Shared document analysis: word counting and plain-text extraction.

mod words;

pub use words::{count_block_words, count_document_words, count_text_words};

use crate::document::{BlockContent, ContentNode, Document};

/// Count the content blocks in the body tree.
pub fn count_blocks(document: &Document) -> usize {
    fn walk(nodes: &[ContentNode]) -> usize {
        nodes
            .iter()
            .map(|node| match node {
                ContentNode::Block(_) => 1,
                ContentNode::Container(container) => walk(&container.contents),
            })
            .sum()
    }
    walk(document.contents())
}

/// Extract the body's display text, one line per title or block, in reading
/// order. This feeds content-fidelity comparison; it is not a renderer.
pub fn extract_plain_text(document: &Document) -> String {
    let mut lines = Vec::new();
    collect_text(document.contents(), &mut lines);
    lines.join("\n")
}

fn collect_text(nodes: &[ContentNode], lines: &mut Vec<String>) {
    for node in nodes {
        match node {
            ContentNode::Container(container) => {
                if let Some(title) = &container.title {
                    let text = title.display_text();
                    if !text.is_empty() {
                        lines.push(text);
                    }
                }
                collect_text(&container.contents, lines);
            }
            ContentNode::Block(block) => {
                let text = block_display_text(&block.content);
                if !text.is_empty() {
                    lines.push(text);
                }
            }
        }
    }
}

/// Display text of one block payload, tolerant of every variant.
pub fn block_display_text(content: &BlockContent) -> String {
    match content {
        BlockContent::Paragraph { text } | BlockContent::Heading { text, .. } => {
            text.display_text()
        }
        BlockContent::List { items, .. } => items
            .iter()
            .map(|item| item.display_text())
            .collect::<Vec<_>>()
            .join("\n"),
        BlockContent::Blockquote { text, attribution } => {
            let mut out = text.display_text();
            if let Some(attribution) = attribution {
                out.push('\n');
                out.push_str(&attribution.display_text());
            }
            out
        }
        BlockContent::CodeBlock { code, .. } => code.clone(),
        BlockContent::MathBlock { math, .. } => math.clone(),
        BlockContent::Table {
            caption,
            headers,
            rows,
        } => {
            let mut parts: Vec<String> = Vec::new();
            if let Some(caption) = caption {
                parts.push(caption.display_text());
            }
            parts.extend(headers.iter().map(|cell| cell.display_text()));
            for row in rows {
                parts.extend(row.iter().map(|cell| cell.display_text()));
            }
            parts.join("\n")
        }
        BlockContent::Figure { alt, caption, .. } => {
            let mut parts: Vec<String> = Vec::new();
            if let Some(alt) = alt {
                parts.push(alt.clone());
            }
            if let Some(caption) = caption {
                parts.push(caption.display_text());
            }
            parts.join("\n")
        }
        BlockContent::Unknown(value) => BlockContent::fallback_text(value)
            .map(|text| text.display_text())
            .unwrap_or_default(),
    }
}
