//! Plain-text renderer.
//!
//! The lossiest target by design: inline formatting flattens to display
//! text, headings become underlined lines (`=` for the document title, `-`
//! and `~` for container depths), quotes indent two spaces, code indents
//! four. The parser inverts those conventions best-effort.

use crate::document::{
    BlockContent, ContainerKind, ContentBlock, ContentNode, Document, Run, SemanticText,
    StructuralContainer, UNTITLED,
};
use crate::error::{Error, Result};
use crate::render::{
    BidirectionalRenderer, ErrorHandler, Format, FormatValidationResult, ParseOptions,
    RenderOptions, Renderer, RendererCore,
};
use crate::util::{decode_text, strip_bom};

/// Bidirectional plain-text renderer.
#[derive(Debug, Default)]
pub struct TextRenderer {
    core: RendererCore,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_handler(handler: ErrorHandler) -> Self {
        Self {
            core: RendererCore::with_error_handler(handler),
        }
    }
}

fn underlined(text: &str, underline: char) -> String {
    let width = text.chars().count().max(1);
    format!("{text}\n{}\n\n", underline.to_string().repeat(width))
}

fn container_underline(depth: usize) -> char {
    if depth == 0 { '-' } else { '~' }
}

impl Renderer for TextRenderer {
    fn format(&self) -> Format {
        Format::Text
    }

    fn core(&self) -> &RendererCore {
        &self.core
    }

    // Plain text has no metacharacters.
    fn escape_text(&self, text: &str) -> String {
        text.to_string()
    }

    fn render_run(&self, run: &Run) -> String {
        match run {
            Run::Text { text }
            | Run::Emphasis { text }
            | Run::Strong { text }
            | Run::Code { text }
            | Run::Reference { text, .. } => text.clone(),
            Run::Citation { ref_id } => format!("[{ref_id}]"),
            Run::MathInline { math } => math.clone(),
            Run::Unknown(value) => value
                .get("text")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }

    fn render_block_body(&self, block: &ContentBlock, _depth: usize) -> String {
        match &block.content {
            BlockContent::Paragraph { text } | BlockContent::Heading { text, .. } => {
                format!("{}\n\n", self.render_semantic_text(text))
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
                    out.push_str("  ");
                    out.push_str(line);
                    out.push('\n');
                }
                if let Some(attribution) = attribution {
                    out.push_str("  -- ");
                    out.push_str(&self.render_semantic_text(attribution));
                    out.push('\n');
                }
                out.push('\n');
                out
            }
            BlockContent::CodeBlock { code, .. } => {
                let mut out = String::new();
                for line in code.lines() {
                    out.push_str("    ");
                    out.push_str(line);
                    out.push('\n');
                }
                out.push('\n');
                out
            }
            BlockContent::MathBlock { math, .. } => format!("{math}\n\n"),
            BlockContent::Table {
                caption,
                headers,
                rows,
            } => {
                let mut out = String::new();
                let cell = |text: &SemanticText| self.render_semantic_text(text);
                if !headers.is_empty() {
                    let header_line = headers.iter().map(&cell).collect::<Vec<_>>().join(" | ");
                    out.push_str(&header_line);
                    out.push('\n');
                    out.push_str(&"-".repeat(header_line.chars().count().max(3)));
                    out.push('\n');
                }
                for row in rows {
                    out.push_str(&row.iter().map(&cell).collect::<Vec<_>>().join(" | "));
                    out.push('\n');
                }
                if let Some(caption) = caption {
                    out.push_str("Table: ");
                    out.push_str(&self.render_semantic_text(caption));
                    out.push('\n');
                }
                out.push('\n');
                out
            }
            BlockContent::Figure { alt, caption, .. } => {
                let mut out = format!("[image: {}]\n", alt.as_deref().unwrap_or("figure"));
                if let Some(caption) = caption {
                    out.push_str(&self.render_semantic_text(caption));
                    out.push('\n');
                }
                out.push('\n');
                out
            }
            BlockContent::Unknown(value) => match BlockContent::fallback_text(value) {
                Some(text) => format!("{}\n\n", text.display_text()),
                None => format!("[unsupported block: {}]\n\n", block.local_name()),
            },
        }
    }

    fn container_prefix(&self, container: &StructuralContainer, depth: usize) -> String {
        match &container.title {
            Some(title) if !title.is_empty() => underlined(
                &self.render_semantic_text(title),
                container_underline(depth),
            ),
            _ => String::new(),
        }
    }

    fn container_suffix(&self, _container: &StructuralContainer, _depth: usize) -> String {
        String::new()
    }
}

impl BidirectionalRenderer for TextRenderer {
    fn write_document(&self, document: &Document, options: &RenderOptions) -> Result<String> {
        let mut out = String::new();
        let title = document.title();
        if !title.is_empty() {
            out.push_str(&underlined(title, '='));
        }
        out.push_str(&self.render_contents(document.contents(), options, 0));
        let mut content = out.trim_end().to_string();
        content.push('\n');
        Ok(content)
    }

    fn parse_document(&self, input: &[u8], _options: &ParseOptions) -> Result<Document> {
        let text = decode_text(strip_bom(input), None);
        parse_text(&text)
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

// ============================================================================
// Parsing
// ============================================================================

fn underline_of(line: &str) -> Option<char> {
    let trimmed = line.trim_end();
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    if matches!(first, '=' | '-' | '~') && chars.all(|c| c == first) {
        Some(first)
    } else {
        None
    }
}

fn parse_text(input: &str) -> Result<Document> {
    if input.trim().is_empty() {
        return Err(Error::Parse("empty text input".to_string()));
    }

    let lines: Vec<&str> = input.lines().collect();
    let mut title: Option<String> = None;
    let mut root: Vec<ContentNode> = Vec::new();
    let mut stack: Vec<(usize, StructuralContainer)> = Vec::new();
    let mut i = 0;

    fn close_to(depth: usize, stack: &mut Vec<(usize, StructuralContainer)>, root: &mut Vec<ContentNode>) {
        while stack.last().is_some_and(|(d, _)| *d >= depth) {
            let (_, container) = stack.pop().expect("stack is non-empty");
            let node = ContentNode::Container(container);
            match stack.last_mut() {
                Some((_, parent)) => parent.contents.push(node),
                None => root.push(node),
            }
        }
    }

    fn push_block(
        block: ContentBlock,
        stack: &mut [(usize, StructuralContainer)],
        root: &mut Vec<ContentNode>,
    ) {
        match stack.last_mut() {
            Some((_, container)) => container.contents.push(ContentNode::Block(block)),
            None => root.push(ContentNode::Block(block)),
        }
    }

    while i < lines.len() {
        let line = lines[i].trim_end();
        if line.trim().is_empty() {
            i += 1;
            continue;
        }

        // Heading: a text line followed by an underline of =, - or ~
        if let Some(next) = lines.get(i + 1)
            && !line.starts_with(' ')
            && !line.contains(" | ")
            && let Some(marker) = underline_of(next)
        {
            match marker {
                '=' if title.is_none() && root.is_empty() && stack.is_empty() => {
                    title = Some(line.to_string());
                }
                '=' | '-' => {
                    close_to(0, &mut stack, &mut root);
                    stack.push((
                        0,
                        StructuralContainer {
                            kind: Some(ContainerKind::Unit),
                            title: Some(SemanticText::plain(line)),
                            ..Default::default()
                        },
                    ));
                }
                _ => {
                    close_to(1, &mut stack, &mut root);
                    stack.push((
                        1,
                        StructuralContainer {
                            kind: Some(ContainerKind::from_depth(1)),
                            title: Some(SemanticText::plain(line)),
                            ..Default::default()
                        },
                    ));
                }
            }
            i += 2;
            continue;
        }

        if line.starts_with("    ") {
            let mut code_lines = Vec::new();
            while i < lines.len()
                && let Some(code) = lines[i].strip_prefix("    ")
            {
                code_lines.push(code.trim_end());
                i += 1;
            }
            push_block(
                ContentBlock::code_block(code_lines.join("\n"), None),
                &mut stack,
                &mut root,
            );
        } else if line.starts_with("  ") {
            let mut quote_lines: Vec<String> = Vec::new();
            while i < lines.len()
                && let Some(quoted) = lines[i].strip_prefix("  ")
                && !lines[i].starts_with("    ")
            {
                quote_lines.push(quoted.trim_end().to_string());
                i += 1;
            }
            let attribution = match quote_lines.last().and_then(|l| l.strip_prefix("-- ")) {
                Some(text) => {
                    let attribution = Some(SemanticText::plain(text));
                    quote_lines.pop();
                    attribution
                }
                None => None,
            };
            push_block(
                ContentBlock::blockquote(
                    SemanticText::plain(quote_lines.join(" ").trim()),
                    attribution,
                ),
                &mut stack,
                &mut root,
            );
        } else if let Some((ordered, _)) = text_list_item(line) {
            let mut items = Vec::new();
            while i < lines.len() {
                match text_list_item(lines[i].trim_end()) {
                    Some((kind, text)) if kind == ordered => {
                        items.push(SemanticText::plain(text));
                        i += 1;
                    }
                    _ => break,
                }
            }
            push_block(ContentBlock::list(ordered, items), &mut stack, &mut root);
        } else if line.contains(" | ") {
            let mut raw_rows: Vec<Vec<SemanticText>> = Vec::new();
            let mut headers: Vec<SemanticText> = Vec::new();
            while i < lines.len() {
                let row_line = lines[i].trim_end();
                if row_line.contains(" | ") {
                    raw_rows.push(
                        row_line
                            .split(" | ")
                            .map(|cell| SemanticText::plain(cell.trim()))
                            .collect(),
                    );
                    i += 1;
                } else if underline_of(row_line) == Some('-') && raw_rows.len() == 1 {
                    headers = raw_rows.remove(0);
                    i += 1;
                } else {
                    break;
                }
            }
            let caption = lines
                .get(i)
                .and_then(|l| l.trim_end().strip_prefix("Table: "))
                .map(|caption| SemanticText::plain(caption));
            if caption.is_some() {
                i += 1;
            }
            push_block(
                ContentBlock::table(caption, headers, raw_rows),
                &mut stack,
                &mut root,
            );
        } else {
            let mut paragraph = vec![line];
            i += 1;
            while i < lines.len() {
                let next = lines[i].trim_end();
                let next_is_heading = lines
                    .get(i + 1)
                    .is_some_and(|after| underline_of(after).is_some());
                if next.trim().is_empty()
                    || next.starts_with("  ")
                    || text_list_item(next).is_some()
                    || next.contains(" | ")
                    || next_is_heading
                {
                    break;
                }
                paragraph.push(next);
                i += 1;
            }
            push_block(
                ContentBlock::paragraph(SemanticText::plain(paragraph.join(" "))),
                &mut stack,
                &mut root,
            );
        }
    }

    close_to(0, &mut stack, &mut root);
    Ok(Document::new(title.unwrap_or_else(|| UNTITLED.to_string())).with_contents(root))
}

fn text_list_item(line: &str) -> Option<(bool, &str)> {
    if let Some(text) = line.strip_prefix("- ") {
        return Some((false, text));
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0
        && let Some(text) = line[digits..].strip_prefix(". ")
    {
        return Some((true, text));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_title() {
        let document = Document::new("T").with_subject("S");
        let renderer = TextRenderer::new();
        let result = renderer.render(&document, &RenderOptions::default()).unwrap();
        assert!(!result.content.is_empty());
        assert!(result.content.contains('T'));
    }

    #[test]
    fn test_title_and_sections_round_trip() {
        let document = Document::new("My Report").with_contents(vec![ContentNode::Container(
            StructuralContainer::new(ContainerKind::Unit, "Findings").with_contents(vec![
                ContentNode::Block(ContentBlock::paragraph("All systems nominal.")),
            ]),
        )]);
        let renderer = TextRenderer::new();
        let rendered = renderer.render(&document, &RenderOptions::default()).unwrap();
        let parsed = renderer
            .parse(rendered.content.as_bytes(), &ParseOptions::default())
            .unwrap();
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.document.title(), "My Report");
        let ContentNode::Container(container) = &parsed.document.contents()[0] else {
            panic!("expected container");
        };
        assert_eq!(
            container.title.as_ref().unwrap().display_text(),
            "Findings"
        );
    }

    #[test]
    fn test_quote_and_code_indentation_disambiguate() {
        let input = "  quoted words\n  -- someone\n\n    let x = 1;\n";
        let document = parse_text(input).unwrap();
        let blocks: Vec<_> = document.contents().iter().collect();
        assert_eq!(blocks.len(), 2);
        let ContentNode::Block(quote) = blocks[0] else {
            panic!("expected block")
        };
        assert!(matches!(quote.content, BlockContent::Blockquote { .. }));
        let ContentNode::Block(code) = blocks[1] else {
            panic!("expected block")
        };
        assert!(matches!(code.content, BlockContent::CodeBlock { .. }));
    }
}
