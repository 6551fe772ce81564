//! Markdown → document parsing.
//!
//! A line-oriented parser over the CommonMark subset the renderer emits.
//! Container nesting is reconstructed from the ATX heading outline: the
//! first `#` heading is the document title, a level-`n` heading opens a
//! container at depth `n − 2` (floored at zero).

use percent_encoding::percent_decode_str;

use crate::document::{
    ContainerKind, ContentBlock, ContentNode, Document, Run, SemanticText, StructuralContainer,
    UNTITLED,
};
use crate::error::{Error, Result};

use super::escape::unescape_markdown;

pub(crate) fn parse_markdown(input: &str) -> Result<Document> {
    if input.trim().is_empty() {
        return Err(Error::Parse("empty markdown input".to_string()));
    }

    let lines: Vec<&str> = input.lines().collect();
    let mut builder = TreeBuilder::default();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim_end();
        if line.trim().is_empty() {
            i += 1;
            continue;
        }

        if let Some((level, text)) = heading(line) {
            if level == 1 && builder.title.is_none() && builder.is_empty() {
                builder.title = Some(parse_inline(text).display_text());
            } else {
                let depth = level.saturating_sub(2);
                builder.open_container(depth, parse_inline(text));
            }
            i += 1;
        } else if let Some((fence, language)) = code_fence(line) {
            let mut code_lines = Vec::new();
            i += 1;
            while i < lines.len() && !closes_fence(lines[i], fence) {
                code_lines.push(lines[i]);
                i += 1;
            }
            i += 1; // closing fence
            builder.push_block(ContentBlock::code_block(code_lines.join("\n"), language));
        } else if line.trim() == "$$" {
            let mut math_lines = Vec::new();
            i += 1;
            while i < lines.len() && lines[i].trim() != "$$" {
                math_lines.push(lines[i]);
                i += 1;
            }
            i += 1;
            builder.push_block(ContentBlock::math_block(math_lines.join("\n")));
        } else if line.starts_with('>') {
            let mut quote_lines = Vec::new();
            while i < lines.len() && lines[i].trim_end().starts_with('>') {
                let stripped = lines[i]
                    .trim_end()
                    .trim_start_matches('>')
                    .strip_prefix(' ')
                    .unwrap_or_else(|| lines[i].trim_end().trim_start_matches('>'));
                quote_lines.push(stripped.to_string());
                i += 1;
            }
            let attribution = match quote_lines.last().and_then(|l| l.strip_prefix("-- ")) {
                Some(text) => {
                    let attribution = parse_inline(text);
                    quote_lines.pop();
                    Some(attribution)
                }
                None => None,
            };
            builder.push_block(ContentBlock::blockquote(
                parse_inline(quote_lines.join(" ").trim()),
                attribution,
            ));
        } else if let Some((ordered, _)) = list_item(line) {
            let mut items = Vec::new();
            while i < lines.len() {
                match list_item(lines[i].trim_end()) {
                    Some((kind, text)) if kind == ordered => {
                        items.push(parse_inline(text));
                        i += 1;
                    }
                    _ => break,
                }
            }
            builder.push_block(ContentBlock::list(ordered, items));
        } else if line.starts_with('|') {
            let mut raw_rows = Vec::new();
            while i < lines.len() && lines[i].trim_end().starts_with('|') {
                raw_rows.push(split_table_row(lines[i].trim_end()));
                i += 1;
            }
            let caption = lines
                .get(i)
                .and_then(|l| l.trim_end().strip_prefix("Table: "))
                .map(parse_inline);
            if caption.is_some() {
                i += 1;
            }
            builder.push_block(build_table(raw_rows, caption));
        } else if let Some((alt, src, caption)) = image(line) {
            builder.push_block(ContentBlock::new(
                crate::document::vocab::FIGURE,
                crate::document::BlockContent::Figure {
                    src,
                    alt: if alt.is_empty() { None } else { Some(alt) },
                    caption: caption.map(SemanticText::plain),
                },
            ));
            i += 1;
        } else if line.starts_with("<!--") {
            while i < lines.len() && !lines[i].contains("-->") {
                i += 1;
            }
            i += 1;
        } else {
            let mut paragraph_lines = vec![line];
            i += 1;
            while i < lines.len() {
                let next = lines[i].trim_end();
                if next.trim().is_empty() || is_structural(next) {
                    break;
                }
                paragraph_lines.push(next);
                i += 1;
            }
            builder.push_block(ContentBlock::paragraph(parse_inline(
                &paragraph_lines.join(" "),
            )));
        }
    }

    let (title, contents) = builder.finish();
    Ok(Document::new(title.unwrap_or_else(|| UNTITLED.to_string())).with_contents(contents))
}

// ============================================================================
// Outline reconstruction
// ============================================================================

#[derive(Default)]
struct TreeBuilder {
    title: Option<String>,
    root: Vec<ContentNode>,
    stack: Vec<(usize, StructuralContainer)>,
}

impl TreeBuilder {
    fn is_empty(&self) -> bool {
        self.root.is_empty() && self.stack.is_empty()
    }

    fn push_block(&mut self, block: ContentBlock) {
        match self.stack.last_mut() {
            Some((_, container)) => container.contents.push(ContentNode::Block(block)),
            None => self.root.push(ContentNode::Block(block)),
        }
    }

    fn open_container(&mut self, depth: usize, title: SemanticText) {
        while self
            .stack
            .last()
            .is_some_and(|(open_depth, _)| *open_depth >= depth)
        {
            self.close_one();
        }
        self.stack.push((
            depth,
            StructuralContainer {
                kind: Some(ContainerKind::from_depth(depth)),
                title: Some(title),
                ..Default::default()
            },
        ));
    }

    fn close_one(&mut self) {
        if let Some((_, container)) = self.stack.pop() {
            let node = ContentNode::Container(container);
            match self.stack.last_mut() {
                Some((_, parent)) => parent.contents.push(node),
                None => self.root.push(node),
            }
        }
    }

    fn finish(mut self) -> (Option<String>, Vec<ContentNode>) {
        while !self.stack.is_empty() {
            self.close_one();
        }
        (self.title, self.root)
    }
}

// ============================================================================
// Line classification
// ============================================================================

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&level)
        && let Some(text) = line[level..].strip_prefix(' ')
    {
        return Some((level, text));
    }
    None
}

fn code_fence(line: &str) -> Option<(usize, Option<String>)> {
    let fence = line.chars().take_while(|&c| c == '`').count();
    if fence >= 3 {
        let info = line[fence..].trim();
        let language = if info.is_empty() {
            None
        } else {
            Some(info.to_string())
        };
        return Some((fence, language));
    }
    None
}

fn closes_fence(line: &str, fence: usize) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= fence && trimmed.chars().all(|c| c == '`')
}

fn list_item(line: &str) -> Option<(bool, &str)> {
    if let Some(text) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
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

fn is_structural(line: &str) -> bool {
    heading(line).is_some()
        || code_fence(line).is_some()
        || line.trim() == "$$"
        || line.starts_with('>')
        || list_item(line).is_some()
        || line.starts_with('|')
        || line.starts_with("![")
        || line.starts_with("<!--")
}

fn split_table_row(line: &str) -> Vec<String> {
    let inner = line.trim().trim_start_matches('|').trim_end_matches('|');
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn is_separator_row(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells.iter().all(|cell| {
            !cell.is_empty()
                && cell
                    .chars()
                    .all(|c| c == '-' || c == ':')
        })
}

fn build_table(mut raw_rows: Vec<Vec<String>>, caption: Option<SemanticText>) -> ContentBlock {
    let headers = if raw_rows.len() >= 2 && is_separator_row(&raw_rows[1]) {
        let headers = raw_rows.remove(0);
        raw_rows.remove(0); // separator
        headers
            .iter()
            .map(|cell| parse_inline(cell))
            .collect()
    } else {
        Vec::new()
    };
    let rows = raw_rows
        .iter()
        .map(|row| row.iter().map(|cell| parse_inline(cell)).collect())
        .collect();
    ContentBlock::table(caption, headers, rows)
}

fn image(line: &str) -> Option<(String, String, Option<String>)> {
    let rest = line.strip_prefix("![")?;
    let alt_end = rest.find(']')?;
    let alt = unescape_markdown(&rest[..alt_end]);
    let rest = rest[alt_end + 1..].strip_prefix('(')?;
    let close = rest.rfind(')')?;
    let inner = &rest[..close];
    let (src, caption) = match inner.split_once(" \"") {
        Some((src, title)) => (
            src.trim(),
            Some(title.trim_end_matches('"').replace("\\\"", "\"")),
        ),
        None => (inner.trim(), None),
    };
    let src = percent_decode_str(src).decode_utf8_lossy().to_string();
    Some((alt, src, caption))
}

// ============================================================================
// Inline parsing
// ============================================================================

/// Parse inline Markdown into semantic runs: emphasis, strong, code spans,
/// references, `[@key]` citations, and `$…$` math.
pub(crate) fn parse_inline(text: &str) -> SemanticText {
    let chars: Vec<char> = text.chars().collect();
    let mut runs: Vec<Run> = Vec::new();
    let mut buf = String::new();
    let mut i = 0;

    let flush = |buf: &mut String, runs: &mut Vec<Run>| {
        if !buf.is_empty() {
            runs.push(Run::Text {
                text: std::mem::take(buf),
            });
        }
    };

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                buf.push(chars[i + 1]);
                i += 2;
            }
            '*' if i + 1 < chars.len() && chars[i + 1] == '*' => {
                match find_seq(&chars, i + 2, &['*', '*']) {
                    Some(close) if close > i + 2 => {
                        flush(&mut buf, &mut runs);
                        runs.push(Run::Strong {
                            text: unescape_span(&chars[i + 2..close]),
                        });
                        i = close + 2;
                    }
                    _ => {
                        buf.push_str("**");
                        i += 2;
                    }
                }
            }
            '*' => match find_seq(&chars, i + 1, &['*']) {
                Some(close) if close > i + 1 => {
                    flush(&mut buf, &mut runs);
                    runs.push(Run::Emphasis {
                        text: unescape_span(&chars[i + 1..close]),
                    });
                    i = close + 1;
                }
                _ => {
                    buf.push('*');
                    i += 1;
                }
            },
            '`' => {
                let ticks = chars[i..].iter().take_while(|&&c| c == '`').count();
                let pattern = vec!['`'; ticks];
                match find_seq(&chars, i + ticks, &pattern) {
                    Some(close) => {
                        flush(&mut buf, &mut runs);
                        let inner: String = chars[i + ticks..close].iter().collect();
                        runs.push(Run::Code {
                            text: trim_code_span(&inner),
                        });
                        i = close + ticks;
                    }
                    None => {
                        buf.extend(std::iter::repeat_n('`', ticks));
                        i += ticks;
                    }
                }
            }
            '$' => match find_seq(&chars, i + 1, &['$']) {
                Some(close) if close > i + 1 => {
                    flush(&mut buf, &mut runs);
                    runs.push(Run::MathInline {
                        math: chars[i + 1..close].iter().collect(),
                    });
                    i = close + 1;
                }
                _ => {
                    buf.push('$');
                    i += 1;
                }
            },
            '[' if i + 1 < chars.len() && chars[i + 1] == '@' => {
                match find_seq(&chars, i + 2, &[']']) {
                    Some(close) => {
                        flush(&mut buf, &mut runs);
                        runs.push(Run::Citation {
                            ref_id: chars[i + 2..close].iter().collect(),
                        });
                        i = close + 1;
                    }
                    None => {
                        buf.push('[');
                        i += 1;
                    }
                }
            }
            '[' => {
                let link = find_seq(&chars, i + 1, &[']']).and_then(|label_end| {
                    if chars.get(label_end + 1) == Some(&'(') {
                        find_seq(&chars, label_end + 2, &[')'])
                            .map(|target_end| (label_end, target_end))
                    } else {
                        None
                    }
                });
                match link {
                    Some((label_end, target_end)) => {
                        flush(&mut buf, &mut runs);
                        let target: String = chars[label_end + 2..target_end].iter().collect();
                        runs.push(Run::Reference {
                            text: unescape_span(&chars[i + 1..label_end]),
                            target: percent_decode_str(&target).decode_utf8_lossy().to_string(),
                        });
                        i = target_end + 1;
                    }
                    None => {
                        buf.push('[');
                        i += 1;
                    }
                }
            }
            c => {
                buf.push(c);
                i += 1;
            }
        }
    }

    flush(&mut buf, &mut runs);
    SemanticText::from_runs(runs)
}

fn find_seq(chars: &[char], from: usize, pattern: &[char]) -> Option<usize> {
    if pattern.is_empty() || from >= chars.len() {
        return None;
    }
    (from..=chars.len().saturating_sub(pattern.len()))
        .find(|&i| chars[i..i + pattern.len()] == *pattern)
}

fn unescape_span(chars: &[char]) -> String {
    unescape_markdown(&chars.iter().collect::<String>())
}

fn trim_code_span(inner: &str) -> String {
    if inner.starts_with(' ') && inner.ends_with(' ') && !inner.trim().is_empty() {
        inner[1..inner.len() - 1].to_string()
    } else {
        inner.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_emphasis_and_strong() {
        let text = parse_inline("plain *em* and **bold**");
        assert_eq!(
            text.runs,
            vec![
                Run::Text {
                    text: "plain ".into()
                },
                Run::Emphasis { text: "em".into() },
                Run::Text {
                    text: " and ".into()
                },
                Run::Strong {
                    text: "bold".into()
                },
            ]
        );
    }

    #[test]
    fn test_inline_citation_and_math() {
        let text = parse_inline("see [@smith2020] where $x^2$ holds");
        assert!(text.runs.contains(&Run::Citation {
            ref_id: "smith2020".into()
        }));
        assert!(text.runs.contains(&Run::MathInline {
            math: "x^2".into()
        }));
    }

    #[test]
    fn test_inline_reference() {
        let text = parse_inline("[label](https://example.org/page%20one)");
        assert_eq!(
            text.runs,
            vec![Run::Reference {
                text: "label".into(),
                target: "https://example.org/page one".into()
            }]
        );
    }

    #[test]
    fn test_unclosed_markers_stay_literal() {
        let text = parse_inline("a * b and `tick");
        assert_eq!(text.display_text(), "a * b and `tick");
    }

    #[test]
    fn test_heading_outline_builds_nesting() {
        let doc = parse_markdown("# Title\n\n## Part\n\n### Sub\n\nbody text\n").unwrap();
        assert_eq!(doc.title(), "Title");
        let contents = doc.contents();
        assert_eq!(contents.len(), 1);
        let ContentNode::Container(part) = &contents[0] else {
            panic!("expected container");
        };
        assert_eq!(part.kind, Some(ContainerKind::Unit));
        let ContentNode::Container(sub) = &part.contents[0] else {
            panic!("expected nested container");
        };
        assert_eq!(sub.kind, Some(ContainerKind::Chapter));
        assert!(matches!(sub.contents[0], ContentNode::Block(_)));
    }

    #[test]
    fn test_table_with_caption() {
        let doc =
            parse_markdown("| a | b |\n| --- | --- |\n| 1 | 2 |\nTable: Results\n").unwrap();
        let ContentNode::Block(block) = &doc.contents()[0] else {
            panic!("expected block");
        };
        match &block.content {
            crate::document::BlockContent::Table {
                caption,
                headers,
                rows,
            } => {
                assert_eq!(caption.as_ref().unwrap().display_text(), "Results");
                assert_eq!(headers.len(), 2);
                assert_eq!(rows.len(), 1);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_blockquote_attribution() {
        let doc = parse_markdown("> Quoted words\n> -- Someone Famous\n").unwrap();
        let ContentNode::Block(block) = &doc.contents()[0] else {
            panic!("expected block");
        };
        match &block.content {
            crate::document::BlockContent::Blockquote { text, attribution } => {
                assert_eq!(text.display_text(), "Quoted words");
                assert_eq!(
                    attribution.as_ref().unwrap().display_text(),
                    "Someone Famous"
                );
            }
            other => panic!("expected blockquote, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_is_a_parse_error() {
        assert!(parse_markdown("   \n  ").is_err());
    }
}
