//! WordprocessingML → document parsing.
//!
//! `word/document.xml` is flattened into a sequence of paragraphs and
//! tables, then container nesting is reconstructed from `Heading{n}`
//! paragraph styles, mirroring the writer's outline convention.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::document::{
    BlockContent, ContainerKind, ContentBlock, ContentNode, Run, SemanticText,
    StructuralContainer,
};
use crate::error::{Error, Result};
use crate::util::resolve_entity;

// ============================================================================
// Flat item collection
// ============================================================================

#[derive(Debug, Default)]
struct RawPara {
    style: Option<String>,
    num_id: Option<u32>,
    runs: Vec<Run>,
}

#[derive(Debug, Default)]
struct RawTable {
    /// (is_header_row, cells)
    rows: Vec<(bool, Vec<SemanticText>)>,
}

#[derive(Debug)]
enum RawItem {
    Para(RawPara),
    Table(RawTable),
}

fn local_name(name: &[u8]) -> &[u8] {
    name.rsplit(|&b| b == b':').next().unwrap_or(name)
}

#[derive(Default)]
struct Collector {
    items: Vec<RawItem>,
    para: Option<RawPara>,
    in_ppr: bool,
    in_text: bool,
    run_italic: bool,
    run_bold: bool,
    run_style: Option<String>,
    hyperlink_anchor: Option<String>,
    table: Option<RawTable>,
    row: Option<(bool, Vec<SemanticText>)>,
    cell_runs: Option<Vec<Run>>,
}

impl Collector {
    fn push_text(&mut self, text: String) {
        if !self.in_text {
            return;
        }
        let run = if let Some(anchor) = &self.hyperlink_anchor {
            Run::Reference {
                text,
                target: anchor.clone(),
            }
        } else {
            match self.run_style.as_deref() {
                Some("InlineCode") => Run::Code { text },
                Some("Citation") => Run::Citation { ref_id: text },
                Some("MathInline") => Run::MathInline { math: text },
                Some("Hyperlink") => Run::Reference {
                    text,
                    target: String::new(),
                },
                _ if self.run_bold => Run::Strong { text },
                _ if self.run_italic => Run::Emphasis { text },
                _ => Run::Text { text },
            }
        };
        if let Some(para) = &mut self.para {
            // Merge adjacent plain-text runs split by entity references
            if let (Some(Run::Text { text: last }), Run::Text { text }) =
                (para.runs.last_mut(), &run)
            {
                last.push_str(text);
                return;
            }
            para.runs.push(run);
        }
    }

    fn end_paragraph(&mut self) {
        let Some(para) = self.para.take() else {
            return;
        };
        if let Some(cell) = &mut self.cell_runs {
            if !cell.is_empty() && !para.runs.is_empty() {
                cell.push(Run::Text { text: " ".into() });
            }
            cell.extend(para.runs);
        } else {
            self.items.push(RawItem::Para(para));
        }
    }
}

/// Parse the main document part into flat items.
fn collect_items(xml: &str) -> Result<Vec<RawItem>> {
    let mut reader = Reader::from_str(xml);
    let mut state = Collector::default();

    loop {
        let event = reader.read_event().map_err(Error::Xml)?;
        match &event {
            Event::Start(start) | Event::Empty(start) => {
                let is_empty = matches!(&event, Event::Empty(_));
                match local_name(start.name().as_ref()) {
                    b"tbl" => state.table = Some(RawTable::default()),
                    b"tr" => state.row = Some((false, Vec::new())),
                    b"tblHeader" => {
                        if let Some(row) = &mut state.row {
                            row.0 = true;
                        }
                    }
                    b"tc" => state.cell_runs = Some(Vec::new()),
                    b"p" => state.para = Some(RawPara::default()),
                    b"pPr" => state.in_ppr = true,
                    b"pStyle" => {
                        if state.in_ppr
                            && let Some(value) = attr_val(start)
                            && let Some(para) = &mut state.para
                        {
                            para.style = Some(value);
                        }
                    }
                    b"numId" => {
                        if let Some(value) = attr_val(start)
                            && let Some(para) = &mut state.para
                        {
                            para.num_id = value.parse().ok();
                        }
                    }
                    b"r" => {
                        state.run_italic = false;
                        state.run_bold = false;
                        state.run_style = None;
                    }
                    b"i" => state.run_italic = true,
                    b"b" => state.run_bold = true,
                    b"rStyle" => state.run_style = attr_val(start),
                    b"hyperlink" => state.hyperlink_anchor = attr_named(start, b"anchor"),
                    b"t" => {
                        state.in_text = true;
                        if is_empty {
                            state.in_text = false;
                        }
                    }
                    b"br" => {
                        if let Some(para) = &mut state.para {
                            para.runs.push(Run::Text { text: "\n".into() });
                        }
                    }
                    _ => {}
                }
            }
            Event::End(end) => match local_name(end.name().as_ref()) {
                b"tbl" => {
                    if let Some(table) = state.table.take() {
                        state.items.push(RawItem::Table(table));
                    }
                }
                b"tr" => {
                    if let Some(row) = state.row.take()
                        && let Some(table) = &mut state.table
                    {
                        table.rows.push(row);
                    }
                }
                b"tc" => {
                    if let Some(runs) = state.cell_runs.take()
                        && let Some(row) = &mut state.row
                    {
                        row.1.push(SemanticText::from_runs(runs));
                    }
                }
                b"p" => state.end_paragraph(),
                b"pPr" => state.in_ppr = false,
                b"hyperlink" => state.hyperlink_anchor = None,
                b"t" => state.in_text = false,
                _ => {}
            },
            Event::Text(text) => {
                let decoded = String::from_utf8_lossy(text.as_ref()).to_string();
                state.push_text(decoded);
            }
            Event::GeneralRef(entity) => {
                let name = String::from_utf8_lossy(entity.as_ref()).to_string();
                let resolved = resolve_entity(&name).unwrap_or(format!("&{name};"));
                state.push_text(resolved);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(state.items)
}

fn attr_val(start: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    attr_named(start, b"val")
}

fn attr_named(start: &quick_xml::events::BytesStart<'_>, name: &[u8]) -> Option<String> {
    start
        .attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == name)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

// ============================================================================
// Outline reconstruction
// ============================================================================

fn heading_level(style: Option<&str>) -> Option<usize> {
    style
        .and_then(|style| style.strip_prefix("Heading"))
        .and_then(|level| level.parse::<usize>().ok())
        .filter(|level| (1..=6).contains(level))
}

/// Parse `word/document.xml` into body contents.
pub(super) fn parse_document_xml(xml: &str) -> Result<Vec<ContentNode>> {
    let items = collect_items(xml)?;

    let mut root: Vec<ContentNode> = Vec::new();
    let mut stack: Vec<(usize, StructuralContainer)> = Vec::new();
    let mut i = 0;

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

    fn close_to(
        depth: usize,
        stack: &mut Vec<(usize, StructuralContainer)>,
        root: &mut Vec<ContentNode>,
    ) {
        while stack.last().is_some_and(|(open, _)| *open >= depth) {
            let (_, container) = stack.pop().expect("stack is non-empty");
            let node = ContentNode::Container(container);
            match stack.last_mut() {
                Some((_, parent)) => parent.contents.push(node),
                None => root.push(node),
            }
        }
    }

    while i < items.len() {
        match &items[i] {
            RawItem::Para(para) => {
                if let Some(level) = heading_level(para.style.as_deref()) {
                    let depth = level - 1;
                    close_to(depth, &mut stack, &mut root);
                    stack.push((
                        depth,
                        StructuralContainer {
                            kind: Some(ContainerKind::from_depth(depth)),
                            title: Some(SemanticText::from_runs(para.runs.clone())),
                            ..Default::default()
                        },
                    ));
                    i += 1;
                    continue;
                }

                match para.style.as_deref() {
                    Some("ListParagraph") => {
                        let num_id = para.num_id;
                        let mut list_items = Vec::new();
                        while i < items.len() {
                            match &items[i] {
                                RawItem::Para(item)
                                    if item.style.as_deref() == Some("ListParagraph")
                                        && item.num_id == num_id =>
                                {
                                    list_items.push(SemanticText::from_runs(item.runs.clone()));
                                    i += 1;
                                }
                                _ => break,
                            }
                        }
                        push_block(
                            ContentBlock::list(num_id == Some(2), list_items),
                            &mut stack,
                            &mut root,
                        );
                        continue;
                    }
                    Some("Quote") => {
                        let text = SemanticText::from_runs(para.runs.clone());
                        i += 1;
                        let attribution = match items.get(i) {
                            Some(RawItem::Para(next))
                                if next.style.as_deref() == Some("QuoteAttribution") =>
                            {
                                let attribution = SemanticText::from_runs(next.runs.clone());
                                i += 1;
                                Some(attribution)
                            }
                            _ => None,
                        };
                        push_block(
                            ContentBlock::blockquote(text, attribution),
                            &mut stack,
                            &mut root,
                        );
                        continue;
                    }
                    Some("CodeBlock") => {
                        let code = SemanticText::from_runs(para.runs.clone()).display_text();
                        push_block(
                            ContentBlock::code_block(code, None),
                            &mut stack,
                            &mut root,
                        );
                    }
                    Some("MathBlock") => {
                        let math = SemanticText::from_runs(para.runs.clone()).display_text();
                        push_block(ContentBlock::math_block(math), &mut stack, &mut root);
                    }
                    Some("Figure") => {
                        let (src, alt) = match para.runs.first() {
                            Some(Run::Reference { text, target }) => {
                                (target.clone(), Some(text.clone()))
                            }
                            _ => (
                                String::new(),
                                Some(SemanticText::from_runs(para.runs.clone()).display_text()),
                            ),
                        };
                        i += 1;
                        let caption = match items.get(i) {
                            Some(RawItem::Para(next))
                                if next.style.as_deref() == Some("Caption") =>
                            {
                                let caption = SemanticText::from_runs(next.runs.clone());
                                i += 1;
                                Some(caption)
                            }
                            _ => None,
                        };
                        push_block(
                            ContentBlock::new(
                                crate::document::vocab::FIGURE,
                                BlockContent::Figure {
                                    src,
                                    alt: alt.filter(|alt| !alt.is_empty()),
                                    caption,
                                },
                            ),
                            &mut stack,
                            &mut root,
                        );
                        continue;
                    }
                    Some("UnsupportedBlock") => {
                        let text = SemanticText::from_runs(para.runs.clone()).display_text();
                        push_block(
                            ContentBlock::new(
                                "unknown",
                                BlockContent::Unknown(serde_json::json!({ "text": text })),
                            ),
                            &mut stack,
                            &mut root,
                        );
                    }
                    _ => {
                        if !para.runs.is_empty() {
                            push_block(
                                ContentBlock::paragraph(SemanticText::from_runs(
                                    para.runs.clone(),
                                )),
                                &mut stack,
                                &mut root,
                            );
                        }
                    }
                }
                i += 1;
            }
            RawItem::Table(table) => {
                let mut headers: Vec<SemanticText> = Vec::new();
                let mut rows: Vec<Vec<SemanticText>> = Vec::new();
                for (is_header, cells) in &table.rows {
                    if *is_header && headers.is_empty() {
                        headers = cells.clone();
                    } else {
                        rows.push(cells.clone());
                    }
                }
                i += 1;
                let caption = match items.get(i) {
                    Some(RawItem::Para(next)) if next.style.as_deref() == Some("Caption") => {
                        let caption = SemanticText::from_runs(next.runs.clone());
                        i += 1;
                        Some(caption)
                    }
                    _ => None,
                };
                push_block(
                    ContentBlock::table(caption, headers, rows),
                    &mut stack,
                    &mut root,
                );
            }
        }
    }

    close_to(0, &mut stack, &mut root);
    Ok(root)
}
