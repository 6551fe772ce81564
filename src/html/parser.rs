//! HTML → document parsing.
//!
//! Events from quick-xml are first assembled into a lightweight element
//! tree, then the tree is walked back into the canonical model. Containers
//! are read from `<section data-kind="…">`; the first heading child of a
//! section is its title.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::document::{
    BlockContent, ContainerKind, ContentBlock, ContentNode, Contributor, Document, Run,
    SemanticText, UNTITLED,
};
use crate::error::{Error, Result};
use crate::util::resolve_entity;

// ============================================================================
// Element tree
// ============================================================================

#[derive(Debug)]
pub(super) struct XElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XNode>,
}

#[derive(Debug)]
pub(super) enum XNode {
    Element(XElement),
    Text(String),
}

impl XElement {
    fn new(name: String) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|token| token == class))
            .unwrap_or(false)
    }

    pub fn elements(&self) -> impl Iterator<Item = &XElement> {
        self.children.iter().filter_map(|node| match node {
            XNode::Element(element) => Some(element),
            XNode::Text(_) => None,
        })
    }

    pub fn find(&self, name: &str) -> Option<&XElement> {
        self.elements().find(|element| element.name == name)
    }

    /// First matching element anywhere in the subtree.
    pub fn find_deep(&self, name: &str) -> Option<&XElement> {
        for element in self.elements() {
            if element.name == name {
                return Some(element);
            }
            if let Some(found) = element.find_deep(name) {
                return Some(found);
            }
        }
        None
    }

    /// Concatenated descendant text.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XNode::Text(text) => out.push_str(text),
                XNode::Element(element) => element.collect_text(out),
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(XNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(XNode::Text(text.to_string()));
        }
    }
}

fn read_attrs(start: &quick_xml::events::BytesStart<'_>) -> Vec<(String, String)> {
    start
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map(|value| value.to_string())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
            (key, value)
        })
        .collect()
}

/// Assemble quick-xml events into an element tree under a synthetic root.
pub(super) fn build_tree(input: &str) -> Result<XElement> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<XElement> = vec![XElement::new("#root".to_string())];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let mut element =
                    XElement::new(String::from_utf8_lossy(start.name().as_ref()).to_lowercase());
                element.attrs = read_attrs(&start);
                stack.push(element);
            }
            Ok(Event::Empty(start)) => {
                let mut element =
                    XElement::new(String::from_utf8_lossy(start.name().as_ref()).to_lowercase());
                element.attrs = read_attrs(&start);
                let parent = stack.last_mut().expect("root frame is always present");
                parent.children.push(XNode::Element(element));
            }
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    return Err(Error::Parse("unbalanced closing tag".to_string()));
                }
                let element = stack.pop().expect("checked above");
                let parent = stack.last_mut().expect("root frame is always present");
                parent.children.push(XNode::Element(element));
            }
            Ok(Event::Text(text)) => {
                let decoded = String::from_utf8_lossy(text.as_ref()).to_string();
                stack
                    .last_mut()
                    .expect("root frame is always present")
                    .push_text(&decoded);
            }
            Ok(Event::CData(data)) => {
                let decoded = String::from_utf8_lossy(data.as_ref()).to_string();
                stack
                    .last_mut()
                    .expect("root frame is always present")
                    .push_text(&decoded);
            }
            Ok(Event::GeneralRef(entity)) => {
                let name = String::from_utf8_lossy(entity.as_ref()).to_string();
                let resolved = resolve_entity(&name).unwrap_or(format!("&{name};"));
                stack
                    .last_mut()
                    .expect("root frame is always present")
                    .push_text(&resolved);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(Error::Xml(error)),
        }
    }

    if stack.len() != 1 {
        return Err(Error::Parse(format!(
            "unclosed element `{}`",
            stack.last().expect("non-empty").name
        )));
    }
    Ok(stack.pop().expect("root frame"))
}

// ============================================================================
// Tree → document
// ============================================================================

pub(crate) fn parse_html(input: &str) -> Result<Document> {
    if input.trim().is_empty() {
        return Err(Error::Parse("empty html input".to_string()));
    }
    let root = build_tree(input)?;

    let mut title: Option<String> = None;
    let mut subject: Option<String> = None;
    let mut authors: Vec<Contributor> = Vec::new();

    if let Some(head_title) = root.find_deep("title") {
        let text = head_title.text().trim().to_string();
        if !text.is_empty() {
            title = Some(text);
        }
    }
    collect_meta(&root, &mut subject, &mut authors);

    let body = root.find_deep("body").unwrap_or(&root);
    let mut contents: Vec<ContentNode> = Vec::new();
    for element in body.elements() {
        if element.name == "h1" {
            // The leading h1 is the document title; it wins over <title>.
            title = Some(inline_runs(element).display_text());
            continue;
        }
        contents.extend(convert_element(element, 0));
    }

    let mut document = Document::new(title.unwrap_or_else(|| UNTITLED.to_string()))
        .with_contents(contents);
    if let Some(subject) = subject {
        document.subject = Some(subject);
    }
    if !authors.is_empty()
        && let Some(entry) = &mut document.bibliographic_entry
    {
        entry.author = authors;
    }
    Ok(document)
}

fn collect_meta(element: &XElement, subject: &mut Option<String>, authors: &mut Vec<Contributor>) {
    for child in element.elements() {
        if child.name == "meta" {
            match (child.attr("name"), child.attr("content")) {
                (Some("subject"), Some(content)) => *subject = Some(content.to_string()),
                (Some("author"), Some(content)) => authors.push(Contributor::named(content)),
                _ => {}
            }
        }
        collect_meta(child, subject, authors);
    }
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn convert_element(element: &XElement, depth: usize) -> Vec<ContentNode> {
    match element.name.as_str() {
        "section" => vec![convert_section(element, depth)],
        name if heading_level(name).is_some() => {
            vec![ContentNode::Block(ContentBlock::new(
                crate::document::vocab::HEADING,
                BlockContent::Heading {
                    level: heading_level(name),
                    text: inline_runs(element),
                },
            ))]
        }
        "p" => vec![ContentNode::Block(ContentBlock::paragraph(inline_runs(
            element,
        )))],
        "ul" | "ol" => {
            let items = element
                .elements()
                .filter(|child| child.name == "li")
                .map(inline_runs)
                .collect();
            vec![ContentNode::Block(ContentBlock::list(
                element.name == "ol",
                items,
            ))]
        }
        "blockquote" => {
            let mut paragraphs = element.elements().filter(|child| child.name == "p");
            let text = paragraphs.next().map(inline_runs).unwrap_or_else(|| {
                SemanticText::plain(element.text().trim())
            });
            let attribution = element.find("footer").map(inline_runs);
            vec![ContentNode::Block(ContentBlock::blockquote(
                text,
                attribution,
            ))]
        }
        "pre" => {
            let (code, language) = match element.find("code") {
                Some(code) => {
                    let language = code.attr("class").and_then(|classes| {
                        classes
                            .split_whitespace()
                            .find_map(|token| token.strip_prefix("language-"))
                            .map(str::to_string)
                    });
                    (code.text(), language)
                }
                None => (element.text(), None),
            };
            vec![ContentNode::Block(ContentBlock::code_block(code, language))]
        }
        "div" if element.has_class("math-block") => {
            vec![ContentNode::Block(ContentBlock::math_block(element.text()))]
        }
        "div" if element.has_class("unsupported-block") => {
            let block_type = element
                .attr("data-block-type")
                .unwrap_or("unknown")
                .to_string();
            let text = element.text();
            vec![ContentNode::Block(ContentBlock::new(
                block_type,
                BlockContent::Unknown(serde_json::json!({ "text": text })),
            ))]
        }
        "table" => vec![convert_table(element)],
        "figure" => vec![convert_figure(element)],
        "img" => vec![ContentNode::Block(ContentBlock::new(
            crate::document::vocab::FIGURE,
            BlockContent::Figure {
                src: element.attr("src").unwrap_or_default().to_string(),
                alt: element.attr("alt").map(str::to_string),
                caption: None,
            },
        ))],
        // Transparent wrappers: flatten children
        "div" | "article" | "main" | "span" => element
            .elements()
            .flat_map(|child| convert_element(child, depth))
            .collect(),
        _ => {
            if element.elements().next().is_some() {
                element
                    .elements()
                    .flat_map(|child| convert_element(child, depth))
                    .collect()
            } else {
                let text = element.text();
                if text.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![ContentNode::Block(ContentBlock::paragraph(text.trim()))]
                }
            }
        }
    }
}

fn convert_section(element: &XElement, depth: usize) -> ContentNode {
    let kind = element
        .attr("data-kind")
        .and_then(|kind| match kind {
            "unit" => Some(ContainerKind::Unit),
            "chapter" => Some(ContainerKind::Chapter),
            "section" => Some(ContainerKind::Section),
            _ => None,
        })
        .unwrap_or_else(|| ContainerKind::from_depth(depth));

    let mut title: Option<SemanticText> = None;
    let mut contents: Vec<ContentNode> = Vec::new();
    for child in element.elements() {
        if title.is_none() && contents.is_empty() && heading_level(&child.name).is_some() {
            title = Some(inline_runs(child));
            continue;
        }
        contents.extend(convert_element(child, depth + 1));
    }

    ContentNode::Container(crate::document::StructuralContainer {
        kind: Some(kind),
        id: element.attr("id").map(str::to_string),
        label: None,
        title,
        contents,
    })
}

fn convert_table(element: &XElement) -> ContentNode {
    let caption = element.find("caption").map(inline_runs);
    let mut headers: Vec<SemanticText> = Vec::new();
    let mut rows: Vec<Vec<SemanticText>> = Vec::new();

    if let Some(thead) = element.find("thead")
        && let Some(row) = thead.find("tr")
    {
        headers = row
            .elements()
            .filter(|cell| cell.name == "th" || cell.name == "td")
            .map(inline_runs)
            .collect();
    }
    let body_rows: Vec<&XElement> = match element.find("tbody") {
        Some(tbody) => tbody.elements().filter(|row| row.name == "tr").collect(),
        None => element.elements().filter(|row| row.name == "tr").collect(),
    };
    for row in body_rows {
        rows.push(
            row.elements()
                .filter(|cell| cell.name == "td" || cell.name == "th")
                .map(inline_runs)
                .collect(),
        );
    }

    ContentNode::Block(ContentBlock::table(caption, headers, rows))
}

fn convert_figure(element: &XElement) -> ContentNode {
    let img = element.find("img");
    ContentNode::Block(ContentBlock::new(
        crate::document::vocab::FIGURE,
        BlockContent::Figure {
            src: img
                .and_then(|img| img.attr("src"))
                .unwrap_or_default()
                .to_string(),
            alt: img.and_then(|img| img.attr("alt")).map(str::to_string),
            caption: element.find("figcaption").map(inline_runs),
        },
    ))
}

/// Read the inline runs of an element: text nodes plus the recognized inline
/// elements; anything else flattens to its text.
fn inline_runs(element: &XElement) -> SemanticText {
    let mut runs: Vec<Run> = Vec::new();
    for node in &element.children {
        match node {
            XNode::Text(text) => {
                let normalized = text.replace(['\n', '\r'], " ");
                if !normalized.is_empty() {
                    runs.push(Run::Text { text: normalized });
                }
            }
            XNode::Element(child) => match child.name.as_str() {
                "em" | "i" => runs.push(Run::Emphasis { text: child.text() }),
                "strong" | "b" => runs.push(Run::Strong { text: child.text() }),
                "code" => runs.push(Run::Code { text: child.text() }),
                "a" => runs.push(Run::Reference {
                    text: child.text(),
                    target: child.attr("href").unwrap_or_default().to_string(),
                }),
                "cite" => runs.push(Run::Citation {
                    ref_id: child
                        .attr("data-ref")
                        .map(str::to_string)
                        .unwrap_or_else(|| child.text()),
                }),
                "span" if child.has_class("math-inline") => runs.push(Run::MathInline {
                    math: child.text(),
                }),
                _ => {
                    let text = child.text();
                    if !text.is_empty() {
                        runs.push(Run::Text { text });
                    }
                }
            },
        }
    }

    // Drop leading/trailing whitespace-only runs left by pretty-printing.
    while runs
        .first()
        .is_some_and(|run| matches!(run, Run::Text { text } if text.trim().is_empty()))
    {
        runs.remove(0);
    }
    while runs
        .last()
        .is_some_and(|run| matches!(run, Run::Text { text } if text.trim().is_empty()))
    {
        runs.pop();
    }
    SemanticText::from_runs(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_tree_balanced() {
        let tree = build_tree("<div><p>hi <em>there</em></p></div>").unwrap();
        let div = tree.find("div").unwrap();
        let p = div.find("p").unwrap();
        assert_eq!(p.text(), "hi there");
    }

    #[test]
    fn test_build_tree_rejects_unclosed() {
        assert!(build_tree("<div><p>hi</div>").is_err() || build_tree("<div><p>hi").is_err());
    }

    #[test]
    fn test_entities_resolve() {
        let tree = build_tree("<p>a &amp; b</p>").unwrap();
        assert_eq!(tree.find("p").unwrap().text(), "a & b");
    }

    #[test]
    fn test_section_with_kind_and_title() {
        let html = "<body><h1>Doc</h1>\
            <section data-kind=\"chapter\"><h2>Ch</h2><p>body</p></section></body>";
        let document = parse_html(html).unwrap();
        assert_eq!(document.title(), "Doc");
        let ContentNode::Container(container) = &document.contents()[0] else {
            panic!("expected container");
        };
        assert_eq!(container.kind, Some(ContainerKind::Chapter));
        assert_eq!(container.title.as_ref().unwrap().display_text(), "Ch");
        assert_eq!(container.contents.len(), 1);
    }

    #[test]
    fn test_inline_runs_preserve_spacing() {
        let tree = build_tree("<p>plain <em>em</em> tail</p>").unwrap();
        let runs = inline_runs(tree.find("p").unwrap());
        assert_eq!(
            runs.runs,
            vec![
                Run::Text {
                    text: "plain ".into()
                },
                Run::Emphasis { text: "em".into() },
                Run::Text {
                    text: " tail".into()
                },
            ]
        );
    }

    #[test]
    fn test_unsupported_block_round_trips_type() {
        let html = "<body><div class=\"unsupported-block\" \
            data-block-type=\"https://example.org/v/quiz\">quiz text</div></body>";
        let document = parse_html(html).unwrap();
        let ContentNode::Block(block) = &document.contents()[0] else {
            panic!("expected block");
        };
        assert_eq!(block.block_type, "https://example.org/v/quiz");
        assert!(matches!(block.content, BlockContent::Unknown(_)));
    }
}
