//! Word counting over documents, blocks, and plain text.
//!
//! Counting is deterministic and locale-naive: split on whitespace runs,
//! drop empty tokens, count the remainder. Citation and inline-math runs are
//! display-only and never contribute (see
//! [`SemanticText::countable_text`](crate::document::SemanticText::countable_text)).

use crate::document::{BlockContent, ContentBlock, ContentNode, Document, SemanticText};

/// Count words in plain text: whitespace-run splitting, empty tokens dropped.
pub fn count_text_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn count_semantic_words(text: &SemanticText) -> usize {
    count_text_words(&text.countable_text())
}

/// Count the words one content block contributes.
///
/// Paragraphs and headings have one text field; lists sum over items;
/// blockquotes add the optional attribution; tables count headers, every row
/// cell, and the caption; unknown types are scanned for a SemanticText-shaped
/// `text` field and otherwise contribute zero. Math blocks are display-only.
pub fn count_block_words(block: &ContentBlock) -> usize {
    match &block.content {
        BlockContent::Paragraph { text } | BlockContent::Heading { text, .. } => {
            count_semantic_words(text)
        }
        BlockContent::List { items, .. } => items.iter().map(count_semantic_words).sum(),
        BlockContent::Blockquote { text, attribution } => {
            count_semantic_words(text)
                + attribution.as_ref().map(count_semantic_words).unwrap_or(0)
        }
        BlockContent::CodeBlock { code, .. } => count_text_words(code),
        BlockContent::MathBlock { .. } => 0,
        BlockContent::Table {
            caption,
            headers,
            rows,
        } => {
            let mut count = caption.as_ref().map(count_semantic_words).unwrap_or(0);
            count += headers.iter().map(count_semantic_words).sum::<usize>();
            count += rows
                .iter()
                .flat_map(|row| row.iter())
                .map(count_semantic_words)
                .sum::<usize>();
            count
        }
        BlockContent::Figure { alt, caption, .. } => {
            alt.as_deref().map(count_text_words).unwrap_or(0)
                + caption.as_ref().map(count_semantic_words).unwrap_or(0)
        }
        BlockContent::Unknown(value) => BlockContent::fallback_text(value)
            .map(|text| count_semantic_words(&text))
            .unwrap_or(0),
    }
}

fn count_nodes(nodes: &[ContentNode]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            ContentNode::Block(block) => count_block_words(block),
            ContentNode::Container(container) => {
                container
                    .title
                    .as_ref()
                    .map(count_semantic_words)
                    .unwrap_or(0)
                    + count_nodes(&container.contents)
            }
        })
        .sum()
}

/// Count every word in a document: bibliographic title, front matter, the
/// body tree (recursing through nested containers to content blocks), and
/// back matter (appendices, glossary, bibliography, index).
pub fn count_document_words(document: &Document) -> usize {
    let mut count = 0;

    if let Some(entry) = &document.bibliographic_entry {
        count += count_text_words(&entry.title);
    }

    if let Some(front) = &document.front_matter {
        count += count_nodes(&front.preface);
        count += count_nodes(&front.acknowledgments);
    }

    count += count_nodes(document.contents());

    if let Some(back) = &document.back_matter {
        count += count_nodes(&back.appendices);
        for entry in &back.glossary {
            count += count_text_words(&entry.term) + count_semantic_words(&entry.definition);
        }
        for entry in &back.bibliography {
            count += count_text_words(&entry.title);
        }
        for entry in &back.index {
            count += count_text_words(&entry.term);
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ContainerKind, GlossaryEntry, Run, StructuralContainer};

    #[test]
    fn test_count_text_words_whitespace_runs() {
        assert_eq!(count_text_words("one  two\tthree\n four"), 4);
        assert_eq!(count_text_words("   "), 0);
        assert_eq!(count_text_words(""), 0);
    }

    #[test]
    fn test_citation_and_math_do_not_count() {
        let block = ContentBlock::paragraph(SemanticText::from_runs(vec![
            Run::Text {
                text: "two words".into(),
            },
            Run::Citation {
                ref_id: "smith2020".into(),
            },
            Run::MathInline {
                math: "x^2 + y^2".into(),
            },
        ]));
        assert_eq!(count_block_words(&block), 2);
    }

    #[test]
    fn test_table_counts_headers_cells_caption() {
        let block = ContentBlock::table(
            Some("one caption".into()),
            vec!["h1".into(), "h2".into()],
            vec![vec!["a b".into(), "c".into()]],
        );
        // caption 2 + headers 2 + cells 3
        assert_eq!(count_block_words(&block), 7);
    }

    #[test]
    fn test_unknown_block_scans_for_text() {
        let block: ContentBlock = serde_json::from_str(
            r#"{ "blockType": "x/mystery", "content": { "inner": { "text": "three short words" } } }"#,
        )
        .unwrap();
        assert_eq!(count_block_words(&block), 3);

        let empty: ContentBlock =
            serde_json::from_str(r#"{ "blockType": "x/mystery", "content": { "n": 7 } }"#).unwrap();
        assert_eq!(count_block_words(&empty), 0);
    }

    #[test]
    fn test_document_count_walks_all_matter() {
        let mut document = Document::new("Two Words");
        document.body_matter = Some(crate::document::BodyMatter {
            contents: vec![ContentNode::Container(
                StructuralContainer::new(ContainerKind::Chapter, "Chapter Title Here")
                    .with_contents(vec![ContentNode::Block(ContentBlock::paragraph(
                        "four words of body",
                    ))]),
            )],
        });
        document.back_matter = Some(crate::document::BackMatter {
            glossary: vec![GlossaryEntry {
                term: "term".into(),
                definition: "a definition".into(),
            }],
            ..Default::default()
        });
        // title 2 + chapter title 3 + paragraph 4 + glossary 1 + 2
        assert_eq!(count_document_words(&document), 12);
    }
}
