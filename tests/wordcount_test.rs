//! Word-count determinism properties.

use proptest::prelude::*;

use weft::analysis::{count_document_words, count_text_words};
use weft::{ContentBlock, ContentNode, Document, Run, SemanticText};

fn word() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{1,12}"
}

fn words(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(word(), 0..max)
}

proptest! {
    #[test]
    fn count_text_words_matches_token_count(tokens in words(40)) {
        let text = tokens.join(" ");
        prop_assert_eq!(count_text_words(&text), tokens.len());
    }

    #[test]
    fn count_is_invariant_under_whitespace_style(tokens in words(20)) {
        let spaced = tokens.join(" ");
        let tabbed = tokens.join("\t");
        let multi = tokens.join("   \n ");
        prop_assert_eq!(count_text_words(&spaced), count_text_words(&tabbed));
        prop_assert_eq!(count_text_words(&spaced), count_text_words(&multi));
    }

    #[test]
    fn count_is_invariant_under_json_reserialization(
        paragraphs in prop::collection::vec(words(15), 1..5)
    ) {
        let contents: Vec<ContentNode> = paragraphs
            .iter()
            .map(|tokens| {
                ContentNode::Block(ContentBlock::paragraph(SemanticText::from_runs(vec![
                    Run::Text { text: tokens.join(" ") },
                ])))
            })
            .collect();
        let document = Document::new("Prop Fixture").with_contents(contents);

        let first = count_document_words(&document);

        // Serialize → deserialize → count again
        let json = serde_json::to_string(&document).unwrap();
        let restored: Document = serde_json::from_str(&json).unwrap();
        let second = count_document_words(&restored);

        prop_assert_eq!(first, second);

        // And the count itself is title words + body tokens
        let body_tokens: usize = paragraphs.iter().map(Vec::len).sum();
        prop_assert_eq!(first, 2 + body_tokens);
    }
}

#[test]
fn test_citation_and_math_excluded_from_document_count() {
    let document = Document::new("Count Me").with_contents(vec![ContentNode::Block(
        ContentBlock::paragraph(SemanticText::from_runs(vec![
            Run::Text {
                text: "only three words".into(),
            },
            Run::Citation {
                ref_id: "ignored2020".into(),
            },
            Run::MathInline {
                math: "a + b".into(),
            },
        ])),
    )]);
    // 2 title words + 3 body words
    assert_eq!(count_document_words(&document), 5);
}
