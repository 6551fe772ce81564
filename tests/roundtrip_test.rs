//! Round-trip fidelity properties across the built-in renderers.

mod common;

use weft::{
    BidirectionalRenderer, Document, FidelityTester, HtmlRenderer, MarkdownRenderer,
    RoundTripOptions, Run, Severity, TextRenderer,
};

// ============================================================================
// Idempotence: fully supported content survives render→parse exactly
// ============================================================================

#[test]
fn test_markdown_round_trip_is_idempotent() {
    let document = common::rich_document();
    let renderer = MarkdownRenderer::new();
    let result = renderer
        .test_round_trip(&document, &RoundTripOptions::default())
        .unwrap();
    assert!(result.success, "issues: {:#?}", result.issues);
    assert_eq!(result.content_fidelity, 1.0);
    assert_eq!(result.structure_fidelity, 1.0);
}

#[test]
fn test_html_round_trip_is_idempotent() {
    let document = common::rich_document();
    let renderer = HtmlRenderer::new();
    let result = renderer
        .test_round_trip(&document, &RoundTripOptions::default())
        .unwrap();
    assert!(result.success, "issues: {:#?}", result.issues);
    assert_eq!(result.content_fidelity, 1.0);
    assert_eq!(result.structure_fidelity, 1.0);
    assert_eq!(result.formatting_fidelity, 1.0);
}

#[test]
fn test_docx_round_trip_preserves_structure() {
    let document = common::rich_document();
    let renderer = weft::DocxRenderer::new();
    let result = renderer
        .test_round_trip(&document, &RoundTripOptions::default())
        .unwrap();
    assert!(result.success, "issues: {:#?}", result.issues);
    assert_eq!(result.structure_fidelity, 1.0);
    assert!(result.content_fidelity >= 0.95);
}

#[test]
fn test_text_round_trip_of_simple_document() {
    let document = Document::new("My Report").with_contents(vec![
        weft::ContentNode::Container(
            weft::StructuralContainer::new(weft::ContainerKind::Unit, "Findings").with_contents(
                vec![weft::ContentNode::Block(weft::ContentBlock::paragraph(
                    "Everything works as expected.",
                ))],
            ),
        ),
    ]);
    let renderer = TextRenderer::new();
    let result = renderer
        .test_round_trip(&document, &RoundTripOptions::default())
        .unwrap();
    assert!(result.success, "issues: {:#?}", result.issues);
    assert_eq!(result.content_fidelity, 1.0);
}

// ============================================================================
// Paragraph-only documents score near-perfect through Markdown
// ============================================================================

#[test]
fn test_paragraph_only_markdown_scores_high() {
    let document = common::paragraph_only();
    let renderer = MarkdownRenderer::new();
    let result = renderer
        .test_round_trip(&document, &RoundTripOptions::default())
        .unwrap();
    assert!(
        result.fidelity_score >= 0.95,
        "score {} too low, issues: {:#?}",
        result.fidelity_score,
        result.issues
    );
}

// ============================================================================
// Monotonic degradation
// ============================================================================

#[test]
fn test_stripping_formatting_lowers_only_formatting() {
    let original = common::rich_document();
    let stripped = strip_inline_formatting(&original);

    let tester = FidelityTester::new();
    let baseline = tester.compare(&original, &original.clone(), &[], 0.85);
    let degraded = tester.compare(&original, &stripped, &[], 0.85);

    assert!(degraded.formatting_fidelity < baseline.formatting_fidelity);
    assert_eq!(degraded.structure_fidelity, baseline.structure_fidelity);
}

fn strip_inline_formatting(document: &Document) -> Document {
    fn strip_text(text: &mut weft::SemanticText) {
        for run in &mut text.runs {
            if let Run::Emphasis { text } | Run::Strong { text } | Run::Code { text } = run {
                *run = Run::Text { text: text.clone() };
            }
        }
    }

    fn strip_nodes(nodes: &mut Vec<weft::ContentNode>) {
        for node in nodes {
            match node {
                weft::ContentNode::Container(container) => {
                    if let Some(title) = &mut container.title {
                        strip_text(title);
                    }
                    strip_nodes(&mut container.contents);
                }
                weft::ContentNode::Block(block) => {
                    if let weft::BlockContent::Paragraph { text }
                    | weft::BlockContent::Heading { text, .. } = &mut block.content
                    {
                        strip_text(text);
                    }
                }
            }
        }
    }

    let mut stripped = document.clone();
    if let Some(body) = &mut stripped.body_matter {
        strip_nodes(&mut body.contents);
    }
    stripped
}

// ============================================================================
// Threshold configuration and failure reporting
// ============================================================================

#[test]
fn test_custom_threshold_can_fail_a_lossy_round_trip() {
    // The text format drops inline markers, so a perfect score is impossible
    let document = common::rich_document();
    let renderer = TextRenderer::new();
    let strict = renderer
        .test_round_trip(&document, &RoundTripOptions { threshold: 1.0 })
        .unwrap();
    assert!(!strict.success);
    assert!(strict.fidelity_score < 1.0);
    assert!(!strict.issues.is_empty());
}

#[test]
fn test_failed_reparse_is_critical() {
    let document = common::paragraph_only();
    let parse_errors = vec![weft::Issue::new(
        Severity::Error,
        weft::IssueKind::MalformedInput,
        "synthetic failure",
    )];
    let result = FidelityTester::new().compare(&document, &Document::placeholder(), &parse_errors, 0.0);
    assert!(!result.success);
    assert!(
        result
            .issues
            .iter()
            .any(|issue| issue.severity == Severity::Critical)
    );
}

// ============================================================================
// Unknown blocks survive HTML round trips as opaque data
// ============================================================================

#[test]
fn test_unknown_block_round_trips_through_html() {
    let document = common::with_unknown_block();
    let renderer = HtmlRenderer::new();
    let rendered = renderer
        .render(&document, &weft::RenderOptions::default())
        .unwrap();
    let parsed = renderer
        .parse(rendered.content.as_bytes(), &weft::ParseOptions::default())
        .unwrap();
    assert!(parsed.errors.is_empty());

    let has_unknown = parsed.document.contents().iter().any(|node| {
        matches!(
            node,
            weft::ContentNode::Block(block)
                if block.block_type == "https://example.org/vocabularies/interactive-quiz"
        )
    });
    assert!(has_unknown, "unknown block type did not survive");
}
