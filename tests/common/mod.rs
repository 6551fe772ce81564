//! Shared document fixtures for integration tests.
#![allow(dead_code)]

use weft::{
    ContainerKind, ContentBlock, ContentNode, Document, Run, SemanticText, StructuralContainer,
};

/// A document exercising every block type the renderers fully support,
/// with explicit container kinds matching their depths.
pub fn rich_document() -> Document {
    let paragraph = ContentBlock::paragraph(SemanticText::from_runs(vec![
        Run::Text {
            text: "Plain prose with ".into(),
        },
        Run::Emphasis {
            text: "leaning".into(),
        },
        Run::Text {
            text: " and ".into(),
        },
        Run::Strong {
            text: "heavy".into(),
        },
        Run::Text {
            text: " words, a ".into(),
        },
        Run::Code {
            text: "snippet".into(),
        },
        Run::Text {
            text: ", a citation ".into(),
        },
        Run::Citation {
            ref_id: "knuth1984".into(),
        },
        Run::Text {
            text: " and math ".into(),
        },
        Run::MathInline {
            math: "x^2".into(),
        },
        Run::Text { text: ".".into() },
    ]));

    let reference_paragraph = ContentBlock::paragraph(SemanticText::from_runs(vec![
        Run::Text {
            text: "See ".into(),
        },
        Run::Reference {
            text: "the appendix".into(),
            target: "https://example.org/appendix".into(),
        },
        Run::Text {
            text: " for details.".into(),
        },
    ]));

    let list = ContentBlock::list(
        true,
        vec!["first step".into(), "second step".into(), "third step".into()],
    );

    let quote = ContentBlock::blockquote(
        SemanticText::plain("Measure twice, cut once."),
        Some(SemanticText::plain("A Carpenter")),
    );

    let code = ContentBlock::code_block("fn main() {\n    println!(\"hi\");\n}", Some("rust".into()));

    let table = ContentBlock::table(
        Some("Comparison of approaches".into()),
        vec!["Name".into(), "Cost".into()],
        vec![
            vec!["alpha".into(), "low".into()],
            vec!["beta".into(), "high".into()],
        ],
    );

    let math = ContentBlock::math_block("e^{i\\pi} + 1 = 0");

    let section = StructuralContainer::new(ContainerKind::Section, "Deep Section")
        .with_contents(vec![
            ContentNode::Block(code),
            ContentNode::Block(math),
        ]);

    let chapter = StructuralContainer::new(ContainerKind::Chapter, "First Chapter")
        .with_contents(vec![
            ContentNode::Block(paragraph),
            ContentNode::Block(list),
            ContentNode::Block(quote),
            ContentNode::Container(section),
        ]);

    let unit = StructuralContainer::new(ContainerKind::Unit, "Opening Unit").with_contents(vec![
        ContentNode::Block(reference_paragraph),
        ContentNode::Container(chapter),
        ContentNode::Block(table),
    ]);

    Document::new("The Complete Fixture")
        .with_subject("Testing")
        .with_contents(vec![ContentNode::Container(unit)])
}

/// A paragraph-only document, the minimal round-trip case.
pub fn paragraph_only() -> Document {
    Document::new("Plain Story").with_contents(vec![
        ContentNode::Block(ContentBlock::paragraph(
            "The first paragraph simply carries prose.",
        )),
        ContentNode::Block(ContentBlock::paragraph(
            "The second paragraph carries more of it.",
        )),
    ])
}

/// A document containing a block type no renderer knows.
pub fn with_unknown_block() -> Document {
    let unknown: ContentBlock = serde_json::from_str(
        r#"{
            "blockType": "https://example.org/vocabularies/interactive-quiz",
            "content": { "text": "Which way is up?", "choices": ["north", "out"] }
        }"#,
    )
    .unwrap();
    Document::new("Forward Compatible").with_contents(vec![
        ContentNode::Block(ContentBlock::paragraph("Known content first.")),
        ContentNode::Block(unknown),
    ])
}
