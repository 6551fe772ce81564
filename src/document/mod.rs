//! The canonical document model.
//!
//! A document is a tree: structural containers (units, chapters, sections)
//! hold further containers or typed content blocks, and all human-readable
//! text is [`SemanticText`]. The model is a JSON contract owned by callers;
//! render, parse, and validate never mutate a document they are given.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

mod block;
mod semantic;

pub use block::{BlockContent, ContentBlock, vocab};
pub use semantic::{Run, SemanticText};

/// Title used for the placeholder document produced when parsing fails.
pub const UNTITLED: &str = "Untitled Document";

/// A canonical structured document.
///
/// The four required fields are optional at the type level because the
/// external JSON contract allows them to be absent; [`validate_document`]
/// rejects such documents by naming the missing field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibliographic_entry: Option<BibliographicEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_matter: Option<BodyMatter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_matter: Option<FrontMatter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_matter: Option<BackMatter>,
}

/// Bibliographic metadata in CSL-like shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BibliographicEntry {
    #[serde(rename = "type", default)]
    pub entry_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author: Vec<Contributor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl Contributor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            literal: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn display_name(&self) -> String {
        if let Some(literal) = &self.literal {
            return literal.clone();
        }
        match (&self.given, &self.family) {
            (Some(given), Some(family)) => format!("{given} {family}"),
            (None, Some(family)) => family.clone(),
            (Some(given), None) => given.clone(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyMatter {
    #[serde(default)]
    pub contents: Vec<ContentNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontMatter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preface: Vec<ContentNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acknowledgments: Vec<ContentNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackMatter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub appendices: Vec<ContentNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub glossary: Vec<GlossaryEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bibliography: Vec<BibliographicEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index: Vec<IndexEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub definition: SemanticText,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(default)]
    pub term: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locators: Vec<String>,
}

/// Either a nested structural container or a leaf content block.
///
/// Classification is purely by shape: the presence of `blockType` marks a
/// block, anything else is a container. Source order is preserved exactly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentNode {
    Container(StructuralContainer),
    Block(ContentBlock),
}

impl<'de> Deserialize<'de> for ContentNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.get("blockType").is_some() {
            let block = serde_json::from_value(value).map_err(serde::de::Error::custom)?;
            Ok(ContentNode::Block(block))
        } else {
            let container = serde_json::from_value(value).map_err(serde::de::Error::custom)?;
            Ok(ContentNode::Container(container))
        }
    }
}

/// The kind of a structural container, carried as an explicit discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Unit,
    Chapter,
    Section,
}

impl ContainerKind {
    /// Kind inferred from nesting depth, used when the incoming JSON omits
    /// the discriminant. Depth 0 is a unit, 1 a chapter, deeper a section.
    pub fn from_depth(depth: usize) -> Self {
        match depth {
            0 => ContainerKind::Unit,
            1 => ContainerKind::Chapter,
            _ => ContainerKind::Section,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContainerKind::Unit => "unit",
            ContainerKind::Chapter => "chapter",
            ContainerKind::Section => "section",
        }
    }
}

/// A unit, chapter, or section grouping other containers or content blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralContainer {
    #[serde(rename = "containerType", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContainerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<SemanticText>,
    #[serde(default)]
    pub contents: Vec<ContentNode>,
}

impl StructuralContainer {
    pub fn new(kind: ContainerKind, title: impl Into<SemanticText>) -> Self {
        Self {
            kind: Some(kind),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn with_contents(mut self, contents: Vec<ContentNode>) -> Self {
        self.contents = contents;
        self
    }

    /// The explicit kind when present, otherwise inferred from depth.
    pub fn kind_at_depth(&self, depth: usize) -> ContainerKind {
        self.kind.unwrap_or_else(|| ContainerKind::from_depth(depth))
    }
}

impl Document {
    /// A minimal valid document with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            schema_version: Some("1.0.0".to_string()),
            bibliographic_entry: Some(BibliographicEntry {
                entry_type: "book".to_string(),
                title: title.into(),
                ..Default::default()
            }),
            subject: Some("General".to_string()),
            body_matter: Some(BodyMatter::default()),
            front_matter: None,
            back_matter: None,
        }
    }

    /// The well-formed placeholder returned when external content cannot be
    /// parsed: titled "Untitled Document", empty body.
    pub fn placeholder() -> Self {
        Self::new(UNTITLED)
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_contents(mut self, contents: Vec<ContentNode>) -> Self {
        self.body_matter = Some(BodyMatter { contents });
        self
    }

    pub fn title(&self) -> &str {
        self.bibliographic_entry
            .as_ref()
            .map(|entry| entry.title.as_str())
            .unwrap_or("")
    }

    /// Body contents, or an empty slice when `bodyMatter` is absent.
    pub fn contents(&self) -> &[ContentNode] {
        self.body_matter
            .as_ref()
            .map(|body| body.contents.as_slice())
            .unwrap_or(&[])
    }
}

/// Pre-render validation: reject a document missing any required top-level
/// field, naming the field. Runs before any format-specific writer.
pub fn validate_document(document: &Document) -> Result<()> {
    if document
        .schema_version
        .as_deref()
        .is_none_or(|v| v.is_empty())
    {
        return Err(Error::DocumentStructure("schemaVersion".to_string()));
    }
    if document.bibliographic_entry.is_none() {
        return Err(Error::DocumentStructure("bibliographicEntry".to_string()));
    }
    if document.subject.as_deref().is_none_or(|s| s.is_empty()) {
        return Err(Error::DocumentStructure("subject".to_string()));
    }
    if document.body_matter.is_none() {
        return Err(Error::DocumentStructure("bodyMatter".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_node_classification_by_shape() {
        let json = r#"[
            { "title": "A Section", "contents": [] },
            { "blockType": "https://weft.dev/vocabularies/blocks/paragraph",
              "content": { "text": "hello" } }
        ]"#;
        let nodes: Vec<ContentNode> = serde_json::from_str(json).unwrap();
        assert!(matches!(nodes[0], ContentNode::Container(_)));
        assert!(matches!(nodes[1], ContentNode::Block(_)));
    }

    #[test]
    fn test_order_preserved() {
        let json = r#"[
            { "blockType": "x/paragraph", "content": { "text": "one" } },
            { "title": "mid", "contents": [] },
            { "blockType": "x/paragraph", "content": { "text": "two" } }
        ]"#;
        let nodes: Vec<ContentNode> = serde_json::from_str(json).unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[1], ContentNode::Container(_)));
    }

    #[test]
    fn test_kind_inference_from_depth() {
        let container = StructuralContainer::default();
        assert_eq!(container.kind_at_depth(0), ContainerKind::Unit);
        assert_eq!(container.kind_at_depth(1), ContainerKind::Chapter);
        assert_eq!(container.kind_at_depth(5), ContainerKind::Section);

        let explicit = StructuralContainer::new(ContainerKind::Chapter, "C");
        assert_eq!(explicit.kind_at_depth(0), ContainerKind::Chapter);
    }

    #[test]
    fn test_validate_names_missing_field() {
        let mut document = Document::new("T");
        document.body_matter = None;
        match validate_document(&document) {
            Err(Error::DocumentStructure(field)) => assert_eq!(field, "bodyMatter"),
            other => panic!("expected structure error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_accepts_minimal_document() {
        let json = r#"{
            "schemaVersion": "0.3.0",
            "bibliographicEntry": { "type": "book", "title": "T" },
            "subject": "S",
            "bodyMatter": { "contents": [] }
        }"#;
        let document: Document = serde_json::from_str(json).unwrap();
        assert!(validate_document(&document).is_ok());
        assert_eq!(document.title(), "T");
    }

    #[test]
    fn test_placeholder_is_valid() {
        let placeholder = Document::placeholder();
        assert!(validate_document(&placeholder).is_ok());
        assert_eq!(placeholder.title(), UNTITLED);
        assert!(placeholder.contents().is_empty());
    }
}
