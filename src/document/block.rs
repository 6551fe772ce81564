//! Typed content blocks keyed by vocabulary URI.
//!
//! A [`ContentBlock`] carries a `blockType` URI and a payload decoded into
//! the [`BlockContent`] union. Unrecognized block types are preserved as
//! [`BlockContent::Unknown`] so documents using future vocabulary entries
//! round-trip as opaque data instead of failing.

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::semantic::SemanticText;

/// Core block vocabulary URIs.
pub mod vocab {
    pub const BASE: &str = "https://weft.dev/vocabularies/blocks/";

    pub const PARAGRAPH: &str = "https://weft.dev/vocabularies/blocks/paragraph";
    pub const HEADING: &str = "https://weft.dev/vocabularies/blocks/heading";
    pub const LIST: &str = "https://weft.dev/vocabularies/blocks/list";
    pub const BLOCKQUOTE: &str = "https://weft.dev/vocabularies/blocks/blockquote";
    pub const CODE_BLOCK: &str = "https://weft.dev/vocabularies/blocks/codeBlock";
    pub const MATH_BLOCK: &str = "https://weft.dev/vocabularies/blocks/mathBlock";
    pub const TABLE: &str = "https://weft.dev/vocabularies/blocks/table";
    pub const FIGURE: &str = "https://weft.dev/vocabularies/blocks/figure";
}

/// A leaf node carrying one typed content payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    pub id: Option<String>,
    /// Vocabulary URI selecting the content shape. Matching is by the local
    /// name (final path segment), so alternate URI bases stay readable.
    pub block_type: String,
    pub content: BlockContent,
}

/// Decoded block payload.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Paragraph {
        text: SemanticText,
    },
    Heading {
        /// Explicit level; when absent, renderers derive one from nesting depth.
        level: Option<u8>,
        text: SemanticText,
    },
    List {
        ordered: bool,
        items: Vec<SemanticText>,
    },
    Blockquote {
        text: SemanticText,
        attribution: Option<SemanticText>,
    },
    CodeBlock {
        code: String,
        language: Option<String>,
    },
    MathBlock {
        math: String,
        notation: Option<String>,
    },
    Table {
        caption: Option<SemanticText>,
        headers: Vec<SemanticText>,
        rows: Vec<Vec<SemanticText>>,
    },
    Figure {
        src: String,
        alt: Option<String>,
        caption: Option<SemanticText>,
    },
    /// Opaque passthrough for unrecognized block types.
    Unknown(Value),
}

impl ContentBlock {
    pub fn new(block_type: impl Into<String>, content: BlockContent) -> Self {
        Self {
            id: None,
            block_type: block_type.into(),
            content,
        }
    }

    pub fn paragraph(text: impl Into<SemanticText>) -> Self {
        Self::new(
            vocab::PARAGRAPH,
            BlockContent::Paragraph { text: text.into() },
        )
    }

    pub fn heading(level: u8, text: impl Into<SemanticText>) -> Self {
        Self::new(
            vocab::HEADING,
            BlockContent::Heading {
                level: Some(level),
                text: text.into(),
            },
        )
    }

    pub fn list(ordered: bool, items: Vec<SemanticText>) -> Self {
        Self::new(vocab::LIST, BlockContent::List { ordered, items })
    }

    pub fn blockquote(text: impl Into<SemanticText>, attribution: Option<SemanticText>) -> Self {
        Self::new(
            vocab::BLOCKQUOTE,
            BlockContent::Blockquote {
                text: text.into(),
                attribution,
            },
        )
    }

    pub fn code_block(code: impl Into<String>, language: Option<String>) -> Self {
        Self::new(
            vocab::CODE_BLOCK,
            BlockContent::CodeBlock {
                code: code.into(),
                language,
            },
        )
    }

    pub fn math_block(math: impl Into<String>) -> Self {
        Self::new(
            vocab::MATH_BLOCK,
            BlockContent::MathBlock {
                math: math.into(),
                notation: None,
            },
        )
    }

    pub fn table(
        caption: Option<SemanticText>,
        headers: Vec<SemanticText>,
        rows: Vec<Vec<SemanticText>>,
    ) -> Self {
        Self::new(
            vocab::TABLE,
            BlockContent::Table {
                caption,
                headers,
                rows,
            },
        )
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The final path segment of the block type URI, used for dispatch and
    /// for the caller-supplied custom renderer map.
    pub fn local_name(&self) -> &str {
        self.block_type
            .rsplit('/')
            .next()
            .unwrap_or(&self.block_type)
    }
}

impl BlockContent {
    /// Best-effort text for unknown payloads: scan for a field named `text`
    /// shaped like a [`SemanticText`] (object with runs, run array, or plain
    /// string). Returns `None` when nothing text-like is found.
    pub fn fallback_text(value: &Value) -> Option<SemanticText> {
        match value {
            Value::Object(map) => {
                if let Some(text) = map.get("text") {
                    let decoded = SemanticText::from_value(text);
                    if !decoded.is_empty() {
                        return Some(decoded);
                    }
                }
                map.values().find_map(Self::fallback_text)
            }
            Value::Array(items) => items.iter().find_map(Self::fallback_text),
            _ => None,
        }
    }

    fn decode(local_name: &str, value: Value) -> Self {
        match local_name {
            "paragraph" => BlockContent::Paragraph {
                text: semantic_field(&value, "text"),
            },
            "heading" => BlockContent::Heading {
                level: value
                    .get("level")
                    .and_then(Value::as_u64)
                    .map(|l| l.min(6) as u8),
                text: semantic_field(&value, "text"),
            },
            "list" => BlockContent::List {
                ordered: value.get("listType").and_then(Value::as_str) == Some("ordered"),
                items: value
                    .get("items")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().map(SemanticText::from_value).collect())
                    .unwrap_or_default(),
            },
            "blockquote" => BlockContent::Blockquote {
                text: semantic_field(&value, "text"),
                attribution: optional_semantic_field(&value, "attribution"),
            },
            "codeBlock" => BlockContent::CodeBlock {
                code: string_field(&value, "code"),
                language: optional_string_field(&value, "language"),
            },
            "mathBlock" => BlockContent::MathBlock {
                math: string_field(&value, "math"),
                notation: optional_string_field(&value, "notation"),
            },
            "table" => BlockContent::Table {
                caption: optional_semantic_field(&value, "caption"),
                headers: value
                    .get("headers")
                    .and_then(Value::as_array)
                    .map(|cells| cells.iter().map(SemanticText::from_value).collect())
                    .unwrap_or_default(),
                rows: value
                    .get("rows")
                    .and_then(Value::as_array)
                    .map(|rows| {
                        rows.iter()
                            .map(|row| {
                                row.as_array()
                                    .map(|cells| {
                                        cells.iter().map(SemanticText::from_value).collect()
                                    })
                                    .unwrap_or_default()
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            "figure" => BlockContent::Figure {
                src: string_field(&value, "src"),
                alt: optional_string_field(&value, "alt"),
                caption: optional_semantic_field(&value, "caption"),
            },
            _ => BlockContent::Unknown(value),
        }
    }

    fn encode(&self) -> Value {
        match self {
            BlockContent::Paragraph { text } => json!({ "text": text }),
            BlockContent::Heading { level, text } => {
                let mut map = Map::new();
                if let Some(level) = level {
                    map.insert("level".into(), json!(level));
                }
                map.insert("text".into(), json!(text));
                Value::Object(map)
            }
            BlockContent::List { ordered, items } => json!({
                "listType": if *ordered { "ordered" } else { "unordered" },
                "items": items,
            }),
            BlockContent::Blockquote { text, attribution } => {
                let mut map = Map::new();
                map.insert("text".into(), json!(text));
                if let Some(attribution) = attribution {
                    map.insert("attribution".into(), json!(attribution));
                }
                Value::Object(map)
            }
            BlockContent::CodeBlock { code, language } => {
                let mut map = Map::new();
                map.insert("code".into(), json!(code));
                if let Some(language) = language {
                    map.insert("language".into(), json!(language));
                }
                Value::Object(map)
            }
            BlockContent::MathBlock { math, notation } => {
                let mut map = Map::new();
                map.insert("math".into(), json!(math));
                if let Some(notation) = notation {
                    map.insert("notation".into(), json!(notation));
                }
                Value::Object(map)
            }
            BlockContent::Table {
                caption,
                headers,
                rows,
            } => {
                let mut map = Map::new();
                if let Some(caption) = caption {
                    map.insert("caption".into(), json!(caption));
                }
                map.insert("headers".into(), json!(headers));
                map.insert("rows".into(), json!(rows));
                Value::Object(map)
            }
            BlockContent::Figure { src, alt, caption } => {
                let mut map = Map::new();
                map.insert("src".into(), json!(src));
                if let Some(alt) = alt {
                    map.insert("alt".into(), json!(alt));
                }
                if let Some(caption) = caption {
                    map.insert("caption".into(), json!(caption));
                }
                Value::Object(map)
            }
            BlockContent::Unknown(value) => value.clone(),
        }
    }
}

fn semantic_field(value: &Value, field: &str) -> SemanticText {
    value
        .get(field)
        .map(SemanticText::from_value)
        .unwrap_or_default()
}

fn optional_semantic_field(value: &Value, field: &str) -> Option<SemanticText> {
    value.get(field).map(SemanticText::from_value)
}

fn string_field(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn optional_string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let block_type = value
            .get("blockType")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let local = block_type.rsplit('/').next().unwrap_or("").to_string();
        let content_value = value.get("content").cloned().unwrap_or(Value::Null);
        Ok(ContentBlock {
            id,
            block_type,
            content: BlockContent::decode(&local, content_value),
        })
    }
}

impl Serialize for ContentBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(id) = &self.id {
            map.serialize_entry("id", id)?;
        }
        map.serialize_entry("blockType", &self.block_type)?;
        map.serialize_entry("content", &self.content.encode())?;
        map.end()
    }
}
