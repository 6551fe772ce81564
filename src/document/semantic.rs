//! Rich inline text: ordered runs of typed spans.

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rich inline text as an ordered list of typed runs.
///
/// Run order is reading order. Unrecognized run types are preserved as
/// [`Run::Unknown`] so future vocabulary entries survive a round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticText {
    pub runs: Vec<Run>,
}

/// A single typed span inside a [`SemanticText`].
#[derive(Debug, Clone, PartialEq)]
pub enum Run {
    Text { text: String },
    Emphasis { text: String },
    Strong { text: String },
    Code { text: String },
    /// Cross-reference with a display label and a target URI/id.
    Reference { text: String, target: String },
    /// Citation by reference id; rendered per-format, no literal text of its own.
    Citation { ref_id: String },
    /// Inline math, stored as source notation.
    MathInline { math: String },
    /// Forward-compatible passthrough for unrecognized run types.
    Unknown(Value),
}

impl SemanticText {
    /// Build a single-run text from a plain string.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            runs: vec![Run::Text { text: text.into() }],
        }
    }

    pub fn from_runs(runs: Vec<Run>) -> Self {
        Self { runs }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Flatten to display text: every run that carries literal text
    /// contributes, references contribute their label, citations contribute
    /// a bracketed key, and math contributes its source notation.
    ///
    /// Display extraction and word counting are distinct operations; see
    /// [`countable_text`](Self::countable_text).
    pub fn display_text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            match run {
                Run::Text { text }
                | Run::Emphasis { text }
                | Run::Strong { text }
                | Run::Code { text }
                | Run::Reference { text, .. } => out.push_str(text),
                Run::Citation { ref_id } => {
                    out.push('[');
                    out.push_str(ref_id);
                    out.push(']');
                }
                Run::MathInline { math } => out.push_str(math),
                Run::Unknown(value) => {
                    if let Some(text) = value.get("text").and_then(Value::as_str) {
                        out.push_str(text);
                    }
                }
            }
        }
        out
    }

    /// Flatten to the text that participates in word counts.
    ///
    /// Citation and math runs are display-only and contribute nothing here.
    pub fn countable_text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            match run {
                Run::Text { text }
                | Run::Emphasis { text }
                | Run::Strong { text }
                | Run::Code { text }
                | Run::Reference { text, .. } => {
                    out.push_str(text);
                    out.push(' ');
                }
                Run::Citation { .. } | Run::MathInline { .. } | Run::Unknown(_) => {}
            }
        }
        out
    }
}

impl From<&str> for SemanticText {
    fn from(text: &str) -> Self {
        Self::plain(text)
    }
}

fn text_field(value: &Value) -> String {
    value
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl<'de> Deserialize<'de> for Run {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let kind = value.get("type").and_then(Value::as_str).unwrap_or("");
        Ok(match kind {
            "text" => Run::Text {
                text: text_field(&value),
            },
            "emphasis" => Run::Emphasis {
                text: text_field(&value),
            },
            "strong" => Run::Strong {
                text: text_field(&value),
            },
            "code" => Run::Code {
                text: text_field(&value),
            },
            "reference" => Run::Reference {
                text: text_field(&value),
                target: value
                    .get("ref")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            "citation" => Run::Citation {
                ref_id: value
                    .get("refId")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            "mathInline" => Run::MathInline {
                math: value
                    .get("math")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            _ => Run::Unknown(value),
        })
    }
}

impl Serialize for Run {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        fn tagged<S: Serializer>(
            serializer: S,
            kind: &str,
            fields: &[(&str, &str)],
        ) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(1 + fields.len()))?;
            map.serialize_entry("type", kind)?;
            for (key, value) in fields {
                map.serialize_entry(key, value)?;
            }
            map.end()
        }

        match self {
            Run::Text { text } => tagged(serializer, "text", &[("text", text)]),
            Run::Emphasis { text } => tagged(serializer, "emphasis", &[("text", text)]),
            Run::Strong { text } => tagged(serializer, "strong", &[("text", text)]),
            Run::Code { text } => tagged(serializer, "code", &[("text", text)]),
            Run::Reference { text, target } => {
                tagged(serializer, "reference", &[("text", text), ("ref", target)])
            }
            Run::Citation { ref_id } => tagged(serializer, "citation", &[("refId", ref_id)]),
            Run::MathInline { math } => tagged(serializer, "mathInline", &[("math", math)]),
            Run::Unknown(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SemanticText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(SemanticText::from_value(&value))
    }
}

impl SemanticText {
    /// Decode from a JSON value, accepting the canonical `{ "runs": [...] }`
    /// shape, a bare run array, or a plain-string shorthand.
    pub(crate) fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => SemanticText::plain(s.clone()),
            Value::Array(runs) => SemanticText {
                runs: decode_runs(runs),
            },
            Value::Object(map) => match map.get("runs").and_then(Value::as_array) {
                Some(runs) => SemanticText {
                    runs: decode_runs(runs),
                },
                None => SemanticText::default(),
            },
            _ => SemanticText::default(),
        }
    }
}

fn decode_runs(values: &[Value]) -> Vec<Run> {
    values
        .iter()
        .cloned()
        .map(|v| serde_json::from_value(v).unwrap_or(Run::Unknown(Value::Null)))
        .collect()
}

impl Serialize for SemanticText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("runs", &self.runs)?;
        map.end()
    }
}
