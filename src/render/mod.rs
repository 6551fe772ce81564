//! Renderer contracts: one-way rendering and the bidirectional extension.
//!
//! [`Renderer`] is the unidirectional contract: provided methods walk the
//! document tree in source order and dispatch to a handful of required
//! format-specific hooks. [`BidirectionalRenderer`] adds the inverse
//! operation (`parse`), external-format validation, metadata probing, and
//! round-trip fidelity testing on top.
//!
//! Renderers are pure with respect to their inputs: `render`, `parse`, and
//! `validate` never mutate the document or the options they are given, so
//! concurrent calls across different documents on one renderer are safe.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis;
use crate::document::{
    ContentBlock, ContentNode, Document, Run, SemanticText, StructuralContainer,
    validate_document,
};
use crate::error::{Error, Result};
use crate::fidelity::{FidelityTester, RoundTripResult};

/// Supported target formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Html,
    Markdown,
    Text,
    Docx,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Markdown => "markdown",
            Format::Text => "text",
            Format::Docx => "docx",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a reported issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// What kind of information an issue concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    ContentLoss,
    StructureMismatch,
    FormattingLoss,
    MetadataLoss,
    MalformedInput,
    InvalidFormat,
}

/// A single reported discrepancy or diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl Issue {
    pub fn new(severity: Severity, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            recommendation: None,
        }
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }
}

/// Statistics gathered while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMetrics {
    pub word_count: usize,
    pub block_count: usize,
    pub elapsed_ms: u64,
}

/// Output of a `render` call. Produced fresh per call, never persisted.
#[derive(Debug)]
pub struct RenderResult {
    pub content: String,
    pub metrics: Option<RenderMetrics>,
    pub errors: Vec<Issue>,
}

/// Output of a `parse` call.
///
/// On unparseable input `document` is the well-formed "Untitled Document"
/// placeholder (never absent) and `errors` is non-empty.
#[derive(Debug)]
pub struct ParseResult {
    pub document: Document,
    pub errors: Vec<Issue>,
}

/// Result of checking the external format's own well-formedness, independent
/// of canonical-model semantics.
#[derive(Debug, Clone)]
pub struct FormatValidationResult {
    pub valid: bool,
    pub errors: Vec<Issue>,
}

impl FormatValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            errors: vec![Issue::new(
                Severity::Error,
                IssueKind::InvalidFormat,
                message,
            )],
        }
    }
}

/// Lightweight probe of external content.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub format: Format,
    pub content_length: usize,
    pub analyzed_at: DateTime<Utc>,
    /// Format-specific enrichments (e.g. package entry counts).
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl DocumentMetadata {
    pub fn probe(format: Format, input: &[u8]) -> Self {
        Self {
            format,
            content_length: input.len(),
            analyzed_at: Utc::now(),
            attributes: HashMap::new(),
        }
    }
}

/// Caller-supplied override for rendering a single block type.
pub type BlockRenderFn = dyn Fn(&ContentBlock) -> String + Send + Sync;

/// Options for `render`.
#[derive(Default)]
pub struct RenderOptions {
    /// Map from block-type local name to a custom render function, consulted
    /// before built-in handling so callers can override per block type
    /// without subclassing a renderer.
    pub custom_renderers: HashMap<String, Box<BlockRenderFn>>,
}

impl RenderOptions {
    pub fn with_custom_renderer(
        mut self,
        local_name: impl Into<String>,
        render: impl Fn(&ContentBlock) -> String + Send + Sync + 'static,
    ) -> Self {
        self.custom_renderers
            .insert(local_name.into(), Box::new(render));
        self
    }
}

/// Options for `parse`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// When set, `validate` runs first and a failure short-circuits the
    /// parse with an error instead of producing a placeholder document.
    pub auto_validate: bool,
}

/// Options for `test_round_trip`.
#[derive(Debug, Clone, Copy)]
pub struct RoundTripOptions {
    /// Minimum fidelity score for the round trip to count as a success.
    pub threshold: f64,
}

impl Default for RoundTripOptions {
    fn default() -> Self {
        Self { threshold: 0.85 }
    }
}

/// Process-unique identity for a renderer instance, used by the plugin
/// registry to track attachments without owning renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RendererId(u64);

impl RendererId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        RendererId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handler invoked by [`RendererCore::handle_error`] in place of the default
/// logging behavior.
pub type ErrorHandler = Arc<dyn Fn(&Error, &str) + Send + Sync>;

/// State shared by every concrete renderer: instance identity, the lazily
/// constructed fidelity tester, and the configurable error handler.
#[derive(Default)]
pub struct RendererCore {
    id: OnceLock<RendererId>,
    tester: OnceLock<FidelityTester>,
    on_error: Option<ErrorHandler>,
}

impl RendererCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_handler(handler: ErrorHandler) -> Self {
        Self {
            on_error: Some(handler),
            ..Default::default()
        }
    }

    pub fn id(&self) -> RendererId {
        *self.id.get_or_init(RendererId::next)
    }

    /// The round-trip tester for this renderer, constructed on first use.
    pub fn tester(&self) -> &FidelityTester {
        self.tester.get_or_init(FidelityTester::default)
    }

    /// Delegate an error to the configured handler, or log it. Never
    /// swallows silently, never panics.
    pub fn handle_error(&self, error: &Error, operation: &str) {
        match &self.on_error {
            Some(handler) => handler(error, operation),
            None => log::error!("{operation} failed: {error}"),
        }
    }
}

impl std::fmt::Debug for RendererCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererCore")
            .field("id", &self.id.get())
            .field("has_error_handler", &self.on_error.is_some())
            .finish()
    }
}

/// The unidirectional rendering contract: walk a document (or any sub-tree)
/// and produce one target-format string.
///
/// Provided methods implement dispatch over the content tree; implementors
/// supply the format-specific hooks. An unrecognized block type must never
/// panic: [`Renderer::render_block_body`] falls back to best-effort text
/// extraction or a clearly marked unsupported placeholder.
pub trait Renderer {
    fn format(&self) -> Format;

    /// Shared per-instance state.
    fn core(&self) -> &RendererCore;

    /// Format-specific escaping of literal text.
    fn escape_text(&self, text: &str) -> String;

    /// Render one inline run, escaping included.
    fn render_run(&self, run: &Run) -> String;

    /// Built-in rendering of one content block at the given container depth.
    fn render_block_body(&self, block: &ContentBlock, depth: usize) -> String;

    /// Opening framing for a structural container (heading, tag, rule).
    fn container_prefix(&self, container: &StructuralContainer, depth: usize) -> String;

    /// Closing framing for a structural container.
    fn container_suffix(&self, container: &StructuralContainer, depth: usize) -> String;

    fn instance_id(&self) -> RendererId {
        self.core().id()
    }

    fn render_semantic_text(&self, text: &SemanticText) -> String {
        text.runs.iter().map(|run| self.render_run(run)).collect()
    }

    /// Render one block, consulting the caller's custom-renderer map before
    /// built-in handling.
    fn render_content_block(
        &self,
        block: &ContentBlock,
        options: &RenderOptions,
        depth: usize,
    ) -> String {
        if let Some(custom) = options.custom_renderers.get(block.local_name()) {
            return custom(block);
        }
        self.render_block_body(block, depth)
    }

    fn render_structural_container(
        &self,
        container: &StructuralContainer,
        options: &RenderOptions,
        depth: usize,
    ) -> String {
        let mut out = self.container_prefix(container, depth);
        out.push_str(&self.render_contents(&container.contents, options, depth + 1));
        out.push_str(&self.container_suffix(container, depth));
        out
    }

    /// Render a heterogeneous list of containers and blocks, preserving
    /// source order exactly.
    fn render_contents(
        &self,
        items: &[ContentNode],
        options: &RenderOptions,
        depth: usize,
    ) -> String {
        let mut out = String::new();
        for item in items {
            match item {
                ContentNode::Container(container) => {
                    out.push_str(&self.render_structural_container(container, options, depth));
                }
                ContentNode::Block(block) => {
                    out.push_str(&self.render_content_block(block, options, depth));
                }
            }
        }
        out
    }
}

/// The bidirectional contract: rendering plus the inverse operation, format
/// validation, metadata probing, and round-trip measurement.
pub trait BidirectionalRenderer: Renderer {
    /// Format-specific serialization, called only after document
    /// pre-validation has passed.
    fn write_document(&self, document: &Document, options: &RenderOptions) -> Result<String>;

    /// Format-specific deserialization back to the canonical model.
    fn parse_document(&self, input: &[u8], options: &ParseOptions) -> Result<Document>;

    /// Check the external format's own well-formedness.
    fn validate(&self, input: &[u8]) -> FormatValidationResult;

    /// Render a document, failing fast on structural invalidity.
    ///
    /// Pre-validation runs before any format-specific writer: a document
    /// missing `schemaVersion`, `bibliographicEntry`, `subject`, or
    /// `bodyMatter` is rejected naming the missing field.
    fn render(&self, document: &Document, options: &RenderOptions) -> Result<RenderResult> {
        validate_document(document)?;
        let start = Instant::now();
        let content = self
            .write_document(document, options)
            .inspect_err(|error| self.core().handle_error(error, "render"))?;
        let metrics = RenderMetrics {
            word_count: analysis::count_document_words(document),
            block_count: analysis::count_blocks(document),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        Ok(RenderResult {
            content,
            metrics: Some(metrics),
            errors: Vec::new(),
        })
    }

    /// Parse external content back to the canonical model.
    ///
    /// Unparseable input is recovered into a placeholder document plus
    /// reported errors so batch pipelines keep progressing. The exception:
    /// with [`ParseOptions::auto_validate`], a validation failure
    /// short-circuits with [`Error::FormatValidation`] and no partial
    /// document.
    fn parse(&self, input: &[u8], options: &ParseOptions) -> Result<ParseResult> {
        if options.auto_validate {
            let validation = self.validate(input);
            if !validation.valid {
                let message = validation
                    .errors
                    .first()
                    .map(|issue| issue.message.clone())
                    .unwrap_or_else(|| "input does not conform to the format".to_string());
                return Err(Error::FormatValidation(message));
            }
        }
        match self.parse_document(input, options) {
            Ok(document) => Ok(ParseResult {
                document,
                errors: Vec::new(),
            }),
            Err(error) => {
                self.core().handle_error(&error, "parse");
                Ok(ParseResult {
                    document: Document::placeholder(),
                    errors: vec![
                        Issue::new(Severity::Error, IssueKind::MalformedInput, error.to_string())
                            .with_recommendation(format!(
                                "check that the input is well-formed {}",
                                self.format()
                            )),
                    ],
                })
            }
        }
    }

    /// Probe external content without fully parsing it.
    fn metadata(&self, input: &[u8]) -> DocumentMetadata {
        DocumentMetadata::probe(self.format(), input)
    }

    /// Render the document, parse the renderer's own output, and score how
    /// much information survived. The tester is constructed lazily and
    /// cached on this instance.
    fn test_round_trip(
        &self,
        document: &Document,
        options: &RoundTripOptions,
    ) -> Result<RoundTripResult>
    where
        Self: Sized,
    {
        self.core().tester().test_document(self, document, options)
    }

    /// Report an operational error through the configured handler.
    fn handle_error(&self, error: &Error, operation: &str) {
        self.core().handle_error(error, operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_ids_are_unique() {
        let a = RendererCore::new();
        let b = RendererCore::new();
        assert_ne!(a.id(), b.id());
        // Stable across calls
        assert_eq!(a.id(), a.id());
    }

    #[test]
    fn test_format_round_trips_through_serde() {
        let json = serde_json::to_string(&Format::Docx).unwrap();
        assert_eq!(json, "\"docx\"");
        let back: Format = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Format::Docx);
    }

    #[test]
    fn test_custom_error_handler_receives_errors() {
        use std::sync::Mutex;
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let core = RendererCore::with_error_handler(Arc::new(move |error, operation| {
            sink.lock().unwrap().push(format!("{operation}: {error}"));
        }));
        core.handle_error(&Error::Parse("boom".to_string()), "parse");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("boom"));
    }
}
