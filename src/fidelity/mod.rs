//! Round-trip fidelity measurement.
//!
//! Exact equality across a render+parse cycle is not achievable — formats
//! normalize or drop information — so the tester scores three independent
//! dimensions and combines them into one documented, weighted scalar.

use std::collections::HashMap;

use serde::Serialize;

use crate::document::{BlockContent, ContentNode, Document, Run, SemanticText};
use crate::error::Result;
use crate::render::{
    BidirectionalRenderer, Issue, IssueKind, ParseOptions, RenderOptions, RoundTripOptions,
    Severity,
};

/// Weights combining the three fidelity dimensions into one score.
///
/// Content dominates because text survival is what downstream consumers
/// depend on; structure outweighs formatting because container shape drives
/// navigation. Callers may substitute their own weights; they are normalized
/// before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FidelityWeights {
    pub content: f64,
    pub structure: f64,
    pub formatting: f64,
}

impl Default for FidelityWeights {
    fn default() -> Self {
        Self {
            content: 0.5,
            structure: 0.3,
            formatting: 0.2,
        }
    }
}

impl FidelityWeights {
    fn combine(&self, content: f64, structure: f64, formatting: f64) -> f64 {
        let total = self.content + self.structure + self.formatting;
        if total <= 0.0 {
            return 0.0;
        }
        (self.content * content + self.structure * structure + self.formatting * formatting)
            / total
    }
}

/// Outcome of a round-trip fidelity test. Every score is in [0, 1];
/// `success` is false whenever any issue is critical, regardless of score.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundTripResult {
    pub success: bool,
    pub fidelity_score: f64,
    pub content_fidelity: f64,
    pub structure_fidelity: f64,
    pub formatting_fidelity: f64,
    pub issues: Vec<Issue>,
}

/// Scores render→parse cycles for information preservation.
#[derive(Debug, Clone, Default)]
pub struct FidelityTester {
    weights: FidelityWeights,
}

impl FidelityTester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: FidelityWeights) -> Self {
        Self { weights }
    }

    /// Render the document with the given renderer, parse the renderer's own
    /// output, and score the comparison.
    pub fn test_document(
        &self,
        renderer: &dyn BidirectionalRenderer,
        document: &Document,
        options: &RoundTripOptions,
    ) -> Result<RoundTripResult> {
        let rendered = renderer.render(document, &RenderOptions::default())?;
        let parsed = renderer.parse(rendered.content.as_bytes(), &ParseOptions::default())?;
        Ok(self.compare(document, &parsed.document, &parsed.errors, options.threshold))
    }

    /// Compare an original document against its reparsed counterpart.
    pub fn compare(
        &self,
        original: &Document,
        reparsed: &Document,
        parse_errors: &[Issue],
        threshold: f64,
    ) -> RoundTripResult {
        let mut issues: Vec<Issue> = Vec::new();

        if !parse_errors.is_empty() {
            issues.push(
                Issue::new(
                    Severity::Critical,
                    IssueKind::MalformedInput,
                    "renderer output failed to re-parse",
                )
                .with_recommendation("inspect the renderer's writer for malformed output"),
            );
            issues.extend(parse_errors.iter().cloned());
        }

        let content = content_fidelity(original, reparsed);
        let structure = structure_fidelity(original, reparsed);
        let formatting = formatting_fidelity(original, reparsed);

        if content < 0.995 {
            let severity = if content < 0.5 {
                Severity::Error
            } else {
                Severity::Warning
            };
            issues.push(
                Issue::new(
                    severity,
                    IssueKind::ContentLoss,
                    format!("only {:.0}% of text content survived", content * 100.0),
                )
                .with_recommendation("verify that every text-bearing block maps to the format"),
            );
        }
        if structure < 0.995 {
            issues.push(Issue::new(
                Severity::Warning,
                IssueKind::StructureMismatch,
                format!(
                    "container nesting or block ordering changed (similarity {structure:.2})"
                ),
            ));
        }
        if formatting < 0.995 {
            issues.push(
                Issue::new(
                    Severity::Info,
                    IssueKind::FormattingLoss,
                    format!("inline or structural formatting degraded (similarity {formatting:.2})"),
                )
                .with_recommendation("some inline markers may not be representable in this format"),
            );
        }
        if original.title() != reparsed.title() {
            issues.push(Issue::new(
                Severity::Warning,
                IssueKind::MetadataLoss,
                format!(
                    "title changed from {:?} to {:?}",
                    original.title(),
                    reparsed.title()
                ),
            ));
        }

        let score = self.weights.combine(content, structure, formatting);
        let has_critical = issues
            .iter()
            .any(|issue| issue.severity == Severity::Critical);

        RoundTripResult {
            success: score >= threshold && !has_critical,
            fidelity_score: score,
            content_fidelity: content,
            structure_fidelity: structure,
            formatting_fidelity: formatting,
            issues,
        }
    }
}

// ============================================================================
// Content dimension: normalized token overlap
// ============================================================================

fn normalize_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|token| !token.is_empty())
        .collect()
}

/// Sørensen–Dice coefficient over token multisets, tolerant of whitespace
/// and punctuation normalization.
fn dice(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in a {
        *counts.entry(token).or_default() += 1;
    }
    let mut overlap = 0usize;
    for token in b {
        if let Some(count) = counts.get_mut(token.as_str())
            && *count > 0
        {
            *count -= 1;
            overlap += 1;
        }
    }
    2.0 * overlap as f64 / (a.len() + b.len()) as f64
}

fn content_fidelity(original: &Document, reparsed: &Document) -> f64 {
    let a = normalize_tokens(&crate::analysis::extract_plain_text(original));
    let b = normalize_tokens(&crate::analysis::extract_plain_text(reparsed));
    dice(&a, &b)
}

// ============================================================================
// Structure dimension: depth, per-type counts, ordering
// ============================================================================

#[derive(Default)]
struct StructureProfile {
    max_depth: usize,
    /// Container kinds and block local names in reading order.
    sequence: Vec<String>,
    counts: HashMap<String, usize>,
}

fn structure_profile(document: &Document) -> StructureProfile {
    let mut profile = StructureProfile::default();
    walk_structure(document.contents(), 0, &mut profile);
    profile
}

fn walk_structure(nodes: &[ContentNode], depth: usize, profile: &mut StructureProfile) {
    for node in nodes {
        match node {
            ContentNode::Container(container) => {
                profile.max_depth = profile.max_depth.max(depth + 1);
                let key = format!("container:{}", container.kind_at_depth(depth).as_str());
                *profile.counts.entry(key.clone()).or_default() += 1;
                profile.sequence.push(key);
                walk_structure(&container.contents, depth + 1, profile);
            }
            ContentNode::Block(block) => {
                let key = format!("block:{}", block.local_name());
                *profile.counts.entry(key.clone()).or_default() += 1;
                profile.sequence.push(key);
            }
        }
    }
}

/// Length of the longest common subsequence.
fn lcs_len(a: &[String], b: &[String]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for item_a in a {
        for (j, item_b) in b.iter().enumerate() {
            current[j + 1] = if item_a == item_b {
                prev[j] + 1
            } else {
                prev[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

fn multiset_similarity(a: &HashMap<String, usize>, b: &HashMap<String, usize>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let mut min_sum = 0usize;
    let mut max_sum = 0usize;
    let keys: std::collections::HashSet<&String> = a.keys().chain(b.keys()).collect();
    for key in keys {
        let count_a = a.get(key).copied().unwrap_or(0);
        let count_b = b.get(key).copied().unwrap_or(0);
        min_sum += count_a.min(count_b);
        max_sum += count_a.max(count_b);
    }
    if max_sum == 0 {
        1.0
    } else {
        min_sum as f64 / max_sum as f64
    }
}

fn structure_fidelity(original: &Document, reparsed: &Document) -> f64 {
    let a = structure_profile(original);
    let b = structure_profile(reparsed);

    let depth = if a.max_depth == 0 && b.max_depth == 0 {
        1.0
    } else {
        1.0 - (a.max_depth as f64 - b.max_depth as f64).abs()
            / a.max_depth.max(b.max_depth) as f64
    };

    let counts = multiset_similarity(&a.counts, &b.counts);

    let order = if a.sequence.is_empty() && b.sequence.is_empty() {
        1.0
    } else {
        lcs_len(&a.sequence, &b.sequence) as f64 / a.sequence.len().max(b.sequence.len()) as f64
    };

    (depth + counts + order) / 3.0
}

// ============================================================================
// Formatting dimension: preserved inline and structural markers
// ============================================================================

fn formatting_profile(document: &Document) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    walk_formatting(document.contents(), &mut counts);
    counts
}

fn bump(counts: &mut HashMap<String, usize>, key: &str) {
    *counts.entry(key.to_string()).or_default() += 1;
}

fn count_runs(text: &SemanticText, counts: &mut HashMap<String, usize>) {
    for run in &text.runs {
        match run {
            Run::Emphasis { .. } => bump(counts, "emphasis"),
            Run::Strong { .. } => bump(counts, "strong"),
            Run::Code { .. } => bump(counts, "code-span"),
            Run::Reference { .. } => bump(counts, "reference"),
            Run::Citation { .. } => bump(counts, "citation"),
            Run::MathInline { .. } => bump(counts, "math-inline"),
            Run::Text { .. } | Run::Unknown(_) => {}
        }
    }
}

fn walk_formatting(nodes: &[ContentNode], counts: &mut HashMap<String, usize>) {
    for node in nodes {
        match node {
            ContentNode::Container(container) => {
                if let Some(title) = &container.title {
                    count_runs(title, counts);
                }
                walk_formatting(&container.contents, counts);
            }
            ContentNode::Block(block) => match &block.content {
                BlockContent::Paragraph { text } | BlockContent::Heading { text, .. } => {
                    count_runs(text, counts);
                }
                BlockContent::List { ordered, items } => {
                    bump(counts, if *ordered { "ordered-list" } else { "unordered-list" });
                    for item in items {
                        count_runs(item, counts);
                    }
                }
                BlockContent::Blockquote { text, attribution } => {
                    bump(counts, "blockquote");
                    count_runs(text, counts);
                    if let Some(attribution) = attribution {
                        count_runs(attribution, counts);
                    }
                }
                BlockContent::CodeBlock { .. } => bump(counts, "code-block"),
                BlockContent::MathBlock { .. } => bump(counts, "math-block"),
                BlockContent::Table { headers, rows, .. } => {
                    bump(counts, "table");
                    for cell in headers.iter().chain(rows.iter().flatten()) {
                        count_runs(cell, counts);
                    }
                }
                BlockContent::Figure { .. } => bump(counts, "figure"),
                BlockContent::Unknown(_) => {}
            },
        }
    }
}

fn formatting_fidelity(original: &Document, reparsed: &Document) -> f64 {
    multiset_similarity(&formatting_profile(original), &formatting_profile(reparsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ContainerKind, ContentBlock, StructuralContainer};

    fn doc_with(nodes: Vec<ContentNode>) -> Document {
        Document::new("Fidelity Fixture").with_contents(nodes)
    }

    fn sample() -> Document {
        doc_with(vec![ContentNode::Container(
            StructuralContainer::new(ContainerKind::Chapter, "Chapter One").with_contents(vec![
                ContentNode::Block(ContentBlock::paragraph(SemanticText::from_runs(vec![
                    Run::Text {
                        text: "Plain and ".into(),
                    },
                    Run::Emphasis {
                        text: "emphasized".into(),
                    },
                ]))),
            ]),
        )])
    }

    #[test]
    fn test_identical_documents_score_one() {
        let document = sample();
        let result = FidelityTester::new().compare(&document, &document.clone(), &[], 0.85);
        assert!(result.success);
        assert_eq!(result.content_fidelity, 1.0);
        assert_eq!(result.structure_fidelity, 1.0);
        assert_eq!(result.formatting_fidelity, 1.0);
        assert_eq!(result.fidelity_score, 1.0);
    }

    #[test]
    fn test_critical_issue_forces_failure() {
        let document = sample();
        let parse_errors = vec![Issue::new(
            Severity::Error,
            IssueKind::MalformedInput,
            "bad input",
        )];
        let result =
            FidelityTester::new().compare(&document, &document.clone(), &parse_errors, 0.0);
        // Perfect scores, but the failed self-parse is critical
        assert!(!result.success);
        assert!(result
            .issues
            .iter()
            .any(|issue| issue.severity == Severity::Critical));
    }

    #[test]
    fn test_stripping_emphasis_only_lowers_formatting() {
        let original = sample();
        let mut stripped = original.clone();
        if let Some(body) = &mut stripped.body_matter
            && let ContentNode::Container(container) = &mut body.contents[0]
            && let ContentNode::Block(block) = &mut container.contents[0]
            && let BlockContent::Paragraph { text } = &mut block.content
        {
            text.runs = vec![Run::Text {
                text: "Plain and emphasized".into(),
            }];
        }

        let result = FidelityTester::new().compare(&original, &stripped, &[], 0.85);
        assert_eq!(result.structure_fidelity, 1.0);
        assert_eq!(result.content_fidelity, 1.0);
        assert!(result.formatting_fidelity < 1.0);
    }

    #[test]
    fn test_dice_edge_cases() {
        assert_eq!(dice(&[], &[]), 1.0);
        assert_eq!(dice(&["a".into()], &[]), 0.0);
        let a = vec!["one".to_string(), "two".to_string()];
        assert_eq!(dice(&a, &a), 1.0);
    }

    #[test]
    fn test_lcs_ordering() {
        let a: Vec<String> = ["p", "q", "r"].iter().map(|s| s.to_string()).collect();
        let b: Vec<String> = ["p", "r"].iter().map(|s| s.to_string()).collect();
        assert_eq!(lcs_len(&a, &b), 2);
        assert_eq!(lcs_len(&a, &a), 3);
        assert_eq!(lcs_len(&a, &[]), 0);
    }

    #[test]
    fn test_weights_are_documented_defaults() {
        let weights = FidelityWeights::default();
        assert_eq!(weights.content, 0.5);
        assert_eq!(weights.structure, 0.3);
        assert_eq!(weights.formatting, 0.2);
        // Half-lost content with perfect structure/formatting
        let score = weights.combine(0.5, 1.0, 1.0);
        assert!((score - 0.75).abs() < 1e-9);
    }
}
