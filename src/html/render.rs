//! Document → HTML rendering (structural/accessibility subset).
//!
//! Output is XHTML-compatible: every element closed, void elements
//! self-closed, so the parser can rely on well-formed markup. Containers map
//! to `<section data-kind="…">`, the discriminant the parser reads back.

use crate::document::{BlockContent, ContentBlock, Run, StructuralContainer};
use crate::render::{Format, Renderer, RendererCore};

use super::HtmlRenderer;
use super::escape::{escape_attr, escape_html};

/// Heading level for a container title at the given depth; `<h1>` is
/// reserved for the document title.
pub(super) fn container_level(depth: usize) -> usize {
    (depth + 2).min(6)
}

impl Renderer for HtmlRenderer {
    fn format(&self) -> Format {
        Format::Html
    }

    fn core(&self) -> &RendererCore {
        &self.core
    }

    fn escape_text(&self, text: &str) -> String {
        escape_html(text)
    }

    fn render_run(&self, run: &Run) -> String {
        match run {
            Run::Text { text } => escape_html(text),
            Run::Emphasis { text } => format!("<em>{}</em>", escape_html(text)),
            Run::Strong { text } => format!("<strong>{}</strong>", escape_html(text)),
            Run::Code { text } => format!("<code>{}</code>", escape_html(text)),
            Run::Reference { text, target } => format!(
                "<a href=\"{}\">{}</a>",
                escape_attr(target),
                escape_html(text)
            ),
            Run::Citation { ref_id } => format!(
                "<cite data-ref=\"{}\">[{}]</cite>",
                escape_attr(ref_id),
                escape_html(ref_id)
            ),
            Run::MathInline { math } => {
                format!("<span class=\"math-inline\">{}</span>", escape_html(math))
            }
            Run::Unknown(value) => value
                .get("text")
                .and_then(serde_json::Value::as_str)
                .map(escape_html)
                .unwrap_or_default(),
        }
    }

    fn render_block_body(&self, block: &ContentBlock, depth: usize) -> String {
        match &block.content {
            BlockContent::Paragraph { text } => {
                format!("<p>{}</p>\n", self.render_semantic_text(text))
            }
            BlockContent::Heading { level, text } => {
                let level = level
                    .map(|l| usize::from(l).clamp(1, 6))
                    .unwrap_or(container_level(depth));
                format!(
                    "<h{level}>{}</h{level}>\n",
                    self.render_semantic_text(text)
                )
            }
            BlockContent::List { ordered, items } => {
                let tag = if *ordered { "ol" } else { "ul" };
                let mut out = format!("<{tag}>\n");
                for item in items {
                    out.push_str(&format!("<li>{}</li>\n", self.render_semantic_text(item)));
                }
                out.push_str(&format!("</{tag}>\n"));
                out
            }
            BlockContent::Blockquote { text, attribution } => {
                let mut out = String::from("<blockquote>\n");
                out.push_str(&format!("<p>{}</p>\n", self.render_semantic_text(text)));
                if let Some(attribution) = attribution {
                    out.push_str(&format!(
                        "<footer>{}</footer>\n",
                        self.render_semantic_text(attribution)
                    ));
                }
                out.push_str("</blockquote>\n");
                out
            }
            BlockContent::CodeBlock { code, language } => {
                let class = language
                    .as_deref()
                    .map(|language| format!(" class=\"language-{}\"", escape_attr(language)))
                    .unwrap_or_default();
                format!("<pre><code{class}>{}</code></pre>\n", escape_html(code))
            }
            BlockContent::MathBlock { math, .. } => {
                format!("<div class=\"math-block\">{}</div>\n", escape_html(math))
            }
            BlockContent::Table {
                caption,
                headers,
                rows,
            } => {
                let mut out = String::from("<table>\n");
                if let Some(caption) = caption {
                    out.push_str(&format!(
                        "<caption>{}</caption>\n",
                        self.render_semantic_text(caption)
                    ));
                }
                if !headers.is_empty() {
                    out.push_str("<thead>\n<tr>");
                    for header in headers {
                        out.push_str(&format!("<th>{}</th>", self.render_semantic_text(header)));
                    }
                    out.push_str("</tr>\n</thead>\n");
                }
                out.push_str("<tbody>\n");
                for row in rows {
                    out.push_str("<tr>");
                    for cell in row {
                        out.push_str(&format!("<td>{}</td>", self.render_semantic_text(cell)));
                    }
                    out.push_str("</tr>\n");
                }
                out.push_str("</tbody>\n</table>\n");
                out
            }
            BlockContent::Figure { src, alt, caption } => {
                let mut out = String::from("<figure>\n");
                out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\"/>\n",
                    escape_attr(src),
                    escape_attr(alt.as_deref().unwrap_or(""))
                ));
                if let Some(caption) = caption {
                    out.push_str(&format!(
                        "<figcaption>{}</figcaption>\n",
                        self.render_semantic_text(caption)
                    ));
                }
                out.push_str("</figure>\n");
                out
            }
            BlockContent::Unknown(value) => {
                let text = BlockContent::fallback_text(value)
                    .map(|text| self.render_semantic_text(&text))
                    .unwrap_or_default();
                format!(
                    "<div class=\"unsupported-block\" data-block-type=\"{}\">{}</div>\n",
                    escape_attr(&block.block_type),
                    text
                )
            }
        }
    }

    fn container_prefix(&self, container: &StructuralContainer, depth: usize) -> String {
        let kind = container.kind_at_depth(depth);
        let mut out = format!("<section data-kind=\"{}\">\n", kind.as_str());
        if let Some(title) = &container.title
            && !title.is_empty()
        {
            let level = container_level(depth);
            out.push_str(&format!(
                "<h{level}>{}</h{level}>\n",
                self.render_semantic_text(title)
            ));
        }
        out
    }

    fn container_suffix(&self, _container: &StructuralContainer, _depth: usize) -> String {
        "</section>\n".to_string()
    }
}
