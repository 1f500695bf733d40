#![forbid(unsafe_code)]

mod config;

pub use config::MermaidRenderConfig;

use std::borrow::Cow;
use std::fmt::Write as _;

use gm_core::{Graph, LabelPolicy};

/// Render with the default configuration (`graph TD`, escaped labels).
#[must_use]
pub fn render_mermaid(graph: &Graph) -> String {
    render_mermaid_with_config(graph, &MermaidRenderConfig::default())
}

/// Serialize a normalized graph as Mermaid flowchart markup.
///
/// Node declarations come first in insertion order, then edges in insertion
/// order. Every line, the header included, ends with `\n`.
#[must_use]
pub fn render_mermaid_with_config(graph: &Graph, config: &MermaidRenderConfig) -> String {
    let mut out = String::with_capacity(16 + 24 * (graph.node_count() + graph.edge_count()));
    let _ = writeln!(out, "graph {}", config.direction.as_str());
    for (id, label) in &graph.nodes {
        let _ = writeln!(out, "  {id}[\"{}\"]", format_label(label, config.labels));
    }
    for edge in &graph.edges {
        let _ = writeln!(out, "  {} --> {}", edge.from, edge.to);
    }
    out
}

fn format_label(label: &str, policy: LabelPolicy) -> Cow<'_, str> {
    match policy {
        LabelPolicy::Escape => escape_label(label),
        LabelPolicy::Verbatim => Cow::Borrowed(label),
    }
}

/// Make a label safe inside `["..."]`: quotes become `#quot;` and line breaks
/// become `<br/>`. Labels without those characters are returned unchanged.
#[must_use]
pub fn escape_label(label: &str) -> Cow<'_, str> {
    if !label.contains(['"', '\n', '\r']) {
        return Cow::Borrowed(label);
    }
    let mut escaped = String::with_capacity(label.len() + 8);
    let mut chars = label.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => escaped.push_str("#quot;"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                escaped.push_str("<br/>");
            }
            '\n' => escaped.push_str("<br/>"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}
