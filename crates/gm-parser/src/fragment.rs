//! Fragment-merge recovery.
//!
//! Models sometimes answer with several disconnected blocks (a repeated
//! `"nodes": [...]`, a bare edge array after the object) instead of one
//! document. Each embedded array is decoded on its own and the successes are
//! concatenated in scan order.

use std::sync::LazyLock;

use gm_core::{Diagnostic, DiagnosticKind, RawEdge, RawGraph, RawNode, Stage};
use regex::Regex;
use serde_json::{Map, Value};

use crate::DiagnosticSink;

static NODES_FRAGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"nodes"\s*:\s*(\[.*?\])"#).expect("nodes fragment regex is valid")
});
static EDGES_FRAGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(?:"edges"\s*:\s*)?(\[\s*\{\s*"(?:from|to)"\s*:.*?\])"#)
        .expect("edges fragment regex is valid")
});

/// Decoding policy for individual fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentDecode {
    /// Strict JSON only.
    Json,
    /// Strict JSON, then JSON5 (trailing commas, single quotes, bare keys).
    JsonThenJson5,
}

/// Scan `text` for node and edge array fragments and merge what decodes.
///
/// The returned graph may have no nodes; the caller decides whether that is
/// terminal.
#[must_use]
pub fn merge_fragments(text: &str, decode: FragmentDecode) -> RawGraph {
    let mut sink = DiagnosticSink::new(usize::MAX);
    merge_fragments_into(text, decode, &mut sink)
}

pub(crate) fn merge_fragments_into(
    text: &str,
    decode: FragmentDecode,
    sink: &mut DiagnosticSink,
) -> RawGraph {
    let mut graph = RawGraph::default();

    for captures in NODES_FRAGMENT_RE.captures_iter(text) {
        let Some(body) = captures.get(1) else {
            continue;
        };
        if let Some(items) = decode_fragment(body.as_str(), "nodes", decode, sink) {
            graph
                .nodes
                .extend(items.into_iter().map(|item| RawNode::from_value(&item)));
        }
    }

    for captures in EDGES_FRAGMENT_RE.captures_iter(text) {
        let Some(body) = captures.get(1) else {
            continue;
        };
        if let Some(items) = decode_fragment(body.as_str(), "edges", decode, sink) {
            graph
                .edges
                .extend(items.into_iter().map(|item| RawEdge::from_value(&item)));
        }
    }

    graph
}

fn decode_fragment(
    body: &str,
    what: &str,
    decode: FragmentDecode,
    sink: &mut DiagnosticSink,
) -> Option<Vec<Value>> {
    let json_error = match serde_json::from_str::<Vec<Map<String, Value>>>(body) {
        Ok(objects) => return Some(objects.into_iter().map(Value::Object).collect()),
        Err(error) => error,
    };

    if decode == FragmentDecode::JsonThenJson5 {
        match json5::from_str::<Vec<Map<String, Value>>>(body) {
            Ok(objects) => {
                sink.push_with_snippet(
                    Diagnostic::info(
                        Stage::Fragment,
                        DiagnosticKind::FragmentLenientParse,
                        format!("{what} fragment decoded as JSON5 ({json_error})"),
                    ),
                    body,
                );
                return Some(objects.into_iter().map(Value::Object).collect());
            }
            Err(json5_error) => {
                sink.push_with_snippet(
                    Diagnostic::warning(
                        Stage::Fragment,
                        DiagnosticKind::FragmentParseSkip,
                        format!(
                            "skipped {what} fragment: JSON parse failed ({json_error}); \
                             JSON5 parse failed ({json5_error})"
                        ),
                    ),
                    body,
                );
                return None;
            }
        }
    }

    sink.push_with_snippet(
        Diagnostic::warning(
            Stage::Fragment,
            DiagnosticKind::FragmentParseSkip,
            format!("skipped {what} fragment: {json_error}"),
        ),
        body,
    );
    None
}
