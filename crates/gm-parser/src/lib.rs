#![forbid(unsafe_code)]

//! Graph recovery from free-form model output.
//!
//! [`recover`] runs a strict fallback chain over the text:
//!
//! 1. strip code fences and narrow to the outermost `{...}` span
//! 2. strict JSON decode
//! 3. textual repair, then strict decode again
//! 4. fragment merge over the raw model text
//!
//! The first stage that yields at least one node wins; its records are then
//! normalized into a [`Graph`]. Every recoverable problem along the way is
//! reported as a [`Diagnostic`] in the result and as a `tracing` event.

mod extract;
mod fragment;
mod graph_builder;
mod repair;
mod strict;

use gm_core::{
    Diagnostic, DiagnosticKind, Graph, GraphmendError, RawGraph, RecoveryConfig, Severity, Stage,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

pub use extract::{Extraction, extract_json_span};
pub use fragment::{FragmentDecode, merge_fragments};
pub use graph_builder::normalize_graph;
pub use repair::{RepairRule, Repaired, repair_json};
pub use strict::{StrictParseError, parse_strict};

/// Which parse stage produced the graph.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ParseOutcome {
    Strict,
    Repaired,
    FragmentMerged,
}

impl ParseOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Repaired => "repaired",
            Self::FragmentMerged => "fragment-merged",
        }
    }
}

/// States visited by one pipeline run. No state is visited twice.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum PipelineState {
    Extracted,
    StrictParsed,
    StrictFailed,
    Repaired,
    RepairFailed,
    FragmentRecovered,
    FragmentFailed,
    Normalized,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Recovery {
    pub graph: Graph,
    pub outcome: ParseOutcome,
    /// Transitions taken, starting at `Extracted` and ending at `Normalized`.
    pub path: Vec<PipelineState>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Recovery {
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }
}

/// Collects diagnostics for one run and mirrors each to `tracing`.
#[derive(Debug)]
pub(crate) struct DiagnosticSink {
    items: Vec<Diagnostic>,
    max_snippet_chars: usize,
}

impl DiagnosticSink {
    pub(crate) fn new(max_snippet_chars: usize) -> Self {
        Self {
            items: Vec::new(),
            max_snippet_chars,
        }
    }

    pub(crate) fn push(&mut self, diagnostic: Diagnostic) {
        let stage = diagnostic.stage.as_str();
        let kind = diagnostic.kind.as_str();
        match diagnostic.severity {
            Severity::Info => debug!(stage, kind, "{}", diagnostic.message),
            Severity::Warning | Severity::Error => warn!(stage, kind, "{}", diagnostic.message),
        }
        self.items.push(diagnostic);
    }

    pub(crate) fn push_with_snippet(&mut self, diagnostic: Diagnostic, snippet: &str) {
        let limit = self.max_snippet_chars;
        self.push(diagnostic.with_snippet(snippet, limit));
    }

    pub(crate) fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

/// Recover a graph with the default [`RecoveryConfig`].
pub fn recover(input: &str) -> Result<Recovery, GraphmendError> {
    recover_with_config(input, &RecoveryConfig::default())
}

/// Run the full recovery chain over `input`.
///
/// Fails only with [`GraphmendError::NoNodesRecovered`], when no stage yields a
/// node or every yielded node is dropped during normalization.
pub fn recover_with_config(
    input: &str,
    config: &RecoveryConfig,
) -> Result<Recovery, GraphmendError> {
    let mut sink = DiagnosticSink::new(config.max_snippet_chars);
    let mut path = vec![PipelineState::Extracted];

    let extraction = extract::extract_stage(input, &mut sink);

    let Some((raw, outcome)) = parse_chain(input, extraction.text, config, &mut sink, &mut path)
    else {
        return Err(GraphmendError::NoNodesRecovered {
            diagnostics: sink.into_vec(),
        });
    };

    let graph = graph_builder::normalize_into(&raw, &mut sink);
    if graph.is_empty() {
        sink.push(Diagnostic::warning(
            Stage::Normalize,
            DiagnosticKind::DroppedNode,
            "every recovered node was dropped during normalization",
        ));
        return Err(GraphmendError::NoNodesRecovered {
            diagnostics: sink.into_vec(),
        });
    }
    path.push(PipelineState::Normalized);

    info!(
        outcome = outcome.as_str(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "recovered graph"
    );

    Ok(Recovery {
        graph,
        outcome,
        path,
        diagnostics: sink.into_vec(),
    })
}

fn parse_chain(
    input: &str,
    extracted: &str,
    config: &RecoveryConfig,
    sink: &mut DiagnosticSink,
    path: &mut Vec<PipelineState>,
) -> Option<(RawGraph, ParseOutcome)> {
    if let Some(raw) = attempt_strict(extracted, Stage::Strict, sink) {
        path.push(PipelineState::StrictParsed);
        return Some((raw, ParseOutcome::Strict));
    }
    path.push(PipelineState::StrictFailed);

    let repaired = repair::repair_stage(extracted, sink);
    if repaired.changed() {
        if let Some(raw) = attempt_strict(&repaired.text, Stage::Repair, sink) {
            path.push(PipelineState::Repaired);
            return Some((raw, ParseOutcome::Repaired));
        }
    }
    path.push(PipelineState::RepairFailed);

    let decode = if config.lenient_fragments {
        FragmentDecode::JsonThenJson5
    } else {
        FragmentDecode::Json
    };
    let raw = fragment::merge_fragments_into(input, decode, sink);
    if raw.nodes.is_empty() {
        path.push(PipelineState::FragmentFailed);
        sink.push(Diagnostic::warning(
            Stage::Fragment,
            DiagnosticKind::FragmentParseSkip,
            "no node fragment could be recovered",
        ));
        return None;
    }
    path.push(PipelineState::FragmentRecovered);
    Some((raw, ParseOutcome::FragmentMerged))
}

/// Strict decode that only counts as success when it yields a node.
fn attempt_strict(text: &str, stage: Stage, sink: &mut DiagnosticSink) -> Option<RawGraph> {
    match strict::parse_strict(text) {
        Ok(raw) if !raw.nodes.is_empty() => Some(raw),
        Ok(_) => {
            sink.push(Diagnostic::info(
                stage,
                DiagnosticKind::SyntaxError,
                "document decoded but contained no nodes",
            ));
            None
        }
        Err(error) => {
            sink.push_with_snippet(
                Diagnostic::info(stage, DiagnosticKind::SyntaxError, error.to_string()),
                text,
            );
            None
        }
    }
}

/// Compact JSON summary of a run, for logs and tooling.
#[must_use]
pub fn recovery_evidence_json(recovery: &Recovery) -> String {
    json!({
        "outcome": recovery.outcome.as_str(),
        "node_count": recovery.graph.node_count(),
        "edge_count": recovery.graph.edge_count(),
        "diagnostic_count": recovery.diagnostics.len(),
        "warning_count": recovery.warning_count(),
    })
    .to_string()
}
