#![forbid(unsafe_code)]

mod ident;

pub use ident::{canonical_id, is_canonical_id};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Node record as decoded from model output. Either field may be missing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RawNode {
    pub id: Option<String>,
    pub label: Option<String>,
}

impl RawNode {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            label: Some(label.into()),
        }
    }

    /// Decode a node from an arbitrary JSON value. Non-objects decode to an
    /// all-absent record.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: text_field(value, "id"),
            label: text_field(value, "label"),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.id.is_some() && self.label.is_some()
    }
}

/// Edge record as decoded from model output. Either endpoint may be missing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RawEdge {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl RawEdge {
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
        }
    }

    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            from: text_field(value, "from"),
            to: text_field(value, "to"),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }
}

/// Reads a string-like field. Non-empty strings and numbers (including `0`)
/// count as present; everything else counts as absent.
fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Unvalidated graph produced by one of the parse stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RawGraph {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
}

impl RawGraph {
    /// Decode `{"nodes": [...], "edges": [...]}`. Missing or non-array fields
    /// become empty sequences. Returns `None` if the value is not an object.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let nodes = object
            .get("nodes")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(RawNode::from_value).collect())
            .unwrap_or_default();
        let edges = object
            .get("edges")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(RawEdge::from_value).collect())
            .unwrap_or_default();
        Some(Self { nodes, edges })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

/// Normalized graph: canonical ids, unique nodes, no dangling edge endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Graph {
    /// Canonical id to label, in first-seen order.
    pub nodes: IndexMap<String, String>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn label(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(String::as_str)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Endpoints that are not declared nodes. Empty for any graph built by
    /// the normalizer.
    #[must_use]
    pub fn dangling_endpoints(&self) -> Vec<&str> {
        self.edges
            .iter()
            .flat_map(|edge| [edge.from.as_str(), edge.to.as_str()])
            .filter(|id| !self.nodes.contains_key(*id))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GraphDirection {
    #[default]
    TD,
    TB,
    BT,
    LR,
    RL,
}

impl GraphDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TD => "TD",
            Self::TB => "TB",
            Self::BT => "BT",
            Self::LR => "LR",
            Self::RL => "RL",
        }
    }
}

impl std::str::FromStr for GraphDirection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TD" => Ok(Self::TD),
            "TB" => Ok(Self::TB),
            "BT" => Ok(Self::BT),
            "LR" => Ok(Self::LR),
            "RL" => Ok(Self::RL),
            other => Err(format!("unknown graph direction: {other}")),
        }
    }
}

/// How label text is embedded in the rendered markup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LabelPolicy {
    /// Replace characters that would break the quoted label with Mermaid
    /// entity codes.
    #[default]
    Escape,
    /// Embed labels literally.
    Verbatim,
}

/// Knobs for the recovery stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Retry fragments that fail strict JSON with a JSON5 decoder.
    pub lenient_fragments: bool,
    /// Maximum characters of offending text kept in a diagnostic snippet.
    pub max_snippet_chars: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            lenient_fragments: true,
            max_snippet_chars: 80,
        }
    }
}

/// Pipeline stage that emitted a diagnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Stage {
    Extract,
    Strict,
    Repair,
    Fragment,
    Normalize,
    Render,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Strict => "strict",
            Self::Repair => "repair",
            Self::Fragment => "fragment",
            Self::Normalize => "normalize",
            Self::Render => "render",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// No `{...}` span could be isolated.
    MalformedInput,
    /// A whole-document decode was rejected.
    SyntaxError,
    /// A textual fixup changed the document.
    RepairApplied,
    /// A fragment could not be decoded and was skipped.
    FragmentParseSkip,
    /// A fragment decoded only with the JSON5 fallback.
    FragmentLenientParse,
    DroppedNode,
    DroppedEdge,
    DuplicateNode,
    PlaceholderNode,
    NonCanonicalId,
}

impl DiagnosticKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedInput => "malformed-input",
            Self::SyntaxError => "syntax-error",
            Self::RepairApplied => "repair-applied",
            Self::FragmentParseSkip => "fragment-parse-skip",
            Self::FragmentLenientParse => "fragment-lenient-parse",
            Self::DroppedNode => "dropped-node",
            Self::DroppedEdge => "dropped-edge",
            Self::DuplicateNode => "duplicate-node",
            Self::PlaceholderNode => "placeholder-node",
            Self::NonCanonicalId => "non-canonical-id",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, PartialOrd, Ord)]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A recovery event: which stage, what happened, and the text involved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub snippet: Option<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(stage: Stage, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            severity: Severity::Info,
            message: message.into(),
            snippet: None,
        }
    }

    #[must_use]
    pub fn info(stage: Stage, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(stage, kind, message)
    }

    #[must_use]
    pub fn warning(stage: Stage, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(stage, kind, message).with_severity(Severity::Warning)
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Attach the offending text, clipped to `max_chars` characters.
    #[must_use]
    pub fn with_snippet(mut self, text: &str, max_chars: usize) -> Self {
        self.snippet = Some(clip_snippet(text, max_chars));
        self
    }

    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning | Severity::Error)
    }

    /// Stable machine-readable code, e.g. `graphmend/fragment/fragment-parse-skip`.
    #[must_use]
    pub fn code(&self) -> String {
        format!("graphmend/{}/{}", self.stage.as_str(), self.kind.as_str())
    }
}

fn clip_snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GraphmendErrorCode {
    NoNodes,
    Upstream,
}

impl GraphmendErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoNodes => "graphmend/error/no-nodes",
            Self::Upstream => "graphmend/error/upstream",
        }
    }
}

/// Hard failures surfaced to callers of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
pub enum GraphmendError {
    /// Every stage ran and no node survived.
    #[error("no recoverable nodes in model output")]
    NoNodesRecovered { diagnostics: Vec<Diagnostic> },
    /// The model could not be reached. Never produced by the pipeline itself.
    #[error("upstream model unavailable: {message}")]
    UpstreamUnavailable { message: String },
}

impl GraphmendError {
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> GraphmendErrorCode {
        match self {
            Self::NoNodesRecovered { .. } => GraphmendErrorCode::NoNodes,
            Self::UpstreamUnavailable { .. } => GraphmendErrorCode::Upstream,
        }
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::NoNodesRecovered { diagnostics } => diagnostics,
            Self::UpstreamUnavailable { .. } => &[],
        }
    }
}
