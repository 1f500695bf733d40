use gm_core::{
    Diagnostic, DiagnosticKind, Graph, GraphEdge, RawEdge, RawGraph, RawNode, Stage,
    canonical_id, is_canonical_id,
};

use crate::DiagnosticSink;

/// Builds a [`Graph`] from raw records: drops incomplete ones, canonicalizes
/// ids, and interns edge endpoints as placeholder nodes when undeclared.
pub(crate) struct GraphBuilder<'s> {
    graph: Graph,
    sink: &'s mut DiagnosticSink,
}

impl<'s> GraphBuilder<'s> {
    pub(crate) fn new(sink: &'s mut DiagnosticSink) -> Self {
        Self {
            graph: Graph::new(),
            sink,
        }
    }

    pub(crate) fn finish(self) -> Graph {
        self.graph
    }

    pub(crate) fn add_node(&mut self, node: &RawNode) {
        let (Some(raw_id), Some(label)) = (node.id.as_deref(), node.label.as_deref()) else {
            self.sink.push(Diagnostic::warning(
                Stage::Normalize,
                DiagnosticKind::DroppedNode,
                format!("dropped node without id or label: {}", describe_node(node)),
            ));
            return;
        };
        let Some(id) = self.canonicalize(raw_id) else {
            self.sink.push(Diagnostic::warning(
                Stage::Normalize,
                DiagnosticKind::DroppedNode,
                format!("dropped node with blank id (label {label:?})"),
            ));
            return;
        };

        // IndexMap::insert keeps the original slot for an existing key.
        if let Some(previous) = self.graph.nodes.insert(id.clone(), label.to_string()) {
            self.sink.push(Diagnostic::info(
                Stage::Normalize,
                DiagnosticKind::DuplicateNode,
                format!("node {id} redeclared; label {previous:?} replaced by {label:?}"),
            ));
        }
    }

    pub(crate) fn add_edge(&mut self, edge: &RawEdge) {
        let endpoints = edge
            .from
            .as_deref()
            .zip(edge.to.as_deref())
            .and_then(|(from, to)| Some((self.canonicalize(from)?, self.canonicalize(to)?)));
        let Some((from, to)) = endpoints else {
            self.sink.push(Diagnostic::warning(
                Stage::Normalize,
                DiagnosticKind::DroppedEdge,
                format!(
                    "dropped edge without both endpoints: from={:?} to={:?}",
                    edge.from, edge.to
                ),
            ));
            return;
        };

        self.intern_placeholder(&from);
        self.intern_placeholder(&to);
        self.graph.edges.push(GraphEdge { from, to });
    }

    fn intern_placeholder(&mut self, id: &str) {
        if self.graph.contains_node(id) {
            return;
        }
        self.graph.nodes.insert(id.to_string(), id.to_string());
        self.sink.push(Diagnostic::info(
            Stage::Normalize,
            DiagnosticKind::PlaceholderNode,
            format!("edge endpoint {id} was not declared; added placeholder node"),
        ));
    }

    fn canonicalize(&mut self, raw: &str) -> Option<String> {
        let id = canonical_id(raw)?;
        if !is_canonical_id(&id) {
            self.sink.push(Diagnostic::warning(
                Stage::Normalize,
                DiagnosticKind::NonCanonicalId,
                format!("id {raw:?} has no [a-z0-9_-] form; kept as {id:?}"),
            ));
        }
        Some(id)
    }
}

fn describe_node(node: &RawNode) -> String {
    match (&node.id, &node.label) {
        (Some(id), None) => format!("id {id:?}"),
        (None, Some(label)) => format!("label {label:?}"),
        _ => "empty record".to_string(),
    }
}

/// Normalize a raw graph into canonical form. Total: never fails, but the
/// result may be empty.
#[must_use]
pub fn normalize_graph(raw: &RawGraph) -> Graph {
    let mut sink = DiagnosticSink::new(usize::MAX);
    normalize_into(raw, &mut sink)
}

pub(crate) fn normalize_into(raw: &RawGraph, sink: &mut DiagnosticSink) -> Graph {
    let mut builder = GraphBuilder::new(sink);
    for node in &raw.nodes {
        builder.add_node(node);
    }
    for edge in &raw.edges {
        builder.add_edge(edge);
    }
    builder.finish()
}
