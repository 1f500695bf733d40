//! Integration tests for the graphmend pipeline.
//!
//! These tests drive model output through recovery and rendering and check the
//! exact markup produced.

use gm_core::{GraphmendError, canonical_id};
use gm_parser::{ParseOutcome, recover};
use gm_render::{MermaidRenderConfig, render_mermaid, render_mermaid_with_config};

fn pipeline(input: &str) -> Result<String, GraphmendError> {
    recover(input).map(|recovery| render_mermaid(&recovery.graph))
}

/// A well-formed document renders to the exact expected markup.
#[test]
fn well_formed_document_round_trips() {
    let output = pipeline(r#"{"nodes":[{"id":"a","label":"A"}],"edges":[]}"#)
        .expect("well-formed input");
    assert_eq!(output, "graph TD\n  a[\"A\"]\n");
}

/// A trailing comma is repaired and renders identically to the clean input.
#[test]
fn trailing_comma_renders_like_clean_input() {
    let clean = pipeline(r#"{"nodes":[{"id":"a","label":"A"}],"edges":[]}"#).expect("clean");
    let repaired =
        pipeline(r#"{"nodes":[{"id":"a","label":"A"},],"edges":[]}"#).expect("repairable");
    assert_eq!(repaired, clean);
}

/// Undeclared edge endpoints become placeholder nodes declared before edges.
#[test]
fn dangling_endpoint_gets_placeholder_node() {
    let output = pipeline(r#"{"nodes":[{"id":"a","label":"A"}],"edges":[{"from":"a","to":"b"}]}"#)
        .expect("recoverable");
    assert_eq!(output, "graph TD\n  a[\"A\"]\n  b[\"b\"]\n  a --> b\n");
}

/// An arrow-shaped id is stripped to `[a-z0-9_-]` and cannot forge an edge.
#[test]
fn arrow_shaped_id_is_stripped_before_rendering() {
    let output =
        pipeline(r#"{"nodes":[{"id":"a","label":"A"}],"edges":[{"from":"a","to":"-->"}]}"#)
            .expect("recoverable");
    assert_eq!(output, "graph TD\n  a[\"A\"]\n  --[\"--\"]\n  a --> --\n");
    assert!(!output.contains("-->[") && !output.contains("--> -->"));
}

/// Canonical ids are stable under re-normalization.
#[test]
fn id_normalization_is_idempotent() {
    let once = canonical_id("Step One").expect("non-empty");
    assert_eq!(once, "step_one");
    assert_eq!(canonical_id(&once).as_deref(), Some("step_one"));
}

/// Nodes lacking a label are dropped, but an edge can still bring the id back
/// as a placeholder.
#[test]
fn incomplete_nodes_are_dropped_but_edges_resurrect_ids() {
    let output = pipeline(
        r#"{"nodes":[{"id":"a","label":"A"},{"id":"b"}],
            "edges":[{"from":"a"},{"from":"a","to":"b"}]}"#,
    )
    .expect("recoverable");
    assert_eq!(output, "graph TD\n  a[\"A\"]\n  b[\"b\"]\n  a --> b\n");

    let without_edges =
        pipeline(r#"{"nodes":[{"id":"a","label":"A"},{"id":"b"}],"edges":[]}"#).expect("a");
    assert_eq!(without_edges, "graph TD\n  a[\"A\"]\n");
}

/// Two separate node blocks are merged in scan order.
#[test]
fn fragment_blocks_are_merged_in_scan_order() {
    let input = r#"Here are the nodes:
{"nodes": [{"id": "start", "label": "Start"}, {"id": "load", "label": "Load data"}]}
And some more:
{"nodes": [{"id": "done", "label": "Done"}]}
"edges": [{"from": "start", "to": "load"}, {"from": "load", "to": "done"}]"#;

    let recovery = recover(input).expect("recoverable");
    assert_eq!(recovery.outcome, ParseOutcome::FragmentMerged);
    assert_eq!(
        render_mermaid(&recovery.graph),
        "graph TD\n  start[\"Start\"]\n  load[\"Load data\"]\n  done[\"Done\"]\n  \
         start --> load\n  load --> done\n"
    );
}

/// Text with no braces and no node fragment fails terminally.
#[test]
fn prose_only_output_fails_with_no_nodes() {
    let error = pipeline("Sorry, I can't help with that request.").expect_err("no nodes");
    assert!(matches!(error, GraphmendError::NoNodesRecovered { .. }));
    assert_eq!(error.to_string(), "no recoverable nodes in model output");
}

/// The usual chatty, fenced model answer.
#[test]
fn fenced_answer_with_prose_and_camel_case_ids() {
    let input = r#"Sure! Here's the flow you asked for:

```json
{
  "nodes": [
    {"id": "userLogin", "label": "User logs in"},
    {"id": "Check Credentials", "label": "Check credentials"}
  ],
  "edges": [
    {"from": "userLogin", "to": "Check Credentials"},
    {"from": "Check Credentials", "to": "showDashboard"}
  ]
}
```

Let me know if you want changes."#;

    assert_eq!(
        pipeline(input).expect("recoverable"),
        "graph TD\n  user_login[\"User logs in\"]\n  check_credentials[\"Check credentials\"]\n  \
         show_dashboard[\"show_dashboard\"]\n  user_login --> check_credentials\n  \
         check_credentials --> show_dashboard\n"
    );
}

/// Duplicated closers are collapsed by the repair stage.
#[test]
fn duplicated_closers_are_repaired() {
    let input = r#"{"nodes":[{"id":"a","label":"A"}}],"edges":[{"from":"a","to":"b"}]]}"#;
    let recovery = recover(input).expect("recoverable");
    assert_eq!(recovery.outcome, ParseOutcome::Repaired);
    assert_eq!(
        render_mermaid(&recovery.graph),
        "graph TD\n  a[\"A\"]\n  b[\"b\"]\n  a --> b\n"
    );
}

/// Quotes in labels are escaped by default and kept verbatim on request.
#[test]
fn label_policy_controls_quote_handling() {
    let recovery = recover(r#"{"nodes":[{"id":"a","label":"Say \"hi\""}]}"#).expect("valid");
    assert_eq!(
        render_mermaid(&recovery.graph),
        "graph TD\n  a[\"Say #quot;hi#quot;\"]\n"
    );
    assert_eq!(
        render_mermaid_with_config(&recovery.graph, &MermaidRenderConfig::verbatim()),
        "graph TD\n  a[\"Say \"hi\"\"]\n"
    );
}

/// Same input, same output.
#[test]
fn pipeline_is_deterministic() {
    let input = r#"{"nodes":[{"id":"b","label":"B"},{"id":"a","label":"A"}],"edges":[{"from":"b","to":"a"},{"from":"b","to":"c"}]}"#;
    let first = pipeline(input).expect("recoverable");
    for _ in 0..8 {
        assert_eq!(pipeline(input).expect("recoverable"), first);
    }
}

/// Runs on separate threads do not interfere with each other.
#[test]
fn concurrent_runs_are_independent() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let input = format!(r#"{{"nodes":[{{"id":"n{i}","label":"Node {i}"}}]}}"#);
                pipeline(&input).expect("recoverable")
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let output = handle.join().expect("thread finished");
        assert_eq!(output, format!("graph TD\n  n{i}[\"Node {i}\"]\n"));
    }
}
