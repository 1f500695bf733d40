use std::sync::LazyLock;

use gm_core::{Diagnostic, DiagnosticKind, Stage};
use regex::Regex;

use crate::DiagnosticSink;

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?i:json)?\s*(.*?)\s*```").expect("fence regex is valid")
});

/// Working text after fence stripping and brace narrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extraction<'a> {
    pub text: &'a str,
    /// The text came from the first fenced block.
    pub fenced: bool,
    /// A `{...}` span was found and the text was narrowed to it.
    pub narrowed: bool,
}

/// Strip a markdown fence and narrow to the outermost `{...}` span.
///
/// Never fails: when no span exists the (possibly unfenced) text is returned
/// as-is with `narrowed == false`.
#[must_use]
pub fn extract_json_span(raw: &str) -> Extraction<'_> {
    let (working, fenced) = match FENCE_RE.captures(raw).and_then(|caps| caps.get(1)) {
        Some(inner) => (inner.as_str().trim(), true),
        None => (raw, false),
    };

    match (working.find('{'), working.rfind('}')) {
        (Some(start), Some(end)) if end > start => Extraction {
            text: &working[start..=end],
            fenced,
            narrowed: true,
        },
        _ => Extraction {
            text: working,
            fenced,
            narrowed: false,
        },
    }
}

pub(crate) fn extract_stage<'a>(raw: &'a str, sink: &mut DiagnosticSink) -> Extraction<'a> {
    let extraction = extract_json_span(raw);
    if !extraction.narrowed {
        let diagnostic = Diagnostic::warning(
            Stage::Extract,
            DiagnosticKind::MalformedInput,
            "no {...} span found; continuing with unnarrowed text",
        );
        sink.push_with_snippet(diagnostic, extraction.text);
    }
    extraction
}
