use std::borrow::Cow;
use std::sync::LazyLock;

use gm_core::{Diagnostic, DiagnosticKind, Stage};
use regex::Regex;
use serde::Serialize;

use crate::DiagnosticSink;

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([\]}])").expect("trailing comma regex is valid"));
static REPEATED_BRACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\}(?:\s*\})+").expect("repeated brace regex is valid"));
static REPEATED_BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\](?:\s*\])+").expect("repeated bracket regex is valid"));

/// One textual fixup. Applied in declaration order.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum RepairRule {
    /// `,` (plus whitespace) right before `]` or `}`.
    TrailingComma,
    /// `}` `}` with only whitespace between collapses to one `}`.
    RepeatedBraces,
    /// `]` `]` with only whitespace between collapses to one `]`.
    RepeatedBrackets,
}

impl RepairRule {
    pub const ALL: [Self; 3] = [
        Self::TrailingComma,
        Self::RepeatedBraces,
        Self::RepeatedBrackets,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TrailingComma => "trailing-comma",
            Self::RepeatedBraces => "repeated-braces",
            Self::RepeatedBrackets => "repeated-brackets",
        }
    }

    fn apply(self, text: &str) -> Cow<'_, str> {
        match self {
            Self::TrailingComma => TRAILING_COMMA_RE.replace_all(text, "$1"),
            Self::RepeatedBraces => REPEATED_BRACE_RE.replace_all(text, "}"),
            Self::RepeatedBrackets => REPEATED_BRACKET_RE.replace_all(text, "]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    pub text: String,
    /// Rules that changed the text, in application order.
    pub applied: Vec<RepairRule>,
}

impl Repaired {
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Apply every [`RepairRule`] once, in order. Pure text transformation.
#[must_use]
pub fn repair_json(text: &str) -> Repaired {
    let mut current = text.to_string();
    let mut applied = Vec::new();
    for rule in RepairRule::ALL {
        if let Cow::Owned(rewritten) = rule.apply(&current) {
            applied.push(rule);
            current = rewritten;
        }
    }
    Repaired {
        text: current,
        applied,
    }
}

pub(crate) fn repair_stage(text: &str, sink: &mut DiagnosticSink) -> Repaired {
    let repaired = repair_json(text);
    for rule in &repaired.applied {
        sink.push(Diagnostic::info(
            Stage::Repair,
            DiagnosticKind::RepairApplied,
            format!("applied {} fixup", rule.as_str()),
        ));
    }
    repaired
}
