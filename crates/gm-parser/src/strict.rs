use gm_core::RawGraph;
use serde_json::Value;
use thiserror::Error;

/// Why a whole-document decode was rejected.
#[derive(Debug, Error)]
pub enum StrictParseError {
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("top-level JSON value is not an object")]
    NotAnObject,
}

/// Decode `text` as `{"nodes": [...], "edges": [...]}`.
///
/// Missing or malformed arrays decode as empty; only invalid JSON or a
/// non-object document is an error.
pub fn parse_strict(text: &str) -> Result<RawGraph, StrictParseError> {
    let value: Value = serde_json::from_str(text)?;
    RawGraph::from_value(&value).ok_or(StrictParseError::NotAnObject)
}
