//! Renderer configuration types.

use gm_core::{GraphDirection, LabelPolicy};
use serde::{Deserialize, Serialize};

/// Configuration for Mermaid markup output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MermaidRenderConfig {
    /// Flow direction written in the `graph` header.
    pub direction: GraphDirection,
    /// How label text is embedded.
    pub labels: LabelPolicy,
}

impl MermaidRenderConfig {
    /// Labels embedded literally, exactly as the model produced them.
    #[must_use]
    pub fn verbatim() -> Self {
        Self {
            labels: LabelPolicy::Verbatim,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_direction(mut self, direction: GraphDirection) -> Self {
        self.direction = direction;
        self
    }
}
