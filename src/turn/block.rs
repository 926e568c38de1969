use serde::{Deserialize, Serialize};

/// Finalized unit of assistant output for one turn, in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayBlock {
    /// Accumulated free text.
    Text { content: String },
    /// Completed tool invocation with whatever arguments decoded by block end.
    Tool {
        name: String,
        arguments: serde_json::Value,
        duration_seconds: f64,
    },
}
