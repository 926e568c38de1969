use serde::Serialize;

/// Outbound relay frame, serialized as the JSON payload of one
/// `data: <JSON>\n\n` record. Every frame carries an ISO-8601 timestamp.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    Text {
        content: String,
        timestamp: String,
    },
    ToolUse {
        tool: String,
        input: serde_json::Value,
        timestamp: String,
    },
    Complete {
        timestamp: String,
    },
    Error {
        error: String,
        timestamp: String,
    },
}

impl StreamFrame {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
            timestamp: now(),
        }
    }

    pub fn tool_use(tool: impl Into<String>, input: serde_json::Value) -> Self {
        Self::ToolUse {
            tool: tool.into(),
            input,
            timestamp: now(),
        }
    }

    pub fn complete() -> Self {
        Self::Complete { timestamp: now() }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
            timestamp: now(),
        }
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
