use serde::{Deserialize, Serialize};

/// One message in the conversation sent to the upstream agent runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: String,
}

impl ApiMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Content block inside an upstream message, as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default = "default_json_object")]
        input: serde_json::Value,
    },
}

fn default_json_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Streaming protocol event as delivered by the upstream SSE feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {
        message: MessageStartData,
    },
    ContentBlockStart {
        index: usize,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: Delta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: MessageDelta,
    },
    MessageStop,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Delta {
    #[serde(rename = "type")]
    #[serde(default)]
    pub delta_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub partial_json: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageStartData {
    pub id: String,
    pub role: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDelta {
    pub stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_use_block_defaults_missing_input_to_empty_object() {
        let json = r#"{"type":"tool_use","id":"toolu_1","name":"Bash"}"#;
        let block: ContentBlock = serde_json::from_str(json).expect("tool_use without input");
        match block {
            ContentBlock::ToolUse { input, .. } => {
                assert_eq!(input, serde_json::json!({}));
            }
            other => panic!("unexpected block: {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_stream_event_maps_to_unknown() {
        let json = r#"{"type":"ping"}"#;
        let event: StreamEvent = serde_json::from_str(json).expect("ping event");
        assert!(matches!(event, StreamEvent::Unknown));
    }

    #[test]
    fn test_api_message_serializes_role_and_content() {
        let msg = ApiMessage::user("Hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "Hello");
    }
}
