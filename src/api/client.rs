use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::{Config, Credential};
use crate::types::ApiMessage;
use crate::util::is_local_endpoint_url;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::json;
use std::pin::Pin;
#[cfg(test)]
use std::sync::Arc;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, messages: &[ApiMessage]) -> Result<ByteStream>;
}

/// Streaming client for the upstream agent runtime. The runtime owns tool
/// execution; this client only opens the event stream for one turn.
#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    credential: Option<Credential>,
    model: String,
    base_url: String,
    anthropic_version: String,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

impl AgentClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            credential: config.credential.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            anthropic_version: config.anthropic_version.clone(),
            #[cfg(test)]
            mock_stream_producer: None,
        }
    }

    #[cfg(test)]
    pub fn new_mock(mock_producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            credential: None,
            model: "mock-model".to_string(),
            base_url: "http://localhost:8000".to_string(),
            anthropic_version: "2023-06-01".to_string(),
            mock_stream_producer: Some(mock_producer),
        }
    }

    /// Open the event stream for one turn of conversation.
    pub async fn create_stream(
        &self,
        system_prompt: &str,
        allowed_tools: &[String],
        messages: &[ApiMessage],
    ) -> Result<ByteStream> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(messages);
            }
        }

        let request_url = self.request_url();
        let mut payload = json!({
            "model": self.model,
            "max_tokens": resolve_max_tokens(&self.base_url),
            "stream": true,
            "system": system_prompt,
            "messages": messages,
        });
        if !allowed_tools.is_empty() {
            if let Some(payload_object) = payload.as_object_mut() {
                payload_object.insert("allowed_tools".to_string(), json!(allowed_tools));
            }
        }

        let mut request = self
            .http
            .post(&request_url)
            .header("content-type", "application/json")
            .json(&payload);

        if debug_payload_enabled() {
            emit_debug_payload(&request_url, &payload);
        }

        match &self.credential {
            Some(Credential::ApiKey(key)) => {
                request = request.header("x-api-key", key);
            }
            Some(Credential::AuthToken(token)) => {
                request = request.header("authorization", format!("Bearer {token}"));
            }
            None => {}
        }
        if !self.anthropic_version.trim().is_empty() {
            request = request.header("anthropic-version", &self.anthropic_version);
        }

        let response = request
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &request_url))?;

        let request_url_for_stream = request_url.clone();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| map_api_request_error(error, &request_url_for_stream))
        });
        Ok(Box::pin(stream))
    }

    fn request_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return anyhow!(
            "cannot reach local endpoint '{}': {}. Start your local server or update ANTHROPIC_BASE_URL.",
            request_url,
            error
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach endpoint '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("request to '{}' timed out: {}", request_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!(
            "endpoint '{}' returned HTTP {}: {}",
            request_url,
            status,
            error
        );
    }
    anyhow!("request to '{}' failed: {}", request_url, error)
}

fn resolve_max_tokens(base_url: &str) -> u32 {
    if let Some(value) = std::env::var("AGENTLINE_MAX_TOKENS")
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
    {
        return value.clamp(128, 8192);
    }

    if is_local_endpoint_url(base_url) {
        1024
    } else {
        4096
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_appends_messages_path() {
        let config = Config {
            base_url: "https://api.anthropic.com/".to_string(),
            model: "claude-sonnet-4-5-20250929".to_string(),
            anthropic_version: "2023-06-01".to_string(),
            credential: Some(Credential::ApiKey("test-key".to_string())),
            prompt_preset_id: "general".to_string(),
            custom_presets: Default::default(),
        };
        let client = AgentClient::new(&config);
        assert_eq!(
            client.request_url(),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn test_resolve_max_tokens_defaults_for_local() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::remove_var("AGENTLINE_MAX_TOKENS");
        assert_eq!(resolve_max_tokens("http://localhost:8000"), 1024);
        assert_eq!(resolve_max_tokens("https://api.anthropic.com"), 4096);
    }

    #[test]
    fn test_resolve_max_tokens_clamps_env_override() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var("AGENTLINE_MAX_TOKENS", "50");
        assert_eq!(resolve_max_tokens("https://api.anthropic.com"), 128);
        std::env::set_var("AGENTLINE_MAX_TOKENS", "100000");
        assert_eq!(resolve_max_tokens("https://api.anthropic.com"), 8192);
        std::env::remove_var("AGENTLINE_MAX_TOKENS");
    }
}
