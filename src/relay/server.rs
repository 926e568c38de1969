use super::session::{AgentSession, SessionStore, DEFAULT_IDLE_TTL, DEFAULT_SESSION_CAPACITY};
use super::sse::StreamFrame;
use crate::api::{AgentClient, StreamParser};
use crate::config::{Config, Credential};
use crate::prompts::{self, PromptPreset};
use crate::turn::{EventMapper, ReducerEffect, TurnEvent, TurnReducer};
use crate::types::ApiMessage;
use anyhow::{anyhow, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

const FALLBACK_SYSTEM_PROMPT: &str =
    "You are a friendly assistant ready to help with any task.";

/// Shared server state: the bounded session store plus default upstream
/// configuration for sessions that do not carry their own.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<SessionStore>>,
    pub defaults: Arc<Config>,
}

impl AppState {
    pub fn new(defaults: Config) -> Self {
        let capacity = env_usize("AGENTLINE_MAX_SESSIONS").unwrap_or(DEFAULT_SESSION_CAPACITY);
        let idle_ttl = env_usize("AGENTLINE_SESSION_TTL_SECS")
            .map(|secs| Duration::from_secs(secs as u64))
            .unwrap_or(DEFAULT_IDLE_TTL);
        Self {
            store: Arc::new(Mutex::new(SessionStore::new(capacity, idle_ttl))),
            defaults: Arc::new(defaults),
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Build the relay router. Paths match the original backend so existing
/// clients keep working.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/agent/prompts", get(list_prompts))
        .route("/api/agent/create", post(create_session))
        .route("/api/agent/query-stream", post(query_stream))
        .route("/api/agent/query", post(query))
        .route("/api/agent/interrupt", post(interrupt))
        .route("/api/agent/close", post(close_session))
        .route("/api/agent/sessions", get(list_sessions))
        .route("/api/agent/clear-history", post(clear_history))
        .with_state(state)
}

// Request bodies keep the original camelCase field names.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateSessionRequest {
    session_id: String,
    system_prompt: Option<String>,
    system_prompt_type: Option<String>,
    allowed_tools: Vec<String>,
    config: SessionConfigBody,
}

impl Default for CreateSessionRequest {
    fn default() -> Self {
        Self {
            session_id: "default".to_string(),
            system_prompt: None,
            system_prompt_type: None,
            allowed_tools: Vec::new(),
            config: SessionConfigBody::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SessionConfigBody {
    base_url: Option<String>,
    api_key: Option<String>,
    auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SessionScopedRequest {
    session_id: String,
    #[serde(default)]
    message: String,
}

impl Default for SessionScopedRequest {
    fn default() -> Self {
        Self {
            session_id: "default".to_string(),
            message: String::new(),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn list_prompts(State(state): State<AppState>) -> Json<Value> {
    let mut presets: BTreeMap<String, PromptPreset> = prompts::builtin_presets();
    for (id, preset) in &state.defaults.custom_presets {
        presets.insert(id.clone(), preset.clone());
    }
    Json(json!({ "success": true, "prompts": presets }))
}

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<Value>, ApiError> {
    let preset = req
        .system_prompt_type
        .as_deref()
        .and_then(|id| prompts::resolve_preset(id, &state.defaults.custom_presets));
    if req.system_prompt_type.is_some() && preset.is_none() && req.system_prompt.is_none() {
        return Err(ApiError::BadRequest(format!(
            "Unknown system prompt preset '{}'",
            req.system_prompt_type.as_deref().unwrap_or_default()
        )));
    }

    let system_prompt = req
        .system_prompt
        .or_else(|| preset.as_ref().map(|p| p.prompt.clone()))
        .unwrap_or_else(|| FALLBACK_SYSTEM_PROMPT.to_string());
    let allowed_tools = if req.allowed_tools.is_empty() {
        preset.map(|p| p.allowed_tools).unwrap_or_default()
    } else {
        req.allowed_tools
    };

    let credential = match (req.config.api_key, req.config.auth_token) {
        (Some(key), _) if !key.trim().is_empty() => Some(Credential::ApiKey(key)),
        (_, Some(token)) if !token.trim().is_empty() => Some(Credential::AuthToken(token)),
        _ => None,
    };
    if credential.is_none() && state.defaults.credential.is_none() {
        return Err(ApiError::Configuration(
            "An API key or auth token is required (request config or server environment)"
                .to_string(),
        ));
    }

    let session = AgentSession {
        system_prompt,
        allowed_tools,
        credential,
        base_url: req.config.base_url,
        history: Vec::new(),
    };
    state.store.lock().await.insert(&req.session_id, session);
    tracing::info!(session = %req.session_id, "session created");

    Ok(Json(json!({
        "success": true,
        "sessionId": req.session_id,
        "message": "Agent session created",
    })))
}

async fn query_stream(
    State(state): State<AppState>,
    Json(req): Json<SessionScopedRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let mut rx = start_turn(&state, &req.session_id, req.message).await?;

    let stream = async_stream::stream! {
        while let Some(frame) = rx.recv().await {
            let done = matches!(
                frame,
                StreamFrame::Complete { .. } | StreamFrame::Error { .. }
            );
            let data = serde_json::to_string(&frame).unwrap_or_default();
            yield Ok(Event::default().data(data));
            if done {
                break;
            }
        }
    };

    Ok(Sse::new(stream))
}

async fn query(
    State(state): State<AppState>,
    Json(req): Json<SessionScopedRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut rx = start_turn(&state, &req.session_id, req.message).await?;

    let mut response = String::new();
    let mut tools = Vec::new();
    while let Some(frame) = rx.recv().await {
        match frame {
            StreamFrame::Text { content, .. } => response.push_str(&content),
            StreamFrame::ToolUse { tool, input, .. } => {
                tools.push(json!({ "name": tool, "input": input }));
            }
            StreamFrame::Complete { .. } => break,
            StreamFrame::Error { error, .. } => return Err(ApiError::Upstream(error)),
        }
    }

    Ok(Json(json!({
        "success": true,
        "response": response,
        "tools": tools,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

async fn interrupt(
    State(state): State<AppState>,
    Json(req): Json<SessionScopedRequest>,
) -> Result<Json<Value>, ApiError> {
    require_session(&state, &req.session_id).await?;
    // Interruption is cooperative: the client closes the event stream and the
    // turn driver stops pulling on the next failed send.
    Ok(Json(json!({
        "success": true,
        "message": "Interrupt acknowledged; close the event stream to stop the turn",
    })))
}

async fn close_session(
    State(state): State<AppState>,
    Json(req): Json<SessionScopedRequest>,
) -> Result<Json<Value>, ApiError> {
    let removed = state.store.lock().await.remove(&req.session_id);
    if removed.is_none() {
        return Err(ApiError::NotFound(format!(
            "Session not found: {}",
            req.session_id
        )));
    }
    tracing::info!(session = %req.session_id, "session closed");
    Ok(Json(json!({
        "success": true,
        "message": "Agent session closed",
    })))
}

async fn list_sessions(State(state): State<AppState>) -> Json<Value> {
    let mut store = state.store.lock().await;
    let ids = store.ids();
    Json(json!({
        "success": true,
        "sessions": ids,
        "count": ids.len(),
    }))
}

async fn clear_history(
    State(state): State<AppState>,
    Json(req): Json<SessionScopedRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut store = state.store.lock().await;
    let session = store.get_mut(&req.session_id).ok_or_else(|| {
        ApiError::NotFound(format!("Session not found: {}", req.session_id))
    })?;
    session.history.clear();
    Ok(Json(json!({
        "success": true,
        "message": "Conversation history cleared",
    })))
}

async fn require_session(state: &AppState, session_id: &str) -> Result<(), ApiError> {
    let mut store = state.store.lock().await;
    store
        .get_mut(session_id)
        .map(|_| ())
        .ok_or_else(|| ApiError::NotFound(format!("Session not found: {session_id}")))
}

/// Record the user message, open the upstream stream, and spawn the turn
/// driver. Frames arrive on the returned channel; dropping the receiver
/// cancels the turn.
async fn start_turn(
    state: &AppState,
    session_id: &str,
    message: String,
) -> Result<mpsc::UnboundedReceiver<StreamFrame>, ApiError> {
    if message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let (client, system_prompt, allowed_tools, messages) = {
        let mut store = state.store.lock().await;
        let session = store.get_mut(session_id).ok_or_else(|| {
            ApiError::NotFound(format!("Session not found: {session_id}"))
        })?;

        session.history.push(ApiMessage::user(message));

        let defaults = &state.defaults;
        let client_config = Config {
            base_url: session
                .base_url
                .clone()
                .unwrap_or_else(|| defaults.base_url.clone()),
            model: defaults.model.clone(),
            anthropic_version: defaults.anthropic_version.clone(),
            credential: session.credential.clone().or(defaults.credential.clone()),
            prompt_preset_id: defaults.prompt_preset_id.clone(),
            custom_presets: defaults.custom_presets.clone(),
        };
        (
            AgentClient::new(&client_config),
            session.system_prompt.clone(),
            session.allowed_tools.clone(),
            session.history.clone(),
        )
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let state = state.clone();
    let session_id = session_id.to_string();
    tokio::spawn(async move {
        match drive_turn(&client, &system_prompt, &allowed_tools, &messages, &tx).await {
            Ok(assistant_text) => {
                if !assistant_text.trim().is_empty() {
                    let mut store = state.store.lock().await;
                    if let Some(session) = store.get_mut(&session_id) {
                        session.history.push(ApiMessage::assistant(assistant_text));
                    }
                }
                let _ = tx.send(StreamFrame::complete());
                tracing::debug!(session = %session_id, "turn complete");
            }
            Err(error) => {
                tracing::warn!(session = %session_id, %error, "turn failed");
                let _ = tx.send(StreamFrame::error(error.to_string()));
            }
        }
    });

    Ok(rx)
}

/// Drain the upstream event stream through the reducer, forwarding text and
/// finalized tool invocations as frames. Returns the accumulated assistant
/// text; a dropped receiver aborts the turn.
pub(crate) async fn drive_turn(
    client: &AgentClient,
    system_prompt: &str,
    allowed_tools: &[String],
    messages: &[ApiMessage],
    tx: &mpsc::UnboundedSender<StreamFrame>,
) -> Result<String> {
    let mut stream = client
        .create_stream(system_prompt, allowed_tools, messages)
        .await?;
    let mut parser = StreamParser::new();
    let mut mapper = EventMapper::new();
    let mut reducer = TurnReducer::new();
    let mut assistant_text = String::new();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result?;
        for event in parser.process(&chunk)? {
            let Some(turn_event) = mapper.map(&event) else {
                continue;
            };
            match reducer.apply(turn_event) {
                ReducerEffect::AppendText { text } => {
                    assistant_text.push_str(&text);
                    if tx.send(StreamFrame::text(text)).is_err() {
                        reducer.reset();
                        return Err(anyhow!("client disconnected before turn completed"));
                    }
                }
                ReducerEffect::ToolFinished {
                    name, arguments, ..
                } => {
                    if tx.send(StreamFrame::tool_use(name, arguments)).is_err() {
                        reducer.reset();
                        return Err(anyhow!("client disconnected before turn completed"));
                    }
                }
                ReducerEffect::ToolStarted { .. }
                | ReducerEffect::TurnComplete { .. }
                | ReducerEffect::None => {}
            }
        }
    }

    // The upstream may close without an explicit end-of-turn event.
    reducer.apply(TurnEvent::TurnEnd);
    Ok(assistant_text)
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Configuration(String),
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Configuration(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Upstream(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({ "success": false, "error": message }));
        (status, body).into_response()
    }
}
