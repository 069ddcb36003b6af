//! HTTP routes for the server.
//!
//! The router combines the chat and history API with the sandbox routes in
//! [`crate::sandbox`] and the file manager in [`crate::files`].

use crate::{
    error::{ApiError, ApiResult},
    files, sandbox,
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, Request, Response},
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use sandcode_core::{ChatRequest, DEFAULT_PROJECT};
use sandcode_provider::{Message, Role};
use sandcode_storage::HistoryEntry;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn, Span};

/// Create the router with all routes.
///
/// `cors_origins` lists the allowed origins; empty allows any origin.
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        // ===================
        // Global endpoints
        // ===================
        .route("/", get(root))
        .route("/health", get(health))
        // ===================
        // Chat endpoints
        // ===================
        .route("/api/ai/chat", post(chat))
        .route("/api/ai/history", get(history_get))
        .route("/api/ai/history/clear", post(history_clear))
        .route("/api/ai/sessions", get(session_list).post(session_create))
        .route("/api/ai/sessions/{session}", delete(session_delete))
        // ===================
        // Sandbox endpoints
        // ===================
        .route("/api/sandbox/init", post(sandbox::init))
        .route("/api/sandbox/start", post(sandbox::start))
        .route("/api/sandbox/create", post(sandbox::create))
        .route("/api/sandbox/apply-code", post(sandbox::apply_code))
        .route("/api/sandbox/files", get(sandbox::files))
        .route("/api/sandbox/exec", post(sandbox::exec))
        .route("/api/sandbox/kill", post(sandbox::kill))
        // ===================
        // Project and file manager endpoints
        // ===================
        .route(
            "/api/projects",
            get(files::project_list).post(files::project_create),
        )
        .route("/api/list", get(files::list))
        .route("/api/read", get(files::read))
        .route("/api/save", post(files::save))
        .route("/api/create-file", post(files::create_file))
        .route("/api/rename", post(files::rename))
        .route("/api/delete", post(files::delete))
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(|request: &Request<_>, _span: &Span| {
                    info!(
                        method = %request.method(),
                        path = %request.uri().path(),
                        "request"
                    );
                })
                .on_response(|response: &Response<_>, latency: Duration, _span: &Span| {
                    info!(
                        status = %response.status(),
                        latency = ?latency,
                        "response"
                    );
                }),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(origins)
}

// =============================================================================
// Global endpoints
// =============================================================================

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "sandcode backend is running" }))
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "healthy": true,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// =============================================================================
// Chat endpoints
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChatBody {
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    project: Option<String>,
    /// When set, the last user message and the reply are logged to history.
    #[serde(default)]
    session: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    assistant: String,
    messages: Vec<Message>,
}

async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> ApiResult<Json<ChatResponse>> {
    let last_user = body
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.text().to_string());
    let project = body
        .project
        .clone()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PROJECT.to_string());

    let outcome = state
        .orchestrator
        .chat(ChatRequest {
            messages: body.messages,
            model: body.model,
            project: Some(project.clone()),
        })
        .await
        .map_err(ApiError::from_core)?;

    if let Some(session) = body.session.as_deref() {
        let mut log = Vec::with_capacity(2);
        if let Some(text) = &last_user {
            log.push(("user", text.as_str()));
        }
        log.push(("assistant", outcome.assistant.as_str()));
        for (role, content) in log {
            if let Err(e) = state
                .history
                .append(&project, role, content, Some(session))
                .await
            {
                warn!(project = %project, session = %session, error = %e, "Failed to append chat history");
            }
        }
    }

    Ok(Json(ChatResponse {
        assistant: outcome.assistant,
        messages: outcome.messages,
    }))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    project: String,
    #[serde(default)]
    session: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    messages: Vec<HistoryEntry>,
}

async fn history_get(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let messages = state
        .history
        .load(&query.project, query.session.as_deref(), query.limit)
        .await
        .map_err(ApiError::from_storage)?;
    Ok(Json(HistoryResponse { messages }))
}

#[derive(Debug, Deserialize)]
struct HistoryClearBody {
    project: String,
    #[serde(default)]
    session: Option<String>,
}

async fn history_clear(
    State(state): State<AppState>,
    Json(body): Json<HistoryClearBody>,
) -> ApiResult<impl IntoResponse> {
    state
        .history
        .clear(&body.project, body.session.as_deref())
        .await
        .map_err(ApiError::from_storage)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
struct ProjectQuery {
    project: String,
}

async fn session_list(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<impl IntoResponse> {
    let sessions = state
        .history
        .list_sessions(&query.project)
        .await
        .map_err(ApiError::from_storage)?;
    Ok(Json(serde_json::json!({ "sessions": sessions })))
}

#[derive(Debug, Deserialize)]
struct SessionCreateBody {
    project: String,
    session: String,
}

async fn session_create(
    State(state): State<AppState>,
    Json(body): Json<SessionCreateBody>,
) -> ApiResult<impl IntoResponse> {
    let session = state
        .history
        .create_session(&body.project, &body.session)
        .await
        .map_err(ApiError::from_storage)?;
    Ok(Json(serde_json::json!({ "success": true, "session": session })))
}

async fn session_delete(
    State(state): State<AppState>,
    Path(session): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<impl IntoResponse> {
    state
        .history
        .delete_session(&query.project, &session)
        .await
        .map_err(ApiError::from_storage)?;
    Ok(Json(serde_json::json!({ "success": true })))
}
