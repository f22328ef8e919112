//! HTTP API: chat, health, accounts, and admin knowledge-base operations.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use soilscope_core::{KnowledgeStore, accounts, seed};
use soilscope_shared::SoilScopeError;
use soilscope_storage::Storage;
use subtle::ConstantTimeEq;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

/// Header carrying the admin secret.
pub(crate) const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Shared state behind every handler.
pub(crate) struct AppState {
    pub store: Arc<KnowledgeStore>,
    /// Read-write database for accounts and `setup-database`.
    pub storage: Storage,
    /// Expected `x-admin-token`. `None` disables the admin routes.
    pub admin_token: Option<String>,
}

pub(crate) fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/admin/reload", post(admin_reload))
        .route("/api/admin/setup-database", post(admin_setup_database))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A JSON `{ "error": ... }` response.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<SoilScopeError> for ApiError {
    fn from(err: SoilScopeError) -> Self {
        match &err {
            SoilScopeError::Validation { message }
            | SoilScopeError::Auth { message }
            | SoilScopeError::Conflict { message } => Self::bad_request(message.clone()),
            _ => {
                warn!(error = %err, "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn require_admin(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = state.admin_token.as_deref() else {
        warn!("admin request rejected: no admin token configured");
        return Err(ApiError::forbidden());
    };
    match headers.get(ADMIN_TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        Some(given) if bool::from(given.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
        _ => {
            warn!("admin request rejected: bad token");
            Err(ApiError::forbidden())
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.store.snapshot();
    Json(json!({
        "ok": true,
        "lifecycle": state.store.lifecycle().as_str(),
        "rules": snapshot.knowledge().len(),
        "generation": snapshot.generation(),
    }))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(request) = body?;
    let reply = state.store.resolve(&request.message);
    debug!(
        source = reply.source.label(),
        generation = reply.generation,
        "chat reply"
    );
    Ok(Json(json!({ "reply": reply.text })))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let Json(request) = body?;
    let user = accounts::register(
        &state.storage,
        &request.name,
        &request.email,
        &request.password,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "user": user,
        })),
    ))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(request) = body?;
    let user = accounts::login(&state.storage, &request.email, &request.password).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "user": user,
    })))
}

async fn admin_reload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    require_admin(&state, &headers)?;
    let report = state.store.reload().await?;
    Ok(Json(json!({
        "reloaded": true,
        "rules": report.rules,
        "generation": report.generation,
    })))
}

async fn admin_setup_database(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    require_admin(&state, &headers)?;
    let count = state.storage.replace_rules(&seed::builtin_rules()).await?;
    info!(count, "database seeded with built-in rules");
    Ok(Json(json!({ "success": true, "count": count })))
}
