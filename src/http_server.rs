//! HTTP server implementation using Axum.

use crate::command::CommandResult;
use crate::error::ErrorKind;
use crate::executor::ExecutionResult;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

// Request/Response types
#[derive(Deserialize)]
struct ExecuteRequest {
    #[serde(default)]
    code: String,
    #[serde(default = "default_language")]
    language: String,
}

fn default_language() -> String { "python".to_string() }

#[derive(Serialize, Deserialize, Debug)]
pub struct ExecuteResponse {
    pub output: String,
    pub error: Option<String>,
    pub success: bool,
}

#[derive(Deserialize)]
struct TerminalRequest {
    #[serde(default)]
    command: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TerminalResponse {
    pub output: String,
    pub error: Option<String>,
    pub success: bool,
    pub return_code: i32,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LanguageInfo {
    pub language: String,
    pub extension: String,
    pub compiled: bool,
}

fn status_for(error: Option<ErrorKind>) -> StatusCode {
    match error {
        Some(ErrorKind::InvalidInput) | Some(ErrorKind::UnsupportedLanguage) => {
            StatusCode::BAD_REQUEST
        }
        Some(ErrorKind::CommandBlocked) => StatusCode::FORBIDDEN,
        _ => StatusCode::OK,
    }
}

impl From<ExecutionResult> for ExecuteResponse {
    fn from(result: ExecutionResult) -> Self {
        let error = if result.succeeded {
            Some(result.stderr).filter(|s| !s.is_empty())
        } else {
            result.message
        };
        Self { output: result.stdout, error, success: result.succeeded }
    }
}

impl From<CommandResult> for TerminalResponse {
    fn from(result: CommandResult) -> Self {
        Self {
            output: result.combined_output,
            error: result.message,
            success: result.succeeded,
            return_code: result.exit_code,
        }
    }
}

/// Build the router; split out so tests can drive it without a socket.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/execute", post(execute))
        .route("/terminal", post(terminal))
        .route("/languages", get(languages))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP server on the given address with the provided state.
pub async fn run_server(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> &'static str {
    "OK"
}

async fn languages(State(state): State<AppState>) -> Json<Vec<LanguageInfo>> {
    let list = state
        .executor
        .toolchains()
        .iter()
        .map(|(name, toolchain)| LanguageInfo {
            language: name.to_string(),
            extension: toolchain.extension.clone(),
            compiled: toolchain.is_compiled(),
        })
        .collect();
    Json(list)
}

async fn execute(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> (StatusCode, Json<ExecuteResponse>) {
    info!("POST /execute - language: {}, {} bytes", req.language, req.code.len());
    let result = state.executor.execute(&req.code, &req.language).await;
    let status = status_for(result.error);
    (status, Json(result.into()))
}

async fn terminal(
    State(state): State<AppState>,
    Json(req): Json<TerminalRequest>,
) -> (StatusCode, Json<TerminalResponse>) {
    info!("POST /terminal - command: {:?}", req.command);
    let result = state.runner.run(&req.command).await;
    let status = status_for(result.error);
    info!("POST /terminal - result: exit={} success={}", result.exit_code, result.succeeded);
    (status, Json(result.into()))
}
