use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use snippet_exec::{CodeExecutionService, ExecutionResult, Language, Outcome, ServiceConfig};
use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Execution error: {0}")]
    ExecutionError(#[from] snippet_exec::Error),
    #[error("Server error: {0}")]
    ServerError(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::ExecutionError(snippet_exec::Error::Busy(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Too many executions in progress, try again later".to_string(),
            ),
            ServerError::ExecutionError(e @ snippet_exec::Error::SourceTooLarge { .. }) => {
                (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
            }
            _ => {
                error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RunRequest {
    pub language: String,
    pub code: String,
    /// Seconds; clamped to the configured maximum
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    pub output: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunErrorResponse {
    pub error: String,
    pub outcome: Outcome,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

#[derive(Clone)]
pub struct AppState {
    service: Arc<CodeExecutionService>,
}

/// HTTP status for a classified outcome
pub fn status_for(outcome: Outcome) -> StatusCode {
    match outcome {
        Outcome::Success => StatusCode::OK,
        Outcome::CompileError | Outcome::RuntimeError | Outcome::InvalidLanguage => {
            StatusCode::BAD_REQUEST
        }
        Outcome::Timeout => StatusCode::REQUEST_TIMEOUT,
        Outcome::LaunchError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn create_app(config: ServiceConfig) -> Result<Router, ServerError> {
    let service = CodeExecutionService::new(config)
        .await
        .map_err(ServerError::ExecutionError)?;

    Ok(router(service))
}

pub fn router(service: CodeExecutionService) -> Router {
    let state = AppState {
        service: Arc::new(service),
    };

    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(health_check))
        .route("/languages", get(languages))
        .route("/api/code/run", post(run_code))
        .route("/execute", post(execute))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    serve(listener, app, shutdown_signal()).await
}

pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::ServerError(e.to_string()))?;
    info!("Starting code execution server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn health_check() -> &'static str {
    "OK"
}

async fn languages(State(state): State<AppState>) -> Json<Vec<Language>> {
    Json(state.service.languages())
}

async fn submit(state: &AppState, payload: RunRequest) -> Result<ExecutionResult, ServerError> {
    let timeout = payload.timeout.map(Duration::from_secs);
    let result = state
        .service
        .submit(&payload.language, payload.code, timeout)
        .await?;
    Ok(result)
}

/// `{ output }` on success, an error payload with an outcome-specific
/// status otherwise
async fn run_code(
    State(state): State<AppState>,
    Json(payload): Json<RunRequest>,
) -> Result<Response, ServerError> {
    let result = submit(&state, payload).await?;
    let status = status_for(result.outcome);

    if result.outcome.is_success() {
        return Ok((status, Json(RunResponse { output: result.stdout })).into_response());
    }

    let error = match result.outcome {
        Outcome::Timeout => "Execution timed out".to_string(),
        _ if !result.stderr.is_empty() => result.stderr.clone(),
        _ => format!("Execution failed with outcome {}", result.outcome),
    };

    Ok((
        status,
        Json(RunErrorResponse {
            error,
            outcome: result.outcome,
            stdout: result.stdout,
            stderr: result.stderr,
            exit_code: result.exit_code,
        }),
    )
        .into_response())
}

/// Structured result for every classified outcome
async fn execute(
    State(state): State<AppState>,
    Json(payload): Json<RunRequest>,
) -> Result<Json<ExecutionResult>, ServerError> {
    Ok(Json(submit(&state, payload).await?))
}
