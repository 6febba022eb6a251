//! Browser-facing HTTP proxy.
//!
//! Forwards scan submissions and analysis lookups to the scanning service
//! (keeping the API key server-side), and serves feedback and the visit
//! counter.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/scan-url` | Submit `{url}` for scanning → `{data: {id, type}}` |
//! | `POST` | `/scan-file` | Submit multipart field `file` (≤ 32 MiB) → `{data: {id, type}}` |
//! | `GET`  | `/analysis/{id}` | Upstream analysis JSON, passed through |
//! | `GET`  | `/report/{id}` | Formatted report if completed, `202 {status}` otherwise |
//! | `POST` | `/feedback` | Store `{feedback}` → `{message}` |
//! | `GET`  | `/feedback` | `{feedbacks: [...]}`, newest-first |
//! | `GET`  | `/api/counter`, `/visit-count` | Increment the visit counter → `{count}` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Every failure is a non-2xx status with a JSON body:
//!
//! ```json
//! { "error": "URL is required", "code": "invalid_input" }
//! ```
//!
//! Upstream failures add a `details` field with the scanner's response.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the static front end
//! can be hosted anywhere.

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use safe_scan_core::report::{format_report, AnalysisReport, AnalysisStatus};
use safe_scan_core::request::{AnalysisHandle, AnalysisRequest, MAX_FILE_SIZE};
use safe_scan_core::ScanError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::scanner::ScannerClient;
use crate::stores::{self, Stores};

/// Headroom on top of the file limit for multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scanner: Arc<ScannerClient>,
    pub stores: Stores,
}

/// Starts the HTTP server with stores and scanner built from `config`.
///
/// Binds to `[server].bind` and runs until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let scanner = ScannerClient::from_config(&config.scanner)?;
    let stores = stores::open(config).await?;
    let state = AppState {
        config: Arc::new(config.clone()),
        scanner: Arc::new(scanner),
        stores,
    };
    serve(state).await
}

/// Starts the HTTP server with caller-provided state.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.server.bind.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("safe-scan listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

/// Builds the route table.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/scan-url", post(handle_scan_url))
        .route(
            "/scan-file",
            post(handle_scan_file).layer(DefaultBodyLimit::max(MAX_FILE_SIZE + MULTIPART_OVERHEAD)),
        )
        .route("/analysis/{id}", get(handle_analysis))
        .route("/report/{id}", get(handle_report))
        .route("/feedback", post(handle_feedback_submit).get(handle_feedback_list))
        .route("/api/counter", get(handle_counter))
        .route("/visit-count", get(handle_counter))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    details: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "invalid_input".to_string(),
        message: message.into(),
        details: None,
    }
}

fn status_for(err: &ScanError) -> StatusCode {
    match err {
        ScanError::InvalidInput(_) | ScanError::EmptyInput | ScanError::InvalidReport(_) => {
            StatusCode::BAD_REQUEST
        }
        ScanError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ScanError::UpstreamError { .. }
        | ScanError::MalformedUpstreamResponse(_)
        | ScanError::Transport(_) => StatusCode::BAD_GATEWAY,
        ScanError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ScanError::AnalysisFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ScanError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        let status = status_for(&err);
        let (message, details) = match &err {
            ScanError::UpstreamError { status, body } => {
                let details = serde_json::from_str::<Value>(body)
                    .unwrap_or_else(|_| Value::String(body.clone()));
                (
                    format!("scanner returned {}", status),
                    Some(json!({ "status": status, "body": details })),
                )
            }
            ScanError::EmptyInput => ("feedback must not be empty".to_string(), None),
            other => (other.to_string(), None),
        };
        if status.is_server_error() {
            warn!(code = err.code(), "request failed: {}", err);
        }
        AppError {
            status,
            code: err.code().to_string(),
            message,
            details,
        }
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Scan submission ============

#[derive(Deserialize)]
struct ScanUrlRequest {
    #[serde(default)]
    url: Option<String>,
}

fn submission_response(handle: &AnalysisHandle) -> Json<Value> {
    Json(json!({ "data": { "type": "analysis", "id": handle.as_str() } }))
}

/// Handler for `POST /scan-url`.
async fn handle_scan_url(
    State(state): State<AppState>,
    body: Result<Json<ScanUrlRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = body.map_err(|e| bad_request(e.body_text()))?;
    let url = body
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| bad_request("URL is required"))?;

    let handle = state.scanner.submit(AnalysisRequest::url(url)).await?;
    Ok(submission_response(&handle))
}

/// Handler for `POST /scan-file`.
///
/// Reads the multipart field named `file`; other fields are ignored.
async fn handle_scan_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, AppError> {
    let mut multipart = multipart.map_err(|e| bad_request(e.body_text()))?;

    let mut upload = None;
    loop {
        let field = multipart.next_field().await.map_err(multipart_error)?;
        let Some(field) = field else { break };
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.bin").to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((bytes, filename));
        break;
    }

    let (bytes, filename) = upload.ok_or_else(|| bad_request("File is required"))?;
    let handle = state
        .scanner
        .submit(AnalysisRequest::file(bytes.to_vec(), filename))
        .await?;
    Ok(submission_response(&handle))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    let status = e.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::from(ScanError::PayloadTooLarge {
            size: MAX_FILE_SIZE + 1,
            limit: MAX_FILE_SIZE,
        })
    } else {
        bad_request(e.body_text())
    }
}

// ============ Analysis lookup ============

fn parse_handle(id: String) -> Result<AnalysisHandle, AppError> {
    AnalysisHandle::new(id).map_err(|_| bad_request("analysis id is required"))
}

/// Handler for `GET /analysis/{id}`: the upstream payload, unmodified.
async fn handle_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let handle = parse_handle(id)?;
    let json = state.scanner.fetch_analysis_raw(&handle).await?;
    Ok(Json(json))
}

/// Handler for `GET /report/{id}`.
///
/// Performs a single status fetch. Completed analyses are formatted; queued
/// or in-progress ones return `202` with the current status so the client
/// can poll again.
async fn handle_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let handle = parse_handle(id)?;
    let report: AnalysisReport = state.scanner.fetch_analysis(&handle).await?;

    match report.status {
        AnalysisStatus::Completed => {
            let formatted = format_report(&report)?;
            Ok(Json(formatted).into_response())
        }
        AnalysisStatus::Failed => Err(ScanError::AnalysisFailed.into()),
        status => Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "id": handle.as_str(), "status": status })),
        )
            .into_response()),
    }
}

// ============ Feedback ============

#[derive(Deserialize)]
struct FeedbackRequest {
    #[serde(default)]
    feedback: Option<String>,
}

#[derive(Serialize)]
struct FeedbackListResponse {
    feedbacks: Vec<String>,
}

/// Handler for `POST /feedback`.
async fn handle_feedback_submit(
    State(state): State<AppState>,
    body: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = body.map_err(|e| bad_request(e.body_text()))?;
    let text = body.feedback.unwrap_or_default();
    let entry = state.stores.feedback.submit(&text).await?;
    info!(chars = entry.text.chars().count(), "feedback received");
    Ok(Json(json!({
        "message": "Feedback submitted successfully",
        "timestamp": entry.timestamp,
    })))
}

/// Handler for `GET /feedback`.
async fn handle_feedback_list(
    State(state): State<AppState>,
) -> Result<Json<FeedbackListResponse>, AppError> {
    let entries = state.stores.feedback.list().await?;
    Ok(Json(FeedbackListResponse {
        feedbacks: entries.into_iter().map(|e| e.text).collect(),
    }))
}

// ============ Visit counter ============

#[derive(Serialize)]
struct CounterResponse {
    count: u64,
}

/// Handler for `GET /api/counter` and `GET /visit-count`.
async fn handle_counter(State(state): State<AppState>) -> Result<Json<CounterResponse>, AppError> {
    let count = state.stores.counter.increment().await.map_err(|e| {
        error!("counter error: {}", e);
        AppError::from(e)
    })?;
    Ok(Json(CounterResponse { count }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ScanError::InvalidInput("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ScanError::PayloadTooLarge { size: 2, limit: 1 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_for(&ScanError::Timeout { attempts: 20 }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&ScanError::StorageError("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_error_details_are_json() {
        let err = AppError::from(ScanError::UpstreamError {
            status: 401,
            body: r#"{"error":{"code":"WrongCredentialsError"}}"#.to_string(),
        });
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.code, "upstream_error");
        let details = err.details.unwrap();
        assert_eq!(details["status"], 401);
        assert_eq!(details["body"]["error"]["code"], "WrongCredentialsError");
    }
}
