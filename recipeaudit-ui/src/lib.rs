//! Web shell for the audit pipeline, built on axum.
//!
//! One audit at a time per process: the run executes synchronously on the
//! `POST /audit` handler and the three-state run enum gates concurrent
//! triggers. A hash of the last uploaded bytes decides when a new upload
//! invalidates the previous result.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use recipeaudit_core::{
    AuditError, AuditOutcome, AuditPipeline, DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_PROMPT,
    EntryLimit, RunState,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

const INDEX_HTML: &str = include_str!("index.html");

/// Maximum accepted upload size (16 MiB).
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Per-session run state owned by the shell.
#[derive(Default)]
pub struct UiState {
    pub run_state: RunState,
    /// SHA-256 of the last uploaded file; a different hash clears results.
    pub last_file_hash: Option<String>,
    pub outcome: Option<AuditOutcome>,
    pub last_error: Option<String>,
}

impl UiState {
    /// Register an upload. If the bytes differ from the previous upload,
    /// stale results and errors are cleared.
    pub fn register_upload(&mut self, hash: String) {
        if self.last_file_hash.as_deref() != Some(hash.as_str()) {
            self.outcome = None;
            self.last_error = None;
            if self.run_state == RunState::Done {
                self.run_state = RunState::Idle;
            }
            self.last_file_hash = Some(hash);
        }
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<AuditPipeline>,
    ui: Arc<Mutex<UiState>>,
}

impl AppState {
    pub fn new(pipeline: Arc<AuditPipeline>) -> Self {
        Self {
            pipeline,
            ui: Arc::new(Mutex::new(UiState::default())),
        }
    }
}

/// Build the axum router for the shell.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/audit", post(audit_handler))
        .route("/report", get(report_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the upload form, pre-filled with the default prompts.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let page = INDEX_HTML
        .replace("{{DEFAULT_LIMIT}}", &state.pipeline.default_entry_limit().to_string())
        .replace("{{DEFAULT_MODEL}}", state.pipeline.default_model())
        .replace("{{SYSTEM_PROMPT}}", DEFAULT_SYSTEM_PROMPT)
        .replace("{{USER_PROMPT}}", DEFAULT_USER_PROMPT);
    Html(page)
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Current run state and last error, polled by the page.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ui = state.ui.lock().await;
    Json(serde_json::json!({
        "state": ui.run_state.to_string(),
        "error": ui.last_error,
        "report_ready": ui.outcome.is_some(),
    }))
}

/// Run one audit synchronously. The caller blocks until the pipeline
/// returns or fails; there is no cancellation path.
async fn audit_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename = String::new();
    let mut limit = EntryLimit::Count(state.pipeline.default_entry_limit());
    let mut model: Option<String> = None;
    let mut system_prompt = DEFAULT_SYSTEM_PROMPT.to_string();
    let mut user_prompt = DEFAULT_USER_PROMPT.to_string();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
        };
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                filename = field.file_name().unwrap_or("upload").to_string();
                match field.bytes().await {
                    Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                    Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
                }
            }
            "limit" => {
                let text = field.text().await.unwrap_or_default();
                limit = parse_entry_limit(&text, state.pipeline.default_entry_limit());
            }
            "model" => {
                let text = field.text().await.unwrap_or_default();
                if !text.trim().is_empty() {
                    model = Some(text.trim().to_string());
                }
            }
            "system_prompt" => {
                let text = field.text().await.unwrap_or_default();
                if !text.trim().is_empty() {
                    system_prompt = text;
                }
            }
            "user_prompt" => {
                let text = field.text().await.unwrap_or_default();
                if !text.trim().is_empty() {
                    user_prompt = text;
                }
            }
            _ => {}
        }
    }

    let Some(bytes) = file_bytes else {
        return error_response(StatusCode::BAD_REQUEST, "No file was uploaded");
    };

    let hash = hex_sha256(&bytes);
    {
        let mut ui = state.ui.lock().await;
        ui.register_upload(hash);
        if !ui.run_state.trigger() {
            return error_response(StatusCode::CONFLICT, "An audit is already running");
        }
        ui.last_error = None;
    }

    info!(filename = %filename, "Audit triggered from the web shell");

    let run = state
        .pipeline
        .run(
            &bytes,
            &filename,
            limit,
            model.as_deref(),
            &system_prompt,
            &user_prompt,
        )
        .await;

    let mut ui = state.ui.lock().await;
    match run {
        Ok(outcome) => {
            ui.run_state.complete();
            let stats = serde_json::to_value(&outcome.stats).unwrap_or_default();
            let filename = outcome.filename.clone();
            ui.outcome = Some(outcome);
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "done",
                    "report_filename": filename,
                    "stats": stats,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Audit run failed");
            ui.run_state.fail();
            let message = e.to_string();
            ui.last_error = Some(message.clone());
            let status = match &e {
                AuditError::Decode(_) | AuditError::NoRecords => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error_response(status, &message)
        }
    }
}

/// Offer the rendered PDF for download; 404 until a run has completed.
async fn report_handler(State(state): State<AppState>) -> Response {
    let ui = state.ui.lock().await;
    match (&ui.run_state, &ui.outcome) {
        (RunState::Done, Some(outcome)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", outcome.filename),
                ),
            ],
            outcome.pdf.clone(),
        )
            .into_response(),
        _ => error_response(StatusCode::NOT_FOUND, "No completed audit report"),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Parse the UI limit field: "full" or a positive integer; anything else
/// falls back to the configured default.
fn parse_entry_limit(text: &str, default: usize) -> EntryLimit {
    match text.trim().to_lowercase().as_str() {
        "full" => EntryLimit::Full,
        other => EntryLimit::Count(other.parse::<usize>().unwrap_or(default)),
    }
}

fn hex_sha256(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().fold(String::with_capacity(64), |mut s, b| {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
        s
    })
}
