//! HTTP server for the summarize form.
//!
//! `POST /summarize` runs the pipeline, `/files/...` serves the exported
//! files and `/health` answers liveness checks.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::error::{ErrorKind, TldwError};
use crate::export::Exporter;
use crate::orchestrator::Orchestrator;
use crate::request::{FileType, OutputType, RequestSpec, ResponsePayload};
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP server.
pub async fn run_serve(host: Option<&str>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check_pipeline() {
        Output::warning(&format!("{} (requests will fail until this is fixed)", e));
    }

    let host = host.unwrap_or(settings.server.host.as_str()).to_string();
    let port = port.unwrap_or(settings.server.port);
    let route_prefix = normalize_prefix(&settings.export.route_prefix)?;

    let files_dir = settings.files_dir();
    std::fs::create_dir_all(&files_dir)?;

    let state = Arc::new(AppState {
        orchestrator: Orchestrator::new(&settings)?,
    });

    if let Some(max_age) = settings.export.retention() {
        spawn_export_sweeper(state.orchestrator.exporter().clone(), max_age);
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/summarize", post(summarize))
        .route("/summarize/", post(summarize))
        .nest_service(&route_prefix, ServeDir::new(&files_dir))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("tldw server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Summarize", "POST /summarize");
    Output::kv("Files", &format!("GET  {}/...", route_prefix));
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Periodically delete export directories older than `max_age`.
fn spawn_export_sweeper(exporter: Exporter, max_age: Duration) {
    let period = max_age.min(Duration::from_secs(3600));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Err(e) = exporter.sweep_expired(max_age).await {
                warn!("Export sweep failed: {}", e);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Route prefixes must be absolute and non-root.
fn normalize_prefix(prefix: &str) -> anyhow::Result<String> {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        anyhow::bail!("export.route_prefix must not be empty or '/'");
    }
    Ok(format!("/{}", trimmed))
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
struct SummarizeForm {
    youtube_url: String,
    #[serde(default)]
    output_type: OutputType,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    file_type: FileType,
}

fn default_language() -> String {
    "en".to_string()
}

impl From<SummarizeForm> for RequestSpec {
    fn from(form: SummarizeForm) -> Self {
        RequestSpec::new(form.youtube_url)
            .with_output_type(form.output_type)
            .with_language(form.language)
            .with_file_type(form.file_type)
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    kind: ErrorKind,
}

/// Pipeline failure rendered as `{error, kind}`.
struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl From<TldwError> for ApiError {
    fn from(e: TldwError) -> Self {
        Self {
            status: status_for(&e),
            body: ErrorResponse {
                error: e.to_string(),
                kind: e.kind(),
            },
        }
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: rejection.body_text(),
                kind: ErrorKind::InvalidRequest,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn status_for(e: &TldwError) -> StatusCode {
    if matches!(e, TldwError::Timeout { .. }) {
        return StatusCode::GATEWAY_TIMEOUT;
    }
    match e.kind() {
        ErrorKind::InvalidReference | ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Acquisition | ErrorKind::Transcription | ErrorKind::UpstreamService => {
            StatusCode::BAD_GATEWAY
        }
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::CacheWrite | ErrorKind::Export | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn summarize(
    State(state): State<Arc<AppState>>,
    form: Result<Form<SummarizeForm>, FormRejection>,
) -> Result<Json<ResponsePayload>, ApiError> {
    let Form(form) = form?;
    let spec = RequestSpec::from(form);

    match state.orchestrator.process(&spec).await {
        Ok(payload) => Ok(Json(payload)),
        Err(e) => {
            error!("Request for {} failed: {}", spec.reference, e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&TldwError::InvalidReference("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&TldwError::InvalidRequest("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&TldwError::Acquisition("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&TldwError::Upstream("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&TldwError::Timeout { stage: Stage::Generation, secs: 1 }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&TldwError::Config("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_carries_kind() {
        let err = ApiError::from(TldwError::Transcription("model down".into()));
        let json = serde_json::to_value(&err.body).unwrap();
        assert_eq!(json["kind"], "transcription");
        assert!(json["error"].as_str().unwrap().contains("model down"));
    }

    #[test]
    fn test_form_defaults() {
        let form: SummarizeForm =
            serde_json::from_str(r#"{"youtube_url": "https://youtu.be/AAAAAAAAAAA"}"#).unwrap();
        let spec = RequestSpec::from(form);
        assert_eq!(spec.output_type, OutputType::Both);
        assert_eq!(spec.language, "en");
        assert_eq!(spec.file_type, FileType::Both);
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/files/").unwrap(), "/files");
        assert_eq!(normalize_prefix("exports").unwrap(), "/exports");
        assert!(normalize_prefix("/").is_err());
    }
}
