use std::future::Future;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{info, warn};

use lansia_core::{TtsError, TtsService};

pub mod api;
pub mod config;
pub mod telemetry;

pub use api::{router, AppState};
pub use config::ServerConfig;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Tts(#[from] TtsError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Tts(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            ApiError::Tts(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(target: "api", error = %self, "Request failed");
        }
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Bind and serve the HTTP API until `shutdown` resolves, then stop any active speech.
pub async fn start_server(
    config: ServerConfig,
    service: Arc<dyn TtsService>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Internal(format!("bind {}: {}", addr, e)))?;

    info!(target: "server", addr = %addr, backend = service.backend_name(), "Lansia TTS server listening");
    for (method, path, purpose) in api::ENDPOINTS {
        info!(target: "server", "   {:<4} {:<16} - {}", method, path, purpose);
    }

    let state = AppState::new(Arc::clone(&service), config.default_language.clone())
        .with_request_timeout(config.request_timeout());
    let app = router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    if let Err(e) = service.stop().await {
        warn!(target: "server", error = %e, "Failed to stop speech on shutdown");
    }
    info!(target: "server", "Lansia TTS server stopped");
    Ok(())
}
