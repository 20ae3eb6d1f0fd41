// HTTP API
//
// JSON endpoints around a shared TtsService. The service is injected through
// axum state; handlers only decode, call in, and shape responses.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use lansia_core::config::{DEFAULT_SPEED, DEFAULT_VOLUME, SPEED_RANGE, VOLUME_RANGE};
use lansia_core::tts::MAX_TEXT_CHARS;
use lansia_core::{sanitize, Platform, SpeechConfig, TtsService};

use crate::{ApiError, Result};

/// (method, path, purpose), logged at startup and advertised by /api/config
pub const ENDPOINTS: [(&str, &str, &str); 6] = [
    ("POST", "/api/tts", "Text to Speech"),
    ("POST", "/api/tts/stop", "Stop current speech"),
    ("GET", "/api/tts/voices", "Available voices"),
    ("GET", "/api/voices", "Available voices"),
    ("GET", "/api/health", "Health check"),
    ("GET", "/api/config", "Extension configuration"),
];

const SUPPORTED_LANGUAGES: [&str; 2] = ["id-ID", "en-US"];

/// Upper bound on one request, body read to response written
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    service: Arc<dyn TtsService>,
    default_language: String,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<dyn TtsService>, default_language: impl Into<String>) -> Self {
        Self {
            service,
            default_language: default_language.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Requests running past the state's timeout get 408
pub fn router(state: AppState) -> Router {
    let request_timeout = state.request_timeout;
    Router::new()
        .route("/api/tts", post(speak_handler))
        .route("/api/tts/stop", post(stop_handler))
        .route("/api/tts/voices", get(voices_handler))
        .route("/api/voices", get(voices_handler))
        .route("/api/health", get(health_handler))
        .route("/api/config", get(config_handler))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Browser extensions and local pages only
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            |origin: &HeaderValue, _parts: &Parts| {
                origin.to_str().map(is_allowed_origin).unwrap_or(false)
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(300))
}

pub(crate) fn is_allowed_origin(origin: &str) -> bool {
    if origin.starts_with("chrome-extension://") || origin.starts_with("moz-extension://") {
        return true;
    }
    ["http://localhost", "http://127.0.0.1"].iter().any(|host| {
        origin.strip_prefix(host).is_some_and(|rest| {
            rest.is_empty()
                || rest
                    .strip_prefix(':')
                    .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
        })
    })
}

/// Accepts both `{text, config: {...}}` and the flattened extension shape
/// `{text, speed, lang}`. Flattened fields only fill what `config` leaves unset.
#[derive(Debug, Default, Deserialize)]
struct SpeakRequest {
    #[serde(default)]
    text: String,
    #[serde(default)]
    config: Option<SpeechConfig>,
    #[serde(default, alias = "language")]
    lang: Option<String>,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
    #[serde(default)]
    voice: Option<String>,
}

impl SpeakRequest {
    fn speech_config(&self, default_language: &str) -> SpeechConfig {
        let mut cfg = self.config.clone().unwrap_or(SpeechConfig {
            language: String::new(),
            speed: 0.0,
            volume: 0.0,
            voice: None,
            use_system_tts: true,
        });
        if cfg.language.trim().is_empty() {
            cfg.language = self
                .lang
                .clone()
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| default_language.to_string());
        }
        if cfg.speed == 0.0 {
            cfg.speed = self.speed.unwrap_or(0.0);
        }
        if cfg.volume == 0.0 {
            cfg.volume = self.volume.unwrap_or(0.0);
        }
        if cfg.voice.is_none() {
            cfg.voice = self.voice.clone();
        }
        cfg.normalized()
    }
}

async fn speak_handler(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let req: SpeakRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid request: {}", e)))?;

    let text = sanitize(&req.text)?;
    let config = req.speech_config(&state.default_language);
    debug!(target: "api", chars = text.chars().count(), language = %config.language, speed = config.speed, "Speak request");

    let result = state.service.speak(&text, config).await.map_err(|e| {
        if e.is_validation() {
            ApiError::Tts(e)
        } else {
            ApiError::Internal(format!("TTS failed: {}", e))
        }
    })?;

    if !result.success {
        return Ok((StatusCode::BAD_REQUEST, Json(result)).into_response());
    }
    Ok(Json(result).into_response())
}

async fn stop_handler(State(state): State<AppState>) -> Result<Json<Value>> {
    state.service.stop().await?;
    info!(target: "api", "Speech stopped by request");
    Ok(Json(json!({ "status": "stopped" })))
}

async fn voices_handler(State(state): State<AppState>) -> Result<Json<Value>> {
    let voices = state.service.voices().await?;
    Ok(Json(json!({
        "count": voices.len(),
        "voices": voices,
        "default": state.default_language,
    })))
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "tts",
        "backend": state.service.backend_name(),
        "speaking": state.service.is_speaking().await,
        "timestamp": chrono::Utc::now().timestamp(),
        "os": std::env::consts::OS,
    }))
}

async fn config_handler(State(state): State<AppState>) -> Json<Value> {
    let defaults = SpeechConfig {
        language: state.default_language.clone(),
        ..SpeechConfig::default()
    };
    let endpoints: Vec<Value> = ENDPOINTS
        .iter()
        .map(|(method, path, purpose)| json!({ "method": method, "path": path, "description": purpose }))
        .collect();
    Json(json!({
        "default_config": defaults,
        "supported_languages": SUPPORTED_LANGUAGES,
        "speed": { "min": SPEED_RANGE.0, "max": SPEED_RANGE.1, "default": DEFAULT_SPEED },
        "volume": { "min": VOLUME_RANGE.0, "max": VOLUME_RANGE.1, "default": DEFAULT_VOLUME },
        "max_text_length": MAX_TEXT_CHARS,
        "platform": Platform::current().as_str(),
        "backend": state.service.backend_name(),
        "endpoints": endpoints,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_origins() {
        for origin in [
            "chrome-extension://abcdefghijklmnop",
            "moz-extension://1234-5678",
            "http://localhost",
            "http://localhost:3000",
            "http://127.0.0.1:8080",
        ] {
            assert!(is_allowed_origin(origin), "{origin} should be allowed");
        }
        for origin in [
            "https://evil.example",
            "http://localhost.evil.example",
            "http://localhost:",
            "http://127.0.0.1:80abc",
            "https://localhost:3000",
        ] {
            assert!(!is_allowed_origin(origin), "{origin} should be rejected");
        }
    }

    #[test]
    fn test_nested_config_request() {
        let req: SpeakRequest = serde_json::from_str(
            r#"{"text":"hi","config":{"language":"en-US","speed":1.5,"volume":0.5,"voice":"","use_system_tts":true}}"#,
        )
        .unwrap();
        let cfg = req.speech_config("id-ID");
        assert_eq!(cfg.language, "en-US");
        assert_eq!(cfg.speed, 1.5);
        assert_eq!(cfg.volume, 0.5);
        assert_eq!(cfg.voice, None);
    }

    #[test]
    fn test_flattened_request() {
        let req: SpeakRequest =
            serde_json::from_str(r#"{"text":"halo","speed":0.8,"lang":"id-ID"}"#).unwrap();
        let cfg = req.speech_config("en-US");
        assert_eq!(cfg.language, "id-ID");
        assert_eq!(cfg.speed, 0.8);
        assert_eq!(cfg.volume, 1.0);
    }

    #[test]
    fn test_empty_request_uses_defaults() {
        let req: SpeakRequest = serde_json::from_str(r#"{"text":"halo"}"#).unwrap();
        let cfg = req.speech_config("en-US");
        assert_eq!(cfg.language, "en-US");
        assert_eq!(cfg.speed, 1.0);
        assert_eq!(cfg.volume, 1.0);
    }
}
