//! Text-to-Speech services
//!
//! - `sanitize`: text normalization before anything reaches an engine
//! - `command`: per-platform engine invocation (say / espeak / festival / PowerShell)
//! - `session`: single-flight speech session around the external process
//! - `voices`: installed voice listing
//! - `cloud`: hosted backend placeholder
//!
//! Backends implement [`TtsService`]; pick one with [`create_service`].

mod cloud;
mod command;
mod sanitize;
mod session;
mod voices;

pub use cloud::CloudTtsService;
pub use command::{
    CommandBuilder, EngineLocator, ExternalInvocation, PathLocator, Platform,
    PlatformCommandBuilder,
};
pub use sanitize::{sanitize, ELLIPSIS, MAX_TEXT_CHARS};
pub use session::SystemTtsService;
pub use voices::{list_voices, parse_espeak_voices, parse_say_voices, parse_windows_voices};

use crate::config::SpeechConfig;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a speak request. `duration_ms` is setup time only; playback is
/// asynchronous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechResult {
    pub success: bool,
    pub duration_ms: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpeechResult {
    pub fn succeeded(elapsed: Duration) -> Self {
        Self {
            success: true,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            duration_ms: 0.0,
            timestamp: Utc::now(),
            error: Some(message.into()),
        }
    }
}

#[async_trait]
pub trait TtsService: Send + Sync {
    /// Short backend identifier ("system", "cloud")
    fn backend_name(&self) -> &'static str;

    /// Start speaking `text`. Returns once the engine is launched.
    async fn speak(&self, text: &str, config: SpeechConfig) -> Result<SpeechResult>;

    /// Cancel the active utterance; no-op when idle
    async fn stop(&self) -> Result<()>;

    async fn voices(&self) -> Result<Vec<String>>;

    async fn is_speaking(&self) -> bool;
}

/// Backend selection, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    System,
    Cloud {
        api_key: String,
    },
}

/// Build the service for `kind`. A cloud backend without an API key falls
/// back to the system engine.
pub fn create_service(kind: BackendKind) -> Arc<dyn TtsService> {
    match kind {
        BackendKind::Cloud { api_key } if !api_key.is_empty() => {
            Arc::new(CloudTtsService::new(api_key))
        }
        _ => Arc::new(SystemTtsService::new()),
    }
}
