use std::fs;
use std::path::Path;
use std::time::Duration;

use lansia_core::config::DEFAULT_LANGUAGE;
use lansia_core::BackendKind;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// HTTP server configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// "system" or "cloud"
    pub backend: String,
    pub cloud_api_key: Option<String>,
    /// Language reported as the default voice and used when a request sends none
    pub default_language: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            backend: "system".to_string(),
            cloud_api_key: None,
            default_language: DEFAULT_LANGUAGE.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    /// Defaults, then `LANSIA_*` env vars, then the TOML file named by
    /// `LANSIA_CONFIG` (default `./lansia.toml`) if it exists.
    pub fn load() -> Self {
        let base = Self::default().with_env(|key| std::env::var(key).ok());
        let path = std::env::var("LANSIA_CONFIG").unwrap_or_else(|_| "lansia.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "server", path = %path, "No TOML config found; using defaults/env");
            return base;
        }
        match fs::read_to_string(p) {
            Ok(s) => match Self::overlay_toml(base.clone(), &s) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(target: "server", error = %e, "Failed to parse TOML; using defaults/env");
                    base
                }
            },
            Err(e) => {
                tracing::warn!(target: "server", error = %e, "Failed to read TOML; using defaults/env");
                base
            }
        }
    }

    /// Overlay environment values read through `lookup`
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        if let Some(v) = get("LANSIA_HOST") {
            self.host = v;
        }
        if let Some(v) = get("LANSIA_PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.port = v;
        }
        if let Some(v) = get("LANSIA_TTS_BACKEND") {
            self.backend = v.to_lowercase();
        }
        if let Some(v) = get("LANSIA_CLOUD_API_KEY") {
            self.cloud_api_key = Some(v);
        }
        if let Some(v) = get("LANSIA_DEFAULT_LANGUAGE") {
            self.default_language = v;
        }
        if let Some(v) = get("LANSIA_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            self.request_timeout_secs = v;
        }
        self
    }

    /// Overlay a TOML document; unset keys keep their current value
    pub fn overlay_toml(self, source: &str) -> Result<Self, toml::de::Error> {
        let t: ServerToml = toml::from_str(source)?;
        Ok(t.apply(self))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn backend_kind(&self) -> BackendKind {
        match self.backend.as_str() {
            "cloud" => BackendKind::Cloud {
                api_key: self.cloud_api_key.clone().unwrap_or_default(),
            },
            _ => BackendKind::System,
        }
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ServerToml {
    pub server: Option<ListenToml>,
    pub tts: Option<TtsToml>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ListenToml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct TtsToml {
    pub backend: Option<String>,
    pub cloud_api_key: Option<String>,
    pub default_language: Option<String>,
}

impl ServerToml {
    fn apply(self, mut base: ServerConfig) -> ServerConfig {
        if let Some(s) = self.server {
            if let Some(x) = s.host {
                base.host = x;
            }
            if let Some(x) = s.port {
                base.port = x;
            }
            if let Some(x) = s.request_timeout_secs {
                base.request_timeout_secs = x;
            }
        }
        if let Some(t) = self.tts {
            if let Some(x) = t.backend {
                base.backend = x.to_lowercase();
            }
            if let Some(x) = t.cloud_api_key {
                base.cloud_api_key = Some(x);
            }
            if let Some(x) = t.default_language {
                base.default_language = x;
            }
        }
        base
    }
}
