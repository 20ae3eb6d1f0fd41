// Lansia Core Library
// System text-to-speech: sanitize text, build the platform engine invocation,
// run it as a single-flight speech session.

pub mod config;
pub mod tts;

// Export core types
pub use config::SpeechConfig;
pub use tts::{
    create_service, list_voices, sanitize, BackendKind, CloudTtsService, CommandBuilder,
    EngineLocator, ExternalInvocation, PathLocator, Platform, PlatformCommandBuilder,
    SpeechResult, SystemTtsService, TtsService,
};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("{0}")]
    Validation(String),

    #[error("unsupported OS: {0}")]
    UnsupportedPlatform(String),

    #[error("no TTS engine found: {0}")]
    NoEngineFound(String),

    #[error("failed to run TTS engine: {0}")]
    ProcessExecution(String),

    #[error("failed to stop TTS: {0}")]
    Stop(String),

    #[error("voice engine error: {0}")]
    Engine(String),

    #[error("{0} not implemented")]
    NotImplemented(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TtsError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            TtsError::Validation(_) => "VALIDATION_ERROR",
            TtsError::UnsupportedPlatform(_) => "UNSUPPORTED_PLATFORM",
            TtsError::NoEngineFound(_) => "NO_ENGINE_FOUND",
            TtsError::ProcessExecution(_) => "PROCESS_EXECUTION_ERROR",
            TtsError::Stop(_) => "STOP_ERROR",
            TtsError::Engine(_) => "ENGINE_ERROR",
            TtsError::NotImplemented(_) => "NOT_IMPLEMENTED",
            TtsError::Io(_) => "IO_ERROR",
        }
    }

    /// Caller mistakes (bad input) as opposed to engine/host failures
    pub fn is_validation(&self) -> bool {
        matches!(self, TtsError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, TtsError>;
