use super::{SpeechResult, TtsService};
use crate::config::SpeechConfig;
use crate::{Result, TtsError};
use async_trait::async_trait;

const CLOUD_VOICES: [&str; 8] = [
    "id-ID-Standard-A",
    "id-ID-Standard-B",
    "id-ID-Standard-C",
    "id-ID-Standard-D",
    "en-US-Standard-A",
    "en-US-Standard-B",
    "en-US-Standard-C",
    "en-US-Standard-D",
];

/// Placeholder for a hosted TTS API. Speaking is not implemented; the voice
/// catalogue is static.
pub struct CloudTtsService {
    api_key: String,
}

impl CloudTtsService {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl TtsService for CloudTtsService {
    fn backend_name(&self) -> &'static str {
        "cloud"
    }

    async fn speak(&self, text: &str, config: SpeechConfig) -> Result<SpeechResult> {
        tracing::debug!(
            target: "tts",
            chars = text.chars().count(),
            language = %config.language,
            key_len = self.api_key.len(),
            "Cloud speak requested"
        );
        Err(TtsError::NotImplemented(
            "cloud TTS (use the system backend)".to_string(),
        ))
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn voices(&self) -> Result<Vec<String>> {
        Ok(CLOUD_VOICES.iter().map(|v| v.to_string()).collect())
    }

    async fn is_speaking(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cloud_stub_contract() {
        let svc = CloudTtsService::new("key");
        let err = svc.speak("halo", SpeechConfig::default()).await.unwrap_err();
        assert_eq!(err.code(), "NOT_IMPLEMENTED");
        assert!(svc.stop().await.is_ok());
        assert!(!svc.is_speaking().await);
        let voices = svc.voices().await.unwrap();
        assert_eq!(voices.len(), 8);
        assert_eq!(voices[0], "id-ID-Standard-A");
    }
}
