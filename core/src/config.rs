use serde::{Deserialize, Serialize};

pub const DEFAULT_LANGUAGE: &str = "id-ID";
pub const DEFAULT_SPEED: f64 = 1.0;
pub const DEFAULT_VOLUME: f64 = 1.0;

/// Nominal speed range advertised to clients; the command builder clamps anything outside it
pub const SPEED_RANGE: (f64, f64) = (0.5, 2.0);
pub const VOLUME_RANGE: (f64, f64) = (0.0, 1.0);

/// Per-utterance speech settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Locale code, e.g. "id-ID" or "en-US"
    #[serde(default)]
    pub language: String,
    /// 0.5 - 2.0, 1.0 is the engine's normal rate
    #[serde(default)]
    pub speed: f64,
    /// 0.0 - 1.0
    #[serde(default)]
    pub volume: f64,
    /// Engine-specific voice name; overrides the language table when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default = "default_use_system_tts")]
    pub use_system_tts: bool,
}

fn default_use_system_tts() -> bool {
    true
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            speed: DEFAULT_SPEED,
            volume: DEFAULT_VOLUME,
            voice: None,
            use_system_tts: true,
        }
    }
}

impl SpeechConfig {
    /// Replace unset (empty/zero) fields with defaults. Range clamping is left
    /// to the per-platform command builder.
    pub fn normalized(mut self) -> Self {
        if self.language.trim().is_empty() {
            self.language = DEFAULT_LANGUAGE.to_string();
        }
        if self.speed == 0.0 || !self.speed.is_finite() {
            self.speed = DEFAULT_SPEED;
        }
        if self.volume == 0.0 || !self.volume.is_finite() {
            self.volume = DEFAULT_VOLUME;
        }
        if matches!(self.voice.as_deref(), Some(v) if v.trim().is_empty()) {
            self.voice = None;
        }
        self
    }

    /// Voice override, if any
    pub fn voice_name(&self) -> Option<&str> {
        self.voice.as_deref()
    }
}
