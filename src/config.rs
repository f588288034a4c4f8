//! Configuration for the application
//!
//! Provides centralized configuration for the backend endpoint, the speech
//! capability providers, and the notification cue.

use std::path::PathBuf;

/// Environment variable naming the backend answer endpoint.
pub const BACKEND_URL_ENV: &str = "PARLEY_BACKEND_URL";

/// Environment variable carrying the speech provider API key.
///
/// When unset, both synthesis and recognition run in their degraded
/// "capability absent" modes.
pub const SPEECH_API_KEY_ENV: &str = "PARLEY_SPEECH_API_KEY";

/// Environment variable overriding the notification cue asset path.
pub const CHIME_PATH_ENV: &str = "PARLEY_CHIME";

/// Configuration for the backend answer endpoint
#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// Full URL of the question/answer endpoint
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000/ask".to_string(),
            timeout_secs: 10,
        }
    }
}

impl BackendConfig {
    /// Set the endpoint URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Configuration for the speech synthesis provider
#[derive(Clone, Debug)]
pub struct SynthesisConfig {
    /// Speech endpoint URL
    pub endpoint: String,

    /// API key for the provider
    pub api_key: String,

    /// Voice to synthesize with
    pub voice: String,

    /// Provider model name
    pub model: String,

    /// Base speech rate (1.0 = normal)
    pub speed: f32,
}

impl SynthesisConfig {
    /// Create a synthesis config with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/speech".to_string(),
            api_key: api_key.into(),
            voice: "alloy".to_string(),
            model: "tts-1".to_string(),
            speed: 1.0,
        }
    }

    /// Set the voice
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Set the speech rate
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }
}

/// Configuration for the speech recognition provider
#[derive(Clone, Debug)]
pub struct RecognitionConfig {
    /// Transcription endpoint URL
    pub endpoint: String,

    /// API key for the provider
    pub api_key: String,

    /// Provider model name
    pub model: String,

    /// Recognition language (fixed; no per-session switching)
    pub language: String,
}

impl RecognitionConfig {
    /// Create a recognition config with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            api_key: api_key.into(),
            model: "whisper-1".to_string(),
            language: "en".to_string(),
        }
    }
}

/// Configuration for the complete application
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Backend endpoint configuration
    pub backend: BackendConfig,

    /// Synthesis provider; `None` means the capability is absent
    pub synthesis: Option<SynthesisConfig>,

    /// Recognition provider; `None` means the capability is absent
    pub recognition: Option<RecognitionConfig>,

    /// Path to the notification cue WAV asset
    pub chime_path: PathBuf,

    /// Greeting appended to the transcript at startup
    pub greeting: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            synthesis: None,
            recognition: None,
            chime_path: PathBuf::from("assets/chime.wav"),
            greeting: Some(
                "Welcome! Ask a question by typing below or using the voice button.".to_string(),
            ),
        }
    }
}

impl AppConfig {
    /// Build the configuration from the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var(BACKEND_URL_ENV) {
            let endpoint = endpoint.trim();
            if !endpoint.is_empty() {
                config.backend.endpoint = endpoint.to_string();
            }
        }

        if let Ok(key) = std::env::var(SPEECH_API_KEY_ENV) {
            let key = key.trim();
            if !key.is_empty() {
                config.synthesis = Some(SynthesisConfig::new(key));
                config.recognition = Some(RecognitionConfig::new(key));
            }
        }

        if let Ok(path) = std::env::var(CHIME_PATH_ENV) {
            if !path.trim().is_empty() {
                config.chime_path = PathBuf::from(path);
            }
        }

        config
    }

    /// Disable speech output (text-only replies)
    pub fn without_synthesis(mut self) -> Self {
        self.synthesis = None;
        self
    }

    /// Disable speech input (typed questions only)
    pub fn without_recognition(mut self) -> Self {
        self.recognition = None;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.backend.endpoint.trim().is_empty() {
            return Err("Backend endpoint is required".to_string());
        }

        if self.backend.timeout_secs == 0 {
            return Err("Backend timeout must be non-zero".to_string());
        }

        if let Some(synthesis) = &self.synthesis {
            if synthesis.api_key.is_empty() {
                return Err("Synthesis API key is required".to_string());
            }
            if !(0.25..=4.0).contains(&synthesis.speed) {
                return Err(format!(
                    "Synthesis speed out of range: {}",
                    synthesis.speed
                ));
            }
        }

        if let Some(recognition) = &self.recognition {
            if recognition.api_key.is_empty() {
                return Err("Recognition API key is required".to_string());
            }
            if recognition.language.is_empty() {
                return Err("Recognition language is required".to_string());
            }
        }

        Ok(())
    }
}
