//! HTTP speech providers
//!
//! Production implementations of the synthesis and transcription traits,
//! backed by OpenAI-style speech endpoints. Both run on pipeline worker
//! threads, so the blocking client is used directly.

use crate::audio::playback::clip_from_wav;
use crate::audio::AudioClip;
use crate::config::{RecognitionConfig, SynthesisConfig};
use crate::speech::{Synthesizer, Transcriber};
use crate::{ParleyError, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Request timeout for speech provider calls
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(serde::Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Synthesizer backed by an HTTP text-to-speech endpoint
pub struct HttpSynthesizer {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    voice: String,
    model: String,
    base_speed: f32,
}

impl HttpSynthesizer {
    /// Create a synthesizer from configuration
    pub fn new(config: &SynthesisConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ParleyError::ConfigError(
                "API key required for speech synthesis".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| ParleyError::SynthesisError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            voice: config.voice.clone(),
            model: config.model.clone(),
            base_speed: config.speed,
        })
    }
}

impl Synthesizer for HttpSynthesizer {
    fn synthesize(&mut self, text: &str, speed: f32) -> Result<AudioClip> {
        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.base_speed * speed,
            response_format: "wav",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| ParleyError::SynthesisError(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ParleyError::SynthesisError(format!(
                "speech API error {}: {}",
                status, body
            )));
        }

        let audio = response
            .bytes()
            .map_err(|e| ParleyError::SynthesisError(e.to_string()))?;

        debug!("synthesized {} bytes of audio", audio.len());
        clip_from_wav(&audio)
    }
}

/// Transcriber backed by an HTTP speech-to-text endpoint
///
/// The recognition language is fixed at construction; there is no
/// per-session locale switching.
pub struct HttpTranscriber {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    language: String,
}

impl HttpTranscriber {
    /// Create a transcriber from configuration
    pub fn new(config: &RecognitionConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ParleyError::ConfigError(
                "API key required for speech recognition".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| ParleyError::RecognitionError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            language: config.language.clone(),
        })
    }
}

impl Transcriber for HttpTranscriber {
    fn transcribe(&mut self, wav: &[u8]) -> Result<String> {
        debug!("transcribing {} bytes of audio", wav.len());

        let form = reqwest::blocking::multipart::Form::new()
            .part(
                "file",
                reqwest::blocking::multipart::Part::bytes(wav.to_vec())
                    .file_name("utterance.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| ParleyError::RecognitionError(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| ParleyError::RecognitionError(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ParleyError::RecognitionError(format!(
                "transcription API error {}: {}",
                status, body
            )));
        }

        let result: TranscriptionResponse = response
            .json()
            .map_err(|e| ParleyError::RecognitionError(format!("malformed response: {}", e)))?;

        Ok(result.text)
    }
}
