//! Speech capability providers and pipelines
//!
//! The platform features the conversation depends on (synthesis, capture,
//! transcription) are injected behind small traits so the pipelines run
//! against either the production providers or deterministic test doubles.

pub mod http;
pub mod input;
pub mod output;

pub use http::{HttpSynthesizer, HttpTranscriber};
pub use input::{ListenCommand, MicSource, RecognitionEvent, SpeechInput, SpeechInputHandle};
pub use output::{
    Control, SpeechCommand, SpeechOutput, SpeechOutputEvent, SpeechOutputHandle,
    ANNOUNCE_SPEECH_RATE, DEFAULT_SPEECH_RATE,
};

use crate::audio::AudioClip;
use crate::Result;

/// Converts text into audible speech
pub trait Synthesizer {
    fn synthesize(&mut self, text: &str, speed: f32) -> Result<AudioClip>;
}

/// Turns a recorded utterance (WAV bytes) into text
pub trait Transcriber {
    fn transcribe(&mut self, wav: &[u8]) -> Result<String>;
}

/// Captures a single utterance from the user
pub trait UtteranceSource {
    /// Record until end-of-utterance or the listening window closes.
    ///
    /// Returns `Ok(None)` when nothing was heard.
    fn record_utterance(&mut self) -> Result<Option<Vec<f32>>>;

    /// Sample rate of the recorded samples
    fn sample_rate(&self) -> u32;
}
