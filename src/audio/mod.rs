pub mod capture;
pub mod chime;
pub mod playback;

pub use capture::{samples_to_wav, AudioCapture, UtteranceDetector, CAPTURE_SAMPLE_RATE};
pub use chime::NotificationSound;
pub use playback::{clip_from_wav, AudioSink, CpalSink, PlaybackOutcome};

/// A chunk of mono audio ready for playback
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Audio samples (f32, mono)
    pub samples: Vec<f32>,

    /// Sample rate of the audio
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Get the duration of this clip in seconds
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Get the duration of this clip in milliseconds
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
