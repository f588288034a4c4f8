//! Microphone capture and utterance endpointing

use crate::{ParleyError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Sample rate for audio capture (16kHz for speech)
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Minimum RMS energy to consider a chunk speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum accumulated speech before an utterance counts (0.3s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4_800;

/// Trailing silence that ends an utterance (0.8s at 16kHz)
const TRAILING_SILENCE_SAMPLES: usize = 12_800;

/// Captures audio from the default input device
pub struct AudioCapture {
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a new capture instance on the default input device
    pub fn new() -> Result<Self> {
        // Verify a usable device up front; the stream is built in start()
        let host = cpal::default_host();
        host.default_input_device()
            .ok_or_else(|| ParleyError::AudioDeviceError("No input device available".into()))?;

        Ok(Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Start capturing audio
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| ParleyError::AudioDeviceError("No input device available".into()))?;

        let supported = device
            .supported_input_configs()
            .map_err(|e| ParleyError::AudioDeviceError(format!("Failed to query input configs: {}", e)))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(CAPTURE_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(CAPTURE_SAMPLE_RATE)
            })
            .ok_or_else(|| ParleyError::AudioDeviceError("No suitable input config found".into()))?;

        let config = supported
            .with_sample_rate(SampleRate(CAPTURE_SAMPLE_RATE))
            .config();

        let buffer = Arc::clone(&self.buffer);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    buffer.lock().extend_from_slice(data);
                },
                |err| {
                    tracing::error!("Audio capture error: {}", err);
                },
                None,
            )
            .map_err(|e| ParleyError::AudioDeviceError(format!("Failed to build input stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| ParleyError::AudioDeviceError(format!("Failed to start input stream: {}", e)))?;
        self.stream = Some(stream);

        debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            debug!("audio capture stopped");
        }
    }

    /// Take the samples captured since the last call
    pub fn take_buffer(&self) -> Vec<f32> {
        std::mem::take(&mut *self.buffer.lock())
    }

    /// Clear the capture buffer
    pub fn clear_buffer(&self) {
        self.buffer.lock().clear();
    }

    /// Check if currently capturing
    pub fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }
}

/// Endpointing state for a single utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorState {
    /// Waiting for speech to begin
    Idle,
    /// Speech detected, accumulating the utterance
    Capturing,
}

/// Energy-based single-utterance endpointer
///
/// Feeds on capture chunks and reports end-of-utterance once enough speech
/// has been followed by the trailing-silence window.
pub struct UtteranceDetector {
    state: DetectorState,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
}

impl UtteranceDetector {
    pub fn new() -> Self {
        Self {
            state: DetectorState::Idle,
            speech_buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Process a chunk of samples; returns true when the utterance is complete
    pub fn process(&mut self, samples: &[f32]) -> bool {
        let is_speech = calculate_energy(samples) > ENERGY_THRESHOLD;

        match self.state {
            DetectorState::Idle => {
                if is_speech {
                    self.state = DetectorState::Capturing;
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                }
            }
            DetectorState::Capturing => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter > TRAILING_SILENCE_SAMPLES
                    && self.speech_buffer.len() > MIN_SPEECH_SAMPLES
                {
                    debug!(
                        samples = self.speech_buffer.len(),
                        "utterance complete"
                    );
                    return true;
                }
            }
        }

        false
    }

    /// Whether any speech has been accumulated
    pub fn has_speech(&self) -> bool {
        self.speech_buffer.len() > MIN_SPEECH_SAMPLES
    }

    /// Take the accumulated utterance, resetting the detector
    pub fn take_samples(&mut self) -> Vec<f32> {
        self.state = DetectorState::Idle;
        self.silence_counter = 0;
        std::mem::take(&mut self.speech_buffer)
    }

    /// Reset to idle, discarding any accumulated audio
    pub fn reset(&mut self) {
        self.state = DetectorState::Idle;
        self.speech_buffer.clear();
        self.silence_counter = 0;
    }
}

impl Default for UtteranceDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculate RMS energy of audio samples
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Convert f32 samples to 16-bit mono WAV bytes for transcription APIs
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| ParleyError::AudioDeviceError(format!("WAV encode error: {}", e)))?;

        for &sample in samples {
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| ParleyError::AudioDeviceError(format!("WAV encode error: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| ParleyError::AudioDeviceError(format!("WAV encode error: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speech_chunk() -> Vec<f32> {
        vec![0.5; 1600] // 100ms of loud signal
    }

    fn silence_chunk() -> Vec<f32> {
        vec![0.0; 1600]
    }

    #[test]
    fn test_energy_calculation() {
        assert!(calculate_energy(&silence_chunk()) < 0.001);
        assert!(calculate_energy(&speech_chunk()) > 0.4);
        assert_eq!(calculate_energy(&[]), 0.0);
    }

    #[test]
    fn test_detector_ignores_pure_silence() {
        let mut detector = UtteranceDetector::new();
        for _ in 0..50 {
            assert!(!detector.process(&silence_chunk()));
        }
        assert!(!detector.has_speech());
    }

    #[test]
    fn test_detector_completes_after_speech_then_silence() {
        let mut detector = UtteranceDetector::new();

        // Half a second of speech
        for _ in 0..5 {
            assert!(!detector.process(&speech_chunk()));
        }
        assert!(detector.has_speech());

        // Trailing silence ends the utterance after the silence window
        let mut complete = false;
        for _ in 0..12 {
            if detector.process(&silence_chunk()) {
                complete = true;
                break;
            }
        }
        assert!(complete);

        let samples = detector.take_samples();
        assert!(samples.len() > MIN_SPEECH_SAMPLES);
        assert!(!detector.has_speech());
    }

    #[test]
    fn test_detector_needs_minimum_speech() {
        let mut detector = UtteranceDetector::new();

        // A single 100ms blip is below the minimum-speech bar
        detector.process(&speech_chunk());
        for _ in 0..20 {
            assert!(!detector.process(&silence_chunk()));
        }
    }

    #[test]
    fn test_wav_encoding() {
        let samples: Vec<f32> = (0..1600).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();
        let wav = samples_to_wav(&samples, CAPTURE_SAMPLE_RATE).unwrap();

        let reader = hound::WavReader::new(std::io::Cursor::new(&wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, CAPTURE_SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len() as usize, samples.len());
    }
}
