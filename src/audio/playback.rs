//! Audio playback to the default output device
//!
//! Playback is chunk-polled so an in-flight clip can be cancelled promptly.

use crate::audio::AudioClip;
use crate::{ParleyError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleRate;
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// How playback of a clip ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The clip played to its end
    Completed,
    /// The cancel flag was raised before the clip finished
    Cancelled,
}

/// Plays audio clips, honoring a shared cancel flag
pub trait AudioSink {
    fn play(&mut self, clip: &AudioClip, cancel: &AtomicBool) -> Result<PlaybackOutcome>;
}

/// Sink backed by the default cpal output device
pub struct CpalSink;

impl CpalSink {
    /// Create a new sink, verifying an output device is present
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        host.default_output_device()
            .ok_or_else(|| ParleyError::AudioDeviceError("No output device available".into()))?;
        Ok(Self)
    }
}

impl AudioSink for CpalSink {
    fn play(&mut self, clip: &AudioClip, cancel: &AtomicBool) -> Result<PlaybackOutcome> {
        if clip.is_empty() {
            return Ok(PlaybackOutcome::Completed);
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| ParleyError::AudioDeviceError("No output device available".into()))?;

        let supported = device
            .supported_output_configs()
            .map_err(|e| ParleyError::AudioDeviceError(format!("Failed to query output configs: {}", e)))?
            .find(|c| {
                c.channels() <= 2
                    && c.min_sample_rate() <= SampleRate(clip.sample_rate)
                    && c.max_sample_rate() >= SampleRate(clip.sample_rate)
            })
            .ok_or_else(|| {
                ParleyError::AudioDeviceError(format!(
                    "No output config supports {} Hz",
                    clip.sample_rate
                ))
            })?;

        let config = supported
            .with_sample_rate(SampleRate(clip.sample_rate))
            .config();
        let channels = config.channels as usize;

        let samples = Arc::new(clip.samples.clone());
        let position = Arc::new(Mutex::new(0usize));
        let finished = Arc::new(AtomicBool::new(false));

        let cb_samples = Arc::clone(&samples);
        let cb_position = Arc::clone(&position);
        let cb_finished = Arc::clone(&finished);

        let err_fn = |err| {
            error!("Audio output stream error: {}", err);
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = cb_position.lock();
                    for frame in data.chunks_mut(channels) {
                        let sample = if *pos < cb_samples.len() {
                            let s = cb_samples[*pos];
                            *pos += 1;
                            s
                        } else {
                            cb_finished.store(true, Ordering::Release);
                            0.0
                        };
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| ParleyError::AudioDeviceError(format!("Failed to build output stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| ParleyError::AudioDeviceError(format!("Failed to start output stream: {}", e)))?;

        // Poll until the clip drains, the caller cancels, or we time out
        let deadline = Instant::now() + Duration::from_millis(clip.duration_ms() + 500);
        while !finished.load(Ordering::Acquire) && !cancel.load(Ordering::Acquire) {
            if Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(25));
        }

        let cancelled = cancel.load(Ordering::Acquire) && !finished.load(Ordering::Acquire);
        drop(stream);

        if cancelled {
            debug!("playback cancelled at {} samples", *position.lock());
            Ok(PlaybackOutcome::Cancelled)
        } else {
            debug!("playback complete ({} samples)", samples.len());
            Ok(PlaybackOutcome::Completed)
        }
    }
}

/// Decode WAV bytes into a mono clip
///
/// Multi-channel audio is averaged down to mono.
pub fn clip_from_wav(bytes: &[u8]) -> Result<AudioClip> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| ParleyError::AudioDeviceError(format!("WAV decode error: {}", e)))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ParleyError::AudioDeviceError(format!("WAV decode error: {}", e)))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| ParleyError::AudioDeviceError(format!("WAV decode error: {}", e)))?
        }
    };

    let samples: Vec<f32> = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok(AudioClip::new(samples, spec.sample_rate))
}
