//! Notification cue playback
//!
//! The cue is decorative: it is loaded fresh from disk on every play and any
//! failure (missing asset, no output device) is swallowed so the surrounding
//! flow is never blocked.

use crate::audio::playback::{clip_from_wav, AudioSink, CpalSink};
use crate::audio::AudioClip;
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use tracing::debug;

/// Fire-and-forget player for the fixed notification cue
#[derive(Debug, Clone)]
pub struct NotificationSound {
    path: PathBuf,
}

impl NotificationSound {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Play the cue without blocking the caller
    pub fn play(&self) {
        let path = self.path.clone();
        std::thread::spawn(move || {
            if let Err(e) = play_cue(&path) {
                debug!("notification cue skipped: {}", e);
            }
        });
    }
}

fn play_cue(path: &Path) -> Result<()> {
    let clip = load_cue(path)?;
    let mut sink = CpalSink::new()?;
    sink.play(&clip, &AtomicBool::new(false))?;
    Ok(())
}

fn load_cue(path: &Path) -> Result<AudioClip> {
    let bytes = std::fs::read(path)?;
    clip_from_wav(&bytes)
}
