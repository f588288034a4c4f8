//! Speech output pipeline
//!
//! Channel-based synthesis + playback with a shared speaking flag and prompt
//! cancellation. Utterances are correlated by id so chained flows (announce,
//! then act) key off the completion event for the utterance they issued.

use crate::audio::playback::{AudioSink, PlaybackOutcome};
use crate::speech::Synthesizer;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Speech rate for ordinary output
pub const DEFAULT_SPEECH_RATE: f32 = 1.0;

/// Slightly slowed rate used for control announcements
pub const ANNOUNCE_SPEECH_RATE: f32 = 0.9;

/// Interactive controls that can be announced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    TextInput,
    Send,
    Voice,
    Stop,
}

impl Control {
    /// The fixed spoken label for this control, if it has one
    pub fn spoken_label(self) -> Option<&'static str> {
        match self {
            Control::TextInput => None,
            Control::Send => Some("Send button."),
            Control::Voice => Some("Voice button."),
            Control::Stop => Some("Stop button."),
        }
    }
}

/// Command sent to the speech output pipeline
#[derive(Debug, Clone)]
pub enum SpeechCommand {
    /// Synthesize and play an utterance
    Speak {
        /// Text to speak
        text: String,
        /// Correlation id for completion events
        utterance_id: Uuid,
        /// Speech rate (1.0 = normal)
        speed: f32,
    },

    /// Shutdown the pipeline
    Shutdown,
}

/// Event emitted by the speech output pipeline
#[derive(Debug, Clone)]
pub enum SpeechOutputEvent {
    /// An utterance began playing
    Started { utterance_id: Uuid },

    /// An utterance played to completion
    Finished { utterance_id: Uuid },

    /// An utterance was cancelled before completion; no `Finished` follows
    Cancelled { utterance_id: Uuid },

    /// Synthesis or playback failed for an utterance
    Error { error: String, utterance_id: Uuid },

    /// Pipeline has shut down
    Shutdown,
}

/// Builds the synthesis backend inside the worker thread.
///
/// Returning `None` for either half leaves the pipeline in its degraded
/// mode: Speak commands become silent no-ops and no events are emitted.
pub type SpeechBackendFactory =
    Box<dyn FnOnce() -> (Option<Box<dyn Synthesizer>>, Option<Box<dyn AudioSink>>) + Send>;

/// Speech output pipeline with channel-based communication
pub struct SpeechOutput {
    command_tx: Sender<SpeechCommand>,
    command_rx: Receiver<SpeechCommand>,
    event_tx: Sender<SpeechOutputEvent>,
    event_rx: Receiver<SpeechOutputEvent>,
    speaking: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

impl SpeechOutput {
    /// Create a new pipeline
    pub fn new() -> Self {
        let (command_tx, command_rx) = bounded(64);
        let (event_tx, event_rx) = bounded(64);

        Self {
            command_tx,
            command_rx,
            event_tx,
            event_rx,
            speaking: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle for issuing commands and draining events
    pub fn handle(&self) -> SpeechOutputHandle {
        SpeechOutputHandle {
            command_tx: self.command_tx.clone(),
            event_rx: self.event_rx.clone(),
            speaking: Arc::clone(&self.speaking),
            cancel: Arc::clone(&self.cancel),
        }
    }

    /// Get a receiver for the raw command stream (used by tests)
    pub fn command_receiver(&self) -> Receiver<SpeechCommand> {
        self.command_rx.clone()
    }

    /// Start the pipeline worker thread
    pub fn start_worker(self, backend: SpeechBackendFactory) -> JoinHandle<()> {
        let command_rx = self.command_rx.clone();
        let event_tx = self.event_tx.clone();
        let speaking = Arc::clone(&self.speaking);
        let cancel = Arc::clone(&self.cancel);

        thread::spawn(move || {
            info!("speech output worker starting");

            let mut backend = match backend() {
                (Some(synthesizer), Some(sink)) => Some((synthesizer, sink)),
                _ => {
                    info!("speech synthesis unavailable; speech output disabled");
                    None
                }
            };

            loop {
                match command_rx.recv() {
                    Ok(SpeechCommand::Speak {
                        text,
                        utterance_id,
                        speed,
                    }) => {
                        // Capability absent: silent no-op, no events
                        let Some((synthesizer, sink)) = backend.as_mut() else {
                            continue;
                        };

                        cancel.store(false, Ordering::Release);
                        speaking.store(true, Ordering::Release);
                        let _ = event_tx.send(SpeechOutputEvent::Started { utterance_id });

                        debug!("speaking: {}", text);

                        let clip = match synthesizer.synthesize(&text, speed) {
                            Ok(clip) => clip,
                            Err(e) => {
                                speaking.store(false, Ordering::Release);
                                warn!("synthesis failed: {}", e);
                                let _ = event_tx.send(SpeechOutputEvent::Error {
                                    error: e.to_string(),
                                    utterance_id,
                                });
                                continue;
                            }
                        };

                        match sink.play(&clip, &cancel) {
                            Ok(PlaybackOutcome::Completed) => {
                                speaking.store(false, Ordering::Release);
                                let _ = event_tx.send(SpeechOutputEvent::Finished { utterance_id });
                            }
                            Ok(PlaybackOutcome::Cancelled) => {
                                speaking.store(false, Ordering::Release);
                                let _ = event_tx.send(SpeechOutputEvent::Cancelled { utterance_id });
                                // Flush anything queued behind the cancelled
                                // utterance, mirroring platform cancel
                                if drain_queued(&command_rx) {
                                    let _ = event_tx.send(SpeechOutputEvent::Shutdown);
                                    break;
                                }
                            }
                            Err(e) => {
                                speaking.store(false, Ordering::Release);
                                warn!("playback failed: {}", e);
                                let _ = event_tx.send(SpeechOutputEvent::Error {
                                    error: e.to_string(),
                                    utterance_id,
                                });
                            }
                        }
                    }

                    Ok(SpeechCommand::Shutdown) => {
                        info!("speech output worker shutting down");
                        let _ = event_tx.send(SpeechOutputEvent::Shutdown);
                        break;
                    }

                    Err(e) => {
                        debug!("speech command channel closed: {}", e);
                        break;
                    }
                }
            }

            info!("speech output worker stopped");
        })
    }
}

impl Default for SpeechOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Discard queued Speak commands after a cancellation.
///
/// Returns true if a Shutdown command was drained.
fn drain_queued(command_rx: &Receiver<SpeechCommand>) -> bool {
    while let Ok(command) = command_rx.try_recv() {
        if matches!(command, SpeechCommand::Shutdown) {
            return true;
        }
    }
    false
}

/// Handle for controlling the speech output pipeline
#[derive(Clone)]
pub struct SpeechOutputHandle {
    command_tx: Sender<SpeechCommand>,
    event_rx: Receiver<SpeechOutputEvent>,
    speaking: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

impl SpeechOutputHandle {
    /// Speak text at the default rate; returns the utterance id
    pub fn speak(&self, text: impl Into<String>) -> Uuid {
        self.speak_with_rate(text, DEFAULT_SPEECH_RATE)
    }

    /// Speak text at a specific rate; returns the utterance id
    pub fn speak_with_rate(&self, text: impl Into<String>, speed: f32) -> Uuid {
        let utterance_id = Uuid::new_v4();
        let _ = self.command_tx.send(SpeechCommand::Speak {
            text: text.into(),
            utterance_id,
            speed,
        });
        utterance_id
    }

    /// Announce a control's fixed label; unlabeled controls produce no speech
    pub fn announce(&self, control: Control) {
        if let Some(label) = control.spoken_label() {
            self.speak_with_rate(label, ANNOUNCE_SPEECH_RATE);
        }
    }

    /// Stop the current utterance, if any.
    ///
    /// A cancelled utterance never emits `Finished`. No effect while idle.
    pub fn cancel(&self) {
        if self.speaking.load(Ordering::Acquire) {
            self.cancel.store(true, Ordering::Release);
        }
    }

    /// Whether an utterance is currently active
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Acquire)
    }

    /// Try to receive an event from the pipeline
    pub fn try_recv_event(&self) -> Option<SpeechOutputEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Request worker shutdown
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(SpeechCommand::Shutdown);
    }
}
