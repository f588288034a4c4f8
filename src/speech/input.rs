//! Speech input pipeline
//!
//! One-shot recognition sessions: each `ListenOnce` captures a single
//! utterance, transcribes it, and emits exactly one terminal event. Sessions
//! never restart on their own.

use crate::audio::capture::{samples_to_wav, AudioCapture, UtteranceDetector, CAPTURE_SAMPLE_RATE};
use crate::speech::{Transcriber, UtteranceSource};
use crate::Result;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long a session waits for a complete utterance
const LISTEN_WINDOW: Duration = Duration::from_secs(8);

/// Polling interval while recording
const CAPTURE_POLL: Duration = Duration::from_millis(100);

/// Command sent to the speech input pipeline
#[derive(Debug, Clone)]
pub enum ListenCommand {
    /// Start a single-utterance recognition session
    ListenOnce,

    /// Shutdown the pipeline
    Shutdown,
}

/// Event emitted by the speech input pipeline
#[derive(Debug, Clone)]
pub enum RecognitionEvent {
    /// A transcript was recognized
    Transcript(String),

    /// The session failed (nothing heard, capture error, provider error)
    Failed(String),

    /// The recognition capability is absent
    Unsupported,

    /// Pipeline has shut down
    Shutdown,
}

/// Builds the recognition backend inside the worker thread.
///
/// Returning `None` for either half makes every session resolve with
/// `Unsupported` instead of attempting to start.
pub type RecognitionBackendFactory =
    Box<dyn FnOnce() -> (Option<Box<dyn UtteranceSource>>, Option<Box<dyn Transcriber>>) + Send>;

/// Speech input pipeline with channel-based communication
pub struct SpeechInput {
    command_tx: Sender<ListenCommand>,
    command_rx: Receiver<ListenCommand>,
    event_tx: Sender<RecognitionEvent>,
    event_rx: Receiver<RecognitionEvent>,
}

impl SpeechInput {
    /// Create a new pipeline
    pub fn new() -> Self {
        let (command_tx, command_rx) = bounded(16);
        let (event_tx, event_rx) = bounded(16);

        Self {
            command_tx,
            command_rx,
            event_tx,
            event_rx,
        }
    }

    /// Get a handle for issuing commands and draining events
    pub fn handle(&self) -> SpeechInputHandle {
        SpeechInputHandle {
            command_tx: self.command_tx.clone(),
            event_rx: self.event_rx.clone(),
        }
    }

    /// Start the pipeline worker thread
    pub fn start_worker(self, backend: RecognitionBackendFactory) -> JoinHandle<()> {
        let command_rx = self.command_rx.clone();
        let event_tx = self.event_tx.clone();

        thread::spawn(move || {
            info!("speech input worker starting");

            let mut backend = match backend() {
                (Some(source), Some(transcriber)) => Some((source, transcriber)),
                _ => {
                    info!("speech recognition unavailable");
                    None
                }
            };

            loop {
                match command_rx.recv() {
                    Ok(ListenCommand::ListenOnce) => {
                        let Some((source, transcriber)) = backend.as_mut() else {
                            let _ = event_tx.send(RecognitionEvent::Unsupported);
                            continue;
                        };

                        let event = run_session(source.as_mut(), transcriber.as_mut());
                        let _ = event_tx.send(event);
                    }

                    Ok(ListenCommand::Shutdown) => {
                        info!("speech input worker shutting down");
                        let _ = event_tx.send(RecognitionEvent::Shutdown);
                        break;
                    }

                    Err(e) => {
                        debug!("listen command channel closed: {}", e);
                        break;
                    }
                }
            }

            info!("speech input worker stopped");
        })
    }
}

impl Default for SpeechInput {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one recognition session to its terminal event
fn run_session(source: &mut dyn UtteranceSource, transcriber: &mut dyn Transcriber) -> RecognitionEvent {
    let samples = match source.record_utterance() {
        Ok(Some(samples)) if !samples.is_empty() => samples,
        Ok(_) => {
            debug!("nothing heard within the listening window");
            return RecognitionEvent::Failed("no speech detected".to_string());
        }
        Err(e) => {
            warn!("utterance capture failed: {}", e);
            return RecognitionEvent::Failed(e.to_string());
        }
    };

    let transcript = samples_to_wav(&samples, source.sample_rate())
        .and_then(|wav| transcriber.transcribe(&wav));

    match transcript {
        Ok(text) if !text.trim().is_empty() => {
            info!("recognized: {}", text);
            RecognitionEvent::Transcript(text)
        }
        Ok(_) => {
            debug!("transcription returned empty text");
            RecognitionEvent::Failed("no speech recognized".to_string())
        }
        Err(e) => {
            warn!("transcription failed: {}", e);
            RecognitionEvent::Failed(e.to_string())
        }
    }
}

/// Handle for controlling the speech input pipeline
#[derive(Clone)]
pub struct SpeechInputHandle {
    command_tx: Sender<ListenCommand>,
    event_rx: Receiver<RecognitionEvent>,
}

impl SpeechInputHandle {
    /// Begin a one-shot recognition session
    pub fn listen_once(&self) {
        let _ = self.command_tx.send(ListenCommand::ListenOnce);
    }

    /// Try to receive an event from the pipeline
    pub fn try_recv_event(&self) -> Option<RecognitionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Request worker shutdown
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ListenCommand::Shutdown);
    }
}

/// Microphone-backed utterance source
///
/// A fresh capture stream is opened per session; energy endpointing decides
/// when the utterance has ended.
pub struct MicSource {
    window: Duration,
    poll: Duration,
}

impl MicSource {
    /// Create a source, verifying an input device is present
    pub fn new() -> Result<Self> {
        // Constructing a capture probes for the device without starting it
        AudioCapture::new()?;
        Ok(Self {
            window: LISTEN_WINDOW,
            poll: CAPTURE_POLL,
        })
    }
}

impl UtteranceSource for MicSource {
    fn record_utterance(&mut self) -> Result<Option<Vec<f32>>> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;

        let mut detector = UtteranceDetector::new();
        let deadline = Instant::now() + self.window;

        loop {
            thread::sleep(self.poll);

            let chunk = capture.take_buffer();
            if !chunk.is_empty() && detector.process(&chunk) {
                capture.stop();
                return Ok(Some(detector.take_samples()));
            }

            if Instant::now() >= deadline {
                capture.stop();
                // Accept a trailing utterance that never hit the silence
                // window; otherwise nothing was heard
                return Ok(if detector.has_speech() {
                    Some(detector.take_samples())
                } else {
                    None
                });
            }
        }
    }

    fn sample_rate(&self) -> u32 {
        CAPTURE_SAMPLE_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParleyError;
    use std::collections::VecDeque;

    fn scripted_backend(
        utterances: VecDeque<Option<Vec<f32>>>,
        transcriber: Box<dyn Transcriber>,
    ) -> (Option<Box<dyn UtteranceSource>>, Option<Box<dyn Transcriber>>) {
        (
            Some(Box::new(ScriptedSource { utterances })),
            Some(transcriber),
        )
    }

    struct ScriptedSource {
        utterances: VecDeque<Option<Vec<f32>>>,
    }

    impl UtteranceSource for ScriptedSource {
        fn record_utterance(&mut self) -> Result<Option<Vec<f32>>> {
            Ok(self.utterances.pop_front().flatten())
        }

        fn sample_rate(&self) -> u32 {
            CAPTURE_SAMPLE_RATE
        }
    }

    struct FixedTranscriber {
        text: String,
    }

    impl Transcriber for FixedTranscriber {
        fn transcribe(&mut self, _wav: &[u8]) -> Result<String> {
            Ok(self.text.clone())
        }
    }

    struct FailingTranscriber;

    impl Transcriber for FailingTranscriber {
        fn transcribe(&mut self, _wav: &[u8]) -> Result<String> {
            Err(ParleyError::RecognitionError("provider down".into()))
        }
    }

    fn recv_event(handle: &SpeechInputHandle) -> RecognitionEvent {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(event) = handle.try_recv_event() {
                return event;
            }
            assert!(Instant::now() < deadline, "timed out waiting for event");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_transcript_event() {
        let pipeline = SpeechInput::new();
        let handle = pipeline.handle();
        pipeline.start_worker(Box::new(|| {
            scripted_backend(
                VecDeque::from([Some(vec![0.1; 8000])]),
                Box::new(FixedTranscriber {
                    text: "What time is it?".to_string(),
                }),
            )
        }));

        handle.listen_once();
        match recv_event(&handle) {
            RecognitionEvent::Transcript(text) => assert_eq!(text, "What time is it?"),
            other => panic!("expected Transcript, got {:?}", other),
        }
    }

    #[test]
    fn test_nothing_heard_fails() {
        let pipeline = SpeechInput::new();
        let handle = pipeline.handle();
        pipeline.start_worker(Box::new(|| {
            scripted_backend(
                VecDeque::from([None]),
                Box::new(FixedTranscriber {
                    text: "unused".to_string(),
                }),
            )
        }));

        handle.listen_once();
        assert!(matches!(recv_event(&handle), RecognitionEvent::Failed(_)));
    }

    #[test]
    fn test_empty_transcript_fails() {
        let pipeline = SpeechInput::new();
        let handle = pipeline.handle();
        pipeline.start_worker(Box::new(|| {
            scripted_backend(
                VecDeque::from([Some(vec![0.1; 8000])]),
                Box::new(FixedTranscriber {
                    text: "   ".to_string(),
                }),
            )
        }));

        handle.listen_once();
        assert!(matches!(recv_event(&handle), RecognitionEvent::Failed(_)));
    }

    #[test]
    fn test_provider_error_fails() {
        let pipeline = SpeechInput::new();
        let handle = pipeline.handle();
        pipeline.start_worker(Box::new(|| {
            scripted_backend(
                VecDeque::from([Some(vec![0.1; 8000])]),
                Box::new(FailingTranscriber),
            )
        }));

        handle.listen_once();
        assert!(matches!(recv_event(&handle), RecognitionEvent::Failed(_)));
    }

    #[test]
    fn test_missing_capability_reports_unsupported() {
        let pipeline = SpeechInput::new();
        let handle = pipeline.handle();
        pipeline.start_worker(Box::new(|| (None, None)));

        handle.listen_once();
        assert!(matches!(recv_event(&handle), RecognitionEvent::Unsupported));
    }

    #[test]
    fn test_sessions_are_one_shot() {
        let pipeline = SpeechInput::new();
        let handle = pipeline.handle();
        pipeline.start_worker(Box::new(|| {
            scripted_backend(
                VecDeque::from([Some(vec![0.1; 8000])]),
                Box::new(FixedTranscriber {
                    text: "once".to_string(),
                }),
            )
        }));

        handle.listen_once();
        assert!(matches!(
            recv_event(&handle),
            RecognitionEvent::Transcript(_)
        ));

        // No second session starts on its own
        thread::sleep(Duration::from_millis(50));
        assert!(handle.try_recv_event().is_none());
    }
}
