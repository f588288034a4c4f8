//! Conversation controller
//!
//! The orchestrator for the conversational loop: owns the mode state, drives
//! the submission/reply cycle against the ask pipeline, and coordinates
//! speech output, speech input, and the notification cue around it. All
//! state lives on the UI thread; worker results re-enter through
//! `poll_events()`.

pub mod turn;

pub use turn::TurnContext;

use crate::audio::NotificationSound;
use crate::backend::{AskEvent, AskHandle};
use crate::speech::{
    RecognitionEvent, SpeechInputHandle, SpeechOutputEvent, SpeechOutputHandle,
};
use crate::transcript::{Message, Sender, TranscriptLog, PLACEHOLDER_TEXT};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// Bot message announcing that a listening session is being set up
pub const LISTENING_TEXT: &str = "Listening...";

/// Bot message shown when the backend request fails
pub const ERROR_REPLY: &str = "Error: Could not get a response.";

/// Bot message shown when recognition fails
pub const APOLOGY_REPLY: &str = "Sorry, I couldn't hear you. Please try again.";

/// Alert shown when the recognition capability is absent
pub const RECOGNITION_UNSUPPORTED_ALERT: &str =
    "Speech recognition is not available on this system.";

/// How long the send control stays disabled after a submission.
///
/// A plain debounce, deliberately independent of reply arrival; turn-tagged
/// placeholders keep overlapping submissions safe regardless.
pub const SEND_REENABLE_DELAY: Duration = Duration::from_millis(700);

/// Stage of the voice-activation sequence.
///
/// Announce -> chime -> listen, advanced by completion events. The chime is
/// fire-and-forget, so the announcement's completion advances straight into
/// the listening session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceStage {
    /// Speaking the "Listening..." announcement
    Announcing { utterance_id: Uuid },
    /// One-shot recognition session in flight
    Listening,
}

/// Orchestrates one conversational loop across transcript, speech, and backend
pub struct ConversationController {
    transcript: TranscriptLog,
    speech: SpeechOutputHandle,
    listener: SpeechInputHandle,
    ask: AskHandle,
    chime: NotificationSound,

    input_text: String,
    voice_armed: bool,
    voice_stage: Option<VoiceStage>,
    send_disabled_until: Option<Instant>,
    alert: Option<String>,
}

impl ConversationController {
    pub fn new(
        transcript: TranscriptLog,
        speech: SpeechOutputHandle,
        listener: SpeechInputHandle,
        ask: AskHandle,
        chime: NotificationSound,
    ) -> Self {
        Self {
            transcript,
            speech,
            listener,
            ask,
            chime,
            input_text: String::new(),
            voice_armed: false,
            voice_stage: None,
            send_disabled_until: None,
            alert: None,
        }
    }

    /// Append a startup greeting from the bot (never spoken)
    pub fn with_greeting(self, greeting: impl Into<String>) -> Self {
        self.transcript
            .append(Message::new(Sender::Bot, greeting.into()));
        self
    }

    /// The shared conversation log
    pub fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    /// The speech output handle (used by the focus navigator)
    pub fn speech(&self) -> &SpeechOutputHandle {
        &self.speech
    }

    /// Mutable access to the pending input text for the UI
    pub fn input_text_mut(&mut self) -> &mut String {
        &mut self.input_text
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    /// Whether the send control accepts a submission right now
    pub fn send_enabled(&self) -> bool {
        self.send_disabled_until
            .is_none_or(|until| Instant::now() >= until)
    }

    /// Whether speech output is currently active
    pub fn is_speaking(&self) -> bool {
        self.speech.is_speaking()
    }

    /// Whether a voice-activation sequence is in flight
    pub fn voice_active(&self) -> bool {
        self.voice_stage.is_some()
    }

    /// Whether the next recognized utterance will be dispatched as a voice
    /// turn
    pub fn voice_armed(&self) -> bool {
        self.voice_armed
    }

    /// Pending blocking alert, if any
    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// Submit the input field's contents as a typed question.
    ///
    /// Empty input is rejected before any side effect; non-empty input
    /// debounces the send control for a fixed delay.
    pub fn submit_from_send(&mut self) {
        if self.input_text.trim().is_empty() {
            return;
        }
        if !self.send_enabled() {
            return;
        }
        self.send_disabled_until = Some(Instant::now() + SEND_REENABLE_DELAY);

        let text = std::mem::take(&mut self.input_text);
        self.submit(text, false);
    }

    /// Run one submission/reply cycle.
    ///
    /// The voice intent is captured into the turn here and honored when the
    /// reply arrives; the shared flag is never re-read.
    pub fn submit(&mut self, text: String, speak_reply: bool) {
        if text.trim().is_empty() {
            return;
        }

        let turn = TurnContext::new(speak_reply);
        debug!(turn = %turn.id, speak_reply, "submitting");

        self.transcript
            .append(Message::for_turn(turn.id, Sender::User, text.clone()));
        self.input_text.clear();

        // Defensive sweep for a stale trailing placeholder before appending
        // ours
        self.transcript.remove_trailing_placeholder();
        self.transcript.append(Message::placeholder(turn.id));

        if turn.speak_reply {
            self.speech.speak(PLACEHOLDER_TEXT);
        }

        self.ask.ask(text, turn);
    }

    /// Begin the voice-activation sequence: announce, chime, listen.
    ///
    /// When synthesis is absent the announcement never completes and the
    /// sequence does not advance; the "Listening..." message still appears.
    pub fn activate_voice(&mut self) {
        self.voice_armed = true;
        self.transcript
            .append(Message::new(Sender::Bot, LISTENING_TEXT));

        let utterance_id = self.speech.speak(LISTENING_TEXT);
        self.voice_stage = Some(VoiceStage::Announcing { utterance_id });
    }

    /// Stop any in-progress speech output.
    ///
    /// Has no effect on a listening session or a pending ask.
    pub fn stop_speaking(&mut self) {
        self.speech.cancel();
    }

    /// Drain worker events and apply their transitions.
    ///
    /// Called from the UI thread every frame; this is the only place
    /// controller state changes in response to async work.
    pub fn poll_events(&mut self) {
        while let Some(event) = self.speech.try_recv_event() {
            self.on_speech_event(event);
        }
        while let Some(event) = self.listener.try_recv_event() {
            self.on_recognition_event(event);
        }
        while let Some(event) = self.ask.try_recv_event() {
            self.on_ask_event(event);
        }
    }

    /// Request shutdown of all worker pipelines
    pub fn shutdown(&self) {
        self.speech.shutdown();
        self.listener.shutdown();
        self.ask.shutdown();
    }

    fn on_speech_event(&mut self, event: SpeechOutputEvent) {
        match event {
            SpeechOutputEvent::Finished { utterance_id } => {
                if let Some(VoiceStage::Announcing {
                    utterance_id: announced,
                }) = self.voice_stage
                {
                    if announced == utterance_id {
                        // Announcement done: chime, then start the one-shot
                        // session
                        self.chime.play();
                        self.listener.listen_once();
                        self.voice_stage = Some(VoiceStage::Listening);
                    }
                }
            }
            SpeechOutputEvent::Cancelled { utterance_id } => {
                // A cancelled announcement abandons the voice sequence
                if let Some(VoiceStage::Announcing {
                    utterance_id: announced,
                }) = self.voice_stage
                {
                    if announced == utterance_id {
                        self.voice_stage = None;
                        self.voice_armed = false;
                    }
                }
            }
            SpeechOutputEvent::Error { error, .. } => {
                warn!("speech output error: {}", error);
            }
            SpeechOutputEvent::Started { .. } | SpeechOutputEvent::Shutdown => {}
        }
    }

    fn on_recognition_event(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Transcript(text) => {
                self.voice_stage = None;
                // Dispatch with the captured intent, then reset the shared
                // flag
                self.submit(text, true);
                self.voice_armed = false;
            }
            RecognitionEvent::Failed(reason) => {
                debug!("recognition failed: {}", reason);
                self.transcript
                    .append(Message::new(Sender::Bot, APOLOGY_REPLY));
                self.voice_stage = None;
                self.voice_armed = false;
            }
            RecognitionEvent::Unsupported => {
                self.alert = Some(RECOGNITION_UNSUPPORTED_ALERT.to_string());
                self.voice_stage = None;
                self.voice_armed = false;
            }
            RecognitionEvent::Shutdown => {}
        }
    }

    fn on_ask_event(&mut self, event: AskEvent) {
        match event {
            AskEvent::Answered { turn, answer } => {
                self.transcript.remove_placeholder(turn.id);
                self.transcript
                    .append(Message::for_turn(turn.id, Sender::Bot, answer.clone()));

                if turn.speak_reply {
                    self.speech.speak(answer);
                }
            }
            AskEvent::Failed { turn, error } => {
                warn!(turn = %turn.id, "backend failed: {}", error);
                self.transcript.remove_placeholder(turn.id);
                // Errors are shown, never spoken
                self.transcript
                    .append(Message::for_turn(turn.id, Sender::Bot, ERROR_REPLY));
            }
            AskEvent::Shutdown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AskPipeline;
    use crate::config::BackendConfig;
    use crate::speech::{SpeechCommand, SpeechInput, SpeechOutput};
    use crossbeam_channel::Receiver;

    /// Controller wired to unstarted pipelines, plus the raw channel ends
    /// for asserting dispatched commands
    struct Rig {
        controller: ConversationController,
        speech_commands: Receiver<SpeechCommand>,
        ask_pipeline: AskPipeline,
    }

    fn rig() -> Rig {
        let speech = SpeechOutput::new();
        let speech_commands = speech.command_receiver();
        let listener = SpeechInput::new();
        let ask_pipeline = AskPipeline::new(BackendConfig::default());

        let controller = ConversationController::new(
            TranscriptLog::new(),
            speech.handle(),
            listener.handle(),
            ask_pipeline.handle(),
            NotificationSound::new("/nonexistent/chime.wav"),
        );

        Rig {
            controller,
            speech_commands,
            ask_pipeline,
        }
    }

    fn texts(controller: &ConversationController) -> Vec<String> {
        controller
            .transcript()
            .snapshot()
            .into_iter()
            .map(|m| m.text)
            .collect()
    }

    #[test]
    fn test_empty_submission_has_no_side_effects() {
        let mut rig = rig();
        rig.controller.input_text_mut().push_str("   \t  ");
        rig.controller.submit_from_send();

        assert!(rig.controller.transcript().is_empty());
        // No debounce either
        assert!(rig.controller.send_enabled());
        let _ = rig.ask_pipeline;
    }

    #[test]
    fn test_submission_appends_user_then_placeholder() {
        let mut rig = rig();
        rig.controller.input_text_mut().push_str("hello");
        rig.controller.submit_from_send();

        let messages = rig.controller.transcript().snapshot();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "hello");
        assert!(messages[1].is_placeholder());
        assert_eq!(messages[1].turn_id, messages[0].turn_id);

        // Input cleared, send debounced
        assert!(rig.controller.input_text().is_empty());
        assert!(!rig.controller.send_enabled());
    }

    #[test]
    fn test_typed_submission_is_not_spoken() {
        let mut rig = rig();
        rig.controller.input_text_mut().push_str("hello");
        rig.controller.submit_from_send();

        // No "Thinking..." utterance for a typed turn
        assert!(rig.speech_commands.try_recv().is_err());
    }

    #[test]
    fn test_voice_submission_speaks_thinking() {
        let mut rig = rig();
        rig.controller.submit("hello".to_string(), true);

        match rig.speech_commands.try_recv() {
            Ok(SpeechCommand::Speak { text, .. }) => assert_eq!(text, PLACEHOLDER_TEXT),
            other => panic!("expected Speak, got {:?}", other),
        }
    }

    #[test]
    fn test_send_debounce_window(){
        let mut rig = rig();
        rig.controller.input_text_mut().push_str("one");
        rig.controller.submit_from_send();
        assert!(!rig.controller.send_enabled());

        // A second submission inside the window is ignored
        rig.controller.input_text_mut().push_str("two");
        rig.controller.submit_from_send();
        assert_eq!(rig.controller.transcript().len(), 2);

        std::thread::sleep(SEND_REENABLE_DELAY + Duration::from_millis(50));
        assert!(rig.controller.send_enabled());
    }

    #[test]
    fn test_activate_voice_appends_listening_and_announces() {
        let mut rig = rig();
        rig.controller.activate_voice();

        assert_eq!(texts(&rig.controller), vec![LISTENING_TEXT.to_string()]);
        assert!(rig.controller.voice_active());

        match rig.speech_commands.try_recv() {
            Ok(SpeechCommand::Speak { text, .. }) => assert_eq!(text, LISTENING_TEXT),
            other => panic!("expected Speak, got {:?}", other),
        }
    }

    #[test]
    fn test_answered_replaces_placeholder() {
        let mut rig = rig();
        rig.controller.submit("hello".to_string(), false);
        let turn_id = rig.controller.transcript().snapshot()[0].turn_id.unwrap();

        rig.controller.on_ask_event(AskEvent::Answered {
            turn: TurnContext {
                id: turn_id,
                speak_reply: false,
            },
            answer: "Hi there".to_string(),
        });

        assert_eq!(
            texts(&rig.controller),
            vec!["hello".to_string(), "Hi there".to_string()]
        );
    }

    #[test]
    fn test_failed_ask_shows_error_and_stays_silent() {
        let mut rig = rig();
        rig.controller.submit("hello".to_string(), true);
        let turn_id = rig.controller.transcript().snapshot()[0].turn_id.unwrap();

        // Drain the "Thinking..." utterance issued at submission
        let _ = rig.speech_commands.try_recv();

        rig.controller.on_ask_event(AskEvent::Failed {
            turn: TurnContext {
                id: turn_id,
                speak_reply: true,
            },
            error: "connection refused".to_string(),
        });

        assert_eq!(
            texts(&rig.controller),
            vec!["hello".to_string(), ERROR_REPLY.to_string()]
        );
        // The error text is never spoken, even for a voice turn
        assert!(rig.speech_commands.try_recv().is_err());
    }

    #[test]
    fn test_spoken_reply_honors_captured_intent() {
        let mut rig = rig();
        rig.controller.submit("hello".to_string(), true);
        let turn_id = rig.controller.transcript().snapshot()[0].turn_id.unwrap();
        let _ = rig.speech_commands.try_recv(); // "Thinking..."

        // The shared flag has long been reset; the turn still speaks
        rig.controller.on_ask_event(AskEvent::Answered {
            turn: TurnContext {
                id: turn_id,
                speak_reply: true,
            },
            answer: "Hi there".to_string(),
        });

        match rig.speech_commands.try_recv() {
            Ok(SpeechCommand::Speak { text, .. }) => assert_eq!(text, "Hi there"),
            other => panic!("expected Speak, got {:?}", other),
        }
    }

    #[test]
    fn test_recognition_transcript_submits_as_voice_turn() {
        let mut rig = rig();
        rig.controller.activate_voice();
        let _ = rig.speech_commands.try_recv(); // "Listening..."

        rig.controller
            .on_recognition_event(RecognitionEvent::Transcript(
                "What time is it?".to_string(),
            ));

        let messages = rig.controller.transcript().snapshot();
        assert_eq!(messages[0].text, LISTENING_TEXT);
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(messages[1].text, "What time is it?");
        assert!(messages[2].is_placeholder());
        assert!(!rig.controller.voice_active());

        // The voice turn speaks "Thinking..."
        match rig.speech_commands.try_recv() {
            Ok(SpeechCommand::Speak { text, .. }) => assert_eq!(text, PLACEHOLDER_TEXT),
            other => panic!("expected Speak, got {:?}", other),
        }
    }

    #[test]
    fn test_recognition_failure_apologizes() {
        let mut rig = rig();
        rig.controller.activate_voice();

        rig.controller
            .on_recognition_event(RecognitionEvent::Failed("nothing heard".to_string()));

        assert_eq!(
            texts(&rig.controller),
            vec![LISTENING_TEXT.to_string(), APOLOGY_REPLY.to_string()]
        );
        assert!(!rig.controller.voice_active());
    }

    #[test]
    fn test_recognition_unsupported_raises_alert() {
        let mut rig = rig();
        rig.controller.activate_voice();

        rig.controller
            .on_recognition_event(RecognitionEvent::Unsupported);

        assert_eq!(
            rig.controller.alert(),
            Some(RECOGNITION_UNSUPPORTED_ALERT)
        );
        rig.controller.dismiss_alert();
        assert!(rig.controller.alert().is_none());
    }

    #[test]
    fn test_announcement_completion_starts_listening() {
        let mut rig = rig();
        rig.controller.activate_voice();

        let utterance_id = match rig.speech_commands.try_recv() {
            Ok(SpeechCommand::Speak { utterance_id, .. }) => utterance_id,
            other => panic!("expected Speak, got {:?}", other),
        };

        // An unrelated completion does not advance the stage
        rig.controller.on_speech_event(SpeechOutputEvent::Finished {
            utterance_id: Uuid::new_v4(),
        });
        assert!(matches!(
            rig.controller.voice_stage,
            Some(VoiceStage::Announcing { .. })
        ));

        rig.controller
            .on_speech_event(SpeechOutputEvent::Finished { utterance_id });
        assert_eq!(rig.controller.voice_stage, Some(VoiceStage::Listening));
    }

    #[test]
    fn test_cancelled_announcement_abandons_voice_sequence() {
        let mut rig = rig();
        rig.controller.activate_voice();

        let utterance_id = match rig.speech_commands.try_recv() {
            Ok(SpeechCommand::Speak { utterance_id, .. }) => utterance_id,
            other => panic!("expected Speak, got {:?}", other),
        };

        rig.controller
            .on_speech_event(SpeechOutputEvent::Cancelled { utterance_id });
        assert!(!rig.controller.voice_active());
    }

    #[test]
    fn test_overlapping_turns_resolve_independently() {
        let mut rig = rig();
        rig.controller.submit("first".to_string(), false);
        rig.controller.submit("second".to_string(), false);

        let messages = rig.controller.transcript().snapshot();
        // Both turns' placeholders are present, each tagged with its own turn
        assert_eq!(messages.len(), 4);
        assert!(messages[1].is_placeholder());
        assert!(messages[3].is_placeholder());
        let first_turn = messages[0].turn_id.unwrap();
        let second_turn = messages[2].turn_id.unwrap();

        // Replies arrive out of order; each resolves its own turn
        rig.controller.on_ask_event(AskEvent::Answered {
            turn: TurnContext {
                id: second_turn,
                speak_reply: false,
            },
            answer: "second answer".to_string(),
        });
        rig.controller.on_ask_event(AskEvent::Answered {
            turn: TurnContext {
                id: first_turn,
                speak_reply: false,
            },
            answer: "first answer".to_string(),
        });

        let final_texts = texts(&rig.controller);
        assert_eq!(
            final_texts,
            vec![
                "first".to_string(),
                "second".to_string(),
                "second answer".to_string(),
                "first answer".to_string(),
            ]
        );
        assert!(!final_texts.contains(&PLACEHOLDER_TEXT.to_string()));
    }

    #[test]
    fn test_greeting_is_appended_once() {
        let rig = rig();
        let controller = rig.controller.with_greeting("Welcome!");
        assert_eq!(texts(&controller), vec!["Welcome!".to_string()]);
    }
}
