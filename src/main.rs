use anyhow::Result;
use parley::audio::{AudioSink, CpalSink, NotificationSound};
use parley::backend::AskPipeline;
use parley::config::{AppConfig, RecognitionConfig, SynthesisConfig};
use parley::controller::ConversationController;
use parley::speech::{
    HttpSynthesizer, HttpTranscriber, MicSource, SpeechInput, SpeechOutput, Synthesizer,
    Transcriber, UtteranceSource,
};
use parley::transcript::TranscriptLog;
use parley::ui::ParleyApp;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Parley voice chat client");

    let config = AppConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(backend = %config.backend.endpoint, "configured");

    let transcript = TranscriptLog::new();

    // Speech output pipeline
    let speech = SpeechOutput::new();
    let speech_handle = speech.handle();
    let synthesis = config.synthesis.clone();
    speech.start_worker(Box::new(move || build_speech_backend(synthesis)));

    // Speech input pipeline
    let listener = SpeechInput::new();
    let listener_handle = listener.handle();
    let recognition = config.recognition.clone();
    listener.start_worker(Box::new(move || build_recognition_backend(recognition)));

    // Backend ask pipeline
    let ask = AskPipeline::new(config.backend.clone());
    let ask_handle = ask.handle();
    ask.start_worker();

    let chime = NotificationSound::new(&config.chime_path);

    let mut controller = ConversationController::new(
        transcript,
        speech_handle,
        listener_handle,
        ask_handle,
        chime,
    );
    if let Some(greeting) = config.greeting.clone() {
        controller = controller.with_greeting(greeting);
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 640.0])
            .with_min_inner_size([360.0, 480.0])
            .with_title("Parley"),
        ..Default::default()
    };

    eframe::run_native(
        "Parley",
        native_options,
        Box::new(|cc| Ok(Box::new(ParleyApp::new(cc, controller)))),
    )
    .map_err(|e| anyhow::anyhow!("failed to start UI: {e}"))?;

    Ok(())
}

/// Construct the synthesis backend, degrading to silence when unavailable
fn build_speech_backend(
    config: Option<SynthesisConfig>,
) -> (Option<Box<dyn Synthesizer>>, Option<Box<dyn AudioSink>>) {
    let synthesizer: Option<Box<dyn Synthesizer>> = match config {
        Some(config) => match HttpSynthesizer::new(&config) {
            Ok(synthesizer) => Some(Box::new(synthesizer)),
            Err(e) => {
                warn!("speech synthesis disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let sink: Option<Box<dyn AudioSink>> = match CpalSink::new() {
        Ok(sink) => Some(Box::new(sink)),
        Err(e) => {
            warn!("audio output disabled: {}", e);
            None
        }
    };

    (synthesizer, sink)
}

/// Construct the recognition backend; absence surfaces as Unsupported
fn build_recognition_backend(
    config: Option<RecognitionConfig>,
) -> (Option<Box<dyn UtteranceSource>>, Option<Box<dyn Transcriber>>) {
    let transcriber: Option<Box<dyn Transcriber>> = match config {
        Some(config) => match HttpTranscriber::new(&config) {
            Ok(transcriber) => Some(Box::new(transcriber)),
            Err(e) => {
                warn!("speech recognition disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let source: Option<Box<dyn UtteranceSource>> = match MicSource::new() {
        Ok(source) => Some(Box::new(source)),
        Err(e) => {
            warn!("microphone capture disabled: {}", e);
            None
        }
    };

    (source, transcriber)
}
