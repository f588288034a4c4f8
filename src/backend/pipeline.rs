//! Backend ask pipeline
//!
//! Channel-based request/response cycle against the answer endpoint. Every
//! command carries its turn context; the matching event returns it, so
//! overlapping turns resolve independently of completion order.

use crate::backend::client::AskClient;
use crate::config::BackendConfig;
use crate::controller::TurnContext;
use crate::Result;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

/// Source of answers for submitted questions
pub trait AnswerSource: Send {
    fn fetch_answer(&mut self, question: &str) -> Result<String>;
}

/// Command sent to the ask pipeline
#[derive(Debug, Clone)]
pub enum AskCommand {
    /// Submit a question to the backend
    Ask {
        /// The question text
        question: String,
        /// Turn this submission belongs to
        turn: TurnContext,
    },

    /// Shutdown the pipeline
    Shutdown,
}

/// Event emitted by the ask pipeline
#[derive(Debug, Clone)]
pub enum AskEvent {
    /// The backend produced an answer
    Answered {
        /// Turn the answer belongs to
        turn: TurnContext,
        /// The answer text
        answer: String,
    },

    /// The request failed (transport, timeout, non-2xx, malformed body)
    Failed {
        /// Turn the failure belongs to
        turn: TurnContext,
        /// Error description for logging
        error: String,
    },

    /// Pipeline has shut down
    Shutdown,
}

/// Ask pipeline with channel-based communication
pub struct AskPipeline {
    config: BackendConfig,
    command_tx: Sender<AskCommand>,
    command_rx: Receiver<AskCommand>,
    event_tx: Sender<AskEvent>,
    event_rx: Receiver<AskEvent>,
}

impl AskPipeline {
    /// Create a new pipeline
    pub fn new(config: BackendConfig) -> Self {
        let (command_tx, command_rx) = bounded(32);
        let (event_tx, event_rx) = bounded(32);

        Self {
            config,
            command_tx,
            command_rx,
            event_tx,
            event_rx,
        }
    }

    /// Get a handle for issuing commands and draining events
    pub fn handle(&self) -> AskHandle {
        AskHandle {
            command_tx: self.command_tx.clone(),
            event_rx: self.event_rx.clone(),
        }
    }

    /// Start the worker thread against the configured HTTP backend
    pub fn start_worker(self) -> JoinHandle<()> {
        let config = self.config.clone();
        let command_rx = self.command_rx.clone();
        let event_tx = self.event_tx.clone();

        thread::spawn(move || {
            info!("ask worker starting");

            let runtime = match Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("failed to create tokio runtime: {}", e);
                    let _ = event_tx.send(AskEvent::Shutdown);
                    return;
                }
            };

            let client = match AskClient::new(&config) {
                Ok(client) => client,
                Err(e) => {
                    error!("failed to create ask client: {}", e);
                    let _ = event_tx.send(AskEvent::Shutdown);
                    return;
                }
            };

            info!(endpoint = %config.endpoint, "ask worker ready");

            run_loop(&command_rx, &event_tx, |question| {
                runtime.block_on(client.ask(question))
            });

            info!("ask worker stopped");
        })
    }

    /// Start the worker thread against an injected answer source
    pub fn start_worker_with_source(self, mut source: Box<dyn AnswerSource>) -> JoinHandle<()> {
        let command_rx = self.command_rx.clone();
        let event_tx = self.event_tx.clone();

        thread::spawn(move || {
            info!("ask worker starting (injected source)");
            run_loop(&command_rx, &event_tx, |question| {
                source.fetch_answer(question)
            });
            info!("ask worker stopped");
        })
    }
}

/// Process commands until shutdown or channel close
fn run_loop(
    command_rx: &Receiver<AskCommand>,
    event_tx: &Sender<AskEvent>,
    mut fetch: impl FnMut(&str) -> Result<String>,
) {
    loop {
        match command_rx.recv() {
            Ok(AskCommand::Ask { question, turn }) => {
                debug!(turn = %turn.id, "processing ask");

                match fetch(&question) {
                    Ok(answer) => {
                        let _ = event_tx.send(AskEvent::Answered { turn, answer });
                    }
                    Err(e) => {
                        warn!(turn = %turn.id, "ask failed: {}", e);
                        let _ = event_tx.send(AskEvent::Failed {
                            turn,
                            error: e.to_string(),
                        });
                    }
                }
            }

            Ok(AskCommand::Shutdown) => {
                info!("ask worker shutting down");
                let _ = event_tx.send(AskEvent::Shutdown);
                break;
            }

            Err(e) => {
                debug!("ask command channel closed: {}", e);
                break;
            }
        }
    }
}

/// Handle for controlling the ask pipeline
#[derive(Clone)]
pub struct AskHandle {
    command_tx: Sender<AskCommand>,
    event_rx: Receiver<AskEvent>,
}

impl AskHandle {
    /// Submit a question under the given turn
    pub fn ask(&self, question: impl Into<String>, turn: TurnContext) {
        let _ = self.command_tx.send(AskCommand::Ask {
            question: question.into(),
            turn,
        });
    }

    /// Try to receive an event from the pipeline
    pub fn try_recv_event(&self) -> Option<AskEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Request worker shutdown
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(AskCommand::Shutdown);
    }
}
