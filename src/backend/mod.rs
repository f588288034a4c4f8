pub mod client;
pub mod pipeline;

pub use client::AskClient;
pub use pipeline::{AnswerSource, AskCommand, AskEvent, AskHandle, AskPipeline};
