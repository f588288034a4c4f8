pub mod log;
pub mod types;

pub use log::TranscriptLog;
pub use types::{Message, Sender, PLACEHOLDER_TEXT};
