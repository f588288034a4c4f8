pub mod audio;
pub mod backend;
pub mod config;
pub mod controller;
pub mod speech;
pub mod transcript;
pub mod ui;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParleyError {
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("Synthesis error: {0}")]
    SynthesisError(String),

    #[error("Recognition error: {0}")]
    RecognitionError(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for ParleyError {
    fn from(e: std::io::Error) -> Self {
        ParleyError::IOError(e.to_string())
    }
}

impl ParleyError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Hardware/device errors may require user intervention
            ParleyError::AudioDeviceError(_) => false,
            // These are typically transient errors
            ParleyError::SynthesisError(_) => true,
            ParleyError::RecognitionError(_) => true,
            ParleyError::BackendError(_) => true,
            ParleyError::ConfigError(_) => false,
            ParleyError::ChannelError(_) => false,
            ParleyError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            ParleyError::AudioDeviceError(_) => {
                "Audio device error. Please check your microphone/speakers.".to_string()
            }
            ParleyError::SynthesisError(_) => {
                "Text-to-speech failed. The reply will be shown as text.".to_string()
            }
            ParleyError::RecognitionError(_) => {
                "Speech recognition failed. Please try again.".to_string()
            }
            ParleyError::BackendError(_) => {
                "Could not reach the answer service. Please try again.".to_string()
            }
            ParleyError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            ParleyError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            ParleyError::IOError(_) => {
                "File system error occurred.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ParleyError>;
