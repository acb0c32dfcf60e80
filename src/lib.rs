//! Alfredo - voice command pipeline for a nutrition tracker
//!
//! Speech fragments are segmented into utterances, classified into an
//! intent, and dispatched to a handler that talks to a generative language
//! model (with a deterministic local fallback) and to the pantry, nutrition
//! and shopping-list collaborators. Responses are narrated back.

pub mod integration;
pub mod llm;
pub mod messages;
pub mod speech;
pub mod store;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AlfredoError {
    #[error("Recognition error: {0}")]
    RecognitionError(String),

    #[error("Gateway error: {0}")]
    GatewayError(String),

    #[error("Extraction error: {0}")]
    ExtractionError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Dispatch error: {0}")]
    DispatchError(String),

    #[error("Synthesis error: {0}")]
    SynthesisError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for AlfredoError {
    fn from(e: std::io::Error) -> Self {
        AlfredoError::IOError(e.to_string())
    }
}

impl From<reqwest::Error> for AlfredoError {
    fn from(e: reqwest::Error) -> Self {
        AlfredoError::GatewayError(e.to_string())
    }
}

impl From<serde_json::Error> for AlfredoError {
    fn from(e: serde_json::Error) -> Self {
        AlfredoError::ExtractionError(e.to_string())
    }
}

impl From<toml::de::Error> for AlfredoError {
    fn from(e: toml::de::Error) -> Self {
        AlfredoError::ConfigError(e.to_string())
    }
}

impl AlfredoError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Recognition drops back to idle, the user can start again
            AlfredoError::RecognitionError(_) => true,
            // Covered by the local fallback
            AlfredoError::GatewayError(_) => true,
            AlfredoError::ExtractionError(_) => true,
            AlfredoError::PersistenceError(_) => true,
            AlfredoError::DispatchError(_) => true,
            // Text stays in the conversation history
            AlfredoError::SynthesisError(_) => true,
            AlfredoError::ConfigError(_) => false,
            AlfredoError::ChannelError(_) => false,
            AlfredoError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            AlfredoError::RecognitionError(_) => "Speech recognition error. Try again.".to_string(),
            AlfredoError::GatewayError(_) | AlfredoError::ExtractionError(_) => {
                "The assistant is offline, using a simpler answer.".to_string()
            }
            AlfredoError::PersistenceError(_) => {
                "Could not save your changes. Please try again.".to_string()
            }
            AlfredoError::DispatchError(_) => {
                "I'm sorry, I couldn't process that request. Please try again.".to_string()
            }
            AlfredoError::SynthesisError(_) => {
                "Speech output failed. The response is shown as text.".to_string()
            }
            AlfredoError::ConfigError(_) => "Configuration error. Please check settings.".to_string(),
            AlfredoError::ChannelError(_) => {
                "Internal communication error. Please restart the session.".to_string()
            }
            AlfredoError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AlfredoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(AlfredoError::GatewayError("timeout".into()).is_recoverable());
        assert!(AlfredoError::RecognitionError("no-speech".into()).is_recoverable());
        assert!(!AlfredoError::ConfigError("bad".into()).is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AlfredoError = io.into();
        assert!(matches!(err, AlfredoError::IOError(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_json_error_is_extraction() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: AlfredoError = parse.into();
        assert!(matches!(err, AlfredoError::ExtractionError(_)));
    }
}
