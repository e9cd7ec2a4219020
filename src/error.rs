//! Error types for the financial research agent

use thiserror::Error;

/// Result type alias for research operations
pub type Result<T> = std::result::Result<T, ResearchError>;

#[derive(Error, Debug)]
pub enum ResearchError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Planning error: {0}")]
    Planning(String),

    #[error("{source_name} error: {message}")]
    Connector {
        source_name: &'static str,
        message: String,
    },

    #[error("{source_name} returned status code {status}")]
    UpstreamStatus {
        source_name: &'static str,
        status: u16,
    },

    #[error("{0}")]
    MissingData(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid parameters for {action}: {message}")]
    InvalidParameters {
        action: String,
        message: String,
    },

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ResearchError {
    pub fn connector<S: Into<String>>(source_name: &'static str, message: S) -> Self {
        ResearchError::Connector {
            source_name,
            message: message.into(),
        }
    }

    pub fn invalid_parameters<A: Into<String>, M: Into<String>>(action: A, message: M) -> Self {
        ResearchError::InvalidParameters {
            action: action.into(),
            message: message.into(),
        }
    }
}
