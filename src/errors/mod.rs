//! Unified error handling and backend error-envelope normalization.

use serde::Deserialize;

/// Error detail in the backend's JSON error envelope.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: Option<String>,
    pub message: String,
}

/// The shapes the backend uses to report an error message.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Envelope { error: ApiError },
    Plain { error: String },
    Message { message: String },
    List { errors: Vec<String> },
}

/// Pull a human-readable message out of a backend error body, if it has one.
pub fn extract_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let message = match parsed {
        ErrorBody::Envelope { error } => error.message,
        ErrorBody::Plain { error } => error,
        ErrorBody::Message { message } => message,
        ErrorBody::List { errors } => errors.join("; "),
    };
    let message = message.trim().to_string();
    (!message.is_empty()).then_some(message)
}

/// Application error type for every dashboard flow.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Bulk action incomplete: {affected} succeeded, {failed} failed")]
    PartialFailure {
        affected: usize,
        failed: usize,
        message: Option<String>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Check if this error was raised before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error represents an auth failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Http { status: 401, .. })
    }

    /// Message suitable for a toast or error banner.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Unauthorized => "You are not signed in".to_string(),
            AppError::Http { status: 401, .. } => "Your session has expired".to_string(),
            AppError::Http { message, .. } if !message.is_empty() => message.clone(),
            AppError::Http { status, .. } => format!("Request failed ({status})"),
            AppError::Timeout(_) => "The server took too long to respond".to_string(),
            AppError::Transport(e) => {
                tracing::error!(error = %e, "Transport error");
                "Could not reach the server".to_string()
            }
            AppError::Decode(_) => "The server sent an unexpected response".to_string(),
            AppError::PartialFailure {
                affected,
                failed,
                message,
            } => match message {
                Some(msg) => format!("{affected} succeeded, {failed} failed: {msg}"),
                None => format!("{affected} succeeded, {failed} failed"),
            },
            AppError::Storage(e) => {
                tracing::error!(error = %e, "Storage error");
                "Could not access local storage".to_string()
            }
            AppError::Config(msg) => format!("Configuration problem: {msg}"),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                "Something went wrong".to_string()
            }
        }
    }
}
