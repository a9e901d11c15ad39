use thiserror::Error;

/// Errors surfaced by the setup, query and generation clients.
///
/// Every variant is recovered at the component boundary and shown to the
/// user as a single message; see [`ClientError::user_message`].
#[derive(Error, Debug)]
pub enum ClientError {
    /// Local precondition failed. No request was sent.
    #[error("Validation error on {field}: {reason}")]
    Validation { field: String, reason: String },

    /// The request never reached the backend or its reply was unreadable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("Service error ({status}): {}", message.as_deref().unwrap_or("no error message"))]
    Service { status: u16, message: Option<String> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The message a component stores for display.
    ///
    /// A structured `error` field from the backend wins, then the transport
    /// text, then `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Validation { reason, .. } => reason.clone(),
            Self::Service {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            Self::Service { .. } => fallback.to_string(),
            Self::Transport(text) if !text.is_empty() => text.clone(),
            Self::Transport(_) => fallback.to_string(),
            Self::Config(text) => text.clone(),
            Self::Json(e) => e.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("Request timed out: {err}"))
        } else if err.is_decode() {
            Self::Transport(format!("Malformed response: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_message_is_preferred() {
        let err = ClientError::Service {
            status: 500,
            message: Some("model unavailable".to_string()),
        };
        assert_eq!(err.user_message("Something went wrong."), "model unavailable");
    }

    #[test]
    fn service_without_message_uses_fallback() {
        let err = ClientError::Service {
            status: 502,
            message: None,
        };
        assert_eq!(err.user_message("Setup failed."), "Setup failed.");
        assert_eq!(err.to_string(), "Service error (502): no error message");
    }

    #[test]
    fn transport_text_beats_fallback() {
        let err = ClientError::Transport("connection refused".to_string());
        assert_eq!(err.user_message("Error asking query."), "connection refused");

        let empty = ClientError::Transport(String::new());
        assert_eq!(empty.user_message("Error asking query."), "Error asking query.");
    }

    #[test]
    fn validation_shows_reason() {
        let err = ClientError::validation("query", "Please enter a query.");
        assert!(err.is_validation());
        assert_eq!(err.user_message("unused"), "Please enter a query.");
    }
}
