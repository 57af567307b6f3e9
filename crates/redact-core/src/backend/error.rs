use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result alias for session and backend operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Categories of service errors for consistent handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    /// Network failure or non-2xx response from the backend
    Transport,
    /// Explicit failure event or unexpected termination of an event stream
    Stream,
    /// Operation invoked without its required prior state
    InvalidState,
    /// Ingestion attempted outside the input arbiter's current mode
    WrongMode,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceErrorKind::Transport => write!(f, "transport"),
            ServiceErrorKind::Stream => write!(f, "stream"),
            ServiceErrorKind::InvalidState => write!(f, "invalid_state"),
            ServiceErrorKind::WrongMode => write!(f, "wrong_mode"),
        }
    }
}

/// Structured error with kind and details.
///
/// Transport and Stream errors surface as a single user-visible message per
/// operation and never corrupt committed session state. InvalidState and
/// WrongMode are contract violations the UI's affordance gating should make
/// unreachable; the core still validates and fails instead of mutating
/// inconsistent state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceError {
    /// Error category
    pub kind: ServiceErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw response body)
    pub details: Option<String>,
}

impl ServiceError {
    /// Creates a new service error.
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Transport, message)
    }

    /// Creates a stream error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Stream, message)
    }

    /// Creates an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::InvalidState, message)
    }

    /// Creates a wrong-mode error.
    pub fn wrong_mode(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::WrongMode, message)
    }

    /// Creates a transport error from a non-2xx response.
    ///
    /// The backend reports failures as `{"error": "..."}`; when that shape is
    /// present in the body its message is surfaced, otherwise the status code
    /// alone is.
    pub fn http_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {}", status);
        let details = if body.is_empty() {
            None
        } else {
            if let Ok(json) = serde_json::from_str::<Value>(body)
                && let Some(error) = json.get("error")
            {
                let text = match error {
                    Value::String(s) => Some(s.clone()),
                    other => other
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                };
                if let Some(text) = text {
                    return Self {
                        kind: ServiceErrorKind::Transport,
                        message: format!("HTTP {}: {}", status, text),
                        details: Some(body.to_string()),
                    };
                }
            }
            Some(body.to_string())
        };
        Self {
            kind: ServiceErrorKind::Transport,
            message,
            details,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ServiceError {}
