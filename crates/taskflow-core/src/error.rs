//! Error taxonomy for the client.
//!
//! Every error is `Clone`: a single refresh outcome is handed to all requests
//! waiting on it.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// Client-side rule violated before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter your name")]
    EmptyName,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Please fill in both email and password")]
    MissingCredentials,
    #[error("Please enter the complete 6-digit OTP")]
    InvalidOtp,
    #[error("No pending signup found; register first")]
    NoPendingSignup,
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Due date and time must be in the future")]
    DueDateNotInFuture,
}

/// Credential store read/write failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Failed to access {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
    #[error("Failed to serialize credentials: {0}")]
    Serialize(String),
}

impl StorageError {
    pub(crate) fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Anything an API call can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Rejected locally, nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Credentials rejected or the session could not be refreshed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// No response (connect failure, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// Non-401 error status.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Successful status with a body of the wrong shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// True when retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// True when the session is no longer usable and the user must log in.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Builds a server error, preferring the JSON `message`/`error` field.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        Self::Server {
            status: status.as_u16(),
            message: server_message(status, body),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Extracts a human readable message from an error body.
pub(crate) fn server_message(status: reqwest::StatusCode, body: &str) -> String {
    let body = body.trim();
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let message = json
            .get("message")
            .or_else(|| json.get("error"))
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            });
        if let Some(message) = message {
            return message;
        }
    }
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body.to_string()
    }
}
