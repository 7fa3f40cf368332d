use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Acknowledgement returned by the chat client for one delivered payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub id: String,
    pub timestamp: i64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("Chat session is not available")]
    Unavailable,
    #[error("Timed out waiting for the chat network")]
    Timeout,
    #[error("Rejected by the chat network: {0}")]
    Rejected(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Recipient number contains no digits")]
    InvalidRecipient,
}

impl SendError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unavailable => "session_unavailable",
            Self::Timeout => "network_timeout",
            Self::Rejected(_) => "rejected",
            Self::Transport(_) => "transport_error",
            Self::InvalidRecipient => "invalid_recipient",
        }
    }
}

/// Serializable view of a [`SendError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl From<&SendError> for ErrorInfo {
    fn from(err: &SendError) -> Self {
        Self { code: err.code().to_string(), message: err.to_string() }
    }
}

/// Authentication state of the external chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Ready,
    Pending,
    Disconnected,
}

impl SessionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Pending => "pending",
            Self::Disconnected => "disconnected",
        }
    }
}
