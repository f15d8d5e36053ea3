//! Structured errors with machine-readable codes

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Accessibility/input-monitoring permission missing. Fatal to `start()`.
    PermissionDenied,
    /// Low-level input hook could not attach. Recording degrades, never crashes.
    HookUnavailable,
    /// A poll-based observer failed repeatedly and was disabled for the session.
    ObserverDisabled,
    /// A recording session is already active.
    SessionActive,
    /// Replay could not start or was already running.
    ReplayFailed,
    /// Writing or reading a recording file failed.
    Persistence,
    Unknown,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    pub fn hook_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::HookUnavailable, message)
    }

    pub fn observer_disabled(observer: &str) -> Self {
        Self::new(
            ErrorCode::ObserverDisabled,
            format!("{} observer disabled after repeated failures", observer),
        )
    }

    pub fn session_active() -> Self {
        Self::new(
            ErrorCode::SessionActive,
            "a recording session is already active",
        )
    }

    pub fn replay_failed(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::ReplayFailed, reason)
    }

    pub fn persistence(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Persistence, reason)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::Persistence, e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorCode::Persistence, e.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::new(ErrorCode::Unknown, e.to_string())
    }
}
