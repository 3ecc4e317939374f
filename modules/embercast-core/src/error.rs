//! Serialized error surface for user-visible failures.

use serde::{Deserialize, Serialize};

/// Structured error payload returned to callers: a stable machine-readable
/// code plus a human-readable message. Typed domain errors convert into this
/// at the boundary; nothing is ever silently swallowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
