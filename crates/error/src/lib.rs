//! # sqlgate-error
//!
//! Unified error types for the sqlgate query gateway.
//!
//! All errors are designed to be machine-parseable with:
//! - Numeric error codes (SQLGATE-XXXX)
//! - Structured JSON serialization
//! - Actionable hints for self-correction

mod code;
mod convert;

pub use code::{ErrorCategory, ErrorCode};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The unified error type for all gateway operations.
///
/// Everything in the taxonomy is a client-visible failure: sanitizer
/// rejections, translator faults, and database errors all surface to the
/// caller with their message rather than becoming server faults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateError {
    /// Numeric error code (e.g., "SQLGATE-1004")
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for self-correction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl GateError {
    /// Create a new error with code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            hint: None,
        }
    }

    /// Add an actionable hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Serialize to JSON for API responses
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize GateError: {}", e);
            format!(
                r#"{{"code":"{}","message":"Serialization failed"}}"#,
                self.code
            )
        })
    }
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (Hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for GateError {}

/// Result alias used throughout the pipeline crates.
pub type Result<T> = std::result::Result<T, GateError>;
