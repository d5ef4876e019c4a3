//! Error handling for partialgen
//!
//! These are the ambient errors of the toolchain: loading compilation
//! snapshots, reading configuration and applying code fixes. Problems with
//! user annotations are never errors; they surface as diagnostics.

use crate::cancellation::Cancelled;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for partialgen operations
#[derive(Error, Debug)]
pub enum PartialGenError {
    /// A compilation snapshot could not be loaded or is inconsistent
    #[error("Model error: {message}")]
    Model {
        message: String,
        path: Option<PathBuf>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// A code fix could not be computed or applied
    #[error("Code fix error: {message}")]
    CodeFix {
        message: String,
        diagnostic_id: Option<String>,
    },

    /// The host cancelled the pass
    #[error("{0}")]
    Cancelled(#[from] Cancelled),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PartialGenError {
    /// Create a new model error
    pub fn model<S: Into<String>>(message: S) -> Self {
        Self::Model {
            message: message.into(),
            path: None,
        }
    }

    /// Create a model error pointing at the snapshot file that caused it
    pub fn model_with_path<S: Into<String>>(message: S, path: PathBuf) -> Self {
        Self::Model {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error with field information
    pub fn configuration_with_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new code fix error
    pub fn code_fix<S: Into<String>>(message: S) -> Self {
        Self::CodeFix {
            message: message.into(),
            diagnostic_id: None,
        }
    }

    /// Create a code fix error tied to the diagnostic it was meant to fix
    pub fn code_fix_for<S: Into<String>, D: Into<String>>(message: S, diagnostic_id: D) -> Self {
        Self::CodeFix {
            message: message.into(),
            diagnostic_id: Some(diagnostic_id.into()),
        }
    }

    /// Whether this error is a cooperative cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Result type for partialgen operations
pub type PartialGenResult<T> = Result<T, PartialGenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let error = PartialGenError::configuration_with_field("must be positive", "emit.indent_width");
        assert!(matches!(
            &error,
            PartialGenError::Configuration { field: Some(field), .. } if field == "emit.indent_width"
        ));
        assert_eq!(error.to_string(), "Configuration error: must be positive");

        let error = PartialGenError::code_fix_for("member not found", "PG0002");
        assert!(matches!(
            &error,
            PartialGenError::CodeFix { diagnostic_id: Some(id), .. } if id == "PG0002"
        ));
    }

    #[test]
    fn test_cancelled_conversion() {
        let error: PartialGenError = Cancelled.into();
        assert!(error.is_cancelled());
        assert!(!PartialGenError::model("broken").is_cancelled());
    }
}
