//! Error types for the form filler.
//!
//! This module defines all error types that can occur while loading
//! configuration, maps and scripts, evaluating expressions, filling forms and
//! writing documents.

use std::path::PathBuf;

/// Result type alias for form filler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during form filling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input file missing or not readable
    #[error("cannot access '{}': {source}", .path.display())]
    FileAccess {
        /// Path that could not be read
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// YAML document failed to parse
    #[error("failed to parse YAML '{}': {message}", .path.display())]
    Yaml {
        /// Path of the offending file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration uses a key reserved for fill results
    #[error("You cannot use a reserved key: {0}")]
    ReservedKey(String),

    /// Configuration has the wrong shape
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Two fields in a map share the same index
    #[error("field index '{index}' is used by both '{first}' and '{second}'")]
    DuplicateIndex {
        /// The repeated index
        index: String,
        /// Field that claimed the index first
        first: String,
        /// Field that repeated it
        second: String,
    },

    /// Fill script entry has the wrong shape
    #[error("invalid script entry '{friendly_key}': {reason}")]
    InvalidScript {
        /// Friendly key of the entry
        friendly_key: String,
        /// What is wrong with it
        reason: String,
    },

    /// Indexed entry does not name exactly one field
    #[error("{0} has more than 1 field to fill")]
    AmbiguousEntry(String),

    /// Index not present in the field map
    #[error(
        "failed to find field index '{index}' in field map (key '{friendly_key}', form '{form}'{}); the map and script may be out of sync",
        .value.as_ref().map(|v| format!(", value '{v}'")).unwrap_or_default()
    )]
    FieldNotFound {
        /// Friendly key of the failing entry
        friendly_key: String,
        /// Index that could not be resolved
        index: String,
        /// Form being filled
        form: String,
        /// Intermediate value of a calculated entry
        value: Option<String>,
    },

    /// Expression failed to compile or evaluate
    #[error("error with template `{expression}`: {reason}")]
    Expression {
        /// Expression text as written in the script
        expression: String,
        /// Compile or runtime failure
        reason: String,
    },

    /// Calculate function returned something other than `{ field, fill }`
    #[error("calculate functions should return an object: {{ field, fill }}")]
    CalculateContract,

    /// Invalid page slice bounds
    #[error("Invalid page range: {0}")]
    PageRange(String),

    /// `fill`/`save` called before a document was loaded
    #[error("no form loaded; call load() first")]
    NotLoaded,

    /// Document adapter failure
    #[error("Document error: {0}")]
    Document(String),
}

impl Error {
    /// Build an expression error from the failing text and its cause.
    pub(crate) fn expression(expression: &str, reason: impl std::fmt::Display) -> Self {
        Error::Expression {
            expression: expression.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The cause of an expression error, without the expression text.
    pub fn expression_reason(&self) -> Option<&str> {
        match self {
            Error::Expression { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_key_error() {
        let err = Error::ReservedKey("forms".to_string());
        assert_eq!(err.to_string(), "You cannot use a reserved key: forms");
    }

    #[test]
    fn test_ambiguous_entry_error() {
        let err = Error::AmbiguousEntry("fill_city".to_string());
        assert_eq!(err.to_string(), "fill_city has more than 1 field to fill");
    }

    #[test]
    fn test_field_not_found_indexed() {
        let err = Error::FieldNotFound {
            friendly_key: "fill_city".to_string(),
            index: "5".to_string(),
            form: "f1040".to_string(),
            value: None,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to find field index '5' in field map"));
        assert!(msg.contains("fill_city"));
        assert!(msg.contains("f1040"));
        assert!(!msg.contains("value"));
    }

    #[test]
    fn test_field_not_found_calculated() {
        let err = Error::FieldNotFound {
            friendly_key: "status".to_string(),
            index: "9".to_string(),
            form: "f1040".to_string(),
            value: Some("single".to_string()),
        };
        assert!(err.to_string().contains("value 'single'"));
    }

    #[test]
    fn test_calculate_contract_message() {
        assert_eq!(
            Error::CalculateContract.to_string(),
            "calculate functions should return an object: { field, fill }"
        );
    }

    #[test]
    fn test_expression_error() {
        let err = Error::expression("badFunc(ctx.city)", "badFunc is not defined");
        assert!(err.to_string().contains("badFunc(ctx.city)"));
        assert_eq!(err.expression_reason(), Some("badFunc is not defined"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
