//! Error types for account reconciliation.
//!
//! Errors are split by how far they reach: a database that can't be read
//! ends the whole reconciliation pass, while a desired record that fails
//! validation only fails that one resource.

use std::path::PathBuf;
use thiserror::Error;

/// How far an error reaches within a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// The pass cannot continue (no observed state to diff against)
    Pass,
    /// Only the offending resource fails; siblings keep going
    Resource,
}

impl ErrorScope {
    /// Get a user-friendly description of this scope.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Pass => "Reconciliation aborted",
            Self::Resource => "Resource skipped",
        }
    }
}

/// Errors that can occur while reading account databases or building commands.
#[derive(Debug, Error)]
pub enum Error {
    /// An account database file is missing or unreadable
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Path of the database that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A desired-state value violates a builder precondition
    #[error("invalid {field} for account '{name}': {message}")]
    Validation {
        /// Account the value belongs to
        name: String,
        /// Field that failed validation
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// An expiry value that is not a `YYYY-MM-DD` date
    #[error("invalid expiry date '{value}' for account '{name}'")]
    InvalidDate {
        /// Account the value belongs to
        name: String,
        /// The rejected value
        value: String,
    },

    /// The instance cache was queried before it was loaded
    #[error("instance cache has not been loaded")]
    CacheNotLoaded,
}

impl Error {
    /// Build a validation error.
    pub fn validation(name: &str, field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            name: name.to_string(),
            field,
            message: message.into(),
        }
    }

    /// Build an I/O error bound to the file it came from.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// How far this error reaches.
    pub fn scope(&self) -> ErrorScope {
        match self {
            Error::Io { .. } | Error::CacheNotLoaded => ErrorScope::Pass,
            Error::Validation { .. } | Error::InvalidDate { .. } => ErrorScope::Resource,
        }
    }

    /// Whether this error aborts the whole pass.
    pub fn is_fatal(&self) -> bool {
        self.scope() == ErrorScope::Pass
    }

    /// Field name for validation errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Error::Validation { field, .. } => Some(field),
            Error::InvalidDate { .. } => Some("expiry"),
            _ => None,
        }
    }
}

/// Result type for account operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_is_fatal_and_names_path() {
        let err = Error::io(
            "/etc/passwd",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_fatal());
        assert_eq!(err.scope(), ErrorScope::Pass);
        assert!(err.to_string().contains("/etc/passwd"));
    }

    #[test]
    fn test_validation_error_is_per_resource() {
        let err = Error::validation("bob", "gid", "must be an integer");
        assert!(!err.is_fatal());
        assert_eq!(err.field(), Some("gid"));
        assert_eq!(
            err.to_string(),
            "invalid gid for account 'bob': must be an integer"
        );
    }

    #[test]
    fn test_invalid_date_reports_expiry_field() {
        let err = Error::InvalidDate {
            name: "bob".into(),
            value: "soon".into(),
        };
        assert_eq!(err.field(), Some("expiry"));
        assert_eq!(err.scope(), ErrorScope::Resource);
    }
}
