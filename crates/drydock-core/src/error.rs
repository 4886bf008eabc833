//! Unified error handling for drydock core.
//!
//! This module provides a unified error type that wraps domain and application
//! errors, with rich context and user-actionable suggestions.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// Root error type for drydock core operations.
///
/// Rendering, diffing and introspection are all-or-nothing: any of these
/// aborts the whole invocation and no partial result is returned.
#[derive(Debug, Error, Clone)]
pub enum DrydockError {
    /// Errors from the domain layer (bad properties, broken templates).
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Errors from the application layer (lookups, stores).
    #[error("Application error: {0}")]
    Application(#[from] ApplicationError),

    /// Configuration or setup errors.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl DrydockError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Configuration { message } => vec![
                format!("Configuration issue: {}", message),
                "Check your setup and try again".into(),
            ],
            Self::Internal { .. } => vec![
                "This appears to be a bug in drydock".into(),
                "Please report this issue at: https://github.com/cosecruz/drydock/issues".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Definition => ErrorCategory::Definition,
                crate::domain::ErrorCategory::NotFound => ErrorCategory::NotFound,
                crate::domain::ErrorCategory::Internal => ErrorCategory::Internal,
            },
            Self::Application(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Only a contended store qualifies; the core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Application(ApplicationError::StoreLockError))
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Definition,
    NotFound,
    Configuration,
    Internal,
}

/// Convenient result type alias.
pub type DrydockResult<T> = Result<T, DrydockError>;

/// Extension trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> DrydockResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> DrydockResult<T> {
        self.map_err(|e| DrydockError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_category_is_mapped() {
        let err: DrydockError = DomainError::Template {
            definition: "ingress".into(),
            reason: "unexpected `}`".into(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Definition);
        assert!(!err.is_retryable());
    }

    #[test]
    fn not_found_is_not_retryable() {
        let err: DrydockError = ApplicationError::RevisionNotFound {
            application: "shop".into(),
            namespace: "default".into(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(!err.is_retryable());
        assert!(DrydockError::from(ApplicationError::StoreLockError).is_retryable());
    }

    #[test]
    fn context_wraps_foreign_errors() {
        let parsed: Result<u8, _> = "x".parse::<u8>();
        let err = parsed.context("reading replica count").unwrap_err();
        assert!(err.to_string().contains("reading replica count"));
        assert_eq!(err.category(), ErrorCategory::Internal);
    }
}
