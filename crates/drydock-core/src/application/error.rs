//! Application layer errors.
//!
//! These errors represent failures in orchestration, not business logic.
//! Business logic errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::DefinitionKind;
use crate::error::ErrorCategory;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// A component or trait type resolves to no definition.
    #[error("{kind} definition '{name}' not found in namespace '{namespace}' or the system namespace")]
    DefinitionNotFound {
        kind: DefinitionKind,
        name: String,
        namespace: String,
    },

    /// `show` was asked about a name that is neither a component nor a trait.
    #[error("no component or trait definition named '{name}' in namespace '{namespace}'")]
    UnknownDefinition { name: String, namespace: String },

    /// Live-diff against an application that has never been recorded.
    #[error("no applied revision found for application '{application}' in namespace '{namespace}'")]
    RevisionNotFound {
        application: String,
        namespace: String,
    },

    /// The definition source failed (unreadable directory, cluster error).
    #[error("Definition repository error: {reason}")]
    Repository { reason: String },

    /// The revision store failed to read or write.
    #[error("Revision store error: {reason}")]
    RevisionStore { reason: String },

    /// An application manifest could not be read or parsed.
    #[error("Failed to load application from '{path}': {reason}")]
    ApplicationFile { path: PathBuf, reason: String },

    /// Store access failed (lock poisoned, etc.).
    #[error("Store is locked")]
    StoreLockError,
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::DefinitionNotFound {
                kind,
                name,
                namespace,
            } => vec![
                format!("No {kind} definition '{name}' in '{namespace}'"),
                "Try: drydock list to see available definitions".into(),
                "Or point --definitions at a directory containing it".into(),
            ],
            Self::UnknownDefinition { name, .. } => vec![
                format!("'{name}' is neither a component nor a trait type"),
                "Try: drydock list".into(),
            ],
            Self::RevisionNotFound { application, .. } => vec![
                format!("Application '{application}' has no recorded revision"),
                "Record one first: drydock dry-run -f <app.yaml> --record".into(),
            ],
            Self::Repository { .. } => vec![
                "Check the definitions directory is readable".into(),
                "Check the definition files are valid YAML".into(),
            ],
            Self::RevisionStore { .. } => vec![
                "Check the revisions directory exists and is writable".into(),
            ],
            Self::ApplicationFile { path, .. } => vec![
                format!("Check that '{}' exists and is readable", path.display()),
                "The file must contain a single Application document".into(),
            ],
            Self::StoreLockError => vec![
                "The store is locked".into(),
                "Try again in a moment".into(),
            ],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DefinitionNotFound { .. }
            | Self::UnknownDefinition { .. }
            | Self::RevisionNotFound { .. } => ErrorCategory::NotFound,
            Self::ApplicationFile { .. } => ErrorCategory::Validation,
            Self::Repository { .. } | Self::RevisionStore { .. } | Self::StoreLockError => {
                ErrorCategory::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_not_found_names_kind_and_namespace() {
        let err = ApplicationError::DefinitionNotFound {
            kind: DefinitionKind::Trait,
            name: "gateway".into(),
            namespace: "prod".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("trait definition 'gateway'"));
        assert!(msg.contains("prod"));
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn revision_not_found_suggests_recording() {
        let err = ApplicationError::RevisionNotFound {
            application: "shop".into(),
            namespace: "default".into(),
        };
        assert!(err.suggestions().iter().any(|s| s.contains("--record")));
    }
}
