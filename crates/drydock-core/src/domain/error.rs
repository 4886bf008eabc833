// ============================================================================
// domain/error.rs - DOMAIN ERRORS
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (results are memoized per render)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Parameter Errors (user input does not fit a definition)
    // ========================================================================
    #[error("invalid properties for '{definition}' at {path}: {reason}")]
    Schema {
        definition: String,
        path: String,
        reason: String,
    },

    // ========================================================================
    // Template Errors (the definition itself is broken)
    // ========================================================================
    #[error("template of '{definition}' is invalid: {reason}")]
    Template { definition: String, reason: String },

    #[error("definition '{name}' is invalid: {reason}")]
    InvalidDefinition { name: String, reason: String },

    // ========================================================================
    // Application Model Errors
    // ========================================================================
    #[error("Invalid application: {0}")]
    InvalidApplication(String),

    #[error("Component '{component}' is declared more than once in application '{application}'")]
    DuplicateComponent {
        application: String,
        component: String,
    },

    #[error("Rendered resource is missing required field: {field}")]
    MissingResourceField { field: &'static str },

    // ========================================================================
    // Encoding
    // ========================================================================
    #[error("Failed to serialize {what}: {reason}")]
    Serialization { what: String, reason: String },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Schema {
                definition, path, ..
            } => vec![
                format!("Check the properties passed to '{definition}'"),
                format!("Offending path: {path}"),
                format!("Try: drydock show {definition}"),
            ],
            Self::Template { definition, .. } => vec![
                format!("The template of '{definition}' could not be evaluated"),
                "Fix the definition file or report it to its maintainer".into(),
            ],
            Self::InvalidDefinition { name, .. } => vec![
                format!("Definition '{name}' could not be loaded"),
                "Check its apiVersion, kind, metadata.name and spec.schematic".into(),
            ],
            Self::InvalidApplication(msg) => vec![
                "Check the application manifest".into(),
                format!("Details: {msg}"),
            ],
            Self::DuplicateComponent { component, .. } => vec![
                format!("Rename one of the components called '{component}'"),
                "Component names must be unique within an application".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Schema { .. }
            | Self::InvalidApplication(_)
            | Self::DuplicateComponent { .. } => ErrorCategory::Validation,
            Self::Template { .. } | Self::InvalidDefinition { .. } => ErrorCategory::Definition,
            Self::MissingResourceField { .. } | Self::Serialization { .. } => {
                ErrorCategory::Internal
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Definition,
    NotFound,
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_definition_and_path() {
        let err = DomainError::Schema {
            definition: "webservice".into(),
            path: "parameter.image".into(),
            reason: "required parameter is not set".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("webservice"));
        assert!(msg.contains("parameter.image"));
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.suggestions().iter().any(|s| s.contains("drydock show")));
    }

    #[test]
    fn template_error_is_definition_category() {
        let err = DomainError::Template {
            definition: "ingress".into(),
            reason: "reference `foo` not found".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Definition);
    }
}
