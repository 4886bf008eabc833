use crate::domain::{
    entities::{ApplicationSpec, Definition, Revision},
    error::DomainError,
};

/// Centralized domain validation.
///
/// All validation logic lives here, not scattered across services.
pub struct DomainValidator;

impl DomainValidator {
    pub fn validate_application(application: &ApplicationSpec) -> Result<(), DomainError> {
        application.validate()
    }

    /// A definition is valid when its template parses; helm schematics are
    /// accepted as-is.
    pub fn validate_definition(definition: &Definition) -> Result<(), DomainError> {
        if definition.schematic().template_source().is_none() {
            return Ok(());
        }
        definition.compile().map(|_| ())
    }

    /// A revision must belong to the application it is named after, and every
    /// resource identity must be unique.
    pub fn validate_revision(revision: &Revision) -> Result<(), DomainError> {
        let expected = Revision::name_for(revision.application.name(), revision.number);
        if revision.name != expected {
            return Err(DomainError::InvalidApplication(format!(
                "revision '{}' does not match application '{}' (expected '{expected}')",
                revision.name,
                revision.application.name()
            )));
        }
        for (i, resource) in revision.resources.iter().enumerate() {
            if revision.resources[..i]
                .iter()
                .any(|r| r.identity == resource.identity)
            {
                return Err(DomainError::InvalidApplication(format!(
                    "revision '{}' contains resource {} twice",
                    revision.name, resource.identity
                )));
            }
        }
        Ok(())
    }
}
