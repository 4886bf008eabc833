// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for drydock.
//!
//! Pure logic over structured documents: the definition template language,
//! the application model, rendered resources and the diff engine. Lookups of
//! definitions and revisions happen through ports in the application layer.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: Domain logic is synchronous
//! - **No I/O**: No filesystem, network, or cluster calls
//! - **Values in, values out**: documents are `serde_json::Value`
//! - **Immutable entities**: All domain objects are Clone + PartialEq
//!
// Public API - what the world sees
pub mod diff;
pub mod entities;
pub mod error;
pub mod template;

// Private implementation details - not visible outside domain
mod validation;

// Re-exports for convenience
pub use entities::{
    ApplicationManifest, ApplicationSpec, ComponentDefinition, ComponentSpec, DEFAULT_NAMESPACE,
    Definition, DefinitionKind, DefinitionSummary, RenderContext, RenderedApplication,
    RenderedComponent, RenderedResource, ResourceIdentity, ResourceRole, Revision,
    RevisionRecord, SYSTEM_NAMESPACE, Schematic, TraitDefinition, TraitSpec, WorkloadType,
};

pub use diff::{ChangeKind, DiffEntry, DiffLine, DiffScope, DiffSubject, LineChange};
pub use error::{DomainError, ErrorCategory};
pub use template::{CompiledTemplate, EvalResult, ParameterDecl, Patch, PatchDirective};

pub use validation::DomainValidator;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(kind: &str, name: &str, template: &str) -> Definition {
        Definition::from_manifest(
            &json!({
                "apiVersion": "core.oam.dev/v1beta1",
                "kind": kind,
                "metadata": {"name": name},
                "spec": {"schematic": {"cue": {"template": template}}}
            }),
            SYSTEM_NAMESPACE,
        )
        .unwrap()
    }

    // ========================================================================
    // Validator Tests
    // ========================================================================

    #[test]
    fn validator_accepts_parsable_definition() {
        let def = manifest(
            "ComponentDefinition",
            "worker",
            "output: {kind: \"Deployment\"}\nparameter: {image: string}\n",
        );
        assert!(DomainValidator::validate_definition(&def).is_ok());
    }

    #[test]
    fn validator_rejects_broken_template() {
        let def = manifest("TraitDefinition", "broken", "outputs: {\n");
        let err = DomainValidator::validate_definition(&def).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Definition);
    }

    #[test]
    fn validator_rejects_duplicate_components() {
        let app = ApplicationSpec::new("shop", DEFAULT_NAMESPACE)
            .with_component(ComponentSpec::new("web", "webservice", json!({})))
            .with_component(ComponentSpec::new("web", "worker", json!({})));
        assert!(matches!(
            DomainValidator::validate_application(&app),
            Err(DomainError::DuplicateComponent { .. })
        ));
    }

    #[test]
    fn validator_checks_revision_name_and_identities() {
        let app = ApplicationManifest::from_spec(&ApplicationSpec::new("shop", "default")).unwrap();
        let workload = RenderedResource::new(ResourceIdentity::workload("web"), json!({}));

        let ok = Revision::new(1, app.clone(), vec![workload.clone()]);
        assert!(DomainValidator::validate_revision(&ok).is_ok());

        let mut renamed = ok.clone();
        renamed.name = "other-v1".into();
        assert!(DomainValidator::validate_revision(&renamed).is_err());

        let twice = Revision::new(2, app, vec![workload.clone(), workload]);
        assert!(DomainValidator::validate_revision(&twice).is_err());
    }

    // ========================================================================
    // End-to-end: template -> resource -> diff
    // ========================================================================

    #[test]
    fn rendered_output_diffs_against_itself_as_unchanged() {
        let template = CompiledTemplate::compile(
            "worker",
            r#"
output: {
    apiVersion: "apps/v1"
    kind:       "Deployment"
    metadata: name: context.name
    spec: replicas: parameter.replicas
}
parameter: {
    replicas: *1 | int
}
"#,
        )
        .unwrap();
        let ctx = RenderContext::new("shop", "default").for_component("web", "worker");
        let result = template.evaluate(&json!({}), &ctx).unwrap();
        let document = result.output.unwrap();
        assert_eq!(document["spec"]["replicas"], 1);
        assert_eq!(document["metadata"]["name"], "web");

        let resources = vec![RenderedResource::new(
            ResourceIdentity::workload("web"),
            document,
        )];
        let entries = diff::diff_resources(&resources, &resources).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].change, ChangeKind::Unchanged);
    }
}
