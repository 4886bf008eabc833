//! Show Service - definition reference and listing.

use tracing::{debug, instrument};

use crate::{
    application::{ApplicationError, ports::DefinitionRepository},
    domain::{Definition, DefinitionSummary, ParameterDecl},
    error::DrydockResult,
};

/// A definition with its parameter schema.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionReference {
    pub definition: Definition,
    /// Declared parameters, in declaration order. Empty for helm schematics.
    pub parameters: Vec<ParameterDecl>,
}

/// Service for definition queries.
pub struct ShowService {
    repository: Box<dyn DefinitionRepository>,
}

impl ShowService {
    pub fn new(repository: Box<dyn DefinitionRepository>) -> Self {
        Self { repository }
    }

    /// Look `name` up as a component type first, then as a trait type.
    #[instrument(skip(self))]
    pub fn show(&self, name: &str, namespace: &str) -> DrydockResult<DefinitionReference> {
        let definition = match self.repository.component_definition(name, namespace)? {
            Some(component) => Definition::Component(component),
            None => match self.repository.trait_definition(name, namespace)? {
                Some(trait_definition) => Definition::Trait(trait_definition),
                None => {
                    return Err(ApplicationError::UnknownDefinition {
                        name: name.to_string(),
                        namespace: namespace.to_string(),
                    }
                    .into());
                }
            },
        };

        let parameters = match definition.schematic().template_source() {
            Some(_) => definition.compile()?.parameters(),
            None => Vec::new(),
        };
        debug!(kind = %definition.kind(), parameters = parameters.len(), "Definition introspected");
        Ok(DefinitionReference {
            definition,
            parameters,
        })
    }

    /// All visible definitions, components first, each kind sorted by name.
    pub fn list(&self) -> DrydockResult<Vec<DefinitionSummary>> {
        let mut summaries: Vec<_> = self
            .repository
            .list()?
            .iter()
            .map(Definition::summary)
            .collect();
        summaries.sort_by(|a, b| {
            (a.kind, &a.name, &a.namespace).cmp(&(b.kind, &b.name, &b.namespace))
        });
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::ports::MockDefinitionRepository,
        domain::{
            ComponentDefinition, DefinitionKind, SYSTEM_NAMESPACE, Schematic, TraitDefinition,
        },
        error::DrydockError,
    };
    use pretty_assertions::assert_eq;

    const TASK: &str = r#"
output: {
    apiVersion: "batch/v1"
    kind:       "Job"
    spec: parallelism: parameter.count
}
parameter: {
    // +usage=specify number of tasks to run in parallel
    // +short=c
    count: *1 | int

    // +usage=Which image would you like to use for your service
    // +short=i
    image: string

    // +usage=Define the job restart policy, the value can only be Never or OnFailure. By default, it's Never.
    restart: *"Never" | string

    // +usage=Commands to run in the container
    cmd?: [...string]
}
"#;

    fn task() -> ComponentDefinition {
        ComponentDefinition {
            name: "task".into(),
            namespace: SYSTEM_NAMESPACE.into(),
            description: "Describes jobs that run code or a script to completion.".into(),
            workload: None,
            status: None,
            schematic: Schematic::Cue {
                template: TASK.into(),
            },
        }
    }

    fn sidecar() -> TraitDefinition {
        TraitDefinition {
            name: "sidecar".into(),
            namespace: SYSTEM_NAMESPACE.into(),
            description: String::new(),
            applies_to_workloads: vec!["webservice".into()],
            pod_disruptive: true,
            status: None,
            schematic: Schematic::Cue {
                template: "patch: {}\nparameter: {\n    name: string\n}\n".into(),
            },
        }
    }

    #[test]
    fn show_component_reports_parameters_in_order() {
        let mut repo = MockDefinitionRepository::new();
        repo.expect_component_definition()
            .returning(|_, _| Ok(Some(task())));
        let reference = ShowService::new(Box::new(repo))
            .show("task", "default")
            .unwrap();

        let rows: Vec<_> = reference
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.type_name.as_str(), p.required))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("count", "int", true),
                ("image", "string", true),
                ("restart", "string", true),
                ("cmd", "[]string", false),
            ]
        );
        assert_eq!(
            reference.parameters[0].description,
            "specify number of tasks to run in parallel"
        );
    }

    #[test]
    fn show_falls_back_to_traits() {
        let mut repo = MockDefinitionRepository::new();
        repo.expect_component_definition().returning(|_, _| Ok(None));
        repo.expect_trait_definition()
            .returning(|_, _| Ok(Some(sidecar())));
        let reference = ShowService::new(Box::new(repo))
            .show("sidecar", "default")
            .unwrap();
        assert_eq!(reference.definition.kind(), DefinitionKind::Trait);
        assert_eq!(reference.parameters.len(), 1);
    }

    #[test]
    fn show_helm_definition_has_no_parameters() {
        let mut repo = MockDefinitionRepository::new();
        repo.expect_component_definition().returning(|_, _| {
            Ok(Some(ComponentDefinition {
                schematic: Schematic::Helm {
                    chart: "podinfo".into(),
                    version: Some("5.1.4".into()),
                    repository: Some("http://oam.dev/catalog/".into()),
                },
                ..task()
            }))
        });
        let reference = ShowService::new(Box::new(repo))
            .show("webapp-chart", "default")
            .unwrap();
        assert!(reference.parameters.is_empty());
    }

    #[test]
    fn show_unknown_name_fails() {
        let mut repo = MockDefinitionRepository::new();
        repo.expect_component_definition().returning(|_, _| Ok(None));
        repo.expect_trait_definition().returning(|_, _| Ok(None));
        let err = ShowService::new(Box::new(repo))
            .show("nope", "default")
            .unwrap_err();
        assert!(matches!(
            err,
            DrydockError::Application(ApplicationError::UnknownDefinition { .. })
        ));
    }

    #[test]
    fn list_sorts_components_before_traits() {
        let mut repo = MockDefinitionRepository::new();
        repo.expect_list().returning(|| {
            Ok(vec![
                Definition::Trait(sidecar()),
                Definition::Component(task()),
            ])
        });
        let names: Vec<_> = ShowService::new(Box::new(repo))
            .list()
            .unwrap()
            .into_iter()
            .map(|s| (s.kind, s.name))
            .collect();
        assert_eq!(
            names,
            vec![
                (DefinitionKind::Component, "task".to_string()),
                (DefinitionKind::Trait, "sidecar".to_string()),
            ]
        );
    }
}
