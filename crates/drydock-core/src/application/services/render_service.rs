//! Render Service - turns an application into its resource documents.
//!
//! Per component, in application order:
//! 1. Resolve the component definition and evaluate its template
//! 2. Stamp provenance labels on the workload
//! 3. For each trait: resolve, evaluate against the current workload,
//!    merge its patch into the workload, and collect its outputs
//! 4. Stamp the workload again, so patches cannot rewrite provenance
//!
//! The result holds the (patched) workload first, then trait resources in
//! trait order and, within a trait, in template declaration order.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, info, instrument, warn};

use crate::{
    application::{ApplicationError, ports::DefinitionRepository},
    domain::{
        ApplicationSpec, CompiledTemplate, ComponentDefinition, ComponentSpec, DefinitionKind,
        DomainError, DomainValidator as validator, RenderContext, RenderedApplication,
        RenderedComponent, RenderedResource, ResourceIdentity, Schematic, TraitDefinition,
        entities::labels,
    },
    error::DrydockResult,
};

/// Application renderer.
pub struct RenderService {
    repository: Box<dyn DefinitionRepository>,
}

impl RenderService {
    /// Create a render service over a definition source.
    pub fn new(repository: Box<dyn DefinitionRepository>) -> Self {
        Self { repository }
    }

    /// Render every component of `application`.
    ///
    /// `context` supplies the application-wide values (name, namespace,
    /// revision, config); the component fields are filled in here.
    #[instrument(
        skip_all,
        fields(
            application = %application.name,
            namespace = %application.namespace,
            components = application.components.len()
        )
    )]
    pub fn render(
        &self,
        application: &ApplicationSpec,
        context: &RenderContext,
    ) -> DrydockResult<RenderedApplication> {
        validator::validate_application(application)?;

        let mut session = RenderSession::new(self.repository.as_ref(), &application.namespace);
        let components = application
            .components
            .iter()
            .map(|component| self.render_component(&mut session, component, context))
            .collect::<DrydockResult<Vec<_>>>()?;

        let rendered = RenderedApplication {
            name: application.name.clone(),
            namespace: application.namespace.clone(),
            components,
        };
        info!(resources = rendered.resource_count(), "Application rendered");
        Ok(rendered)
    }

    fn render_component(
        &self,
        session: &mut RenderSession<'_>,
        component: &ComponentSpec,
        context: &RenderContext,
    ) -> DrydockResult<RenderedComponent> {
        let (definition, template) = session.component_definition(&component.type_name)?;
        let context = context.for_component(&component.name, &component.type_name);

        let result = template.evaluate(&component.properties, &context)?;
        if !result.outputs.is_empty() {
            warn!(
                component = %component.name,
                definition = %definition.name,
                "Component template declares `outputs`; only `output` is rendered"
            );
        }
        let mut workload = result.output.ok_or_else(|| DomainError::Template {
            definition: definition.name.clone(),
            reason: "component template has no `output`".into(),
        })?;
        let provenance = [
            (labels::APP_NAME, context.app_name()),
            (labels::COMPONENT, component.name.as_str()),
            (labels::APP_REVISION, context.app_revision()),
            (labels::WORKLOAD_TYPE, component.type_name.as_str()),
        ];
        RenderedResource::stamp_labels(&mut workload, &provenance)?;
        debug!(component = %component.name, definition = %definition.name, "Workload rendered");

        let mut traits: Vec<RenderedResource> = Vec::new();
        for attached in &component.traits {
            let (trait_definition, template) = session.trait_definition(&attached.type_name)?;
            if !trait_definition.applies_to(&component.type_name, definition.workload.as_ref()) {
                warn!(
                    component = %component.name,
                    trait_type = %attached.type_name,
                    workload = %component.type_name,
                    "Trait does not declare support for this workload type"
                );
            }

            let trait_context = context.with_workload(workload.clone());
            let result = template.evaluate(&attached.properties, &trait_context)?;

            if let Some(patch) = &result.patch {
                patch.apply(&mut workload);
            }

            for (output, mut document) in result.outputs {
                let identity =
                    ResourceIdentity::trait_output(&component.name, &attached.type_name, &output);
                if traits.iter().any(|r| r.identity == identity) {
                    return Err(DomainError::InvalidApplication(format!(
                        "component '{}' renders {identity} more than once; \
                         attach trait '{}' only once",
                        component.name, attached.type_name
                    ))
                    .into());
                }
                RenderedResource::stamp_labels(
                    &mut document,
                    &[
                        (labels::APP_NAME, context.app_name()),
                        (labels::COMPONENT, component.name.as_str()),
                        (labels::APP_REVISION, context.app_revision()),
                        (labels::TRAIT_TYPE, attached.type_name.as_str()),
                        (labels::TRAIT_RESOURCE, output.as_str()),
                    ],
                )?;
                traits.push(RenderedResource::new(identity, document));
            }
            debug!(
                component = %component.name,
                trait_type = %attached.type_name,
                patched = result.patch.is_some(),
                "Trait applied"
            );
        }

        if !component.traits.is_empty() {
            RenderedResource::remove_labels(
                &mut workload,
                &[labels::TRAIT_TYPE, labels::TRAIT_RESOURCE],
            );
            RenderedResource::stamp_labels(&mut workload, &provenance)?;
        }

        Ok(RenderedComponent {
            name: component.name.clone(),
            workload: RenderedResource::new(ResourceIdentity::workload(&component.name), workload),
            traits,
        })
    }
}

// -------------------------------------------------------------------------
// Per-render memoization
// -------------------------------------------------------------------------

/// Definitions and compiled templates resolved during one render.
struct RenderSession<'a> {
    repository: &'a dyn DefinitionRepository,
    namespace: &'a str,
    components: HashMap<String, (Rc<ComponentDefinition>, Rc<CompiledTemplate>)>,
    traits: HashMap<String, (Rc<TraitDefinition>, Rc<CompiledTemplate>)>,
}

impl<'a> RenderSession<'a> {
    fn new(repository: &'a dyn DefinitionRepository, namespace: &'a str) -> Self {
        Self {
            repository,
            namespace,
            components: HashMap::new(),
            traits: HashMap::new(),
        }
    }

    fn component_definition(
        &mut self,
        name: &str,
    ) -> DrydockResult<(Rc<ComponentDefinition>, Rc<CompiledTemplate>)> {
        if let Some((definition, template)) = self.components.get(name) {
            return Ok((Rc::clone(definition), Rc::clone(template)));
        }
        let definition = self
            .repository
            .component_definition(name, self.namespace)?
            .ok_or_else(|| self.not_found(DefinitionKind::Component, name))?;
        let template = compile(&definition.name, &definition.schematic)?;
        let entry = (Rc::new(definition), Rc::new(template));
        self.components.insert(name.to_string(), entry.clone());
        Ok(entry)
    }

    fn trait_definition(
        &mut self,
        name: &str,
    ) -> DrydockResult<(Rc<TraitDefinition>, Rc<CompiledTemplate>)> {
        if let Some((definition, template)) = self.traits.get(name) {
            return Ok((Rc::clone(definition), Rc::clone(template)));
        }
        let definition = self
            .repository
            .trait_definition(name, self.namespace)?
            .ok_or_else(|| self.not_found(DefinitionKind::Trait, name))?;
        let template = compile(&definition.name, &definition.schematic)?;
        let entry = (Rc::new(definition), Rc::new(template));
        self.traits.insert(name.to_string(), entry.clone());
        Ok(entry)
    }

    fn not_found(&self, kind: DefinitionKind, name: &str) -> ApplicationError {
        ApplicationError::DefinitionNotFound {
            kind,
            name: name.to_string(),
            namespace: self.namespace.to_string(),
        }
    }
}

fn compile(name: &str, schematic: &Schematic) -> Result<CompiledTemplate, DomainError> {
    match schematic.template_source() {
        Some(source) => CompiledTemplate::compile(name, source),
        None => Err(DomainError::Template {
            definition: name.to_string(),
            reason: format!("{} schematic cannot be rendered offline", schematic.kind()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::ports::MockDefinitionRepository,
        domain::SYSTEM_NAMESPACE,
        error::DrydockError,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const WORKER: &str = r#"
output: {
    apiVersion: "apps/v1"
    kind:       "Deployment"
    metadata: labels: app: context.name
    spec: template: spec: containers: [{
        name:  context.name
        image: parameter.image
    }]
}
parameter: {
    image: string
}
"#;

    const SIDECAR: &str = r#"
patch: {
    // +patchKey=name
    spec: template: spec: containers: [{
        name:  parameter.name
        image: parameter.image
    }]
}
parameter: {
    name:  string
    image: string
}
"#;

    const EXPOSE: &str = r#"
outputs: service: {
    apiVersion: "v1"
    kind:       "Service"
    metadata: name: context.name
    spec: ports: [{port: parameter.port}]
}
outputs: monitor: {
    apiVersion: "v1"
    kind:       "ServiceMonitor"
    metadata: name: context.appName
}
parameter: port: *80 | int
"#;

    const RELABEL: &str = r#"
patch: metadata: labels: {
    "app.oam.dev/component":  "other"
    "app.oam.dev/name":       "other-app"
    "trait.oam.dev/type":     "relabel"
    "trait.oam.dev/resource": "workload"
    team:                     "payments"
}
"#;

    fn component(name: &str, template: &str) -> ComponentDefinition {
        ComponentDefinition {
            name: name.into(),
            namespace: SYSTEM_NAMESPACE.into(),
            description: String::new(),
            workload: None,
            status: None,
            schematic: Schematic::Cue {
                template: template.into(),
            },
        }
    }

    fn trait_def(name: &str, template: &str) -> TraitDefinition {
        TraitDefinition {
            name: name.into(),
            namespace: SYSTEM_NAMESPACE.into(),
            description: String::new(),
            applies_to_workloads: vec![],
            pod_disruptive: false,
            status: None,
            schematic: Schematic::Cue {
                template: template.into(),
            },
        }
    }

    fn repository() -> MockDefinitionRepository {
        let mut repo = MockDefinitionRepository::new();
        repo.expect_component_definition()
            .returning(|name, _| Ok((name == "worker").then(|| component("worker", WORKER))));
        repo.expect_trait_definition().returning(|name, _| {
            Ok(match name {
                "sidecar" => Some(trait_def("sidecar", SIDECAR)),
                "expose" => Some(trait_def("expose", EXPOSE)),
                "relabel" => Some(trait_def("relabel", RELABEL)),
                _ => None,
            })
        });
        repo
    }

    fn context() -> RenderContext {
        RenderContext::new("shop", "default")
    }

    #[test]
    fn renders_workload_then_traits_in_order() {
        let app = ApplicationSpec::new("shop", "default").with_component(
            ComponentSpec::new("web", "worker", json!({"image": "nginx"}))
                .with_trait("expose", json!({"port": 8080}))
                .with_trait("sidecar", json!({"name": "log", "image": "fluentd"})),
        );
        let service = RenderService::new(Box::new(repository()));
        let rendered = service.render(&app, &context()).unwrap();

        let ids: Vec<_> = rendered.resources().map(|r| r.identity.to_string()).collect();
        assert_eq!(
            ids,
            vec!["web/workload", "web/expose/service", "web/expose/monitor"]
        );

        let workload = &rendered.components[0].workload.document;
        let containers = workload["spec"]["template"]["spec"]["containers"]
            .as_array()
            .unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[1]["name"], "log");
        assert_eq!(workload["metadata"]["labels"]["app"], "web");
        assert_eq!(workload["metadata"]["labels"]["workload.oam.dev/type"], "worker");
        assert_eq!(workload["metadata"]["labels"]["app.oam.dev/appRevision"], "");

        let service_doc = &rendered.components[0].traits[0].document;
        assert_eq!(service_doc["spec"]["ports"][0]["port"], 8080);
        assert_eq!(service_doc["metadata"]["labels"]["trait.oam.dev/resource"], "service");
        assert_eq!(service_doc["metadata"]["labels"]["trait.oam.dev/type"], "expose");
    }

    #[test]
    fn patch_cannot_overwrite_provenance_labels() {
        let app = ApplicationSpec::new("shop", "default").with_component(
            ComponentSpec::new("web", "worker", json!({"image": "nginx"}))
                .with_trait("relabel", json!({})),
        );
        let rendered = RenderService::new(Box::new(repository()))
            .render(&app, &context())
            .unwrap();

        let workload = &rendered.components[0].workload;
        let labels = &workload.document["metadata"]["labels"];
        assert_eq!(labels["app.oam.dev/component"], "web");
        assert_eq!(labels["app.oam.dev/name"], "shop");
        assert_eq!(labels["team"], "payments");
        assert!(labels.get("trait.oam.dev/type").is_none());
        assert_eq!(
            ResourceIdentity::from_labels(&workload.document),
            Some(workload.identity.clone())
        );
    }

    #[test]
    fn patch_never_adds_resources() {
        let app = ApplicationSpec::new("shop", "default").with_component(
            ComponentSpec::new("web", "worker", json!({"image": "nginx"}))
                .with_trait("sidecar", json!({"name": "log", "image": "fluentd"})),
        );
        let rendered = RenderService::new(Box::new(repository()))
            .render(&app, &context())
            .unwrap();
        assert_eq!(rendered.resource_count(), 1);
    }

    #[test]
    fn rendering_is_deterministic() {
        let app = ApplicationSpec::new("shop", "default")
            .with_component(
                ComponentSpec::new("web", "worker", json!({"image": "nginx"}))
                    .with_trait("expose", json!({})),
            )
            .with_component(ComponentSpec::new("api", "worker", json!({"image": "api"})));
        let service = RenderService::new(Box::new(repository()));
        let first = service.render(&app, &context()).unwrap();
        let second = service.render(&app, &context()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.components[1].name, "api");
    }

    #[test]
    fn unknown_component_type_is_not_found() {
        let app = ApplicationSpec::new("shop", "prod")
            .with_component(ComponentSpec::new("web", "mystery", json!({})));
        let err = RenderService::new(Box::new(repository()))
            .render(&app, &context())
            .unwrap_err();
        match err {
            DrydockError::Application(ApplicationError::DefinitionNotFound {
                kind,
                name,
                namespace,
            }) => {
                assert_eq!(kind, DefinitionKind::Component);
                assert_eq!(name, "mystery");
                assert_eq!(namespace, "prod");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_trait_type_is_not_found() {
        let app = ApplicationSpec::new("shop", "default").with_component(
            ComponentSpec::new("web", "worker", json!({"image": "nginx"}))
                .with_trait("gateway", json!({})),
        );
        let err = RenderService::new(Box::new(repository()))
            .render(&app, &context())
            .unwrap_err();
        assert!(matches!(
            err,
            DrydockError::Application(ApplicationError::DefinitionNotFound {
                kind: DefinitionKind::Trait,
                ..
            })
        ));
    }

    #[test]
    fn missing_required_property_is_schema_error() {
        let app = ApplicationSpec::new("shop", "default")
            .with_component(ComponentSpec::new("web", "worker", json!({})));
        let err = RenderService::new(Box::new(repository()))
            .render(&app, &context())
            .unwrap_err();
        match err {
            DrydockError::Domain(DomainError::Schema { path, .. }) => {
                assert_eq!(path, "parameter.image")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn definitions_are_resolved_once_per_render() {
        let mut repo = MockDefinitionRepository::new();
        repo.expect_component_definition()
            .times(1)
            .returning(|_, _| Ok(Some(component("worker", WORKER))));
        let app = ApplicationSpec::new("shop", "default")
            .with_component(ComponentSpec::new("a", "worker", json!({"image": "x"})))
            .with_component(ComponentSpec::new("b", "worker", json!({"image": "y"})));
        let rendered = RenderService::new(Box::new(repo))
            .render(&app, &context())
            .unwrap();
        assert_eq!(rendered.resource_count(), 2);
    }

    #[test]
    fn helm_component_cannot_be_rendered() {
        let mut repo = MockDefinitionRepository::new();
        repo.expect_component_definition().returning(|_, _| {
            Ok(Some(ComponentDefinition {
                schematic: Schematic::Helm {
                    chart: "podinfo".into(),
                    version: Some("5.1.4".into()),
                    repository: None,
                },
                ..component("webapp-chart", "")
            }))
        });
        let app = ApplicationSpec::new("shop", "default")
            .with_component(ComponentSpec::new("web", "webapp-chart", json!({})));
        let err = RenderService::new(Box::new(repo))
            .render(&app, &context())
            .unwrap_err();
        assert!(matches!(err, DrydockError::Domain(DomainError::Template { .. })));
    }

    #[test]
    fn same_trait_twice_is_rejected() {
        let app = ApplicationSpec::new("shop", "default").with_component(
            ComponentSpec::new("web", "worker", json!({"image": "nginx"}))
                .with_trait("expose", json!({}))
                .with_trait("expose", json!({"port": 81})),
        );
        assert!(
            RenderService::new(Box::new(repository()))
                .render(&app, &context())
                .is_err()
        );
    }
}
