//! Diff Service - compares a candidate application with its applied revision.
//!
//! The applied revision is the baseline. The candidate is rendered with the
//! same renderer used for dry-run, so an unchanged application produces an
//! all-unchanged diff.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    application::{
        ApplicationError,
        ports::{DefinitionRepository, RevisionStore},
        services::RenderService,
    },
    domain::{
        ApplicationManifest, DiffEntry, DomainValidator as validator, RenderContext,
        RenderedApplication, RenderedResource, Revision, diff,
    },
    error::DrydockResult,
};

/// Result of a live-diff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveDiff {
    pub application: String,
    pub namespace: String,
    /// Name of the revision diffed against.
    pub baseline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    pub entries: Vec<DiffEntry>,
}

impl LiveDiff {
    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(DiffEntry::is_change)
    }
}

/// Live-diff and revision recording.
pub struct DiffService {
    renderer: RenderService,
    revisions: Box<dyn RevisionStore>,
}

impl DiffService {
    pub fn new(
        repository: Box<dyn DefinitionRepository>,
        revisions: Box<dyn RevisionStore>,
    ) -> Self {
        Self {
            renderer: RenderService::new(repository),
            revisions,
        }
    }

    /// The renderer candidates go through.
    pub fn renderer(&self) -> &RenderService {
        &self.renderer
    }

    /// Diff `candidate` against the latest applied revision of the same
    /// application.
    #[instrument(
        skip_all,
        fields(application = %candidate.name(), namespace = %candidate.namespace())
    )]
    pub fn live_diff(
        &self,
        candidate: &ApplicationManifest,
        context: &RenderContext,
    ) -> DrydockResult<LiveDiff> {
        let baseline = self.latest(candidate.name(), candidate.namespace())?;
        info!(baseline = %baseline.name, "Diffing against applied revision");

        let entries = self.diff(
            &baseline.application,
            &baseline.resources,
            candidate,
            context,
        )?;
        Ok(LiveDiff {
            application: candidate.name().to_string(),
            namespace: candidate.namespace().to_string(),
            baseline: baseline.name,
            recorded_at: baseline.recorded_at,
            entries,
        })
    }

    /// Diff a candidate against explicitly supplied applied state.
    pub fn diff(
        &self,
        applied: &ApplicationManifest,
        applied_resources: &[RenderedResource],
        candidate: &ApplicationManifest,
        context: &RenderContext,
    ) -> DrydockResult<Vec<DiffEntry>> {
        let rendered = self.renderer.render(&candidate.spec()?, context)?;
        let candidate_resources = rendered.into_resources();
        Ok(diff::diff(
            applied,
            applied_resources,
            candidate,
            &candidate_resources,
        )?)
    }

    /// Store `rendered` as the next revision of `manifest`.
    #[instrument(skip_all, fields(application = %manifest.name()))]
    pub fn record(
        &self,
        manifest: &ApplicationManifest,
        rendered: RenderedApplication,
    ) -> DrydockResult<Revision> {
        let next = self
            .revisions
            .latest(manifest.name(), manifest.namespace())?
            .map_or(1, |latest| latest.number + 1);
        let revision = Revision::new(next, manifest.clone(), rendered.into_resources());
        validator::validate_revision(&revision)?;
        self.revisions.record(&revision)?;
        info!(revision = %revision.name, "Revision recorded");
        Ok(revision)
    }

    fn latest(&self, application: &str, namespace: &str) -> DrydockResult<Revision> {
        self.revisions
            .latest(application, namespace)?
            .ok_or_else(|| {
                ApplicationError::RevisionNotFound {
                    application: application.to_string(),
                    namespace: namespace.to_string(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::ports::{MockDefinitionRepository, MockRevisionStore},
        domain::{
            ChangeKind, ComponentDefinition, DiffScope, ResourceIdentity, SYSTEM_NAMESPACE,
            Schematic,
        },
        error::DrydockError,
    };
    use serde_json::{Value, json};

    const WORKER: &str = r#"
output: {
    kind: "Deployment"
    metadata: name: context.name
    spec: image: parameter.image
}
parameter: image: string
"#;

    fn repository() -> Box<MockDefinitionRepository> {
        let mut repo = MockDefinitionRepository::new();
        repo.expect_component_definition().returning(|_, _| {
            Ok(Some(ComponentDefinition {
                name: "worker".into(),
                namespace: SYSTEM_NAMESPACE.into(),
                description: String::new(),
                workload: None,
                status: None,
                schematic: Schematic::Cue {
                    template: WORKER.into(),
                },
            }))
        });
        Box::new(repo)
    }

    fn manifest(component: &str, image: &str) -> ApplicationManifest {
        ApplicationManifest::from_value(json!({
            "apiVersion": "core.oam.dev/v1beta1",
            "kind": "Application",
            "metadata": {"name": "shop", "namespace": "default"},
            "spec": {"components": [
                {"name": component, "type": "worker", "properties": {"image": image}}
            ]}
        }))
        .unwrap()
    }

    fn rendered_workload(component: &str, image: &str) -> RenderedResource {
        let document: Value = json!({
            "kind": "Deployment",
            "metadata": {
                "name": component,
                "labels": {
                    "app.oam.dev/name": "shop",
                    "app.oam.dev/component": component,
                    "app.oam.dev/appRevision": "",
                    "workload.oam.dev/type": "worker"
                }
            },
            "spec": {"image": image}
        });
        RenderedResource::new(ResourceIdentity::workload(component), document)
    }

    fn context() -> RenderContext {
        RenderContext::new("shop", "default")
    }

    #[test]
    fn unchanged_application_has_no_changes() {
        let baseline = Revision::new(
            1,
            manifest("web", "nginx"),
            vec![rendered_workload("web", "nginx")],
        );
        let mut store = MockRevisionStore::new();
        store
            .expect_latest()
            .returning(move |_, _| Ok(Some(baseline.clone())));

        let service = DiffService::new(repository(), Box::new(store));
        let result = service
            .live_diff(&manifest("web", "nginx"), &context())
            .unwrap();
        assert_eq!(result.baseline, "shop-v1");
        assert!(!result.has_changes());
        assert_eq!(result.entries.len(), 1);
    }

    #[test]
    fn rename_is_remove_plus_add() {
        let baseline = Revision::new(
            1,
            manifest("web", "nginx"),
            vec![rendered_workload("web", "nginx")],
        );
        let mut store = MockRevisionStore::new();
        store
            .expect_latest()
            .returning(move |_, _| Ok(Some(baseline.clone())));

        let service = DiffService::new(repository(), Box::new(store));
        let result = service
            .live_diff(&manifest("frontend", "nginx"), &context())
            .unwrap();
        let summary: Vec<_> = result
            .entries
            .iter()
            .map(|e| (e.scope(), e.change))
            .collect();
        assert_eq!(
            summary,
            vec![
                (DiffScope::Application, ChangeKind::Modified),
                (DiffScope::Component, ChangeKind::Removed),
                (DiffScope::Component, ChangeKind::Added),
            ]
        );
    }

    #[test]
    fn missing_revision_is_an_error_not_an_all_added_diff() {
        let mut store = MockRevisionStore::new();
        store.expect_latest().returning(|_, _| Ok(None));
        let service = DiffService::new(repository(), Box::new(store));
        let err = service
            .live_diff(&manifest("web", "nginx"), &context())
            .unwrap_err();
        assert!(matches!(
            err,
            DrydockError::Application(ApplicationError::RevisionNotFound { .. })
        ));
    }

    #[test]
    fn record_numbers_revisions_sequentially() {
        let previous = Revision::new(4, manifest("web", "nginx"), vec![]);
        let mut store = MockRevisionStore::new();
        store
            .expect_latest()
            .returning(move |_, _| Ok(Some(previous.clone())));
        store
            .expect_record()
            .withf(|revision| revision.number == 5 && revision.name == "shop-v5")
            .times(1)
            .returning(|_| Ok(()));

        let service = DiffService::new(repository(), Box::new(store));
        let rendered = RenderedApplication {
            name: "shop".into(),
            namespace: "default".into(),
            components: vec![],
        };
        let revision = service.record(&manifest("web", "nginx"), rendered).unwrap();
        assert_eq!(revision.number, 5);
    }
}
