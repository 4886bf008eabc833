//! Structural comparison of an applied revision with a candidate render.
//!
//! Resources are paired by [`ResourceIdentity`], never by position, so
//! reordering components or traits does not show up as churn. Output order:
//!
//! 1. the application itself, only if it changed
//! 2. components in the order of the applied revision; within a component
//!    the workload, then trait resources, then resources new to it
//! 3. components that only exist in the candidate

pub mod lines;

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub use lines::{DiffLine, LineChange, diff_lines};

use crate::domain::{
    DomainError,
    entities::{
        application::ApplicationManifest,
        resource::{RenderedResource, ResourceIdentity},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiffScope {
    Application,
    Component,
    TraitResource,
}

/// What an entry describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DiffSubject {
    Application { application: String },
    Resource(ResourceIdentity),
}

/// One compared object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    pub subject: DiffSubject,
    pub change: ChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>,
    pub lines: Vec<DiffLine>,
}

impl DiffEntry {
    pub fn scope(&self) -> DiffScope {
        match &self.subject {
            DiffSubject::Application { .. } => DiffScope::Application,
            DiffSubject::Resource(id) if id.is_workload() => DiffScope::Component,
            DiffSubject::Resource(_) => DiffScope::TraitResource,
        }
    }

    pub fn identity(&self) -> Option<&ResourceIdentity> {
        match &self.subject {
            DiffSubject::Resource(id) => Some(id),
            DiffSubject::Application { .. } => None,
        }
    }

    pub fn is_change(&self) -> bool {
        self.change != ChangeKind::Unchanged
    }

    fn compare(
        subject: DiffSubject,
        old: Option<&Value>,
        new: Option<&Value>,
    ) -> Result<Self, DomainError> {
        let (change, lines) = match (old, new) {
            (Some(old), Some(new)) if old == new => {
                (ChangeKind::Unchanged, lines::uniform(&to_yaml(old)?, LineChange::Unchanged))
            }
            (Some(old), Some(new)) => (
                ChangeKind::Modified,
                diff_lines(&to_yaml(old)?, &to_yaml(new)?),
            ),
            (Some(old), None) => (
                ChangeKind::Removed,
                lines::uniform(&to_yaml(old)?, LineChange::Removed),
            ),
            (None, Some(new)) => (
                ChangeKind::Added,
                lines::uniform(&to_yaml(new)?, LineChange::Added),
            ),
            (None, None) => (ChangeKind::Unchanged, Vec::new()),
        };
        Ok(Self {
            subject,
            change,
            old: old.cloned(),
            new: new.cloned(),
            lines,
        })
    }
}

fn to_yaml(value: &Value) -> Result<String, DomainError> {
    serde_yaml::to_string(value).map_err(|e| DomainError::Serialization {
        what: "diff document".into(),
        reason: e.to_string(),
    })
}

/// Compare the application objects; `None` when they are equal.
///
/// The candidate takes over the applied status block so that runtime status
/// never shows up as a change.
pub fn diff_application(
    applied: &ApplicationManifest,
    candidate: &ApplicationManifest,
) -> Result<Option<DiffEntry>, DomainError> {
    let candidate = candidate.with_status_of(applied);
    if applied.document() == candidate.document() {
        return Ok(None);
    }
    DiffEntry::compare(
        DiffSubject::Application {
            application: applied.name().to_string(),
        },
        Some(applied.document()),
        Some(candidate.document()),
    )
    .map(Some)
}

/// Pair resources by identity and compare each pair.
pub fn diff_resources(
    applied: &[RenderedResource],
    candidate: &[RenderedResource],
) -> Result<Vec<DiffEntry>, DomainError> {
    let old_by_id: HashMap<&ResourceIdentity, &Value> = applied
        .iter()
        .map(|r| (&r.identity, &r.document))
        .collect();
    let new_by_id: HashMap<&ResourceIdentity, &Value> = candidate
        .iter()
        .map(|r| (&r.identity, &r.document))
        .collect();

    let old_components = component_order(applied);
    let new_components = component_order(candidate);

    let mut order: Vec<&ResourceIdentity> = Vec::new();
    for component in &old_components {
        let in_component = |r: &&RenderedResource| &r.identity.component == component;
        for resource in applied.iter().filter(in_component) {
            push_unique(&mut order, &resource.identity);
        }
        for resource in candidate.iter().filter(in_component) {
            push_unique(&mut order, &resource.identity);
        }
    }
    for component in new_components.iter().filter(|c| !old_components.contains(c)) {
        for resource in candidate
            .iter()
            .filter(|r| &r.identity.component == component)
        {
            push_unique(&mut order, &resource.identity);
        }
    }

    let entries = order
        .into_iter()
        .map(|id| {
            DiffEntry::compare(
                DiffSubject::Resource(id.clone()),
                old_by_id.get(id).copied(),
                new_by_id.get(id).copied(),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        compared = entries.len(),
        changed = entries.iter().filter(|e| e.is_change()).count(),
        "resources compared"
    );
    Ok(entries)
}

/// Full comparison: application entry (if changed) followed by resources.
pub fn diff(
    applied: &ApplicationManifest,
    applied_resources: &[RenderedResource],
    candidate: &ApplicationManifest,
    candidate_resources: &[RenderedResource],
) -> Result<Vec<DiffEntry>, DomainError> {
    let mut entries = Vec::new();
    if let Some(app) = diff_application(applied, candidate)? {
        entries.push(app);
    }
    entries.extend(diff_resources(applied_resources, candidate_resources)?);
    Ok(entries)
}

fn component_order(resources: &[RenderedResource]) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    for resource in resources {
        if !order.contains(&resource.identity.component) {
            order.push(resource.identity.component.clone());
        }
    }
    order
}

fn push_unique<'a>(order: &mut Vec<&'a ResourceIdentity>, id: &'a ResourceIdentity) {
    if !order.contains(&id) {
        order.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn workload(component: &str, image: &str) -> RenderedResource {
        RenderedResource::new(
            ResourceIdentity::workload(component),
            json!({"kind": "Deployment", "metadata": {"name": component}, "image": image}),
        )
    }

    fn trait_res(component: &str, output: &str, port: u16) -> RenderedResource {
        RenderedResource::new(
            ResourceIdentity::trait_output(component, "ingress", output),
            json!({"kind": output, "port": port}),
        )
    }

    fn app(doc: Value) -> ApplicationManifest {
        ApplicationManifest::from_value(doc).unwrap()
    }

    fn app_doc(image: &str) -> Value {
        json!({
            "kind": "Application",
            "metadata": {"name": "shop"},
            "spec": {"components": [{"name": "web", "type": "webservice", "properties": {"image": image}}]}
        })
    }

    #[test]
    fn identical_renders_are_unchanged() {
        let old = vec![workload("web", "nginx"), trait_res("web", "service", 80)];
        let entries = diff_resources(&old, &old.clone()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.change == ChangeKind::Unchanged));
    }

    #[test]
    fn reordering_is_not_a_change() {
        let old = vec![
            workload("web", "nginx"),
            trait_res("web", "service", 80),
            trait_res("web", "ingress", 80),
        ];
        let new = vec![
            workload("web", "nginx"),
            trait_res("web", "ingress", 80),
            trait_res("web", "service", 80),
        ];
        let entries = diff_resources(&old, &new).unwrap();
        assert!(entries.iter().all(|e| !e.is_change()));
    }

    #[test]
    fn classifies_added_removed_modified() {
        let old = vec![
            workload("web", "nginx"),
            trait_res("web", "service", 80),
            workload("db", "postgres"),
        ];
        let new = vec![
            workload("web", "nginx:2"),
            trait_res("web", "ingress", 80),
            workload("cache", "redis"),
        ];
        let entries = diff_resources(&old, &new).unwrap();
        let summary: Vec<_> = entries
            .iter()
            .map(|e| (e.identity().unwrap().to_string(), e.change))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("web/workload".to_string(), ChangeKind::Modified),
                ("web/ingress/service".to_string(), ChangeKind::Removed),
                ("web/ingress/ingress".to_string(), ChangeKind::Added),
                ("db/workload".to_string(), ChangeKind::Removed),
                ("cache/workload".to_string(), ChangeKind::Added),
            ]
        );
    }

    #[test]
    fn modified_entry_carries_line_diff() {
        let entries =
            diff_resources(&[workload("web", "nginx")], &[workload("web", "httpd")]).unwrap();
        let changed: Vec<_> = entries[0]
            .lines
            .iter()
            .filter(|l| l.change != LineChange::Unchanged)
            .map(|l| (l.change, l.text.as_str()))
            .collect();
        assert_eq!(
            changed,
            vec![
                (LineChange::Removed, "image: nginx"),
                (LineChange::Added, "image: httpd")
            ]
        );
    }

    #[test]
    fn scope_follows_identity() {
        let entries = diff_resources(
            &[workload("web", "a"), trait_res("web", "service", 1)],
            &[workload("web", "a"), trait_res("web", "service", 1)],
        )
        .unwrap();
        assert_eq!(entries[0].scope(), DiffScope::Component);
        assert_eq!(entries[1].scope(), DiffScope::TraitResource);
    }

    #[test]
    fn unchanged_application_is_omitted() {
        let applied = app(app_doc("nginx"));
        let candidate = app(app_doc("nginx"));
        assert!(diff_application(&applied, &candidate).unwrap().is_none());
    }

    #[test]
    fn status_does_not_count_as_change() {
        let mut live = app_doc("nginx");
        live["status"] = json!({"phase": "running"});
        let entry = diff_application(&app(live), &app(app_doc("nginx"))).unwrap();
        assert!(entry.is_none());
    }

    #[test]
    fn changed_application_is_first() {
        let entries = diff(
            &app(app_doc("nginx")),
            &[workload("web", "nginx")],
            &app(app_doc("httpd")),
            &[workload("web", "httpd")],
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].scope(), DiffScope::Application);
        assert_eq!(entries[0].change, ChangeKind::Modified);
        assert_eq!(entries[1].scope(), DiffScope::Component);
    }
}
