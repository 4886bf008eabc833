//! Applied revisions: the last-known state live-diff compares against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    DomainError,
    entities::{application::ApplicationManifest, resource::RenderedResource},
};

/// A persisted application revision.
///
/// Stored as the application document plus the rendered resource documents;
/// identities are recovered from resource labels on load.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    pub name: String,
    pub number: u64,
    pub recorded_at: Option<DateTime<Utc>>,
    pub application: ApplicationManifest,
    pub resources: Vec<RenderedResource>,
}

/// Serialized form of a [`Revision`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub name: String,
    pub number: u64,
    #[serde(default, rename = "recordedAt", skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    pub application: Value,
    #[serde(default)]
    pub resources: Vec<Value>,
}

impl Revision {
    /// Revision name for an application: `<app>-v<number>`.
    pub fn name_for(application: &str, number: u64) -> String {
        format!("{application}-v{number}")
    }

    pub fn new(
        number: u64,
        application: ApplicationManifest,
        resources: Vec<RenderedResource>,
    ) -> Self {
        Self {
            name: Self::name_for(application.name(), number),
            number,
            recorded_at: Some(Utc::now()),
            application,
            resources,
        }
    }

    pub fn to_record(&self) -> RevisionRecord {
        RevisionRecord {
            name: self.name.clone(),
            number: self.number,
            recorded_at: self.recorded_at,
            application: self.application.document().clone(),
            resources: self.resources.iter().map(|r| r.document.clone()).collect(),
        }
    }

    pub fn from_record(record: RevisionRecord) -> Result<Self, DomainError> {
        let application = ApplicationManifest::from_value(record.application)?;
        let resources = record
            .resources
            .into_iter()
            .map(RenderedResource::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: record.name,
            number: record.number,
            recorded_at: record.recorded_at,
            application,
            resources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::resource::ResourceIdentity;
    use serde_json::json;

    #[test]
    fn record_round_trip_recovers_identities() {
        let app = ApplicationManifest::from_value(json!({
            "kind": "Application",
            "metadata": {"name": "shop"},
            "spec": {"components": []}
        }))
        .unwrap();
        let resource = RenderedResource::new(
            ResourceIdentity::trait_output("web", "ingress", "service"),
            json!({"kind": "Service", "metadata": {"labels": {
                "app.oam.dev/component": "web",
                "trait.oam.dev/type": "ingress",
                "trait.oam.dev/resource": "service"
            }}}),
        );
        let revision = Revision::new(3, app, vec![resource]);
        assert_eq!(revision.name, "shop-v3");

        let restored = Revision::from_record(revision.to_record()).unwrap();
        assert_eq!(restored, revision);
    }

    #[test]
    fn unlabeled_resource_is_rejected() {
        let record = RevisionRecord {
            name: "shop-v1".into(),
            number: 1,
            recorded_at: None,
            application: json!({"metadata": {"name": "shop"}}),
            resources: vec![json!({"kind": "Service"})],
        };
        assert!(Revision::from_record(record).is_err());
    }
}
