//! Rendered resources and their identities.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::DomainError;

/// Label keys stamped on every rendered resource.
pub mod labels {
    pub const APP_NAME: &str = "app.oam.dev/name";
    pub const COMPONENT: &str = "app.oam.dev/component";
    pub const APP_REVISION: &str = "app.oam.dev/appRevision";
    pub const WORKLOAD_TYPE: &str = "workload.oam.dev/type";
    pub const TRAIT_TYPE: &str = "trait.oam.dev/type";
    pub const TRAIT_RESOURCE: &str = "trait.oam.dev/resource";
}

/// What a resource is within its component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum ResourceRole {
    Workload,
    Trait {
        #[serde(rename = "traitType")]
        trait_type: String,
        output: String,
    },
}

/// Stable identity used to pair resources across renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceIdentity {
    pub component: String,
    #[serde(flatten)]
    pub role: ResourceRole,
}

impl ResourceIdentity {
    pub fn workload(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            role: ResourceRole::Workload,
        }
    }

    pub fn trait_output(
        component: impl Into<String>,
        trait_type: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            role: ResourceRole::Trait {
                trait_type: trait_type.into(),
                output: output.into(),
            },
        }
    }

    pub fn is_workload(&self) -> bool {
        self.role == ResourceRole::Workload
    }

    /// Recover the identity from the labels of a rendered document.
    pub fn from_labels(document: &Value) -> Option<Self> {
        let labels = document.pointer("/metadata/labels")?;
        let label = |key: &str| labels.get(key).and_then(Value::as_str);
        let component = label(labels::COMPONENT)?;
        match (label(labels::TRAIT_TYPE), label(labels::TRAIT_RESOURCE)) {
            (Some(trait_type), Some(output)) => {
                Some(Self::trait_output(component, trait_type, output))
            }
            _ => Some(Self::workload(component)),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.role {
            ResourceRole::Workload => write!(f, "{}/workload", self.component),
            ResourceRole::Trait { trait_type, output } => {
                write!(f, "{}/{trait_type}/{output}", self.component)
            }
        }
    }
}

/// One rendered document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedResource {
    pub identity: ResourceIdentity,
    pub document: Value,
}

impl RenderedResource {
    pub fn new(identity: ResourceIdentity, document: Value) -> Self {
        Self { identity, document }
    }

    /// Rebuild from a stored document using its labels.
    pub fn from_document(document: Value) -> Result<Self, DomainError> {
        let identity = ResourceIdentity::from_labels(&document).ok_or(
            DomainError::MissingResourceField {
                field: "metadata.labels[app.oam.dev/component]",
            },
        )?;
        Ok(Self { identity, document })
    }

    pub fn kind(&self) -> Option<&str> {
        self.document.get("kind").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.document.pointer("/metadata/name").and_then(Value::as_str)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.document
            .pointer("/metadata/labels")
            .and_then(|labels| labels.get(key))
            .and_then(Value::as_str)
    }

    /// Merge `labels` into `metadata.labels`, creating the path as needed.
    pub fn stamp_labels(document: &mut Value, labels: &[(&str, &str)]) -> Result<(), DomainError> {
        let Some(root) = document.as_object_mut() else {
            return Err(DomainError::InvalidApplication(
                "rendered resource is not a struct".into(),
            ));
        };
        let metadata = root
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(metadata) = metadata.as_object_mut() else {
            return Err(DomainError::MissingResourceField { field: "metadata" });
        };
        let existing = metadata
            .entry("labels")
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(existing) = existing.as_object_mut() else {
            return Err(DomainError::MissingResourceField {
                field: "metadata.labels",
            });
        };
        for (key, value) in labels {
            existing.insert((*key).to_string(), Value::String((*value).to_string()));
        }
        Ok(())
    }

    /// Drop `keys` from `metadata.labels`, if present.
    pub fn remove_labels(document: &mut Value, keys: &[&str]) {
        if let Some(existing) = document
            .pointer_mut("/metadata/labels")
            .and_then(Value::as_object_mut)
        {
            for key in keys {
                existing.remove(*key);
            }
        }
    }

    pub fn to_yaml(&self) -> Result<String, DomainError> {
        serde_yaml::to_string(&self.document).map_err(|e| DomainError::Serialization {
            what: format!("resource {}", self.identity),
            reason: e.to_string(),
        })
    }
}

/// Resources rendered for one component: workload first, then traits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedComponent {
    pub name: String,
    pub workload: RenderedResource,
    pub traits: Vec<RenderedResource>,
}

impl RenderedComponent {
    pub fn resources(&self) -> impl Iterator<Item = &RenderedResource> {
        std::iter::once(&self.workload).chain(self.traits.iter())
    }
}

/// Everything rendered for an application, in component order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedApplication {
    pub name: String,
    pub namespace: String,
    pub components: Vec<RenderedComponent>,
}

impl RenderedApplication {
    pub fn resources(&self) -> impl Iterator<Item = &RenderedResource> {
        self.components.iter().flat_map(RenderedComponent::resources)
    }

    pub fn into_resources(self) -> Vec<RenderedResource> {
        self.components
            .into_iter()
            .flat_map(|c| std::iter::once(c.workload).chain(c.traits))
            .collect()
    }

    pub fn component(&self, name: &str) -> Option<&RenderedComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn resource_count(&self) -> usize {
        self.components.iter().map(|c| 1 + c.traits.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stamp_creates_metadata_and_labels() {
        let mut doc = json!({"kind": "Service"});
        RenderedResource::stamp_labels(&mut doc, &[(labels::COMPONENT, "web")]).unwrap();
        assert_eq!(doc["metadata"]["labels"]["app.oam.dev/component"], "web");
    }

    #[test]
    fn stamp_keeps_existing_labels() {
        let mut doc = json!({"metadata": {"labels": {"app": "web"}}});
        RenderedResource::stamp_labels(&mut doc, &[(labels::APP_NAME, "shop")]).unwrap();
        assert_eq!(
            doc["metadata"]["labels"],
            json!({"app": "web", "app.oam.dev/name": "shop"})
        );
    }

    #[test]
    fn remove_labels_leaves_others() {
        let mut doc = json!({"metadata": {"labels": {"app": "web", "trait.oam.dev/type": "x"}}});
        RenderedResource::remove_labels(&mut doc, &[labels::TRAIT_TYPE]);
        assert_eq!(doc["metadata"]["labels"], json!({"app": "web"}));
    }

    #[test]
    fn stamp_rejects_non_struct() {
        let mut doc = json!("text");
        assert!(RenderedResource::stamp_labels(&mut doc, &[]).is_err());
    }

    #[test]
    fn identity_from_labels() {
        let workload = json!({"metadata": {"labels": {"app.oam.dev/component": "web"}}});
        assert_eq!(
            ResourceIdentity::from_labels(&workload),
            Some(ResourceIdentity::workload("web"))
        );

        let service = json!({"metadata": {"labels": {
            "app.oam.dev/component": "web",
            "trait.oam.dev/type": "ingress",
            "trait.oam.dev/resource": "service"
        }}});
        assert_eq!(
            ResourceIdentity::from_labels(&service),
            Some(ResourceIdentity::trait_output("web", "ingress", "service"))
        );

        assert_eq!(ResourceIdentity::from_labels(&json!({})), None);
    }

    #[test]
    fn identity_display() {
        assert_eq!(ResourceIdentity::workload("web").to_string(), "web/workload");
        assert_eq!(
            ResourceIdentity::trait_output("web", "ingress", "service").to_string(),
            "web/ingress/service"
        );
    }

    #[test]
    fn application_resource_order() {
        let app = RenderedApplication {
            name: "shop".into(),
            namespace: "default".into(),
            components: vec![RenderedComponent {
                name: "web".into(),
                workload: RenderedResource::new(ResourceIdentity::workload("web"), json!({})),
                traits: vec![RenderedResource::new(
                    ResourceIdentity::trait_output("web", "ingress", "service"),
                    json!({}),
                )],
            }],
        };
        let ids: Vec<_> = app.resources().map(|r| r.identity.to_string()).collect();
        assert_eq!(ids, vec!["web/workload", "web/ingress/service"]);
        assert_eq!(app.resource_count(), 2);
    }
}
