//! Application model: components with typed properties and attached traits.
//!
//! Two views of the same thing:
//!
//! - [`ApplicationManifest`] is the document as written (or as persisted in a
//!   revision), kept verbatim so it can be diffed field for field.
//! - [`ApplicationSpec`] is the validated, typed projection the renderer uses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainError;

pub const DEFAULT_NAMESPACE: &str = "default";
pub const APPLICATION_API_VERSION: &str = "core.oam.dev/v1beta1";
pub const APPLICATION_KIND: &str = "Application";

/// Validated application.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationSpec {
    pub name: String,
    pub namespace: String,
    pub components: Vec<ComponentSpec>,
}

/// One component: a workload of a given type plus its traits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "empty_properties")]
    pub properties: Value,
    #[serde(default)]
    pub traits: Vec<TraitSpec>,
}

/// A trait attached to a component, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "empty_properties")]
    pub properties: Value,
}

fn empty_properties() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Deserialize)]
struct ManifestShape {
    #[serde(default)]
    metadata: MetadataShape,
    #[serde(default)]
    spec: SpecShape,
}

#[derive(Debug, Default, Deserialize)]
struct MetadataShape {
    name: Option<String>,
    namespace: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SpecShape {
    #[serde(default)]
    components: Vec<ComponentSpec>,
}

impl ApplicationSpec {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            components: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: ComponentSpec) -> Self {
        self.components.push(component);
        self
    }

    pub fn component(&self, name: &str) -> Option<&ComponentSpec> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Enforce application invariants: a name, and unique component names.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidApplication(
                "metadata.name is required".into(),
            ));
        }
        for (i, component) in self.components.iter().enumerate() {
            if component.name.trim().is_empty() {
                return Err(DomainError::InvalidApplication(format!(
                    "component #{} has no name",
                    i + 1
                )));
            }
            if component.type_name.trim().is_empty() {
                return Err(DomainError::InvalidApplication(format!(
                    "component '{}' has no type",
                    component.name
                )));
            }
            if self.components[..i].iter().any(|c| c.name == component.name) {
                return Err(DomainError::DuplicateComponent {
                    application: self.name.clone(),
                    component: component.name.clone(),
                });
            }
            if let Some(t) = component.traits.iter().find(|t| t.type_name.trim().is_empty()) {
                return Err(DomainError::InvalidApplication(format!(
                    "a trait of component '{}' has no type (properties: {})",
                    component.name, t.properties
                )));
            }
        }
        Ok(())
    }
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, properties: Value) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            properties,
            traits: Vec::new(),
        }
    }

    pub fn with_trait(mut self, type_name: impl Into<String>, properties: Value) -> Self {
        self.traits.push(TraitSpec {
            type_name: type_name.into(),
            properties,
        });
        self
    }
}

/// An application document kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationManifest {
    document: Value,
}

impl ApplicationManifest {
    /// Wrap a parsed document, checking it describes an application.
    pub fn from_value(document: Value) -> Result<Self, DomainError> {
        if !document.is_object() {
            return Err(DomainError::InvalidApplication(
                "manifest must be a mapping".into(),
            ));
        }
        if let Some(kind) = document.get("kind").and_then(Value::as_str) {
            if kind != APPLICATION_KIND {
                return Err(DomainError::InvalidApplication(format!(
                    "expected kind {APPLICATION_KIND}, found {kind}"
                )));
            }
        }
        let manifest = Self { document };
        manifest.spec()?;
        Ok(manifest)
    }

    /// Build the canonical manifest for a typed application.
    pub fn from_spec(spec: &ApplicationSpec) -> Result<Self, DomainError> {
        let components = serde_json::to_value(&spec.components).map_err(|e| {
            DomainError::Serialization {
                what: "application components".into(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            document: serde_json::json!({
                "apiVersion": APPLICATION_API_VERSION,
                "kind": APPLICATION_KIND,
                "metadata": {"name": spec.name, "namespace": spec.namespace},
                "spec": {"components": components},
            }),
        })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn into_document(self) -> Value {
        self.document
    }

    pub fn name(&self) -> &str {
        self.document
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.document
            .pointer("/metadata/namespace")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn status(&self) -> Option<&Value> {
        self.document.get("status")
    }

    /// Set the namespace, unless the document already names one.
    pub fn with_default_namespace(mut self, namespace: &str) -> Self {
        if self.document.pointer("/metadata/namespace").is_none() {
            if let Some(metadata) = self
                .document
                .get_mut("metadata")
                .and_then(Value::as_object_mut)
            {
                metadata.insert("namespace".into(), Value::String(namespace.to_string()));
            }
        }
        self
    }

    /// Copy of this manifest carrying `other`'s status block.
    pub fn with_status_of(&self, other: &ApplicationManifest) -> Self {
        let mut document = self.document.clone();
        if let Some(fields) = document.as_object_mut() {
            match other.status() {
                Some(status) => {
                    fields.insert("status".into(), status.clone());
                }
                None => {
                    fields.remove("status");
                }
            }
        }
        Self { document }
    }

    /// Typed, validated view of the document.
    pub fn spec(&self) -> Result<ApplicationSpec, DomainError> {
        let shape: ManifestShape = serde_json::from_value(self.document.clone())
            .map_err(|e| DomainError::InvalidApplication(e.to_string()))?;
        let spec = ApplicationSpec {
            name: shape.metadata.name.unwrap_or_default(),
            namespace: shape
                .metadata
                .namespace
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            components: shape.spec.components,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn to_yaml(&self) -> Result<String, DomainError> {
        serde_yaml::to_string(&self.document).map_err(|e| DomainError::Serialization {
            what: format!("application '{}'", self.name()),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest() -> Value {
        json!({
            "apiVersion": "core.oam.dev/v1beta1",
            "kind": "Application",
            "metadata": {"name": "test-vela-app"},
            "spec": {"components": [{
                "name": "express-server",
                "type": "webservice",
                "properties": {"image": "crccheck/hello-world", "port": 8000},
                "traits": [{"type": "ingress", "properties": {"domain": "testsvc.example.com"}}]
            }]}
        })
    }

    #[test]
    fn parses_components_and_traits() {
        let app = ApplicationManifest::from_value(manifest()).unwrap();
        let spec = app.spec().unwrap();
        assert_eq!(spec.name, "test-vela-app");
        assert_eq!(spec.namespace, "default");
        assert_eq!(spec.components.len(), 1);
        let component = &spec.components[0];
        assert_eq!(component.type_name, "webservice");
        assert_eq!(component.properties["port"], 8000);
        assert_eq!(component.traits[0].type_name, "ingress");
    }

    #[test]
    fn missing_properties_default_to_empty_struct() {
        let mut doc = manifest();
        doc["spec"]["components"][0]
            .as_object_mut()
            .unwrap()
            .remove("properties");
        let spec = ApplicationManifest::from_value(doc).unwrap().spec().unwrap();
        assert_eq!(spec.components[0].properties, json!({}));
    }

    #[test]
    fn rejects_duplicate_component_names() {
        let mut doc = manifest();
        let first = doc["spec"]["components"][0].clone();
        doc["spec"]["components"].as_array_mut().unwrap().push(first);
        let err = ApplicationManifest::from_value(doc).unwrap_err();
        assert!(matches!(err, DomainError::DuplicateComponent { ref component, .. } if component == "express-server"));
    }

    #[test]
    fn rejects_missing_name() {
        let mut doc = manifest();
        doc["metadata"] = json!({});
        assert!(ApplicationManifest::from_value(doc).is_err());
    }

    #[test]
    fn rejects_other_kinds() {
        let mut doc = manifest();
        doc["kind"] = json!("Deployment");
        assert!(ApplicationManifest::from_value(doc).is_err());
    }

    #[test]
    fn status_is_carried_over() {
        let mut live = manifest();
        live["status"] = json!({"status": "running"});
        let live = ApplicationManifest::from_value(live).unwrap();
        let candidate = ApplicationManifest::from_value(manifest()).unwrap();

        let carried = candidate.with_status_of(&live);
        assert_eq!(carried.status(), Some(&json!({"status": "running"})));
        assert!(candidate.status().is_none());
    }

    #[test]
    fn default_namespace_only_fills_gaps() {
        let app = ApplicationManifest::from_value(manifest())
            .unwrap()
            .with_default_namespace("prod");
        assert_eq!(app.namespace(), "prod");

        let mut doc = manifest();
        doc["metadata"]["namespace"] = json!("staging");
        let app = ApplicationManifest::from_value(doc)
            .unwrap()
            .with_default_namespace("prod");
        assert_eq!(app.namespace(), "staging");
    }

    #[test]
    fn from_spec_round_trips_through_spec() {
        let spec = ApplicationSpec::new("shop", "default").with_component(
            ComponentSpec::new("api", "webservice", json!({"image": "nginx"}))
                .with_trait("scaler", json!({"replicas": 2})),
        );
        let manifest = ApplicationManifest::from_spec(&spec).unwrap();
        assert_eq!(manifest.spec().unwrap(), spec);
    }
}
