//! Evaluation context handed to templates as `context`.

use serde_json::{Map, Value};

/// Context for template evaluation.
///
/// A **Value Object**: the `for_component` / `with_workload` helpers return
/// new instances, the original is never modified.
///
/// ## Fields exposed to templates
///
/// | Template path          | Source                                      |
/// |------------------------|---------------------------------------------|
/// | `context.name`         | component name                              |
/// | `context.appName`      | application name                            |
/// | `context.appRevision`  | always empty: nothing is deployed           |
/// | `context.namespace`    | target namespace                            |
/// | `context.componentType`| component type                              |
/// | `context.config`       | optional free-form configuration            |
/// | `context.output`       | rendered workload (trait templates only)    |
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderContext {
    app_name: String,
    app_revision: String,
    namespace: String,
    component_name: String,
    component_type: String,
    config: Option<Value>,
    workload: Option<Value>,
}

impl RenderContext {
    pub fn new(app_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Context for one component of the application.
    pub fn for_component(&self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            component_name: name.into(),
            component_type: type_name.into(),
            workload: None,
            ..self.clone()
        }
    }

    /// Context for a trait, which can read the rendered workload.
    pub fn with_workload(&self, workload: Value) -> Self {
        Self {
            workload: Some(workload),
            ..self.clone()
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn app_revision(&self) -> &str {
        &self.app_revision
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    pub fn component_type(&self) -> &str {
        &self.component_type
    }

    pub fn config(&self) -> Option<&Value> {
        self.config.as_ref()
    }

    /// The `context` value seen by templates.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.component_name.clone()));
        map.insert("appName".into(), Value::String(self.app_name.clone()));
        map.insert(
            "appRevision".into(),
            Value::String(self.app_revision.clone()),
        );
        map.insert("namespace".into(), Value::String(self.namespace.clone()));
        map.insert(
            "componentType".into(),
            Value::String(self.component_type.clone()),
        );
        if let Some(config) = &self.config {
            map.insert("config".into(), config.clone());
        }
        if let Some(workload) = &self.workload {
            map.insert("output".into(), workload.clone());
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_value_for_component() {
        let ctx = RenderContext::new("shop", "default").for_component("api", "webservice");
        assert_eq!(
            ctx.to_value(),
            json!({
                "name": "api",
                "appName": "shop",
                "appRevision": "",
                "namespace": "default",
                "componentType": "webservice"
            })
        );
    }

    #[test]
    fn workload_exposed_as_output() {
        let ctx = RenderContext::new("shop", "default")
            .for_component("api", "webservice")
            .with_workload(json!({"kind": "Deployment"}));
        assert_eq!(ctx.to_value()["output"]["kind"], "Deployment");
    }

    #[test]
    fn for_component_drops_previous_workload() {
        let base = RenderContext::new("shop", "default")
            .with_workload(json!({}))
            .with_config(json!({"tier": "gold"}));
        let ctx = base.for_component("db", "worker");
        assert!(ctx.to_value().get("output").is_none());
        assert_eq!(ctx.config(), Some(&json!({"tier": "gold"})));
    }
}
