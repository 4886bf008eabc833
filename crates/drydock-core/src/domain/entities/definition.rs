//! Component and trait definitions.
//!
//! A definition pairs a type name (`webservice`, `ingress`, ...) with a
//! schematic describing how to render it. Only template schematics can be
//! rendered offline; helm schematics are recognized so they can be shown and
//! reported, but rendering them is an error.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{DomainError, template::CompiledTemplate};

/// Namespace searched when a definition is not found in the requested one.
pub const SYSTEM_NAMESPACE: &str = "vela-system";

pub const DESCRIPTION_ANNOTATION: &str = "definition.oam.dev/description";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DefinitionKind {
    #[serde(rename = "ComponentDefinition")]
    Component,
    #[serde(rename = "TraitDefinition")]
    Trait,
}

impl DefinitionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Trait => "trait",
        }
    }

    pub fn manifest_kind(self) -> &'static str {
        match self {
            Self::Component => "ComponentDefinition",
            Self::Trait => "TraitDefinition",
        }
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a definition renders.
#[derive(Debug, Clone, PartialEq)]
pub enum Schematic {
    /// Template source in the definition language.
    Cue { template: String },
    /// Helm chart reference; documented, never rendered.
    Helm {
        chart: String,
        version: Option<String>,
        repository: Option<String>,
    },
}

impl Schematic {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cue { .. } => "cue",
            Self::Helm { .. } => "helm",
        }
    }

    pub fn template_source(&self) -> Option<&str> {
        match self {
            Self::Cue { template } => Some(template),
            Self::Helm { .. } => None,
        }
    }
}

/// The resource a component renders as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadType {
    pub api_version: String,
    pub kind: String,
}

/// Health and status snippets; carried for display only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_policy: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDefinition {
    pub name: String,
    pub namespace: String,
    pub description: String,
    pub workload: Option<WorkloadType>,
    pub status: Option<StatusPolicy>,
    pub schematic: Schematic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitDefinition {
    pub name: String,
    pub namespace: String,
    pub description: String,
    /// Workload types this trait is meant for; advisory only.
    pub applies_to_workloads: Vec<String>,
    pub pod_disruptive: bool,
    pub status: Option<StatusPolicy>,
    pub schematic: Schematic,
}

impl TraitDefinition {
    /// Whether the trait declares support for a component type.
    ///
    /// An empty list or `*` means any workload.
    pub fn applies_to(&self, component_type: &str, workload: Option<&WorkloadType>) -> bool {
        self.applies_to_workloads.is_empty()
            || self.applies_to_workloads.iter().any(|w| {
                w == "*"
                    || w == component_type
                    || workload.is_some_and(|wl| {
                        w == &wl.kind || *w == format!("{}.{}", wl.kind, wl.api_version)
                    })
            })
    }
}

/// Either kind of definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Component(ComponentDefinition),
    Trait(TraitDefinition),
}

impl Definition {
    pub fn kind(&self) -> DefinitionKind {
        match self {
            Self::Component(_) => DefinitionKind::Component,
            Self::Trait(_) => DefinitionKind::Trait,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Component(d) => &d.name,
            Self::Trait(d) => &d.name,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Self::Component(d) => &d.namespace,
            Self::Trait(d) => &d.namespace,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Component(d) => &d.description,
            Self::Trait(d) => &d.description,
        }
    }

    pub fn schematic(&self) -> &Schematic {
        match self {
            Self::Component(d) => &d.schematic,
            Self::Trait(d) => &d.schematic,
        }
    }

    /// Compile the template schematic.
    pub fn compile(&self) -> Result<CompiledTemplate, DomainError> {
        match self.schematic() {
            Schematic::Cue { template } => CompiledTemplate::compile(self.name(), template),
            Schematic::Helm { chart, .. } => Err(DomainError::Template {
                definition: self.name().to_string(),
                reason: format!("helm schematic (chart '{chart}') cannot be rendered offline"),
            }),
        }
    }

    pub fn summary(&self) -> DefinitionSummary {
        DefinitionSummary {
            kind: self.kind(),
            name: self.name().to_string(),
            namespace: self.namespace().to_string(),
            description: self.description().to_string(),
            schematic: self.schematic().kind(),
        }
    }

    /// Parse a `ComponentDefinition` or `TraitDefinition` document.
    ///
    /// `fallback_namespace` applies when the document has none.
    pub fn from_manifest(document: &Value, fallback_namespace: &str) -> Result<Self, DomainError> {
        let shape: DefinitionShape = serde_json::from_value(document.clone()).map_err(|e| {
            DomainError::InvalidDefinition {
                name: document
                    .pointer("/metadata/name")
                    .and_then(Value::as_str)
                    .unwrap_or("<unnamed>")
                    .to_string(),
                reason: e.to_string(),
            }
        })?;

        let name = shape.metadata.name;
        let invalid = |reason: String| DomainError::InvalidDefinition {
            name: name.clone(),
            reason,
        };
        if name.trim().is_empty() {
            return Err(invalid("metadata.name is empty".into()));
        }

        let namespace = shape
            .metadata
            .namespace
            .unwrap_or_else(|| fallback_namespace.to_string());
        let description = shape
            .metadata
            .annotations
            .get(DESCRIPTION_ANNOTATION)
            .cloned()
            .unwrap_or_default();
        let schematic = shape
            .spec
            .schematic
            .into_schematic()
            .ok_or_else(|| invalid("spec.schematic must contain `cue` or `helm`".into()))?;

        Ok(match shape.kind {
            DefinitionKind::Component => Definition::Component(ComponentDefinition {
                name,
                namespace,
                description,
                workload: shape.spec.workload.and_then(|w| w.definition),
                status: shape.spec.status,
                schematic,
            }),
            DefinitionKind::Trait => Definition::Trait(TraitDefinition {
                name,
                namespace,
                description,
                applies_to_workloads: shape.spec.applies_to_workloads,
                pod_disruptive: shape.spec.pod_disruptive,
                status: shape.spec.status,
                schematic,
            }),
        })
    }
}

/// One line of a definition listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionSummary {
    pub kind: DefinitionKind,
    pub name: String,
    pub namespace: String,
    pub description: String,
    pub schematic: &'static str,
}

// ============================================================================
// Wire shape
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefinitionShape {
    kind: DefinitionKind,
    metadata: DefinitionMeta,
    spec: DefinitionSpecShape,
}

#[derive(Debug, Deserialize)]
struct DefinitionMeta {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    annotations: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionSpecShape {
    #[serde(default)]
    workload: Option<WorkloadShape>,
    #[serde(default)]
    applies_to_workloads: Vec<String>,
    #[serde(default)]
    pod_disruptive: bool,
    #[serde(default)]
    status: Option<StatusPolicy>,
    schematic: SchematicShape,
}

#[derive(Debug, Deserialize)]
struct WorkloadShape {
    #[serde(default)]
    definition: Option<WorkloadType>,
}

#[derive(Debug, Deserialize)]
struct SchematicShape {
    #[serde(default)]
    cue: Option<CueShape>,
    #[serde(default)]
    helm: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CueShape {
    template: String,
}

impl SchematicShape {
    fn into_schematic(self) -> Option<Schematic> {
        if let Some(cue) = self.cue {
            return Some(Schematic::Cue {
                template: cue.template,
            });
        }
        let helm = self.helm?;
        let text = |pointer: &str| {
            helm.pointer(pointer)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Some(Schematic::Helm {
            chart: text("/release/chart/spec/chart").unwrap_or_default(),
            version: text("/release/chart/spec/version"),
            repository: text("/repository/url"),
        })
    }
}
