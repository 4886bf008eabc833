//! Definition repositories.
//!
//! All of them resolve a name in the requested namespace first and then in
//! the system namespace.

mod cached;
mod local;
mod memory;

pub use cached::CachedDefinitionRepository;
pub use local::LocalDefinitionRepository;
pub use memory::InMemoryDefinitionRepository;

use drydock_core::domain::{
    ComponentDefinition, Definition, DefinitionKind, SYSTEM_NAMESPACE, TraitDefinition,
};

/// Find `name` of `kind` in `namespace`, falling back to the system namespace.
pub(crate) fn resolve<'a>(
    definitions: impl IntoIterator<Item = &'a Definition> + Clone,
    kind: DefinitionKind,
    name: &str,
    namespace: &str,
) -> Option<&'a Definition> {
    let find = |ns: &str| {
        definitions
            .clone()
            .into_iter()
            .find(|d| d.kind() == kind && d.name() == name && d.namespace() == ns)
    };
    find(namespace).or_else(|| find(SYSTEM_NAMESPACE))
}

pub(crate) fn as_component(definition: &Definition) -> Option<ComponentDefinition> {
    match definition {
        Definition::Component(component) => Some(component.clone()),
        Definition::Trait(_) => None,
    }
}

pub(crate) fn as_trait(definition: &Definition) -> Option<TraitDefinition> {
    match definition {
        Definition::Trait(trait_definition) => Some(trait_definition.clone()),
        Definition::Component(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drydock_core::domain::Schematic;

    fn component(name: &str, namespace: &str, description: &str) -> Definition {
        Definition::Component(ComponentDefinition {
            name: name.into(),
            namespace: namespace.into(),
            description: description.into(),
            workload: None,
            status: None,
            schematic: Schematic::Cue {
                template: "output: {}".into(),
            },
        })
    }

    #[test]
    fn namespace_shadows_system_namespace() {
        let definitions = vec![
            component("web", SYSTEM_NAMESPACE, "system"),
            component("web", "prod", "prod"),
        ];
        let found = resolve(&definitions, DefinitionKind::Component, "web", "prod").unwrap();
        assert_eq!(found.description(), "prod");
    }

    #[test]
    fn falls_back_to_system_namespace() {
        let definitions = vec![component("web", SYSTEM_NAMESPACE, "system")];
        let found = resolve(&definitions, DefinitionKind::Component, "web", "prod").unwrap();
        assert_eq!(found.description(), "system");
    }

    #[test]
    fn other_namespaces_are_invisible() {
        let definitions = vec![component("web", "staging", "staging")];
        assert!(resolve(&definitions, DefinitionKind::Component, "web", "prod").is_none());
        assert!(resolve(&definitions, DefinitionKind::Trait, "web", "staging").is_none());
    }
}
