//! Directory-backed definition repository.

use tracing::debug;

use drydock_core::{
    application::ports::DefinitionRepository,
    domain::{ComponentDefinition, Definition, DefinitionKind, TraitDefinition},
    error::DrydockResult,
};

use super::{as_component, as_trait, resolve};
use crate::definition_loader::DefinitionLoader;

/// Reads definitions from a directory on every lookup.
///
/// Names not found on disk are looked up in the optional fallback (usually
/// the built-ins), so a file on disk shadows a built-in of the same name.
/// Wrap in [`CachedDefinitionRepository`](super::CachedDefinitionRepository)
/// to avoid rescanning within one invocation.
pub struct LocalDefinitionRepository {
    loader: DefinitionLoader,
    fallback: Option<Box<dyn DefinitionRepository>>,
}

impl LocalDefinitionRepository {
    pub fn new(loader: DefinitionLoader) -> Self {
        Self {
            loader,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: impl DefinitionRepository + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    fn lookup(
        &self,
        kind: DefinitionKind,
        name: &str,
        namespace: &str,
    ) -> DrydockResult<Option<Definition>> {
        let definitions = self.loader.load_all()?;
        let found = resolve(&definitions, kind, name, namespace).cloned();
        if found.is_some() {
            debug!(%kind, name, root = %self.loader.root().display(), "resolved from disk");
        }
        Ok(found)
    }
}

impl DefinitionRepository for LocalDefinitionRepository {
    fn component_definition(
        &self,
        name: &str,
        namespace: &str,
    ) -> DrydockResult<Option<ComponentDefinition>> {
        if let Some(found) = self.lookup(DefinitionKind::Component, name, namespace)? {
            return Ok(as_component(&found));
        }
        match &self.fallback {
            Some(fallback) => fallback.component_definition(name, namespace),
            None => Ok(None),
        }
    }

    fn trait_definition(
        &self,
        name: &str,
        namespace: &str,
    ) -> DrydockResult<Option<TraitDefinition>> {
        if let Some(found) = self.lookup(DefinitionKind::Trait, name, namespace)? {
            return Ok(as_trait(&found));
        }
        match &self.fallback {
            Some(fallback) => fallback.trait_definition(name, namespace),
            None => Ok(None),
        }
    }

    /// Definitions on disk, plus fallback definitions they do not shadow.
    fn list(&self) -> DrydockResult<Vec<Definition>> {
        let mut definitions = self.loader.load_all()?;
        if let Some(fallback) = &self.fallback {
            for definition in fallback.list()? {
                let shadowed = definitions.iter().any(|d| {
                    d.kind() == definition.kind()
                        && d.name() == definition.name()
                        && d.namespace() == definition.namespace()
                });
                if !shadowed {
                    definitions.push(definition);
                }
            }
        }
        Ok(definitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryDefinitionRepository;
    use std::fs;
    use tempfile::TempDir;

    const WEBSERVICE_OVERRIDE: &str = r#"
kind: ComponentDefinition
metadata:
  name: webservice
  annotations:
    definition.oam.dev/description: "from disk"
spec:
  schematic:
    cue:
      template: |
        output: kind: "StatefulSet"
"#;

    fn repository(temp: &TempDir) -> LocalDefinitionRepository {
        LocalDefinitionRepository::new(DefinitionLoader::new(temp.path()))
            .with_fallback(InMemoryDefinitionRepository::with_builtin().unwrap())
    }

    #[test]
    fn disk_shadows_fallback() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("webservice.yaml"), WEBSERVICE_OVERRIDE).unwrap();
        let found = repository(&temp)
            .component_definition("webservice", "default")
            .unwrap()
            .unwrap();
        assert_eq!(found.description, "from disk");
    }

    #[test]
    fn missing_names_fall_through() {
        let temp = TempDir::new().unwrap();
        let repository = repository(&temp);
        assert!(
            repository
                .trait_definition("scaler", "default")
                .unwrap()
                .is_some()
        );
        assert!(
            repository
                .trait_definition("nope", "default")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn list_does_not_duplicate_shadowed_names() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("webservice.yaml"), WEBSERVICE_OVERRIDE).unwrap();
        let definitions = repository(&temp).list().unwrap();
        let webservices: Vec<_> = definitions
            .iter()
            .filter(|d| d.name() == "webservice")
            .collect();
        assert_eq!(webservices.len(), 1);
        assert_eq!(webservices[0].description(), "from disk");
    }

    #[test]
    fn files_are_reread_on_each_lookup() {
        let temp = TempDir::new().unwrap();
        let repository = LocalDefinitionRepository::new(DefinitionLoader::new(temp.path()));
        assert!(
            repository
                .component_definition("webservice", "default")
                .unwrap()
                .is_none()
        );
        fs::write(temp.path().join("webservice.yaml"), WEBSERVICE_OVERRIDE).unwrap();
        assert!(
            repository
                .component_definition("webservice", "default")
                .unwrap()
                .is_some()
        );
    }
}
