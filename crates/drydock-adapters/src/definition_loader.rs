//! Filesystem-based definition loader.
//!
//! Discovers `ComponentDefinition` and `TraitDefinition` manifests in a
//! directory tree (or a single file) and parses them into domain
//! [`Definition`]s.
//!
//! # Layout
//!
//! ```text
//! definitions/
//! ├── webservice.yaml        ← one definition
//! ├── traits.yaml            ← several, separated by `---`
//! └── team-a/
//!     └── gateway.yml
//! ```
//!
//! Every `.yaml`/`.yml` file is read. Documents of any other kind are ignored,
//! so a directory may also hold applications. A definition without
//! `metadata.namespace` lands in the system namespace and is visible from
//! every application namespace.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use drydock_core::{
    application::ApplicationError,
    domain::{Definition, SYSTEM_NAMESPACE},
    error::DrydockResult,
};

const DEFINITION_KINDS: [&str; 2] = ["ComponentDefinition", "TraitDefinition"];

/// Loads [`Definition`]s from manifests on disk.
///
/// A file that is not valid YAML, or a definition document that does not
/// parse, emits a `WARN` log and is skipped. It does not prevent other
/// definitions from loading.
///
/// # Example
///
/// ```no_run
/// use drydock_adapters::definition_loader::DefinitionLoader;
///
/// let definitions = DefinitionLoader::new("./definitions").load_all()?;
/// println!("Loaded {} definitions", definitions.len());
/// # Ok::<(), drydock_core::error::DrydockError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DefinitionLoader {
    root: PathBuf,
}

impl DefinitionLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every valid definition under the root, in path order.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Repository`] if the root does not exist
    /// or cannot be walked.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn load_all(&self) -> DrydockResult<Vec<Definition>> {
        if !self.root.exists() {
            return Err(ApplicationError::Repository {
                reason: format!("definitions path not found: {}", self.root.display()),
            }
            .into());
        }

        let mut definitions = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| ApplicationError::Repository {
                reason: format!("failed to walk '{}': {e}", self.root.display()),
            })?;
            if !entry.file_type().is_file() || !is_yaml(entry.path()) {
                continue;
            }
            match load_file(entry.path()) {
                Ok(found) => definitions.extend(found),
                Err(reason) => {
                    warn!(
                        file = %entry.path().display(),
                        error = %reason,
                        "skipping unreadable definition file"
                    );
                }
            }
        }

        debug!(count = definitions.len(), "finished loading definitions");
        Ok(definitions)
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

/// Parse every definition document in one file.
///
/// Only an unreadable or non-YAML file is an error; a bad definition
/// document is logged and skipped.
fn load_file(path: &Path) -> Result<Vec<Definition>, String> {
    let raw = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let mut definitions = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&raw) {
        let value = Value::deserialize(document).map_err(|e| e.to_string())?;
        let kind = value.get("kind").and_then(Value::as_str).unwrap_or_default();
        if !DEFINITION_KINDS.contains(&kind) {
            continue;
        }
        match Definition::from_manifest(&value, SYSTEM_NAMESPACE) {
            Ok(definition) => {
                debug!(kind = %definition.kind(), name = %definition.name(), "loaded definition");
                definitions.push(definition);
            }
            Err(e) => warn!(file = %path.display(), error = %e, "skipping invalid definition"),
        }
    }
    Ok(definitions)
}
