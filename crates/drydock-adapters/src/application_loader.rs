//! Reads application manifests from disk.

use std::{fs, path::Path};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use drydock_core::{
    application::ApplicationError, domain::ApplicationManifest, error::DrydockResult,
};

/// Load the application in `path`.
///
/// The file holds YAML (or JSON). When it has several documents, the first
/// one of kind `Application` is used, so a file may bundle an application
/// with the definitions it needs.
#[instrument(fields(path = %path.display()))]
pub fn load_application(path: &Path) -> DrydockResult<ApplicationManifest> {
    let raw = fs::read_to_string(path).map_err(|e| ApplicationError::ApplicationFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let manifest = parse_application(&raw).map_err(|reason| ApplicationError::ApplicationFile {
        path: path.to_path_buf(),
        reason,
    })?;
    debug!(application = %manifest.name(), "Application loaded");
    Ok(manifest)
}

/// Parse the first `Application` document in `source`.
pub fn parse_application(source: &str) -> Result<ApplicationManifest, String> {
    for document in serde_yaml::Deserializer::from_str(source) {
        let value = Value::deserialize(document).map_err(|e| e.to_string())?;
        if value.get("kind").and_then(Value::as_str) == Some("Application") {
            return ApplicationManifest::from_value(value).map_err(|e| e.to_string());
        }
    }
    Err("no document of kind Application".into())
}
