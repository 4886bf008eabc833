//! Revision store on the local filesystem.
//!
//! ```text
//! <root>/
//! └── default/                 ← application namespace
//!     ├── shop-v1.yaml
//!     └── shop-v2.yaml         ← latest
//! ```
//!
//! Each file is one [`RevisionRecord`] in YAML.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, instrument};

use drydock_core::{
    application::{ApplicationError, ports::RevisionStore},
    domain::{Revision, RevisionRecord},
    error::{DrydockError, DrydockResult},
};

/// Production revision store writing one YAML file per revision.
#[derive(Debug, Clone)]
pub struct LocalRevisionStore {
    root: PathBuf,
}

impl LocalRevisionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, namespace: &str, revision_name: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{revision_name}.yaml"))
    }

    /// Revision numbers stored for `application` in `namespace`.
    fn numbers(&self, application: &str, namespace: &str) -> DrydockResult<Vec<u64>> {
        let dir = self.root.join(namespace);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(store_error(&dir, e, "read directory")),
        };

        let prefix = format!("{application}-v");
        let mut numbers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| store_error(&dir, e, "read directory entry"))?;
            let file_name = entry.file_name();
            let number = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(".yaml"))
                .and_then(|stem| stem.strip_prefix(&prefix))
                .and_then(|n| n.parse::<u64>().ok());
            if let Some(number) = number {
                numbers.push(number);
            }
        }
        Ok(numbers)
    }
}

impl RevisionStore for LocalRevisionStore {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn latest(&self, application: &str, namespace: &str) -> DrydockResult<Option<Revision>> {
        let Some(number) = self.numbers(application, namespace)?.into_iter().max() else {
            return Ok(None);
        };
        let path = self.path_for(namespace, &Revision::name_for(application, number));
        let raw = fs::read_to_string(&path).map_err(|e| store_error(&path, e, "read revision"))?;
        let record: RevisionRecord =
            serde_yaml::from_str(&raw).map_err(|e| ApplicationError::RevisionStore {
                reason: format!("failed to parse '{}': {e}", path.display()),
            })?;
        debug!(revision = %record.name, "Loaded revision");
        Ok(Some(Revision::from_record(record)?))
    }

    fn record(&self, revision: &Revision) -> DrydockResult<()> {
        let path = self.path_for(revision.application.namespace(), &revision.name);
        if path.exists() {
            return Err(ApplicationError::RevisionStore {
                reason: format!("revision file '{}' already exists", path.display()),
            }
            .into());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| store_error(parent, e, "create directory"))?;
        }
        let yaml = serde_yaml::to_string(&revision.to_record()).map_err(|e| {
            ApplicationError::RevisionStore {
                reason: format!("failed to serialize {}: {e}", revision.name),
            }
        })?;
        fs::write(&path, yaml).map_err(|e| store_error(&path, e, "write revision"))?;
        debug!(path = %path.display(), "Revision written");
        Ok(())
    }
}

fn store_error(path: &Path, e: io::Error, operation: &str) -> DrydockError {
    ApplicationError::RevisionStore {
        reason: format!("Failed to {operation} '{}': {e}", path.display()),
    }
    .into()
}
