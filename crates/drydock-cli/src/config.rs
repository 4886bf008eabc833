//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns config; the core crate never sees it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (applied at the call-site, not here)
//! 2. Environment variables: `DRYDOCK__REVISIONS__DIR=/tmp/revs`
//! 3. Config file: `--config`, else `./drydock.toml`, else the platform
//!    config directory
//! 4. Built-in defaults (always present)

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use drydock_core::domain::DEFAULT_NAMESPACE;

/// Name of the project-local config file.
pub const LOCAL_CONFIG_FILE: &str = "drydock.toml";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub definitions: DefinitionsConfig,
    pub revisions: RevisionsConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub context: ContextConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionsConfig {
    /// Extra definitions loaded on top of the built-ins.
    pub dir: Option<PathBuf>,
    /// Namespace definitions resolve in when the application names none.
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionsConfig {
    pub dir: PathBuf,
}

/// Values handed to every template evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Exposed to templates as `context.config`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub no_color: bool,
    /// Show unchanged resources in live-diff.
    pub show_unchanged: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            definitions: DefinitionsConfig {
                dir: None,
                namespace: DEFAULT_NAMESPACE.into(),
            },
            revisions: RevisionsConfig {
                dir: default_revisions_dir(),
            },
            output: OutputConfig {
                no_color: false,
                show_unchanged: false,
            },
            context: ContextConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then the config file, then environment.
    ///
    /// An explicit `config_file` must exist; the implicit locations are
    /// optional.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .context("Failed to serialise default configuration")?;

        let file = match config_file {
            Some(path) => File::from(path.as_path()).required(true),
            None => File::from(Self::discover().as_path()).required(false),
        };

        Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(Environment::with_prefix("DRYDOCK").separator("__"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// The config file used when `--config` is absent.
    pub fn discover() -> PathBuf {
        let local = Path::new(LOCAL_CONFIG_FILE);
        if local.exists() {
            local.to_path_buf()
        } else {
            Self::config_path()
        }
    }

    /// Path to the global configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `drydock.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "drydock", "drydock")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE))
    }
}

fn default_revisions_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "drydock", "drydock")
        .map(|d| d.data_dir().join("revisions"))
        .unwrap_or_else(|| PathBuf::from(".drydock/revisions"))
}
