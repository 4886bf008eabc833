//! Command handlers, one module per subcommand.
//!
//! Handlers own the wiring: they pick adapters from flags and config, call
//! a core service, and hand the result to [`crate::output::OutputManager`].

pub mod completions;
pub mod config;
pub mod dry_run;
pub mod init;
pub mod list;
pub mod live_diff;
pub mod show;

use std::path::PathBuf;

use tracing::debug;

use drydock_adapters::{
    CachedDefinitionRepository, DefinitionLoader, InMemoryDefinitionRepository,
    LocalDefinitionRepository, LocalRevisionStore,
};
use drydock_core::{application::DefinitionRepository, domain::RenderContext};

use crate::{cli::DefinitionArgs, config::AppConfig, error::CliResult};

/// Built-in definitions, overlaid by a definitions directory when one is
/// given on the command line or in the config.
pub(crate) fn definition_repository(
    args: &DefinitionArgs,
    config: &AppConfig,
) -> CliResult<Box<dyn DefinitionRepository>> {
    let builtin = InMemoryDefinitionRepository::with_builtin()?;
    let dir = args
        .definitions
        .clone()
        .or_else(|| config.definitions.dir.clone());

    match dir {
        Some(dir) => {
            debug!(dir = %dir.display(), "Loading definitions from disk");
            let local = LocalDefinitionRepository::new(DefinitionLoader::new(dir))
                .with_fallback(builtin);
            Ok(Box::new(CachedDefinitionRepository::new(local)))
        }
        None => Ok(Box::new(builtin)),
    }
}

/// Namespace definitions resolve in: `--namespace`, then the config.
pub(crate) fn namespace(args: &DefinitionArgs, config: &AppConfig) -> String {
    args.namespace
        .clone()
        .unwrap_or_else(|| config.definitions.namespace.clone())
}

/// Application-wide template context, carrying `[context] config` when set.
pub(crate) fn render_context(app_name: &str, namespace: &str, config: &AppConfig) -> RenderContext {
    let context = RenderContext::new(app_name, namespace);
    match &config.context.config {
        Some(value) => context.with_config(value.clone()),
        None => context,
    }
}

/// Revision store: `--revisions`, then the config.
pub(crate) fn revision_store(flag: Option<PathBuf>, config: &AppConfig) -> LocalRevisionStore {
    let root = flag.unwrap_or_else(|| config.revisions.dir.clone());
    debug!(root = %root.display(), "Using revision store");
    LocalRevisionStore::new(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(definitions: Option<&str>, namespace: Option<&str>) -> DefinitionArgs {
        DefinitionArgs {
            definitions: definitions.map(PathBuf::from),
            namespace: namespace.map(str::to_string),
        }
    }

    #[test]
    fn namespace_flag_wins_over_config() {
        let mut config = AppConfig::default();
        config.definitions.namespace = "staging".into();
        assert_eq!(namespace(&args(None, Some("prod")), &config), "prod");
        assert_eq!(namespace(&args(None, None), &config), "staging");
    }

    #[test]
    fn builtin_repository_resolves_webservice() {
        let repo = definition_repository(&args(None, None), &AppConfig::default()).unwrap();
        assert!(repo
            .component_definition("webservice", "default")
            .unwrap()
            .is_some());
    }

    #[test]
    fn render_context_carries_configured_values() {
        let mut config = AppConfig::default();
        assert!(render_context("shop", "default", &config).config().is_none());

        config.context.config = Some(serde_json::json!({"tier": "gold"}));
        let context = render_context("shop", "prod", &config);
        assert_eq!(context.namespace(), "prod");
        assert_eq!(context.to_value()["config"]["tier"], "gold");
    }

    #[test]
    fn revisions_flag_wins_over_config() {
        let store = revision_store(Some(PathBuf::from("/tmp/revs")), &AppConfig::default());
        assert_eq!(store.root(), std::path::Path::new("/tmp/revs"));
    }
}
