//! `drydock config`: inspect configuration values.

use crate::{
    cli::ConfigCommands,
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

/// Dispatch to the correct config subcommand.
pub fn execute(cmd: ConfigCommands, config: AppConfig, output: OutputManager) -> CliResult<()> {
    match cmd {
        ConfigCommands::Get { key } => {
            let value = get_config_value(&config, &key)?;
            output.document(&format!("{value}\n"))?;
        }

        ConfigCommands::List => {
            if output.is_json() {
                return output.json(&config);
            }
            output.header("Current Configuration:")?;
            let serialised = toml::to_string_pretty(&config)
                .with_cli_context(|| "Failed to serialise config")?;
            output.document(&serialised)?;
        }

        ConfigCommands::Path => {
            output.document(&format!("{}\n", AppConfig::discover().display()))?;
        }
    }

    Ok(())
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn get_config_value(config: &AppConfig, key: &str) -> CliResult<String> {
    match key {
        "definitions.dir" => Ok(config
            .definitions
            .dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_default()),
        "definitions.namespace" => Ok(config.definitions.namespace.clone()),
        "revisions.dir" => Ok(config.revisions.dir.display().to_string()),
        "output.no_color" => Ok(config.output.no_color.to_string()),
        "output.show_unchanged" => Ok(config.output.show_unchanged.to_string()),
        _ => Err(CliError::ConfigError {
            message: format!("Unknown config key: '{key}'"),
            source: None,
        }),
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn get_known_key() {
        let cfg = AppConfig::default();
        assert_eq!(
            get_config_value(&cfg, "definitions.namespace").unwrap(),
            "default"
        );
    }

    #[test]
    fn get_unset_dir_is_empty() {
        let cfg = AppConfig::default();
        assert_eq!(get_config_value(&cfg, "definitions.dir").unwrap(), "");
    }

    #[test]
    fn get_unknown_key_is_error() {
        let cfg = AppConfig::default();
        assert!(matches!(
            get_config_value(&cfg, "does.not.exist"),
            Err(CliError::ConfigError { .. })
        ));
    }

    #[test]
    fn get_no_color_default() {
        let cfg = AppConfig::default();
        assert_eq!(get_config_value(&cfg, "output.no_color").unwrap(), "false");
    }
}
