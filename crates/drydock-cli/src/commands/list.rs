//! `drydock list`: available component and trait definitions.

use tracing::instrument;

use drydock_core::{
    application::ShowService,
    domain::{DefinitionKind, SYSTEM_NAMESPACE},
};

use crate::{
    cli::{KindFilter, ListArgs},
    commands,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[instrument(skip_all)]
pub fn execute(args: ListArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let repository = commands::definition_repository(&args.source, &config)?;
    let mut summaries = ShowService::new(repository).list()?;

    if let Some(filter) = args.kind {
        let kind = match filter {
            KindFilter::Component => DefinitionKind::Component,
            KindFilter::Trait => DefinitionKind::Trait,
        };
        summaries.retain(|s| s.kind == kind);
    }
    // Only definitions visible from the requested namespace.
    if let Some(namespace) = &args.source.namespace {
        summaries.retain(|s| s.namespace == *namespace || s.namespace == SYSTEM_NAMESPACE);
    }

    if output.is_json() {
        return output.json(&summaries);
    }
    output.definitions(&summaries)?;
    Ok(())
}
