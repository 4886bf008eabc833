//! `drydock show`: parameter reference of a component or trait type.

use serde::Serialize;
use tracing::instrument;

use drydock_core::{
    application::{DefinitionReference, ShowService},
    domain::{DefinitionKind, ParameterDecl, Schematic},
};

use crate::{
    cli::ShowArgs,
    commands,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[derive(Serialize)]
struct ShowJson<'a> {
    name: &'a str,
    kind: DefinitionKind,
    namespace: &'a str,
    description: &'a str,
    schematic: &'static str,
    parameters: &'a [ParameterDecl],
}

#[instrument(skip_all, fields(name = %args.name))]
pub fn execute(args: ShowArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let namespace = commands::namespace(&args.source, &config);
    let repository = commands::definition_repository(&args.source, &config)?;
    let reference = ShowService::new(repository).show(&args.name, &namespace)?;

    if output.is_json() {
        let definition = &reference.definition;
        return output.json(&ShowJson {
            name: definition.name(),
            kind: definition.kind(),
            namespace: definition.namespace(),
            description: definition.description(),
            schematic: definition.schematic().kind(),
            parameters: &reference.parameters,
        });
    }

    output.header(&title(&reference))?;
    if !reference.definition.description().is_empty() {
        output.print(reference.definition.description())?;
    }
    output.print("")?;

    match reference.definition.schematic() {
        Schematic::Helm {
            chart,
            version,
            repository,
        } => {
            output.print(&format!("Helm chart: {chart}"))?;
            if let Some(version) = version {
                output.print(&format!("Version:    {version}"))?;
            }
            if let Some(repository) = repository {
                output.print(&format!("Repository: {repository}"))?;
            }
            output.info("Helm definitions document no parameters offline")?;
        }
        Schematic::Cue { .. } => output.parameters(&reference.parameters)?,
    }
    Ok(())
}

fn title(reference: &DefinitionReference) -> String {
    let definition = &reference.definition;
    format!(
        "{} ({}, {})",
        definition.name(),
        definition.kind(),
        definition.namespace()
    )
}
