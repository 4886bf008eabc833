//! `drydock dry-run`: render an application without applying it.

use serde::Serialize;
use tracing::{info, instrument};

use drydock_adapters::load_application;
use drydock_core::{
    application::{DiffService, RenderService, report},
    domain::RenderedApplication,
};

use crate::{
    cli::DryRunArgs,
    commands,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[derive(Serialize)]
struct DryRunJson<'a> {
    application: &'a str,
    namespace: &'a str,
    components: Vec<ComponentJson<'a>>,
}

#[derive(Serialize)]
struct ComponentJson<'a> {
    name: &'a str,
    resources: Vec<&'a serde_json::Value>,
}

#[instrument(skip_all, fields(file = %args.file.display()))]
pub fn execute(args: DryRunArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let namespace = commands::namespace(&args.source, &config);
    let manifest = load_application(&args.file)?.with_default_namespace(&namespace);
    let spec = manifest.spec()?;
    let context = commands::render_context(&spec.name, &spec.namespace, &config);
    let repository = commands::definition_repository(&args.source, &config)?;

    if !args.record {
        let rendered = RenderService::new(repository).render(&spec, &context)?;
        return print(&rendered, &output);
    }

    let store = commands::revision_store(args.revisions, &config);
    let service = DiffService::new(repository, Box::new(store));
    let rendered = service.renderer().render(&spec, &context)?;
    print(&rendered, &output)?;

    let revision = service.record(&manifest, rendered)?;
    info!(revision = %revision.name, "Recorded dry-run result");
    output.success(&format!(
        "Recorded revision {} of {}",
        revision.name,
        manifest.name()
    ))?;
    Ok(())
}

fn print(rendered: &RenderedApplication, output: &OutputManager) -> CliResult<()> {
    if output.is_json() {
        let payload = DryRunJson {
            application: &rendered.name,
            namespace: &rendered.namespace,
            components: rendered
                .components
                .iter()
                .map(|component| ComponentJson {
                    name: &component.name,
                    resources: component.resources().map(|r| &r.document).collect(),
                })
                .collect(),
        };
        return output.json(&payload);
    }
    output.document(&report::dry_run(rendered)?)?;
    Ok(())
}
