//! `drydock live-diff`: compare an application with its last recorded
//! revision.
//!
//! Exits 0 whether or not there are changes; the summary line says which.

use tracing::{info, instrument};

use drydock_adapters::load_application;
use drydock_core::{
    application::{
        DiffService, LiveDiff,
        report::{self, DiffReportOptions},
    },
};

use crate::{
    cli::LiveDiffArgs,
    commands,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[instrument(skip_all, fields(file = %args.file.display()))]
pub fn execute(args: LiveDiffArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let namespace = commands::namespace(&args.source, &config);
    let candidate = load_application(&args.file)?.with_default_namespace(&namespace);
    let context = commands::render_context(candidate.name(), candidate.namespace(), &config);

    let repository = commands::definition_repository(&args.source, &config)?;
    let store = commands::revision_store(args.revisions, &config);
    let service = DiffService::new(repository, Box::new(store));

    let result = service.live_diff(&candidate, &context)?;
    info!(
        baseline = %result.baseline,
        changed = result.has_changes(),
        "Live-diff complete"
    );

    if output.is_json() {
        return output.json(&result);
    }

    output.info(&baseline_line(&result))?;
    let options = DiffReportOptions {
        show_unchanged: args.show_unchanged || config.output.show_unchanged,
    };
    output.diff(&report::live_diff(&result.entries, options))?;
    output.info(&report::summary(&result.entries))?;
    Ok(())
}

fn baseline_line(result: &LiveDiff) -> String {
    match result.recorded_at {
        Some(at) => format!(
            "Comparing with revision {} (recorded {})",
            result.baseline,
            at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => format!("Comparing with revision {}", result.baseline),
    }
}
