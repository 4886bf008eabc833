//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "drydock",
    bin_name = "drydock",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Render, diff and inspect component/trait applications offline",
    long_about = "drydock renders an application through its component and trait \
                  definitions without a cluster, diffs it against the last \
                  recorded revision, and documents definition parameters.",
    after_help = "EXAMPLES:\n\
        \x20 drydock dry-run -f app.yaml -d ./definitions\n\
        \x20 drydock dry-run -f app.yaml --record\n\
        \x20 drydock live-diff -f app.yaml\n\
        \x20 drydock show webservice\n\
        \x20 drydock completions bash > /usr/share/bash-completion/completions/drydock",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render an application to resource manifests.
    #[command(
        about = "Render an application without applying it",
        after_help = "EXAMPLES:\n\
            \x20 drydock dry-run -f app.yaml\n\
            \x20 drydock dry-run -f app.yaml -d ./definitions -n prod\n\
            \x20 drydock dry-run -f app.yaml --record"
    )]
    DryRun(DryRunArgs),

    /// Diff an application against its last recorded revision.
    #[command(
        visible_alias = "diff",
        about = "Diff an application against its last recorded revision",
        after_help = "EXAMPLES:\n\
            \x20 drydock live-diff -f app.yaml\n\
            \x20 drydock live-diff -f app.yaml --show-unchanged"
    )]
    LiveDiff(LiveDiffArgs),

    /// Show the parameters of a component or trait type.
    #[command(
        about = "Show the parameters of a component or trait type",
        after_help = "EXAMPLES:\n\
            \x20 drydock show webservice\n\
            \x20 drydock show sidecar -d ./definitions"
    )]
    Show(ShowArgs),

    /// List available definitions.
    #[command(
        visible_alias = "ls",
        about = "List available component and trait definitions",
        after_help = "EXAMPLES:\n\
            \x20 drydock list\n\
            \x20 drydock list -d ./definitions --output-format json"
    )]
    List(ListArgs),

    /// Initialise a drydock configuration file.
    #[command(
        about = "Initialise configuration",
        after_help = "EXAMPLES:\n\
            \x20 drydock init           # platform config directory\n\
            \x20 drydock init --local   # ./drydock.toml"
    )]
    Init(InitArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 drydock completions bash > ~/.local/share/bash-completion/completions/drydock\n\
            \x20 drydock completions zsh  > ~/.zfunc/_drydock\n\
            \x20 drydock completions fish > ~/.config/fish/completions/drydock.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the drydock configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 drydock config get revisions.dir\n\
            \x20 drydock config list\n\
            \x20 drydock config path"
    )]
    Config(ConfigCommands),
}

// ── shared ────────────────────────────────────────────────────────────────────

/// Where definitions come from and which namespace to resolve in.
#[derive(Debug, Clone, Args)]
pub struct DefinitionArgs {
    /// Directory (or file) of ComponentDefinition/TraitDefinition manifests.
    #[arg(
        short = 'd',
        long = "definitions",
        value_name = "PATH",
        help = "Definition manifests to load in addition to the built-ins"
    )]
    pub definitions: Option<PathBuf>,

    /// Namespace definitions are resolved in before the system namespace.
    #[arg(
        short = 'n',
        long = "namespace",
        value_name = "NAMESPACE",
        help = "Namespace to resolve definitions in"
    )]
    pub namespace: Option<String>,
}

// ── dry-run ───────────────────────────────────────────────────────────────────

/// Arguments for `drydock dry-run`.
#[derive(Debug, Args)]
pub struct DryRunArgs {
    /// Application manifest.
    #[arg(short = 'f', long = "file", value_name = "FILE", help = "Application file")]
    pub file: PathBuf,

    #[command(flatten)]
    pub source: DefinitionArgs,

    /// Record the rendered result as the next revision.
    #[arg(
        long = "record",
        help = "Record the result as the next revision for later live-diff"
    )]
    pub record: bool,

    /// Override the revisions directory.
    #[arg(long = "revisions", value_name = "DIR", help = "Revisions directory")]
    pub revisions: Option<PathBuf>,
}

// ── live-diff ─────────────────────────────────────────────────────────────────

/// Arguments for `drydock live-diff`.
#[derive(Debug, Args)]
pub struct LiveDiffArgs {
    /// Candidate application manifest.
    #[arg(short = 'f', long = "file", value_name = "FILE", help = "Application file")]
    pub file: PathBuf,

    #[command(flatten)]
    pub source: DefinitionArgs,

    /// Override the revisions directory.
    #[arg(long = "revisions", value_name = "DIR", help = "Revisions directory")]
    pub revisions: Option<PathBuf>,

    /// Print the body of unchanged resources too.
    #[arg(long = "show-unchanged", help = "Print unchanged resources in full")]
    pub show_unchanged: bool,
}

// ── show / list ───────────────────────────────────────────────────────────────

/// Arguments for `drydock show`.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Component or trait type name.
    #[arg(value_name = "NAME", help = "Component or trait type")]
    pub name: String,

    #[command(flatten)]
    pub source: DefinitionArgs,
}

/// Arguments for `drydock list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: DefinitionArgs,

    /// Only list one kind.
    #[arg(short = 'k', long = "kind", value_enum, help = "Filter by kind")]
    pub kind: Option<KindFilter>,
}

/// Kind filter for `drydock list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindFilter {
    Component,
    Trait,
}

// ── init ──────────────────────────────────────────────────────────────────────

/// Arguments for `drydock init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Write to `drydock.toml` in the current directory.
    #[arg(
        long = "local",
        help = "Create local configuration in current directory"
    )]
    pub local: bool,

    /// Overwrite an existing config file.
    #[arg(long = "force", help = "Overwrite existing configuration")]
    pub force: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `drydock completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `drydock config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `revisions.dir`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the active configuration file.
    Path,
}

// ── tests ─────────────────────────────────────────────────────────────────────
