//! Output management and formatting.
//!
//! Results (YAML documents, diffs, tables, JSON) go to stdout. Status lines
//! (`✓`, `ℹ`, `⚠`) go to stderr so stdout can be piped into other tools.

use std::io::{self, IsTerminal};

use console::Term;
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use drydock_core::{
    application::report::{self, DOCUMENT_SEPARATOR},
    domain::{DefinitionSummary, ParameterDecl},
};

use crate::cli::global::{GlobalArgs, OutputFormat};
use crate::config::AppConfig;
use crate::error::CliResult;

/// Manages CLI output based on configuration.
pub struct OutputManager {
    resolved_format: OutputFormat,
    quiet: bool,
    no_color: bool,
    term: Term,
    status: Term,
}

impl OutputManager {
    /// Build an `OutputManager` from parsed CLI flags and loaded config.
    pub fn new(args: &GlobalArgs, config: &AppConfig) -> Self {
        // Resolve Auto → Human (TTY) or Plain (piped/redirected).
        let resolved_format = if args.output_format == OutputFormat::Auto {
            if io::stdout().is_terminal() {
                OutputFormat::Human
            } else {
                OutputFormat::Plain
            }
        } else {
            args.output_format
        };

        Self {
            resolved_format,
            quiet: args.quiet,
            no_color: args.no_color
                || config.output.no_color
                || resolved_format != OutputFormat::Human,
            term: Term::stdout(),
            status: Term::stderr(),
        }
    }

    // ── Results (stdout) ──────────────────────────────────────────────────

    /// Generic message; suppressed in quiet mode.
    pub fn print(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(msg)
    }

    /// Write a result verbatim. Never suppressed.
    pub fn document(&self, text: &str) -> io::Result<()> {
        self.term.write_str(text)
    }

    /// Pretty JSON of any serializable result.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> CliResult<()> {
        let text = report::to_json(value)?;
        self.term.write_line(&text)?;
        Ok(())
    }

    /// A diff report as produced by [`report::live_diff`], coloured on a TTY.
    pub fn diff(&self, text: &str) -> io::Result<()> {
        if !self.supports_color() {
            return self.document(text);
        }
        self.document(&colorize_diff(text))
    }

    /// `# Properties` table of a definition, then one table per nested
    /// struct parameter.
    pub fn parameters(&self, parameters: &[ParameterDecl]) -> io::Result<()> {
        let text = parameter_tables(parameters);
        if !self.supports_color() {
            return self.document(&text);
        }
        let styled: Vec<String> = text
            .lines()
            .map(|line| {
                if line.starts_with('#') {
                    line.cyan().bold().to_string()
                } else {
                    line.to_string()
                }
            })
            .collect();
        self.document(&(styled.join("\n") + "\n"))
    }

    /// Definition listing table.
    pub fn definitions(&self, summaries: &[DefinitionSummary]) -> io::Result<()> {
        if summaries.is_empty() {
            return self.info("No definitions found");
        }
        self.term.write_line(&definition_table(summaries))
    }

    // ── Status (stderr) ───────────────────────────────────────────────────

    /// Success indicator: `✓ <msg>`.
    pub fn success(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2713} {msg}") // ✓
        } else {
            format!("{} {}", "\u{2713}".green().bold(), msg.green())
        };
        self.status.write_line(&line)
    }

    /// Warning indicator: `⚠ <msg>`.
    pub fn warning(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{26a0} {msg}") // ⚠
        } else {
            format!("{} {}", "\u{26a0}".yellow().bold(), msg.yellow())
        };
        self.status.write_line(&line)
    }

    /// Informational indicator: `ℹ <msg>`.
    pub fn info(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2139} {msg}") // ℹ
        } else {
            format!("{} {}", "\u{2139}".blue().bold(), msg.blue())
        };
        self.status.write_line(&line)
    }

    /// Bold cyan header line on stdout.
    pub fn header(&self, text: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            text.to_owned()
        } else {
            text.cyan().bold().to_string()
        };
        self.term.write_line(&line)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// `true` if ANSI colours are enabled.
    pub fn supports_color(&self) -> bool {
        !self.no_color
    }

    pub fn is_json(&self) -> bool {
        self.resolved_format == OutputFormat::Json
    }
}

// ── formatting ────────────────────────────────────────────────────────────────

/// Colour a plain diff report: banners bold, `+` lines green, `-` lines red.
///
/// Body lines always start with a one-character marker and a space, so a
/// bare `---` or a line starting with `#` can only be a separator or banner.
pub fn colorize_diff(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        let styled = if body == DOCUMENT_SEPARATOR {
            body.dimmed().to_string()
        } else if body.starts_with('#') {
            body.bold().to_string()
        } else if body.starts_with("+ ") {
            body.green().to_string()
        } else if body.starts_with("- ") {
            body.red().to_string()
        } else {
            body.to_string()
        };
        out.push_str(&styled);
        out.push_str(newline);
    }
    out
}

#[derive(Tabled)]
struct ParameterRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "TYPE")]
    type_name: String,
    #[tabled(rename = "REQUIRED")]
    required: bool,
    #[tabled(rename = "DEFAULT")]
    default: String,
}

impl From<&ParameterDecl> for ParameterRow {
    fn from(decl: &ParameterDecl) -> Self {
        Self {
            name: decl.name.clone(),
            description: decl.description.clone(),
            type_name: decl.type_name.clone(),
            required: decl.required,
            default: decl.default_display(),
        }
    }
}

/// Plain-text parameter reference.
///
/// Struct parameters get their own `## <path>` section after the table that
/// mentions them, depth first.
pub fn parameter_tables(parameters: &[ParameterDecl]) -> String {
    let mut out = String::new();
    write_section(&mut out, "# Properties", parameters);

    let mut pending: Vec<(String, &ParameterDecl)> = parameters
        .iter()
        .rev()
        .filter(|p| !p.fields.is_empty())
        .map(|p| (p.name.clone(), p))
        .collect();
    while let Some((path, decl)) = pending.pop() {
        write_section(&mut out, &format!("## {path}"), &decl.fields);
        pending.extend(
            decl.fields
                .iter()
                .rev()
                .filter(|f| !f.fields.is_empty())
                .map(|f| (format!("{path}.{}", f.name), f)),
        );
    }
    out
}

fn write_section(out: &mut String, heading: &str, parameters: &[ParameterDecl]) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(heading);
    out.push('\n');
    let rows: Vec<ParameterRow> = parameters.iter().map(ParameterRow::from).collect();
    out.push_str(&Table::new(rows).with(Style::ascii()).to_string());
    out.push('\n');
}

#[derive(Tabled)]
struct DefinitionRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "NAMESPACE")]
    namespace: String,
    #[tabled(rename = "SCHEMATIC")]
    schematic: &'static str,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
}

/// Table of definitions in the given order.
pub fn definition_table(summaries: &[DefinitionSummary]) -> String {
    let rows: Vec<DefinitionRow> = summaries
        .iter()
        .map(|s| DefinitionRow {
            name: s.name.clone(),
            kind: s.kind.to_string(),
            namespace: s.namespace.clone(),
            schematic: s.schematic,
            description: s.description.clone(),
        })
        .collect();
    Table::new(rows).with(Style::ascii()).to_string()
}

// ── tests ─────────────────────────────────────────────────────────────────────
