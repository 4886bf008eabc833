//! Plain-text reports for dry-run and live-diff.
//!
//! Colour is a presentation concern left to the CLI; these functions only
//! produce the banner-delimited text.

use crate::{
    domain::{
        ChangeKind, DiffEntry, DiffSubject, DomainError, RenderedApplication, ResourceRole,
    },
    error::DrydockResult,
};

/// Separator between YAML documents.
pub const DOCUMENT_SEPARATOR: &str = "---";

/// Render a dry-run as banner-delimited YAML documents, one section per
/// component.
pub fn dry_run(rendered: &RenderedApplication) -> DrydockResult<String> {
    let mut out = String::new();
    for component in &rendered.components {
        out.push_str(&format!(
            "{DOCUMENT_SEPARATOR}\n# Application({}) -- Component({})\n{DOCUMENT_SEPARATOR}\n\n",
            rendered.name, component.name
        ));
        for resource in component.resources() {
            out.push_str(&resource.to_yaml()?);
            out.push_str(&format!("\n{DOCUMENT_SEPARATOR}\n"));
        }
        out.push('\n');
    }
    Ok(out)
}

/// Banner line for one diff entry.
pub fn diff_banner(entry: &DiffEntry) -> String {
    let verdict = verdict(entry.change);
    match &entry.subject {
        DiffSubject::Application { application } => {
            format!("# Application ({application}) {verdict}")
        }
        DiffSubject::Resource(identity) => match &identity.role {
            ResourceRole::Workload => format!("## Component ({}) {verdict}", identity.component),
            ResourceRole::Trait { trait_type, output } => format!(
                "### Component ({}) / Trait ({trait_type}/{output}) {verdict}",
                identity.component
            ),
        },
    }
}

fn verdict(change: ChangeKind) -> &'static str {
    match change {
        ChangeKind::Added => "has been added(+)",
        ChangeKind::Removed => "has been removed(-)",
        ChangeKind::Modified => "has been modified(*)",
        ChangeKind::Unchanged => "has no change",
    }
}

/// Options for [`live_diff`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffReportOptions {
    /// Print bodies of unchanged resources, not only their banner.
    pub show_unchanged: bool,
}

/// Render diff entries as banner-delimited, line-prefixed YAML blocks.
pub fn live_diff(entries: &[DiffEntry], options: DiffReportOptions) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{DOCUMENT_SEPARATOR}\n{}\n{DOCUMENT_SEPARATOR}\n",
            diff_banner(entry)
        ));
        if entry.is_change() || options.show_unchanged {
            for line in &entry.lines {
                out.push_str(&format!("{} {}\n", line.change.marker(), line.text));
            }
        }
        out.push('\n');
    }
    out
}

/// Summary line such as `1 modified, 3 added, 3 removed`.
pub fn summary(entries: &[DiffEntry]) -> String {
    let count = |kind: ChangeKind| entries.iter().filter(|e| e.change == kind).count();
    let parts: Vec<String> = [
        (ChangeKind::Modified, "modified"),
        (ChangeKind::Added, "added"),
        (ChangeKind::Removed, "removed"),
    ]
    .into_iter()
    .filter_map(|(kind, label)| match count(kind) {
        0 => None,
        n => Some(format!("{n} {label}")),
    })
    .collect();
    if parts.is_empty() {
        "no changes".into()
    } else {
        parts.join(", ")
    }
}

/// Serialize any report payload as pretty JSON.
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> DrydockResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| {
        DomainError::Serialization {
            what: "report".into(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        DiffLine, LineChange, RenderedComponent, RenderedResource, ResourceIdentity,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn entry(subject: DiffSubject, change: ChangeKind, lines: &[(LineChange, &str)]) -> DiffEntry {
        DiffEntry {
            subject,
            change,
            old: None,
            new: None,
            lines: lines
                .iter()
                .map(|(change, text)| DiffLine {
                    change: *change,
                    text: (*text).to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn dry_run_banners_each_component() {
        let rendered = RenderedApplication {
            name: "shop".into(),
            namespace: "default".into(),
            components: vec![RenderedComponent {
                name: "web".into(),
                workload: RenderedResource::new(
                    ResourceIdentity::workload("web"),
                    json!({"kind": "Deployment"}),
                ),
                traits: vec![RenderedResource::new(
                    ResourceIdentity::trait_output("web", "ingress", "service"),
                    json!({"kind": "Service"}),
                )],
            }],
        };
        let text = dry_run(&rendered).unwrap();
        assert_eq!(
            text,
            "---\n# Application(shop) -- Component(web)\n---\n\n\
             kind: Deployment\n\n---\n\
             kind: Service\n\n---\n\n"
        );
    }

    #[test]
    fn banners_name_scope_and_change() {
        let app = entry(
            DiffSubject::Application {
                application: "shop".into(),
            },
            ChangeKind::Modified,
            &[],
        );
        assert_eq!(diff_banner(&app), "# Application (shop) has been modified(*)");

        let workload = entry(
            DiffSubject::Resource(ResourceIdentity::workload("web")),
            ChangeKind::Removed,
            &[],
        );
        assert_eq!(diff_banner(&workload), "## Component (web) has been removed(-)");

        let service = entry(
            DiffSubject::Resource(ResourceIdentity::trait_output("web", "ingress", "service")),
            ChangeKind::Added,
            &[],
        );
        assert_eq!(
            diff_banner(&service),
            "### Component (web) / Trait (ingress/service) has been added(+)"
        );
    }

    #[test]
    fn diff_lines_are_prefixed() {
        let modified = entry(
            DiffSubject::Resource(ResourceIdentity::workload("web")),
            ChangeKind::Modified,
            &[
                (LineChange::Unchanged, "kind: Deployment"),
                (LineChange::Removed, "image: a"),
                (LineChange::Added, "image: b"),
            ],
        );
        let text = live_diff(&[modified], DiffReportOptions::default());
        assert_eq!(
            text,
            "---\n## Component (web) has been modified(*)\n---\n  kind: Deployment\n- image: a\n+ image: b\n\n"
        );
    }

    #[test]
    fn unchanged_bodies_are_hidden_by_default() {
        let same = entry(
            DiffSubject::Resource(ResourceIdentity::workload("web")),
            ChangeKind::Unchanged,
            &[(LineChange::Unchanged, "kind: Deployment")],
        );
        let hidden = live_diff(std::slice::from_ref(&same), DiffReportOptions::default());
        assert!(!hidden.contains("kind: Deployment"));
        let shown = live_diff(
            &[same],
            DiffReportOptions {
                show_unchanged: true,
            },
        );
        assert!(shown.contains("  kind: Deployment"));
    }

    #[test]
    fn summary_counts_changes() {
        let entries = vec![
            entry(
                DiffSubject::Resource(ResourceIdentity::workload("a")),
                ChangeKind::Added,
                &[],
            ),
            entry(
                DiffSubject::Resource(ResourceIdentity::workload("b")),
                ChangeKind::Removed,
                &[],
            ),
            entry(
                DiffSubject::Resource(ResourceIdentity::workload("c")),
                ChangeKind::Unchanged,
                &[],
            ),
        ];
        assert_eq!(summary(&entries), "1 added, 1 removed");
        assert_eq!(summary(&[]), "no changes");
    }
}
