use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::Result;
use codeowners_check::{CheckObserver, Finding, FindingKind, UnsavedEdits};
use codeowners_model::PatternRule;
use console::style;
use serde::Serialize;

pub(crate) const CONSISTENT: &str = "✅ File is consistent";

#[derive(Serialize)]
struct JsonReport<'a> {
    consistent: bool,
    findings: &'a [Finding],
}

pub(crate) fn render_json(findings: &[Finding]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonReport {
        consistent: findings.is_empty(),
        findings,
    })?)
}

/// Findings grouped under their kind's label, kinds in check order.
pub(crate) fn render_findings(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return format!("{CONSISTENT}\n");
    }

    let mut by_kind: BTreeMap<FindingKind, Vec<String>> = BTreeMap::new();
    for finding in findings {
        by_kind
            .entry(finding.kind())
            .or_default()
            .push(finding.describe());
    }

    let mut out = String::new();
    for (kind, lines) in by_kind {
        let _ = writeln!(out, "{}", style(kind.label()).red().bold());
        for line in lines {
            let _ = writeln!(out, "  - {line}");
        }
    }
    out
}

/// `owner:` headers followed by that owner's changed files.
pub(crate) fn render_changes(changes: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = String::new();
    for (owner, files) in changes {
        if files.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}:", style(owner).cyan().bold());
        for file in files {
            let _ = writeln!(out, "  {file}");
        }
    }
    out
}

/// Dumps edits that could not be saved, so they can be applied by hand.
pub(crate) fn render_unsaved(unsaved: &UnsavedEdits) -> String {
    let mut out = String::new();
    for (path, content) in &unsaved.files {
        let _ = writeln!(out, "{}", style(format!("--- unsaved {path}")).yellow());
        out.push_str(content);
        if !content.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Reports check progress through the log.
pub(crate) struct LogObserver;

impl CheckObserver for LogObserver {
    fn unowned_file(&self, path: &str) {
        log::debug!("no rule owns {path}");
    }

    fn useless_pattern(&self, rule: &PatternRule) {
        log::debug!(
            "pattern {} (line {}) matches no tracked file",
            rule.pattern(),
            rule.line_number()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_consistent() {
        assert_eq!(render_findings(&[]), "✅ File is consistent\n");
        let json: serde_json::Value = serde_json::from_str(&render_json(&[]).unwrap()).unwrap();
        assert_eq!(json["consistent"], true);
        assert!(json["findings"].as_array().unwrap().is_empty());
    }

    #[test]
    fn findings_are_grouped_by_label() {
        let findings = vec![
            Finding::MissingReference {
                file: "lib/a.rb".into(),
            },
            Finding::MissingReference {
                file: "lib/b.rb".into(),
            },
        ];
        let text = render_findings(&findings);
        assert!(text.contains("Missing references"));
        assert!(text.contains("  - lib/a.rb\n  - lib/b.rb\n"));

        let json: serde_json::Value =
            serde_json::from_str(&render_json(&findings).unwrap()).unwrap();
        assert_eq!(json["consistent"], false);
        assert_eq!(json["findings"][0]["kind"], "missing_reference");
        assert_eq!(json["findings"][1]["file"], "lib/b.rb");
    }

    #[test]
    fn owners_without_changes_are_omitted() {
        let mut changes = BTreeMap::new();
        changes.insert("@a".to_string(), vec!["lib/x.rb".to_string()]);
        changes.insert("@b".to_string(), Vec::new());
        let text = render_changes(&changes);
        assert!(text.contains("@a"));
        assert!(text.contains("  lib/x.rb\n"));
        assert!(!text.contains("@b"));
    }

    #[test]
    fn unsaved_edits_are_printed_in_full() {
        let unsaved = UnsavedEdits {
            files: vec![(".github/CODEOWNERS".into(), "lib/ @a".into())],
        };
        let text = render_unsaved(&unsaved);
        assert!(text.contains("unsaved .github/CODEOWNERS"));
        assert!(text.ends_with("lib/ @a\n"));
    }
}
