use codeowners_model::{PatternRule, UnrecognizedLine};
use serde::Serialize;

/// One inconsistency between the ownership file, the repository and the
/// owners list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// A file added between the two revisions that no rule owns
    MissingReference { file: String },
    /// A rule whose pattern matches no tracked file
    UselessPattern { rule: PatternRule },
    /// An owner referenced by a rule but absent from the owners list
    InvalidOwner { owner: String, rule: PatternRule },
    /// A line that is neither blank, a comment nor a rule
    UnrecognizedLine { line: UnrecognizedLine },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    MissingReference,
    UselessPattern,
    InvalidOwner,
    UnrecognizedLine,
}

impl FindingKind {
    pub const fn label(self) -> &'static str {
        match self {
            FindingKind::MissingReference => "Missing references",
            FindingKind::UselessPattern => "No files matching with the pattern",
            FindingKind::InvalidOwner => "Unknown owners",
            FindingKind::UnrecognizedLine => "Unrecognized lines",
        }
    }
}

impl Finding {
    pub fn kind(&self) -> FindingKind {
        match self {
            Finding::MissingReference { .. } => FindingKind::MissingReference,
            Finding::UselessPattern { .. } => FindingKind::UselessPattern,
            Finding::InvalidOwner { .. } => FindingKind::InvalidOwner,
            Finding::UnrecognizedLine { .. } => FindingKind::UnrecognizedLine,
        }
    }

    /// One-line description for human readable reports.
    pub fn describe(&self) -> String {
        match self {
            Finding::MissingReference { file } => file.clone(),
            Finding::UselessPattern { rule } => {
                format!("{} (line {})", rule.pattern(), rule.line_number())
            }
            Finding::InvalidOwner { owner, rule } => format!(
                "{owner} in {} (line {})",
                rule.pattern(),
                rule.line_number()
            ),
            Finding::UnrecognizedLine { line } => {
                format!("{:?} (line {})", line.raw(), line.line_number())
            }
        }
    }
}
