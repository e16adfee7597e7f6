//! # Codeowners Check
//!
//! Consistency checks between a repository, its CODEOWNERS file and its
//! owners list, plus the interactive session that fixes what they find.
//!
//! ## Flow
//!
//! ```text
//! Vcs (git) ──> OwnershipState::load(to)
//!                   │
//!                   ▼
//!               Checker ── missing references / useless patterns /
//!                   │       invalid owners / unrecognized lines
//!                   ▼
//!               Reconciler ── Prompt + PatternSuggester
//!                   │
//!                   ▼
//!               write → stage → commit (once per session)
//! ```

mod checker;
mod error;
mod finding;
mod prompt;
mod reconcile;
mod suggest;
mod vcs;

#[cfg(test)]
mod test_support;

pub use checker::{
    CheckObserver, CheckOptions, Checker, NoopObserver, OwnershipState,
    DEFAULT_CODEOWNERS_LOCATIONS, DEFAULT_OWNERS_LOCATION,
};
pub use error::{CheckError, PersistStage, ReconcileError, Result, UnsavedEdits, VcsError};
pub use finding::{Finding, FindingKind};
pub use prompt::Prompt;
pub use reconcile::{CommitPolicy, Reconciler, SessionOutcome, SessionReport, COMMIT_MESSAGE};
pub use suggest::{FuzzyPathSuggester, PatternSuggester};
pub use vcs::{Change, ChangeStatus, GitCli, Vcs};
