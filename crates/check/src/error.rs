use std::fmt;

use codeowners_model::ModelError;
use thiserror::Error;

/// Result type for consistency checks
pub type Result<T> = std::result::Result<T, CheckError>;

/// Errors raised by the version-control backend
#[derive(Error, Debug)]
pub enum VcsError {
    /// `git` could not be spawned
    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    /// The path is not inside a git work tree
    #[error("not a git repository: {0}")]
    NotARepository(String),

    /// A revision does not resolve to a commit
    #[error("unknown revision: {0}")]
    UnknownRevision(String),

    /// A stored file is not valid UTF-8
    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(String),

    /// git exited with a failure status
    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal configuration errors raised before analysis starts
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("VCS error: {0}")]
    Vcs(#[from] VcsError),

    /// No ownership file at the target revision
    #[error("ownership file not found at {revision}: {paths}")]
    MissingCodeowners { revision: String, paths: String },

    /// No owners file at the target revision
    #[error("owners file not found at {revision}: {path}")]
    MissingOwners { revision: String, path: String },
}

/// Step of the save sequence that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStage {
    Write,
    Stage,
    Commit,
}

impl fmt::Display for PersistStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PersistStage::Write => "write",
            PersistStage::Stage => "stage",
            PersistStage::Commit => "commit",
        };
        f.write_str(label)
    }
}

/// Serialized content of edits that did not reach the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsavedEdits {
    /// `(path, content)` pairs, relative to the work tree
    pub files: Vec<(String, String)>,
}

/// Errors raised while running a reconciliation session
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The prompt could not read an answer
    #[error("prompt failed: {0}")]
    Prompt(#[from] std::io::Error),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Saving the session failed; the edits are kept in `unsaved`
    #[error("failed to {stage} session changes: {source}")]
    Persist {
        stage: PersistStage,
        #[source]
        source: VcsError,
        unsaved: Box<UnsavedEdits>,
    },
}
