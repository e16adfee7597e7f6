use thiserror::Error;

/// Result type for ownership model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised by line-addressed mutations of a [`crate::Group`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The group was mutated and not refreshed; line numbers are stale
    #[error("line numbers are stale: refresh the group after mutating it")]
    StaleLineNumbers,

    /// No line exists at the given position
    #[error("no line at line {0}")]
    LineNotFound(usize),

    /// The addressed line is not a pattern rule
    #[error("line {0} is not a pattern rule")]
    NotARule(usize),

    /// A pattern rule needs a non-empty pattern
    #[error("empty pattern")]
    EmptyPattern,

    /// A pattern rule needs at least one owner
    #[error("pattern {0:?} has no owners")]
    NoOwners(String),
}
