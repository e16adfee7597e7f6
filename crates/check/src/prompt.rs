use std::io;

/// Synchronous question/answer port used by the reconciliation session.
pub trait Prompt {
    /// Shows `question` and blocks until one of `allowed` is chosen.
    fn ask(&mut self, question: &str, allowed: &[char]) -> io::Result<char>;

    /// Asks for free text; an empty answer means "skip".
    fn input(&mut self, question: &str) -> io::Result<String>;
}
