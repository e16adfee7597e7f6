use std::io;

use codeowners_check::{FuzzyPathSuggester, PatternSuggester, Prompt};
use codeowners_model::Pattern;
use console::{style, Term};
use dialoguer::{FuzzySelect, Input};

fn prompt_error(err: dialoguer::Error) -> io::Error {
    io::Error::other(err)
}

/// Terminal implementation of [`Prompt`]; questions go to stderr so stdout
/// stays reserved for reports.
pub(crate) struct TerminalPrompt {
    term: Term,
}

impl TerminalPrompt {
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Prompt for TerminalPrompt {
    fn ask(&mut self, question: &str, allowed: &[char]) -> io::Result<char> {
        self.term.write_str(question)?;
        let choices: String = allowed.iter().collect();
        loop {
            let answer: String = Input::new()
                .with_prompt(format!("[{choices}]"))
                .allow_empty(true)
                .interact_text_on(&self.term)
                .map_err(prompt_error)?;
            let mut chars = answer.trim().chars();
            if let (Some(choice), None) = (chars.next(), chars.next()) {
                if allowed.contains(&choice) {
                    return Ok(choice);
                }
            }
            self.term.write_line(&format!(
                "{} expected one of: {choices}",
                style("invalid answer,").yellow()
            ))?;
        }
    }

    fn input(&mut self, question: &str) -> io::Result<String> {
        Input::<String>::new()
            .with_prompt(question.trim_end().trim_end_matches(':'))
            .allow_empty(true)
            .interact_text_on(&self.term)
            .map_err(prompt_error)
    }
}

/// Lets the user pick a replacement from every tracked path, starting on the
/// automatic suggestion. Escape skips the suggestion.
pub(crate) struct FuzzySelectSuggester {
    inner: FuzzyPathSuggester,
    term: Term,
}

impl FuzzySelectSuggester {
    pub(crate) fn new(inner: FuzzyPathSuggester) -> Self {
        Self {
            inner,
            term: Term::stderr(),
        }
    }
}

impl PatternSuggester for FuzzySelectSuggester {
    fn suggest(&mut self, pattern: &Pattern) -> Option<String> {
        let automatic = self.inner.suggest(pattern);
        let items = self.inner.candidates();
        if items.is_empty() {
            return automatic;
        }
        let start = automatic
            .as_ref()
            .and_then(|best| items.iter().position(|item| item == best))
            .unwrap_or(0);

        match FuzzySelect::new()
            .with_prompt(format!("Replacement for \"{pattern}\" (Esc to skip)"))
            .items(items)
            .default(start)
            .interact_on_opt(&self.term)
        {
            Ok(Some(idx)) => items.get(idx).cloned(),
            Ok(None) => None,
            Err(err) => {
                log::warn!("fuzzy picker failed, using automatic suggestion: {err}");
                automatic
            }
        }
    }
}
