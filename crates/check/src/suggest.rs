use std::collections::BTreeSet;

use codeowners_model::{closest, Pattern};
use nucleo_matcher::Matcher;

use crate::error::VcsError;
use crate::vcs::Vcs;

/// Proposes a replacement for a pattern that matches nothing. Suggestions are
/// literal paths; callers escape them before use as a pattern.
pub trait PatternSuggester {
    fn suggest(&mut self, pattern: &Pattern) -> Option<String>;
}

/// Suggests the tracked path or directory closest to a dead pattern.
///
/// Candidates are scored with nucleo-matcher first; when nothing matches as a
/// fuzzy subsequence the closest candidate by edit distance is used.
pub struct FuzzyPathSuggester {
    candidates: Vec<String>,
    matcher: Matcher,
}

impl FuzzyPathSuggester {
    /// `files` plus every directory above them (with a trailing `/`).
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut candidates = BTreeSet::new();
        for file in files {
            let file = file.as_ref();
            let mut end = 0;
            while let Some(pos) = file[end..].find('/') {
                end += pos + 1;
                candidates.insert(file[..end].to_string());
            }
            candidates.insert(file.to_string());
        }
        Self {
            candidates: candidates.into_iter().collect(),
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
        }
    }

    pub fn from_vcs(vcs: &dyn Vcs, revision: &str) -> Result<Self, VcsError> {
        Ok(Self::new(vcs.tracked_files(revision)?))
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}

impl PatternSuggester for FuzzyPathSuggester {
    fn suggest(&mut self, pattern: &Pattern) -> Option<String> {
        let needle = search_needle(pattern);
        if needle.trim_matches('/').is_empty() {
            return None;
        }

        let query = nucleo_matcher::pattern::Pattern::parse(
            &needle,
            nucleo_matcher::pattern::CaseMatching::Smart,
            nucleo_matcher::pattern::Normalization::Smart,
        );
        let mut best: Option<(u32, &String)> = None;
        for candidate in &self.candidates {
            let haystack = nucleo_matcher::Utf32String::from(candidate.as_str());
            let Some(score) = query.score(haystack.slice(..), &mut self.matcher) else {
                continue;
            };
            // Higher score wins; ties go to the shorter path.
            let better = match best {
                None => true,
                Some((best_score, best_path)) => {
                    score > best_score
                        || (score == best_score && candidate.len() < best_path.len())
                }
            };
            if better {
                best = Some((score, candidate));
            }
        }
        if let Some((_, path)) = best {
            return Some(path.clone());
        }

        closest(&needle, self.candidates.iter().map(String::as_str)).map(str::to_string)
    }
}

/// Literal part of a pattern: root anchor, escapes and glob characters removed.
fn search_needle(pattern: &Pattern) -> String {
    pattern
        .without_root_anchor()
        .chars()
        .filter(|c| !matches!(c, '*' | '?' | '[' | ']' | '{' | '}' | ' ' | '\\'))
        .collect()
}
