use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::Path;

use codeowners_model::Pattern;

use crate::checker::DEFAULT_OWNERS_LOCATION;
use crate::error::VcsError;
use crate::prompt::Prompt;
use crate::vcs::{Change, ChangeStatus, Vcs};

/// In-memory repository: one diff, one tree, blobs shared by every revision.
#[derive(Default)]
pub(crate) struct MemoryVcs {
    changes: Vec<Change>,
    tracked: Vec<String>,
    blobs: HashMap<String, String>,
    pub(crate) fail_commit: bool,
    diff_calls: Cell<usize>,
    pub(crate) written: RefCell<Vec<(String, String)>>,
    pub(crate) staged: RefCell<Vec<String>>,
    pub(crate) commits: RefCell<Vec<String>>,
}

impl MemoryVcs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn codeowners(self, content: &str) -> Self {
        self.blob(".github/CODEOWNERS", content)
    }

    pub(crate) fn owners(self, content: &str) -> Self {
        self.blob(DEFAULT_OWNERS_LOCATION, content)
    }

    pub(crate) fn blob(mut self, path: &str, content: &str) -> Self {
        self.blobs.insert(path.to_string(), content.to_string());
        self
    }

    pub(crate) fn tracked(mut self, paths: &[&str]) -> Self {
        self.tracked.extend(paths.iter().map(|p| p.to_string()));
        self
    }

    pub(crate) fn added(self, paths: &[&str]) -> Self {
        self.changed(paths, ChangeStatus::Added)
    }

    pub(crate) fn modified(self, paths: &[&str]) -> Self {
        self.changed(paths, ChangeStatus::Modified)
    }

    fn changed(mut self, paths: &[&str], status: ChangeStatus) -> Self {
        self.changes.extend(paths.iter().map(|path| Change {
            path: path.to_string(),
            status,
        }));
        self
    }

    pub(crate) fn diff_calls(&self) -> usize {
        self.diff_calls.get()
    }

    pub(crate) fn written_file(&self, path: &str) -> Option<String> {
        self.written
            .borrow()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, content)| content.clone())
    }
}

impl Vcs for MemoryVcs {
    fn work_tree(&self) -> &Path {
        Path::new("/repo")
    }

    fn verify_revision(&self, revision: &str) -> Result<(), VcsError> {
        match revision {
            "origin/master" | "HEAD" => Ok(()),
            other => Err(VcsError::UnknownRevision(other.to_string())),
        }
    }

    fn diff(&self, _from: &str, _to: &str) -> Result<Vec<Change>, VcsError> {
        self.diff_calls.set(self.diff_calls.get() + 1);
        Ok(self.changes.clone())
    }

    fn diff_paths(
        &self,
        _from: &str,
        _to: &str,
        pathspecs: &[String],
    ) -> Result<Vec<Change>, VcsError> {
        let patterns: Vec<Pattern> = pathspecs.iter().map(|p| Pattern::new(p.as_str())).collect();
        Ok(self
            .changes
            .iter()
            .filter(|change| patterns.iter().any(|p| p.matches(&change.path)))
            .cloned()
            .collect())
    }

    fn tracked_files(&self, _revision: &str) -> Result<Vec<String>, VcsError> {
        Ok(self.tracked.clone())
    }

    fn read_blob(&self, _revision: &str, path: &str) -> Result<Option<String>, VcsError> {
        Ok(self.blobs.get(path).cloned())
    }

    fn write_file(&self, path: &str, contents: &str) -> Result<(), VcsError> {
        self.written
            .borrow_mut()
            .push((path.to_string(), contents.to_string()));
        Ok(())
    }

    fn stage(&self, path: &str) -> Result<(), VcsError> {
        self.staged.borrow_mut().push(path.to_string());
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<(), VcsError> {
        if self.fail_commit {
            return Err(VcsError::CommandFailed {
                command: "commit".to_string(),
                stderr: "hook rejected the commit".to_string(),
            });
        }
        self.commits.borrow_mut().push(message.to_string());
        Ok(())
    }
}

/// Replays canned answers and records every question it was asked.
#[derive(Default)]
pub(crate) struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub(crate) questions: Vec<(String, Vec<char>)>,
    pub(crate) inputs: Vec<String>,
}

impl ScriptedPrompt {
    pub(crate) fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    fn next_answer(&mut self) -> io::Result<String> {
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer left"))
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, question: &str, allowed: &[char]) -> io::Result<char> {
        self.questions.push((question.to_string(), allowed.to_vec()));
        let answer = self.next_answer()?;
        match answer.chars().next() {
            Some(choice) if allowed.contains(&choice) => Ok(choice),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("answer {answer:?} not in {allowed:?}"),
            )),
        }
    }

    fn input(&mut self, question: &str) -> io::Result<String> {
        self.inputs.push(question.to_string());
        self.next_answer()
    }
}
