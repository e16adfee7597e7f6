use std::collections::{HashMap, HashSet};

use codeowners_model::{LineId, OwnerSet, Pattern};
use serde::Deserialize;

use crate::checker::OwnershipState;
use crate::error::{PersistStage, ReconcileError, UnsavedEdits, VcsError};
use crate::finding::Finding;
use crate::prompt::Prompt;
use crate::suggest::PatternSuggester;
use crate::vcs::Vcs;

pub const COMMIT_MESSAGE: &str = "Fix pattern :robot:";

/// What to do with saved edits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitPolicy {
    Always,
    #[default]
    Ask,
    Never,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every finding was presented
    Completed,
    /// The user chose "quit and save"
    Quit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    /// Findings that reached a prompt
    pub presented: usize,
    pub codeowners_changed: bool,
    pub owners_changed: bool,
    pub committed: bool,
}

enum Flow {
    Continue,
    Quit,
}

/// Decisions that outlive a single finding.
#[derive(Default)]
struct SessionMemory {
    renamed: HashMap<String, String>,
    ignored_owners: HashSet<String>,
    codeowners_changed: bool,
    owners_changed: bool,
    presented: usize,
}

/// Walks findings one at a time, asks how to fix each and applies the answer
/// to the in-memory files. Files are written, staged and committed once, when
/// the walk ends or the user quits.
pub struct Reconciler<'a> {
    vcs: &'a dyn Vcs,
    prompt: &'a mut dyn Prompt,
    suggester: &'a mut dyn PatternSuggester,
    commit_policy: CommitPolicy,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        vcs: &'a dyn Vcs,
        prompt: &'a mut dyn Prompt,
        suggester: &'a mut dyn PatternSuggester,
    ) -> Self {
        Self {
            vcs,
            prompt,
            suggester,
            commit_policy: CommitPolicy::default(),
        }
    }

    pub fn commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.commit_policy = policy;
        self
    }

    pub fn run(
        &mut self,
        findings: &[Finding],
        state: &mut OwnershipState,
    ) -> Result<SessionReport, ReconcileError> {
        let mut memory = SessionMemory::default();
        let mut outcome = SessionOutcome::Completed;

        for finding in findings {
            let flow = match finding {
                Finding::MissingReference { file } => {
                    self.missing_reference(file, state, &mut memory)?
                }
                Finding::UselessPattern { rule } => {
                    self.useless_pattern(rule.id(), state, &mut memory)?
                }
                Finding::InvalidOwner { owner, rule } => {
                    self.invalid_owner(owner, rule.id(), state, &mut memory)?
                }
                Finding::UnrecognizedLine { line } => {
                    self.unrecognized_line(line.id(), line.raw(), state, &mut memory)?
                }
            };
            if state.codeowners.is_dirty() {
                state.codeowners.refresh();
            }
            if let Flow::Quit = flow {
                log::info!("quit requested, saving changes made so far");
                outcome = SessionOutcome::Quit;
                break;
            }
        }

        let committed = self.persist(state, &memory)?;
        Ok(SessionReport {
            outcome,
            presented: memory.presented,
            codeowners_changed: memory.codeowners_changed,
            owners_changed: memory.owners_changed,
            committed,
        })
    }

    fn ask(
        &mut self,
        memory: &mut SessionMemory,
        question: &str,
        allowed: &[char],
    ) -> Result<char, ReconcileError> {
        memory.presented += 1;
        Ok(self.prompt.ask(question, allowed)?)
    }

    fn input(&mut self, question: &str) -> Result<Option<String>, ReconcileError> {
        let answer = self.prompt.input(question)?;
        let answer = answer.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }

    fn missing_reference(
        &mut self,
        file: &str,
        state: &mut OwnershipState,
        memory: &mut SessionMemory,
    ) -> Result<Flow, ReconcileError> {
        if state.codeowners.defined_owner(file) {
            log::debug!("{file} is owned by a rule added in this session");
            return Ok(Flow::Continue);
        }

        let question = format!(
            "File added: \"{file}\". Add owner to the CODEOWNERS file?\n\
             (y) yes\n\
             (i) ignore\n\
             (q) quit and save\n"
        );
        match self.ask(memory, &question, &['y', 'i', 'q'])? {
            'y' => {
                let Some(owners) = self.input("File owner(s): ")? else {
                    return Ok(Flow::Continue);
                };
                state
                    .codeowners
                    .append_rule(&Pattern::escape(file), OwnerSet::from_tokens(&owners))?;
                memory.codeowners_changed = true;
                Ok(Flow::Continue)
            }
            'q' => Ok(Flow::Quit),
            _ => Ok(Flow::Continue),
        }
    }

    fn useless_pattern(
        &mut self,
        id: LineId,
        state: &mut OwnershipState,
        memory: &mut SessionMemory,
    ) -> Result<Flow, ReconcileError> {
        let (Some(line_number), Some(rule)) =
            (state.codeowners.line_number_of(id), state.codeowners.rule(id))
        else {
            return Ok(Flow::Continue);
        };
        let pattern = rule.pattern().clone();
        let suggestion = self
            .suggester
            .suggest(&pattern)
            .map(|path| Pattern::escape(&path));

        let (question, allowed): (String, &[char]) = match &suggestion {
            Some(suggestion) => (
                format!(
                    "Pattern \"{pattern}\" doesn't match any file.\n\
                     Replace with: \"{suggestion}\"?\n\
                     (y) yes\n\
                     (i) ignore\n\
                     (e) edit the pattern\n\
                     (d) delete the pattern\n\
                     (q) quit and save\n"
                ),
                &['y', 'i', 'e', 'd', 'q'][..],
            ),
            None => (
                format!(
                    "Pattern \"{pattern}\" doesn't match any file.\n\
                     (e) edit the pattern\n\
                     (d) delete the pattern\n\
                     (i) ignore\n\
                     (q) quit and save\n"
                ),
                &['i', 'e', 'd', 'q'][..],
            ),
        };

        match self.ask(memory, &question, allowed)? {
            'y' => {
                if let Some(suggestion) = suggestion {
                    state.codeowners.replace_pattern(line_number, &suggestion)?;
                    memory.codeowners_changed = true;
                }
                Ok(Flow::Continue)
            }
            'e' => {
                if let Some(replacement) = self.input("New pattern: ")? {
                    state.codeowners.replace_pattern(line_number, &replacement)?;
                    memory.codeowners_changed = true;
                }
                Ok(Flow::Continue)
            }
            'd' => {
                state.codeowners.delete_line(line_number)?;
                memory.codeowners_changed = true;
                Ok(Flow::Continue)
            }
            'q' => Ok(Flow::Quit),
            _ => Ok(Flow::Continue),
        }
    }

    fn invalid_owner(
        &mut self,
        owner: &str,
        id: LineId,
        state: &mut OwnershipState,
        memory: &mut SessionMemory,
    ) -> Result<Flow, ReconcileError> {
        if memory.ignored_owners.contains(owner) || state.owners.contains(owner) {
            return Ok(Flow::Continue);
        }
        let (Some(line_number), Some(rule)) =
            (state.codeowners.line_number_of(id), state.codeowners.rule(id))
        else {
            return Ok(Flow::Continue);
        };
        if !rule.owners().contains(owner) {
            return Ok(Flow::Continue);
        }
        let pattern = rule.pattern().to_string();

        if let Some(replacement) = memory.renamed.get(owner).cloned() {
            log::debug!("renaming {owner} to {replacement} in {pattern} (line {line_number})");
            if state
                .codeowners
                .replace_owner(line_number, owner, &replacement)?
            {
                memory.codeowners_changed = true;
            }
            return Ok(Flow::Continue);
        }

        let suggestion = state.owners.suggest(owner).map(str::to_string);
        let mut question = match &suggestion {
            Some(suggestion) => format!(
                "Unknown owner: {owner} for pattern: {pattern}. Did you mean {suggestion}?\n\
                 (y) correct to {suggestion}\n"
            ),
            None => format!("Unknown owner: {owner} for pattern: {pattern}. Choose an option:\n"),
        };
        question.push_str(
            "(a) add a new owner\n\
             (r) rename owner\n\
             (i) ignore owner in this session\n\
             (q) quit and save\n",
        );
        let allowed: &[char] = if suggestion.is_some() {
            &['y', 'a', 'r', 'i', 'q']
        } else {
            &['a', 'r', 'i', 'q']
        };

        let replacement = match self.ask(memory, &question, allowed)? {
            'y' => suggestion,
            'r' => self.input("New owner: ")?,
            'a' => {
                state.owners.insert(owner);
                memory.owners_changed = true;
                None
            }
            'q' => return Ok(Flow::Quit),
            _ => {
                memory.ignored_owners.insert(owner.to_string());
                None
            }
        };

        if let Some(replacement) = replacement {
            if state
                .codeowners
                .replace_owner(line_number, owner, &replacement)?
            {
                memory.codeowners_changed = true;
            }
            memory.renamed.insert(owner.to_string(), replacement);
        }
        Ok(Flow::Continue)
    }

    fn unrecognized_line(
        &mut self,
        id: LineId,
        raw: &str,
        state: &mut OwnershipState,
        memory: &mut SessionMemory,
    ) -> Result<Flow, ReconcileError> {
        let Some(line_number) = state.codeowners.line_number_of(id) else {
            return Ok(Flow::Continue);
        };

        let raw = raw.trim_end_matches('\r');
        let question = format!(
            "\"{raw}\" is in unrecognized format. Would you like to edit?\n\
             (y) yes\n\
             (i) ignore\n\
             (d) delete the line\n"
        );
        match self.ask(memory, &question, &['y', 'i', 'd'])? {
            'y' => {
                if let Some(replacement) = self.input("New line: ")? {
                    state.codeowners.replace_line(line_number, &replacement)?;
                    memory.codeowners_changed = true;
                }
            }
            'd' => {
                state.codeowners.delete_line(line_number)?;
                memory.codeowners_changed = true;
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    /// Writes, stages and commits whatever changed. Returns whether a commit
    /// was made.
    fn persist(
        &mut self,
        state: &OwnershipState,
        memory: &SessionMemory,
    ) -> Result<bool, ReconcileError> {
        let mut unsaved = UnsavedEdits::default();
        if memory.codeowners_changed {
            unsaved
                .files
                .push((state.codeowners_path.clone(), state.codeowners.to_content()));
        }
        if memory.owners_changed {
            unsaved
                .files
                .push((state.owners_path.clone(), state.owners.to_content()));
        }
        if unsaved.files.is_empty() {
            return Ok(false);
        }

        let fail = |stage: PersistStage, source: VcsError, unsaved: &UnsavedEdits| {
            ReconcileError::Persist {
                stage,
                source,
                unsaved: Box::new(unsaved.clone()),
            }
        };

        for (path, content) in &unsaved.files {
            log::info!("writing {path}");
            self.vcs
                .write_file(path, content)
                .map_err(|err| fail(PersistStage::Write, err, &unsaved))?;
        }
        for (path, _) in &unsaved.files {
            self.vcs
                .stage(path)
                .map_err(|err| fail(PersistStage::Stage, err, &unsaved))?;
        }

        let commit = match self.commit_policy {
            CommitPolicy::Always => true,
            CommitPolicy::Never => false,
            CommitPolicy::Ask => {
                self.prompt
                    .ask("Commit changes?\n(y) yes\n(n) no\n", &['y', 'n'])?
                    == 'y'
            }
        };
        if !commit {
            log::info!("changes saved and staged, not committed");
            return Ok(false);
        }

        self.vcs
            .commit(COMMIT_MESSAGE)
            .map_err(|err| fail(PersistStage::Commit, err, &unsaved))?;
        log::info!("committed: {COMMIT_MESSAGE}");
        Ok(true)
    }
}
