use std::collections::BTreeMap;

use codeowners_model::{Group, OwnersList, PatternRule, UnrecognizedLine};
use once_cell::unsync::OnceCell;

use crate::error::{CheckError, Result};
use crate::finding::Finding;
use crate::vcs::{ChangeStatus, Vcs};

/// Where GitHub looks for the ownership file, in lookup order.
pub const DEFAULT_CODEOWNERS_LOCATIONS: [&str; 3] =
    [".github/CODEOWNERS", "CODEOWNERS", "docs/CODEOWNERS"];

pub const DEFAULT_OWNERS_LOCATION: &str = ".github/OWNERS";

#[derive(Clone, Debug)]
pub struct CheckOptions {
    /// Explicit ownership file path; `None` searches the default locations
    pub codeowners_path: Option<String>,
    pub owners_path: String,
    /// When off, owners are not checked and the owners file is optional
    pub validate_owners: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            codeowners_path: None,
            owners_path: DEFAULT_OWNERS_LOCATION.to_string(),
            validate_owners: true,
        }
    }
}

/// The ownership file and owners list under check, with their paths.
#[derive(Clone, Debug)]
pub struct OwnershipState {
    pub codeowners: Group,
    pub codeowners_path: String,
    pub owners: OwnersList,
    pub owners_path: String,
    pub validate_owners: bool,
}

impl OwnershipState {
    /// Reads both files from `revision`. A missing ownership file, or a missing
    /// owners file while owners are validated, is fatal.
    pub fn load(vcs: &dyn Vcs, revision: &str, options: &CheckOptions) -> Result<Self> {
        let candidates: Vec<&str> = match &options.codeowners_path {
            Some(path) => vec![path.as_str()],
            None => DEFAULT_CODEOWNERS_LOCATIONS.to_vec(),
        };

        let mut found = None;
        for path in &candidates {
            if let Some(content) = vcs.read_blob(revision, path)? {
                found = Some((path.to_string(), content));
                break;
            }
        }
        let Some((codeowners_path, content)) = found else {
            return Err(CheckError::MissingCodeowners {
                revision: revision.to_string(),
                paths: candidates.join(", "),
            });
        };
        log::debug!("loaded {codeowners_path} at {revision}");

        let owners = match vcs.read_blob(revision, &options.owners_path)? {
            Some(content) => OwnersList::parse(&content),
            None if options.validate_owners => {
                return Err(CheckError::MissingOwners {
                    revision: revision.to_string(),
                    path: options.owners_path.clone(),
                })
            }
            None => OwnersList::default(),
        };

        Ok(Self {
            codeowners: Group::parse(&content),
            codeowners_path,
            owners,
            owners_path: options.owners_path.clone(),
            validate_owners: options.validate_owners,
        })
    }
}

/// Hooks fired while checks run, in detection order.
pub trait CheckObserver {
    fn unowned_file(&self, _path: &str) {}

    fn useless_pattern(&self, _rule: &PatternRule) {}
}

pub struct NoopObserver;

impl CheckObserver for NoopObserver {}

/// Runs the four consistency checks against one snapshot of the repository.
///
/// Every check is computed once and memoized. Build a new checker after
/// writing to the ownership file.
pub struct Checker<'v> {
    vcs: &'v dyn Vcs,
    from: String,
    to: String,
    state: OwnershipState,
    observer: Box<dyn CheckObserver + 'v>,
    added_files: OnceCell<Vec<String>>,
    missing_reference: OnceCell<Vec<String>>,
    useless_pattern: OnceCell<Vec<PatternRule>>,
    invalid_owner: OnceCell<Vec<(String, PatternRule)>>,
    unrecognized_line: OnceCell<Vec<UnrecognizedLine>>,
}

impl<'v> Checker<'v> {
    /// Verifies both revisions and loads the files from `to`.
    pub fn load(
        vcs: &'v dyn Vcs,
        from: &str,
        to: &str,
        options: &CheckOptions,
    ) -> Result<Self> {
        vcs.verify_revision(from)?;
        vcs.verify_revision(to)?;
        let state = OwnershipState::load(vcs, to, options)?;
        Ok(Self::from_state(vcs, from, to, state))
    }

    /// Checks an already loaded (possibly edited) state.
    pub fn from_state(
        vcs: &'v dyn Vcs,
        from: impl Into<String>,
        to: impl Into<String>,
        state: OwnershipState,
    ) -> Self {
        Self {
            vcs,
            from: from.into(),
            to: to.into(),
            state,
            observer: Box::new(NoopObserver),
            added_files: OnceCell::new(),
            missing_reference: OnceCell::new(),
            useless_pattern: OnceCell::new(),
            invalid_owner: OnceCell::new(),
            unrecognized_line: OnceCell::new(),
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn CheckObserver + 'v>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> &OwnershipState {
        &self.state
    }

    pub fn into_state(self) -> OwnershipState {
        self.state
    }

    pub fn from_revision(&self) -> &str {
        &self.from
    }

    pub fn to_revision(&self) -> &str {
        &self.to
    }

    /// Files added between `from` and `to`, in diff order.
    pub fn added_files(&self) -> Result<&[String]> {
        self.added_files
            .get_or_try_init(|| {
                let changes = self.vcs.diff(&self.from, &self.to)?;
                Ok::<_, CheckError>(
                    changes
                        .into_iter()
                        .filter(|change| change.status == ChangeStatus::Added)
                        .map(|change| change.path)
                        .collect(),
                )
            })
            .map(Vec::as_slice)
    }

    /// Whether any rule owns `file`. Notifies the observer when none does.
    pub fn defined_owner(&self, file: &str) -> bool {
        if self.state.codeowners.defined_owner(file) {
            return true;
        }
        self.observer.unowned_file(file);
        false
    }

    pub fn missing_reference(&self) -> Result<&[String]> {
        self.missing_reference
            .get_or_try_init(|| {
                let added = self.added_files()?;
                Ok::<_, CheckError>(
                    added
                        .iter()
                        .filter(|file| !self.defined_owner(file))
                        .cloned()
                        .collect(),
                )
            })
            .map(Vec::as_slice)
    }

    pub fn useless_pattern(&self) -> Result<&[PatternRule]> {
        self.useless_pattern
            .get_or_try_init(|| {
                let mut useless = Vec::new();
                for rule in self.state.codeowners.rules() {
                    let files = self.vcs.list_tracked_files(&self.to, rule.pattern())?;
                    if files.is_empty() {
                        self.observer.useless_pattern(rule);
                        useless.push(rule.clone());
                    }
                }
                Ok::<_, CheckError>(useless)
            })
            .map(Vec::as_slice)
    }

    pub fn invalid_owner(&self) -> &[(String, PatternRule)] {
        self.invalid_owner.get_or_init(|| {
            if !self.state.validate_owners {
                return Vec::new();
            }
            self.state
                .owners
                .invalid_owners(&self.state.codeowners)
                .into_iter()
                .map(|(owner, rule)| (owner, rule.clone()))
                .collect()
        })
    }

    pub fn unrecognized_line(&self) -> &[UnrecognizedLine] {
        self.unrecognized_line
            .get_or_init(|| self.state.codeowners.unrecognized().cloned().collect())
    }

    /// All findings: missing references, useless patterns, invalid owners,
    /// then unrecognized lines.
    pub fn findings(&self) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        findings.extend(
            self.missing_reference()?
                .iter()
                .map(|file| Finding::MissingReference { file: file.clone() }),
        );
        findings.extend(
            self.useless_pattern()?
                .iter()
                .map(|rule| Finding::UselessPattern { rule: rule.clone() }),
        );
        findings.extend(
            self.invalid_owner()
                .iter()
                .map(|(owner, rule)| Finding::InvalidOwner {
                    owner: owner.clone(),
                    rule: rule.clone(),
                }),
        );
        findings.extend(
            self.unrecognized_line()
                .iter()
                .map(|line| Finding::UnrecognizedLine { line: line.clone() }),
        );
        Ok(findings)
    }

    pub fn is_consistent(&self) -> Result<bool> {
        Ok(self.missing_reference()?.is_empty()
            && self.useless_pattern()?.is_empty()
            && self.invalid_owner().is_empty()
            && self.unrecognized_line().is_empty())
    }

    /// Changed files per owner, restricted to the owner's patterns. With
    /// `owner` set only that owner is reported.
    pub fn changes_with_ownership(
        &self,
        owner: Option<&str>,
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let mut changes = BTreeMap::new();
        for (own, patterns) in self.state.codeowners.patterns_by_owner() {
            if owner.is_some_and(|wanted| wanted != own) {
                continue;
            }
            let files = self
                .vcs
                .diff_paths(&self.from, &self.to, &patterns)?
                .into_iter()
                .map(|change| change.path)
                .collect();
            changes.insert(own, files);
        }
        Ok(changes)
    }
}
