use std::fs;
use std::path::Path;

use anyhow::{Context as AnyhowContext, Result};
use codeowners_check::{CheckOptions, CommitPolicy, DEFAULT_OWNERS_LOCATION};
use serde::Deserialize;

/// Optional per-repository settings, relative to the work tree.
pub(crate) const CONFIG_FILE: &str = ".github/codeowners-checker.toml";

pub(crate) const DEFAULT_FROM: &str = "origin/master";
pub(crate) const DEFAULT_TO: &str = "HEAD";

/// Keys accepted in [`CONFIG_FILE`]. Every key is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    codeowners_path: Option<String>,
    owners_path: Option<String>,
    validate_owners: Option<bool>,
    from: Option<String>,
    to: Option<String>,
    commit: Option<CommitPolicy>,
}

/// Values given on the command line (environment variables arrive through
/// clap and land here too).
#[derive(Clone, Debug, Default)]
pub(crate) struct Overrides {
    pub(crate) from: Option<String>,
    pub(crate) to: Option<String>,
    pub(crate) codeowners_path: Option<String>,
    pub(crate) owners_path: Option<String>,
    pub(crate) no_validate_owners: bool,
    pub(crate) commit: Option<CommitPolicy>,
}

/// Effective settings: defaults, then the config file, then overrides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) from: String,
    pub(crate) to: String,
    pub(crate) codeowners_path: Option<String>,
    pub(crate) owners_path: String,
    pub(crate) validate_owners: bool,
    pub(crate) commit: CommitPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            from: DEFAULT_FROM.to_string(),
            to: DEFAULT_TO.to_string(),
            codeowners_path: None,
            owners_path: DEFAULT_OWNERS_LOCATION.to_string(),
            validate_owners: true,
            commit: CommitPolicy::Ask,
        }
    }
}

impl Settings {
    pub(crate) fn load(work_tree: &Path, overrides: &Overrides) -> Result<Self> {
        let path = work_tree.join(CONFIG_FILE);
        let contents = if path.is_file() {
            log::debug!("reading settings from {}", path.display());
            Some(
                fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
            )
        } else {
            None
        };
        Self::resolve(contents.as_deref(), overrides)
    }

    pub(crate) fn resolve(config_toml: Option<&str>, overrides: &Overrides) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(config_toml) = config_toml {
            let file: FileConfig =
                toml::from_str(config_toml).with_context(|| format!("Invalid {CONFIG_FILE}"))?;
            settings.apply_file(file);
        }
        settings.apply_overrides(overrides);
        Ok(settings)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(from) = file.from {
            self.from = from;
        }
        if let Some(to) = file.to {
            self.to = to;
        }
        if file.codeowners_path.is_some() {
            self.codeowners_path = file.codeowners_path;
        }
        if let Some(owners_path) = file.owners_path {
            self.owners_path = owners_path;
        }
        if let Some(validate_owners) = file.validate_owners {
            self.validate_owners = validate_owners;
        }
        if let Some(commit) = file.commit {
            self.commit = commit;
        }
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(from) = &overrides.from {
            self.from = from.clone();
        }
        if let Some(to) = &overrides.to {
            self.to = to.clone();
        }
        if overrides.codeowners_path.is_some() {
            self.codeowners_path = overrides.codeowners_path.clone();
        }
        if let Some(owners_path) = &overrides.owners_path {
            self.owners_path = owners_path.clone();
        }
        if overrides.no_validate_owners {
            self.validate_owners = false;
        }
        if let Some(commit) = overrides.commit {
            self.commit = commit;
        }
    }

    pub(crate) fn check_options(&self) -> CheckOptions {
        CheckOptions {
            codeowners_path: self.codeowners_path.clone(),
            owners_path: self.owners_path.clone(),
            validate_owners: self.validate_owners,
        }
    }
}
