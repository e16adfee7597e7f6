use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use codeowners_model::Pattern;
use serde::Serialize;

use crate::error::VcsError;

/// Status letter of a `git diff --name-status` entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
    Unknown,
}

impl ChangeStatus {
    pub fn from_letter(letter: u8) -> Self {
        match letter {
            b'A' => Self::Added,
            b'M' => Self::Modified,
            b'D' => Self::Deleted,
            b'R' => Self::Renamed,
            b'C' => Self::Copied,
            b'T' => Self::TypeChanged,
            _ => Self::Unknown,
        }
    }
}

/// One changed path between two revisions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Change {
    pub path: String,
    pub status: ChangeStatus,
}

/// Version-control operations the checker and the reconciliation session need.
pub trait Vcs {
    /// Root of the work tree; relative paths are resolved against it.
    fn work_tree(&self) -> &Path;

    fn verify_revision(&self, revision: &str) -> Result<(), VcsError>;

    fn diff(&self, from: &str, to: &str) -> Result<Vec<Change>, VcsError>;

    /// Diff restricted to `pathspecs`. No pathspecs means no changes.
    fn diff_paths(
        &self,
        from: &str,
        to: &str,
        pathspecs: &[String],
    ) -> Result<Vec<Change>, VcsError>;

    fn tracked_files(&self, revision: &str) -> Result<Vec<String>, VcsError>;

    /// Tracked files at `revision` owned by `pattern`.
    fn list_tracked_files(
        &self,
        revision: &str,
        pattern: &Pattern,
    ) -> Result<Vec<String>, VcsError> {
        Ok(self
            .tracked_files(revision)?
            .into_iter()
            .filter(|path| pattern.matches(path))
            .collect())
    }

    /// Content of `path` at `revision`, `None` when the path does not exist there.
    fn read_blob(&self, revision: &str, path: &str) -> Result<Option<String>, VcsError>;

    fn write_file(&self, path: &str, contents: &str) -> Result<(), VcsError> {
        let target = self.work_tree().join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, contents)?;
        Ok(())
    }

    fn stage(&self, path: &str) -> Result<(), VcsError>;

    fn commit(&self, message: &str) -> Result<(), VcsError>;
}

/// [`Vcs`] backed by the `git` executable.
pub struct GitCli {
    work_tree: PathBuf,
    tracked: RefCell<HashMap<String, Vec<String>>>,
}

impl GitCli {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VcsError> {
        let path = path.as_ref();
        let output = run_git(path, &["rev-parse", "--show-toplevel"])?;
        if !output.status.success() {
            return Err(VcsError::NotARepository(path.display().to_string()));
        }
        let top = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if top.is_empty() {
            return Err(VcsError::NotARepository(path.display().to_string()));
        }
        Ok(Self {
            work_tree: PathBuf::from(top),
            tracked: RefCell::new(HashMap::new()),
        })
    }

    fn git(&self, args: &[&str]) -> Result<Vec<u8>, VcsError> {
        let output = run_git(&self.work_tree, args)?;
        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    fn with_tracked<T>(
        &self,
        revision: &str,
        f: impl FnOnce(&[String]) -> T,
    ) -> Result<T, VcsError> {
        if let Some(files) = self.tracked.borrow().get(revision) {
            return Ok(f(files));
        }
        let stdout = self.git(&["ls-tree", "-r", "--name-only", "-z", revision])?;
        let files: Vec<String> = split_nul(&stdout)
            .map(|path| String::from_utf8_lossy(path).into_owned())
            .collect();
        log::debug!("{} tracked files at {revision}", files.len());
        let result = f(&files);
        self.tracked
            .borrow_mut()
            .insert(revision.to_string(), files);
        Ok(result)
    }
}

impl Vcs for GitCli {
    fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    fn verify_revision(&self, revision: &str) -> Result<(), VcsError> {
        let spec = format!("{revision}^{{commit}}");
        let output = run_git(&self.work_tree, &["rev-parse", "--verify", "--quiet", &spec])?;
        if output.status.success() {
            Ok(())
        } else {
            Err(VcsError::UnknownRevision(revision.to_string()))
        }
    }

    fn diff(&self, from: &str, to: &str) -> Result<Vec<Change>, VcsError> {
        let stdout = self.git(&["diff", "--name-status", "-z", "--no-color", from, to])?;
        Ok(parse_name_status(&stdout))
    }

    fn diff_paths(
        &self,
        from: &str,
        to: &str,
        pathspecs: &[String],
    ) -> Result<Vec<Change>, VcsError> {
        if pathspecs.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = vec!["diff", "--name-status", "-z", "--no-color", from, to, "--"];
        args.extend(pathspecs.iter().map(String::as_str));
        let stdout = self.git(&args)?;
        Ok(parse_name_status(&stdout))
    }

    fn tracked_files(&self, revision: &str) -> Result<Vec<String>, VcsError> {
        self.with_tracked(revision, <[String]>::to_vec)
    }

    fn list_tracked_files(
        &self,
        revision: &str,
        pattern: &Pattern,
    ) -> Result<Vec<String>, VcsError> {
        self.with_tracked(revision, |files| {
            files
                .iter()
                .filter(|path| pattern.matches(path))
                .cloned()
                .collect()
        })
    }

    fn read_blob(&self, revision: &str, path: &str) -> Result<Option<String>, VcsError> {
        let object = format!("{revision}:{path}");
        let exists = run_git(&self.work_tree, &["cat-file", "-e", &object])?;
        if !exists.status.success() {
            return Ok(None);
        }
        let stdout = self.git(&["cat-file", "blob", &object])?;
        String::from_utf8(stdout)
            .map(Some)
            .map_err(|_| VcsError::InvalidUtf8(object))
    }

    fn stage(&self, path: &str) -> Result<(), VcsError> {
        self.git(&["add", "--", path])?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<(), VcsError> {
        self.git(&["commit", "--quiet", "-m", message])?;
        Ok(())
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<Output, VcsError> {
    log::debug!("git -C {} {}", dir.display(), args.join(" "));
    Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map_err(VcsError::Spawn)
}

fn split_nul(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    bytes.split(|b| *b == 0).filter(|s| !s.is_empty())
}

/// Parses `git diff --name-status -z`. Renames and copies carry two paths;
/// the entry is reported under the new one.
fn parse_name_status(stdout: &[u8]) -> Vec<Change> {
    let tokens: Vec<&[u8]> = split_nul(stdout).collect();
    let mut changes = Vec::new();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let status = tokens[idx];
        idx = idx.saturating_add(1);
        let Some(first) = status.first().copied() else {
            continue;
        };
        let status = ChangeStatus::from_letter(first);

        let paths = if matches!(status, ChangeStatus::Renamed | ChangeStatus::Copied) {
            2
        } else {
            1
        };
        if idx + paths > tokens.len() {
            break;
        }
        let path = tokens[idx + paths - 1];
        idx += paths;

        changes.push(Change {
            path: String::from_utf8_lossy(path).into_owned(),
            status,
        });
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_status_with_renames() {
        let raw = b"A\0lib/new.rb\0M\0README.md\0R100\0old.rb\0moved.rb\0D\0gone.rb\0";
        let changes = parse_name_status(raw);
        assert_eq!(
            changes,
            vec![
                Change {
                    path: "lib/new.rb".into(),
                    status: ChangeStatus::Added
                },
                Change {
                    path: "README.md".into(),
                    status: ChangeStatus::Modified
                },
                Change {
                    path: "moved.rb".into(),
                    status: ChangeStatus::Renamed
                },
                Change {
                    path: "gone.rb".into(),
                    status: ChangeStatus::Deleted
                },
            ]
        );
    }

    #[test]
    fn truncated_output_is_ignored() {
        assert!(parse_name_status(b"A\0").is_empty());
        assert_eq!(parse_name_status(b"X\0weird\0")[0].status, ChangeStatus::Unknown);
    }
}
