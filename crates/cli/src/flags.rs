use clap::ValueEnum;
use codeowners_check::CommitPolicy;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum CommitFlag {
    Always,
    Ask,
    Never,
}

impl CommitFlag {
    pub(crate) const fn as_domain(self) -> CommitPolicy {
        match self {
            CommitFlag::Always => CommitPolicy::Always,
            CommitFlag::Ask => CommitPolicy::Ask,
            CommitFlag::Never => CommitPolicy::Never,
        }
    }
}
