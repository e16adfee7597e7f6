use std::path::{Path, PathBuf};

use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use codeowners_check::{
    Checker, FuzzyPathSuggester, GitCli, PatternSuggester, ReconcileError, Reconciler,
    SessionOutcome, Vcs,
};

use crate::config::{Overrides, Settings};
use crate::flags::CommitFlag;
use crate::prompt::{FuzzySelectSuggester, TerminalPrompt};
use crate::report::LogObserver;

mod config;
mod flags;
mod prompt;
mod report;

#[derive(Parser)]
#[command(name = "codeowners-checker")]
#[command(about = "Keeps a repository's CODEOWNERS file consistent", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check CODEOWNERS consistency and fix findings interactively
    Check(CheckArgs),

    /// List changed files grouped by owner
    Filter(FilterArgs),
}

#[derive(Args)]
struct RevisionArgs {
    /// Base revision [default: origin/master]
    #[arg(long, env = "CODEOWNERS_CHECKER_FROM")]
    from: Option<String>,

    /// Candidate revision [default: HEAD]
    #[arg(long, env = "CODEOWNERS_CHECKER_TO")]
    to: Option<String>,
}

#[derive(Args)]
struct CheckArgs {
    /// Repository path
    #[arg(default_value = ".")]
    repo: PathBuf,

    #[command(flatten)]
    revisions: RevisionArgs,

    /// Report findings without prompting
    #[arg(long)]
    no_interactive: bool,

    /// Output the report as JSON (implies --no-interactive)
    #[arg(long)]
    json: bool,

    /// Whether to commit the session's edits [default: ask]
    #[arg(long, value_enum)]
    commit: Option<CommitFlag>,

    /// Pick pattern replacements from a fuzzy finder
    #[arg(long)]
    fuzzy_select: bool,

    /// Ownership file path, relative to the repository root
    #[arg(long)]
    codeowners: Option<String>,

    /// Owners list path, relative to the repository root
    #[arg(long)]
    owners: Option<String>,

    /// Skip checking owners against the owners list
    #[arg(long)]
    no_validate_owners: bool,
}

impl CheckArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            from: self.revisions.from.clone(),
            to: self.revisions.to.clone(),
            codeowners_path: self.codeowners.clone(),
            owners_path: self.owners.clone(),
            no_validate_owners: self.no_validate_owners,
            commit: self.commit.map(CommitFlag::as_domain),
        }
    }
}

#[derive(Args)]
struct FilterArgs {
    /// Repository path
    #[arg(default_value = ".")]
    repo: PathBuf,

    /// Only report this owner
    owner: Option<String>,

    #[command(flatten)]
    revisions: RevisionArgs,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // stdout is reserved for the JSON document
    let json_output = match &cli.command {
        Commands::Check(args) => args.json,
        Commands::Filter(args) => args.json,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let consistent = match cli.command {
        Commands::Check(args) => run_check(args)?,
        Commands::Filter(args) => {
            run_filter(args)?;
            true
        }
    };
    if !consistent {
        std::process::exit(1);
    }

    Ok(())
}

fn open_repo(path: &Path) -> Result<GitCli> {
    GitCli::open(path).with_context(|| format!("Failed to open repository {}", path.display()))
}

/// Returns whether the repository ends up consistent.
fn run_check(args: CheckArgs) -> Result<bool> {
    let vcs = open_repo(&args.repo)?;
    let settings = Settings::load(vcs.work_tree(), &args.overrides())?;
    log::debug!("checking {}..{}", settings.from, settings.to);

    let checker = Checker::load(&vcs, &settings.from, &settings.to, &settings.check_options())
        .context("Failed to load ownership files")?
        .with_observer(Box::new(LogObserver));
    let findings = checker.findings().context("Consistency check failed")?;

    if args.json {
        println!("{}", report::render_json(&findings)?);
        return Ok(findings.is_empty());
    }

    let interactive = !args.no_interactive && console::user_attended();
    if findings.is_empty() || !interactive {
        print!("{}", report::render_findings(&findings));
        return Ok(findings.is_empty());
    }
    log::info!("{} findings to review", findings.len());

    let mut state = checker.into_state();
    let mut prompt = TerminalPrompt::new();
    let suggester = FuzzyPathSuggester::from_vcs(&vcs, &settings.to)
        .context("Failed to list tracked files")?;
    let mut suggester: Box<dyn PatternSuggester> = if args.fuzzy_select {
        Box::new(FuzzySelectSuggester::new(suggester))
    } else {
        Box::new(suggester)
    };

    let session = Reconciler::new(&vcs, &mut prompt, suggester.as_mut())
        .commit_policy(settings.commit)
        .run(&findings, &mut state);
    let session = match session {
        Ok(session) => session,
        Err(err) => {
            if let ReconcileError::Persist { unsaved, .. } = &err {
                eprint!("{}", report::render_unsaved(unsaved));
            }
            return Err(err).context("Reconciliation session failed");
        }
    };
    if session.outcome == SessionOutcome::Quit {
        log::info!("session ended early after {} prompts", session.presented);
    }
    if session.committed {
        log::info!("changes committed");
    }

    let recheck = Checker::from_state(&vcs, &settings.from, &settings.to, state)
        .with_observer(Box::new(LogObserver));
    let remaining = recheck.findings().context("Consistency re-check failed")?;
    print!("{}", report::render_findings(&remaining));
    Ok(remaining.is_empty())
}

fn run_filter(args: FilterArgs) -> Result<()> {
    let vcs = open_repo(&args.repo)?;
    let overrides = Overrides {
        from: args.revisions.from.clone(),
        to: args.revisions.to.clone(),
        no_validate_owners: true,
        ..Overrides::default()
    };
    let settings = Settings::load(vcs.work_tree(), &overrides)?;

    let checker = Checker::load(&vcs, &settings.from, &settings.to, &settings.check_options())
        .context("Failed to load ownership files")?;
    let changes = checker
        .changes_with_ownership(args.owner.as_deref())
        .context("Failed to diff revisions")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
    } else {
        print!("{}", report::render_changes(&changes));
    }
    Ok(())
}
