use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use version_support::cli::{self, ReleaseArgs, SnapshotOutcome};
use version_support::config::{self, Backend};
use version_support::git::{self, Repository};
use version_support::manager::VersionManager;
use version_support::{logging, ui};

#[derive(clap::Parser)]
#[command(
    name = "version-support",
    version,
    about = "Branch-driven SNAPSHOT and release management for a version properties file"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(short = 'C', long = "dir", default_value = ".", help = "Run inside this repository")]
    dir: PathBuf,

    #[arg(long, value_enum, help = "Repository backend (overrides the config file)")]
    backend: Option<Backend>,

    #[arg(long, help = "Do everything except contacting the remote")]
    skip_push: bool,

    #[arg(short, long, help = "Log every git command and version change")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current version and branch
    Current,
    /// Move a release version to the branch's next SNAPSHOT and push it
    Snapshot,
    /// Release from the master branch: tag, merge into develop, bump develop
    Release,
    /// Fail unless the branch carries a SNAPSHOT version, correcting it first
    EnforceSnapshot,
}

fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    if let Err(e) = run(args) {
        ui::display_error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = config::load_config(args.config.as_deref(), &args.dir)?;
    if let Some(backend) = args.backend {
        config.git.backend = backend;
    }
    if args.skip_push {
        config.git.skip_push = true;
    }

    let repo = git::open(&args.dir, &config.git)?;
    let manager = VersionManager::from_config(&*repo, &config)?;

    match args.command {
        Command::Current => {
            let branch = repo.current_branch()?;
            ui::display_version(&manager.current_version()?, &branch);
        }
        Command::Snapshot => {
            let before = manager.current_version()?;
            match cli::run_snapshot(&manager)? {
                SnapshotOutcome::Updated(version) => ui::display_success(&format!(
                    "Version set: {}",
                    ui::format_transition(&before, &version)
                )),
                SnapshotOutcome::Skipped(warning) => ui::display_boundary_warning(&warning),
            }
        }
        Command::Release => {
            let release_args = ReleaseArgs::from(&config.branches);
            ui::display_status(&format!(
                "Releasing from '{}' into '{}'",
                release_args.master_branch, release_args.develop_branch
            ));
            let outcome = cli::run_release(&manager, &release_args)?;
            ui::display_release(&outcome, &release_args.develop_branch);
        }
        Command::EnforceSnapshot => {
            let version = cli::run_enforce_snapshot(&manager)?;
            ui::display_success(&format!("{} is a SNAPSHOT version", version));
        }
    }

    if config.git.skip_push {
        ui::display_status("Push skipped (dry run)");
    }
    Ok(())
}
