//! Multi-step release and snapshot workflows
//!
//! Every workflow is a linear sequence of blocking repository calls: the
//! first failing step aborts the rest. Commits already made stay in place
//! for the operator to inspect; nothing is rolled back.

use tracing::{info, warn};

use crate::boundary::BoundaryWarning;
use crate::config::BranchesConfig;
use crate::domain::SemVer;
use crate::error::{Result, VersionError};
use crate::git::Repository;
use crate::manager::VersionManager;

/// Branch names the release workflow moves between
///
/// Mirrors the `[branches]` configuration but can be built directly, so
/// the workflow can be driven programmatically without a config file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseArgs {
    /// Branch releases are cut from
    pub master_branch: String,

    /// Branch that continues with the next snapshot
    pub develop_branch: String,
}

impl From<&BranchesConfig> for ReleaseArgs {
    fn from(branches: &BranchesConfig) -> Self {
        ReleaseArgs {
            master_branch: branches.master.clone(),
            develop_branch: branches.develop.clone(),
        }
    }
}

/// Result of a release run
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome {
    Released {
        /// The version that was tagged
        release: SemVer,
        /// Where the development branch ended, if it was bumped
        next_snapshot: Option<SemVer>,
    },
    Skipped(BoundaryWarning),
}

/// Result of a standalone snapshot run
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    Updated(SemVer),
    Skipped(BoundaryWarning),
}

/// Cut a release from the master branch.
///
/// Steps, in order:
/// 1. Strip the pre-release label and commit (via [VersionManager::release])
/// 2. Tag the release commit
/// 3. Checkout the development branch
/// 4. Re-apply the release version there so the merge does not conflict
///    on the version line
/// 5. Merge the master branch into development
/// 6. Advance development to its next snapshot
/// 7. Push all branches and tags
/// 8. Checkout the branch the run started on
///
/// Running it on any other branch, or on a release version, is a no-op.
pub fn run_release<R: Repository + ?Sized>(
    manager: &VersionManager<'_, R>,
    args: &ReleaseArgs,
) -> Result<ReleaseOutcome> {
    let repo = manager.repository();
    let branch = repo.current_branch()?;
    if branch != args.master_branch {
        let warning = BoundaryWarning::NotOnReleaseBranch {
            branch,
            release_branch: args.master_branch.clone(),
        };
        warn!("{}", warning);
        return Ok(ReleaseOutcome::Skipped(warning));
    }

    let before = manager.current_version()?;
    if before.is_release() {
        let warning = BoundaryWarning::AlreadyRelease {
            branch,
            version: before.to_string(),
        };
        warn!("{}", warning);
        return Ok(ReleaseOutcome::Skipped(warning));
    }

    let mut after = before.without_label();
    let result = release_steps(manager, args, &branch, &mut after);
    result.map_err(|source| workflow_error("release", &branch, &before, &after, source))
}

fn release_steps<R: Repository + ?Sized>(
    manager: &VersionManager<'_, R>,
    args: &ReleaseArgs,
    origin: &str,
    after: &mut SemVer,
) -> Result<ReleaseOutcome> {
    let repo = manager.repository();

    let release = match manager.release()? {
        Some(release) => release,
        None => {
            // Another writer released between the check and the update
            let version = manager.current_version()?;
            return Ok(ReleaseOutcome::Skipped(BoundaryWarning::AlreadyRelease {
                branch: origin.to_string(),
                version: version.to_string(),
            }));
        }
    };
    repo.tag(&release)?;

    repo.checkout(&args.develop_branch)?;
    if manager.current_version()? != release {
        manager.update_version(&release)?;
    }
    repo.merge(&args.master_branch)?;

    let next_snapshot = manager.snapshot()?;
    if let Some(next) = &next_snapshot {
        *after = next.clone();
    }

    repo.push()?;
    repo.checkout(origin)?;

    info!(
        "Released {} from '{}'; '{}' is at {}",
        release,
        origin,
        args.develop_branch,
        next_snapshot.as_ref().unwrap_or(&release)
    );
    Ok(ReleaseOutcome::Released {
        release,
        next_snapshot,
    })
}

/// Require a pre-release version on the current branch.
///
/// Returns the version unchanged when it is already a snapshot. On a
/// release version the branch's next snapshot is committed and pushed, and
/// the run still fails with [VersionError::PolicyViolation] so that the
/// invoking build stops; the next run then succeeds. A branch without a
/// bump level fails without changing anything.
pub fn run_enforce_snapshot<R: Repository + ?Sized>(
    manager: &VersionManager<'_, R>,
) -> Result<SemVer> {
    let repo = manager.repository();
    let branch = repo.current_branch()?;
    let current = manager.current_version()?;
    if !current.is_release() {
        info!("{} on '{}' is a pre-release", current, branch);
        return Ok(current);
    }

    let planned = manager.next_snapshot(&current, &branch)?;
    let snapshot = manager
        .snapshot()
        .and_then(|snapshot| {
            if snapshot.is_some() {
                repo.push()?;
            }
            Ok(snapshot)
        })
        .map_err(|source| {
            let after = planned.clone().unwrap_or_else(|| current.clone());
            workflow_error("enforce-snapshot", &branch, &current, &after, source)
        })?;

    Err(VersionError::PolicyViolation {
        version: current.to_string(),
        branch,
        snapshot: snapshot.map(|s| s.to_string()),
    })
}

/// Advance a release version to the branch's next snapshot and push it.
pub fn run_snapshot<R: Repository + ?Sized>(
    manager: &VersionManager<'_, R>,
) -> Result<SnapshotOutcome> {
    let repo = manager.repository();
    let branch = repo.current_branch()?;
    let current = manager.current_version()?;

    if !current.is_release() {
        return Ok(SnapshotOutcome::Skipped(BoundaryWarning::AlreadySnapshot {
            branch,
            version: current.to_string(),
        }));
    }
    let Some(planned) = manager.next_snapshot(&current, &branch)? else {
        let warning = BoundaryWarning::NoBumpForBranch {
            branch,
            version: current.to_string(),
        };
        warn!("{}", warning);
        return Ok(SnapshotOutcome::Skipped(warning));
    };

    let updated = manager
        .snapshot()
        .and_then(|snapshot| {
            if snapshot.is_some() {
                repo.push()?;
            }
            Ok(snapshot)
        })
        .map_err(|source| workflow_error("snapshot", &branch, &current, &planned, source))?;

    Ok(match updated {
        Some(version) => SnapshotOutcome::Updated(version),
        None => SnapshotOutcome::Skipped(BoundaryWarning::AlreadySnapshot {
            branch,
            version: current.to_string(),
        }),
    })
}

fn workflow_error(
    workflow: &'static str,
    branch: &str,
    before: &SemVer,
    after: &SemVer,
    source: VersionError,
) -> VersionError {
    VersionError::Workflow {
        workflow,
        branch: branch.to_string(),
        before: before.to_string(),
        after: after.to_string(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::git::mock::{Call, MockRepository, Operation};
    use std::fs;
    use tempfile::TempDir;

    fn setup(branch: &str, version: &str) -> (TempDir, MockRepository) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("gradle.properties"),
            format!("version={}\n", version),
        )
        .unwrap();
        let repo = MockRepository::new(dir.path(), branch);
        repo.track("gradle.properties").unwrap();
        (dir, repo)
    }

    fn args() -> ReleaseArgs {
        ReleaseArgs::from(&BranchesConfig::default())
    }

    #[test]
    fn test_release_args_from_config() {
        let args = args();
        assert_eq!(args.master_branch, "master");
        assert_eq!(args.develop_branch, "develop");
    }

    #[test]
    fn test_release_skips_outside_master() {
        let (_dir, repo) = setup("develop", "1.3.0-SNAPSHOT");
        let manager = VersionManager::from_config(&repo, &Config::default()).unwrap();

        let outcome = run_release(&manager, &args()).unwrap();
        assert!(matches!(
            outcome,
            ReleaseOutcome::Skipped(BoundaryWarning::NotOnReleaseBranch { .. })
        ));
        assert!(repo.calls().is_empty());
    }

    #[test]
    fn test_release_skips_released_version() {
        let (_dir, repo) = setup("master", "1.3.0");
        let manager = VersionManager::from_config(&repo, &Config::default()).unwrap();

        let outcome = run_release(&manager, &args()).unwrap();
        assert!(matches!(
            outcome,
            ReleaseOutcome::Skipped(BoundaryWarning::AlreadyRelease { .. })
        ));
        assert!(repo.calls().is_empty());
    }

    #[test]
    fn test_release_step_order() {
        let (_dir, repo) = setup("master", "1.3.0-SNAPSHOT");
        repo.add_branch("develop", &[("gradle.properties", "version=1.3.0-SNAPSHOT\n")]);
        let manager = VersionManager::from_config(&repo, &Config::default()).unwrap();

        run_release(&manager, &args()).unwrap();

        assert_eq!(
            repo.calls(),
            vec![
                Call::Stage("gradle.properties".to_string()),
                Call::Commit("Update version to 1.3.0".to_string()),
                Call::Tag("1.3.0".to_string()),
                Call::Checkout("develop".to_string()),
                Call::Stage("gradle.properties".to_string()),
                Call::Commit("Update version to 1.3.0".to_string()),
                Call::Merge("master".to_string()),
                Call::Stage("gradle.properties".to_string()),
                Call::Commit("Update version to 1.4.0-SNAPSHOT".to_string()),
                Call::Push,
                Call::Checkout("master".to_string()),
            ]
        );
    }

    #[test]
    fn test_release_skips_reapply_when_develop_matches() {
        let (_dir, repo) = setup("master", "1.3.0-SNAPSHOT");
        repo.add_branch("develop", &[("gradle.properties", "version=1.3.0\n")]);
        let manager = VersionManager::from_config(&repo, &Config::default()).unwrap();

        run_release(&manager, &args()).unwrap();
        let commits: Vec<String> = repo.commits().into_iter().map(|(_, m)| m).collect();
        assert_eq!(
            commits,
            vec![
                "[Bot] Update version to 1.3.0".to_string(),
                "[Bot] Update version to 1.4.0-SNAPSHOT".to_string(),
            ]
        );
    }

    #[test]
    fn test_tag_failure_reports_versions() {
        let (_dir, repo) = setup("master", "1.3.0-SNAPSHOT");
        repo.add_branch("develop", &[("gradle.properties", "version=1.3.0-SNAPSHOT\n")]);
        repo.fail_on(Operation::Tag);
        let manager = VersionManager::from_config(&repo, &Config::default()).unwrap();

        let err = run_release(&manager, &args()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'master'"), "{}", msg);
        assert!(msg.contains("1.3.0-SNAPSHOT -> 1.3.0"), "{}", msg);
        assert!(msg.contains("injected"), "{}", msg);
        assert_eq!(repo.push_count(), 0);
    }

    #[test]
    fn test_enforce_passes_on_snapshot() {
        let (_dir, repo) = setup("feature/x", "1.3.0-SNAPSHOT");
        let manager = VersionManager::from_config(&repo, &Config::default()).unwrap();

        let version = run_enforce_snapshot(&manager).unwrap();
        assert_eq!(version.to_string(), "1.3.0-SNAPSHOT");
        assert!(repo.calls().is_empty());
    }

    #[test]
    fn test_enforce_without_bump_fails_unchanged() {
        let (dir, repo) = setup("feature/x", "1.3.0");
        let manager = VersionManager::from_config(&repo, &Config::default()).unwrap();

        let err = run_enforce_snapshot(&manager).unwrap_err();
        assert!(matches!(
            err,
            VersionError::PolicyViolation { snapshot: None, .. }
        ));
        assert_eq!(
            fs::read_to_string(dir.path().join("gradle.properties")).unwrap(),
            "version=1.3.0\n"
        );
        assert_eq!(repo.push_count(), 0);
    }

    #[test]
    fn test_enforce_push_failure_is_workflow_error() {
        let (_dir, repo) = setup("develop", "1.3.0");
        repo.fail_on(Operation::Push);
        let manager = VersionManager::from_config(&repo, &Config::default()).unwrap();

        let err = run_enforce_snapshot(&manager).unwrap_err();
        assert!(err.is_repository_error());
        assert!(err.to_string().contains("1.3.0 -> 1.4.0-SNAPSHOT"));
    }

    #[test]
    fn test_snapshot_pushes_only_on_change() {
        let (_dir, repo) = setup("develop", "1.2.3");
        let manager = VersionManager::from_config(&repo, &Config::default()).unwrap();

        assert_eq!(
            run_snapshot(&manager).unwrap(),
            SnapshotOutcome::Updated(SemVer::parse("1.3.0-SNAPSHOT").unwrap())
        );
        assert_eq!(repo.push_count(), 1);

        assert!(matches!(
            run_snapshot(&manager).unwrap(),
            SnapshotOutcome::Skipped(BoundaryWarning::AlreadySnapshot { .. })
        ));
        assert_eq!(repo.push_count(), 1);
    }

    #[test]
    fn test_snapshot_without_bump() {
        let (_dir, repo) = setup("feature/x", "1.2.3");
        let manager = VersionManager::from_config(&repo, &Config::default()).unwrap();

        assert!(matches!(
            run_snapshot(&manager).unwrap(),
            SnapshotOutcome::Skipped(BoundaryWarning::NoBumpForBranch { .. })
        ));
        assert!(repo.calls().is_empty());
    }
}
