//! Version lifecycle on top of a repository port.
//!
//! [VersionManager] owns the persisted version value. The version file is
//! re-read at the start of every public operation because the branch (and
//! with it the file) may change between workflow steps.

use std::path::Path;

use tracing::info;

use crate::config::Config;
use crate::domain::{BranchPolicy, SemVer, SNAPSHOT};
use crate::error::Result;
use crate::git::Repository;
use crate::properties::VersionFile;

/// Message of the commit recording a new version
pub fn update_message(version: &SemVer) -> String {
    format!("Update version to {}", version)
}

pub struct VersionManager<'a, R: Repository + ?Sized> {
    repo: &'a R,
    file: VersionFile,
    policy: BranchPolicy,
    label: String,
}

impl<'a, R: Repository + ?Sized> VersionManager<'a, R> {
    /// Manager using the default `SNAPSHOT` label
    pub fn new(repo: &'a R, file: VersionFile, policy: BranchPolicy) -> Self {
        VersionManager {
            repo,
            file,
            policy,
            label: SNAPSHOT.to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Build from configuration; the version file resolves against the
    /// repository's working directory
    pub fn from_config(repo: &'a R, config: &Config) -> Result<Self> {
        let file = config.version.version_file(repo.workdir());
        let policy = config.branches.policy()?;
        Ok(VersionManager::new(repo, file, policy).with_label(config.version.label.clone()))
    }

    pub fn repository(&self) -> &'a R {
        self.repo
    }

    pub fn version_file(&self) -> &VersionFile {
        &self.file
    }

    pub fn current_version(&self) -> Result<SemVer> {
        self.file.read()
    }

    /// Snapshot that `branch` would move the release `current` to, if any
    pub fn next_snapshot(&self, current: &SemVer, branch: &str) -> Result<Option<SemVer>> {
        let next = self.policy.classify(branch).apply(current)?;
        Ok(next.map(|next| next.with_label(self.label.as_str())))
    }

    /// Rewrite the version line, then stage and commit the file
    pub fn update_version(&self, target: &SemVer) -> Result<SemVer> {
        self.file.write(target)?;
        self.repo.stage(&self.relative_path())?;
        self.repo.commit(&update_message(target))?;
        Ok(target.clone())
    }

    /// Move a release version to the branch's next snapshot.
    ///
    /// Returns `None` when the version is already a snapshot or the branch
    /// does not ask for a bump.
    pub fn snapshot(&self) -> Result<Option<SemVer>> {
        let current = self.current_version()?;
        if !current.is_release() {
            info!("{} is already a pre-release, nothing to do", current);
            return Ok(None);
        }

        let branch = self.repo.current_branch()?;
        let Some(next) = self.next_snapshot(&current, &branch)? else {
            info!("Branch '{}' does not bump {}, nothing to do", branch, current);
            return Ok(None);
        };

        info!("Snapshot on '{}': {} -> {}", branch, current, next);
        self.update_version(&next).map(Some)
    }

    /// Strip the pre-release label. Returns `None` on a release version.
    pub fn release(&self) -> Result<Option<SemVer>> {
        let current = self.current_version()?;
        if current.is_release() {
            info!("{} is already a release, nothing to do", current);
            return Ok(None);
        }

        let release = current.without_label();
        info!("Release: {} -> {}", current, release);
        self.update_version(&release).map(Some)
    }

    // Pathspec relative to the repository root, with forward slashes
    fn relative_path(&self) -> String {
        let path = self.file.path();
        let relative = path.strip_prefix(self.repo.workdir()).unwrap_or(path);
        to_pathspec(relative)
    }
}

fn to_pathspec(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
