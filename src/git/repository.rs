use git2::build::CheckoutBuilder;
use git2::{
    BranchType, Commit, Cred, CredentialType, ErrorCode, IndexAddOption, ObjectType, PushOptions,
    RemoteCallbacks, Repository as Git2Repo, Signature,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::GitConfig;
use crate::domain::SemVer;
use crate::error::{Result, VersionError};
use crate::git::{bot_message, merge_message, tag_message, Repository};

const BOT_NAME: &str = "version-support[bot]";
const BOT_EMAIL: &str = "version-support@localhost";

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
    root: PathBuf,
    remote: String,
    skip_push: bool,
    ssh_key: Option<PathBuf>,
    ssh_passphrase: Option<String>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P, config: &GitConfig) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;
        Self::from_git2(repo, config)
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo, config: &GitConfig) -> Result<Self> {
        let root = repo
            .workdir()
            .ok_or_else(|| VersionError::config("Bare repositories have no working tree"))?
            .to_path_buf();

        Ok(Git2Repository {
            repo,
            root,
            remote: config.remote.clone(),
            skip_push: config.skip_push,
            ssh_key: config.ssh_key.clone(),
            ssh_passphrase: config.ssh_passphrase.clone(),
        })
    }

    fn signature(&self) -> Result<Signature<'static>> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig),
            Err(_) => Ok(Signature::now(BOT_NAME, BOT_EMAIL)?),
        }
    }

    fn head_commit(&self) -> Result<Option<Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if e.code() == ErrorCode::UnbornBranch => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a local branch tracking `<remote>/<branch>`
    fn create_tracking_branch(&self, branch: &str) -> Result<git2::Branch<'_>> {
        let upstream = format!("{}/{}", self.remote, branch);
        let remote_branch = self
            .repo
            .find_branch(&upstream, BranchType::Remote)
            .map_err(|e| {
                VersionError::repository(
                    format!("checkout -f -B {} {}", branch, upstream),
                    None,
                    e.message().to_string(),
                )
            })?;

        let commit = remote_branch.get().peel_to_commit()?;
        let mut local = self.repo.branch(branch, &commit, true)?;
        local.set_upstream(Some(upstream.as_str()))?;
        Ok(local)
    }

    fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut candidates: Vec<PathBuf> = self.ssh_key.iter().cloned().collect();
        if let Some(home) = dirs::home_dir() {
            for name in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                let path = home.join(".ssh").join(name);
                if path.exists() {
                    candidates.push(path);
                }
            }
        }
        let passphrase = self.ssh_passphrase.as_deref();
        let mut attempt = 0usize;

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |_url, username_from_url, allowed_types| {
            let username = username_from_url.unwrap_or("git");
            let current = attempt;
            attempt += 1;

            if allowed_types.contains(CredentialType::SSH_KEY) {
                if let Some(key) = candidates.get(current) {
                    return Cred::ssh_key(username, None, key, passphrase);
                }
                if current == candidates.len() {
                    return Cred::ssh_key_from_agent(username);
                }
                return Err(git2::Error::from_str("no usable SSH credentials"));
            }

            if current == 0 {
                Cred::default()
            } else {
                Err(git2::Error::from_str("authentication failed"))
            }
        });

        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => {
                warn!("GIT: Could not update reference {}: {}", refname, status);
                Err(git2::Error::from_str(&format!(
                    "Push rejected for {}: {}",
                    refname, status
                )))
            }
            None => Ok(()),
        });

        callbacks
    }
}

impl Repository for Git2Repository {
    fn current_branch(&self) -> Result<String> {
        if self.repo.head_detached()? {
            return Err(VersionError::DetachedHead);
        }
        // Read the symbolic target so unborn branches resolve too
        let head = self.repo.find_reference("HEAD")?;
        let target = head.symbolic_target().ok_or(VersionError::DetachedHead)?;
        Ok(target.strip_prefix("refs/heads/").unwrap_or(target).to_string())
    }

    fn stage(&self, pathspec: &str) -> Result<()> {
        info!("GIT: add {}", pathspec);
        let spec = if pathspec == "." { "*" } else { pathspec };
        let mut index = self.repo.index()?;
        index.add_all([spec].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all([spec].iter(), None)?;
        index.write()?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        let message = bot_message(message);
        info!("GIT: commit -m {}", message);

        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let parent = self.head_commit()?;

        if parent.as_ref().map(|p| p.tree_id()) == Some(tree_id) {
            return Err(VersionError::repository(
                format!("commit -m {}", message),
                Some(1),
                "nothing to commit, working tree clean",
            ));
        }

        let sig = self.signature()?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, &message, &tree, &parents)?;
        Ok(())
    }

    fn tag(&self, version: &SemVer) -> Result<()> {
        let name = version.to_string();
        info!("GIT: tag -a {}", name);
        let target = self.repo.head()?.peel(ObjectType::Commit)?;
        let sig = self.signature()?;
        self.repo
            .tag(&name, &target, &sig, &tag_message(version), false)?;
        Ok(())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        info!("GIT: Try checkout local {}", branch);
        let mut opts = CheckoutBuilder::new();
        let local = match self.repo.find_branch(branch, BranchType::Local) {
            Ok(local) => local,
            Err(e) if e.code() == ErrorCode::NotFound => {
                info!("GIT: Failed. Try checkout remote {}/{}", self.remote, branch);
                opts.force();
                self.create_tracking_branch(branch)?
            }
            Err(e) => return Err(e.into()),
        };

        let reference = local.into_reference();
        let refname = reference
            .name()
            .ok_or_else(|| VersionError::repository(format!("checkout {}", branch), None, "invalid branch name"))?
            .to_string();
        let target = reference.peel(ObjectType::Commit)?;

        self.repo.checkout_tree(&target, Some(&mut opts))?;
        self.repo.set_head(&refname)?;
        Ok(())
    }

    fn merge(&self, branch: &str) -> Result<()> {
        info!("GIT: merge {} --no-edit", branch);
        let reference = match self.repo.find_branch(branch, BranchType::Local) {
            Ok(local) => local.into_reference(),
            Err(_) => self.repo.resolve_reference_from_short_name(branch).map_err(|e| {
                VersionError::repository(format!("merge {}", branch), None, e.message().to_string())
            })?,
        };
        let theirs = self.repo.reference_to_annotated_commit(&reference)?;
        let (analysis, _) = self.repo.merge_analysis(&[&theirs])?;

        if analysis.is_up_to_date() {
            info!("GIT: Already up to date.");
            return Ok(());
        }

        if analysis.is_fast_forward() {
            let target = self.repo.find_object(theirs.id(), None)?;
            self.repo
                .checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;
            self.repo
                .head()?
                .set_target(theirs.id(), &merge_message(branch))?;
            return Ok(());
        }

        let mut opts = CheckoutBuilder::new();
        opts.safe().allow_conflicts(true);
        self.repo.merge(&[&theirs], None, Some(&mut opts))?;

        let mut index = self.repo.index()?;
        if index.has_conflicts() {
            let paths: Vec<String> = index
                .conflicts()?
                .filter_map(|conflict| conflict.ok())
                .filter_map(|conflict| conflict.our.or(conflict.their))
                .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
                .collect();
            // Merge state stays in place for the operator to resolve or abort
            return Err(VersionError::merge_conflict(
                branch,
                format!("CONFLICT in {}", paths.join(", ")),
            ));
        }

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let ours = self.repo.head()?.peel_to_commit()?;
        let their_commit = self.repo.find_commit(theirs.id())?;
        let sig = self.signature()?;
        self.repo.commit(
            Some("HEAD"),
            &sig,
            &sig,
            &merge_message(branch),
            &tree,
            &[&ours, &their_commit],
        )?;
        self.repo.cleanup_state()?;
        Ok(())
    }

    fn push(&self) -> Result<()> {
        if self.skip_push {
            info!("GIT: Skip push!");
            return Ok(());
        }

        let mut remote = self.repo.find_remote(&self.remote).map_err(|e| {
            VersionError::repository(format!("push --all {}", self.remote), None, e.message().to_string())
        })?;

        let mut refspecs = Vec::new();
        for entry in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.get().name() {
                refspecs.push(format!("{0}:{0}", name));
            }
        }
        for tag in self.repo.tag_names(None)?.iter().flatten() {
            refspecs.push(format!("refs/tags/{0}:refs/tags/{0}", tag));
        }

        info!("GIT: push {} ({} refs)", self.remote, refspecs.len());
        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(self.callbacks());
        remote.push(&refspecs, Some(&mut push_options)).map_err(|e| {
            VersionError::repository(
                format!("push --all --tags {}", self.remote),
                None,
                e.message().to_string(),
            )
        })?;
        Ok(())
    }

    fn workdir(&self) -> &Path {
        &self.root
    }
}
