//! Repository mutation port
//!
//! The version manager and the workflows depend only on the [Repository]
//! trait: a small capability set for inspecting and mutating a checkout.
//!
//! # Overview
//!
//! - [native::NativeGit]: drives the `git` executable as a subprocess
//! - [repository::Git2Repository]: drives libgit2 in-process via `git2`
//! - [mock::MockRepository]: in-memory implementation for tests
//!
//! Both real backends produce the same refs and the same remote state; which
//! one is used is a configuration choice ([crate::config::Backend]).
//!
//! Every call is synchronous and surfaces its failure exactly once; there is
//! no automatic retry.

pub mod mock;
pub mod native;
pub mod repository;

pub use mock::MockRepository;
pub use native::NativeGit;
pub use repository::Git2Repository;

use std::path::Path;

use crate::config::{Backend, GitConfig};
use crate::domain::SemVer;
use crate::error::Result;

/// Prefix marking commits, tags and merges made by this tool
pub const BOT_PREFIX: &str = "[Bot] ";

/// Attribute a message to the bot
pub fn bot_message(message: &str) -> String {
    format!("{}{}", BOT_PREFIX, message)
}

/// Message of the annotated tag created for a release
pub fn tag_message(version: &SemVer) -> String {
    bot_message(&format!("Release {}: create tag", version))
}

/// Message of the merge commit created when merging `branch`
pub fn merge_message(branch: &str) -> String {
    bot_message(&format!("merge {}", branch))
}

/// Capability set for inspecting and mutating a version-control checkout
///
/// ## Error Handling
///
/// Every method fails with a repository error ([crate::error::VersionError::Repository]
/// or [crate::error::VersionError::Git]) carrying the captured error text.
/// `merge` fails with [crate::error::VersionError::MergeConflict] when the
/// merge does not complete cleanly.
pub trait Repository {
    /// Name of the checked-out branch
    ///
    /// Fails with [crate::error::VersionError::DetachedHead] when no branch
    /// is checked out.
    fn current_branch(&self) -> Result<String>;

    /// Stage a path (relative to the repository root) or `"."` for everything
    fn stage(&self, pathspec: &str) -> Result<()>;

    /// Commit staged changes; fails when nothing is staged
    ///
    /// Implementations prefix the message with [BOT_PREFIX].
    fn commit(&self, message: &str) -> Result<()>;

    /// Create an annotated tag named after the version's canonical text
    fn tag(&self, version: &SemVer) -> Result<()>;

    /// Switch to a branch, creating it from `<remote>/<branch>` when it does
    /// not exist locally
    fn checkout(&self, branch: &str) -> Result<()>;

    /// Merge a branch into the current one without editing the message
    fn merge(&self, branch: &str) -> Result<()>;

    /// Push all branches and all tags to the configured remote
    ///
    /// A no-op reporting success when pushing is disabled.
    fn push(&self) -> Result<()>;

    /// Working tree root
    fn workdir(&self) -> &Path;
}

impl<R: Repository + ?Sized> Repository for Box<R> {
    fn current_branch(&self) -> Result<String> {
        (**self).current_branch()
    }

    fn stage(&self, pathspec: &str) -> Result<()> {
        (**self).stage(pathspec)
    }

    fn commit(&self, message: &str) -> Result<()> {
        (**self).commit(message)
    }

    fn tag(&self, version: &SemVer) -> Result<()> {
        (**self).tag(version)
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        (**self).checkout(branch)
    }

    fn merge(&self, branch: &str) -> Result<()> {
        (**self).merge(branch)
    }

    fn push(&self) -> Result<()> {
        (**self).push()
    }

    fn workdir(&self) -> &Path {
        (**self).workdir()
    }
}

/// Open the configured backend for the repository containing `path`
pub fn open(path: &Path, config: &GitConfig) -> Result<Box<dyn Repository>> {
    match config.backend {
        Backend::Native => Ok(Box::new(NativeGit::open(path, config)?)),
        Backend::Libgit2 => Ok(Box::new(Git2Repository::open(path, config)?)),
    }
}
