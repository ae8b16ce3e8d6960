use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::SemVer;
use crate::error::{Result, VersionError};
use crate::git::{bot_message, Repository};

/// A recorded mutation, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Stage(String),
    Commit(String),
    Tag(String),
    Checkout(String),
    Merge(String),
    Push,
}

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Stage,
    Commit,
    Tag,
    Checkout,
    Merge,
    Push,
}

type Files = HashMap<PathBuf, String>;

#[derive(Default)]
struct MockState {
    branch: Option<String>,
    branches: HashMap<String, Files>,
    remote_branches: HashMap<String, Files>,
    tracked: HashSet<PathBuf>,
    staged: bool,
    tags: Vec<String>,
    commits: Vec<(String, String)>,
    calls: Vec<Call>,
    failing: HashSet<Operation>,
    conflict: bool,
}

/// Mock repository for testing without actual git operations
///
/// Works on a real directory so that the version file can be read and
/// rewritten, and keeps one snapshot of the tracked files per branch.
/// Checkout swaps the tracked files on disk; merge never changes files.
pub struct MockRepository {
    root: PathBuf,
    state: RefCell<MockState>,
}

impl MockRepository {
    /// Create a mock checked out on `branch`
    pub fn new(root: impl Into<PathBuf>, branch: &str) -> Self {
        let mut state = MockState {
            branch: Some(branch.to_string()),
            ..MockState::default()
        };
        state.branches.insert(branch.to_string(), Files::new());
        MockRepository {
            root: root.into(),
            state: RefCell::new(state),
        }
    }

    /// Track a file (relative to the root) and record its current content
    /// for the checked-out branch
    pub fn track(&self, relative: impl AsRef<Path>) -> Result<()> {
        let relative = relative.as_ref().to_path_buf();
        let content = fs::read_to_string(self.root.join(&relative))?;
        let mut state = self.state.borrow_mut();
        state.tracked.insert(relative.clone());
        if let Some(branch) = state.branch.clone() {
            state
                .branches
                .entry(branch)
                .or_default()
                .insert(relative, content);
        }
        Ok(())
    }

    /// Add a local branch with the given tracked file contents
    pub fn add_branch(&self, name: &str, files: &[(&str, &str)]) {
        let mut state = self.state.borrow_mut();
        let files = to_files(files);
        state.tracked.extend(files.keys().cloned());
        state.branches.insert(name.to_string(), files);
    }

    /// Add a branch that only exists on the remote
    pub fn add_remote_branch(&self, name: &str, files: &[(&str, &str)]) {
        let mut state = self.state.borrow_mut();
        let files = to_files(files);
        state.tracked.extend(files.keys().cloned());
        state.remote_branches.insert(name.to_string(), files);
    }

    pub fn detach(&self) {
        self.state.borrow_mut().branch = None;
    }

    /// Make every later call of `operation` fail
    pub fn fail_on(&self, operation: Operation) {
        self.state.borrow_mut().failing.insert(operation);
    }

    /// Make merges report a conflict
    pub fn conflict_on_merge(&self) {
        self.state.borrow_mut().conflict = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn tags(&self) -> Vec<String> {
        self.state.borrow().tags.clone()
    }

    /// `(branch, message)` of every commit made
    pub fn commits(&self) -> Vec<(String, String)> {
        self.state.borrow().commits.clone()
    }

    pub fn push_count(&self) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| **call == Call::Push)
            .count()
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.state.borrow().branches.contains_key(name)
    }

    /// Content of a tracked file on a branch (the working tree for the
    /// checked-out branch)
    pub fn file_on_branch(&self, branch: &str, relative: impl AsRef<Path>) -> Option<String> {
        let state = self.state.borrow();
        if state.branch.as_deref() == Some(branch) {
            return fs::read_to_string(self.root.join(relative.as_ref())).ok();
        }
        state
            .branches
            .get(branch)
            .and_then(|files| files.get(relative.as_ref()).cloned())
    }

    fn record(&self, call: Call, operation: Operation) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(call.clone());
        if state.failing.contains(&operation) {
            return Err(VersionError::repository(
                format!("{:?}", call).to_lowercase(),
                Some(1),
                format!("injected {:?} failure", operation),
            ));
        }
        Ok(())
    }

    fn save_working_tree(&self, state: &mut MockState) -> Result<()> {
        let Some(branch) = state.branch.clone() else {
            return Ok(());
        };
        let mut files = Files::new();
        for relative in &state.tracked {
            let path = self.root.join(relative);
            if path.exists() {
                files.insert(relative.clone(), fs::read_to_string(path)?);
            }
        }
        state.branches.insert(branch, files);
        Ok(())
    }
}

fn to_files(files: &[(&str, &str)]) -> Files {
    files
        .iter()
        .map(|(path, content)| (PathBuf::from(path), content.to_string()))
        .collect()
}

impl Repository for MockRepository {
    fn current_branch(&self) -> Result<String> {
        self.state
            .borrow()
            .branch
            .clone()
            .ok_or(VersionError::DetachedHead)
    }

    fn stage(&self, pathspec: &str) -> Result<()> {
        self.record(Call::Stage(pathspec.to_string()), Operation::Stage)?;
        self.state.borrow_mut().staged = true;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.record(Call::Commit(message.to_string()), Operation::Commit)?;
        let mut state = self.state.borrow_mut();
        if !state.staged {
            return Err(VersionError::repository(
                format!("commit -m {}", bot_message(message)),
                Some(1),
                "nothing to commit, working tree clean",
            ));
        }
        state.staged = false;
        let branch = state.branch.clone().unwrap_or_else(|| "HEAD".to_string());
        state.commits.push((branch, bot_message(message)));
        Ok(())
    }

    fn tag(&self, version: &SemVer) -> Result<()> {
        let name = version.to_string();
        self.record(Call::Tag(name.clone()), Operation::Tag)?;
        let mut state = self.state.borrow_mut();
        if state.tags.contains(&name) {
            return Err(VersionError::repository(
                format!("tag -a {}", name),
                Some(128),
                format!("fatal: tag '{}' already exists", name),
            ));
        }
        state.tags.push(name);
        Ok(())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.record(Call::Checkout(branch.to_string()), Operation::Checkout)?;
        let mut state = self.state.borrow_mut();
        self.save_working_tree(&mut state)?;

        if !state.branches.contains_key(branch) {
            let remote = state.remote_branches.get(branch).cloned().ok_or_else(|| {
                VersionError::repository(
                    format!("checkout -f -B {0} origin/{0}", branch),
                    Some(128),
                    format!("fatal: 'origin/{}' is not a commit", branch),
                )
            })?;
            state.branches.insert(branch.to_string(), remote);
        }

        if let Some(files) = state.branches.get(branch) {
            for (relative, content) in files {
                fs::write(self.root.join(relative), content)?;
            }
        }
        state.branch = Some(branch.to_string());
        Ok(())
    }

    fn merge(&self, branch: &str) -> Result<()> {
        self.record(Call::Merge(branch.to_string()), Operation::Merge)?;
        let state = self.state.borrow();
        if state.conflict {
            return Err(VersionError::merge_conflict(
                branch,
                "CONFLICT (content): Merge conflict in gradle.properties",
            ));
        }
        if !state.branches.contains_key(branch) {
            return Err(VersionError::repository(
                format!("merge {}", branch),
                Some(1),
                format!("merge: {} - not something we can merge", branch),
            ));
        }
        Ok(())
    }

    fn push(&self) -> Result<()> {
        self.record(Call::Push, Operation::Push)
    }

    fn workdir(&self) -> &Path {
        &self.root
    }
}
