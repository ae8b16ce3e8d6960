use thiserror::Error;

/// Unified error type for version-support operations
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Version format error: {0}")]
    Format(String),

    #[error("Command 'git {command}' failed ({}):\n{stderr}", exit_label(.status))]
    Repository {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Failed to merge branch '{branch}': {details}")]
    MergeConflict { branch: String, details: String },

    #[error("HEAD is detached; a branch must be checked out")]
    DetachedHead,

    #[error("Command 'git {command}' timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("{version} is not a SNAPSHOT version\nBranch '{branch}' must represent a SNAPSHOT version\n{}", correction_note(.snapshot))]
    PolicyViolation {
        version: String,
        branch: String,
        snapshot: Option<String>,
    },

    #[error("{workflow} on branch '{branch}' failed ({before} -> {after}): {source}")]
    Workflow {
        workflow: &'static str,
        branch: String,
        before: String,
        after: String,
        #[source]
        source: Box<VersionError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid branch pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit {}", code),
        None => "terminated by signal".to_string(),
    }
}

fn correction_note(snapshot: &Option<String>) -> String {
    match snapshot {
        Some(version) => format!("Version was set to {}, next build should succeed!", version),
        None => "No SNAPSHOT bump is configured for this branch; the version must be changed manually".to_string(),
    }
}

/// Convenience type alias for Results in version-support
pub type Result<T> = std::result::Result<T, VersionError>;

impl VersionError {
    /// Create a format error with context
    pub fn format(msg: impl Into<String>) -> Self {
        VersionError::Format(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        VersionError::Config(msg.into())
    }

    /// Create a repository error for a failed git invocation
    pub fn repository(command: impl Into<String>, status: Option<i32>, stderr: impl Into<String>) -> Self {
        VersionError::Repository {
            command: command.into(),
            status,
            stderr: stderr.into(),
        }
    }

    /// Create a merge conflict error
    pub fn merge_conflict(branch: impl Into<String>, details: impl Into<String>) -> Self {
        VersionError::MergeConflict {
            branch: branch.into(),
            details: details.into(),
        }
    }

    /// The innermost error, looking through workflow wrappers
    pub fn root(&self) -> &VersionError {
        match self {
            VersionError::Workflow { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for failures of the repository port, merge conflicts included
    pub fn is_repository_error(&self) -> bool {
        matches!(
            self.root(),
            VersionError::Repository { .. }
                | VersionError::Git(_)
                | VersionError::MergeConflict { .. }
                | VersionError::DetachedHead
                | VersionError::Timeout { .. }
        )
    }

    pub fn is_merge_conflict(&self) -> bool {
        matches!(self.root(), VersionError::MergeConflict { .. })
    }

    pub fn is_policy_violation(&self) -> bool {
        matches!(self.root(), VersionError::PolicyViolation { .. })
    }
}
