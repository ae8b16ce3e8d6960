use std::fmt;

/// Reasons a workflow had nothing to do.
/// These are non-fatal and reported to the user as warnings.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// Release was invoked outside the release branch
    NotOnReleaseBranch {
        branch: String,
        release_branch: String,
    },
    /// The version carries no pre-release label
    AlreadyRelease { branch: String, version: String },
    /// The version already carries the pre-release label
    AlreadySnapshot { branch: String, version: String },
    /// The branch matches no bump pattern
    NoBumpForBranch { branch: String, version: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::NotOnReleaseBranch {
                branch,
                release_branch,
            } => {
                write!(
                    f,
                    "SKIP: Not on branch '{}' (current: '{}')",
                    release_branch, branch
                )
            }
            BoundaryWarning::AlreadyRelease { branch, version } => {
                write!(
                    f,
                    "{} on branch '{}' is already a release version",
                    version, branch
                )
            }
            BoundaryWarning::AlreadySnapshot { branch, version } => {
                write!(f, "{} on branch '{}' is already a SNAPSHOT", version, branch)
            }
            BoundaryWarning::NoBumpForBranch { branch, version } => {
                write!(
                    f,
                    "Branch '{}' matches no bump pattern; {} left unchanged",
                    branch, version
                )
            }
        }
    }
}
