//! Domain logic - pure versioning rules independent of git operations

pub mod branch;
pub mod version;

pub use branch::{BranchPolicy, BumpLevel};
pub use version::{SemVer, SNAPSHOT};
