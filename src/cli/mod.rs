//! Workflow entry points shared by the binary and library users

pub mod orchestration;

pub use orchestration::{
    run_enforce_snapshot, run_release, run_snapshot, ReleaseArgs, ReleaseOutcome, SnapshotOutcome,
};
