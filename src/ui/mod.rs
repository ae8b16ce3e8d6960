//! User interface module - terminal output.
//!
//! The tool never prompts: it runs unattended in CI. Everything here lives
//! in `formatter` and is re-exported.

pub mod formatter;

pub use formatter::{
    display_boundary_warning, display_error, display_release, display_status, display_success,
    display_version, format_release, format_transition, format_version,
};
