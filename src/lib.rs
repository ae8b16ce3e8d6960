pub mod boundary;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod logging;
pub mod manager;
pub mod properties;
pub mod ui;

pub use error::{Result, VersionError};
