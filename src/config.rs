use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::branch::{default_patterns, BranchPolicy};
use crate::domain::SNAPSHOT;
use crate::error::{Result, VersionError};
use crate::properties::VersionFile;

/// File name looked up in the repository directory
pub const CONFIG_FILE_NAME: &str = "versionsupport.toml";

/// Environment variable forcing dry-run pushes
pub const SKIP_PUSH_ENV: &str = "SKIP_PUSH";

/// Represents the complete configuration for version-support.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub branches: BranchesConfig,

    #[serde(default)]
    pub version: VersionConfig,

    #[serde(default)]
    pub git: GitConfig,
}

fn default_master() -> String {
    "master".to_string()
}

fn default_develop() -> String {
    "develop".to_string()
}

fn default_hotfix_prefix() -> String {
    "hotfix".to_string()
}

/// Branch names and the ordered pattern lists used for classification.
///
/// Absent pattern lists fall back to the defaults: no major branches,
/// `^<develop>.*` for minor and `^<hotfix_prefix>.*` for patch.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BranchesConfig {
    #[serde(default = "default_master")]
    pub master: String,

    #[serde(default = "default_develop")]
    pub develop: String,

    #[serde(default = "default_hotfix_prefix")]
    pub hotfix_prefix: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Vec<String>>,
}

impl Default for BranchesConfig {
    fn default() -> Self {
        BranchesConfig {
            master: default_master(),
            develop: default_develop(),
            hotfix_prefix: default_hotfix_prefix(),
            major: None,
            minor: None,
            patch: None,
        }
    }
}

impl BranchesConfig {
    pub fn major_patterns(&self) -> Vec<String> {
        self.major.clone().unwrap_or_default()
    }

    pub fn minor_patterns(&self) -> Vec<String> {
        self.minor
            .clone()
            .unwrap_or_else(|| default_patterns(&self.develop))
    }

    pub fn patch_patterns(&self) -> Vec<String> {
        self.patch
            .clone()
            .unwrap_or_else(|| default_patterns(&self.hotfix_prefix))
    }

    /// Compile the effective branch policy
    pub fn policy(&self) -> Result<BranchPolicy> {
        BranchPolicy::new(
            self.major_patterns().as_slice(),
            self.minor_patterns().as_slice(),
            self.patch_patterns().as_slice(),
        )
    }
}

fn default_version_file() -> PathBuf {
    PathBuf::from("gradle.properties")
}

fn default_version_key() -> String {
    "version".to_string()
}

fn default_label() -> String {
    SNAPSHOT.to_string()
}

/// Location of the persisted version and the pre-release label.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VersionConfig {
    /// Properties file, relative to the repository root
    #[serde(default = "default_version_file")]
    pub file: PathBuf,

    #[serde(default = "default_version_key")]
    pub key: String,

    #[serde(default = "default_label")]
    pub label: String,
}

impl Default for VersionConfig {
    fn default() -> Self {
        VersionConfig {
            file: default_version_file(),
            key: default_version_key(),
            label: default_label(),
        }
    }
}

impl VersionConfig {
    /// Version file resolved against the repository root
    pub fn version_file(&self, root: &Path) -> VersionFile {
        VersionFile::new(root.join(&self.file), self.key.clone())
    }
}

/// Which implementation of the repository port to use.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Invoke the `git` executable
    #[default]
    Native,
    /// Use libgit2 in-process
    Libgit2,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Repository access settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitConfig {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default = "default_remote")]
    pub remote: String,

    /// Dry run: `push` succeeds without contacting the remote
    #[serde(default)]
    pub skip_push: bool,

    /// Upper bound for every external git invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_passphrase: Option<String>,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            backend: Backend::default(),
            remote: default_remote(),
            skip_push: false,
            timeout_secs: default_timeout_secs(),
            ssh_key: None,
            ssh_passphrase: None,
        }
    }
}

impl GitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Apply environment overrides (currently `SKIP_PUSH=true`)
    pub fn apply_env(mut self) -> Self {
        if std::env::var(SKIP_PUSH_ENV)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
        {
            self.git.skip_push = true;
        }
        self
    }
}

/// Parse configuration from TOML text
pub fn parse_config(text: &str) -> Result<Config> {
    toml::from_str(text).map_err(|e| VersionError::config(e.to_string()))
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `versionsupport.toml` in `dir`, the directory the tool runs in
/// 3. `.versionsupport.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// Environment overrides are applied to the result.
pub fn load_config(config_path: Option<&Path>, dir: &Path) -> Result<Config> {
    let local = dir.join(CONFIG_FILE_NAME);
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path).map_err(|e| {
            VersionError::config(format!("Cannot read {}: {}", path.display(), e))
        })?
    } else if local.exists() {
        fs::read_to_string(&local)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(format!(".{}", CONFIG_FILE_NAME));
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default().apply_env());
        }
    } else {
        return Ok(Config::default().apply_env());
    };

    Ok(parse_config(&config_str)?.apply_env())
}
