use serial_test::serial;
use std::fs;
use tempfile::TempDir;
use version_support::config::{load_config, Backend, SKIP_PUSH_ENV};
use version_support::domain::BumpLevel;

#[test]
#[serial]
fn test_load_config_from_explicit_path() {
    set_skip_push_env(None);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
[branches]
master = "main"
patch = ["support/.*", "hotfix/.*"]

[git]
backend = "libgit2"
"#,
    )
    .unwrap();

    let config = load_config(Some(&path), dir.path()).unwrap();
    assert_eq!(config.branches.master, "main");
    assert_eq!(config.branches.develop, "develop");
    assert_eq!(config.git.backend, Backend::Libgit2);
    assert!(!config.git.skip_push);

    let policy = config.branches.policy().unwrap();
    assert_eq!(policy.classify("support/2.x"), BumpLevel::Patch);
    assert_eq!(policy.classify("develop"), BumpLevel::Minor);
    assert_eq!(policy.classify("main"), BumpLevel::None);
}

#[test]
#[serial]
fn test_missing_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = load_config(Some(&dir.path().join("absent.toml")), dir.path()).unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
#[serial]
fn test_skip_push_from_environment() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("versionsupport.toml");
    fs::write(&path, "[git]\nskip_push = false\n").unwrap();

    set_skip_push_env(Some("true"));
    let config = load_config(Some(&path), dir.path()).unwrap();
    assert!(config.git.skip_push);

    set_skip_push_env(Some("no"));
    let config = load_config(Some(&path), dir.path()).unwrap();
    assert!(!config.git.skip_push);

    set_skip_push_env(None);
}

#[test]
#[serial]
fn test_minor_beats_patch_for_overlapping_patterns() {
    set_skip_push_env(None);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("versionsupport.toml");
    fs::write(
        &path,
        "[branches]\nminor = [\"release/.*\"]\npatch = [\"release/.*\"]\n",
    )
    .unwrap();

    let config = load_config(Some(&path), dir.path()).unwrap();
    let policy = config.branches.policy().unwrap();
    assert_eq!(policy.classify("release/2.1"), BumpLevel::Minor);
}

#[test]
#[serial]
fn test_config_file_found_in_given_directory() {
    set_skip_push_env(None);
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("versionsupport.toml"),
        "[version]\nlabel = \"dev\"\n\n[git]\nbackend = \"libgit2\"\n",
    )
    .unwrap();

    let config = load_config(None, dir.path()).unwrap();
    assert_eq!(config.version.label, "dev");
    assert_eq!(config.git.backend, Backend::Libgit2);
}

fn set_skip_push_env(value: Option<&str>) {
    match value {
        Some(v) => std::env::set_var(SKIP_PUSH_ENV, v),
        None => std::env::remove_var(SKIP_PUSH_ENV),
    }
}
