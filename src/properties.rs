//! Version value persisted in a key-value properties file.
//!
//! Only the version line is ever rewritten; every other line, including its
//! terminator, is preserved byte for byte and in order.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::SemVer;
use crate::error::{Result, VersionError};

/// Properties file holding the version under a fixed key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFile {
    path: PathBuf,
    key: String,
}

impl VersionFile {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        VersionFile {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Raw value stored under the version key
    pub fn read_raw(&self) -> Result<String> {
        let content = fs::read_to_string(&self.path)?;
        content
            .lines()
            .find_map(|line| value_for_key(line, &self.key))
            .map(str::to_string)
            .ok_or_else(|| {
                VersionError::format(format!(
                    "Missing '{}' in {}",
                    self.key,
                    self.path.display()
                ))
            })
    }

    pub fn read(&self) -> Result<SemVer> {
        SemVer::parse(&self.read_raw()?)
    }

    /// Replace the version line in place
    pub fn write(&self, version: &SemVer) -> Result<()> {
        let content = fs::read_to_string(&self.path)?;
        let (rewritten, replaced) = replace_value(&content, &self.key, &version.to_string());
        if !replaced {
            return Err(VersionError::format(format!(
                "Missing '{}' in {}",
                self.key,
                self.path.display()
            )));
        }
        fs::write(&self.path, rewritten)?;
        Ok(())
    }
}

fn is_comment(line: &str) -> bool {
    matches!(line.trim_start().chars().next(), Some('#') | Some('!'))
}

/// Value of `key=value` or `key: value` when the line holds `key`
fn value_for_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    if is_comment(line) {
        return None;
    }
    let rest = line.trim_start().strip_prefix(key)?;
    let rest = rest.trim_start();
    let value = rest.strip_prefix('=').or_else(|| rest.strip_prefix(':'))?;
    Some(value.trim())
}

/// Rewrite every line carrying `key`, keeping all other bytes untouched.
/// Returns the new content and whether any line was replaced.
pub fn replace_value(content: &str, key: &str, value: &str) -> (String, bool) {
    let mut out = String::with_capacity(content.len() + value.len());
    let mut replaced = false;

    for line in content.split_inclusive('\n') {
        let (body, ending) = split_line_ending(line);
        if value_for_key(body, key).is_some() {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push_str(ending);
            replaced = true;
        } else {
            out.push_str(line);
        }
    }

    (out, replaced)
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn version_file(content: &str) -> (TempDir, VersionFile) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gradle.properties");
        fs::write(&path, content).unwrap();
        (dir, VersionFile::new(path, "version"))
    }

    #[test]
    fn test_read_version() {
        let (_dir, file) = version_file("group=com.example\nversion=1.2.3\n");
        assert_eq!(file.read().unwrap(), SemVer::new(1, 2, 3));
    }

    #[test]
    fn test_read_with_spaces_and_colon() {
        assert_eq!(value_for_key("version = 1.0.0", "version"), Some("1.0.0"));
        assert_eq!(value_for_key("  version: 2.0.0  ", "version"), Some("2.0.0"));
        assert_eq!(value_for_key("versionCode=3", "version"), None);
        assert_eq!(value_for_key("# version=9.9.9", "version"), None);
        assert_eq!(value_for_key("! version=9.9.9", "version"), None);
    }

    #[test]
    fn test_missing_key_is_format_error() {
        let (_dir, file) = version_file("group=com.example\n");
        assert!(matches!(file.read(), Err(VersionError::Format(_))));
        assert!(matches!(
            file.write(&SemVer::new(1, 0, 0)),
            Err(VersionError::Format(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let file = VersionFile::new("/nonexistent/dir/gradle.properties", "version");
        assert!(matches!(file.read(), Err(VersionError::Io(_))));
    }

    #[test]
    fn test_write_preserves_other_lines() {
        let content = "# build settings\ngroup=com.example\nversion=1.2.3\norg.gradle.jvmargs=-Xmx2g\n";
        let (_dir, file) = version_file(content);

        file.write(&SemVer::new(1, 3, 0).with_label("SNAPSHOT")).unwrap();

        let written = fs::read_to_string(file.path()).unwrap();
        assert_eq!(
            written,
            "# build settings\ngroup=com.example\nversion=1.3.0-SNAPSHOT\norg.gradle.jvmargs=-Xmx2g\n"
        );
    }

    #[test]
    fn test_write_keeps_crlf_and_missing_trailing_newline() {
        let (out, replaced) = replace_value("a=1\r\nversion=1.0.0\r\nb=2", "version", "1.0.1");
        assert!(replaced);
        assert_eq!(out, "a=1\r\nversion=1.0.1\r\nb=2");

        let (out, _) = replace_value("version=1.0.0", "version", "2.0.0");
        assert_eq!(out, "version=2.0.0");
    }

    #[test]
    fn test_commented_version_is_untouched() {
        let (out, replaced) = replace_value("#version=0.0.1\nversion=1.0.0\n", "version", "1.0.1");
        assert!(replaced);
        assert_eq!(out, "#version=0.0.1\nversion=1.0.1\n");
    }
}
