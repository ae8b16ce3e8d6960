use crate::error::{Result, VersionError};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Pre-release label attached to development versions
pub const SNAPSHOT: &str = "SNAPSHOT";

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:-(.+))?$").expect("static version pattern is valid")
    })
}

/// Semantic version with an optional pre-release label.
///
/// Values are immutable: every transition (bump, label, release) returns a
/// new `SemVer`. A version is a release iff it carries no label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub label: Option<String>,
}

impl SemVer {
    /// Create a release version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        SemVer {
            major,
            minor,
            patch,
            label: None,
        }
    }

    /// Parse `major.minor.patch[-label]`
    pub fn parse(text: &str) -> Result<Self> {
        let caps = version_pattern().captures(text).ok_or_else(|| {
            VersionError::format(format!(
                "Invalid version: '{}' - expected MAJOR.MINOR.PATCH[-LABEL]",
                text
            ))
        })?;

        let component = |idx: usize, name: &str| -> Result<u64> {
            caps[idx].parse::<u64>().map_err(|_| {
                VersionError::format(format!("Invalid {} version in '{}'", name, text))
            })
        };

        Ok(SemVer {
            major: component(1, "major")?,
            minor: component(2, "minor")?,
            patch: component(3, "patch")?,
            label: caps.get(4).map(|m| m.as_str().to_string()),
        })
    }

    pub fn is_release(&self) -> bool {
        self.label.as_deref().map_or(true, str::is_empty)
    }

    pub fn bump_major(&self) -> Result<Self> {
        Ok(SemVer::new(increment(self.major, "major", self)?, 0, 0))
    }

    pub fn bump_minor(&self) -> Result<Self> {
        Ok(SemVer::new(self.major, increment(self.minor, "minor", self)?, 0))
    }

    pub fn bump_patch(&self) -> Result<Self> {
        Ok(SemVer::new(
            self.major,
            self.minor,
            increment(self.patch, "patch", self)?,
        ))
    }

    /// Copy with the given label attached
    pub fn with_label(&self, label: impl Into<String>) -> Self {
        SemVer {
            label: Some(label.into()),
            ..self.clone()
        }
    }

    /// Copy with the label removed; major/minor/patch are unchanged
    pub fn without_label(&self) -> Self {
        SemVer::new(self.major, self.minor, self.patch)
    }
}

fn increment(component: u64, name: &str, version: &SemVer) -> Result<u64> {
    component.checked_add(1).ok_or_else(|| {
        VersionError::format(format!("Cannot bump {} version of {}", name, version))
    })
}

impl FromStr for SemVer {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self> {
        SemVer::parse(s)
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => write!(f, "-{}", label),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_release() {
        let v = SemVer::parse("1.2.3").unwrap();
        assert_eq!(v, SemVer::new(1, 2, 3));
        assert!(v.is_release());
    }

    #[test]
    fn test_parse_snapshot() {
        let v = SemVer::parse("1.3.0-SNAPSHOT").unwrap();
        assert_eq!(v.minor, 3);
        assert_eq!(v.label.as_deref(), Some(SNAPSHOT));
        assert!(!v.is_release());
    }

    #[test]
    fn test_parse_label_with_hyphens() {
        let v = SemVer::parse("4.0.0-rc-1").unwrap();
        assert_eq!(v.label.as_deref(), Some("rc-1"));
        assert_eq!(v.to_string(), "4.0.0-rc-1");
    }

    #[test]
    fn test_parse_invalid() {
        for text in ["", "1.2", "1.2.3.4", "v1.2.3", "1.2.x", "1.2.3-", " 1.2.3", "-1.2.3"] {
            let err = SemVer::parse(text).unwrap_err();
            assert!(
                matches!(err, VersionError::Format(_)),
                "expected format error for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_parse_overflowing_component() {
        assert!(SemVer::parse("99999999999999999999.0.0").is_err());
    }

    #[test]
    fn test_round_trip() {
        let samples = [
            SemVer::new(0, 0, 0),
            SemVer::new(1, 2, 3),
            SemVer::new(10, 20, 30).with_label(SNAPSHOT),
            SemVer::new(2, 0, 0).with_label("beta.1"),
        ];
        for v in samples {
            assert_eq!(SemVer::parse(&v.to_string()).unwrap(), v);
        }
    }

    #[test]
    fn test_bumps_clear_label() {
        let v = SemVer::new(1, 2, 3).with_label(SNAPSHOT);
        assert_eq!(v.bump_major().unwrap(), SemVer::new(2, 0, 0));
        assert_eq!(v.bump_minor().unwrap(), SemVer::new(1, 3, 0));
        assert_eq!(v.bump_patch().unwrap(), SemVer::new(1, 2, 4));
    }

    #[test]
    fn test_bump_at_max_component_is_format_error() {
        let v = SemVer::parse("18446744073709551615.18446744073709551615.18446744073709551615").unwrap();
        for result in [v.bump_major(), v.bump_minor(), v.bump_patch()] {
            assert!(matches!(result, Err(VersionError::Format(_))));
        }
        assert!(v.bump_major().unwrap_err().to_string().contains("major"));
    }

    #[test]
    fn test_without_label_keeps_components() {
        let v = SemVer::parse("1.3.0-SNAPSHOT").unwrap();
        assert_eq!(v.without_label(), SemVer::new(1, 3, 0));
    }

    #[test]
    fn test_empty_label_is_release() {
        let v = SemVer::new(1, 0, 0).with_label("");
        assert!(v.is_release());
        assert_eq!(v.to_string(), "1.0.0");
    }

    #[test]
    fn test_from_str() {
        let v: SemVer = "3.1.4".parse().unwrap();
        assert_eq!(v, SemVer::new(3, 1, 4));
    }
}
