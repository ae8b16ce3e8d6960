use crate::error::Result;
use regex::Regex;

use super::version::SemVer;

/// Version component a branch asks to bump when it needs a SNAPSHOT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpLevel {
    Major,
    Minor,
    Patch,
    None,
}

impl BumpLevel {
    /// Apply this bump to a version, `None` for [BumpLevel::None]
    ///
    /// Fails when the bumped component is already at its maximum.
    pub fn apply(&self, version: &SemVer) -> Result<Option<SemVer>> {
        match self {
            BumpLevel::Major => version.bump_major().map(Some),
            BumpLevel::Minor => version.bump_minor().map(Some),
            BumpLevel::Patch => version.bump_patch().map(Some),
            BumpLevel::None => Ok(None),
        }
    }
}

/// Ordered branch patterns deciding the bump level for a branch.
///
/// Patterns match the whole branch name. Major patterns are evaluated
/// first, then minor, then patch; the first list with a match wins, so a
/// branch matching both a minor and a patch pattern bumps minor.
#[derive(Debug, Clone)]
pub struct BranchPolicy {
    major: Vec<Regex>,
    minor: Vec<Regex>,
    patch: Vec<Regex>,
}

impl BranchPolicy {
    /// Compile a policy from pattern strings
    pub fn new<S: AsRef<str>>(major: &[S], minor: &[S], patch: &[S]) -> Result<Self> {
        Ok(BranchPolicy {
            major: compile(major)?,
            minor: compile(minor)?,
            patch: compile(patch)?,
        })
    }

    /// Default policy: `<develop>*` bumps minor, `<hotfix_prefix>*` bumps patch,
    /// nothing bumps major.
    pub fn with_defaults(develop_prefix: &str, hotfix_prefix: &str) -> Result<Self> {
        let minor = default_patterns(develop_prefix);
        let patch = default_patterns(hotfix_prefix);
        BranchPolicy::new(&[] as &[String], minor.as_slice(), patch.as_slice())
    }

    pub fn classify(&self, branch: &str) -> BumpLevel {
        if matches_any(&self.major, branch) {
            BumpLevel::Major
        } else if matches_any(&self.minor, branch) {
            BumpLevel::Minor
        } else if matches_any(&self.patch, branch) {
            BumpLevel::Patch
        } else {
            BumpLevel::None
        }
    }
}

/// Default pattern list for a branch-name prefix
pub fn default_patterns(prefix: &str) -> Vec<String> {
    vec![format!("^{}.*", regex::escape(prefix))]
}

/// Classify a branch against raw pattern lists
pub fn classify<S: AsRef<str>>(branch: &str, major: &[S], minor: &[S], patch: &[S]) -> Result<BumpLevel> {
    Ok(BranchPolicy::new(major, minor, patch)?.classify(branch))
}

// Anchored so that `find` semantics become whole-string matching.
fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("^(?:{})$", p.as_ref())).map_err(Into::into))
        .collect()
}

fn matches_any(patterns: &[Regex], branch: &str) -> bool {
    patterns.iter().any(|re| re.is_match(branch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> BranchPolicy {
        BranchPolicy::with_defaults("develop", "hotfix").unwrap()
    }

    #[test]
    fn test_default_develop_is_minor() {
        assert_eq!(defaults().classify("develop"), BumpLevel::Minor);
        assert_eq!(defaults().classify("develop-2.x"), BumpLevel::Minor);
    }

    #[test]
    fn test_default_hotfix_is_patch() {
        assert_eq!(defaults().classify("hotfix/urgent"), BumpLevel::Patch);
        assert_eq!(defaults().classify("hotfix"), BumpLevel::Patch);
    }

    #[test]
    fn test_default_other_branches_do_not_bump() {
        let policy = defaults();
        assert_eq!(policy.classify("master"), BumpLevel::None);
        assert_eq!(policy.classify("feature/develop"), BumpLevel::None);
        assert_eq!(policy.classify(""), BumpLevel::None);
    }

    #[test]
    fn test_whole_string_match_not_substring() {
        let policy = BranchPolicy::new(&["release"], &[], &[]).unwrap();
        assert_eq!(policy.classify("release"), BumpLevel::Major);
        assert_eq!(policy.classify("release/2"), BumpLevel::None);
        assert_eq!(policy.classify("pre-release"), BumpLevel::None);
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let policy = BranchPolicy::new(&[] as &[&str], &["develop|next"], &[]).unwrap();
        assert_eq!(policy.classify("next"), BumpLevel::Minor);
        assert_eq!(policy.classify("develop"), BumpLevel::Minor);
        assert_eq!(policy.classify("nextgen"), BumpLevel::None);
    }

    #[test]
    fn test_minor_wins_over_patch() {
        let level = classify("support/1.x", &[] as &[&str], &["support/.*"], &["support/1.*"]).unwrap();
        assert_eq!(level, BumpLevel::Minor);
    }

    #[test]
    fn test_major_wins_over_minor() {
        let level = classify("develop", &["dev.*"], &["develop"], &[]).unwrap();
        assert_eq!(level, BumpLevel::Major);
    }

    #[test]
    fn test_default_prefix_is_escaped() {
        let policy = BranchPolicy::with_defaults("dev.x", "hotfix").unwrap();
        assert_eq!(policy.classify("dev.x/1"), BumpLevel::Minor);
        assert_eq!(policy.classify("devax"), BumpLevel::None);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(BranchPolicy::new(&["(unclosed"], &[], &[]).is_err());
    }

    #[test]
    fn test_bump_level_apply() {
        let v = SemVer::new(1, 2, 3);
        assert_eq!(BumpLevel::Major.apply(&v).unwrap(), Some(SemVer::new(2, 0, 0)));
        assert_eq!(BumpLevel::Minor.apply(&v).unwrap(), Some(SemVer::new(1, 3, 0)));
        assert_eq!(BumpLevel::Patch.apply(&v).unwrap(), Some(SemVer::new(1, 2, 4)));
        assert_eq!(BumpLevel::None.apply(&v).unwrap(), None);

        let max = SemVer::new(u64::MAX, 0, 0);
        assert!(BumpLevel::Major.apply(&max).is_err());
        assert_eq!(BumpLevel::None.apply(&max).unwrap(), None);
    }
}
