use crate::error::{GitReleaseError, Result};
use std::fmt;

/// Release version as accepted on the command line (`vMAJOR.MINOR.PATCH`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionSpec {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

/// Which flavor of the version gets written into the metadata file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    /// The exact released version
    Release,
    /// Work-in-progress state following the release tag
    Dev,
}

impl VersionSpec {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        VersionSpec {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string of the exact form `v<major>.<minor>.<patch>`.
    ///
    /// Leading zeros, pre-release and build suffixes, surrounding whitespace
    /// and a missing `v` prefix are all rejected with
    /// [`GitReleaseError::InputFormat`].
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || GitReleaseError::InputFormat(input.to_string());

        let numeric = input.strip_prefix('v').ok_or_else(invalid)?;
        let parsed = semver::Version::parse(numeric).map_err(|_| invalid())?;

        if !parsed.pre.is_empty() || !parsed.build.is_empty() {
            return Err(invalid());
        }

        Ok(VersionSpec::new(parsed.major, parsed.minor, parsed.patch))
    }

    /// A point release extends an existing minor line
    pub fn is_point_release(&self) -> bool {
        self.patch != 0
    }

    /// The release immediately preceding this one on the same minor line
    pub fn previous_patch(&self) -> Option<Self> {
        self.patch
            .checked_sub(1)
            .map(|patch| VersionSpec::new(self.major, self.minor, patch))
    }

    /// Version without the `v` prefix, e.g. `1.2.3`
    pub fn numeric(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    /// The `-dev` marker written after the release tag
    pub fn dev_string(&self) -> String {
        format!("{}-dev", self)
    }

    /// Value of the combined minor field
    pub fn minor_field(&self, mode: RewriteMode) -> String {
        match mode {
            RewriteMode::Release => format!("{}.{}", self.minor, self.patch),
            RewriteMode::Dev => format!("{}.{}+", self.minor, self.patch),
        }
    }

    /// Value of the full version field
    pub fn version_field(&self, mode: RewriteMode) -> String {
        match mode {
            RewriteMode::Release => self.to_string(),
            RewriteMode::Dev => self.dev_string(),
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for VersionSpec {
    type Err = GitReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        VersionSpec::parse(s)
    }
}

impl fmt::Display for RewriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteMode::Release => write!(f, "release"),
            RewriteMode::Dev => write!(f, "dev"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        let v = VersionSpec::parse("v1.2.3").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
    }

    #[test]
    fn test_version_round_trip() {
        for text in ["v0.0.0", "v1.2.3", "v10.0.1", "v0.20.300", "v123.456.789"] {
            assert_eq!(VersionSpec::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_version_parse_rejects_malformed() {
        for text in [
            "1.2.3",
            "V1.2.3",
            "v1.2",
            "v1.2.3.4",
            "v01.2.3",
            "v1.02.3",
            "v1.2.03",
            "v1.2.3-rc.1",
            "v1.2.3+build",
            " v1.2.3",
            "v1.2.3 ",
            "v",
            "",
            "vx.y.z",
            "v99999999999999999999.0.0",
        ] {
            match VersionSpec::parse(text) {
                Err(GitReleaseError::InputFormat(input)) => assert_eq!(input, text),
                other => panic!("expected InputFormat for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_previous_patch() {
        assert_eq!(
            VersionSpec::new(1, 2, 3).previous_patch(),
            Some(VersionSpec::new(1, 2, 2))
        );
        assert_eq!(VersionSpec::new(2, 0, 0).previous_patch(), None);
    }

    #[test]
    fn test_point_release() {
        assert!(VersionSpec::new(1, 2, 3).is_point_release());
        assert!(!VersionSpec::new(2, 0, 0).is_point_release());
    }

    #[test]
    fn test_field_values() {
        let v = VersionSpec::new(1, 3, 4);
        assert_eq!(v.minor_field(RewriteMode::Release), "3.4");
        assert_eq!(v.minor_field(RewriteMode::Dev), "3.4+");
        assert_eq!(v.version_field(RewriteMode::Release), "v1.3.4");
        assert_eq!(v.version_field(RewriteMode::Dev), "v1.3.4-dev");
    }

    #[test]
    fn test_from_str() {
        let v: VersionSpec = "v2.0.0".parse().unwrap();
        assert_eq!(v, VersionSpec::new(2, 0, 0));
        assert_eq!(v.numeric(), "2.0.0");
    }
}
