//! Debian package version strings, `[epoch:]upstream[-revision]`

use crate::error::{ControlError, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

const VERSION_PATTERN: &str =
    r"^((?P<epoch>\d+):)?(?P<upstream>[A-Za-z0-9.+:~-]+?)(-(?P<revision>[A-Za-z0-9+.~]+))?$";

static VERSION_RE: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

fn version_regex() -> Result<&'static Regex> {
    VERSION_RE
        .get_or_init(|| Regex::new(VERSION_PATTERN))
        .as_ref()
        .map_err(|e| ControlError::unexpected(format!("version pattern failed to compile: {}", e)))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub epoch: Option<String>,
    pub upstream_version: String,
    pub debian_revision: Option<String>,
    full_version: String,
}

impl Version {
    pub fn parse(value: &str) -> Result<Self> {
        let captures = version_regex()?
            .captures(value)
            .ok_or_else(|| ControlError::invalid_version(value, "unexpected characters"))?;

        let upstream = captures
            .name("upstream")
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ControlError::invalid_version(value, "missing an upstream version section"))?;

        Ok(Self {
            epoch: captures.name("epoch").map(|m| m.as_str().to_string()),
            upstream_version: upstream,
            debian_revision: captures.name("revision").map(|m| m.as_str().to_string()),
            full_version: value.to_string(),
        })
    }

    /// Parse a version that must carry a Debian revision, as changelog entries do
    pub fn parse_with_revision(value: &str) -> Result<Self> {
        let version = Self::parse(value)?;
        if version.debian_revision.is_none() {
            return Err(ControlError::invalid_version(
                value,
                "missing a Debian revision section",
            ));
        }
        Ok(version)
    }

    pub fn as_str(&self) -> &str {
        &self.full_version
    }
}

impl FromStr for Version {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.4.3-1", None, "1.4.3", Some("1"))]
    #[case("3.7-myorg0.1", None, "3.7", Some("myorg0.1"))]
    #[case("7:3.4.8-0ubuntu0.2", Some("7"), "3.4.8", Some("0ubuntu0.2"))]
    #[case("1.4.3", None, "1.4.3", None)]
    #[case("5:4.9.2", Some("5"), "4.9.2", None)]
    #[case("epochlookingthing:", None, "epochlookingthing:", None)]
    #[case(":8.7.2", None, ":8.7.2", None)]
    #[case("-revisionlookingthing", None, "-revisionlookingthing", None)]
    #[case("2.0-rc1-3", None, "2.0-rc1", Some("3"))]
    fn test_version_parsing(
        #[case] input: &str,
        #[case] epoch: Option<&str>,
        #[case] upstream: &str,
        #[case] revision: Option<&str>,
    ) {
        let version = Version::parse(input).unwrap();
        assert_eq!(version.epoch.as_deref(), epoch);
        assert_eq!(version.upstream_version, upstream);
        assert_eq!(version.debian_revision.as_deref(), revision);
        assert_eq!(version.to_string(), input);
    }

    #[rstest]
    #[case("")]
    #[case("1.0 beta")]
    #[case("1.0_1")]
    fn test_invalid_versions(#[case] input: &str) {
        let err = Version::parse(input).unwrap_err();
        assert!(matches!(err, ControlError::InvalidVersion { .. }));
    }

    #[test]
    fn test_revision_required() {
        assert!(Version::parse_with_revision("1.0-1").is_ok());
        let err = Version::parse_with_revision("1.0").unwrap_err();
        assert!(err.to_string().contains("Debian revision"));
    }
}
