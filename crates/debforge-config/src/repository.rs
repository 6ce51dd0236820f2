//! Repository Configuration (debforge.toml)
//!
//! Handles repository-level configuration stored in `debforge.toml` at the repository root.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Repository configuration from debforge.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Build configuration
    #[serde(default)]
    pub build: BuildConfig,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Distribution codenames to build for (default: ["focal"])
    #[serde(default = "default_distributions")]
    pub distributions: Vec<String>,

    /// Target architecture (default: "amd64")
    #[serde(default = "default_architecture")]
    pub architecture: String,

    /// Directory holding one directory per package (default: "packages")
    #[serde(default = "default_package_root")]
    pub package_root: PathBuf,

    /// Scratch directory (default: "build")
    #[serde(default = "default_build_root")]
    pub build_root: PathBuf,

    /// Build results (default: "artifacts")
    #[serde(default = "default_artifacts_root")]
    pub artifacts_root: PathBuf,

    /// Allow network access during builds
    #[serde(default)]
    pub network_access: bool,
}

fn default_distributions() -> Vec<String> {
    vec!["focal".to_string()]
}

fn default_architecture() -> String {
    "amd64".to_string()
}

fn default_package_root() -> PathBuf {
    PathBuf::from("packages")
}

fn default_build_root() -> PathBuf {
    PathBuf::from("build")
}

fn default_artifacts_root() -> PathBuf {
    PathBuf::from("artifacts")
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            distributions: default_distributions(),
            architecture: default_architecture(),
            package_root: default_package_root(),
            build_root: default_build_root(),
            artifacts_root: default_artifacts_root(),
            network_access: false,
        }
    }
}

impl RepositoryConfig {
    /// Load repository configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config = Self::parse(&content).map_err(|e| match e {
            ConfigError::TomlParseError { error, .. } => ConfigError::TomlParseError {
                file: path.to_path_buf(),
                error,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: PathBuf::new(),
            error: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the repository configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.build.validate()
    }
}

impl BuildConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.distributions.is_empty() {
            return Err(ConfigError::invalid_value(
                "build.distributions",
                "at least one distribution is required",
            ));
        }
        if let Some(blank) = self.distributions.iter().find(|d| d.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                "build.distributions",
                format!("'{}' is not a distribution codename", blank),
            ));
        }
        if self.architecture.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "build.architecture",
                "architecture cannot be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RepositoryConfig::parse("").unwrap();
        assert_eq!(config, RepositoryConfig::default());
        assert_eq!(config.build.distributions, vec!["focal"]);
        assert_eq!(config.build.package_root, PathBuf::from("packages"));
        assert!(!config.build.network_access);
    }

    #[test]
    fn test_full_build_table() {
        let config = RepositoryConfig::parse(
            r#"
[build]
distributions = ["focal", "bullseye"]
architecture = "arm64"
package-root = "pkgs"
build-root = "/tmp/build"
artifacts-root = "out"
network-access = true
"#,
        )
        .unwrap();

        assert_eq!(config.build.distributions, vec!["focal", "bullseye"]);
        assert_eq!(config.build.architecture, "arm64");
        assert_eq!(config.build.package_root, PathBuf::from("pkgs"));
        assert_eq!(config.build.build_root, PathBuf::from("/tmp/build"));
        assert!(config.build.network_access);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = RepositoryConfig::parse("[build]\nmirror = \"http://deb.debian.org\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseError { .. }));
    }

    #[test]
    fn test_empty_distributions_rejected() {
        let err = RepositoryConfig::parse("[build]\ndistributions = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "build.distributions"));
    }
}
