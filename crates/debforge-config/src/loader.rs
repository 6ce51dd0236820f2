//! Configuration Loader
//!
//! Handles loading configuration from debforge.toml and applying environment
//! variable overrides.

use crate::repository::RepositoryConfig;
use crate::{ConfigError, ConfigResult};
use debforge_control::Environment;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the repository configuration file
pub const CONFIG_FILE: &str = "debforge.toml";

const ENV_DISTRIBUTIONS: &str = "DEBFORGE_DISTRIBUTIONS";
const ENV_ARCHITECTURE: &str = "DEBFORGE_ARCHITECTURE";
const ENV_NETWORK_ACCESS: &str = "DEBFORGE_NETWORK_ACCESS";

/// Configuration loader
///
/// Loads configuration with the following precedence:
/// 1. Repository config (debforge.toml) - lowest priority
/// 2. Environment variables (DEBFORGE_*) - overrides repository
/// 3. CLI flags - highest priority (handled by caller)
#[derive(Debug, Default)]
pub struct ConfigLoader;

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Repository configuration
    pub repository: RepositoryConfig,

    /// Repository root directory (where debforge.toml was found)
    pub root: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find debforge.toml. Without one, the
    /// defaults apply relative to `start_dir`.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (root, repository) = self.find_repository_config(start_dir)?;
        let repository = self.apply_env_overrides(repository)?;

        Ok(Config { repository, root })
    }

    /// Load configuration from a specific config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let repository = RepositoryConfig::load_from_file(config_path)?;
        let repository = self.apply_env_overrides(repository)?;
        let root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config { repository, root })
    }

    /// Find repository configuration by walking up directory tree
    fn find_repository_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, RepositoryConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE);

            if config_path.exists() {
                debug!(path = %config_path.display(), "found repository configuration");
                let repository = RepositoryConfig::load_from_file(&config_path)?;
                return Ok((Some(current), repository));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => {
                    debug!(start = %start_dir.display(), "no repository configuration, using defaults");
                    return Ok((None, RepositoryConfig::default()));
                }
            }
        }
    }

    /// Apply DEBFORGE_* environment variables
    fn apply_env_overrides(&self, mut config: RepositoryConfig) -> ConfigResult<RepositoryConfig> {
        if let Ok(distributions) = env::var(ENV_DISTRIBUTIONS) {
            let distributions: Vec<String> = distributions
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
            if distributions.is_empty() {
                return Err(ConfigError::InvalidEnvironment {
                    name: ENV_DISTRIBUTIONS,
                    reason: "expected a comma separated list of codenames".to_string(),
                });
            }
            config.build.distributions = distributions;
        }

        if let Ok(architecture) = env::var(ENV_ARCHITECTURE) {
            config.build.architecture = architecture;
        }

        if let Ok(network_access) = env::var(ENV_NETWORK_ACCESS) {
            config.build.network_access = match network_access.to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                other => {
                    return Err(ConfigError::InvalidEnvironment {
                        name: ENV_NETWORK_ACCESS,
                        reason: format!("'{}' is not a boolean", other),
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Get the repository root directory
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Check if a debforge.toml was found
    pub fn is_repository(&self) -> bool {
        self.root.is_some()
    }

    /// Resolve a configured path against the repository root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// One environment per configured distribution, in configuration order
    pub fn environments(&self) -> Vec<Environment> {
        let build = &self.repository.build;
        build
            .distributions
            .iter()
            .map(|codename| {
                Environment::new(
                    codename.as_str(),
                    build.architecture.as_str(),
                    self.resolve(&build.package_root),
                    self.resolve(&build.build_root),
                    self.resolve(&build.artifacts_root),
                )
                .with_network_access(build.network_access)
            })
            .collect()
    }
}
