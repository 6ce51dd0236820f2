//! Debforge Configuration System
//!
//! Provides configuration management for debforge repositories:
//! - Repository configuration (debforge.toml)
//! - Package definitions (package.toml in each package directory)
//! - Pre-build hooks run once every package is registered
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Repository config (./debforge.toml, searched upwards)
//! 3. Environment variables (DEBFORGE_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use debforge_config::{load_packages, ConfigLoader};
//! use std::path::Path;
//!
//! let config = ConfigLoader::new().load_from_directory(Path::new(".")).unwrap();
//! for env in config.environments() {
//!     let loaded = load_packages(&env).unwrap();
//!     println!("{}: {} packages", env.codename, loaded.registry.len());
//! }
//! ```

pub mod loader;
pub mod package;
pub mod repository;

use debforge_control::ControlError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid value for environment variable {name}: {reason}")]
    InvalidEnvironment { name: &'static str, reason: String },

    #[error("No package directories in {0}")]
    NoPackages(PathBuf),

    #[error("Package '{package}': {error}")]
    Package { package: String, error: ControlError },

    #[error(transparent)]
    Control(#[from] ControlError),
}

impl ConfigError {
    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Attach the package being processed to a control error
    pub(crate) fn in_package(package: &str) -> impl FnOnce(ControlError) -> Self + '_ {
        move |error| ConfigError::Package {
            package: package.to_string(),
            error,
        }
    }

    /// True for internal errors as opposed to mistakes in the configuration
    pub fn is_unexpected(&self) -> bool {
        match self {
            ConfigError::Package { error, .. } | ConfigError::Control(error) => {
                error.is_unexpected()
            }
            _ => false,
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader};
pub use package::{load_packages, LoadedPackages, PackageDefinition};
pub use repository::{BuildConfig, RepositoryConfig};
