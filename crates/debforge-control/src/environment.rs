//! Context describing where and for what a package is being processed

use crate::error::{ControlError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Passed by reference to every component that depends on the target
/// distribution or on the build directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Distribution codename, like `focal`
    pub codename: String,
    /// Target CPU architecture
    pub architecture: String,
    /// Directory holding one directory per package
    pub package_root: PathBuf,
    /// Intermediate build artifacts
    pub build_root: PathBuf,
    /// Where build results are stored
    pub artifacts_root: PathBuf,
    /// Official Debian build infrastructure provides no network access
    #[serde(default)]
    pub network_access: bool,
}

impl Environment {
    pub fn new(
        codename: impl Into<String>,
        architecture: impl Into<String>,
        package_root: impl Into<PathBuf>,
        build_root: impl Into<PathBuf>,
        artifacts_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            codename: codename.into(),
            architecture: architecture.into(),
            package_root: package_root.into(),
            build_root: build_root.into(),
            artifacts_root: artifacts_root.into(),
            network_access: false,
        }
    }

    pub fn with_network_access(mut self, network_access: bool) -> Self {
        self.network_access = network_access;
        self
    }

    /// The debhelper compatibility level used by this distribution
    pub fn compat_level(&self) -> Result<u32> {
        compat_for_distribution(&self.codename)
    }
}

/// Map a distribution codename to its debhelper compatibility level
pub fn compat_for_distribution(codename: &str) -> Result<u32> {
    match codename {
        "bionic" => Ok(11),
        "focal" | "buster" => Ok(12),
        "groovy" | "hirsute" | "impish" | "bullseye" => Ok(13),
        other => Err(ControlError::UnknownDistribution(other.to_string())),
    }
}
