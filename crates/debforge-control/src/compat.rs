//! `debian/compat`, the debhelper compatibility level

use crate::environment::compat_for_distribution;
use crate::error::{ControlError, Result};
use crate::files;
use std::path::{Path, PathBuf};

pub const COMPAT_PATH: &str = "debian/compat";

#[derive(Debug, Clone)]
pub struct Compat {
    path: PathBuf,
    pub version: Option<u32>,
}

impl Compat {
    pub fn new(package_dir: &Path) -> Self {
        Self {
            path: package_dir.join(COMPAT_PATH),
            version: None,
        }
    }

    /// Use the level shipped by the given distribution, then persist it
    pub fn from_distribution(&mut self, codename: &str) -> Result<()> {
        self.version = Some(compat_for_distribution(codename)?);
        self.save()
    }

    pub fn load(&mut self) -> Result<()> {
        self.version = match files::read_optional(&self.path)? {
            Some(text) => Some(text.trim().parse().map_err(|e| {
                ControlError::parse(&self.path, format!("While parsing the compat file: {}", e))
            })?),
            None => None,
        };
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        match self.version {
            Some(version) => files::write(&self.path, &version.to_string()),
            None => Ok(()),
        }
    }
}
