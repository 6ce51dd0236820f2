//! Newline-separated path lists: `debian/conffiles` and `debian/dirs`

use crate::error::Result;
use crate::files;
use std::path::{Path, PathBuf};

pub const CONFFILES_PATH: &str = "debian/conffiles";
pub const DIRS_PATH: &str = "debian/dirs";

/// A list of paths stored one per line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathList {
    file: PathBuf,
    entries: Vec<PathBuf>,
}

impl PathList {
    fn at(file: PathBuf) -> Self {
        Self {
            file,
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, entry: impl Into<PathBuf>) {
        self.entries.push(entry.into());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.entries.iter()
    }

    pub fn contains(&self, entry: &Path) -> bool {
        self.entries.iter().any(|e| e == entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nothing is written for an empty list
    pub fn save(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let lines: Vec<String> = self.entries.iter().map(|p| p.display().to_string()).collect();
        files::write(&self.file, &lines.join("\n"))
    }

    pub fn load(&mut self) -> Result<()> {
        if let Some(text) = files::read_optional(&self.file)? {
            self.entries = text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(PathBuf::from)
                .collect();
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PathList {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Files dpkg treats as configuration and never overwrites silently
pub type ConfFiles = PathList;

/// Directories the package needs that its install step does not create
pub type Dirs = PathList;

impl PathList {
    pub fn conffiles(package_dir: &Path) -> ConfFiles {
        Self::at(package_dir.join(CONFFILES_PATH))
    }

    pub fn dirs(package_dir: &Path) -> Dirs {
        Self::at(package_dir.join(DIRS_PATH))
    }
}
