//! A source package directory and everything under its `debian/` directory

use crate::changelog::{ChangeBlock, Changelog};
use crate::compat::Compat;
use crate::conffiles::{ConfFiles, Dirs, PathList};
use crate::control::Control;
use crate::copyright::Copyright;
use crate::environment::{compat_for_distribution, Environment};
use crate::error::{ControlError, Result};
use crate::files;
use crate::relation::{Comparator, Dependency, Relation};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SOURCE_FORMAT_PATH: &str = "debian/source/format";

pub const DEFAULT_SOURCE_FORMAT: &str = "3.0 (quilt)";

const DEBHELPER_COMPAT: &str = "debhelper-compat";

/// The package metadata for one distribution.
///
/// Loading is lenient until [`SourcePackage::complete`] is called; from then on
/// every required file must exist and pass validation.
#[derive(Debug, Clone)]
pub struct SourcePackage {
    package_dir: PathBuf,
    name: String,
    distribution: String,
    complete: bool,
    pub changelog: Changelog,
    pub control: Control,
    pub copyright: Copyright,
    pub compat: Compat,
    pub conffiles: ConfFiles,
    pub dirs: Dirs,
}

impl SourcePackage {
    /// Bind to a package directory and load whatever already exists there
    pub fn new(package_dir: impl Into<PathBuf>, env: &Environment) -> Result<Self> {
        let package_dir = package_dir.into();
        let name = package_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ControlError::invalid_field(
                    "package directory",
                    format!("'{}' does not name a directory", package_dir.display()),
                )
            })?;

        let mut package = Self {
            changelog: Changelog::new(&package_dir, &env.codename, &name),
            control: Control::new(&package_dir, &name),
            copyright: Copyright::new(&package_dir),
            compat: Compat::new(&package_dir),
            conffiles: PathList::conffiles(&package_dir),
            dirs: PathList::dirs(&package_dir),
            package_dir,
            name,
            distribution: env.codename.clone(),
            complete: false,
        };
        package.load()?;
        Ok(package)
    }

    /// Name of the source package, taken from its directory
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version of the newest changelog entry
    pub fn version(&self) -> Result<&str> {
        self.changelog.version()
    }

    pub fn distribution(&self) -> &str {
        &self.distribution
    }

    pub fn package_dir(&self) -> &Path {
        &self.package_dir
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn load(&mut self) -> Result<()> {
        debug!(package = %self.name, complete = self.complete, "loading source package");
        self.changelog.load(self.complete)?;
        self.control.load(self.complete)?;
        self.copyright.load(self.complete)?;
        self.compat.load()?;
        self.conffiles.load()?;
        self.dirs.load()?;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.changelog.save()?;
        self.control.save()?;
        self.copyright.save()?;
        self.compat.save()?;
        self.conffiles.save()?;
        self.dirs.save()?;
        Ok(())
    }

    /// Persist the package, then reload it with static checks enabled
    pub fn complete(&mut self) -> Result<()> {
        self.complete = true;
        self.save()?;
        self.load()?;
        info!(package = %self.name, "package definition complete");
        Ok(())
    }

    /// Add a changelog entry, defaulting the package and distribution
    pub fn add_to_changelog(&mut self, block: ChangeBlock) -> Result<()> {
        self.changelog.add(block)
    }

    /// Write `debian/source/format`, defaulting to `3.0 (quilt)`
    pub fn set_source_format(&self, format: Option<&str>) -> Result<()> {
        let path = self.package_dir.join(SOURCE_FORMAT_PATH);
        files::write(&path, format.unwrap_or(DEFAULT_SOURCE_FORMAT))
    }

    /// Set the debhelper compatibility level, by default the level of the
    /// package's distribution.
    ///
    /// A package that declares `debhelper-compat (= N)` in Build-Depends has that
    /// relation replaced. Otherwise the level goes to `debian/compat`.
    pub fn set_debhelper_compat_version(&mut self, version: Option<u32>) -> Result<()> {
        let version = match version {
            Some(version) => version,
            None => compat_for_distribution(&self.distribution)?,
        };

        let build_depends = self
            .control
            .source
            .as_mut()
            .and_then(|source| source.build_depends.as_mut())
            .filter(|relations| relations.relations().any(declares_debhelper_compat));

        match build_depends {
            Some(relations) => {
                let pinned = Dependency::new(DEBHELPER_COMPAT)
                    .with_version(Comparator::Equal, version.to_string());
                relations.add_relation(Relation::single(pinned), true)?;
                debug!(package = %self.name, version, "pinned debhelper-compat build dependency");
                self.control.save()
            }
            None => {
                self.compat.version = Some(version);
                debug!(package = %self.name, version, "set compat file");
                self.compat.save()
            }
        }
    }
}

fn declares_debhelper_compat(relation: &Relation) -> bool {
    relation.iter().any(|dep| {
        dep.name == DEBHELPER_COMPAT
            && dep
                .version
                .as_ref()
                .is_some_and(|v| v.relationship == Comparator::Equal)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary_paragraph::BinaryParagraph;
    use crate::compat::COMPAT_PATH;
    use crate::control::CONTROL_PATH;
    use crate::relation::PackageRelations;
    use crate::source_paragraph::SourceParagraph;
    use chrono::{FixedOffset, TimeZone};
    use tempfile::TempDir;

    fn env(codename: &str) -> Environment {
        Environment::new(codename, "amd64", "packages", "build", "artifacts")
    }

    fn package(root: &TempDir, name: &str, codename: &str) -> SourcePackage {
        let dir = root.path().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        SourcePackage::new(dir, &env(codename)).unwrap()
    }

    fn populate(package: &mut SourcePackage, build_depends: &str) {
        let mut source = SourceParagraph::new(package.name().to_string(), "Jane Doe <jane@example.com>");
        if !build_depends.is_empty() {
            source.build_depends = Some(PackageRelations::parse(build_depends).unwrap());
        }
        package.control.set_source(source).unwrap();
        package
            .control
            .add_binary(BinaryParagraph::new(package.name().to_string(), "any", "d"), false)
            .unwrap();
    }

    fn add_changelog(package: &mut SourcePackage, version: &str) {
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2021, 4, 5, 11, 13, 34)
            .unwrap();
        package
            .add_to_changelog(ChangeBlock::new(
                version,
                "medium",
                vec!["* Initial release.".to_string()],
                "Jane Doe <jane@example.com>",
                date,
            ))
            .unwrap();
    }

    #[test]
    fn test_name_comes_from_directory() {
        let root = TempDir::new().unwrap();
        let package = package(&root, "hello", "focal");
        assert_eq!(package.name(), "hello");
        assert_eq!(package.distribution(), "focal");
        assert!(!package.is_complete());
        assert!(package.version().is_err());
    }

    #[test]
    fn test_version_from_changelog() {
        let root = TempDir::new().unwrap();
        let mut package = package(&root, "hello", "focal");
        add_changelog(&mut package, "1.0-1");
        add_changelog(&mut package, "1.1-1");
        assert_eq!(package.version().unwrap(), "1.1-1");

        let text = std::fs::read_to_string(package.package_dir().join("debian/changelog")).unwrap();
        assert!(text.starts_with("hello (1.1-1) focal; urgency=medium\n"));
    }

    #[test]
    fn test_complete_requires_files() {
        let root = TempDir::new().unwrap();
        let mut package = package(&root, "hello", "focal");
        populate(&mut package, "");
        add_changelog(&mut package, "1.0-1");

        let err = package.complete().unwrap_err();
        assert!(matches!(err, ControlError::MissingFile { kind: "copyright", .. }));
    }

    #[test]
    fn test_complete_succeeds_with_all_files() {
        let root = TempDir::new().unwrap();
        let mut package = package(&root, "hello", "focal");
        populate(&mut package, "debhelper-compat (= 12)");
        add_changelog(&mut package, "1.0-1");
        package
            .copyright
            .set_header(crate::copyright::CopyrightHeader::default())
            .unwrap();

        package.complete().unwrap();
        assert!(package.is_complete());
        assert_eq!(package.control.binaries.len(), 1);
    }

    #[test]
    fn test_compat_replaces_debhelper_compat_relation() {
        let root = TempDir::new().unwrap();
        let mut package = package(&root, "hello", "bullseye");
        populate(&mut package, "debhelper-compat (= 11), libfoo-dev");

        package.set_debhelper_compat_version(None).unwrap();

        let build_depends = package.control.source.as_ref().unwrap().build_depends.as_ref().unwrap();
        assert_eq!(build_depends.to_string(), "libfoo-dev, debhelper-compat (= 13)");
        assert!(!package.package_dir().join(COMPAT_PATH).exists());

        let written = std::fs::read_to_string(package.package_dir().join(CONTROL_PATH)).unwrap();
        assert!(written.contains("debhelper-compat (= 13)"));
    }

    #[test]
    fn test_compat_without_relation_uses_file() {
        let root = TempDir::new().unwrap();
        let mut package = package(&root, "hello", "focal");
        populate(&mut package, "debhelper (>= 12)");

        package.set_debhelper_compat_version(Some(10)).unwrap();
        assert_eq!(package.compat.version, Some(10));
        assert_eq!(
            std::fs::read_to_string(package.package_dir().join(COMPAT_PATH)).unwrap(),
            "10"
        );
    }

    #[test]
    fn test_compat_unknown_distribution() {
        let root = TempDir::new().unwrap();
        let mut package = package(&root, "hello", "sid");
        let err = package.set_debhelper_compat_version(None).unwrap_err();
        assert!(matches!(err, ControlError::UnknownDistribution(_)));
    }

    #[test]
    fn test_set_source_format() {
        let root = TempDir::new().unwrap();
        let package = package(&root, "hello", "focal");
        package.set_source_format(None).unwrap();
        assert_eq!(
            std::fs::read_to_string(package.package_dir().join(SOURCE_FORMAT_PATH)).unwrap(),
            "3.0 (quilt)"
        );
        package.set_source_format(Some("3.0 (native)")).unwrap();
        assert_eq!(
            std::fs::read_to_string(package.package_dir().join(SOURCE_FORMAT_PATH)).unwrap(),
            "3.0 (native)"
        );
    }

    #[test]
    fn test_save_and_reload_all_parts() {
        let root = TempDir::new().unwrap();
        let mut package = package(&root, "hello", "focal");
        populate(&mut package, "");
        add_changelog(&mut package, "1.0-1");
        package.conffiles.add("/etc/hello.conf");
        package.dirs.add("var/lib/hello");
        package.save().unwrap();

        let reloaded = SourcePackage::new(package.package_dir(), &env("focal")).unwrap();
        assert_eq!(reloaded.version().unwrap(), "1.0-1");
        assert_eq!(reloaded.conffiles.len(), 1);
        assert_eq!(reloaded.dirs.len(), 1);
        assert_eq!(reloaded.control.name().unwrap(), "hello");
    }
}
