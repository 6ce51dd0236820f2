//! Package Definitions (package.toml)
//!
//! Each package directory may carry a `package.toml` describing the files to
//! generate under `debian/`. Packages without one must already have those
//! files on disk.

use crate::{ConfigError, ConfigResult};
use chrono::DateTime;
use debforge_control::{
    BinaryParagraph, ChangeBlock, ControlError, CopyrightFiles, CopyrightHeader, CopyrightLicense,
    Environment, PackageRelations, Registry, SourcePackage, SourceParagraph,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the package definition file
pub const PACKAGE_FILE: &str = "package.toml";

/// Package definition from package.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PackageDefinition {
    /// Repository component the package's artifacts are stored in
    #[serde(default = "default_component")]
    pub component: String,

    /// Contents of `debian/source/format`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_format: Option<String>,

    /// Debhelper compatibility level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compat: Option<CompatSetting>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conffiles: Vec<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dirs: Vec<PathBuf>,

    /// Source paragraph of the control file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceDefinition>,

    /// Binary paragraphs of the control file
    #[serde(default, rename = "binary", skip_serializing_if = "Vec::is_empty")]
    pub binaries: Vec<BinaryDefinition>,

    /// Changelog entries, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changelog: Vec<ChangelogEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<CopyrightDefinition>,

    #[serde(default, skip_serializing_if = "PreBuild::is_empty")]
    pub pre_build: PreBuild,
}

fn default_component() -> String {
    "main".to_string()
}

impl Default for PackageDefinition {
    fn default() -> Self {
        Self {
            component: default_component(),
            source_format: None,
            compat: None,
            conffiles: Vec::new(),
            dirs: Vec::new(),
            source: None,
            binaries: Vec::new(),
            changelog: Vec::new(),
            copyright: None,
            pre_build: PreBuild::default(),
        }
    }
}

/// Either an explicit level or `"distribution"` for the level of the
/// distribution being built for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CompatSetting {
    Level(u32),
    Named(String),
}

const COMPAT_FROM_DISTRIBUTION: &str = "distribution";

/// Source paragraph fields. Relation lists hold one relation per entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SourceDefinition {
    pub maintainer: String,
    pub section: Option<String>,
    pub priority: Option<String>,
    pub standards_version: Option<String>,
    pub homepage: Option<String>,
    #[serde(default)]
    pub uploaders: Vec<String>,
    #[serde(default)]
    pub build_depends: Vec<String>,
    #[serde(default)]
    pub build_depends_indep: Vec<String>,
    #[serde(default)]
    pub build_depends_arch: Vec<String>,
    #[serde(default)]
    pub build_conflicts: Vec<String>,
    /// Second half of the `Vcs-*` field name, e.g. `Git`
    pub vcs_type: Option<String>,
    pub vcs: Option<String>,
    pub vcs_browser: Option<String>,
    pub rules_requires_root: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BinaryDefinition {
    pub package: String,
    pub architecture: String,
    pub description: String,
    pub section: Option<String>,
    pub priority: Option<String>,
    pub multi_arch: Option<String>,
    pub essential: Option<bool>,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub pre_depends: Vec<String>,
    #[serde(default)]
    pub recommends: Vec<String>,
    #[serde(default)]
    pub suggests: Vec<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
    #[serde(default)]
    pub breaks: Vec<String>,
    #[serde(default)]
    pub replaces: Vec<String>,
    #[serde(default)]
    pub provides: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ChangelogEntry {
    pub version: String,
    #[serde(default = "default_urgency")]
    pub urgency: String,
    pub changes: Vec<String>,
    pub author: String,
    /// RFC 2822 date, like `Mon, 05 Apr 2021 11:13:34 +0300`
    pub date: String,
}

fn default_urgency() -> String {
    "medium".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CopyrightDefinition {
    pub upstream_name: Option<String>,
    #[serde(default)]
    pub upstream_contact: Vec<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub files: Vec<CopyrightFilesDefinition>,
    /// SPDX identifiers whose full text is appended as license stanzas
    #[serde(default)]
    pub licenses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CopyrightFilesDefinition {
    pub files: Vec<String>,
    pub copyright: String,
    pub license: String,
}

/// Hook run after every package of the build has been registered
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PreBuild {
    /// Binary packages built in the same run whose exact version becomes a
    /// build dependency
    #[serde(default)]
    pub pin_build_depends: Vec<String>,
}

impl PreBuild {
    pub fn is_empty(&self) -> bool {
        self.pin_build_depends.is_empty()
    }
}

impl PackageDefinition {
    /// Load the definition of a package directory. A directory without a
    /// package.toml gets the default definition.
    pub fn load(package_dir: &Path) -> ConfigResult<Self> {
        let path = package_dir.join(PACKAGE_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::IoError(e)),
        };

        let definition: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.clone(),
            error: e,
        })?;
        definition.validate()?;
        debug!(path = %path.display(), "loaded package definition");
        Ok(definition)
    }

    /// Validate the package definition
    pub fn validate(&self) -> ConfigResult<()> {
        if self.component.trim().is_empty() {
            return Err(ConfigError::invalid_value("component", "component cannot be empty"));
        }
        if let Some(CompatSetting::Named(name)) = &self.compat {
            if name != COMPAT_FROM_DISTRIBUTION {
                return Err(ConfigError::invalid_value(
                    "compat",
                    format!(
                        "expected a level or \"{}\", got \"{}\"",
                        COMPAT_FROM_DISTRIBUTION, name
                    ),
                ));
            }
        }
        if !self.binaries.is_empty() && self.source.is_none() {
            return Err(ConfigError::invalid_value(
                "binary",
                "binary packages require a [source] table",
            ));
        }
        for entry in &self.changelog {
            parse_date(&entry.date)?;
        }
        Ok(())
    }

    /// Write everything this definition describes into the package's files.
    /// Applying the same definition twice leaves the files unchanged.
    pub fn apply(&self, package: &mut SourcePackage) -> ConfigResult<()> {
        let name = package.name().to_string();
        let in_package = || ConfigError::in_package(&name);

        if let Some(source) = &self.source {
            let paragraph = source.to_paragraph(&name)?;
            package.control.set_source(paragraph).map_err(in_package())?;
            package
                .set_source_format(self.source_format.as_deref())
                .map_err(in_package())?;
        }

        for binary in &self.binaries {
            package
                .control
                .add_binary(binary.to_paragraph()?, true)
                .map_err(in_package())?;
        }

        for entry in &self.changelog {
            let known = package
                .changelog
                .blocks()
                .iter()
                .any(|b| b.version == entry.version);
            if !known {
                package
                    .add_to_changelog(entry.to_block()?)
                    .map_err(in_package())?;
            }
        }

        if let Some(copyright) = &self.copyright {
            if package.copyright.is_empty() {
                copyright.apply(package).map_err(in_package())?;
            }
        }

        match &self.compat {
            Some(CompatSetting::Level(level)) => package
                .set_debhelper_compat_version(Some(*level))
                .map_err(in_package())?,
            Some(CompatSetting::Named(_)) => package
                .set_debhelper_compat_version(None)
                .map_err(in_package())?,
            None => {}
        }

        for path in &self.conffiles {
            if !package.conffiles.contains(path) {
                package.conffiles.add(path.clone());
            }
        }
        for path in &self.dirs {
            if !package.dirs.contains(path) {
                package.dirs.add(path.clone());
            }
        }
        package.conffiles.save().map_err(in_package())?;
        package.dirs.save().map_err(in_package())?;

        Ok(())
    }

    /// Run the pre-build hook of the package called `name`
    pub fn run_pre_build(&self, name: &str, registry: &mut Registry) -> ConfigResult<()> {
        let in_package = || ConfigError::in_package(name);

        for binary in &self.pre_build.pin_build_depends {
            let relation = registry.make_relation(binary).map_err(in_package())?;
            let package = registry.get_mut(name).ok_or_else(|| {
                ConfigError::in_package(name)(ControlError::unexpected(
                    "pre-build hook ran for a package that is not registered",
                ))
            })?;

            let source = package.control.source.as_mut().ok_or_else(|| {
                ConfigError::in_package(name)(
                    ControlError::MissingSourceParagraph(name.to_string()),
                )
            })?;
            info!(package = %name, relation = %relation, "pinning build dependency");
            source
                .build_depends
                .get_or_insert_with(PackageRelations::default)
                .add_relation(relation, true)
                .map_err(in_package())?;
            package.control.save().map_err(in_package())?;
        }
        Ok(())
    }
}

impl SourceDefinition {
    fn to_paragraph(&self, name: &str) -> ConfigResult<SourceParagraph> {
        let mut paragraph = SourceParagraph::new(name, self.maintainer.as_str());
        if let Some(version) = &self.standards_version {
            paragraph.standards_version = Some(version.clone());
        }
        paragraph.section = self.section.clone();
        paragraph.priority = self.priority.clone();
        paragraph.homepage = self.homepage.clone();
        paragraph.uploaders = non_empty(&self.uploaders);
        paragraph.build_depends = relations("source.build-depends", &self.build_depends)?;
        paragraph.build_depends_indep =
            relations("source.build-depends-indep", &self.build_depends_indep)?;
        paragraph.build_depends_arch =
            relations("source.build-depends-arch", &self.build_depends_arch)?;
        paragraph.build_conflicts = relations("source.build-conflicts", &self.build_conflicts)?;
        paragraph.vcs_type = self.vcs_type.clone();
        paragraph.vcs_type_value = self.vcs.clone();
        paragraph.vcs_browser = self.vcs_browser.clone();
        paragraph.rules_requires_root = self.rules_requires_root.clone();
        Ok(paragraph)
    }
}

impl BinaryDefinition {
    fn to_paragraph(&self) -> ConfigResult<BinaryParagraph> {
        let field = |name: &str| format!("binary.{}.{}", self.package, name);

        let mut paragraph = BinaryParagraph::new(
            self.package.as_str(),
            self.architecture.as_str(),
            self.description.as_str(),
        );
        paragraph.section = self.section.clone();
        paragraph.priority = self.priority.clone();
        paragraph.multi_arch = self.multi_arch.clone();
        paragraph.essential = self.essential;
        paragraph.depends = relations(&field("depends"), &self.depends)?;
        paragraph.pre_depends = relations(&field("pre-depends"), &self.pre_depends)?;
        paragraph.recommends = relations(&field("recommends"), &self.recommends)?;
        paragraph.suggests = relations(&field("suggests"), &self.suggests)?;
        paragraph.conflicts = relations(&field("conflicts"), &self.conflicts)?;
        paragraph.breaks = relations(&field("breaks"), &self.breaks)?;
        paragraph.replaces = relations(&field("replaces"), &self.replaces)?;
        paragraph.provides = relations(&field("provides"), &self.provides)?;
        Ok(paragraph)
    }
}

impl ChangelogEntry {
    fn to_block(&self) -> ConfigResult<ChangeBlock> {
        Ok(ChangeBlock::new(
            self.version.as_str(),
            self.urgency.as_str(),
            self.changes.clone(),
            self.author.as_str(),
            parse_date(&self.date)?,
        ))
    }
}

impl CopyrightDefinition {
    fn apply(&self, package: &mut SourcePackage) -> debforge_control::Result<()> {
        let header = CopyrightHeader {
            upstream_name: self.upstream_name.clone(),
            upstream_contact: non_empty(&self.upstream_contact),
            source: self.source.clone(),
            ..Default::default()
        };
        package.copyright.set_header(header)?;

        for files in &self.files {
            package.copyright.add_files(CopyrightFiles::new(
                files.files.clone(),
                files.copyright.as_str(),
                files.license.as_str(),
            ))?;
        }
        for license in &self.licenses {
            package.copyright.add_license(CopyrightLicense::spdx(license)?)?;
        }
        Ok(())
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

fn relations(field: &str, values: &[String]) -> ConfigResult<Option<PackageRelations>> {
    if values.is_empty() {
        return Ok(None);
    }
    PackageRelations::from_strings(values)
        .map(Some)
        .map_err(|e| ConfigError::invalid_value(field, e.to_string()))
}

fn parse_date(value: &str) -> ConfigResult<DateTime<chrono::FixedOffset>> {
    DateTime::parse_from_rfc2822(value).map_err(|e| {
        ConfigError::invalid_value("changelog.date", format!("'{}' is not an RFC 2822 date: {}", value, e))
    })
}

/// Every package of one distribution, registered and with pre-build hooks run
#[derive(Debug, Clone)]
pub struct LoadedPackages {
    pub registry: Registry,
    /// Definitions by package name, in registration order
    pub definitions: Vec<(String, PackageDefinition)>,
}

impl LoadedPackages {
    pub fn definition(&self, name: &str) -> Option<&PackageDefinition> {
        self.definitions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
    }
}

/// Load every package directory under the environment's package root,
/// sorted by directory name.
///
/// Each package is brought up to date with its definition and completed,
/// which enables strict checks. Pre-build hooks run once all packages are
/// registered.
pub fn load_packages(env: &Environment) -> ConfigResult<LoadedPackages> {
    let package_dirs = package_dirs(&env.package_root)?;

    let mut registry = Registry::new(env);
    let mut definitions = Vec::with_capacity(package_dirs.len());

    for package_dir in package_dirs {
        let definition = PackageDefinition::load(&package_dir)?;
        let mut package = SourcePackage::new(&package_dir, env)?;
        let name = package.name().to_string();

        definition.apply(&mut package)?;
        package.complete().map_err(ConfigError::in_package(&name))?;
        registry.add(package)?;
        definitions.push((name, definition));
    }

    for (name, definition) in &definitions {
        debug!(package = %name, "running pre-build hook");
        definition.run_pre_build(name, &mut registry)?;
    }

    info!(
        distribution = %env.codename,
        packages = registry.len(),
        "loaded packages"
    );
    Ok(LoadedPackages {
        registry,
        definitions,
    })
}

fn package_dirs(package_root: &Path) -> ConfigResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(package_root).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(package_root.to_path_buf())
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    if dirs.is_empty() {
        return Err(ConfigError::NoPackages(package_root.to_path_buf()));
    }
    dirs.sort();
    Ok(dirs)
}
