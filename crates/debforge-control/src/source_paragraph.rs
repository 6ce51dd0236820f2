//! The source paragraph: first paragraph of `debian/control`

use crate::deb822::Paragraph;
use crate::error::{ControlError, Result};
use crate::relation::{PackageRelations, RelationItem};
use crate::schema::{access, optional_field, ArraySeparator, FieldSpec, FieldType, Preserved, Schema};

pub const DEFAULT_STANDARDS_VERSION: &str = "4.5.0";

/// Describes the buildable source unit and its build-time relations
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceParagraph {
    pub source: String,
    pub maintainer: String,
    pub standards_version: Option<String>,
    pub section: Option<String>,
    pub priority: Option<String>,
    pub build_depends: Option<PackageRelations>,
    pub build_depends_indep: Option<PackageRelations>,
    pub build_depends_arch: Option<PackageRelations>,
    pub build_conflicts: Option<PackageRelations>,
    pub build_conflicts_indep: Option<PackageRelations>,
    pub build_conflicts_arch: Option<PackageRelations>,
    pub uploaders: Option<Vec<String>>,
    pub homepage: Option<String>,
    pub bugs: Option<String>,
    pub origin: Option<String>,
    /// Second half of the `Vcs-{type}` field name, e.g. `Git`
    pub vcs_type: Option<String>,
    pub vcs_type_value: Option<String>,
    pub vcs_browser: Option<String>,
    pub testsuite: Option<Vec<String>>,
    pub testsuite_triggers: Option<Vec<String>>,
    pub rules_requires_root: Option<String>,
    pub preserved: Preserved,
}

impl SourceParagraph {
    pub fn new(source: impl Into<String>, maintainer: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            maintainer: maintainer.into(),
            standards_version: Some(DEFAULT_STANDARDS_VERSION.to_string()),
            ..Default::default()
        }
    }

    /// Build-Depends, Build-Depends-Indep and Build-Depends-Arch merged into
    /// one list. A later relation replaces an earlier one naming the same package.
    pub fn all_build_depends(&self) -> Result<PackageRelations> {
        let mut all = PackageRelations::default();

        let fields = [
            &self.build_depends,
            &self.build_depends_indep,
            &self.build_depends_arch,
        ];
        for relations in fields.into_iter().flatten() {
            for item in relations {
                match item {
                    RelationItem::Relation(r) => all.add_relation(r.clone(), true)?,
                    RelationItem::Substitution(s) => all.add_substitution(s.clone()),
                }
            }
        }

        Ok(all)
    }
}

impl Schema for SourceParagraph {
    const CONTEXT: &'static str = "source paragraph";

    fn fields() -> Vec<FieldSpec<Self>> {
        vec![
            FieldSpec::<Self>::new(
                "Source",
                FieldType::String,
                |s| access::required_string(&s.source),
                |s, v| {
                    s.source = v.into_string("Source")?;
                    Ok(())
                },
            )
            .required(),
            FieldSpec::<Self>::new(
                "Maintainer",
                FieldType::String,
                |s| access::required_string(&s.maintainer),
                |s, v| {
                    s.maintainer = v.into_string("Maintainer")?;
                    Ok(())
                },
            )
            .required(),
            optional_field!("Standards-Version", FieldType::String, standards_version, access::string, into_string),
            optional_field!("Section", FieldType::String, section, access::string, into_string),
            optional_field!("Priority", FieldType::String, priority, access::string, into_string),
            optional_field!("Build-Depends", FieldType::Relations, build_depends, access::relations, into_relations),
            optional_field!(
                "Build-Depends-Indep",
                FieldType::Relations,
                build_depends_indep,
                access::relations,
                into_relations
            ),
            optional_field!(
                "Build-Depends-Arch",
                FieldType::Relations,
                build_depends_arch,
                access::relations,
                into_relations
            ),
            optional_field!("Build-Conflicts", FieldType::Relations, build_conflicts, access::relations, into_relations),
            optional_field!(
                "Build-Conflicts-Indep",
                FieldType::Relations,
                build_conflicts_indep,
                access::relations,
                into_relations
            ),
            optional_field!(
                "Build-Conflicts-Arch",
                FieldType::Relations,
                build_conflicts_arch,
                access::relations,
                into_relations
            ),
            optional_field!(
                "Uploaders",
                FieldType::Array(ArraySeparator::Commas),
                uploaders,
                access::array,
                into_array
            ),
            optional_field!("Homepage", FieldType::String, homepage, access::string, into_string),
            optional_field!("Bugs", FieldType::String, bugs, access::string, into_string),
            optional_field!("Origin", FieldType::String, origin, access::string, into_string),
            optional_field!("Vcs-Browser", FieldType::String, vcs_browser, access::string, into_string),
            optional_field!(
                "Testsuite",
                FieldType::Array(ArraySeparator::Commas),
                testsuite,
                access::array,
                into_array
            ),
            optional_field!(
                "Testsuite-Triggers",
                FieldType::Array(ArraySeparator::Commas),
                testsuite_triggers,
                access::array,
                into_array
            ),
            optional_field!(
                "Rules-Requires-Root",
                FieldType::String,
                rules_requires_root,
                access::string,
                into_string
            ),
        ]
    }

    fn preserved(&self) -> &Preserved {
        &self.preserved
    }

    fn preserved_mut(&mut self) -> &mut Preserved {
        &mut self.preserved
    }

    fn serialize_dynamic(&self, paragraph: &mut Paragraph) -> Result<()> {
        if let (Some(vcs_type), Some(value)) = (&self.vcs_type, &self.vcs_type_value) {
            paragraph.set(format!("Vcs-{}", vcs_type), value.clone());
        }
        Ok(())
    }

    fn deserialize_dynamic(&mut self, paragraph: &Paragraph) -> Result<Vec<String>> {
        let vcs_fields: Vec<&str> = paragraph
            .keys()
            .filter(|key| {
                let lower = key.to_ascii_lowercase();
                lower.starts_with("vcs-") && lower != "vcs-browser"
            })
            .collect();

        match vcs_fields.as_slice() {
            [] => Ok(Vec::new()),
            [key] => {
                self.vcs_type = Some(key[4..].to_string());
                self.vcs_type_value = paragraph.get(key).map(|v| v.trim().to_string());
                Ok(vec![key.to_string()])
            }
            several => Err(ControlError::invalid_field(
                "Vcs-*",
                format!(
                    "only one version control field may be given, found {}",
                    several.join(", ")
                ),
            )),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.vcs_type.is_some() != self.vcs_type_value.is_some() {
            return Err(ControlError::invalid_field(
                "Vcs-*",
                "vcs_type and vcs_type_value must be set together. They form a single field in the format 'Vcs-{vcs_type}: {vcs_type_value}'",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deb822::parse_paragraphs;
    use crate::relation::Relation;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "Source: gstreamer1.0
Section: libs
Priority: optional
Maintainer: Maintainers of GStreamer packages <gst@example.org>
Uploaders: Sebastian Dröge <slomo@debian.org>, Sjoerd Simons <sjoerd@debian.org>
Build-Depends:
 debhelper-compat (= 13),
 libglib2.0-dev (>= 2.56),
 libgmp-dev <!nocheck>,
Build-Depends-Indep:
 libglib2.0-doc,
Standards-Version: 4.5.1
Vcs-Git: https://salsa.debian.org/gstreamer-team/gstreamer1.0.git
Vcs-Browser: https://salsa.debian.org/gstreamer-team/gstreamer1.0
Homepage: https://gstreamer.freedesktop.org
Rules-Requires-Root: no
";

    fn parse(text: &str) -> Result<SourceParagraph> {
        SourceParagraph::from_paragraph(&parse_paragraphs(text).unwrap()[0])
    }

    #[test]
    fn test_deserialize_source_paragraph() {
        let source = parse(SOURCE).unwrap();
        assert_eq!(source.source, "gstreamer1.0");
        assert_eq!(source.standards_version.as_deref(), Some("4.5.1"));
        assert_eq!(source.uploaders.as_ref().unwrap().len(), 2);
        assert_eq!(source.build_depends.as_ref().unwrap().len(), 3);
        assert_eq!(source.vcs_type.as_deref(), Some("Git"));
        assert_eq!(
            source.vcs_type_value.as_deref(),
            Some("https://salsa.debian.org/gstreamer-team/gstreamer1.0.git")
        );
        assert_eq!(
            source.vcs_browser.as_deref(),
            Some("https://salsa.debian.org/gstreamer-team/gstreamer1.0")
        );
    }

    #[test]
    fn test_round_trip_keeps_layout() {
        let source = parse(SOURCE).unwrap();
        assert_eq!(source.to_paragraph().unwrap().to_string(), SOURCE);
    }

    #[test]
    fn test_serialize_new_paragraph() {
        let mut source = SourceParagraph::new("hello", "Jane Doe <jane@example.com>");
        source.build_depends = Some(PackageRelations::parse("debhelper-compat (= 13)").unwrap());
        source.vcs_type = Some("Git".to_string());
        source.vcs_type_value = Some("https://example.com/hello.git".to_string());

        assert_eq!(
            source.to_paragraph().unwrap().to_string(),
            "Source: hello
Maintainer: Jane Doe <jane@example.com>
Standards-Version: 4.5.0
Build-Depends:
 debhelper-compat (= 13),
Vcs-Git: https://example.com/hello.git
"
        );
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let source = parse("Source: a\nMaintainer: m\nX-Python3-Version: >= 3.8\n").unwrap();
        assert_eq!(source.preserved.get("X-Python3-Version"), Some(">= 3.8"));
        assert!(source
            .to_paragraph()
            .unwrap()
            .to_string()
            .contains("X-Python3-Version: >= 3.8"));
    }

    #[test]
    fn test_multiple_vcs_fields_rejected() {
        let err = parse("Source: a\nMaintainer: m\nVcs-Git: x\nVcs-Svn: y\n").unwrap_err();
        assert!(err.to_string().contains("Vcs-Git"));
        assert!(err.to_string().contains("Vcs-Svn"));
    }

    #[test]
    fn test_vcs_pair_must_be_complete() {
        let mut source = SourceParagraph::new("a", "m");
        source.vcs_type = Some("Git".to_string());
        assert!(source.to_paragraph().is_err());
    }

    #[test]
    fn test_missing_source_field() {
        let err = parse("Maintainer: m\n").unwrap_err();
        assert!(matches!(err, ControlError::MissingField { .. }));
    }

    #[test]
    fn test_all_build_depends_later_wins() {
        let mut source = SourceParagraph::new("a", "m");
        source.build_depends =
            Some(PackageRelations::parse("debhelper-compat (= 12), libfoo (>= 1), ${misc:Depends}").unwrap());
        source.build_depends_indep = Some(PackageRelations::parse("python3-sphinx").unwrap());
        source.build_depends_arch = Some(PackageRelations::parse("libfoo (>= 2)").unwrap());

        let all = source.all_build_depends().unwrap();
        assert_eq!(
            all.to_string(),
            "debhelper-compat (= 12), ${misc:Depends}, python3-sphinx, libfoo (>= 2)"
        );
        assert!(all
            .relations()
            .any(|r| *r == Relation::parse("libfoo (>= 2)").unwrap()));
    }
}
