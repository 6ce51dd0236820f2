//! Binary package paragraphs of `debian/control`

use crate::relation::PackageRelations;
use crate::schema::{access, optional_field, ArraySeparator, FieldSpec, FieldType, Preserved, Schema};

/// One installable package produced by the source package
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BinaryParagraph {
    pub package: String,
    pub architecture: String,
    pub description: String,
    pub build_profiles: Option<String>,
    pub protected: Option<bool>,
    pub section: Option<String>,
    pub priority: Option<String>,
    pub essential: Option<bool>,
    pub build_essential: Option<bool>,
    pub multi_arch: Option<String>,
    pub tag: Option<Vec<String>>,
    pub depends: Option<PackageRelations>,
    pub recommends: Option<PackageRelations>,
    pub suggests: Option<PackageRelations>,
    pub enhances: Option<PackageRelations>,
    pub conflicts: Option<PackageRelations>,
    pub pre_depends: Option<PackageRelations>,
    pub breaks: Option<PackageRelations>,
    pub replaces: Option<PackageRelations>,
    pub provides: Option<PackageRelations>,
    pub homepage: Option<String>,
    pub built_using: Option<Vec<String>>,
    pub subarchitecture: Option<String>,
    pub kernel_version: Option<String>,
    pub installer_menu_item: Option<String>,
    pub package_type: Option<String>,
    pub preserved: Preserved,
}

impl BinaryParagraph {
    pub fn new(
        package: impl Into<String>,
        architecture: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            architecture: architecture.into(),
            description: description.into(),
            ..Default::default()
        }
    }
}

impl Schema for BinaryParagraph {
    const CONTEXT: &'static str = "binary paragraph";

    fn fields() -> Vec<FieldSpec<Self>> {
        vec![
            FieldSpec::<Self>::new(
                "Package",
                FieldType::String,
                |s| access::required_string(&s.package),
                |s, v| {
                    s.package = v.into_string("Package")?;
                    Ok(())
                },
            )
            .required(),
            FieldSpec::<Self>::new(
                "Architecture",
                FieldType::String,
                |s| access::required_string(&s.architecture),
                |s, v| {
                    s.architecture = v.into_string("Architecture")?;
                    Ok(())
                },
            )
            .required(),
            FieldSpec::<Self>::new(
                "Description",
                FieldType::String,
                |s| access::required_string(&s.description),
                |s, v| {
                    s.description = v.into_string("Description")?;
                    Ok(())
                },
            )
            .required(),
            optional_field!("Build-Profiles", FieldType::String, build_profiles, access::string, into_string),
            optional_field!("Protected", FieldType::Bool, protected, access::boolean, into_bool),
            optional_field!("Section", FieldType::String, section, access::string, into_string),
            optional_field!("Priority", FieldType::String, priority, access::string, into_string),
            optional_field!("Essential", FieldType::Bool, essential, access::boolean, into_bool),
            optional_field!("Build-Essential", FieldType::Bool, build_essential, access::boolean, into_bool),
            optional_field!("Multi-Arch", FieldType::String, multi_arch, access::string, into_string),
            optional_field!(
                "Tag",
                FieldType::Array(ArraySeparator::WhitespaceSeparated),
                tag,
                access::array,
                into_array
            ),
            optional_field!("Depends", FieldType::Relations, depends, access::relations, into_relations),
            optional_field!("Recommends", FieldType::Relations, recommends, access::relations, into_relations),
            optional_field!("Suggests", FieldType::Relations, suggests, access::relations, into_relations),
            optional_field!("Enhances", FieldType::Relations, enhances, access::relations, into_relations),
            optional_field!("Conflicts", FieldType::Relations, conflicts, access::relations, into_relations),
            optional_field!("Pre-Depends", FieldType::Relations, pre_depends, access::relations, into_relations),
            optional_field!("Breaks", FieldType::Relations, breaks, access::relations, into_relations),
            optional_field!("Replaces", FieldType::Relations, replaces, access::relations, into_relations),
            optional_field!("Provides", FieldType::Relations, provides, access::relations, into_relations),
            optional_field!("Homepage", FieldType::String, homepage, access::string, into_string),
            optional_field!(
                "Built-Using",
                FieldType::Array(ArraySeparator::Commas),
                built_using,
                access::array,
                into_array
            ),
            optional_field!("Subarchitecture", FieldType::String, subarchitecture, access::string, into_string),
            optional_field!("Kernel-Version", FieldType::String, kernel_version, access::string, into_string),
            optional_field!(
                "Installer-Menu-Item",
                FieldType::String,
                installer_menu_item,
                access::string,
                into_string
            ),
            optional_field!("Package-Type", FieldType::String, package_type, access::string, into_string),
        ]
    }

    fn preserved(&self) -> &Preserved {
        &self.preserved
    }

    fn preserved_mut(&mut self) -> &mut Preserved {
        &mut self.preserved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deb822::parse_paragraphs;
    use crate::error::ControlError;
    use pretty_assertions::assert_eq;

    const BINARY: &str = "Package: libgstreamer1.0-0
Architecture: any
Multi-Arch: same
Section: libs
Depends:
 ${shlibs:Depends},
 ${misc:Depends},
Suggests:
 gstreamer1.0-tools,
Conflicts:
 libgstreamer-plugins-base1.0-0 (<< 1.8),
Description: Core GStreamer libraries and elements
 GStreamer is a streaming media framework.
 .
 This package contains the core library and elements.
Essential: no
Tag: role::shared-lib implemented-in::c
";

    #[test]
    fn test_deserialize_binary_paragraph() {
        let paragraph = &parse_paragraphs(BINARY).unwrap()[0];
        let binary = BinaryParagraph::from_paragraph(paragraph).unwrap();

        assert_eq!(binary.package, "libgstreamer1.0-0");
        assert_eq!(binary.multi_arch.as_deref(), Some("same"));
        assert_eq!(binary.depends.as_ref().unwrap().len(), 2);
        assert_eq!(binary.conflicts.as_ref().unwrap().names().collect::<Vec<_>>(), vec![
            "libgstreamer-plugins-base1.0-0"
        ]);
        assert_eq!(binary.essential, Some(false));
        assert_eq!(
            binary.tag,
            Some(vec!["role::shared-lib".to_string(), "implemented-in::c".to_string()])
        );
        assert!(binary.description.starts_with("Core GStreamer libraries"));
    }

    #[test]
    fn test_round_trip_keeps_layout() {
        let paragraph = &parse_paragraphs(BINARY).unwrap()[0];
        let binary = BinaryParagraph::from_paragraph(paragraph).unwrap();
        assert_eq!(binary.to_paragraph().unwrap().to_string(), BINARY);
    }

    #[test]
    fn test_serialize_new_binary() {
        let mut binary = BinaryParagraph::new("hello", "any", "says hello");
        binary.depends = Some(PackageRelations::parse("${misc:Depends}, libc6").unwrap());
        binary.protected = Some(true);
        binary.built_using = Some(vec!["gcc-10 (= 10.2.1-6)".to_string()]);

        assert_eq!(
            binary.to_paragraph().unwrap().to_string(),
            "Package: hello
Architecture: any
Description: says hello
Protected: yes
Depends:
 ${misc:Depends},
 libc6,
Built-Using: gcc-10 (= 10.2.1-6)
"
        );
    }

    #[test]
    fn test_missing_description() {
        let paragraph = &parse_paragraphs("Package: a\nArchitecture: all\n").unwrap()[0];
        let err = BinaryParagraph::from_paragraph(paragraph).unwrap_err();
        assert!(matches!(err, ControlError::MissingField { ref field, .. } if field == "Description"));
    }
}
