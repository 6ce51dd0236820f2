//! Debforge Control Metadata
//!
//! Typed model of the files under a package's `debian/` directory, plus the
//! bookkeeping needed to build several source packages together:
//! - Package relations (`Depends`, `Build-Depends`, ...) with parsing and merging
//! - Declarative deb822 schemas for control and copyright paragraphs
//! - Changelog, copyright, compat, conffiles and dirs files
//! - A registry of source packages and their build order
//!
//! # Example
//!
//! ```no_run
//! use debforge_control::{Environment, Registry, SourcePackage};
//!
//! let env = Environment::new("focal", "amd64", "packages", "build", "artifacts");
//! let mut registry = Registry::new(&env);
//! registry.add(SourcePackage::new("packages/hello", &env).unwrap()).unwrap();
//! for package in registry.build_order().unwrap() {
//!     println!("{}", package.name());
//! }
//! ```

pub mod error;

pub mod deb822;
pub mod relation;
pub mod schema;

pub mod binary_paragraph;
pub mod source_paragraph;

pub mod changelog;
pub mod compat;
pub mod conffiles;
pub mod control;
pub mod copyright;
pub mod environment;
mod files;
mod license_text;
pub mod version;

pub mod build_order;
pub mod registry;
pub mod source_package;

pub use binary_paragraph::BinaryParagraph;
pub use build_order::BuildOrderComputer;
pub use changelog::{parse_changelog, ChangeBlock, Changelog};
pub use compat::Compat;
pub use conffiles::{ConfFiles, Dirs, PathList};
pub use control::Control;
pub use copyright::{
    format_license_text, full_license_text, Copyright, CopyrightFiles, CopyrightHeader,
    CopyrightLicense, CopyrightStanza,
};
pub use deb822::{parse_paragraphs, render_paragraphs, Paragraph, SyntaxError};
pub use environment::{compat_for_distribution, Environment};
pub use error::{ControlError, ErrorKind, Result};
pub use license_text::SUPPORTED as SUPPORTED_LICENSES;
pub use registry::Registry;
pub use relation::{
    ArchRestriction, BuildRestriction, Comparator, Dependency, PackageRelations, Relation,
    RelationItem, SubstitutionRelation, VersionConstraint,
};
pub use schema::{ArraySeparator, FieldSpec, FieldType, FieldValue, Preserved, Schema};
pub use source_package::SourcePackage;
pub use source_paragraph::SourceParagraph;
pub use version::Version;
