//! `debian/control`: one source paragraph followed by binary paragraphs

use crate::binary_paragraph::BinaryParagraph;
use crate::deb822::{parse_paragraphs, render_paragraphs};
use crate::error::{ControlError, Result};
use crate::files;
use crate::schema::Schema;
use crate::source_paragraph::SourceParagraph;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONTROL_PATH: &str = "debian/control";

#[derive(Debug, Clone)]
pub struct Control {
    path: PathBuf,
    package_name: String,
    pub source: Option<SourceParagraph>,
    pub binaries: Vec<BinaryParagraph>,
}

impl Control {
    pub fn new(package_dir: &Path, package_name: impl Into<String>) -> Self {
        Self {
            path: package_dir.join(CONTROL_PATH),
            package_name: package_name.into(),
            source: None,
            binaries: Vec::new(),
        }
    }

    /// The source package name, as declared by the source paragraph
    pub fn name(&self) -> Result<&str> {
        self.source
            .as_ref()
            .map(|s| s.source.as_str())
            .ok_or(ControlError::NotLoaded("source package name"))
    }

    pub fn binary(&self, package: &str) -> Option<&BinaryParagraph> {
        self.binaries.iter().find(|b| b.package == package)
    }

    /// Names of every binary package this control file produces
    pub fn binary_names(&self) -> impl Iterator<Item = &str> {
        self.binaries.iter().map(|b| b.package.as_str())
    }

    pub fn set_source(&mut self, source: SourceParagraph) -> Result<()> {
        self.check_name(&source.source)?;
        source.validate()?;
        let previous = self.source.replace(source);
        if let Err(e) = self.save() {
            self.source = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Add a binary paragraph. A paragraph with the same package name is an
    /// error unless `replace_if_exists` is set, in which case it is replaced.
    pub fn add_binary(&mut self, binary: BinaryParagraph, replace_if_exists: bool) -> Result<()> {
        binary.validate()?;
        let previous = match self.binaries.iter().position(|b| b.package == binary.package) {
            Some(_) if !replace_if_exists => {
                return Err(ControlError::DuplicateBinary(binary.package));
            }
            Some(index) => Some((index, std::mem::replace(&mut self.binaries[index], binary))),
            None => {
                self.binaries.push(binary);
                None
            }
        };
        if let Err(e) = self.save() {
            match previous {
                Some((index, old)) => self.binaries[index] = old,
                None => {
                    self.binaries.pop();
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn check_name(&self, source_name: &str) -> Result<()> {
        if source_name != self.package_name {
            return Err(ControlError::NameMismatch {
                source_name: source_name.to_string(),
                directory: self.package_name.clone(),
            });
        }
        Ok(())
    }

    pub fn load(&mut self, complete: bool) -> Result<()> {
        let text = match files::read_checked(&self.path, "control", complete)? {
            Some(text) => text,
            None => {
                self.source = None;
                self.binaries.clear();
                return Ok(());
            }
        };

        let paragraphs = parse_paragraphs(&text).map_err(|e| ControlError::parse(&self.path, e))?;
        if paragraphs.len() < 2 {
            return Err(ControlError::parse(
                &self.path,
                "The control file must have at least two paragraphs: the source paragraph and one or more binary paragraphs",
            ));
        }

        let (first, rest) = paragraphs.split_at(1);
        if !first[0].contains("Source") {
            return Err(ControlError::MissingSourceParagraph(self.package_name.clone()));
        }
        let source = SourceParagraph::from_paragraph(&first[0])?;
        self.check_name(&source.source)?;

        let binaries = rest
            .iter()
            .map(BinaryParagraph::from_paragraph)
            .collect::<Result<Vec<BinaryParagraph>>>()?;
        for (i, binary) in binaries.iter().enumerate() {
            if binaries[..i].iter().any(|b| b.package == binary.package) {
                return Err(ControlError::parse(
                    &self.path,
                    format!("binary package '{}' is defined more than once", binary.package),
                ));
            }
        }

        debug!(package = %self.package_name, binaries = binaries.len(), "loaded control file");
        self.source = Some(source);
        self.binaries = binaries;
        Ok(())
    }

    /// Render the control file, or `None` when there is no source paragraph
    pub fn render(&self) -> Result<Option<String>> {
        let source = match &self.source {
            Some(source) => source,
            None => return Ok(None),
        };
        let mut paragraphs = vec![source.to_paragraph()?];
        for binary in &self.binaries {
            paragraphs.push(binary.to_paragraph()?);
        }
        Ok(Some(render_paragraphs(&paragraphs)))
    }

    pub fn save(&self) -> Result<()> {
        match self.render()? {
            Some(text) => files::write(&self.path, &text),
            None => Ok(()),
        }
    }
}
