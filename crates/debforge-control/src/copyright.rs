//! Machine-readable `debian/copyright`
//!
//! A header stanza followed by `Files` stanzas and standalone `License`
//! stanzas. Stanza order is kept as read; new `Files` stanzas go after the
//! last existing one and new `License` stanzas go at the end.

use crate::deb822::{parse_paragraphs, render_paragraphs, Paragraph};
use crate::error::{ControlError, Result};
use crate::files;
use crate::license_text;
use crate::schema::{access, optional_field, ArraySeparator, FieldSpec, FieldType, FieldValue, Preserved, Schema};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const COPYRIGHT_PATH: &str = "debian/copyright";

pub const COPYRIGHT_FORMAT: &str = "https://www.debian.org/doc/packaging-manuals/copyright-format/1.0/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyrightHeader {
    pub format: String,
    pub upstream_name: Option<String>,
    pub upstream_contact: Option<Vec<String>>,
    pub source: Option<String>,
    pub disclaimer: Option<String>,
    pub comment: Option<String>,
    pub license: Option<String>,
    pub copyright: Option<String>,
    pub preserved: Preserved,
}

impl Default for CopyrightHeader {
    fn default() -> Self {
        Self {
            format: COPYRIGHT_FORMAT.to_string(),
            upstream_name: None,
            upstream_contact: None,
            source: None,
            disclaimer: None,
            comment: None,
            license: None,
            copyright: None,
            preserved: Preserved::default(),
        }
    }
}

impl Schema for CopyrightHeader {
    const CONTEXT: &'static str = "copyright header";

    fn fields() -> Vec<FieldSpec<Self>> {
        vec![
            FieldSpec::<Self>::new(
                "Format",
                FieldType::String,
                |s| access::required_string(&s.format),
                |s, v| {
                    s.format = v.into_string("Format")?;
                    Ok(())
                },
            )
            .required(),
            optional_field!("Upstream-Name", FieldType::String, upstream_name, access::string, into_string),
            optional_field!(
                "Upstream-Contact",
                FieldType::Array(ArraySeparator::LineBased),
                upstream_contact,
                access::array,
                into_array
            ),
            optional_field!("Source", FieldType::String, source, access::string, into_string),
            optional_field!("Disclaimer", FieldType::String, disclaimer, access::string, into_string),
            optional_field!("Comment", FieldType::String, comment, access::string, into_string),
            optional_field!("License", FieldType::String, license, access::string, into_string),
            optional_field!("Copyright", FieldType::String, copyright, access::string, into_string),
        ]
    }

    fn preserved(&self) -> &Preserved {
        &self.preserved
    }

    fn preserved_mut(&mut self) -> &mut Preserved {
        &mut self.preserved
    }
}

/// Copyright and license of a set of files
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CopyrightFiles {
    /// Glob patterns
    pub files: Vec<String>,
    pub copyright: String,
    pub license: String,
    pub comment: Option<String>,
    pub preserved: Preserved,
}

impl CopyrightFiles {
    pub fn new(files: Vec<String>, copyright: impl Into<String>, license: impl Into<String>) -> Self {
        Self {
            files,
            copyright: copyright.into(),
            license: license.into(),
            ..Default::default()
        }
    }
}

impl Schema for CopyrightFiles {
    const CONTEXT: &'static str = "copyright files stanza";

    fn fields() -> Vec<FieldSpec<Self>> {
        vec![
            FieldSpec::<Self>::new(
                "Files",
                FieldType::Array(ArraySeparator::WhitespaceSeparated),
                |s| Some(FieldValue::Array(s.files.clone())),
                |s, v| {
                    s.files = v.into_array("Files")?;
                    Ok(())
                },
            )
            .required(),
            FieldSpec::<Self>::new(
                "Copyright",
                FieldType::String,
                |s| access::required_string(&s.copyright),
                |s, v| {
                    s.copyright = v.into_string("Copyright")?;
                    Ok(())
                },
            )
            .required(),
            FieldSpec::<Self>::new(
                "License",
                FieldType::String,
                |s| access::required_string(&s.license),
                |s, v| {
                    s.license = v.into_string("License")?;
                    Ok(())
                },
            )
            .required(),
            optional_field!("Comment", FieldType::String, comment, access::string, into_string),
        ]
    }

    fn preserved(&self) -> &Preserved {
        &self.preserved
    }

    fn preserved_mut(&mut self) -> &mut Preserved {
        &mut self.preserved
    }

    fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            return Err(ControlError::invalid_field(
                "Files",
                "a files stanza must name at least one pattern",
            ));
        }
        Ok(())
    }
}

/// A standalone license text referenced by `Files` stanzas
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CopyrightLicense {
    /// Synopsis line, optionally followed by the full text
    pub license: String,
    pub comment: Option<String>,
    pub preserved: Preserved,
}

impl CopyrightLicense {
    pub fn new(license: impl Into<String>) -> Self {
        Self {
            license: license.into(),
            ..Default::default()
        }
    }

    /// A license stanza carrying the bundled full text for `spdx_identifier`
    pub fn spdx(spdx_identifier: &str) -> Result<Self> {
        Ok(Self::new(full_license_text(spdx_identifier)?))
    }
}

impl Schema for CopyrightLicense {
    const CONTEXT: &'static str = "copyright license stanza";

    fn fields() -> Vec<FieldSpec<Self>> {
        vec![
            FieldSpec::<Self>::new(
                "License",
                FieldType::String,
                |s| access::required_string(&s.license),
                |s, v| {
                    s.license = v.into_string("License")?;
                    Ok(())
                },
            )
            .required(),
            optional_field!("Comment", FieldType::String, comment, access::string, into_string),
        ]
    }

    fn preserved(&self) -> &Preserved {
        &self.preserved
    }

    fn preserved_mut(&mut self) -> &mut Preserved {
        &mut self.preserved
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyrightStanza {
    Files(CopyrightFiles),
    License(CopyrightLicense),
}

impl CopyrightStanza {
    fn to_paragraph(&self) -> Result<Paragraph> {
        match self {
            CopyrightStanza::Files(files) => files.to_paragraph(),
            CopyrightStanza::License(license) => license.to_paragraph(),
        }
    }
}

/// Format a license text as the value of a `License` field: the identifier
/// as synopsis, then every line indented by one space with blank lines
/// written as `.`
pub fn format_license_text(spdx_identifier: &str, text: &str) -> String {
    let body: Vec<String> = text
        .trim_end()
        .split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                " .".to_string()
            } else {
                format!(" {}", line)
            }
        })
        .collect();
    format!("{}\n{}", spdx_identifier, body.join("\n"))
}

/// The bundled full text for a license, ready to be used as a `License` value
pub fn full_license_text(spdx_identifier: &str) -> Result<String> {
    let text = license_text::lookup(spdx_identifier).ok_or_else(|| {
        ControlError::invalid_field(
            "License",
            format!(
                "No full license text for SPDX identifier '{}'. Supported licenses are: {}.",
                spdx_identifier,
                license_text::SUPPORTED.join(", ")
            ),
        )
    })?;
    Ok(format_license_text(spdx_identifier, text))
}

/// The copyright file of one package
#[derive(Debug, Clone)]
pub struct Copyright {
    path: PathBuf,
    header: Option<CopyrightHeader>,
    stanzas: Vec<CopyrightStanza>,
}

impl Copyright {
    pub fn new(package_dir: &Path) -> Self {
        Self {
            path: package_dir.join(COPYRIGHT_PATH),
            header: None,
            stanzas: Vec::new(),
        }
    }

    pub fn header(&self) -> Option<&CopyrightHeader> {
        self.header.as_ref()
    }

    pub fn stanzas(&self) -> &[CopyrightStanza] {
        &self.stanzas
    }

    pub fn files(&self) -> impl Iterator<Item = &CopyrightFiles> {
        self.stanzas.iter().filter_map(|s| match s {
            CopyrightStanza::Files(f) => Some(f),
            CopyrightStanza::License(_) => None,
        })
    }

    pub fn licenses(&self) -> impl Iterator<Item = &CopyrightLicense> {
        self.stanzas.iter().filter_map(|s| match s {
            CopyrightStanza::License(l) => Some(l),
            CopyrightStanza::Files(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.stanzas.is_empty()
    }

    pub fn set_header(&mut self, header: CopyrightHeader) -> Result<()> {
        header.validate()?;
        self.header = Some(header);
        self.save()
    }

    pub fn add_files(&mut self, files: CopyrightFiles) -> Result<()> {
        files.validate()?;
        let position = self
            .stanzas
            .iter()
            .rposition(|s| matches!(s, CopyrightStanza::Files(_)))
            .map(|i| i + 1)
            .unwrap_or(0);
        self.stanzas.insert(position, CopyrightStanza::Files(files));
        self.save()
    }

    pub fn add_license(&mut self, license: CopyrightLicense) -> Result<()> {
        license.validate()?;
        self.stanzas.push(CopyrightStanza::License(license));
        self.save()
    }

    pub fn load(&mut self, complete: bool) -> Result<()> {
        match files::read_checked(&self.path, "copyright", complete)? {
            Some(text) => self.parse(&text)?,
            None => {
                self.header = None;
                self.stanzas.clear();
            }
        }
        Ok(())
    }

    fn parse(&mut self, text: &str) -> Result<()> {
        let paragraphs = parse_paragraphs(text).map_err(|e| ControlError::parse(&self.path, e))?;
        let mut paragraphs = paragraphs.into_iter();

        let header = match paragraphs.next() {
            Some(first) if first.contains("Format") => CopyrightHeader::from_paragraph(&first)?,
            _ => {
                return Err(ControlError::parse(
                    &self.path,
                    "not a machine-readable copyright file, the first stanza has no 'Format' field",
                ))
            }
        };

        let mut stanzas = Vec::new();
        for paragraph in paragraphs {
            let stanza = if paragraph.contains("Files") {
                CopyrightStanza::Files(CopyrightFiles::from_paragraph(&paragraph)?)
            } else if paragraph.contains("License") {
                CopyrightStanza::License(CopyrightLicense::from_paragraph(&paragraph)?)
            } else {
                return Err(ControlError::parse(
                    &self.path,
                    "every stanza after the header needs a 'Files' or 'License' field",
                ));
            };
            stanzas.push(stanza);
        }

        debug!(path = %self.path.display(), stanzas = stanzas.len(), "parsed copyright");
        self.header = Some(header);
        self.stanzas = stanzas;
        Ok(())
    }

    pub fn render(&self) -> Result<String> {
        let header = self.header.clone().unwrap_or_default();
        let mut paragraphs = vec![header.to_paragraph()?];
        for stanza in &self.stanzas {
            paragraphs.push(stanza.to_paragraph()?);
        }
        Ok(render_paragraphs(&paragraphs))
    }

    pub fn save(&self) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        files::write(&self.path, &self.render()?)
    }
}
