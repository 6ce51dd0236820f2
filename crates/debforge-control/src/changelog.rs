//! `debian/changelog`
//!
//! The changelog is a list of blocks, newest first:
//!
//! ```text
//! hello (1.0-1) focal; urgency=medium
//!
//!   * Initial release.
//!
//!  -- Jane Doe <jane@example.com>  Mon, 05 Apr 2021 11:13:34 +0300
//!
//! ```
//!
//! The version of a source package is the version of its newest block.

use crate::deb822::SyntaxError;
use crate::error::{ControlError, Result};
use crate::files;
use crate::version::Version;
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

pub const CHANGELOG_PATH: &str = "debian/changelog";

const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

const HEADER_PATTERN: &str =
    r"^(?P<package>\S+) \((?P<version>[^)]+)\) (?P<distribution>[^;]+);\s*(?P<meta>.*)$";

static HEADER_RE: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

fn header_regex() -> Result<&'static Regex> {
    HEADER_RE
        .get_or_init(|| Regex::new(HEADER_PATTERN))
        .as_ref()
        .map_err(|e| ControlError::unexpected(format!("changelog header pattern failed to compile: {}", e)))
}

/// One release entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBlock {
    pub version: String,
    pub urgency: String,
    /// Change descriptions without their two-space indentation
    pub changes: Vec<String>,
    /// `Name <email>`
    pub author: String,
    pub date: DateTime<FixedOffset>,
    /// Defaults to the package the changelog belongs to
    pub package: Option<String>,
    /// Defaults to the distribution being built for
    pub distribution: Option<String>,
    pub urgency_comment: Option<String>,
    /// Extra `key=value` pairs of the header line, in order
    pub other: Vec<(String, String)>,
}

impl ChangeBlock {
    pub fn new(
        version: impl Into<String>,
        urgency: impl Into<String>,
        changes: Vec<String>,
        author: impl Into<String>,
        date: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            version: version.into(),
            urgency: urgency.into(),
            changes,
            author: author.into(),
            date,
            package: None,
            distribution: None,
            urgency_comment: None,
            other: Vec::new(),
        }
    }

    /// Display the block, using `package` and `distribution` for the header
    /// when the block does not name its own
    pub fn display<'a>(&'a self, package: &'a str, distribution: &'a str) -> impl fmt::Display + 'a {
        BlockDisplay {
            block: self,
            package,
            distribution,
        }
    }

    /// Change lines as they survive a save and reload: trailing whitespace
    /// dropped, blank lines emptied, no blank lines at either end
    fn normalized_changes(&self) -> Result<Vec<String>> {
        if let Some(line) = self.changes.iter().find(|c| c.contains('\n') || c.contains('\r')) {
            return Err(ControlError::invalid_field(
                "changes",
                format!("change lines must not contain line breaks, found {:?}", line),
            ));
        }

        let lines: Vec<&str> = self.changes.iter().map(|c| c.trim_end()).collect();
        let first = lines.iter().position(|l| !l.is_empty());
        let last = lines.iter().rposition(|l| !l.is_empty());
        match (first, last) {
            (Some(first), Some(last)) => Ok(lines[first..=last].iter().map(|l| l.to_string()).collect()),
            _ => Err(ControlError::invalid_field(
                "changes",
                "A new changelog block must have at least one change",
            )),
        }
    }
}

struct BlockDisplay<'a> {
    block: &'a ChangeBlock,
    package: &'a str,
    distribution: &'a str,
}

impl fmt::Display for BlockDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let block = self.block;
        write!(
            f,
            "{} ({}) {}; urgency={}",
            block.package.as_deref().unwrap_or(self.package),
            block.version,
            block.distribution.as_deref().unwrap_or(self.distribution),
            block.urgency
        )?;
        if let Some(comment) = &block.urgency_comment {
            write!(f, " {}", comment)?;
        }
        for (key, value) in &block.other {
            write!(f, ", {}={}", key, value)?;
        }
        f.write_str("\n\n")?;

        for change in &block.changes {
            if change.trim().is_empty() {
                f.write_str("\n")?;
            } else {
                writeln!(f, "  {}", change)?;
            }
        }

        write!(f, "\n -- {}  {}\n\n", block.author, block.date.format(DATE_FORMAT))
    }
}

/// Parse a whole changelog file
pub fn parse_changelog(text: &str) -> std::result::Result<Vec<ChangeBlock>, SyntaxError> {
    let header_re = header_regex().map_err(|e| SyntaxError {
        line: 0,
        message: e.to_string(),
    })?;

    let mut blocks = Vec::new();
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim_end()));

    while let Some((line_number, line)) = lines.next() {
        if line.is_empty() {
            continue;
        }

        let captures = header_re.captures(line).ok_or_else(|| SyntaxError {
            line: line_number,
            message: format!("expected a block header like 'package (version) distribution; urgency=low', found '{}'", line),
        })?;

        let mut urgency = None;
        let mut urgency_comment = None;
        let mut other = Vec::new();
        for pair in captures["meta"].split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| SyntaxError {
                line: line_number,
                message: format!("malformed header entry '{}'", pair),
            })?;
            if key.trim().eq_ignore_ascii_case("urgency") {
                let value = value.trim();
                match value.split_once(char::is_whitespace) {
                    Some((level, comment)) => {
                        urgency = Some(level.to_string());
                        urgency_comment = Some(comment.trim().to_string());
                    }
                    None => urgency = Some(value.to_string()),
                }
            } else {
                other.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
        let urgency = urgency.ok_or_else(|| SyntaxError {
            line: line_number,
            message: "block header has no urgency".to_string(),
        })?;

        let mut body: Vec<&str> = Vec::new();
        let (author, date) = loop {
            let (trailer_number, next) = lines.next().ok_or_else(|| SyntaxError {
                line: line_number,
                message: format!("block for version {} has no ' -- ' trailer line", &captures["version"]),
            })?;
            if let Some(trailer) = next.strip_prefix(" -- ") {
                let (author, date) = trailer.split_once("  ").ok_or_else(|| SyntaxError {
                    line: trailer_number,
                    message: "trailer must separate the author and date with two spaces".to_string(),
                })?;
                let date = DateTime::parse_from_rfc2822(date.trim()).map_err(|e| SyntaxError {
                    line: trailer_number,
                    message: format!("invalid date '{}': {}", date.trim(), e),
                })?;
                break (author.trim().to_string(), date);
            }
            body.push(next);
        };

        while body.first().is_some_and(|l| l.is_empty()) {
            body.remove(0);
        }
        while body.last().is_some_and(|l| l.is_empty()) {
            body.pop();
        }
        let changes = body
            .into_iter()
            .map(|l| l.strip_prefix("  ").unwrap_or(l).to_string())
            .collect();

        blocks.push(ChangeBlock {
            version: captures["version"].to_string(),
            urgency,
            changes,
            author,
            date,
            package: Some(captures["package"].to_string()),
            distribution: Some(captures["distribution"].trim().to_string()),
            urgency_comment,
            other,
        });
    }

    Ok(blocks)
}

/// The changelog of one package
#[derive(Debug, Clone)]
pub struct Changelog {
    path: PathBuf,
    distribution: String,
    package: String,
    blocks: Vec<ChangeBlock>,
}

impl Changelog {
    pub fn new(package_dir: &Path, distribution: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            path: package_dir.join(CHANGELOG_PATH),
            distribution: distribution.into(),
            package: package.into(),
            blocks: Vec::new(),
        }
    }

    /// Blocks, newest first
    pub fn blocks(&self) -> &[ChangeBlock] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Version of the newest block
    pub fn version(&self) -> Result<&str> {
        self.blocks
            .first()
            .map(|b| b.version.as_str())
            .ok_or(ControlError::NotLoaded("current version"))
    }

    /// Add a block to the top of the changelog and persist it. Missing package
    /// and distribution names are filled in from this changelog's defaults.
    pub fn add(&mut self, mut block: ChangeBlock) -> Result<()> {
        block.changes = block.normalized_changes()?;
        Version::parse_with_revision(&block.version)?;

        block.package.get_or_insert_with(|| self.package.clone());
        block.distribution.get_or_insert_with(|| self.distribution.clone());

        info!(package = %self.package, version = %block.version, "adding changelog entry");
        self.blocks.insert(0, block);
        self.save()
    }

    pub fn load(&mut self, complete: bool) -> Result<()> {
        match files::read_checked(&self.path, "changelog", complete)? {
            Some(text) => {
                self.blocks = parse_changelog(&text).map_err(|e| ControlError::parse(&self.path, e))?;
                if let Some(newest) = self.blocks.first().and_then(|b| b.distribution.as_deref()) {
                    if newest != self.distribution {
                        warn!(
                            package = %self.package,
                            changelog = %newest,
                            building = %self.distribution,
                            "newest changelog entry targets another distribution"
                        );
                    }
                }
            }
            None => self.blocks.clear(),
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if self.blocks.is_empty() {
            return Ok(());
        }
        files::write(&self.path, &self.to_string())
    }
}

impl fmt::Display for Changelog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            write!(f, "{}", block.display(&self.package, &self.distribution))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const GSTREAMER_CHANGELOG: &str = "gstreamer1.0 (1.18.4-1) experimental; urgency=medium

  [ Helmut Grohne ]
  * Annotate Build-Depends libgmp-dev and libgsl-dev
    <!nocheck> (Closes: #981203).

  [ Marc Leeman ]
  * New upstream version 1.18.4

  [ Sebastian Dröge ]
  * Upload to experimental.

 -- Sebastian Dröge <slomo@debian.org>  Mon, 05 Apr 2021 11:13:34 +0300

gstreamer1.0 (1.18.3-1) unstable; urgency=medium

  * New upstream bugfix release.

 -- Sebastian Dröge <slomo@debian.org>  Thu, 14 Jan 2021 09:41:36 +0200

gstreamer1.0 (1.18.2-1) unstable; urgency=medium

  * New upstream bugfix release.

 -- Sebastian Dröge <slomo@debian.org>  Mon, 07 Dec 2020 10:00:44 +0200

";

    fn package_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("debian")).unwrap();
        std::fs::write(dir.path().join(CHANGELOG_PATH), GSTREAMER_CHANGELOG).unwrap();
        dir
    }

    fn date(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_changelog_retains_everything() {
        let dir = package_dir();
        let mut changelog = Changelog::new(dir.path(), "unstable", "gstreamer1.0");
        changelog.load(false).unwrap();
        changelog.save().unwrap();

        let written = std::fs::read_to_string(dir.path().join(CHANGELOG_PATH)).unwrap();
        assert_eq!(written, GSTREAMER_CHANGELOG);
    }

    #[test]
    fn test_changelog_latest_version() {
        let dir = package_dir();
        let mut changelog = Changelog::new(dir.path(), "unstable", "gstreamer1.0");
        changelog.load(false).unwrap();

        assert_eq!(changelog.version().unwrap(), "1.18.4-1");
        let newest = &changelog.blocks()[0];
        assert_eq!(newest.distribution.as_deref(), Some("experimental"));
        assert_eq!(newest.changes[2], "  <!nocheck> (Closes: #981203).");
        assert_eq!(newest.changes[3], "");
    }

    #[test]
    fn test_changelog_defaults() {
        let dir = TempDir::new().unwrap();
        let mut changelog = Changelog::new(dir.path(), "focal", "libtoocool");

        let mut pinned = ChangeBlock::new(
            "0.9.0-1",
            "medium",
            vec!["* Fix race condition when parsing multiple streams with the same name".to_string()],
            "Mr. Developer Man <devman@seriouscompany.biz>",
            date(2002, 11, 3, 3, 0),
        );
        pinned.package = Some("libtwolame".to_string());
        pinned.distribution = Some("bionic".to_string());
        changelog.add(pinned).unwrap();
        assert_eq!(changelog.blocks()[0].distribution.as_deref(), Some("bionic"));
        assert_eq!(changelog.blocks()[0].package.as_deref(), Some("libtwolame"));

        changelog
            .add(ChangeBlock::new(
                "1.0.0-1",
                "medium",
                vec!["* Made the project name much cooler".to_string()],
                "Joe Cool <lilcoolj1992@yahoo.com>",
                date(2002, 12, 25, 8, 30),
            ))
            .unwrap();
        assert_eq!(changelog.blocks()[0].distribution.as_deref(), Some("focal"));
        assert_eq!(changelog.blocks()[0].package.as_deref(), Some("libtoocool"));
        assert_eq!(changelog.version().unwrap(), "1.0.0-1");
    }

    #[test]
    fn test_add_then_reload() {
        let dir = TempDir::new().unwrap();
        let mut changelog = Changelog::new(dir.path(), "focal", "hello");
        let block = ChangeBlock::new(
            "2:1.2-3",
            "low",
            vec![
                "* First change".to_string(),
                "".to_string(),
                "* Second change".to_string(),
                "  continued".to_string(),
            ],
            "Jane Doe <jane@example.com>",
            date(2021, 4, 5, 11, 13),
        );
        changelog.add(block.clone()).unwrap();

        let mut reloaded = Changelog::new(dir.path(), "focal", "hello");
        reloaded.load(true).unwrap();
        let read = &reloaded.blocks()[0];
        assert_eq!(read.version, block.version);
        assert_eq!(read.urgency, block.urgency);
        assert_eq!(read.author, block.author);
        assert_eq!(read.date, block.date);
        assert_eq!(read.changes, block.changes);
    }

    #[test]
    fn test_add_requires_changes() {
        let dir = TempDir::new().unwrap();
        let mut changelog = Changelog::new(dir.path(), "focal", "hello");
        let block = ChangeBlock::new("1.0-1", "low", vec![], "J <j@x>", date(2021, 1, 1, 0, 0));
        assert!(changelog.add(block).is_err());
        assert!(!dir.path().join(CHANGELOG_PATH).exists());
    }

    #[test]
    fn test_add_trims_blank_edges() {
        let dir = TempDir::new().unwrap();
        let mut changelog = Changelog::new(dir.path(), "focal", "hello");
        let block = ChangeBlock::new(
            "1.0-1",
            "low",
            vec![
                "".to_string(),
                "* a   ".to_string(),
                "   ".to_string(),
                "* b".to_string(),
                "".to_string(),
            ],
            "J <j@x>",
            date(2021, 1, 1, 0, 0),
        );
        changelog.add(block).unwrap();
        assert_eq!(changelog.blocks()[0].changes, vec!["* a", "", "* b"]);

        let mut reloaded = Changelog::new(dir.path(), "focal", "hello");
        reloaded.load(true).unwrap();
        assert_eq!(reloaded.blocks()[0].changes, changelog.blocks()[0].changes);
    }

    #[test]
    fn test_add_rejects_blank_or_broken_changes() {
        let dir = TempDir::new().unwrap();
        let mut changelog = Changelog::new(dir.path(), "focal", "hello");

        let blank = ChangeBlock::new(
            "1.0-1",
            "low",
            vec!["".to_string(), "  ".to_string()],
            "J <j@x>",
            date(2021, 1, 1, 0, 0),
        );
        let err = changelog.add(blank).unwrap_err();
        assert!(matches!(err, ControlError::InvalidField { ref field, .. } if field == "changes"));

        let broken = ChangeBlock::new(
            "1.0-1",
            "low",
            vec!["* first\n -- not a trailer".to_string()],
            "J <j@x>",
            date(2021, 1, 1, 0, 0),
        );
        assert!(changelog.add(broken).is_err());

        assert!(changelog.is_empty());
        assert!(!dir.path().join(CHANGELOG_PATH).exists());
    }

    #[test]
    fn test_block_display_uses_defaults() {
        let block = ChangeBlock::new(
            "1.0-1",
            "low",
            vec!["* x".to_string()],
            "J <j@x>",
            date(2021, 1, 1, 0, 0),
        );
        assert_eq!(
            block.display("hello", "focal").to_string(),
            "hello (1.0-1) focal; urgency=low\n\n  * x\n\n -- J <j@x>  Fri, 01 Jan 2021 00:00:00 +0000\n\n"
        );
    }

    #[test]
    fn test_add_requires_revision() {
        let dir = TempDir::new().unwrap();
        let mut changelog = Changelog::new(dir.path(), "focal", "hello");
        let block = ChangeBlock::new("1.0", "low", vec!["* x".to_string()], "J <j@x>", date(2021, 1, 1, 0, 0));
        let err = changelog.add(block).unwrap_err();
        assert!(matches!(err, ControlError::InvalidVersion { .. }));
    }

    #[test]
    fn test_version_before_load() {
        let changelog = Changelog::new(Path::new("nowhere"), "focal", "hello");
        assert!(matches!(changelog.version(), Err(ControlError::NotLoaded(_))));
    }

    #[test]
    fn test_missing_file_in_strict_mode() {
        let dir = TempDir::new().unwrap();
        let mut changelog = Changelog::new(dir.path(), "focal", "hello");
        changelog.load(false).unwrap();
        let err = changelog.load(true).unwrap_err();
        assert!(matches!(err, ControlError::MissingFile { kind: "changelog", .. }));
    }

    #[test]
    fn test_header_metadata() {
        let text = "hello (1.0-1) focal jammy; urgency=low (security fix), binary-only=yes

  * x

 -- J <j@x>  Fri, 01 Jan 2021 00:00:00 +0000

";
        let blocks = parse_changelog(text).unwrap();
        assert_eq!(blocks[0].distribution.as_deref(), Some("focal jammy"));
        assert_eq!(blocks[0].urgency, "low");
        assert_eq!(blocks[0].urgency_comment.as_deref(), Some("(security fix)"));
        assert_eq!(blocks[0].other, vec![("binary-only".to_string(), "yes".to_string())]);

        let mut changelog = Changelog::new(Path::new("."), "focal", "hello");
        changelog.blocks = blocks;
        assert_eq!(changelog.to_string(), text);
    }

    #[test]
    fn test_missing_trailer() {
        let err = parse_changelog("hello (1.0-1) focal; urgency=low\n\n  * x\n").unwrap_err();
        assert_eq!(err.line, 1);
    }
}
