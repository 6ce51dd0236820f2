//! deb822 paragraph codec
//!
//! The RFC 2822-like format used by `debian/control`, `debian/copyright` and
//! APT metadata. A paragraph is an ordered list of `Name: value` fields;
//! continuation lines start with whitespace and paragraphs are separated by
//! blank lines. Lines starting with `#` are comments and are dropped.
//!
//! Multi-line values are stored exactly as written (continuation lines keep
//! their leading whitespace) so that rendering a parsed paragraph reproduces
//! the original text.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

/// An ordered set of fields. Field names compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paragraph {
    fields: Vec<(String, String)>,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.fields[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set a field, keeping its position if it already exists
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.fields[i].1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.fields.remove(i).1)
    }

    /// Field names in order of appearance
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Continuation lines are written indented, blank ones as ` .`, so a value
/// set in code always reads back as the same field.
impl fmt::Display for Paragraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            let mut lines = value.split('\n');
            match lines.next() {
                Some(first) if !first.trim().is_empty() => write!(f, "{}: {}", name, first.trim())?,
                _ => write!(f, "{}:", name)?,
            }
            for line in lines {
                if line.trim().is_empty() {
                    f.write_str("\n .")?;
                } else if line.starts_with(' ') || line.starts_with('\t') {
                    write!(f, "\n{}", line.trim_end())?;
                } else {
                    write!(f, "\n {}", line.trim_end())?;
                }
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

/// Parse every paragraph in `text`
pub fn parse_paragraphs(text: &str) -> Result<Vec<Paragraph>, SyntaxError> {
    let mut paragraphs = Vec::new();
    let mut current = Paragraph::new();

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim_end();

        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            match current.fields.last_mut() {
                Some((_, value)) => {
                    value.push('\n');
                    value.push_str(line);
                }
                None => {
                    return Err(SyntaxError {
                        line: line_number,
                        message: "continuation line without a preceding field".to_string(),
                    })
                }
            }
            continue;
        }

        let (name, value) = line.split_once(':').ok_or_else(|| SyntaxError {
            line: line_number,
            message: format!("expected 'Field: value', found '{}'", line),
        })?;
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(SyntaxError {
                line: line_number,
                message: format!("invalid field name '{}'", name),
            });
        }
        if current.contains(name) {
            return Err(SyntaxError {
                line: line_number,
                message: format!("duplicate field '{}'", name),
            });
        }
        current.fields.push((name.to_string(), value.trim().to_string()));
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs)
}

/// Render paragraphs separated by one blank line
pub fn render_paragraphs<'a>(paragraphs: impl IntoIterator<Item = &'a Paragraph>) -> String {
    paragraphs
        .into_iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONTROL: &str = "Source: hello
Maintainer: Jane Doe <jane@example.com>
Build-Depends:
 debhelper-compat (= 13),
 libfoo-dev,

# the binary package
Package: hello
Architecture: any
Description: says hello
 A longer description
 .
 with a blank line.
";

    #[test]
    fn test_parse_paragraphs() {
        let paragraphs = parse_paragraphs(CONTROL).unwrap();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].get("source"), Some("hello"));
        assert_eq!(
            paragraphs[0].get("Build-Depends"),
            Some("\n debhelper-compat (= 13),\n libfoo-dev,")
        );
        assert_eq!(
            paragraphs[1].get("Description"),
            Some("says hello\n A longer description\n .\n with a blank line.")
        );
    }

    #[test]
    fn test_render_round_trip() {
        let paragraphs = parse_paragraphs(CONTROL).unwrap();
        let expected = CONTROL.replace("# the binary package\n", "");
        assert_eq!(render_paragraphs(&paragraphs), expected);
    }

    #[test]
    fn test_set_keeps_position() {
        let mut paragraph = Paragraph::new();
        paragraph.set("Package", "a");
        paragraph.set("Architecture", "any");
        paragraph.set("package", "b");
        assert_eq!(paragraph.keys().collect::<Vec<_>>(), vec!["Package", "Architecture"]);
        assert_eq!(paragraph.get("Package"), Some("b"));
    }

    #[test]
    fn test_continuation_without_field() {
        let err = parse_paragraphs(" orphan\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_missing_colon() {
        let err = parse_paragraphs("Source: a\nnot a field\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_multiline_value_from_code() {
        let mut paragraph = Paragraph::new();
        paragraph.set("Package", "hello");
        paragraph.set("Description", "says hello\nA longer description.\n\n  indented example");

        let text = paragraph.to_string();
        assert_eq!(
            text,
            "Package: hello\nDescription: says hello\n A longer description.\n .\n  indented example\n"
        );

        let reparsed = parse_paragraphs(&text).unwrap();
        assert_eq!(reparsed.len(), 1);
        assert_eq!(
            reparsed[0].get("Description"),
            Some("says hello\n A longer description.\n .\n  indented example")
        );
        assert_eq!(reparsed[0].to_string(), text);
    }

    #[test]
    fn test_duplicate_field() {
        assert!(parse_paragraphs("Source: a\nsource: b\n").is_err());
    }

    #[test]
    fn test_multiple_blank_lines() {
        let paragraphs = parse_paragraphs("\n\nA: 1\n\n\n\nB: 2\n\n").unwrap();
        assert_eq!(paragraphs.len(), 2);
    }
}
