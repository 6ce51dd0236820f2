//! Package relation model (Depends, Build-Depends and friends)
//!
//! A relation field is an AND-list of OR-groups:
//!
//! ```text
//! ${shlibs:Depends}, libfoo (>= 1.2) [amd64] <!nocheck>, libbar | libbaz
//! ```
//!
//! [`PackageRelations`] holds the AND-list, each [`Relation`] holds one OR-group
//! of [`Dependency`] alternatives. Items containing a substitution variable are
//! kept verbatim as [`SubstitutionRelation`] because they are only resolved by
//! the build tooling.

use crate::error::{ControlError, Result};
use std::fmt;
use std::str::FromStr;

/// Version comparison operator used inside `(...)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// `=`
    Equal,
    /// `<=`
    LessOrEqual,
    /// `>=`
    GreaterOrEqual,
    /// `<<`
    StrictlyLess,
    /// `>>`
    StrictlyGreater,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Equal => "=",
            Comparator::LessOrEqual => "<=",
            Comparator::GreaterOrEqual => ">=",
            Comparator::StrictlyLess => "<<",
            Comparator::StrictlyGreater => ">>",
        }
    }
}

impl FromStr for Comparator {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "=" => Ok(Comparator::Equal),
            "<=" => Ok(Comparator::LessOrEqual),
            ">=" => Ok(Comparator::GreaterOrEqual),
            "<<" => Ok(Comparator::StrictlyLess),
            ">>" => Ok(Comparator::StrictlyGreater),
            other => Err(ControlError::invalid_relation(
                other,
                "unknown version relationship, expected one of =, <=, >=, <<, >>",
            )),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version constraint: relationship and version always travel together
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionConstraint {
    pub relationship: Comparator,
    pub version: String,
}

impl VersionConstraint {
    pub fn new(relationship: Comparator, version: impl Into<String>) -> Self {
        Self {
            relationship,
            version: version.into(),
        }
    }
}

/// One term of an architecture restriction list, `amd64` or `!armel`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchRestriction {
    pub enabled: bool,
    pub arch: String,
}

/// One term of a build profile restriction group, `nocheck` or `!cross`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildRestriction {
    pub enabled: bool,
    pub profile: String,
}

/// A single package reference with its optional qualifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub name: String,
    pub archqual: Option<String>,
    pub version: Option<VersionConstraint>,
    pub arch: Option<Vec<ArchRestriction>>,
    /// Groups of build profile terms; each `<...>` block is one group
    pub restrictions: Option<Vec<Vec<BuildRestriction>>>,
}

impl Dependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            archqual: None,
            version: None,
            arch: None,
            restrictions: None,
        }
    }

    /// Constrain the dependency to a version
    pub fn with_version(mut self, relationship: Comparator, version: impl Into<String>) -> Self {
        self.version = Some(VersionConstraint::new(relationship, version));
        self
    }

    pub fn with_archqual(mut self, archqual: impl Into<String>) -> Self {
        self.archqual = Some(archqual.into());
        self
    }

    pub fn with_arch(mut self, arch: Vec<ArchRestriction>) -> Self {
        self.arch = Some(arch);
        self
    }

    pub fn with_restrictions(mut self, restrictions: Vec<Vec<BuildRestriction>>) -> Self {
        self.restrictions = Some(restrictions);
        self
    }

    /// Parse a single alternative such as `libc6-dev:native (>= 2.4) [linux-any] <!nocheck>`
    pub fn parse(value: &str) -> Result<Self> {
        DependencyParser::new(value).parse()
    }
}

impl FromStr for Dependency {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(archqual) = &self.archqual {
            write!(f, ":{}", archqual)?;
        }
        if let Some(constraint) = &self.version {
            write!(f, " ({} {})", constraint.relationship, constraint.version)?;
        }
        if let Some(arch) = &self.arch {
            let terms: Vec<String> = arch
                .iter()
                .map(|a| format!("{}{}", if a.enabled { "" } else { "!" }, a.arch))
                .collect();
            write!(f, " [{}]", terms.join(" "))?;
        }
        if let Some(groups) = &self.restrictions {
            for group in groups {
                let terms: Vec<String> = group
                    .iter()
                    .map(|r| format!("{}{}", if r.enabled { "" } else { "!" }, r.profile))
                    .collect();
                write!(f, " <{}>", terms.join(" "))?;
            }
        }
        Ok(())
    }
}

struct DependencyParser<'a> {
    input: &'a str,
    rest: &'a str,
}

impl<'a> DependencyParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            rest: input.trim(),
        }
    }

    fn error(&self, reason: &str) -> ControlError {
        ControlError::invalid_relation(self.input.trim(), reason)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| !pred(*c))
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (taken, rest) = self.rest.split_at(end);
        self.rest = rest;
        taken
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn eat(&mut self, c: char) -> bool {
        if let Some(rest) = self.rest.strip_prefix(c) {
            self.rest = rest;
            true
        } else {
            false
        }
    }

    /// Consume up to the closing delimiter and return the enclosed text
    fn delimited(&mut self, close: char) -> Result<&'a str> {
        match self.rest.find(close) {
            Some(end) => {
                let inner = &self.rest[..end];
                self.rest = &self.rest[end + close.len_utf8()..];
                Ok(inner)
            }
            None => Err(self.error(&format!("missing closing '{}'", close))),
        }
    }

    fn parse(mut self) -> Result<Dependency> {
        if !self
            .rest
            .chars()
            .next()
            .map(|c| c.is_ascii_alphanumeric())
            .unwrap_or(false)
        {
            return Err(self.error("package names must start with a letter or digit"));
        }

        let name = self.take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'));
        let mut dependency = Dependency::new(name);

        if self.eat(':') {
            let archqual = self.take_while(|c| c.is_ascii_alphanumeric() || c == '-');
            if archqual.is_empty() {
                return Err(self.error("empty architecture qualifier"));
            }
            dependency.archqual = Some(archqual.to_string());
        }

        self.skip_whitespace();
        if self.eat('(') {
            let inner = self.delimited(')')?.trim();
            let op_end = inner
                .find(|c: char| !matches!(c, '<' | '>' | '='))
                .unwrap_or(inner.len());
            let (op, version) = inner.split_at(op_end);
            let relationship: Comparator = op.parse().map_err(|_| {
                self.error(&format!("unknown version relationship '{}'", op))
            })?;
            let version = version.trim();
            if version.is_empty() {
                return Err(self.error("version constraint is missing a version"));
            }
            if !version
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '+' | '~' | '.'))
            {
                return Err(self.error(&format!("invalid characters in version '{}'", version)));
            }
            dependency.version = Some(VersionConstraint::new(relationship, version));
        }

        self.skip_whitespace();
        if self.eat('[') {
            let inner = self.delimited(']')?;
            let mut arch = Vec::new();
            for term in inner.split_whitespace() {
                let (enabled, name) = split_negation(term);
                if name.is_empty() {
                    return Err(self.error("empty architecture restriction"));
                }
                arch.push(ArchRestriction {
                    enabled,
                    arch: name.to_string(),
                });
            }
            if arch.is_empty() {
                return Err(self.error("empty architecture restriction list"));
            }
            dependency.arch = Some(arch);
        }

        self.skip_whitespace();
        let mut groups = Vec::new();
        while self.eat('<') {
            let inner = self.delimited('>')?;
            let mut group = Vec::new();
            for term in inner.split_whitespace() {
                let (enabled, profile) = split_negation(term);
                if profile.is_empty() {
                    return Err(self.error("empty build profile"));
                }
                group.push(BuildRestriction {
                    enabled,
                    profile: profile.to_string(),
                });
            }
            if group.is_empty() {
                return Err(self.error("empty build profile restriction"));
            }
            groups.push(group);
            self.skip_whitespace();
        }
        if !groups.is_empty() {
            dependency.restrictions = Some(groups);
        }

        self.skip_whitespace();
        if !self.rest.is_empty() {
            return Err(self.error(&format!("unexpected trailing text '{}'", self.rest)));
        }

        Ok(dependency)
    }
}

fn split_negation(term: &str) -> (bool, &str) {
    match term.strip_prefix('!') {
        Some(name) => (false, name),
        None => (true, term),
    }
}

/// Split on a separator that appears outside of any bracketed group.
/// Groups do not nest: inside `(...)` only `)` is significant, so the
/// `>` of `(>= 1.0)` never closes anything.
fn split_top_level(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut closer: Option<char> = None;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match closer {
            Some(expected) => {
                if c == expected {
                    closer = None;
                }
            }
            None => match c {
                '(' => closer = Some(')'),
                '[' => closer = Some(']'),
                '<' => closer = Some('>'),
                '{' => closer = Some('}'),
                c if c == separator => {
                    parts.push(&value[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&value[start..]);
    parts
}

fn is_substitution(value: &str) -> bool {
    value.contains("${")
}

/// An OR-group of alternatives; satisfying any one satisfies the relation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Relation {
    dependencies: Vec<Dependency>,
}

impl Relation {
    pub fn new(dependencies: Vec<Dependency>) -> Self {
        Self { dependencies }
    }

    /// A relation with a single alternative
    pub fn single(dependency: Dependency) -> Self {
        Self::new(vec![dependency])
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dependency> {
        self.dependencies.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Dependency> {
        self.dependencies.get(index)
    }

    pub fn contains(&self, dependency: &Dependency) -> bool {
        self.dependencies.contains(dependency)
    }

    /// Names of every alternative, in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|d| d.name.as_str())
    }

    /// True when both relations govern at least one package of the same name.
    /// Version constraints are ignored.
    pub fn intersects(&self, other: &Relation) -> bool {
        self.names().any(|name| other.names().any(|o| o == name))
    }

    /// Parse one `|`-separated relation
    pub fn parse(value: &str) -> Result<Self> {
        let segments: Vec<&str> = split_top_level(value, ',')
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();
        match segments.len() {
            0 => Err(ControlError::invalid_relation(value, "no dependency given")),
            1 => Self::parse_alternatives(segments[0]),
            _ => Err(ControlError::invalid_relation(
                value,
                "represents multiple dependencies",
            )),
        }
    }

    fn parse_alternatives(value: &str) -> Result<Self> {
        let dependencies = split_top_level(value, '|')
            .into_iter()
            .map(Dependency::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(dependencies))
    }
}

impl FromStr for Relation {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alternatives: Vec<String> = self.dependencies.iter().map(|d| d.to_string()).collect();
        f.write_str(&alternatives.join(" | "))
    }
}

impl std::ops::Index<usize> for Relation {
    type Output = Dependency;

    fn index(&self, index: usize) -> &Dependency {
        &self.dependencies[index]
    }
}

impl<'a> IntoIterator for &'a Relation {
    type Item = &'a Dependency;
    type IntoIter = std::slice::Iter<'a, Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.dependencies.iter()
    }
}

impl From<Dependency> for Relation {
    fn from(dependency: Dependency) -> Self {
        Relation::single(dependency)
    }
}

/// A relation containing an unresolved variable like `${shlibs:Depends}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubstitutionRelation(String);

impl SubstitutionRelation {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubstitutionRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a relation field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationItem {
    Relation(Relation),
    Substitution(SubstitutionRelation),
}

impl RelationItem {
    /// Parse one comma-delimited entry, keeping substitutions verbatim
    pub fn parse(value: &str) -> Result<Self> {
        if is_substitution(value) {
            Ok(RelationItem::Substitution(SubstitutionRelation::new(value)))
        } else {
            Ok(RelationItem::Relation(Relation::parse(value)?))
        }
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            RelationItem::Relation(r) => Some(r),
            RelationItem::Substitution(_) => None,
        }
    }
}

impl fmt::Display for RelationItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationItem::Relation(r) => r.fmt(f),
            RelationItem::Substitution(s) => s.fmt(f),
        }
    }
}

impl From<Relation> for RelationItem {
    fn from(relation: Relation) -> Self {
        RelationItem::Relation(relation)
    }
}

impl From<SubstitutionRelation> for RelationItem {
    fn from(substitution: SubstitutionRelation) -> Self {
        RelationItem::Substitution(substitution)
    }
}

/// An AND-list of relation items, the value of one relation field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PackageRelations {
    items: Vec<RelationItem>,
}

impl PackageRelations {
    pub fn new(items: Vec<RelationItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RelationItem> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&RelationItem> {
        self.items.get(index)
    }

    /// Only the statically known relations, skipping substitutions
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.items.iter().filter_map(RelationItem::as_relation)
    }

    /// Every dependency name mentioned by a known relation, alternatives included
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.relations().flat_map(Relation::names)
    }

    /// Append a relation. Relations that share a package name with `new` are
    /// conflicts: they are removed when `replace` is set, otherwise the call
    /// fails and the list is left untouched.
    pub fn add_relation(&mut self, new: Relation, replace: bool) -> Result<()> {
        let conflicting: Vec<&Relation> = self.relations().filter(|r| r.intersects(&new)).collect();

        if !conflicting.is_empty() {
            if !replace {
                let existing: Vec<String> = conflicting.iter().map(|r| r.to_string()).collect();
                return Err(ControlError::ConflictingRelation {
                    new: new.to_string(),
                    existing: existing.join(", "),
                });
            }
            self.items.retain(|item| match item {
                RelationItem::Relation(r) => !r.intersects(&new),
                RelationItem::Substitution(_) => true,
            });
        }

        self.items.push(RelationItem::Relation(new));
        Ok(())
    }

    /// Append a substitution entry; these never conflict
    pub fn add_substitution(&mut self, substitution: SubstitutionRelation) {
        self.items.push(RelationItem::Substitution(substitution));
    }

    /// Parse a relation field value
    pub fn parse(value: &str) -> Result<Self> {
        let items = split_top_level(value, ',')
            .into_iter()
            .filter(|segment| !segment.trim().is_empty())
            .map(RelationItem::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { items })
    }

    /// Build from one string per relation, as written in package definitions
    pub fn from_strings<S: AsRef<str>>(strings: &[S]) -> Result<Self> {
        let items = strings
            .iter()
            .map(|s| RelationItem::parse(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { items })
    }

    /// Render each item on its own indented line followed by a comma
    pub fn to_multiline(&self) -> String {
        self.items.iter().map(|item| format!("\n {},", item)).collect()
    }
}

impl FromStr for PackageRelations {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageRelations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.items.iter().map(|i| i.to_string()).collect();
        f.write_str(&items.join(", "))
    }
}

impl<'a> IntoIterator for &'a PackageRelations {
    type Item = &'a RelationItem;
    type IntoIter = std::slice::Iter<'a, RelationItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<RelationItem> for PackageRelations {
    fn from_iter<I: IntoIterator<Item = RelationItem>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
