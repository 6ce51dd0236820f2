//! Declarative mapping between typed structs and deb822 paragraphs
//!
//! Each schema type lists its fields once, in wire order, as a table of
//! [`FieldSpec`] entries: the wire name, a [`FieldType`] adapter and a pair of
//! accessor functions. Serialization walks the table, skipping absent values;
//! deserialization binds every listed field that is present in the input.
//!
//! Fields the table does not describe are kept in a [`Preserved`] block and
//! written back after the known ones, and the original field order of a parsed
//! paragraph is restored on output.

use crate::deb822::Paragraph;
use crate::error::{ControlError, Result};
use crate::relation::PackageRelations;

/// The ways Debian files spell out lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySeparator {
    /// A single line, with commas between elements
    Commas,
    /// A line per element, each followed by a comma
    CommasMultiline,
    /// A single line, with spaces between elements
    WhitespaceSeparated,
    /// A line per element, with no other separator
    LineBased,
}

/// Wire format adapter for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    /// `yes` / `no`
    Bool,
    Array(ArraySeparator),
    Relations,
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    String(String),
    Bool(bool),
    Array(Vec<String>),
    Relations(PackageRelations),
}

impl FieldValue {
    fn type_name(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::Bool(_) => "bool",
            FieldValue::Array(_) => "array",
            FieldValue::Relations(_) => "relations",
        }
    }

    pub fn into_string(self, field: &str) -> Result<String> {
        match self {
            FieldValue::String(s) => Ok(s),
            other => Err(mismatch(field, "string", &other)),
        }
    }

    pub fn into_bool(self, field: &str) -> Result<bool> {
        match self {
            FieldValue::Bool(b) => Ok(b),
            other => Err(mismatch(field, "bool", &other)),
        }
    }

    pub fn into_array(self, field: &str) -> Result<Vec<String>> {
        match self {
            FieldValue::Array(a) => Ok(a),
            other => Err(mismatch(field, "array", &other)),
        }
    }

    pub fn into_relations(self, field: &str) -> Result<PackageRelations> {
        match self {
            FieldValue::Relations(r) => Ok(r),
            other => Err(mismatch(field, "relations", &other)),
        }
    }
}

fn mismatch(field: &str, expected: &str, found: &FieldValue) -> ControlError {
    ControlError::unexpected(format!(
        "Field '{}' expected a {} value but was given a {} value",
        field,
        expected,
        found.type_name()
    ))
}

impl FieldType {
    pub fn serialize(&self, field: &str, value: FieldValue) -> Result<String> {
        match (self, value) {
            (FieldType::String, FieldValue::String(s)) => Ok(s),
            (FieldType::Bool, FieldValue::Bool(b)) => Ok(if b { "yes" } else { "no" }.to_string()),
            (FieldType::Array(separator), FieldValue::Array(items)) => {
                Ok(serialize_array(*separator, &items))
            }
            (FieldType::Relations, FieldValue::Relations(relations)) => {
                Ok(relations.to_multiline())
            }
            (ty, other) => Err(ControlError::unexpected(format!(
                "Field '{}' is declared as {:?} but holds a {} value",
                field,
                ty,
                other.type_name()
            ))),
        }
    }

    pub fn deserialize(&self, field: &str, raw: &str) -> Result<FieldValue> {
        let value = raw.trim();
        match self {
            FieldType::String => Ok(FieldValue::String(value.to_string())),
            FieldType::Bool => Ok(FieldValue::Bool(value == "yes")),
            FieldType::Array(separator) => Ok(FieldValue::Array(deserialize_array(*separator, value))),
            FieldType::Relations => PackageRelations::parse(value)
                .map(FieldValue::Relations)
                .map_err(|e| ControlError::invalid_field(field, e)),
        }
    }
}

fn serialize_array(separator: ArraySeparator, items: &[String]) -> String {
    match separator {
        ArraySeparator::Commas => items.join(", "),
        ArraySeparator::CommasMultiline => items.iter().map(|i| format!("\n {},", i)).collect(),
        ArraySeparator::WhitespaceSeparated => items.join(" "),
        ArraySeparator::LineBased => items.iter().map(|i| format!("\n {}", i)).collect(),
    }
}

fn deserialize_array(separator: ArraySeparator, value: &str) -> Vec<String> {
    let items: Vec<&str> = match separator {
        ArraySeparator::Commas | ArraySeparator::CommasMultiline => value.split(',').collect(),
        ArraySeparator::WhitespaceSeparated => value.split_whitespace().collect(),
        ArraySeparator::LineBased => value.lines().collect(),
    };
    items
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// One row of a schema table
pub struct FieldSpec<T> {
    /// Wire name
    pub name: &'static str,
    pub ty: FieldType,
    /// Required fields must be present when reading and non-empty when writing
    pub required: bool,
    pub get: fn(&T) -> Option<FieldValue>,
    pub set: fn(&mut T, FieldValue) -> Result<()>,
}

impl<T> FieldSpec<T> {
    pub fn new(
        name: &'static str,
        ty: FieldType,
        get: fn(&T) -> Option<FieldValue>,
        set: fn(&mut T, FieldValue) -> Result<()>,
    ) -> Self {
        Self {
            name,
            ty,
            required: false,
            get,
            set,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Fields with no schema entry, plus the field order of the parsed input
#[derive(Debug, Clone, Default)]
pub struct Preserved {
    fields: Paragraph,
    order: Vec<String>,
}

impl Preserved {
    pub fn fields(&self) -> &Paragraph {
        &self.fields
    }

    /// Add or overwrite a field that has no schema entry
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.set(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name)
    }
}

// Order only affects layout, never meaning.
impl PartialEq for Preserved {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for Preserved {}

/// A struct that maps onto one deb822 paragraph
pub trait Schema: Default {
    /// Human readable name used in error messages
    const CONTEXT: &'static str;

    fn fields() -> Vec<FieldSpec<Self>>;

    fn preserved(&self) -> &Preserved;

    fn preserved_mut(&mut self) -> &mut Preserved;

    /// Write fields whose names are not static
    fn serialize_dynamic(&self, _paragraph: &mut Paragraph) -> Result<()> {
        Ok(())
    }

    /// Read fields whose names are not static, returning the names consumed
    fn deserialize_dynamic(&mut self, _paragraph: &Paragraph) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Cross-field checks run before writing and after reading
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn to_paragraph(&self) -> Result<Paragraph> {
        self.validate()?;

        let mut built = Paragraph::new();
        for spec in Self::fields() {
            let value = (spec.get)(self);
            let is_blank = value.is_none()
                || matches!(&value, Some(FieldValue::String(s)) if s.trim().is_empty());
            if spec.required && is_blank {
                return Err(ControlError::missing_field(spec.name, Self::CONTEXT));
            }
            if let Some(value) = value {
                built.set(spec.name, spec.ty.serialize(spec.name, value)?);
            }
        }
        self.serialize_dynamic(&mut built)?;
        for (name, value) in self.preserved().fields.iter() {
            if !built.contains(name) {
                built.set(name, value);
            }
        }

        let order = &self.preserved().order;
        if order.is_empty() {
            return Ok(built);
        }
        let mut ordered = Paragraph::new();
        for name in order {
            if let Some(value) = built.get(name) {
                ordered.set(name.clone(), value);
            }
        }
        for (name, value) in built.iter() {
            if !ordered.contains(name) {
                ordered.set(name, value);
            }
        }
        Ok(ordered)
    }

    fn from_paragraph(paragraph: &Paragraph) -> Result<Self> {
        let mut value = Self::default();
        let mut consumed: Vec<String> = Vec::new();

        for spec in Self::fields() {
            match paragraph.get(spec.name) {
                Some(raw) => {
                    let decoded = spec.ty.deserialize(spec.name, raw)?;
                    (spec.set)(&mut value, decoded)?;
                    consumed.push(spec.name.to_string());
                }
                None if spec.required => {
                    return Err(ControlError::missing_field(spec.name, Self::CONTEXT));
                }
                None => {}
            }
        }
        consumed.extend(value.deserialize_dynamic(paragraph)?);

        let preserved = value.preserved_mut();
        for (name, raw) in paragraph.iter() {
            if !consumed.iter().any(|c| c.eq_ignore_ascii_case(name)) {
                preserved.fields.set(name, raw);
            }
        }
        preserved.order = paragraph.keys().map(str::to_string).collect();

        value.validate()?;
        Ok(value)
    }
}

/// Declare an optional field whose struct attribute is an `Option`
macro_rules! optional_field {
    ($name:literal, $ty:expr, $attr:ident, $get:path, $into:ident) => {
        $crate::schema::FieldSpec::<Self>::new(
            $name,
            $ty,
            |s| $get(&s.$attr),
            |s, v| {
                s.$attr = Some(v.$into($name)?);
                Ok(())
            },
        )
    };
}

pub(crate) use optional_field;

/// Accessor helpers for schema tables
pub(crate) mod access {
    use super::FieldValue;
    use crate::relation::PackageRelations;

    pub fn string(value: &Option<String>) -> Option<FieldValue> {
        value.clone().map(FieldValue::String)
    }

    pub fn required_string(value: &str) -> Option<FieldValue> {
        Some(FieldValue::String(value.to_string()))
    }

    pub fn boolean(value: &Option<bool>) -> Option<FieldValue> {
        value.map(FieldValue::Bool)
    }

    pub fn array(value: &Option<Vec<String>>) -> Option<FieldValue> {
        value.clone().map(FieldValue::Array)
    }

    /// Empty relation lists are omitted
    pub fn relations(value: &Option<PackageRelations>) -> Option<FieldValue> {
        value
            .as_ref()
            .filter(|r| !r.is_empty())
            .cloned()
            .map(FieldValue::Relations)
    }
}
