//! core::schema
//!
//! Field descriptors and ordered schemas.
//!
//! # Types
//!
//! - [`ValueType`] - Type tag carried by every field
//! - [`FieldDescriptor`] - Name, type, length, precision and position of one field
//! - [`Schema`] - Ordered sequence of fields with case-insensitive unique names
//! - [`MergePolicy`] - What to do when two inputs contribute the same field name
//!
//! # Value Semantics
//!
//! Schemas and descriptors are plain owned values. Cloning a schema clones
//! every descriptor, so two holders of "the same" schema can never observe
//! each other's changes.
//!
//! # Example
//!
//! ```
//! use translineage::core::schema::{FieldDescriptor, Schema, ValueType};
//!
//! let mut schema = Schema::new();
//! schema.push(FieldDescriptor::new("id", ValueType::Integer)).unwrap();
//! schema.push(FieldDescriptor::new("name", ValueType::String).with_length(50)).unwrap();
//!
//! assert_eq!(schema.len(), 2);
//! assert_eq!(schema.index_of("NAME"), Some(1));
//! assert!(schema.push(FieldDescriptor::new("Id", ValueType::String)).is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from schema construction and editing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("duplicate field name: {0}")]
    DuplicateFieldName(String),

    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("unknown value type: {0}")]
    UnknownValueType(String),
}

/// Type tag of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    None,
    Number,
    String,
    Date,
    Boolean,
    Integer,
    BigNumber,
    Serializable,
    Binary,
    Timestamp,
    InetAddress,
}

impl ValueType {
    /// All type tags, in declaration order.
    pub const ALL: [ValueType; 11] = [
        ValueType::None,
        ValueType::Number,
        ValueType::String,
        ValueType::Date,
        ValueType::Boolean,
        ValueType::Integer,
        ValueType::BigNumber,
        ValueType::Serializable,
        ValueType::Binary,
        ValueType::Timestamp,
        ValueType::InetAddress,
    ];

    /// The tag as written in definition files.
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::None => "none",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Date => "date",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::BigNumber => "big_number",
            ValueType::Serializable => "serializable",
            ValueType::Binary => "binary",
            ValueType::Timestamp => "timestamp",
            ValueType::InetAddress => "inet_address",
        }
    }
}

impl FromStr for ValueType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        ValueType::ALL
            .iter()
            .copied()
            .find(|t| t.name() == lower)
            .ok_or_else(|| SchemaError::UnknownValueType(s.to_string()))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Descriptor of a single field.
///
/// The position is owned by the [`Schema`] holding the descriptor and is
/// renumbered whenever the schema changes shape. A descriptor that is not
/// part of a schema reports position 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    name: String,
    value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    precision: Option<u32>,
    #[serde(default)]
    position: usize,
}

impl FieldDescriptor {
    /// Create a descriptor with no length or precision.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            length: None,
            precision: None,
            position: 0,
        }
    }

    /// Set the length.
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Set the precision.
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn length(&self) -> Option<u32> {
        self.length
    }

    pub fn precision(&self) -> Option<u32> {
        self.precision
    }

    /// 0-based ordinal within the owning schema.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_value_type(&mut self, value_type: ValueType) {
        self.value_type = value_type;
    }

    pub fn set_length(&mut self, length: Option<u32>) {
        self.length = length;
    }

    pub fn set_precision(&mut self, precision: Option<u32>) {
        self.precision = precision;
    }

    /// Case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Copy of this descriptor under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.value_type)?;
        match (self.length, self.precision) {
            (Some(l), Some(p)) => write!(f, "({l}, {p})"),
            (Some(l), None) => write!(f, "({l})"),
            _ => Ok(()),
        }
    }
}

/// Conflict handling when merging schemas from several inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Keep the first field with a given name, drop later ones.
    #[default]
    FirstWins,
    /// Fail on the first duplicate name.
    Strict,
}

impl MergePolicy {
    pub const VALID_NAMES: &'static [&'static str] = &["first_wins", "strict"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "first_wins" => Some(MergePolicy::FirstWins),
            "strict" => Some(MergePolicy::Strict),
            _ => None,
        }
    }
}

/// Ordered sequence of fields.
///
/// # Invariants
///
/// - No two fields share a case-insensitive name
/// - `fields[i].position() == i`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldDescriptor>", into = "Vec<FieldDescriptor>")]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from descriptors, rejecting duplicate names.
    pub fn from_fields(
        fields: impl IntoIterator<Item = FieldDescriptor>,
    ) -> Result<Self, SchemaError> {
        let mut schema = Self::new();
        for field in fields {
            schema.push(field)?;
        }
        Ok(schema)
    }

    /// Append a field.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::DuplicateFieldName` if a field with the same
    /// case-insensitive name already exists.
    pub fn push(&mut self, mut field: FieldDescriptor) -> Result<(), SchemaError> {
        if self.contains(field.name()) {
            return Err(SchemaError::DuplicateFieldName(field.name));
        }
        field.position = self.fields.len();
        self.fields.push(field);
        Ok(())
    }

    /// Remove a field by name, returning it.
    pub fn remove(&mut self, name: &str) -> Result<FieldDescriptor, SchemaError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| SchemaError::FieldNotFound(name.to_string()))?;
        let mut removed = self.fields.remove(index);
        removed.position = 0;
        self.renumber();
        Ok(removed)
    }

    /// Rename a field in place.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), SchemaError> {
        let index = self
            .index_of(from)
            .ok_or_else(|| SchemaError::FieldNotFound(from.to_string()))?;
        if let Some(existing) = self.index_of(to) {
            if existing != index {
                return Err(SchemaError::DuplicateFieldName(to.to_string()));
            }
        }
        self.fields[index].name = to.to_string();
        Ok(())
    }

    /// Append the fields of `other` according to `policy`.
    ///
    /// Returns the names dropped under [`MergePolicy::FirstWins`].
    pub fn merge(&mut self, other: &Schema, policy: MergePolicy) -> Result<Vec<String>, SchemaError> {
        let mut dropped = Vec::new();
        for field in &other.fields {
            if self.contains(field.name()) {
                match policy {
                    MergePolicy::FirstWins => dropped.push(field.name.clone()),
                    MergePolicy::Strict => {
                        return Err(SchemaError::DuplicateFieldName(field.name.clone()))
                    }
                }
            } else {
                self.push(field.clone())?;
            }
        }
        Ok(dropped)
    }

    /// Copy of this schema with fields renamed through `map`.
    ///
    /// `map` returns the new name for a field, or `None` to keep it.
    pub fn renamed_with<F>(&self, mut map: F) -> Result<Schema, SchemaError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        Schema::from_fields(self.fields.iter().map(|f| match map(f.name()) {
            Some(new_name) => f.renamed(new_name),
            None => f.clone(),
        }))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    /// Mutable access to a field's type, length and precision.
    ///
    /// Names are changed through [`Schema::rename`] so uniqueness holds.
    pub fn field_mut(&mut self, index: usize) -> Option<&mut FieldDescriptor> {
        self.fields.get_mut(index)
    }

    /// Case-insensitive lookup.
    pub fn find(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.is_named(name))
    }

    /// Case-insensitive position lookup.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.is_named(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Field names in order.
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    fn renumber(&mut self) {
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.position = i;
        }
    }
}

impl TryFrom<Vec<FieldDescriptor>> for Schema {
    type Error = SchemaError;

    fn try_from(fields: Vec<FieldDescriptor>) -> Result<Self, Self::Error> {
        Schema::from_fields(fields)
    }
}

impl From<Schema> for Vec<FieldDescriptor> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}

impl IntoIterator for Schema {
    type Item = FieldDescriptor;
    type IntoIter = std::vec::IntoIter<FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(names: &[&str]) -> Schema {
        Schema::from_fields(names.iter().map(|n| FieldDescriptor::new(*n, ValueType::String)))
            .unwrap()
    }

    #[test]
    fn push_assigns_positions() {
        let s = schema(&["a", "b", "c"]);
        let positions: Vec<_> = s.iter().map(|f| f.position()).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn duplicate_names_rejected_case_insensitively() {
        let mut s = schema(&["value"]);
        let err = s
            .push(FieldDescriptor::new("VALUE", ValueType::Integer))
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateFieldName("VALUE".into()));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn remove_renumbers() {
        let mut s = schema(&["a", "b", "c"]);
        let removed = s.remove("B").unwrap();
        assert_eq!(removed.name(), "b");
        assert_eq!(s.names(), vec!["a", "c"]);
        assert_eq!(s.field(1).unwrap().position(), 1);
    }

    #[test]
    fn rename_rejects_collision() {
        let mut s = schema(&["a", "b"]);
        assert!(s.rename("a", "B").is_err());
        s.rename("a", "A").unwrap();
        assert_eq!(s.names(), vec!["A", "b"]);
    }

    #[test]
    fn merge_first_wins_drops_later_duplicates() {
        let mut left = schema(&["id", "value"]);
        let right = schema(&["Value", "extra"]);
        let dropped = left.merge(&right, MergePolicy::FirstWins).unwrap();
        assert_eq!(left.names(), vec!["id", "value", "extra"]);
        assert_eq!(dropped, vec!["Value".to_string()]);
    }

    #[test]
    fn merge_strict_fails_on_duplicate() {
        let mut left = schema(&["id"]);
        let right = schema(&["ID"]);
        assert_eq!(
            left.merge(&right, MergePolicy::Strict),
            Err(SchemaError::DuplicateFieldName("ID".into()))
        );
    }

    #[test]
    fn clones_do_not_share_state() {
        let original = schema(&["value"]);
        let mut copy = original.clone();
        copy.field_mut(0).unwrap().set_length(Some(99));
        copy.push(FieldDescriptor::new("new_value", ValueType::String))
            .unwrap();

        assert_eq!(original.len(), 1);
        assert_eq!(original.field(0).unwrap().length(), None);
    }

    #[test]
    fn renamed_with_detects_collisions() {
        let s = schema(&["a", "b"]);
        let renamed = s
            .renamed_with(|n| (n == "a").then(|| "x".to_string()))
            .unwrap();
        assert_eq!(renamed.names(), vec!["x", "b"]);

        let clash = s.renamed_with(|n| (n == "a").then(|| "b".to_string()));
        assert!(clash.is_err());
    }

    #[test]
    fn value_type_parses_case_insensitively() {
        assert_eq!("String".parse::<ValueType>().unwrap(), ValueType::String);
        assert_eq!(
            "big_number".parse::<ValueType>().unwrap(),
            ValueType::BigNumber
        );
        assert!("blob".parse::<ValueType>().is_err());
    }

    #[test]
    fn schema_deserialize_rejects_duplicates() {
        let json = r#"[{"name":"a","value_type":"string"},{"name":"A","value_type":"integer"}]"#;
        assert!(serde_json::from_str::<Schema>(json).is_err());
    }

    #[test]
    fn display_includes_length_and_precision() {
        let f = FieldDescriptor::new("amount", ValueType::Number)
            .with_length(10)
            .with_precision(2);
        assert_eq!(f.to_string(), "amount number(10, 2)");
    }
}
