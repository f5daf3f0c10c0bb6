//! Entity kind schemas
//!
//! A kind declares its scalar attributes and the fields that reference a
//! parent entity. Declarations are plain data registered once at startup.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Handle to a registered entity kind (e.g. "Artist", "Album", "Track")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Kind(&'static str);

impl Kind {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl AsRef<str> for Kind {
    fn as_ref(&self) -> &str {
        self.0
    }
}

/// Declared type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    String,
    Integer,
    Boolean,
}

impl ScalarType {
    /// Coerce a raw field value to this type.
    ///
    /// Returns `Ok(None)` when a non-string value is empty (the field carried
    /// nothing).
    pub fn coerce(&self, raw: &str) -> Result<Option<ScalarValue>, InvalidScalar> {
        let invalid = InvalidScalar { expected: *self };
        match self {
            ScalarType::String => Ok(Some(ScalarValue::String(raw.to_string()))),
            _ if raw.is_empty() => Ok(None),
            ScalarType::Integer => raw
                .parse::<i64>()
                .map(|v| Some(ScalarValue::Integer(v)))
                .map_err(|_| invalid),
            ScalarType::Boolean => parse_bool(raw)
                .map(|v| Some(ScalarValue::Boolean(v)))
                .ok_or(invalid),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::String => write!(f, "string"),
            ScalarType::Integer => write!(f, "integer"),
            ScalarType::Boolean => write!(f, "boolean"),
        }
    }
}

/// Raw text that does not parse as the declared type
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("expected {expected}")]
pub struct InvalidScalar {
    pub expected: ScalarType,
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl ScalarValue {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ScalarValue::String(_) => ScalarType::String,
            ScalarValue::Integer(_) => ScalarType::Integer,
            ScalarValue::Boolean(_) => ScalarType::Boolean,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::String(s) => f.write_str(s),
            ScalarValue::Integer(v) => write!(f, "{}", v),
            ScalarValue::Boolean(v) => write!(f, "{}", v),
        }
    }
}

/// A scalar attribute field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub scalar_type: ScalarType,
}

/// A field holding the id of a parent entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentRefDescriptor {
    /// Raw record field carrying the parent id (e.g. "ArtistId")
    pub field_name: &'static str,
    /// Relation name the child is linked under (e.g. "artist")
    pub relation: &'static str,
    pub target_kind: Kind,
    /// An empty field value means "no parent" instead of a dangling reference
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

/// Declaration of one entity kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindSchema {
    pub kind: Kind,
    pub attributes: Vec<FieldDescriptor>,
    pub parents: Vec<ParentRefDescriptor>,
}

impl KindSchema {
    pub fn new(name: &'static str) -> Self {
        Self {
            kind: Kind::new(name),
            attributes: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn attribute(mut self, name: &'static str, scalar_type: ScalarType) -> Self {
        self.attributes.push(FieldDescriptor { name, scalar_type });
        self
    }

    pub fn string(self, name: &'static str) -> Self {
        self.attribute(name, ScalarType::String)
    }

    pub fn integer(self, name: &'static str) -> Self {
        self.attribute(name, ScalarType::Integer)
    }

    pub fn boolean(self, name: &'static str) -> Self {
        self.attribute(name, ScalarType::Boolean)
    }

    /// Declare `field_name` as a required reference to a `target_kind` parent
    pub fn parent(
        self,
        field_name: &'static str,
        relation: &'static str,
        target_kind: &'static str,
    ) -> Self {
        self.push_parent(field_name, relation, target_kind, false)
    }

    /// Like [`KindSchema::parent`], but an empty value leaves the relation unset
    pub fn optional_parent(
        self,
        field_name: &'static str,
        relation: &'static str,
        target_kind: &'static str,
    ) -> Self {
        self.push_parent(field_name, relation, target_kind, true)
    }

    fn push_parent(
        mut self,
        field_name: &'static str,
        relation: &'static str,
        target_kind: &'static str,
        optional: bool,
    ) -> Self {
        self.parents.push(ParentRefDescriptor {
            field_name,
            relation,
            target_kind: Kind::new(target_kind),
            optional,
        });
        self
    }

    pub fn attribute_named(&self, name: &str) -> Option<&FieldDescriptor> {
        self.attributes.iter().find(|f| f.name == name)
    }

    pub fn parent_field(&self, field_name: &str) -> Option<&ParentRefDescriptor> {
        self.parents.iter().find(|p| p.field_name == field_name)
    }

    pub fn relation(&self, relation: &str) -> Option<&ParentRefDescriptor> {
        self.parents.iter().find(|p| p.relation == relation)
    }

    /// Whether `name` is declared at all, as attribute or parent reference
    pub fn declares(&self, name: &str) -> bool {
        self.attribute_named(name).is_some() || self.parent_field(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_string_keeps_empty() {
        assert_eq!(
            ScalarType::String.coerce("").unwrap(),
            Some(ScalarValue::String(String::new()))
        );
    }

    #[test]
    fn test_coerce_integer() {
        assert_eq!(ScalarType::Integer.coerce("1977").unwrap(), Some(ScalarValue::Integer(1977)));
        assert_eq!(ScalarType::Integer.coerce("-3").unwrap(), Some(ScalarValue::Integer(-3)));
        assert_eq!(ScalarType::Integer.coerce("").unwrap(), None);
        assert!(ScalarType::Integer.coerce("19x7").is_err());
        assert!(ScalarType::Integer.coerce(" 1977").is_err());
    }

    #[test]
    fn test_coerce_boolean() {
        assert_eq!(ScalarType::Boolean.coerce("true").unwrap(), Some(ScalarValue::Boolean(true)));
        assert_eq!(ScalarType::Boolean.coerce("0").unwrap(), Some(ScalarValue::Boolean(false)));
        assert_eq!(ScalarType::Boolean.coerce("").unwrap(), None);
        assert!(ScalarType::Boolean.coerce("yes").is_err());
    }

    #[test]
    fn test_kind_schema_builder() {
        let album = KindSchema::new("Album")
            .string("Name")
            .integer("Year")
            .parent("ArtistId", "artist", "Artist");

        assert_eq!(album.kind.name(), "Album");
        assert!(album.declares("Year"));
        assert!(album.declares("ArtistId"));
        assert!(!album.declares("Genre"));
        assert_eq!(album.relation("artist").unwrap().target_kind, Kind::new("Artist"));
        assert!(!album.parent_field("ArtistId").unwrap().optional);
    }
}
