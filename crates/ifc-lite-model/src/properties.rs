// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property declarations and typed property values

use crate::{AttributeValue, EntityId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic type of a user-declared property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    #[serde(rename = "IfcText")]
    Text,
    #[serde(rename = "IfcLabel")]
    Label,
    #[serde(rename = "IfcIdentifier")]
    Identifier,
    #[serde(rename = "IfcBoolean")]
    Boolean,
    #[serde(rename = "IfcInteger")]
    Integer,
    #[serde(rename = "IfcReal")]
    Real,
}

impl PropertyType {
    /// STEP type tag used to wrap values of this type
    pub fn type_tag(&self) -> &'static str {
        match self {
            PropertyType::Text => "IFCTEXT",
            PropertyType::Label => "IFCLABEL",
            PropertyType::Identifier => "IFCIDENTIFIER",
            PropertyType::Boolean => "IFCBOOLEAN",
            PropertyType::Integer => "IFCINTEGER",
            PropertyType::Real => "IFCREAL",
        }
    }

    /// Display name, as offered to users
    pub fn label(&self) -> &'static str {
        match self {
            PropertyType::Text => "IfcText",
            PropertyType::Label => "IfcLabel",
            PropertyType::Identifier => "IfcIdentifier",
            PropertyType::Boolean => "IfcBoolean",
            PropertyType::Integer => "IfcInteger",
            PropertyType::Real => "IfcReal",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error for an unrecognised property type name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown property type: {0}")]
pub struct UnknownPropertyType(pub String);

impl FromStr for PropertyType {
    type Err = UnknownPropertyType;

    /// Accepts `IfcReal`, `IFCREAL` or `Real`, in any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("IFC").unwrap_or(&upper);
        match bare {
            "TEXT" => Ok(PropertyType::Text),
            "LABEL" => Ok(PropertyType::Label),
            "IDENTIFIER" => Ok(PropertyType::Identifier),
            "BOOLEAN" => Ok(PropertyType::Boolean),
            "INTEGER" => Ok(PropertyType::Integer),
            "REAL" => Ok(PropertyType::Real),
            _ => Err(UnknownPropertyType(s.to_string())),
        }
    }
}

/// A named property declaration from the catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
        }
    }
}

/// Untyped scalar as entered by a user
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Text(String),
    Bool(bool),
    Number(f64),
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Number(n as f64)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => f.write_str(s),
            RawValue::Bool(b) => write!(f, "{}", b),
            RawValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Format-native scalar: a value together with its type tag
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum TypedValue {
    Text(String),
    Label(String),
    Identifier(String),
    Boolean(bool),
    Integer(i64),
    Real(f64),
}

impl TypedValue {
    /// Semantic type of this value
    pub fn property_type(&self) -> PropertyType {
        match self {
            TypedValue::Text(_) => PropertyType::Text,
            TypedValue::Label(_) => PropertyType::Label,
            TypedValue::Identifier(_) => PropertyType::Identifier,
            TypedValue::Boolean(_) => PropertyType::Boolean,
            TypedValue::Integer(_) => PropertyType::Integer,
            TypedValue::Real(_) => PropertyType::Real,
        }
    }

    /// STEP type tag, e.g. `IFCREAL`
    pub fn type_tag(&self) -> &'static str {
        self.property_type().type_tag()
    }

    /// Bare encoding, for fields declared with a defined type
    pub fn to_plain(&self) -> AttributeValue {
        match self {
            TypedValue::Text(s) | TypedValue::Label(s) | TypedValue::Identifier(s) => {
                AttributeValue::String(s.clone())
            }
            TypedValue::Boolean(b) => AttributeValue::Bool(*b),
            TypedValue::Integer(i) => AttributeValue::Integer(*i),
            TypedValue::Real(f) => AttributeValue::Float(*f),
        }
    }

    /// Type-wrapped encoding, for SELECT fields such as `NominalValue`
    pub fn to_tagged(&self) -> AttributeValue {
        AttributeValue::TypedValue(self.type_tag().to_string(), vec![self.to_plain()])
    }

    /// Decode a type-wrapped attribute of one of the supported tags
    pub fn from_attribute(attr: &AttributeValue) -> Option<Self> {
        let AttributeValue::TypedValue(tag, args) = attr else {
            return None;
        };
        let inner = args.first()?;
        match tag.to_ascii_uppercase().as_str() {
            "IFCTEXT" => inner.as_string().map(|s| TypedValue::Text(s.to_string())),
            "IFCLABEL" => inner.as_string().map(|s| TypedValue::Label(s.to_string())),
            "IFCIDENTIFIER" => inner
                .as_string()
                .map(|s| TypedValue::Identifier(s.to_string())),
            "IFCBOOLEAN" => inner.as_bool().map(TypedValue::Boolean),
            "IFCINTEGER" => inner.as_integer().map(TypedValue::Integer),
            "IFCREAL" => inner.as_float().map(TypedValue::Real),
            _ => None,
        }
    }
}

/// A single property read back from a document
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub id: EntityId,
    pub name: String,
    /// `None` when the value is absent or of a tag outside [`PropertyType`]
    pub value: Option<TypedValue>,
}

/// A property set read back from a document
#[derive(Clone, Debug, PartialEq)]
pub struct PropertySet {
    pub id: EntityId,
    pub name: String,
    pub properties: Vec<Property>,
}

impl PropertySet {
    /// Get the first property with this name
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Every property with this name, in set order
    pub fn all(&self, name: &str) -> Vec<&Property> {
        self.properties.iter().filter(|p| p.name == name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_from_str() {
        assert_eq!("IfcReal".parse::<PropertyType>(), Ok(PropertyType::Real));
        assert_eq!("IFCBOOLEAN".parse::<PropertyType>(), Ok(PropertyType::Boolean));
        assert_eq!(" text ".parse::<PropertyType>(), Ok(PropertyType::Text));
        assert!("IfcLengthMeasure".parse::<PropertyType>().is_err());
    }

    #[test]
    fn test_tagged_encoding() {
        let value = TypedValue::Real(3000.0);
        assert_eq!(
            value.to_tagged(),
            AttributeValue::TypedValue("IFCREAL".into(), vec![AttributeValue::Float(3000.0)])
        );
        assert_eq!(TypedValue::from_attribute(&value.to_tagged()), Some(value));
    }

    #[test]
    fn test_definition_json_shape() {
        let def = PropertyDefinition::new("FireRating", PropertyType::Label);
        let json = serde_json::to_string(&def).unwrap();
        assert_eq!(json, r#"{"name":"FireRating","type":"IfcLabel"}"#);
    }
}
