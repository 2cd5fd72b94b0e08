// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Catalog of user-declared properties

use ifc_lite_model::{PropertyDefinition, PropertyType};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Named property declarations available for assignment
///
/// Names are unique. Adding a name that is already present is a no-op.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyCatalog {
    definitions: Vec<PropertyDefinition>,
}

impl PropertyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition, returning false if the name was already taken
    pub fn add(&mut self, definition: PropertyDefinition) -> bool {
        if self.find(&definition.name).is_some() {
            debug!("Property {} already declared", definition.name);
            return false;
        }
        self.definitions.push(definition);
        true
    }

    /// Look up a definition by name
    pub fn find(&self, name: &str) -> Option<&PropertyDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// All definitions, in insertion order
    pub fn list(&self) -> &[PropertyDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Import definitions from delimited text
    ///
    /// The first line is a header. Every following line holds
    /// `name<delimiter>type`. Returns the number of definitions added.
    pub fn add_from_text(&mut self, text: &str, delimiter: char) -> usize {
        let mut added = 0;

        for (number, line) in text.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }

            let Some((name, type_name)) = line.split_once(delimiter) else {
                warn!("Line {}: missing '{}' delimiter", number + 1, delimiter);
                continue;
            };

            let name = name.trim();
            if name.is_empty() {
                warn!("Line {}: empty property name", number + 1);
                continue;
            }

            match type_name.trim().parse::<PropertyType>() {
                Ok(property_type) => {
                    if self.add(PropertyDefinition::new(name, property_type)) {
                        added += 1;
                    }
                }
                Err(e) => warn!("Line {}: {}", number + 1, e),
            }
        }

        added
    }

    /// Encode as a JSON array of `{ "name", "type" }` objects
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode from JSON, dropping repeated names
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let definitions: Vec<PropertyDefinition> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for definition in definitions {
            catalog.add(definition);
        }
        Ok(catalog)
    }
}

impl FromIterator<PropertyDefinition> for PropertyCatalog {
    fn from_iter<I: IntoIterator<Item = PropertyDefinition>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for definition in iter {
            catalog.add(definition);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_find() {
        let mut catalog = PropertyCatalog::new();
        assert!(catalog.add(PropertyDefinition::new("Width", PropertyType::Real)));
        assert!(catalog.add(PropertyDefinition::new("Fire", PropertyType::Label)));

        assert_eq!(
            catalog.find("Width").map(|d| d.property_type),
            Some(PropertyType::Real)
        );
        assert!(catalog.find("width").is_none());
        assert_eq!(catalog.list()[1].name, "Fire");
    }

    #[test]
    fn test_duplicate_name_is_dropped() {
        let mut catalog = PropertyCatalog::new();
        catalog.add(PropertyDefinition::new("Width", PropertyType::Real));
        assert!(!catalog.add(PropertyDefinition::new("Width", PropertyType::Text)));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.find("Width").unwrap().property_type, PropertyType::Real);
    }

    #[test]
    fn test_add_from_text() {
        let text = "Name;Type\r\nWidth ; IfcReal\r\nLoadBearing;IfcBoolean\r\n\r\nBroken\r\nColour;IfcColour\r\nWidth;IfcText\r\nCount;INTEGER";
        let mut catalog = PropertyCatalog::new();

        assert_eq!(catalog.add_from_text(text, ';'), 3);
        let names: Vec<_> = catalog.list().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Width", "LoadBearing", "Count"]);
        assert_eq!(
            catalog.find("Count").unwrap().property_type,
            PropertyType::Integer
        );
    }

    #[test]
    fn test_header_only_text_adds_nothing() {
        let mut catalog = PropertyCatalog::new();
        assert_eq!(catalog.add_from_text("Width,IfcReal", ','), 0);
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_json_persistence() {
        let catalog: PropertyCatalog = [
            PropertyDefinition::new("Width", PropertyType::Real),
            PropertyDefinition::new("Fire", PropertyType::Label),
        ]
        .into_iter()
        .collect();

        let json = catalog.to_json().unwrap();
        assert_eq!(
            json,
            r#"[{"name":"Width","type":"IfcReal"},{"name":"Fire","type":"IfcLabel"}]"#
        );
        assert_eq!(PropertyCatalog::from_json(&json).unwrap(), catalog);

        let repeated = r#"[{"name":"A","type":"IfcText"},{"name":"A","type":"IfcReal"}]"#;
        assert_eq!(PropertyCatalog::from_json(repeated).unwrap().len(), 1);
        assert!(PropertyCatalog::from_json(r#"[{"name":"A","type":"IfcMass"}]"#).is_err());
    }
}
