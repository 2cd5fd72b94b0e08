// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Item data exchanged with a live model

use crate::{AttributeValue, EntityId, FieldValue, IfcType};
use std::collections::BTreeMap;

/// Relation from an element to its property definitions
pub const IS_DEFINED_BY: &str = "IsDefinedBy";

/// Relation from a property set to its properties
pub const HAS_PROPERTIES: &str = "HasProperties";

/// Which relations to expand, one level deep, when fetching items
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub relations: Vec<String>,
}

impl ItemQuery {
    /// Attributes only, no relation expansion
    pub fn attributes_only() -> Self {
        Self::default()
    }

    /// Attributes plus the property groups defining the item
    pub fn defined_by() -> Self {
        Self::default().with_relation(IS_DEFINED_BY)
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relations.push(relation.into());
        self
    }

    pub fn expands(&self, relation: &str) -> bool {
        self.relations.iter().any(|r| r == relation)
    }
}

/// Attributes of a live item, with requested relations expanded
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemData {
    pub id: EntityId,
    pub category: IfcType,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub relations: BTreeMap<String, Vec<ItemData>>,
}

impl ItemData {
    /// The `Name` attribute, if it holds text
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("Name").and_then(|v| v.as_string())
    }

    /// Whether the named attribute holds a list
    pub fn has_list(&self, attribute: &str) -> bool {
        matches!(self.attributes.get(attribute), Some(AttributeValue::List(_)))
    }

    /// Related items fetched under `relation`
    pub fn related(&self, relation: &str) -> &[ItemData] {
        self.relations
            .get(relation)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Property groups (sets carrying `HasProperties`) attached to this item
    pub fn property_groups(&self) -> impl Iterator<Item = &ItemData> {
        self.related(IS_DEFINED_BY)
            .iter()
            .filter(|group| group.has_list(HAS_PROPERTIES))
    }
}

/// A pending creation for the live editor
#[derive(Clone, Debug, PartialEq)]
pub struct NewItem {
    pub category: IfcType,
    pub data: BTreeMap<String, FieldValue>,
}

impl NewItem {
    pub fn new(category: IfcType) -> Self {
        Self {
            category,
            data: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.data.insert(name.into(), value);
        self
    }
}
