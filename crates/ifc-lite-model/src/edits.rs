// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edit requests recorded by a live editing session

use crate::{EntityId, IfcType, TypedValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of a loaded model
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelId(pub String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        ModelId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        ModelId(s.to_string())
    }
}

impl From<String> for ModelId {
    fn from(s: String) -> Self {
        ModelId(s)
    }
}

/// Selected elements, grouped by model
pub type Selection = BTreeMap<ModelId, BTreeSet<EntityId>>;

/// Value of one field in an edit payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// A scalar that already carries its type tag
    Scalar(TypedValue),
    /// Entity references, e.g. `HasProperties`
    References(Vec<EntityId>),
}

/// A recorded entity creation or mutation
///
/// Whether the request creates or mutates is decided at replay time, by
/// comparing `original_id` with the document it is replayed onto.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditRequest {
    pub original_id: EntityId,
    pub category: IfcType,
    pub payload: BTreeMap<String, FieldValue>,
}

impl EditRequest {
    pub fn new(original_id: EntityId, category: IfcType) -> Self {
        Self {
            original_id,
            category,
            payload: BTreeMap::new(),
        }
    }

    /// Builder-style payload field
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.payload.insert(name.into(), value);
        self
    }
}

/// Ordered, append-only list of edit requests for one model
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EditLog {
    requests: Vec<EditRequest>,
}

impl EditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: EditRequest) {
        self.requests.push(request);
    }

    pub fn iter(&self) -> impl Iterator<Item = &EditRequest> {
        self.requests.iter()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn requests(&self) -> &[EditRequest] {
        &self.requests
    }
}

impl FromIterator<EditRequest> for EditLog {
    fn from_iter<I: IntoIterator<Item = EditRequest>>(iter: I) -> Self {
        Self {
            requests: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a EditLog {
    type Item = &'a EditRequest;
    type IntoIter = std::slice::Iter<'a, EditRequest>;

    fn into_iter(self) -> Self::IntoIter {
        self.requests.iter()
    }
}
