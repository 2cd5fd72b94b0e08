// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for document sessions and live edits

use crate::{EntityId, IfcType, ModelId};
use thiserror::Error;

/// Result type alias for document engine operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors raised by a document engine
#[derive(Error, Debug)]
pub enum ParseError {
    /// Invalid IFC file format
    #[error("Invalid IFC format: {0}")]
    InvalidFormat(String),

    /// Failed to parse entity
    #[error("Failed to parse entity {0}: {1}")]
    EntityParse(EntityId, String),

    /// Entity not found
    #[error("Entity {0} not found")]
    EntityNotFound(EntityId),

    /// No field layout is known for this category
    #[error("Unsupported category: {0}")]
    UnsupportedCategory(IfcType),

    /// Field name not present in the category layout
    #[error("Unknown field {field} on {category}")]
    UnknownField { category: IfcType, field: String },

    /// A value does not fit the kind of the field it is written to
    #[error("Field {field} on {category} cannot hold {value}")]
    InvalidFieldValue {
        category: IfcType,
        field: String,
        value: String,
    },

    /// An entity could not be encoded
    #[error("Cannot serialize entity {entity}: {message}")]
    Serialization { entity: EntityId, message: String },
}

impl ParseError {
    /// Create a new format error
    pub fn format(msg: impl Into<String>) -> Self {
        ParseError::InvalidFormat(msg.into())
    }

    /// Create a new entity parse error
    pub fn entity_parse(id: EntityId, msg: impl Into<String>) -> Self {
        ParseError::EntityParse(id, msg.into())
    }

    /// Create a new serialization error
    pub fn serialization(entity: EntityId, msg: impl Into<String>) -> Self {
        ParseError::Serialization {
            entity,
            message: msg.into(),
        }
    }
}

/// Errors raised by a live model
#[derive(Error, Debug)]
pub enum EditError {
    #[error("Model {0} is not loaded")]
    ModelNotFound(ModelId),

    #[error("Item {id} not found in model {model}")]
    ItemNotFound { model: ModelId, id: EntityId },

    #[error("{category} has no relation {relation}")]
    UnknownRelation { category: IfcType, relation: String },

    #[error(transparent)]
    Document(#[from] ParseError),
}
