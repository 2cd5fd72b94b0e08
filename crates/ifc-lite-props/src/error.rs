// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for coercion and export

use ifc_lite_model::{ModelId, PropertyType};
use thiserror::Error;

/// A raw value that cannot be represented in the declared type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("Invalid {expected} value: {value:?}")]
    InvalidValue {
        expected: PropertyType,
        value: String,
    },
}

/// Failure exporting one model
///
/// Always scoped to a single model; batch exports carry on with the others.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The original bytes could not be opened as a document
    #[error("Cannot open {model}: {reason}")]
    SessionOpenFailed { model: ModelId, reason: String },

    /// The replayed session could not be encoded
    #[error("Cannot serialize {model}: {reason}")]
    SerializationFailed { model: ModelId, reason: String },

    /// A new entity could not be created or written
    #[error("Replay failed for {model}: {reason}")]
    ReplayFailed { model: ModelId, reason: String },
}

impl ExportError {
    /// Model the failure belongs to
    pub fn model(&self) -> &ModelId {
        match self {
            ExportError::SessionOpenFailed { model, .. }
            | ExportError::SerializationFailed { model, .. }
            | ExportError::ReplayFailed { model, .. } => model,
        }
    }
}
