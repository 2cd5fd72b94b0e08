// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Lite Model - Shared types and collaborator traits for IFC editing
//!
//! This crate provides the core abstractions for attaching typed properties
//! to IFC (Industry Foundation Classes) models and replaying those edits onto
//! the original file. It defines the vocabulary shared by the document
//! engine, the live editing session and the property engine.
//!
//! # Architecture
//!
//! - [`DocumentEngine`] / [`DocumentSession`] - read and write typed entities
//!   of a serialized document by identifier
//! - [`LiveModelApi`] - the already-decoded model being edited
//! - [`EditLogSource`] - per-model logs of pending [`EditRequest`]s
//! - [`CategorySchema`] - positional field layouts used when writing
//!
//! # Example
//!
//! ```ignore
//! use ifc_lite_model::{DocumentEngine, DocumentSession, EntityId};
//!
//! let mut session = engine.open_session(&bytes)?;
//! if let Some(entity) = session.get(EntityId(123)) {
//!     println!("Entity type: {}", entity.ifc_type);
//! }
//! session.close();
//! ```

pub mod edits;
pub mod error;
pub mod items;
pub mod properties;
pub mod schema;
pub mod traits;
pub mod types;

// Re-export all public types
pub use edits::*;
pub use error::*;
pub use items::*;
pub use properties::*;
pub use schema::*;
pub use traits::*;
pub use types::*;
