// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Collaborator interfaces
//!
//! The property engine talks to two independent representations of a model:
//! a document engine over the original bytes, and a live model that has
//! already been decoded and is being edited.

use crate::{
    DecodedEntity, EditError, EditLog, EntityId, IfcType, ItemData, ItemQuery, ModelId, NewItem,
    Result,
};

/// Opens byte buffers as mutable document sessions
pub trait DocumentEngine {
    type Session: DocumentSession;

    /// Open `bytes` as a single-writer session
    fn open_session(&self, bytes: &[u8]) -> Result<Self::Session>;
}

/// A mutable view of one serialized document
///
/// Sessions are single-writer. Callers must call [`DocumentSession::close`]
/// on every exit path.
pub trait DocumentSession {
    /// Highest entity identifier present
    fn max_identifier(&self) -> EntityId;

    /// Whether the original document holds a record at `id`
    ///
    /// True even when that record cannot be decoded.
    fn has_record(&self, id: EntityId) -> bool;

    /// Identifiers of all entities of a category, in document order
    fn entities_of_type(&self, ifc_type: &IfcType) -> Vec<EntityId>;

    /// Decode the entity at `id`
    fn get(&mut self, id: EntityId) -> Option<DecodedEntity>;

    /// Instantiate a blank entity of `ifc_type`
    ///
    /// Every field starts out as [`crate::AttributeValue::Derived`]. The
    /// caller assigns the identifier before writing.
    fn create(&self, ifc_type: &IfcType) -> Result<DecodedEntity>;

    /// Store an entity, replacing any entity with the same identifier
    fn write(&mut self, entity: DecodedEntity) -> Result<()>;

    /// Generate a fresh globally unique identifier
    fn new_global_id(&mut self) -> String;

    /// Encode the session back to bytes
    fn serialize(&self) -> Result<Vec<u8>>;

    /// Release the session
    fn close(self);
}

/// The live editing session of a loaded model
///
/// All methods may suspend on model or editor I/O.
#[allow(async_fn_in_trait)]
pub trait LiveModelApi {
    /// Whether `model` is loaded
    async fn has_model(&self, model: &ModelId) -> bool;

    /// Fetch items with the relations named in `query` expanded one level
    async fn get_items_data(
        &self,
        model: &ModelId,
        ids: &[EntityId],
        query: &ItemQuery,
    ) -> std::result::Result<Vec<ItemData>, EditError>;

    /// Queue the creation of an item
    async fn create_item(
        &self,
        model: &ModelId,
        item: NewItem,
    ) -> std::result::Result<(), EditError>;

    /// Commit pending changes, returning the identifiers allocated to created items
    async fn apply_changes(&self, model: &ModelId) -> std::result::Result<Vec<EntityId>, EditError>;

    /// Append `to` to the `relation` list of `from`
    async fn relate(
        &self,
        model: &ModelId,
        from: EntityId,
        relation: &str,
        to: &[EntityId],
    ) -> std::result::Result<(), EditError>;
}

/// Supplies snapshots of per-model edit logs
pub trait EditLogSource {
    /// Consistent snapshot of the log for `model`, if the model is live
    fn edit_log(&self, model: &ModelId) -> Option<EditLog>;
}
