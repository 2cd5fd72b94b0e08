// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory live models
//!
//! Decoded entity graphs that can be edited through [`LiveModelApi`]. Every
//! committed change is recorded in the model's [`EditLog`] so it can later be
//! replayed onto the original file.

use ifc_lite_model::{
    AttributeValue, DecodedEntity, DocumentEngine, DocumentSession, EditError, EditLog, EditLogSource,
    EditRequest, EntityId, FieldKind, FieldValue, IfcType, ItemData, ItemQuery, LiveModelApi,
    ModelId, NewItem, ParseError, Property, PropertySet, TypedValue, IS_DEFINED_BY,
};
use ifc_lite_parser::StepEngine;
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One decoded model and its pending changes
#[derive(Debug, Default)]
struct LiveModel {
    entities: BTreeMap<u32, DecodedEntity>,
    /// Element ID -> property definitions attached by IFCRELDEFINESBYPROPERTIES
    defined_by: FxHashMap<u32, Vec<EntityId>>,
    /// Created items awaiting an identifier
    pending_items: Vec<DecodedEntity>,
    /// Entity ID -> relation fields changed since the last commit
    pending_updates: BTreeMap<u32, BTreeSet<&'static str>>,
    log: EditLog,
    next_id: u32,
}

impl LiveModel {
    fn decode(bytes: &[u8], id_gap: u32) -> Result<Self, ParseError> {
        let mut session = StepEngine::new().open_session(bytes)?;
        let ids: Vec<EntityId> = session.ids().collect();
        // Records that fail to decode still own their identifiers
        let max_id = session.max_identifier().0;

        let mut entities = BTreeMap::new();
        for id in ids {
            match session.decode_by_id(id) {
                Ok(entity) => {
                    entities.insert(id.0, (*entity).clone());
                }
                Err(e) => warn!("Skipping {}: {}", id, e),
            }
        }
        drop(session);

        // Build property relationship index
        let mut defined_by: FxHashMap<u32, Vec<EntityId>> = FxHashMap::default();
        for rel in entities.values() {
            index_defined_by(&mut defined_by, rel, &related_objects(rel));
        }

        Ok(Self {
            entities,
            defined_by,
            next_id: max_id.saturating_add(1).saturating_add(id_gap),
            ..Self::default()
        })
    }

    fn entity(&self, model: &ModelId, id: EntityId) -> Result<&DecodedEntity, EditError> {
        self.entities
            .get(&id.0)
            .ok_or_else(|| EditError::ItemNotFound {
                model: model.clone(),
                id,
            })
    }

    fn item_data(entity: &DecodedEntity) -> ItemData {
        let schema = entity.ifc_type.schema();
        let attributes = entity
            .attributes
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let name = schema
                    .and_then(|s| s.field_name(index))
                    .map(str::to_string)
                    .unwrap_or_else(|| index.to_string());
                (name, value.clone())
            })
            .collect();

        ItemData {
            id: entity.id,
            category: entity.ifc_type.clone(),
            attributes,
            relations: BTreeMap::new(),
        }
    }

    fn related(
        &self,
        model: &ModelId,
        entity: &DecodedEntity,
        relation: &str,
    ) -> Result<Vec<EntityId>, EditError> {
        if relation == IS_DEFINED_BY {
            return Ok(self
                .defined_by
                .get(&entity.id.0)
                .cloned()
                .unwrap_or_default());
        }

        match entity.field(relation) {
            Some(AttributeValue::EntityRef(id)) => Ok(vec![*id]),
            Some(list @ AttributeValue::List(_)) => Ok(list.as_ref_list().unwrap_or_default()),
            Some(_) => Ok(Vec::new()),
            None => Err(unknown_relation(model, entity, relation)),
        }
    }

    fn property_set(&self, pset: &DecodedEntity) -> PropertySet {
        let properties = pset
            .field("HasProperties")
            .and_then(|v| v.as_ref_list())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| self.entities.get(&id.0))
            .filter(|prop| prop.ifc_type == IfcType::IfcPropertySingleValue)
            .filter_map(|prop| {
                Some(Property {
                    id: prop.id,
                    name: prop.field("Name")?.as_string()?.to_string(),
                    value: prop.field("NominalValue").and_then(TypedValue::from_attribute),
                })
            })
            .collect();

        PropertySet {
            id: pset.id,
            name: pset
                .field("Name")
                .and_then(|v| v.as_string())
                .unwrap_or_default()
                .to_string(),
            properties,
        }
    }
}

fn related_objects(rel: &DecodedEntity) -> Vec<EntityId> {
    rel.field("RelatedObjects")
        .and_then(|v| v.as_ref_list())
        .unwrap_or_default()
}

/// Record `elements` as defined by the property definition `rel` points at
fn index_defined_by(
    defined_by: &mut FxHashMap<u32, Vec<EntityId>>,
    rel: &DecodedEntity,
    elements: &[EntityId],
) {
    if rel.ifc_type != IfcType::IfcRelDefinesByProperties {
        return;
    }
    let Some(definition) = rel
        .field("RelatingPropertyDefinition")
        .and_then(|v| v.as_entity_ref())
    else {
        return;
    };

    for element in elements {
        let definitions = defined_by.entry(element.0).or_default();
        if !definitions.contains(&definition) {
            definitions.push(definition);
        }
    }
}

fn unknown_relation(model: &ModelId, entity: &DecodedEntity, relation: &str) -> EditError {
    debug!("{} {} has no relation {}", model, entity.id, relation);
    EditError::UnknownRelation {
        category: entity.ifc_type.clone(),
        relation: relation.to_string(),
    }
}

/// Live models held in memory, keyed by model id
///
/// Stands in for the editor's model manager. New identifiers are allocated
/// above the highest identifier of the loaded file, after an optional gap.
#[derive(Debug, Default)]
pub struct MemoryModels {
    models: RwLock<FxHashMap<ModelId, LiveModel>>,
    id_gap: u32,
}

impl MemoryModels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave `gap` unused identifiers between a file's last entity and the first new one
    pub fn with_id_gap(mut self, gap: u32) -> Self {
        self.id_gap = gap;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, FxHashMap<ModelId, LiveModel>> {
        self.models.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, FxHashMap<ModelId, LiveModel>> {
        self.models.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Decode a file and make it available under `model_id`
    ///
    /// Replaces any model already loaded under the same id.
    pub fn load(&self, model_id: impl Into<ModelId>, bytes: &[u8]) -> Result<(), EditError> {
        let model_id = model_id.into();
        let model = LiveModel::decode(bytes, self.id_gap)?;
        info!(
            "Loaded {} with {} entities, next id #{}",
            model_id,
            model.entities.len(),
            model.next_id
        );
        self.write().insert(model_id, model);
        Ok(())
    }

    /// Drop a model and its edit log
    pub fn unload(&self, model_id: &ModelId) -> bool {
        self.write().remove(model_id).is_some()
    }

    /// Ids of all loaded models
    pub fn model_ids(&self) -> Vec<ModelId> {
        let mut ids: Vec<_> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Current state of an entity
    pub fn entity(&self, model_id: &ModelId, id: EntityId) -> Option<DecodedEntity> {
        self.read().get(model_id)?.entities.get(&id.0).cloned()
    }

    /// Property sets attached to an element, with typed values
    pub fn property_sets(
        &self,
        model_id: &ModelId,
        id: EntityId,
    ) -> Result<Vec<PropertySet>, EditError> {
        let models = self.read();
        let model = models
            .get(model_id)
            .ok_or_else(|| EditError::ModelNotFound(model_id.clone()))?;
        model.entity(model_id, id)?;

        Ok(model
            .defined_by
            .get(&id.0)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|def| model.entities.get(&def.0))
            .filter(|def| def.ifc_type == IfcType::IfcPropertySet)
            .map(|pset| model.property_set(pset))
            .collect())
    }
}

impl LiveModelApi for MemoryModels {
    async fn has_model(&self, model: &ModelId) -> bool {
        self.read().contains_key(model)
    }

    async fn get_items_data(
        &self,
        model_id: &ModelId,
        ids: &[EntityId],
        query: &ItemQuery,
    ) -> Result<Vec<ItemData>, EditError> {
        let models = self.read();
        let model = models
            .get(model_id)
            .ok_or_else(|| EditError::ModelNotFound(model_id.clone()))?;

        ids.iter()
            .map(|&id| -> Result<ItemData, EditError> {
                let entity = model.entity(model_id, id)?;
                let mut item = LiveModel::item_data(entity);

                for relation in &query.relations {
                    let related = model
                        .related(model_id, entity, relation)?
                        .into_iter()
                        .filter_map(|related_id| model.entities.get(&related_id.0))
                        .map(LiveModel::item_data)
                        .collect();
                    item.relations.insert(relation.clone(), related);
                }
                Ok(item)
            })
            .collect()
    }

    async fn create_item(&self, model_id: &ModelId, item: NewItem) -> Result<(), EditError> {
        let mut models = self.write();
        let model = models
            .get_mut(model_id)
            .ok_or_else(|| EditError::ModelNotFound(model_id.clone()))?;

        let schema = item
            .category
            .schema()
            .filter(|schema| schema.creatable)
            .ok_or_else(|| ParseError::UnsupportedCategory(item.category.clone()))?;

        let mut entity = DecodedEntity::new(
            EntityId(0),
            item.category,
            vec![AttributeValue::Null; schema.arity()],
        );
        for (name, value) in &item.data {
            entity.set_field(name, value)?;
        }

        model.pending_items.push(entity);
        Ok(())
    }

    async fn apply_changes(&self, model_id: &ModelId) -> Result<Vec<EntityId>, EditError> {
        let mut models = self.write();
        let model = models
            .get_mut(model_id)
            .ok_or_else(|| EditError::ModelNotFound(model_id.clone()))?;

        let mut created = Vec::with_capacity(model.pending_items.len());
        for mut entity in std::mem::take(&mut model.pending_items) {
            entity.id = EntityId(model.next_id);
            model.next_id = model.next_id.saturating_add(1);

            let schema = entity.ifc_type.schema();
            let payload = entity
                .attributes
                .iter()
                .enumerate()
                .filter_map(|(index, value)| {
                    let spec = schema?.fields.get(index)?;
                    Some((spec.name.to_string(), field_value(spec.kind, value)?))
                })
                .collect();

            model.log.push(EditRequest {
                original_id: entity.id,
                category: entity.ifc_type.clone(),
                payload,
            });
            created.push(entity.id);
            index_defined_by(&mut model.defined_by, &entity, &related_objects(&entity));
            model.entities.insert(entity.id.0, entity);
        }

        for (id, fields) in std::mem::take(&mut model.pending_updates) {
            let Some(entity) = model.entities.get(&id) else {
                continue;
            };
            let mut request = EditRequest::new(entity.id, entity.ifc_type.clone());
            for field in fields {
                let refs = entity
                    .field(field)
                    .and_then(|v| v.as_ref_list())
                    .unwrap_or_default();
                request = request.with_field(field, FieldValue::References(refs));
            }
            model.log.push(request);
        }

        debug!(
            "Committed {} new items on {}, log holds {} requests",
            created.len(),
            model_id,
            model.log.len()
        );
        Ok(created)
    }

    async fn relate(
        &self,
        model_id: &ModelId,
        from: EntityId,
        relation: &str,
        to: &[EntityId],
    ) -> Result<(), EditError> {
        let mut models = self.write();
        let model = models
            .get_mut(model_id)
            .ok_or_else(|| EditError::ModelNotFound(model_id.clone()))?;

        let entity = model
            .entities
            .get_mut(&from.0)
            .ok_or_else(|| EditError::ItemNotFound {
                model: model_id.clone(),
                id: from,
            })?;

        let Some((index, spec)) = entity
            .ifc_type
            .schema()
            .and_then(|schema| schema.field(relation))
            .filter(|(index, spec)| {
                spec.kind == FieldKind::ReferenceList && *index < entity.attributes.len()
            })
        else {
            return Err(unknown_relation(model_id, entity, relation));
        };

        let mut refs = entity.attributes[index].as_ref_list().unwrap_or_default();
        refs.extend_from_slice(to);
        entity.attributes[index] =
            AttributeValue::List(refs.into_iter().map(AttributeValue::EntityRef).collect());
        if spec.name == "RelatedObjects" {
            index_defined_by(&mut model.defined_by, entity, to);
        }

        model
            .pending_updates
            .entry(from.0)
            .or_default()
            .insert(spec.name);
        Ok(())
    }
}

impl EditLogSource for MemoryModels {
    fn edit_log(&self, model: &ModelId) -> Option<EditLog> {
        self.read().get(model).map(|m| m.log.clone())
    }
}

/// Recover a payload value from a live attribute of the given kind
fn field_value(kind: FieldKind, value: &AttributeValue) -> Option<FieldValue> {
    match kind {
        FieldKind::Select => TypedValue::from_attribute(value).map(FieldValue::Scalar),
        FieldKind::Plain => match value {
            AttributeValue::String(s) => Some(FieldValue::Scalar(TypedValue::Text(s.clone()))),
            AttributeValue::Bool(b) => Some(FieldValue::Scalar(TypedValue::Boolean(*b))),
            AttributeValue::Integer(i) => Some(FieldValue::Scalar(TypedValue::Integer(*i))),
            AttributeValue::Float(f) => Some(FieldValue::Scalar(TypedValue::Real(*f))),
            _ => None,
        },
        FieldKind::Reference => value
            .as_entity_ref()
            .map(|id| FieldValue::References(vec![id])),
        FieldKind::ReferenceList => value.as_ref_list().map(FieldValue::References),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::TEST_IFC;
    use ifc_lite_model::HAS_PROPERTIES;

    fn loaded() -> (MemoryModels, ModelId) {
        let models = MemoryModels::new();
        let id = ModelId::new("office");
        models.load(id.clone(), TEST_IFC.as_bytes()).unwrap();
        (models, id)
    }

    #[tokio::test]
    async fn test_items_with_property_groups() {
        let (models, id) = loaded();
        let items = models
            .get_items_data(&id, &[EntityId(10), EntityId(11)], &ItemQuery::defined_by())
            .await
            .unwrap();

        assert_eq!(items[0].name(), Some("Wall A"));
        let groups: Vec<_> = items[0].property_groups().filter_map(|g| g.name()).collect();
        assert_eq!(groups, vec!["Pset_WallCommon"]);

        assert_eq!(items[1].related(IS_DEFINED_BY).len(), 1);
        assert_eq!(items[1].property_groups().count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_items_and_models() {
        let (models, id) = loaded();
        assert!(models.has_model(&id).await);
        assert!(!models.has_model(&ModelId::new("other")).await);
        assert!(matches!(
            models.get_items_data(&id, &[EntityId(999)], &ItemQuery::attributes_only()).await,
            Err(EditError::ItemNotFound { .. })
        ));
        assert!(matches!(
            models
                .get_items_data(&id, &[EntityId(10)], &ItemQuery::default().with_relation("Nope"))
                .await,
            Err(EditError::UnknownRelation { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_and_relate_are_logged() {
        let (models, id) = loaded();
        let item = NewItem::new(IfcType::IfcPropertySingleValue)
            .with_field("Name", FieldValue::Scalar(TypedValue::Text("Width".into())))
            .with_field("NominalValue", FieldValue::Scalar(TypedValue::Real(3000.0)));

        models.create_item(&id, item).await.unwrap();
        let created = models.apply_changes(&id).await.unwrap();
        assert_eq!(created, vec![EntityId(26)]);

        models
            .relate(&id, EntityId(21), HAS_PROPERTIES, &created)
            .await
            .unwrap();
        assert!(models.apply_changes(&id).await.unwrap().is_empty());

        let log = models.edit_log(&id).unwrap();
        assert_eq!(log.len(), 2);

        let create = &log.requests()[0];
        assert_eq!(create.original_id, EntityId(26));
        assert_eq!(create.category, IfcType::IfcPropertySingleValue);
        assert_eq!(
            create.payload.get("NominalValue"),
            Some(&FieldValue::Scalar(TypedValue::Real(3000.0)))
        );
        assert_eq!(
            create.payload.get("Name"),
            Some(&FieldValue::Scalar(TypedValue::Text("Width".into())))
        );
        assert!(!create.payload.contains_key("Description"));

        let update = &log.requests()[1];
        assert_eq!(update.original_id, EntityId(21));
        assert_eq!(
            update.payload.get("HasProperties"),
            Some(&FieldValue::References(vec![EntityId(20), EntityId(26)]))
        );

        let psets = models.property_sets(&id, EntityId(10)).unwrap();
        assert_eq!(
            psets[0].get("Width").and_then(|p| p.value.clone()),
            Some(TypedValue::Real(3000.0))
        );
    }

    #[tokio::test]
    async fn test_id_gap() {
        let models = MemoryModels::new().with_id_gap(100);
        let id = ModelId::new("office");
        models.load(id.clone(), TEST_IFC.as_bytes()).unwrap();

        models
            .create_item(&id, NewItem::new(IfcType::IfcPropertySingleValue))
            .await
            .unwrap();
        assert_eq!(models.apply_changes(&id).await.unwrap(), vec![EntityId(126)]);
    }

    #[tokio::test]
    async fn test_invalid_items_are_rejected() {
        let (models, id) = loaded();
        assert!(models
            .create_item(&id, NewItem::new(IfcType::IfcWall))
            .await
            .is_err());
        assert!(models
            .create_item(
                &id,
                NewItem::new(IfcType::IfcPropertySingleValue)
                    .with_field("Colour", FieldValue::References(vec![]))
            )
            .await
            .is_err());
        assert!(models
            .relate(&id, EntityId(10), HAS_PROPERTIES, &[EntityId(20)])
            .await
            .is_err());
        assert!(models.apply_changes(&id).await.unwrap().is_empty());
        assert!(models.edit_log(&id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_allocation_starts_above_unreadable_records() {
        let content = TEST_IFC.replace(
            "ENDSEC;\nEND-ISO",
            "#30=IFCPIXELTEXTURE(.T.,.T.,$,$,$,2,1,1,(\"0FF\"));\n\
             #31=IFCQUANTITYCOUNT('N',$,$,99999999999999999999,$);\n\
             ENDSEC;\nEND-ISO",
        );
        let models = MemoryModels::new();
        let id = ModelId::new("textured");
        models.load(id.clone(), content.as_bytes()).unwrap();

        assert!(models.entity(&id, EntityId(30)).is_some());
        assert!(models.entity(&id, EntityId(31)).is_none());

        models
            .create_item(&id, NewItem::new(IfcType::IfcPropertySingleValue))
            .await
            .unwrap();
        assert_eq!(models.apply_changes(&id).await.unwrap(), vec![EntityId(32)]);
    }

    #[tokio::test]
    async fn test_groups_added_while_editing_are_found() {
        let (models, id) = loaded();

        models
            .create_item(
                &id,
                NewItem::new(IfcType::IfcPropertySet)
                    .with_field("Name", FieldValue::Scalar(TypedValue::Label("Pset_New".into())))
                    .with_field("HasProperties", FieldValue::References(vec![EntityId(20)])),
            )
            .await
            .unwrap();
        let pset = models.apply_changes(&id).await.unwrap()[0];

        models
            .create_item(
                &id,
                NewItem::new(IfcType::IfcRelDefinesByProperties)
                    .with_field("RelatedObjects", FieldValue::References(vec![EntityId(11)]))
                    .with_field("RelatingPropertyDefinition", FieldValue::References(vec![pset])),
            )
            .await
            .unwrap();
        let rel = models.apply_changes(&id).await.unwrap()[0];

        let groups_of = |items: Vec<ItemData>| -> Vec<String> {
            items[0]
                .property_groups()
                .filter_map(|g| g.name())
                .map(str::to_string)
                .collect()
        };
        let items = models
            .get_items_data(&id, &[EntityId(11)], &ItemQuery::defined_by())
            .await
            .unwrap();
        assert_eq!(groups_of(items), vec!["Pset_New"]);

        models
            .relate(&id, rel, "RelatedObjects", &[EntityId(10)])
            .await
            .unwrap();
        let items = models
            .get_items_data(&id, &[EntityId(10)], &ItemQuery::defined_by())
            .await
            .unwrap();
        assert_eq!(groups_of(items), vec!["Pset_WallCommon", "Pset_New"]);
        assert_eq!(models.property_sets(&id, EntityId(10)).unwrap().len(), 2);
    }

    #[test]
    fn test_property_sets() {
        let (models, id) = loaded();
        let psets = models.property_sets(&id, EntityId(10)).unwrap();
        assert_eq!(psets.len(), 1);
        assert_eq!(psets[0].name, "Pset_WallCommon");
        assert_eq!(
            psets[0].get("IsExternal").and_then(|p| p.value.clone()),
            Some(TypedValue::Boolean(true))
        );
        assert!(models.property_sets(&id, EntityId(11)).unwrap().is_empty());
        assert!(models.property_sets(&id, EntityId(404)).is_err());
    }
}
