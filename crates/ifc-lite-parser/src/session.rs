// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Document session with lazy decoding and in-place rewriting

use crate::guid;
use crate::scanner::{parse_header, scan_layout, DataLayout, HeaderInfo};
use crate::tokenizer::parse_entity_at;
use crate::writer::write_entity;
use ifc_lite_model::{
    AttributeValue, DecodedEntity, DocumentSession, EntityId, IfcType, ParseError, Result,
};
use log::debug;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A single-writer session over one STEP document
///
/// Entities are decoded on demand and cached. Written entities are kept
/// aside and only encoded when the session is serialized, so records that
/// were never written come out byte-for-byte as they went in.
pub struct StepSession {
    /// Raw IFC content
    content: String,
    /// Entity offsets and type index
    layout: DataLayout,
    /// Decoded entity cache
    cache: FxHashMap<u32, Arc<DecodedEntity>>,
    /// Overrides of existing entities and newly created ones
    written: BTreeMap<u32, DecodedEntity>,
    /// Open-session counter shared with the engine
    open: Arc<AtomicUsize>,
}

impl StepSession {
    pub(crate) fn open(content: String, open: Arc<AtomicUsize>) -> Result<Self> {
        let layout = scan_layout(&content)?;
        let count = open.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "Opened session over {} entities (max {}), {} open",
            layout.order.len(),
            layout.max_id,
            count
        );

        Ok(Self {
            content,
            layout,
            cache: FxHashMap::default(),
            written: BTreeMap::new(),
            open,
        })
    }

    /// Header metadata of the document
    pub fn header(&self) -> HeaderInfo {
        parse_header(&self.content)
    }

    /// IDs of the original entities, in document order
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.layout.order.iter().map(|&id| EntityId(id))
    }

    fn exists(&self, id: u32) -> bool {
        self.layout.index.contains_key(&id)
    }

    /// Decode an original entity by ID
    pub fn decode_by_id(&mut self, id: EntityId) -> Result<Arc<DecodedEntity>> {
        // Check cache first
        if let Some(cached) = self.cache.get(&id.0) {
            return Ok(Arc::clone(cached));
        }

        // Get byte offsets
        let (start, end) = self
            .layout
            .index
            .get(&id.0)
            .ok_or(ParseError::EntityNotFound(id))?;

        // Parse entity
        let entity = parse_entity_at(&self.content, *start, *end)
            .map_err(|e| ParseError::EntityParse(id, e))?;

        // Cache and return
        let arc = Arc::new(entity);
        self.cache.insert(id.0, Arc::clone(&arc));
        Ok(arc)
    }
}

impl DocumentSession for StepSession {
    fn max_identifier(&self) -> EntityId {
        let written_max = self.written.keys().next_back().copied().unwrap_or(0);
        EntityId(self.layout.max_id.max(written_max))
    }

    fn has_record(&self, id: EntityId) -> bool {
        self.exists(id.0)
    }

    fn entities_of_type(&self, ifc_type: &IfcType) -> Vec<EntityId> {
        let mut ids = self
            .layout
            .type_index
            .get(ifc_type)
            .cloned()
            .unwrap_or_default();

        ids.extend(
            self.written
                .iter()
                .filter(|(id, entity)| !self.exists(**id) && entity.ifc_type == *ifc_type)
                .map(|(id, _)| EntityId(*id)),
        );
        ids
    }

    fn get(&mut self, id: EntityId) -> Option<DecodedEntity> {
        if let Some(entity) = self.written.get(&id.0) {
            return Some(entity.clone());
        }

        match self.decode_by_id(id) {
            Ok(entity) => Some((*entity).clone()),
            Err(ParseError::EntityNotFound(_)) => None,
            Err(e) => {
                debug!("Cannot decode {}: {}", id, e);
                None
            }
        }
    }

    fn create(&self, ifc_type: &IfcType) -> Result<DecodedEntity> {
        let schema = ifc_type
            .schema()
            .filter(|schema| schema.creatable)
            .ok_or_else(|| ParseError::UnsupportedCategory(ifc_type.clone()))?;

        Ok(DecodedEntity::new(
            EntityId(0),
            ifc_type.clone(),
            vec![AttributeValue::Derived; schema.arity()],
        ))
    }

    fn write(&mut self, entity: DecodedEntity) -> Result<()> {
        if entity.id.0 == 0 {
            return Err(ParseError::entity_parse(
                entity.id,
                "entity has no identifier assigned",
            ));
        }

        self.cache.remove(&entity.id.0);
        self.written.insert(entity.id.0, entity);
        Ok(())
    }

    fn new_global_id(&mut self) -> String {
        guid::new_global_id()
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let content = self.content.as_str();
        let mut out = String::with_capacity(content.len() + self.written.len() * 96);
        let mut cursor = 0;

        // Substitute overridden records in place
        for id in &self.layout.order {
            let Some(entity) = self.written.get(id) else {
                continue;
            };
            let Some(&(start, end)) = self.layout.index.get(id) else {
                continue;
            };
            out.push_str(&content[cursor..start]);
            out.push_str(&write_entity(entity)?);
            cursor = end;
        }

        let data_end = self.layout.data_end;
        out.push_str(&content[cursor..data_end]);

        // New records go last in the DATA section, in ascending id order
        let mut created = self
            .written
            .iter()
            .filter(|(id, _)| !self.exists(**id))
            .peekable();
        if created.peek().is_some() && !out.ends_with('\n') {
            out.push('\n');
        }
        for (_, entity) in created {
            out.push_str(&write_entity(entity)?);
            out.push('\n');
        }

        out.push_str(&content[data_end..]);
        Ok(out.into_bytes())
    }

    fn close(self) {
        drop(self);
    }
}

impl Drop for StepSession {
    fn drop(&mut self) {
        let remaining = self.open.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        debug!("Closed session, {} open", remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_lite_model::TypedValue;

    const TEST_IFC: &str = r#"ISO-10303-21;
HEADER;
FILE_NAME('walls.ifc','2024-01-01T00:00:00',(''),(''),'','','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCOWNERHISTORY(#2,#3,$,.ADDED.,$,$,$,1700000000);
#10=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOH',#1,'Wall A',$,$,$,$,$,$);
#20=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.T.),$);
#21=IFCPROPERTYSET('3Fw8c2J4j0Bu6k8Fh2kHk1',#1,'Pset_WallCommon',$,(#20));
ENDSEC;
END-ISO-10303-21;
"#;

    fn open(content: &str) -> (StepSession, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let session = StepSession::open(content.to_string(), Arc::clone(&counter)).unwrap();
        (session, counter)
    }

    #[test]
    fn test_untouched_session_is_byte_identical() {
        let (session, _) = open(TEST_IFC);
        assert_eq!(session.serialize().unwrap(), TEST_IFC.as_bytes());
    }

    #[test]
    fn test_decode_and_cache() {
        let (mut session, _) = open(TEST_IFC);
        let first = session.decode_by_id(EntityId(21)).unwrap();
        let second = session.decode_by_id(EntityId(21)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.get_refs(4), Some(vec![EntityId(20)]));
        assert!(session.get(EntityId(999)).is_none());
    }

    #[test]
    fn test_override_replaces_record_in_place() {
        let (mut session, _) = open(TEST_IFC);
        let mut pset = session.get(EntityId(21)).unwrap();
        pset.set(
            4,
            AttributeValue::List(vec![
                AttributeValue::EntityRef(EntityId(20)),
                AttributeValue::EntityRef(EntityId(30)),
            ]),
        );
        session.write(pset).unwrap();

        let text = String::from_utf8(session.serialize().unwrap()).unwrap();
        assert!(text.contains(
            "\n#21=IFCPROPERTYSET('3Fw8c2J4j0Bu6k8Fh2kHk1',#1,'Pset_WallCommon',$,(#20,#30));\nENDSEC;"
        ));
        assert!(text.contains("#10=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOH',#1,'Wall A',$,$,$,$,$,$);"));
    }

    #[test]
    fn test_created_entities_are_appended_in_order() {
        let (mut session, _) = open(TEST_IFC);
        for id in [31, 30] {
            let mut psv = session.create(&IfcType::IfcPropertySingleValue).unwrap();
            assert!(psv.attributes.iter().all(|a| a.is_derived()));
            psv.id = EntityId(id);
            psv.set(0, AttributeValue::String(format!("P{}", id)));
            psv.set(2, TypedValue::Integer(id as i64).to_tagged());
            session.write(psv).unwrap();
        }

        assert_eq!(session.max_identifier(), EntityId(31));
        assert_eq!(
            session.entities_of_type(&IfcType::IfcPropertySingleValue),
            vec![EntityId(20), EntityId(30), EntityId(31)]
        );

        let text = String::from_utf8(session.serialize().unwrap()).unwrap();
        assert!(text.ends_with(
            "#30=IFCPROPERTYSINGLEVALUE('P30',*,IFCINTEGER(30),*);\n\
             #31=IFCPROPERTYSINGLEVALUE('P31',*,IFCINTEGER(31),*);\n\
             ENDSEC;\nEND-ISO-10303-21;\n"
        ));
    }

    #[test]
    fn test_undecodable_record_is_still_a_record() {
        let content = TEST_IFC.replace(
            "ENDSEC;\nEND-ISO",
            "#22=IFCQUANTITYCOUNT('N',$,$,99999999999999999999,$);\nENDSEC;\nEND-ISO",
        );
        let (mut session, _) = open(&content);
        assert_eq!(session.max_identifier(), EntityId(22));
        assert!(session.get(EntityId(22)).is_none());
        assert!(session.has_record(EntityId(22)));
        assert!(!session.has_record(EntityId(15)));
        assert_eq!(session.serialize().unwrap(), content.as_bytes());
    }

    #[test]
    fn test_create_rejects_unsupported_category() {
        let (session, _) = open(TEST_IFC);
        assert!(matches!(
            session.create(&IfcType::IfcWall),
            Err(ParseError::UnsupportedCategory(IfcType::IfcWall))
        ));
    }

    #[test]
    fn test_write_requires_identifier() {
        let (mut session, _) = open(TEST_IFC);
        let psv = session.create(&IfcType::IfcPropertySingleValue).unwrap();
        assert!(session.write(psv).is_err());
    }

    #[test]
    fn test_non_finite_real_fails_serialization() {
        let (mut session, _) = open(TEST_IFC);
        let mut psv = session.get(EntityId(20)).unwrap();
        psv.set(2, TypedValue::Real(f64::INFINITY).to_tagged());
        session.write(psv).unwrap();
        assert!(matches!(
            session.serialize(),
            Err(ParseError::Serialization { entity: EntityId(20), .. })
        ));
    }

    #[test]
    fn test_close_releases_counter() {
        let (session, counter) = open(TEST_IFC);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        session.close();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
