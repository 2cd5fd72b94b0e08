// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Replay of edit logs onto original documents
//!
//! Export starts from the bytes the model was loaded from, not from the live
//! graph. Each logged request is classified against that document: an
//! identifier present in it is an update, anything else is a creation.

use crate::config::ExportOptions;
use crate::error::ExportError;
use crate::registry::DocumentRegistry;
use crate::verify::count_unwrapped_values;
use ifc_lite_model::{
    AttributeValue, DecodedEntity, DocumentEngine, DocumentSession, EditLog, EditLogSource,
    EditRequest, EntityId, IfcType, ModelId, ParseError,
};
use ifc_lite_parser::StepEngine;
use log::{debug, info, warn};

/// Result of exporting one model
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExportOutput {
    /// The serialized document
    pub bytes: Vec<u8>,
    /// Property values found without a type wrapper
    pub warnings: usize,
    /// Entities created from the log
    pub created: usize,
    /// Existing entities updated from the log
    pub updated: usize,
    /// Requests that could not be applied and were left out
    pub skipped: usize,
}

/// One entry of a batch export
#[derive(Debug)]
pub struct ModelExport {
    pub model_id: ModelId,
    /// Suggested name for the exported file
    pub file_name: String,
    pub result: Result<ExportOutput, ExportError>,
}

/// Replays edit logs onto original bytes through a document engine
#[derive(Clone, Debug, Default)]
pub struct ReplayExporter<E = StepEngine> {
    engine: E,
    options: ExportOptions,
}

impl ReplayExporter<StepEngine> {
    /// Exporter over the STEP engine with default options
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: DocumentEngine> ReplayExporter<E> {
    /// Exporter over a custom document engine
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine,
            options: ExportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Replay `log` onto `original_bytes` and serialize the result
    ///
    /// The session is closed on every path, including failures.
    pub fn export_modified(
        &self,
        model_id: &ModelId,
        original_bytes: &[u8],
        log: &EditLog,
    ) -> Result<ExportOutput, ExportError> {
        let mut session = self
            .engine
            .open_session(original_bytes)
            .map_err(|e| ExportError::SessionOpenFailed {
                model: model_id.clone(),
                reason: e.to_string(),
            })?;

        let result = self.replay(model_id, &mut session, log);
        session.close();
        result
    }

    /// Export every registered document that has an edit log
    ///
    /// Failures are reported per model and do not stop the batch.
    pub fn export_all(
        &self,
        registry: &DocumentRegistry,
        logs: &impl EditLogSource,
    ) -> Vec<ModelExport> {
        let mut exports = Vec::with_capacity(registry.len());

        for document in registry.iter() {
            let Some(log) = logs.edit_log(&document.model_id) else {
                warn!("No edit log for {}, not exported", document.model_id);
                continue;
            };

            let result = self.export_modified(&document.model_id, &document.original_bytes, &log);
            if let Err(e) = &result {
                warn!("Export of {} failed: {}", document.model_id, e);
            }

            exports.push(ModelExport {
                model_id: document.model_id.clone(),
                file_name: self.options.file_name(&document.name),
                result,
            });
        }

        exports
    }

    fn replay(
        &self,
        model_id: &ModelId,
        session: &mut E::Session,
        log: &EditLog,
    ) -> Result<ExportOutput, ExportError> {
        let watermark = session.max_identifier();
        let owner_history = session
            .entities_of_type(&IfcType::IfcOwnerHistory)
            .first()
            .copied();

        let mut output = ExportOutput::default();

        for request in log {
            let existing = if request.original_id <= watermark {
                session.get(request.original_id)
            } else {
                None
            };

            match existing {
                Some(entity) => match update_existing(session, entity, request) {
                    Ok(()) => {
                        debug!("{}: updated {}", model_id, request.original_id);
                        output.updated += 1;
                    }
                    Err(e) => {
                        warn!(
                            "{}: skipping update of {}: {}",
                            model_id, request.original_id, e
                        );
                        output.skipped += 1;
                    }
                },
                None if session.has_record(request.original_id) => {
                    warn!(
                        "{}: {} is in the document but cannot be read, not replaced",
                        model_id, request.original_id
                    );
                    output.skipped += 1;
                }
                None => match create_new(session, request, owner_history) {
                    Ok(()) => {
                        debug!(
                            "{}: created {} {}",
                            model_id, request.category, request.original_id
                        );
                        output.created += 1;
                    }
                    Err(ParseError::UnsupportedCategory(category)) => {
                        warn!(
                            "{}: cannot create {} {}, skipping",
                            model_id, category, request.original_id
                        );
                        output.skipped += 1;
                    }
                    Err(e) => {
                        return Err(ExportError::ReplayFailed {
                            model: model_id.clone(),
                            reason: e.to_string(),
                        })
                    }
                },
            }
        }

        output.bytes = session
            .serialize()
            .map_err(|e| ExportError::SerializationFailed {
                model: model_id.clone(),
                reason: e.to_string(),
            })?;

        if self.options.verify {
            output.warnings = count_unwrapped_values(&String::from_utf8_lossy(&output.bytes));
        }

        info!(
            "Exported {}: {} created, {} updated, {} skipped, {} warnings",
            model_id, output.created, output.updated, output.skipped, output.warnings
        );
        Ok(output)
    }
}

/// Apply a request to an entity already in the document
///
/// Identity and owner are never backfilled here.
fn update_existing<S: DocumentSession>(
    session: &mut S,
    mut entity: DecodedEntity,
    request: &EditRequest,
) -> Result<(), ParseError> {
    write_payload(&mut entity, request)?;
    session.write(entity)
}

/// Instantiate a requested entity at its logged identifier
fn create_new<S: DocumentSession>(
    session: &mut S,
    request: &EditRequest,
    owner_history: Option<EntityId>,
) -> Result<(), ParseError> {
    let mut entity = session.create(&request.category)?;
    entity.id = request.original_id;

    write_payload(&mut entity, request)?;

    if let Some(index) = unset_field(&entity, "GlobalId") {
        entity.attributes[index] = AttributeValue::String(session.new_global_id());
    }
    if let (Some(index), Some(owner)) = (unset_field(&entity, "OwnerHistory"), owner_history) {
        entity.attributes[index] = AttributeValue::EntityRef(owner);
    }

    // Optional fields left at `*` must read as "not applicable" for these categories
    if let Some(schema) = entity.ifc_type.schema().filter(|s| s.explicit_nulls) {
        for (spec, value) in schema.fields.iter().zip(entity.attributes.iter_mut()) {
            if spec.optional && value.is_derived() {
                *value = AttributeValue::Null;
            }
        }
    }

    session.write(entity)
}

fn unset_field(entity: &DecodedEntity, name: &str) -> Option<usize> {
    entity
        .field_index(name)
        .filter(|&index| entity.attributes[index].is_unset())
}

/// Write every payload field; names the category does not have are skipped
fn write_payload(entity: &mut DecodedEntity, request: &EditRequest) -> Result<(), ParseError> {
    for (name, value) in &request.payload {
        match entity.set_field(name, value) {
            Ok(()) => {}
            Err(ParseError::UnknownField { category, field }) => {
                warn!("{} has no field {}, ignored", category, field);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
