// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property assignment onto live elements

use crate::catalog::PropertyCatalog;
use crate::coerce::coerce;
use ifc_lite_model::{
    EntityId, FieldValue, IfcType, ItemQuery, LiveModelApi, ModelId, NewItem,
    PropertyDefinition, RawValue, Selection, TypedValue, HAS_PROPERTIES,
};
use log::{debug, info, warn};
use std::collections::BTreeSet;

/// Outcome of one [`PropertyAssigner::assign`] call
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssignReport {
    /// Elements that received the property
    pub touched: usize,
    /// Elements without the requested property group
    pub skipped: usize,
    /// Elements skipped because the value does not fit the declared type
    pub invalid: usize,
    /// Elements where the live model failed to create or link the value
    pub failed: usize,
    /// Selected models that are not loaded
    pub missing_models: usize,
}

/// Callback fired once per assignment, after all models were processed
pub type UpdateListener = Box<dyn Fn(&AssignReport) + Send + Sync>;

/// What to assign, resolved against the catalog
struct Assignment<'a> {
    definition: &'a PropertyDefinition,
    value: &'a RawValue,
    group_name: &'a str,
}

/// Attaches catalog properties to selected elements
///
/// Each assignment creates a new single-value property and links it into the
/// named property group of every selected element that has one.
#[derive(Default)]
pub struct PropertyAssigner {
    listener: Option<UpdateListener>,
}

impl PropertyAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the "properties updated" callback
    pub fn with_listener(
        mut self,
        listener: impl Fn(&AssignReport) + Send + Sync + 'static,
    ) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Assign `name = value` under `group_name` to every selected element
    ///
    /// Unknown property names are ignored. Per-element problems are counted in
    /// the report and never stop the remaining elements or models.
    pub async fn assign<A: LiveModelApi>(
        &self,
        catalog: &PropertyCatalog,
        api: &A,
        name: &str,
        value: &RawValue,
        group_name: &str,
        selection: &Selection,
    ) -> AssignReport {
        let mut report = AssignReport::default();

        let Some(definition) = catalog.find(name) else {
            debug!("Property {} is not declared, nothing to assign", name);
            return report;
        };

        let assignment = Assignment {
            definition,
            value,
            group_name,
        };

        for (model, elements) in selection {
            if !api.has_model(model).await {
                warn!("Model {} is not loaded, skipping {} elements", model, elements.len());
                report.missing_models += 1;
                continue;
            }

            for &element in elements {
                assign_element(api, model, element, &assignment, &mut report).await;
            }

            if let Err(e) = api.apply_changes(model).await {
                warn!("Failed to commit changes on {}: {}", model, e);
            }
        }

        info!(
            "Assigned {} to {} elements ({} skipped, {} invalid, {} failed)",
            name, report.touched, report.skipped, report.invalid, report.failed
        );

        if let Some(listener) = &self.listener {
            listener(&report);
        }
        report
    }
}

async fn assign_element<A: LiveModelApi>(
    api: &A,
    model: &ModelId,
    element: EntityId,
    assignment: &Assignment<'_>,
    report: &mut AssignReport,
) {
    let items = match api
        .get_items_data(model, &[element], &ItemQuery::defined_by())
        .await
    {
        Ok(items) => items,
        Err(e) => {
            debug!("Cannot read {} in {}: {}", element, model, e);
            report.skipped += 1;
            return;
        }
    };

    let Some(group) = items.first().and_then(|item| {
        item.property_groups()
            .find(|group| group.name() == Some(assignment.group_name))
    }) else {
        debug!("{} has no group {}", element, assignment.group_name);
        report.skipped += 1;
        return;
    };
    let group_id = group.id;

    let definition = assignment.definition;
    let typed = match coerce(definition.property_type, assignment.value) {
        Ok(typed) => typed,
        Err(e) => {
            warn!("Skipping {}: {}", element, e);
            report.invalid += 1;
            return;
        }
    };

    let item = NewItem::new(IfcType::IfcPropertySingleValue)
        .with_field("Name", FieldValue::Scalar(TypedValue::Text(definition.name.clone())))
        .with_field("NominalValue", FieldValue::Scalar(typed));

    if let Err(e) = api.create_item(model, item).await {
        warn!("Cannot create {} for {}: {}", definition.name, element, e);
        report.failed += 1;
        return;
    }

    let created = match api.apply_changes(model).await {
        Ok(created) => created,
        Err(e) => {
            warn!("Cannot commit {} for {}: {}", definition.name, element, e);
            report.failed += 1;
            return;
        }
    };
    let Some(&property) = created.first() else {
        warn!("No identifier allocated for {} on {}", definition.name, element);
        report.failed += 1;
        return;
    };

    if let Err(e) = api.relate(model, group_id, HAS_PROPERTIES, &[property]).await {
        warn!("Cannot link {} into {}: {}", property, group_id, e);
        report.failed += 1;
        return;
    }

    debug!("{} {} -> {} in group {}", model, element, property, group_id);
    report.touched += 1;
}

/// Names of the property groups attached to any selected element
pub async fn available_groups<A: LiveModelApi>(
    api: &A,
    selection: &Selection,
) -> BTreeSet<String> {
    let mut names = BTreeSet::new();

    for (model, elements) in selection {
        if !api.has_model(model).await {
            continue;
        }
        for &element in elements {
            let Ok(items) = api
                .get_items_data(model, &[element], &ItemQuery::defined_by())
                .await
            else {
                continue;
            };
            names.extend(
                items
                    .iter()
                    .flat_map(|item| item.property_groups())
                    .filter_map(|group| group.name())
                    .map(str::to_string),
            );
        }
    }

    names
}
