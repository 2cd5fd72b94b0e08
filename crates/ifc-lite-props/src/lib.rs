// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Lite Props - Typed property overlay for IFC models
//!
//! Attach user-declared, typed properties to elements of a loaded model and
//! persist them by replaying the recorded edits onto the original file.
//!
//! # Features
//!
//! - **Property catalog** - named declarations with a semantic type
//! - **Type coercion** - raw user input to type-tagged values
//! - **Assignment** - new single-value properties linked into a named group
//! - **Replay export** - edits applied to the original bytes, untouched
//!   records copied verbatim, followed by a verification pass
//!
//! # Example
//!
//! ```ignore
//! use ifc_lite_props::{MemoryModels, PropertyAssigner, PropertyCatalog, ReplayExporter};
//! use ifc_lite_model::{EditLogSource, PropertyDefinition, PropertyType};
//!
//! let mut catalog = PropertyCatalog::new();
//! catalog.add(PropertyDefinition::new("Width", PropertyType::Real));
//!
//! let models = MemoryModels::new();
//! models.load("office", &bytes)?;
//!
//! let report = PropertyAssigner::new()
//!     .assign(&catalog, &models, "Width", &"3000".into(), "Pset_WallCommon", &selection)
//!     .await;
//! println!("{} elements updated", report.touched);
//!
//! let log = models.edit_log(&"office".into()).unwrap_or_default();
//! let output = ReplayExporter::new().export_modified(&"office".into(), &bytes, &log)?;
//! ```

mod assign;
mod catalog;
mod coerce;
mod config;
mod error;
mod export;
mod live;
mod registry;
mod verify;

pub use assign::{available_groups, AssignReport, PropertyAssigner, UpdateListener};
pub use catalog::PropertyCatalog;
pub use coerce::{coerce, parse_bool};
pub use config::ExportOptions;
pub use error::{CoercionError, ExportError};
pub use export::{ExportOutput, ModelExport, ReplayExporter};
pub use live::MemoryModels;
pub use registry::{DocumentRegistry, LoadedDocument};
pub use verify::count_unwrapped_values;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ifc_lite_model::{
        EditLogSource, EntityId, ModelId, PropertyDefinition, PropertyType, Selection, TypedValue,
    };

    pub(crate) const TEST_IFC: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [ReferenceView]'),'2;1');
FILE_NAME('C:\\Projects\\office.ifc','2024-05-01T10:00:00',('Architect'),('Studio'),'ifc-lite','ifc-lite','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPERSON($,'Doe','Jane',$,$,$,$,$);
#2=IFCORGANIZATION($,'Studio',$,$,$);
#3=IFCPERSONANDORGANIZATION(#1,#2,$);
#4=IFCAPPLICATION(#2,'1.0','ifc-lite','ifc-lite');
#5=IFCOWNERHISTORY(#3,#4,$,.ADDED.,$,$,$,1714557600);
#10=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOH',#5,'Wall A',$,$,$,$,$,$);
#11=IFCWALL('1kTvXnbbzCWw8lcMd1dR4o',#5,'Wall B',$,$,$,$,$,$);
#20=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.T.),$);
#21=IFCPROPERTYSET('3Fw8c2J4j0Bu6k8Fh2kHk1',#5,'Pset_WallCommon',$,(#20));
#22=IFCRELDEFINESBYPROPERTIES('0rP3oY5Kb3GRvA9qzN2Vb1',#5,$,$,(#10),#21);
#23=IFCELEMENTQUANTITY('2bK9qQ0hX0a8Gm4d3Y1sZ7',#5,'Qto_WallBaseQuantities',$,$,(#24));
#24=IFCQUANTITYLENGTH('Length',$,$,5000.,$);
#25=IFCRELDEFINESBYPROPERTIES('1sD4gW7nT9uP2eL6kR0mQ3',#5,$,$,(#10,#11),#23);
ENDSEC;
END-ISO-10303-21;
"#;

    /// Selection of `ids` within one model
    pub(crate) fn selection(model: &ModelId, ids: &[u32]) -> Selection {
        let mut selection = Selection::new();
        selection.insert(model.clone(), ids.iter().map(|&id| EntityId(id)).collect());
        selection
    }

    async fn assign_width(models: &MemoryModels, model: &ModelId, value: &str) {
        let mut catalog = PropertyCatalog::new();
        catalog.add(PropertyDefinition::new("P", PropertyType::Real));

        let report = PropertyAssigner::new()
            .assign(
                &catalog,
                models,
                "P",
                &value.into(),
                "Pset_WallCommon",
                &selection(model, &[10]),
            )
            .await;
        assert_eq!(report.touched, 1);
    }

    #[tokio::test]
    async fn test_assign_export_reload_round_trip() {
        let model = ModelId::new("office");
        let models = MemoryModels::new();
        models.load(model.clone(), TEST_IFC.as_bytes()).unwrap();

        assign_width(&models, &model, "3000").await;

        let log = models.edit_log(&model).unwrap();
        let exporter = ReplayExporter::new();
        let output = exporter
            .export_modified(&model, TEST_IFC.as_bytes(), &log)
            .unwrap();
        assert_eq!(output.warnings, 0);
        assert_eq!((output.created, output.updated, output.skipped), (1, 1, 0));
        assert_eq!(exporter.engine().open_sessions(), 0);

        let text = String::from_utf8(output.bytes.clone()).unwrap();
        assert!(text.contains("#26=IFCPROPERTYSINGLEVALUE('P',$,IFCREAL(3000.0),$);\nENDSEC;"));
        assert!(text.contains(
            "#21=IFCPROPERTYSET('3Fw8c2J4j0Bu6k8Fh2kHk1',#5,'Pset_WallCommon',$,(#20,#26));"
        ));

        let reloaded = MemoryModels::new();
        reloaded.load("exported", &output.bytes).unwrap();
        let psets = reloaded
            .property_sets(&ModelId::new("exported"), EntityId(10))
            .unwrap();
        assert_eq!(psets.len(), 1);
        assert_eq!(psets[0].name, "Pset_WallCommon");
        assert_eq!(
            psets[0].get("P").and_then(|p| p.value.clone()),
            Some(TypedValue::Real(3000.0))
        );
        assert_eq!(
            psets[0].get("IsExternal").and_then(|p| p.value.clone()),
            Some(TypedValue::Boolean(true))
        );
    }

    #[tokio::test]
    async fn test_non_contiguous_allocation_round_trip() {
        let model = ModelId::new("office");
        let models = MemoryModels::new().with_id_gap(1000);
        models.load(model.clone(), TEST_IFC.as_bytes()).unwrap();

        assign_width(&models, &model, "12.5").await;

        let log = models.edit_log(&model).unwrap();
        let output = ReplayExporter::new()
            .export_modified(&model, TEST_IFC.as_bytes(), &log)
            .unwrap();
        let text = String::from_utf8(output.bytes).unwrap();
        assert!(text.contains("#1026=IFCPROPERTYSINGLEVALUE('P',$,IFCREAL(12.5),$);"));
        assert!(text.contains("'Pset_WallCommon',$,(#20,#1026));"));
    }

    #[tokio::test]
    async fn test_trailing_records_survive_export() {
        let texture = "#30=IFCPIXELTEXTURE(.T.,.T.,$,$,$,2,1,1,(\"0FF\"));";
        let overflow = "#31=IFCQUANTITYCOUNT('N',$,$,99999999999999999999,$);";
        let original = TEST_IFC.replace(
            "ENDSEC;\nEND-ISO",
            &format!("{}\n{}\nENDSEC;\nEND-ISO", texture, overflow),
        );

        let model = ModelId::new("office");
        let models = MemoryModels::new();
        models.load(model.clone(), original.as_bytes()).unwrap();
        assign_width(&models, &model, "3000").await;

        let log = models.edit_log(&model).unwrap();
        let ids: Vec<_> = log.iter().map(|request| request.original_id).collect();
        assert_eq!(ids, vec![EntityId(32), EntityId(21)]);

        let output = ReplayExporter::new()
            .export_modified(&model, original.as_bytes(), &log)
            .unwrap();
        let text = String::from_utf8(output.bytes).unwrap();
        assert!(text.contains(&format!("\n{}\n{}\n", texture, overflow)));
        assert!(text.contains("#32=IFCPROPERTYSINGLEVALUE('P',$,IFCREAL(3000.0),$);"));
        assert!(text.contains("'Pset_WallCommon',$,(#20,#32));"));
        assert_eq!((output.created, output.updated, output.skipped), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_repeated_assignment_exports_duplicates() {
        let model = ModelId::new("office");
        let models = MemoryModels::new();
        models.load(model.clone(), TEST_IFC.as_bytes()).unwrap();

        assign_width(&models, &model, "1").await;
        assign_width(&models, &model, "2").await;

        let log = models.edit_log(&model).unwrap();
        let output = ReplayExporter::new()
            .export_modified(&model, TEST_IFC.as_bytes(), &log)
            .unwrap();

        let reloaded = MemoryModels::new();
        reloaded.load("exported", &output.bytes).unwrap();
        let psets = reloaded
            .property_sets(&ModelId::new("exported"), EntityId(10))
            .unwrap();
        assert_eq!(psets[0].all("P").len(), 2);
    }
}
