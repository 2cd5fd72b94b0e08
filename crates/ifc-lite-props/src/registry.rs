// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry of loaded documents and their original bytes

use crate::config::ExportOptions;
use ifc_lite_model::ModelId;
use ifc_lite_parser::parse_header;
use std::sync::Arc;

/// The pristine bytes of a loaded file, kept next to its live model
#[derive(Clone, Debug)]
pub struct LoadedDocument {
    pub model_id: ModelId,
    /// Display name, usually the file name
    pub name: String,
    pub original_bytes: Arc<[u8]>,
}

impl LoadedDocument {
    pub fn new(model_id: ModelId, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            model_id,
            name: name.into(),
            original_bytes: bytes.into(),
        }
    }

    /// Take the name from the header's FILE_NAME, falling back to the model id
    pub fn from_bytes(model_id: ModelId, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes: Arc<[u8]> = bytes.into();
        let header = parse_header(&String::from_utf8_lossy(&bytes));
        let name = header
            .file_name
            .as_deref()
            .map(|path| path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(path))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| model_id.to_string());

        Self {
            model_id,
            name,
            original_bytes: bytes,
        }
    }

    /// `<name>_modified.ifc`
    pub fn modified_file_name(&self) -> String {
        ExportOptions::default().file_name(&self.name)
    }
}

/// Loaded documents, in load order
///
/// Owned by the application context and passed to whatever needs it.
#[derive(Clone, Debug, Default)]
pub struct DocumentRegistry {
    documents: Vec<LoadedDocument>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document, replacing one with the same model id in place
    pub fn insert(&mut self, document: LoadedDocument) -> Option<LoadedDocument> {
        if let Some(index) = self
            .documents
            .iter()
            .position(|d| d.model_id == document.model_id)
        {
            return Some(std::mem::replace(&mut self.documents[index], document));
        }
        self.documents.push(document);
        None
    }

    pub fn get(&self, model_id: &ModelId) -> Option<&LoadedDocument> {
        self.documents.iter().find(|d| &d.model_id == model_id)
    }

    pub fn remove(&mut self, model_id: &ModelId) -> Option<LoadedDocument> {
        let index = self.documents.iter().position(|d| &d.model_id == model_id)?;
        Some(self.documents.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedDocument> {
        self.documents.iter()
    }

    pub fn model_ids(&self) -> impl Iterator<Item = &ModelId> {
        self.documents.iter().map(|d| &d.model_id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::TEST_IFC;

    #[test]
    fn test_name_from_header() {
        let doc = LoadedDocument::from_bytes(ModelId::new("m1"), TEST_IFC.as_bytes());
        assert_eq!(doc.name, "office.ifc");
        assert_eq!(doc.modified_file_name(), "office_modified.ifc");
    }

    #[test]
    fn test_name_falls_back_to_model_id() {
        let bytes = TEST_IFC.replace("'C:\\\\Projects\\\\office.ifc'", "''");
        let doc = LoadedDocument::from_bytes(ModelId::new("m1"), bytes.as_bytes());
        assert_eq!(doc.name, "m1");
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut registry = DocumentRegistry::new();
        registry.insert(LoadedDocument::new("a".into(), "a.ifc", &b"1"[..]));
        registry.insert(LoadedDocument::new("b".into(), "b.ifc", &b"2"[..]));
        let previous = registry.insert(LoadedDocument::new("a".into(), "a2.ifc", &b"3"[..]));

        assert_eq!(previous.map(|d| d.name), Some("a.ifc".to_string()));
        let names: Vec<_> = registry.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a2.ifc", "b.ifc"]);

        assert!(registry.remove(&"a".into()).is_some());
        assert!(registry.get(&"a".into()).is_none());
        assert_eq!(registry.len(), 1);
    }
}
