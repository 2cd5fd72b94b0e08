// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Export configuration

use serde::{Deserialize, Serialize};

/// Options for [`crate::ReplayExporter`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Run the verification pass over the serialized output
    pub verify: bool,
    /// Appended to the document name of exported files
    pub file_suffix: String,
    /// Extension of exported files, without the dot
    pub file_extension: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            verify: true,
            file_suffix: "_modified".to_string(),
            file_extension: "ifc".to_string(),
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to run the verification pass
    pub fn with_verify(mut self, enabled: bool) -> Self {
        self.verify = enabled;
        self
    }

    /// Set the suffix appended to exported file names
    pub fn with_file_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.file_suffix = suffix.into();
        self
    }

    /// Set the extension of exported file names
    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    /// File name for the exported copy of `name`
    ///
    /// A trailing extension matching `file_extension` is replaced, not doubled.
    pub fn file_name(&self, name: &str) -> String {
        let stem = self.strip_extension(name);
        format!("{}{}.{}", stem, self.file_suffix, self.file_extension)
    }

    fn strip_extension<'a>(&self, name: &'a str) -> &'a str {
        match name.rsplit_once('.') {
            Some((stem, ext))
                if !stem.is_empty() && ext.eq_ignore_ascii_case(&self.file_extension) =>
            {
                stem
            }
            _ => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_name() {
        let options = ExportOptions::default();
        assert!(options.verify);
        assert_eq!(options.file_name("office"), "office_modified.ifc");
        assert_eq!(options.file_name("office.IFC"), "office_modified.ifc");
        assert_eq!(options.file_name("site.plan"), "site.plan_modified.ifc");
    }

    #[test]
    fn test_builder() {
        let options = ExportOptions::new()
            .with_verify(false)
            .with_file_suffix("-edited")
            .with_file_extension("step");
        assert!(!options.verify);
        assert_eq!(options.file_name("office.step"), "office-edited.step");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: ExportOptions = serde_json::from_str(r#"{"verify":false}"#).unwrap();
        assert!(!options.verify);
        assert_eq!(options.file_suffix, "_modified");
        assert_eq!(options.file_extension, "ifc");
    }
}
