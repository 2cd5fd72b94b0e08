// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fast entity scanner using SIMD-accelerated byte searching
//!
//! Locates entity records in the DATA section without decoding them, so a
//! session can later copy untouched records verbatim.

use ifc_lite_model::{EntityId, IfcType, ParseError, Result};
use memchr::memchr;
use rustc_hash::FxHashMap;

/// Entity index mapping ID to byte offsets
pub type EntityIndex = FxHashMap<u32, (usize, usize)>;

const DATA_MARKER: &str = "DATA;";
const ENDSEC_MARKER: &str = "ENDSEC;";

/// Fast entity scanner for IFC files
///
/// Uses memchr for SIMD-accelerated scanning to quickly find entity
/// boundaries without full parsing.
pub struct EntityScanner<'a> {
    content: &'a str,
    pos: usize,
}

impl<'a> EntityScanner<'a> {
    /// Create a new scanner positioned after the `DATA;` marker
    pub fn new(content: &'a str) -> Self {
        let pos = Self::data_start(content).unwrap_or(0);
        Self { content, pos }
    }

    /// Byte offset just past the `DATA;` marker
    pub fn data_start(content: &str) -> Option<usize> {
        content.find(DATA_MARKER).map(|p| p + DATA_MARKER.len())
    }

    /// Scan to find the next entity
    ///
    /// Returns (id, type_name, start_byte, end_byte)
    pub fn next_entity(&mut self) -> Option<(u32, &'a str, usize, usize)> {
        let bytes = self.content.as_bytes();

        while self.pos < bytes.len() {
            let hash_pos = memchr(b'#', &bytes[self.pos..])?;
            self.pos += hash_pos;

            // Entity definitions start a line or follow a terminator;
            // anything else is a reference inside attributes
            let is_entity_start = self.pos == 0
                || matches!(bytes[self.pos - 1], b'\n' | b'\r' | b';' | b' ' | b'\t');

            if !is_entity_start {
                self.pos += 1;
                continue;
            }

            let start = self.pos;

            self.pos += 1; // Skip #
            let id_start = self.pos;

            while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }

            if self.pos == id_start {
                continue;
            }

            let Ok(id) = self.content[id_start..self.pos].parse::<u32>() else {
                continue;
            };

            while self.pos < bytes.len() && (bytes[self.pos] == b' ' || bytes[self.pos] == b'\t') {
                self.pos += 1;
            }

            if self.pos >= bytes.len() || bytes[self.pos] != b'=' {
                continue;
            }
            self.pos += 1; // Skip =

            while self.pos < bytes.len() && (bytes[self.pos] == b' ' || bytes[self.pos] == b'\t') {
                self.pos += 1;
            }

            let type_start = self.pos;
            while self.pos < bytes.len()
                && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'_')
            {
                self.pos += 1;
            }

            if self.pos == type_start {
                continue;
            }

            let type_name = &self.content[type_start..self.pos];
            let end = self.find_entity_end()?;

            return Some((id, type_name, start, end));
        }

        None
    }

    /// Find the end of an entity (semicolon), handling quoted strings
    fn find_entity_end(&mut self) -> Option<usize> {
        let bytes = self.content.as_bytes();
        let mut in_string = false;

        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\'' => {
                    if in_string && self.pos + 1 < bytes.len() && bytes[self.pos + 1] == b'\'' {
                        self.pos += 2;
                        continue;
                    }
                    in_string = !in_string;
                }
                b';' if !in_string => {
                    self.pos += 1;
                    return Some(self.pos);
                }
                _ => {}
            }
            self.pos += 1;
        }

        None
    }

    /// Current byte position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Build an index of all entities (ID -> byte offsets)
    pub fn build_index(content: &'a str) -> EntityIndex {
        let mut scanner = Self::new(content);
        let mut index = FxHashMap::default();

        while let Some((id, _, start, end)) = scanner.next_entity() {
            index.insert(id, (start, end));
        }

        index
    }
}

/// Layout of a document's DATA section
#[derive(Debug, Default)]
pub struct DataLayout {
    /// Entity ID -> (start, end) byte offsets
    pub index: EntityIndex,
    /// Entity IDs in document order
    pub order: Vec<u32>,
    /// Category -> entity IDs, in document order
    pub type_index: FxHashMap<IfcType, Vec<EntityId>>,
    /// Offset of the `ENDSEC;` closing the DATA section
    pub data_end: usize,
    /// Highest entity ID present
    pub max_id: u32,
}

/// Scan a whole document into a [`DataLayout`]
pub fn scan_layout(content: &str) -> Result<DataLayout> {
    let data_start = EntityScanner::data_start(content)
        .ok_or_else(|| ParseError::format("missing DATA section"))?;

    let mut layout = DataLayout::default();
    let mut scanner = EntityScanner::new(content);

    while let Some((id, type_name, start, end)) = scanner.next_entity() {
        if layout.index.insert(id, (start, end)).is_some() {
            return Err(ParseError::entity_parse(EntityId(id), "duplicate entity id"));
        }
        layout.order.push(id);
        layout
            .type_index
            .entry(IfcType::parse(type_name))
            .or_default()
            .push(EntityId(id));
        layout.max_id = layout.max_id.max(id);
    }

    let last_end = layout
        .order
        .last()
        .and_then(|id| layout.index.get(id))
        .map(|&(_, end)| end)
        .unwrap_or(data_start);

    layout.data_end = content[last_end..]
        .find(ENDSEC_MARKER)
        .map(|p| p + last_end)
        .ok_or_else(|| ParseError::format("DATA section is not terminated"))?;

    Ok(layout)
}

/// Parse the header section to extract metadata
pub fn parse_header(content: &str) -> HeaderInfo {
    let mut info = HeaderInfo::default();

    let header_start = content.find("HEADER;").unwrap_or(0);
    let header_end = content[header_start..]
        .find(ENDSEC_MARKER)
        .map(|p| p + header_start)
        .unwrap_or(content.len());
    let header = &content[header_start..header_end];

    if let Some(schema_start) = header.find("FILE_SCHEMA") {
        if let Some(paren_start) = header[schema_start..].find("((") {
            let start = schema_start + paren_start + 2;
            if let Some((schema, _)) = parse_header_string(&header[start..]) {
                info.schema_version = schema;
            }
        }
    }

    // FILE_NAME(name, timestamp, author, organization, preprocessor, originating_system, authorization)
    if let Some(name_start) = header.find("FILE_NAME") {
        if let Some(paren_start) = header[name_start..].find('(') {
            let start = name_start + paren_start + 1;
            if let Some((file_name, _)) = parse_header_string(&header[start..]) {
                if !file_name.is_empty() {
                    info.file_name = Some(file_name);
                }
            }
        }
    }

    info
}

/// Parse a string from header ('value')
fn parse_header_string(s: &str) -> Option<(String, &str)> {
    let s = s.trim_start();
    if let Some(rest) = s.strip_prefix('$') {
        return Some((String::new(), rest));
    }
    if !s.starts_with('\'') {
        return None;
    }

    let mut end = 1;
    let bytes = s.as_bytes();
    while end < bytes.len() {
        if bytes[end] == b'\'' {
            if end + 1 < bytes.len() && bytes[end + 1] == b'\'' {
                end += 2;
                continue;
            }
            break;
        }
        end += 1;
    }

    let value = crate::text::decode_step_string(&s[1..end.min(s.len())]);
    Some((value, s.get(end + 1..).unwrap_or("")))
}

/// Header information extracted from IFC file
#[derive(Clone, Debug, Default)]
pub struct HeaderInfo {
    pub schema_version: String,
    pub file_name: Option<String>,
}
