// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Lite Parser - STEP document engine
//!
//! This crate opens IFC (STEP) files as mutable sessions. It implements the
//! `DocumentEngine` and `DocumentSession` traits defined in `ifc-lite-model`.
//!
//! # Features
//!
//! - **Fast tokenization** using `nom` combinators
//! - **SIMD-accelerated scanning** using `memchr`
//! - **Lazy entity decoding** - only parse entities when needed
//! - **Verbatim round trips** - unwritten records are copied byte for byte
//! - **GlobalId generation** for newly created entities
//!
//! # Example
//!
//! ```ignore
//! use ifc_lite_parser::StepEngine;
//! use ifc_lite_model::{DocumentEngine, DocumentSession, IfcType};
//!
//! let engine = StepEngine::new();
//! let session = engine.open_session(&bytes)?;
//!
//! let psets = session.entities_of_type(&IfcType::IfcPropertySet);
//! println!("Found {} property sets", psets.len());
//! session.close();
//! ```

mod guid;
mod scanner;
mod session;
mod text;
mod tokenizer;
mod writer;

pub use guid::{compress as compress_global_id, is_global_id, new_global_id};
pub use scanner::{parse_header, scan_layout, DataLayout, EntityScanner, HeaderInfo};
pub use session::StepSession;
pub use text::{decode_step_string, encode_step_string};
pub use tokenizer::{parse_entity, Token};
pub use writer::{format_real, write_entity};

use ifc_lite_model::{DocumentEngine, ParseError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// STEP/IFC document engine implementing `DocumentEngine`
///
/// Cheap to clone; clones share the open-session counter.
#[derive(Clone, Debug, Default)]
pub struct StepEngine {
    open: Arc<AtomicUsize>,
}

impl StepEngine {
    /// Create a new engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions opened by this engine that are still alive
    pub fn open_sessions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

impl DocumentEngine for StepEngine {
    type Session = StepSession;

    fn open_session(&self, bytes: &[u8]) -> Result<StepSession> {
        let content = std::str::from_utf8(bytes)
            .map_err(|e| ParseError::format(format!("document is not UTF-8: {}", e)))?;
        StepSession::open(content.to_string(), Arc::clone(&self.open))
    }
}

/// Open a document with a fresh engine
pub fn open(bytes: &[u8]) -> Result<StepSession> {
    StepEngine::new().open_session(bytes)
}
