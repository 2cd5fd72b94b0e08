// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity writer - encodes decoded entities back to STEP records

use crate::text::encode_step_string;
use ifc_lite_model::{AttributeValue, DecodedEntity, ParseError, Result};
use std::fmt::Write;

/// Encode an entity as a complete record, e.g. `#26=IFCPROPERTYSINGLEVALUE('P',$,IFCREAL(1.0),$);`
pub fn write_entity(entity: &DecodedEntity) -> Result<String> {
    let mut out = String::with_capacity(32 + entity.attributes.len() * 8);
    let _ = write!(out, "#{}={}(", entity.id.0, entity.ifc_type.name());

    for (i, attr) in entity.attributes.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_value(&mut out, attr)
            .map_err(|message| ParseError::serialization(entity.id, message))?;
    }

    out.push_str(");");
    Ok(out)
}

/// Encode a single attribute value
pub fn write_value(out: &mut String, value: &AttributeValue) -> std::result::Result<(), String> {
    match value {
        AttributeValue::Null => out.push('$'),
        AttributeValue::Derived => out.push('*'),
        AttributeValue::EntityRef(id) => {
            let _ = write!(out, "#{}", id.0);
        }
        AttributeValue::Bool(b) => out.push_str(if *b { ".T." } else { ".F." }),
        AttributeValue::Integer(i) => {
            let _ = write!(out, "{}", i);
        }
        AttributeValue::Float(f) => out.push_str(&format_real(*f)?),
        AttributeValue::String(s) => out.push_str(&encode_step_string(s)),
        AttributeValue::Enum(e) => {
            let _ = write!(out, ".{}.", e);
        }
        AttributeValue::Binary(hex) => {
            let _ = write!(out, "\"{}\"", hex);
        }
        AttributeValue::List(items) => {
            out.push('(');
            write_list(out, items)?;
            out.push(')');
        }
        AttributeValue::TypedValue(tag, args) => {
            out.push_str(tag);
            out.push('(');
            write_list(out, args)?;
            out.push(')');
        }
    }
    Ok(())
}

fn write_list(out: &mut String, items: &[AttributeValue]) -> std::result::Result<(), String> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_value(out, item)?;
    }
    Ok(())
}

/// Format a real so that it always reads back as a real (`3000.0`, `1.5E-7`)
pub fn format_real(value: f64) -> std::result::Result<String, String> {
    if !value.is_finite() {
        return Err(format!("non-finite real {}", value));
    }

    let repr = format!("{:?}", value);
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let dot = if mantissa.contains('.') { "" } else { ".0" };
            Ok(format!("{}{}E{}", mantissa, dot, exponent))
        }
        None if repr.contains('.') => Ok(repr),
        None => Ok(format!("{}.0", repr)),
    }
}
