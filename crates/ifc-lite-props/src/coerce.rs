// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Type coercion from user input to typed values

use crate::error::CoercionError;
use ifc_lite_model::{PropertyType, RawValue, TypedValue};

/// Convert a raw scalar into a value of the declared type
///
/// Booleans never fail: anything other than `true`/`t` (any case) is false.
/// Integers and reals that do not parse are rejected instead of being
/// written as garbage.
pub fn coerce(property_type: PropertyType, raw: &RawValue) -> Result<TypedValue, CoercionError> {
    match property_type {
        PropertyType::Text => Ok(TypedValue::Text(raw.to_string())),
        PropertyType::Label => Ok(TypedValue::Label(raw.to_string())),
        PropertyType::Identifier => Ok(TypedValue::Identifier(raw.to_string())),
        PropertyType::Boolean => Ok(TypedValue::Boolean(coerce_bool(raw))),
        PropertyType::Integer => coerce_integer(raw).map(TypedValue::Integer),
        PropertyType::Real => coerce_real(raw).map(TypedValue::Real),
    }
}

fn coerce_bool(raw: &RawValue) -> bool {
    match raw {
        RawValue::Bool(b) => *b,
        other => parse_bool(&other.to_string()),
    }
}

/// `true` iff the lower-cased text is `true` or `t`
pub fn parse_bool(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower == "true" || lower == "t"
}

fn coerce_integer(raw: &RawValue) -> Result<i64, CoercionError> {
    let parsed = match raw {
        RawValue::Text(s) => s.trim().parse::<i64>().ok(),
        // i64::MAX rounds up to 2^63 as f64, hence the strict bound
        RawValue::Number(n)
            if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 =>
        {
            Some(*n as i64)
        }
        _ => None,
    };
    parsed.ok_or_else(|| invalid(PropertyType::Integer, raw))
}

fn coerce_real(raw: &RawValue) -> Result<f64, CoercionError> {
    let parsed = match raw {
        RawValue::Text(s) => lexical_core::parse::<f64>(s.trim().as_bytes()).ok(),
        RawValue::Number(n) => Some(*n),
        RawValue::Bool(_) => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| invalid(PropertyType::Real, raw))
}

fn invalid(expected: PropertyType, raw: &RawValue) -> CoercionError {
    CoercionError::InvalidValue {
        expected,
        value: raw.to_string(),
    }
}
