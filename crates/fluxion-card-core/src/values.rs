// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Dotted-path lookup and loose comparison over JSON entity data.

use serde_json::{Map, Value};

use crate::number::{format_number, value_as_number};

/// Walk `path` (e.g. `device.manufacturer.name`) into `data`
///
/// Missing intermediate levels yield `None`. Array elements are addressed by index.
/// An empty path returns `data` itself.
pub fn get_value_from_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(data);
    }

    path.split('.').try_fold(data, |current, chunk| match current {
        Value::Object(map) => map.get(chunk),
        Value::Array(items) => chunk.parse::<usize>().ok().and_then(|idx| items.get(idx)),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => None,
    })
}

/// Same as [`get_value_from_path`] starting from an attribute map
pub fn get_attribute<'a>(attributes: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let (head, rest) = path.split_once('.').unwrap_or((path, ""));
    let value = attributes.get(head)?;
    get_value_from_path(value, rest)
}

/// Text form of a value; objects and arrays become compact JSON
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map_or_else(|| n.to_string(), format_number)
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_owned(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Text form of a defined value; `null` counts as undefined
pub fn value_as_text(value: &Value) -> Option<String> {
    (!value.is_null()).then(|| value_to_string(value))
}

/// Equality used for config-supplied expected values: numeric when both sides are numbers
pub fn loose_equals(actual: &Value, expected: &Value) -> bool {
    match (value_as_number(actual), value_as_number(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => value_to_string(actual) == value_to_string(expected),
    }
}
