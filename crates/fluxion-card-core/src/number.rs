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

//! Locale-tolerant number handling. Both `12.5` and `12,5` are numbers.

use serde_json::Value;

/// Parse a numeric string, accepting a single comma as decimal separator
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = trimmed.replacen(',', ".", 1);
    normalized
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

pub fn is_numeric_str(text: &str) -> bool {
    parse_number(text).is_some()
}

/// Numeric value of a JSON value; booleans, null and containers are never numeric
pub fn value_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(s) => parse_number(s),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn is_number(value: &Value) -> bool {
    value_as_number(value).is_some()
}

/// Numeric value of `value`, `NaN` when it is not numeric
pub fn to_number(value: &Value) -> f64 {
    value_as_number(value).unwrap_or(f64::NAN)
}

/// Shortest textual form of a number (`80` rather than `80.0`)
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // avoids "-0"
        return "0".to_owned();
    }
    format!("{value}")
}

/// Fixed number of decimal places, ties rounded away from zero
pub fn to_fixed(value: f64, decimals: u32) -> String {
    let factor = 10_f64.powi(decimals.min(15) as i32);
    let rounded = (value * factor).round() / factor;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.prec$}", prec = decimals as usize)
}
