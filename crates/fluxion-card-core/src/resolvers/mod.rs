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

//! Per-field resolvers turning an entity snapshot and its config into display values.
//!
//! Resolvers never fail: problems are reported to the diagnostics sink and a
//! fallback value is returned.

mod charging;
mod color;
mod icon;
mod level;
mod name;
mod secondary;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use charging::get_charging_state;
pub use color::{DEFAULT_COLOR, get_color};
pub use icon::get_icon;
pub use level::get_battery_level;
pub use name::get_name;
pub use secondary::get_secondary_info;

/// Resolved battery level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryState {
    /// Text to show, possibly host-formatted or mapped
    pub state: String,
    /// Numeric level, when the state is numeric
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Secondary line under the battery name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SecondaryInfo {
    Text(String),
    /// Rendered as relative time ("5 minutes ago") by the host
    RelativeTime(DateTime<Utc>),
}
