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

//! Data model shared by the battery card pipeline: host entity snapshots and
//! the user-authored card configuration.

pub mod config;
pub mod errors;
pub mod snapshot;
pub mod validation;

pub use config::{
    CardConfig, ChargingAttribute, ChargingStateConfig, Collapse, ColorSettings, ColorStep,
    EntityConfig, EntitySettings, FilterSettings, FilterSpec, GroupConfig, RenameRule,
    SortOption, StateMapEntry, StringOrNumber,
};
pub use errors::{ConfigError, ConfigResult};
pub use snapshot::EntitySnapshot;
pub use validation::{ValidationIssue, ValidationResult, ValidationSeverity};
