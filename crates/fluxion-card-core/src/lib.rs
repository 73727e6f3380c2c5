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

//! Entity resolution and formatting pipeline of the battery card.
//!
//! Host pushes a state snapshot, [`BatteryProvider`] filters the entity universe,
//! the resolvers derive display fields per battery, then the sorter and grouper
//! produce the [`RenderModel`] handed back for presentation.

pub mod battery;
pub mod context;
pub mod dates;
pub mod diagnostics;
pub mod errors;
pub mod filter;
pub mod grouping;
pub mod host;
pub mod number;
pub mod pattern;
pub mod provider;
pub mod resolvers;
pub mod sorting;
pub mod template;
pub mod values;

pub use battery::ResolvedBattery;
pub use context::ResolveContext;
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, Severity, TracingSink};
pub use errors::{CardError, CardResult};
pub use filter::{Filter, FilterNode, FilterOperator};
pub use grouping::{BatteryGroup, RenderModel, get_battery_groups};
pub use host::{GroupMembership, HostContext, StateTable};
pub use number::{format_number, is_number, is_numeric_str, parse_number, to_fixed, to_number};
pub use provider::BatteryProvider;
pub use resolvers::{
    BatteryState, SecondaryInfo, get_battery_level, get_charging_state, get_color, get_icon,
    get_name, get_secondary_info,
};
pub use sorting::get_ids_of_sorted_batteries;
pub use template::{KeywordProcessor, PipelineFunction};

pub use fluxion_card_types as types;
