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

use fluxion_card_types::{ChargingStateConfig, EntityConfig};
use serde_json::Value;

use crate::context::ResolveContext;
use crate::host::HostContext;
use crate::values::{get_attribute, loose_equals};

const LEVEL_SUFFIX: &str = "battery_level";
const STATE_SUFFIX: &str = "battery_state";
const CHARGING_STATES: [&str; 2] = ["charging", "full"];

/// Whether the entity is currently charging
///
/// `current_state` is the entity's raw state. Without a host this is always false.
pub fn get_charging_state(config: &EntityConfig, current_state: &str, ctx: &ResolveContext<'_>) -> bool {
    let Some(host) = ctx.host else {
        return false;
    };

    match &config.settings.charging_state {
        Some(charging) => configured_charging_state(config, charging, current_state, host, ctx),
        None => sibling_state_charging(&config.entity, host),
    }
}

/// `sensor.phone_battery_level` is charging when `sensor.phone_battery_state` says so
fn sibling_state_charging(entity_id: &str, host: &dyn HostContext) -> bool {
    let Some(prefix) = entity_id.strip_suffix(LEVEL_SUFFIX) else {
        return false;
    };
    host.state(&format!("{prefix}{STATE_SUFFIX}"))
        .is_some_and(|sibling| CHARGING_STATES.contains(&sibling.state.as_str()))
}

fn configured_charging_state(
    config: &EntityConfig,
    charging: &ChargingStateConfig,
    current_state: &str,
    host: &dyn HostContext,
    ctx: &ResolveContext<'_>,
) -> bool {
    let (entity, state) = match &charging.entity_id {
        Some(entity_id) => match host.state(entity_id) {
            Some(other) => (Some(other), other.state.as_str()),
            None => {
                ctx.diagnostics.warn(&format!(
                    "[CHARGING] Entity '{entity_id}' used to get charging state of '{}' not found",
                    config.entity
                ));
                return false;
            }
        },
        None => (host.state(&config.entity), current_state),
    };

    if !charging.attribute.is_empty() {
        let found = entity.and_then(|entity| {
            charging.attribute.iter().find_map(|attribute| {
                get_attribute(&entity.attributes, &attribute.name)
                    .filter(|value| !value.is_null())
                    .map(|value| (attribute, value))
            })
        });

        return match found {
            Some((attribute, value)) => attribute
                .value
                .as_ref()
                .is_none_or(|expected| loose_equals(value, expected)),
            None => {
                ctx.diagnostics.debug(&format!(
                    "[CHARGING] None of the charging attributes found on '{}'",
                    config.entity
                ));
                false
            }
        };
    }

    if charging.state.is_empty() {
        return !state.is_empty();
    }

    let state = Value::from(state);
    charging.state.iter().any(|expected| loose_equals(&state, expected))
}
