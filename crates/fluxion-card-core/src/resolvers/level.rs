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

use fluxion_card_types::{EntityConfig, EntitySnapshot};
use fluxion_i18n::KEY_STATE_UNKNOWN;
use serde_json::{Map, Value};

use super::BatteryState;
use crate::context::ResolveContext;
use crate::number::{format_number, is_numeric_str, parse_number, to_fixed};
use crate::template::KeywordProcessor;
use crate::values::{get_attribute, value_as_text};

const UNKNOWN_FALLBACK: &str = "Unknown";

/// Battery level of an entity
///
/// Precedence: `value_override`, configured `attribute`, then the first numeric of
/// `battery_level` attribute, `battery` attribute and entity state.
pub fn get_battery_level(
    config: &EntityConfig,
    ctx: &ResolveContext<'_>,
    entity: Option<&EntitySnapshot>,
) -> BatteryState {
    let settings = &config.settings;

    if let Some(template) = &settings.value_override {
        let data = entity.map_or_else(|| Value::Object(Map::new()), EntitySnapshot::to_entity_data);
        let state = KeywordProcessor::new(&data, ctx).process(template);
        let level = parse_number(&state);
        return BatteryState {
            unit: level.and(settings.unit.clone()),
            level,
            state,
        };
    }

    let Some(entity) = entity else {
        return unknown(ctx);
    };

    let raw_state = if let Some(attribute) = &settings.attribute {
        match get_attribute(&entity.attributes, attribute).and_then(value_as_text) {
            Some(value) => value,
            None => {
                ctx.diagnostics.warn(&format!(
                    "[LEVEL] Attribute '{attribute}' doesn't exist on '{}'",
                    entity.entity_id
                ));
                return unknown(ctx);
            }
        }
    } else {
        let mut candidates = Vec::with_capacity(3);
        if settings.non_battery_entity != Some(true) {
            candidates.extend(["battery_level", "battery"].iter().filter_map(|name| {
                entity.attributes.get(*name).and_then(value_as_text)
            }));
        }
        if !entity.state.is_empty() {
            candidates.push(entity.state.clone());
        }

        let first_numeric = candidates.iter().position(|c| is_numeric_str(c));
        match first_numeric.or((!candidates.is_empty()).then_some(0)) {
            Some(idx) => candidates.swap_remove(idx),
            None => return unknown(ctx),
        }
    };

    let mut state = raw_state;
    let mut display = None;

    if !settings.state_map.is_empty() {
        match settings.state_map.iter().find(|entry| entry.from == state) {
            Some(entry) => {
                state = entry.to.clone();
                display = entry.display.clone();
            }
            None if !is_numeric_str(&state) => {
                ctx.diagnostics.warn(&format!(
                    "[LEVEL] Missing option for '{state}' in 'state_map' of '{}'",
                    entity.entity_id
                ));
            }
            None => {}
        }
    }

    if !is_numeric_str(&state)
        && let Some(percent) = extract_percent(&state)
    {
        state = percent;
    }

    if let Some(mut value) = parse_number(&state) {
        if let Some(multiplier) = settings.multiplier {
            value *= multiplier;
        }
        state = match settings.round {
            Some(decimals) => to_fixed(value, decimals),
            None => format_number(value),
        };
    } else {
        state = capitalize_first(&state);
    }

    // host formatting renders the entity's own state, so it only applies when that is what's shown
    let mut host_unit = None;
    if settings.default_state_formatting != Some(false)
        && display.is_none()
        && state == entity.state
        && let Some(formatted) = ctx.host.and_then(|host| host.format_entity_state(entity))
    {
        match split_formatted_state(&formatted) {
            Some((value, unit)) => {
                display = Some(value);
                host_unit = unit;
            }
            None => display = Some(formatted),
        }
    }

    let level = parse_number(&state);
    let shown = display.unwrap_or(state);
    let unit = if is_numeric_str(&shown) {
        settings
            .unit
            .clone()
            .or(host_unit)
            .or_else(|| entity.unit_of_measurement().map(str::to_owned))
            .or_else(|| Some("%".to_owned()))
    } else {
        None
    };

    BatteryState {
        state: shown,
        level,
        unit,
    }
}

fn unknown(ctx: &ResolveContext<'_>) -> BatteryState {
    BatteryState {
        state: ctx.localize_or(KEY_STATE_UNKNOWN, UNKNOWN_FALLBACK),
        level: None,
        unit: None,
    }
}

/// Leading integer 0-100 directly followed by `%`, e.g. `"34% remaining"`
fn extract_percent(text: &str) -> Option<String> {
    let trimmed = text.trim_start();
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if !(1..=3).contains(&digits) || !trimmed[digits..].starts_with('%') {
        return None;
    }
    let number = &trimmed[..digits];
    number
        .parse::<u32>()
        .ok()
        .filter(|n| *n <= 100)
        .map(|n| n.to_string())
}

/// Split host-formatted `"21,5 %"` or `"80%"` into number and unit
fn split_formatted_state(formatted: &str) -> Option<(String, Option<String>)> {
    let formatted = formatted.trim();
    if is_numeric_str(formatted) {
        return Some((formatted.to_owned(), None));
    }
    if let Some((value, unit)) = formatted.split_once(' ')
        && is_numeric_str(value)
    {
        let unit = unit.trim();
        return Some((value.to_owned(), (!unit.is_empty()).then(|| unit.to_owned())));
    }
    if let Some(value) = formatted.strip_suffix('%')
        && is_numeric_str(value)
    {
        return Some((value.to_owned(), Some("%".to_owned())));
    }
    None
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
