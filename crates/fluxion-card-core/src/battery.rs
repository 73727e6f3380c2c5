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
use fluxion_i18n::KEY_CHARGING;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::context::ResolveContext;
use crate::resolvers::{
    SecondaryInfo, get_battery_level, get_charging_state, get_color, get_icon, get_name,
    get_secondary_info,
};

const CHARGING_FALLBACK: &str = "Charging";

/// Display-ready state of one tracked battery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedBattery {
    pub entity_id: String,
    pub name: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub icon: String,
    pub color: String,
    pub is_charging: bool,
    /// Hidden by a state-based exclude filter in the last update
    pub is_hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_info: Option<SecondaryInfo>,
    /// Entity JSON plus `display` and `charging`, used by filters and sort paths
    #[serde(skip)]
    pub entity_data: Value,
}

impl ResolvedBattery {
    pub fn resolve(config: &EntityConfig, ctx: &ResolveContext<'_>) -> Self {
        let mut battery = Self {
            entity_id: config.entity.clone(),
            name: String::new(),
            state: String::new(),
            level: None,
            unit: None,
            icon: String::new(),
            color: String::new(),
            is_charging: false,
            is_hidden: false,
            secondary_info: None,
            entity_data: Value::Null,
        };
        battery.update(config, ctx);
        battery
    }

    /// Re-resolve every field from the current host state; `is_hidden` is left alone
    pub fn update(&mut self, config: &EntityConfig, ctx: &ResolveContext<'_>) {
        let entity = ctx.host.and_then(|host| host.state(&config.entity));

        let level = get_battery_level(config, ctx, entity);
        let raw_state = entity.map_or("", |e| e.state.as_str());
        let is_charging = get_charging_state(config, raw_state, ctx);
        let name = get_name(config, ctx, entity);

        let mut data = entity.map_or_else(
            || json!({ "entity_id": config.entity }),
            EntitySnapshot::to_entity_data,
        );

        let icon = get_icon(config, level.level, is_charging, ctx, &data);
        let color = get_color(config, level.level, is_charging, ctx.diagnostics);

        let charging_text = if is_charging {
            config
                .settings
                .charging_state
                .as_ref()
                .and_then(|charging| charging.secondary_info_text.clone())
                .unwrap_or_else(|| ctx.localize_or(KEY_CHARGING, CHARGING_FALLBACK))
        } else {
            String::new()
        };

        if let Value::Object(map) = &mut data {
            let mut display = Map::new();
            display.insert("name".to_owned(), Value::from(name.as_str()));
            display.insert("state".to_owned(), Value::from(level.state.as_str()));
            if let Some(unit) = &level.unit {
                display.insert("unit".to_owned(), Value::from(unit.as_str()));
            }
            display.insert("icon".to_owned(), Value::from(icon.as_str()));
            display.insert("color".to_owned(), Value::from(color.as_str()));
            map.insert("display".to_owned(), Value::Object(display));
            map.insert("charging".to_owned(), Value::from(charging_text));
        }

        self.secondary_info = get_secondary_info(config, ctx, &data);
        self.name = name;
        self.state = level.state;
        self.level = level.level;
        self.unit = level.unit;
        self.icon = icon;
        self.color = color;
        self.is_charging = is_charging;
        self.entity_data = data;
    }
}
