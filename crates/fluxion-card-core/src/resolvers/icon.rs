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

use fluxion_card_types::EntityConfig;
use serde_json::Value;

use crate::context::ResolveContext;
use crate::template::KeywordProcessor;
use crate::values::{get_value_from_path, value_as_text};

const ATTRIBUTE_PREFIX: &str = "attribute.";
const UNKNOWN_ICON: &str = "mdi:battery-unknown";

/// Icon of the battery
///
/// `entity_data` is the entity as JSON, used for keywords and `attribute.<name>` references.
pub fn get_icon(
    config: &EntityConfig,
    level: Option<f64>,
    is_charging: bool,
    ctx: &ResolveContext<'_>,
    entity_data: &Value,
) -> String {
    let charging_icon = config
        .settings
        .charging_state
        .as_ref()
        .and_then(|charging| charging.icon.as_ref())
        .filter(|_| is_charging);

    if let Some(icon) = charging_icon.or(config.settings.icon.as_ref()) {
        if let Some(attribute) = icon.strip_prefix(ATTRIBUTE_PREFIX) {
            let value = get_value_from_path(entity_data, "attributes")
                .and_then(|attributes| get_value_from_path(attributes, attribute))
                .and_then(value_as_text);
            return value.unwrap_or_else(|| {
                ctx.diagnostics.error(&format!(
                    "[ICON] Icon attribute '{attribute}' missing on '{}'",
                    config.entity
                ));
                icon.clone()
            });
        }
        return KeywordProcessor::new(entity_data, ctx).process(icon);
    }

    level_icon(level, is_charging)
}

/// Battery icon for a level rounded to the nearest ten
fn level_icon(level: Option<f64>, is_charging: bool) -> String {
    let Some(level) = level.filter(|l| (0.0..=100.0).contains(l)) else {
        return UNKNOWN_ICON.to_owned();
    };

    let rounded = ((level / 10.0).round() * 10.0) as u32;
    match (rounded, is_charging) {
        (100, false) => "mdi:battery".to_owned(),
        (100, true) => "mdi:battery-charging-100".to_owned(),
        (0, false) => "mdi:battery-outline".to_owned(),
        (0, true) => "mdi:battery-charging-outline".to_owned(),
        (n, false) => format!("mdi:battery-{n}"),
        (n, true) => format!("mdi:battery-charging-{n}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use fluxion_card_types::{ChargingStateConfig, EntitySettings};
    use serde_json::json;

    fn icon(config: &EntityConfig, level: Option<f64>, charging: bool) -> (String, MemorySink) {
        let sink = MemorySink::new();
        let ctx = ResolveContext::new(None, &sink);
        let data = json!({ "state": "42", "attributes": { "icon": "mdi:cellphone" } });
        (get_icon(config, level, charging, &ctx, &data), sink)
    }

    fn with_icon(icon: &str) -> EntityConfig {
        EntityConfig::new("sensor.x").with_settings(EntitySettings {
            icon: Some(icon.to_owned()),
            ..EntitySettings::default()
        })
    }

    #[test]
    fn test_level_icons() {
        let plain = EntityConfig::new("sensor.x");
        assert_eq!(icon(&plain, Some(80.0), false).0, "mdi:battery-80");
        assert_eq!(icon(&plain, Some(84.0), false).0, "mdi:battery-80");
        assert_eq!(icon(&plain, Some(85.0), false).0, "mdi:battery-90");
        assert_eq!(icon(&plain, Some(96.0), false).0, "mdi:battery");
        assert_eq!(icon(&plain, Some(4.0), false).0, "mdi:battery-outline");
        assert_eq!(icon(&plain, Some(33.0), true).0, "mdi:battery-charging-30");
        assert_eq!(icon(&plain, Some(100.0), true).0, "mdi:battery-charging-100");
        assert_eq!(icon(&plain, Some(1.0), true).0, "mdi:battery-charging-outline");
    }

    #[test]
    fn test_invalid_level_icon() {
        let plain = EntityConfig::new("sensor.x");
        assert_eq!(icon(&plain, None, false).0, UNKNOWN_ICON);
        assert_eq!(icon(&plain, Some(-1.0), false).0, UNKNOWN_ICON);
        assert_eq!(icon(&plain, Some(101.0), true).0, UNKNOWN_ICON);
        assert_eq!(icon(&plain, Some(f64::NAN), false).0, UNKNOWN_ICON);
    }

    #[test]
    fn test_configured_icon() {
        assert_eq!(icon(&with_icon("mdi:car"), Some(50.0), false).0, "mdi:car");
        assert_eq!(
            icon(&with_icon("mdi:numeric-{state}"), Some(50.0), false).0,
            "mdi:numeric-42"
        );
    }

    #[test]
    fn test_attribute_icon() {
        assert_eq!(icon(&with_icon("attribute.icon"), None, false).0, "mdi:cellphone");

        let (missing, sink) = icon(&with_icon("attribute.nope"), None, false);
        assert_eq!(missing, "attribute.nope");
        assert!(sink.contains("'nope'"));
    }

    #[test]
    fn test_charging_icon_only_while_charging() {
        let config = EntityConfig::new("sensor.x").with_settings(EntitySettings {
            icon: Some("mdi:car".to_owned()),
            charging_state: Some(ChargingStateConfig {
                icon: Some("mdi:car-electric".to_owned()),
                ..ChargingStateConfig::default()
            }),
            ..EntitySettings::default()
        });
        assert_eq!(icon(&config, Some(50.0), true).0, "mdi:car-electric");
        assert_eq!(icon(&config, Some(50.0), false).0, "mdi:car");
    }
}
