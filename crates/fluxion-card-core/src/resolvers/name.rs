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

use fluxion_card_types::{EntityConfig, EntitySnapshot, RenameRule};
use serde_json::{Map, Value};

use crate::context::ResolveContext;
use crate::pattern::parse_regex_literal;
use crate::template::KeywordProcessor;

/// Display name of the battery
///
/// A configured `name` is used as is (after keyword processing). Otherwise the
/// friendly name is taken from the host and passed through `bulk_rename`.
pub fn get_name(
    config: &EntityConfig,
    ctx: &ResolveContext<'_>,
    entity: Option<&EntitySnapshot>,
) -> String {
    if let Some(name) = &config.settings.name {
        let data = entity.map_or_else(|| Value::Object(Map::new()), EntitySnapshot::to_entity_data);
        return KeywordProcessor::new(&data, ctx).process(name);
    }

    if ctx.host.is_none() {
        return config.entity.clone();
    }

    let name = entity
        .and_then(EntitySnapshot::friendly_name)
        .unwrap_or(config.entity.as_str())
        .to_owned();

    config
        .settings
        .bulk_rename
        .iter()
        .fold(name, |name, rule| apply_rename(name, rule, ctx))
}

fn apply_rename(name: String, rule: &RenameRule, ctx: &ResolveContext<'_>) -> String {
    match parse_regex_literal(&rule.from) {
        Some(Ok(literal)) => literal.replace(&name, &rule.to),
        Some(Err(e)) => {
            ctx.diagnostics
                .error(&format!("[NAME] Invalid rename pattern '{}': {e}", rule.from));
            name
        }
        None => name.replacen(rule.from.as_str(), &rule.to, 1),
    }
}
