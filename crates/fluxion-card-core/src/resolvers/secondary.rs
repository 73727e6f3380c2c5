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

use super::SecondaryInfo;
use crate::context::ResolveContext;
use crate::dates::parse_date;
use crate::number::is_numeric_str;
use crate::template::{KeywordProcessor, strip_relative_time_marker};

/// Secondary info line, `None` when not configured
///
/// Results that look like a date become [`SecondaryInfo::RelativeTime`]; numbers never do.
pub fn get_secondary_info(
    config: &EntityConfig,
    ctx: &ResolveContext<'_>,
    entity_data: &Value,
) -> Option<SecondaryInfo> {
    let template = config.settings.secondary_info.as_ref()?;
    let processed = KeywordProcessor::new(entity_data, ctx).process(template);

    if is_numeric_str(&processed) {
        return Some(SecondaryInfo::Text(processed));
    }

    let candidate = strip_relative_time_marker(&processed).unwrap_or(&processed);
    Some(match parse_date(candidate) {
        Some(at) => SecondaryInfo::RelativeTime(at),
        None => SecondaryInfo::Text(processed),
    })
}
