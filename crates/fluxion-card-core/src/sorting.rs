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

use fluxion_card_types::SortOption;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::battery::ResolvedBattery;
use crate::context::ResolveContext;
use crate::number::{format_number, parse_number, value_as_number};
use crate::template::KeywordProcessor;
use crate::values::{get_value_from_path, value_to_string};

/// How a sort key reads its value from a battery
#[derive(Debug, Clone, PartialEq, Eq)]
enum SortKey {
    Name,
    State,
    Template(String),
    Path(String),
    Unknown,
}

impl SortKey {
    fn parse(by: &str) -> Self {
        match by {
            "name" => Self::Name,
            "state" => Self::State,
            _ if by.contains('{') => Self::Template(by.to_owned()),
            _ if by.contains('.') => {
                Self::Path(by.strip_prefix("entity.").unwrap_or(by).to_owned())
            }
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Missing,
    Name(String),
    Number(f64),
    Text(String),
}

impl SortValue {
    fn text(text: String) -> Self {
        match parse_number(&text) {
            Some(n) => Self::Number(n),
            None => Self::Text(text),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Missing, Self::Missing) => Ordering::Equal,
            (Self::Missing, _) => Ordering::Less,
            (_, Self::Missing) => Ordering::Greater,
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Name(a), Self::Name(b)) => compare_names(a, b),
            (a, b) => a.as_text().cmp(&b.as_text()),
        }
    }

    fn as_text(&self) -> String {
        match self {
            Self::Missing => String::new(),
            Self::Number(n) => format_number(*n),
            Self::Name(s) | Self::Text(s) => s.clone(),
        }
    }
}

/// Case-insensitive first; on ties lowercase sorts before uppercase
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Battery ids ordered by the configured sort keys
///
/// The sort is stable, so ids comparing equal on every key keep their input order.
pub fn get_ids_of_sorted_batteries(
    ids: &[String],
    batteries: &HashMap<String, ResolvedBattery>,
    options: &[SortOption],
    ctx: &ResolveContext<'_>,
) -> Vec<String> {
    if options.is_empty() {
        return ids.to_vec();
    }

    let keys: Vec<(SortKey, bool)> = options
        .iter()
        .map(|option| (SortKey::parse(&option.by), option.desc))
        .collect();

    let mut reported = HashSet::new();
    for ((key, _), option) in keys.iter().zip(options) {
        if *key == SortKey::Unknown && reported.insert(option.by.as_str()) {
            ctx.diagnostics
                .warn(&format!("[SORT] Unknown sort field '{}'", option.by));
        }
    }

    let mut rows: Vec<(&String, Vec<SortValue>)> = ids
        .iter()
        .map(|id| {
            let battery = batteries.get(id);
            let values = keys
                .iter()
                .map(|(key, _)| sort_value(key, battery, ctx))
                .collect();
            (id, values)
        })
        .collect();

    rows.sort_by(|(_, a), (_, b)| {
        keys.iter()
            .zip(a.iter().zip(b))
            .map(|((_, desc), (a, b))| {
                let ordering = a.compare(b);
                if *desc { ordering.reverse() } else { ordering }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    rows.into_iter().map(|(id, _)| id.clone()).collect()
}

fn sort_value(key: &SortKey, battery: Option<&ResolvedBattery>, ctx: &ResolveContext<'_>) -> SortValue {
    let Some(battery) = battery else {
        return SortValue::Missing;
    };

    match key {
        SortKey::Name => SortValue::Name(battery.name.clone()),
        // non-numeric states sort before every numeric level
        SortKey::State => SortValue::Number(battery.level.unwrap_or(-1.0)),
        SortKey::Template(template) => {
            SortValue::text(KeywordProcessor::new(&battery.entity_data, ctx).process(template))
        }
        SortKey::Path(path) => match get_value_from_path(&battery.entity_data, path) {
            None => SortValue::Missing,
            Some(value) => value_as_number(value)
                .map_or_else(|| SortValue::Text(value_to_string(value)), SortValue::Number),
        },
        SortKey::Unknown => SortValue::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::host::StateTable;
    use fluxion_card_types::{EntityConfig, EntitySnapshot};

    fn batteries(states: &[(&str, &str)]) -> (Vec<String>, HashMap<String, ResolvedBattery>) {
        let table = StateTable::from_states(
            states
                .iter()
                .map(|(id, state)| EntitySnapshot::new(*id, *state).with_attribute("room", id.to_uppercase())),
        );
        let sink = MemorySink::new();
        let ctx = ResolveContext::new(Some(&table), &sink);

        let ids = states.iter().map(|(id, _)| (*id).to_owned()).collect::<Vec<_>>();
        let map = ids
            .iter()
            .map(|id| (id.clone(), ResolvedBattery::resolve(&EntityConfig::new(id.as_str()), &ctx)))
            .collect();
        (ids, map)
    }

    fn sorted(ids: &[String], map: &HashMap<String, ResolvedBattery>, options: &[SortOption]) -> Vec<String> {
        let sink = MemorySink::new();
        let ctx = ResolveContext::new(None, &sink);
        get_ids_of_sorted_batteries(ids, map, options, &ctx)
    }

    #[test]
    fn test_state_desc_then_name() {
        let (ids, map) = batteries(&[("m", "10"), ("g", "20"), ("b", "30"), ("a", "30"), ("z", "80")]);
        let result = sorted(&ids, &map, &[SortOption::desc("state"), SortOption::asc("name")]);
        assert_eq!(result, vec!["z", "a", "b", "g", "m"]);
    }

    #[test]
    fn test_non_numeric_state_sorts_first() {
        let (ids, map) = batteries(&[("a", "50"), ("b", "unavailable"), ("c", "5")]);
        let result = sorted(&ids, &map, &[SortOption::asc("state")]);
        assert_eq!(result, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_name_ordering() {
        let (ids, mut map) = batteries(&[("one", "1"), ("two", "1"), ("three", "1")]);
        for (id, name) in [("one", "beta"), ("two", "Alpha"), ("three", "alpha")] {
            if let Some(battery) = map.get_mut(id) {
                battery.name = name.to_owned();
            }
        }
        let result = sorted(&ids, &map, &[SortOption::asc("name")]);
        assert_eq!(result, vec!["three", "two", "one"]);
    }

    #[test]
    fn test_path_and_template_keys() {
        let (ids, map) = batteries(&[("b", "1"), ("c", "2"), ("a", "3")]);
        let by_path = sorted(&ids, &map, &[SortOption::asc("entity.attributes.room")]);
        assert_eq!(by_path, vec!["a", "b", "c"]);

        let by_template = sorted(&ids, &map, &[SortOption::desc("{state}")]);
        assert_eq!(by_template, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_unknown_key_is_reported_once_and_ignored() {
        let (ids, map) = batteries(&[("b", "1"), ("a", "1")]);
        let sink = MemorySink::new();
        let ctx = ResolveContext::new(None, &sink);
        let result = get_ids_of_sorted_batteries(
            &ids,
            &map,
            &[SortOption::asc("size"), SortOption::asc("size"), SortOption::asc("name")],
            &ctx,
        );
        assert_eq!(result, vec!["a", "b"]);
        assert_eq!(sink.count(crate::diagnostics::Severity::Warning), 1);
    }

    #[test]
    fn test_no_options_keeps_order() {
        let (ids, map) = batteries(&[("b", "1"), ("a", "2")]);
        assert_eq!(sorted(&ids, &map, &[]), ids);
    }
}
