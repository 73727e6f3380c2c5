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

use fluxion_card_types::{Collapse, ConfigError, ConfigResult, GroupConfig};
use serde::Serialize;
use std::collections::HashMap;

use crate::battery::ResolvedBattery;
use crate::host::HostContext;
use crate::number::format_number;

/// Collapsible group as handed to the renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatteryGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,
    pub battery_ids: Vec<String>,
}

/// Ungrouped battery ids followed by the groups, everything in display order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderModel {
    pub list: Vec<String>,
    pub groups: Vec<BatteryGroup>,
}

/// Group config with host group members resolved
#[derive(Debug)]
struct ResolvedGroupConfig<'a> {
    config: &'a GroupConfig,
    members: Vec<String>,
    host_name: Option<String>,
    host_icon: Option<String>,
}

impl ResolvedGroupConfig<'_> {
    fn claims(&self, battery: Option<&ResolvedBattery>, id: &str) -> bool {
        let has_members = !self.members.is_empty() || self.config.group_id.is_some();
        if has_members && !self.members.iter().any(|member| member == id) {
            return false;
        }
        match battery.and_then(|b| b.level) {
            Some(level) => self.config.min() <= level && level <= self.config.max(),
            None => self.config.has_default_range(),
        }
    }
}

/// Split the sorted ids into the ungrouped list and collapsed groups
///
/// Fails when a group refers to a host group that does not exist.
pub fn get_battery_groups(
    batteries: &HashMap<String, ResolvedBattery>,
    sorted_ids: &[String],
    collapse: Option<&Collapse>,
    host: Option<&dyn HostContext>,
) -> ConfigResult<RenderModel> {
    match collapse {
        None => Ok(RenderModel {
            list: sorted_ids.to_vec(),
            groups: Vec::new(),
        }),
        Some(Collapse::Count(visible)) => {
            let split = (*visible).min(sorted_ids.len());
            let (list, rest) = sorted_ids.split_at(split);
            let groups = if rest.is_empty() {
                Vec::new()
            } else {
                vec![BatteryGroup {
                    battery_ids: rest.to_vec(),
                    ..BatteryGroup::default()
                }]
            };
            Ok(RenderModel {
                list: list.to_vec(),
                groups,
            })
        }
        Some(Collapse::Groups(configs)) => {
            let resolved = configs
                .iter()
                .map(|config| resolve_group_config(config, host))
                .collect::<ConfigResult<Vec<_>>>()?;

            let mut members: Vec<Vec<String>> = vec![Vec::new(); resolved.len()];
            let mut list = Vec::new();
            for id in sorted_ids {
                let battery = batteries.get(id);
                match resolved.iter().position(|group| group.claims(battery, id)) {
                    Some(idx) => members[idx].push(id.clone()),
                    None => list.push(id.clone()),
                }
            }

            let groups = resolved
                .iter()
                .zip(members)
                .filter(|(_, ids)| !ids.is_empty())
                .map(|(group, ids)| build_group(group, ids, batteries))
                .collect();

            Ok(RenderModel { list, groups })
        }
    }
}

fn resolve_group_config<'a>(
    config: &'a GroupConfig,
    host: Option<&dyn HostContext>,
) -> ConfigResult<ResolvedGroupConfig<'a>> {
    let mut resolved = ResolvedGroupConfig {
        config,
        members: config.entities.clone(),
        host_name: None,
        host_icon: None,
    };

    if let Some(group_id) = &config.group_id
        && let Some(host) = host
    {
        let membership = host
            .group(group_id)
            .ok_or_else(|| ConfigError::GroupNotFound(group_id.clone()))?;
        if membership.entity_id.is_empty() {
            return Err(ConfigError::GroupWithoutEntities(group_id.clone()));
        }
        resolved.members.extend(membership.entity_id);
        resolved.host_name = membership.friendly_name;
        resolved.host_icon = membership.icon;
    }

    Ok(resolved)
}

fn build_group(
    group: &ResolvedGroupConfig<'_>,
    ids: Vec<String>,
    batteries: &HashMap<String, ResolvedBattery>,
) -> BatteryGroup {
    let members: Vec<&ResolvedBattery> = ids.iter().filter_map(|id| batteries.get(id)).collect();

    let title = group
        .config
        .name
        .as_ref()
        .or(group.host_name.as_ref())
        .map(|name| enrich_text(name, &members));
    let secondary_info = group
        .config
        .secondary_info
        .as_ref()
        .map(|text| enrich_text(text, &members));
    let icon = pick_member(
        group.config.icon.as_ref().or(group.host_icon.as_ref()),
        &members,
        |b| b.icon.as_str(),
    );
    let icon_color = pick_member(group.config.icon_color.as_ref(), &members, |b| {
        b.color.as_str()
    });

    BatteryGroup {
        title,
        secondary_info,
        icon,
        icon_color,
        battery_ids: ids,
    }
}

/// `first`/`last` take the value from that member, anything else is used literally
fn pick_member(
    spec: Option<&String>,
    members: &[&ResolvedBattery],
    field: impl Fn(&ResolvedBattery) -> &str,
) -> Option<String> {
    match spec.map(String::as_str) {
        Some("first") => members.first().map(|&b| field(b).to_owned()),
        Some("last") => members.last().map(|&b| field(b).to_owned()),
        other => other.map(str::to_owned),
    }
}

/// Replace `{min}`, `{max}`, `{count}` and `{range}` with member aggregates
fn enrich_text(text: &str, members: &[&ResolvedBattery]) -> String {
    // non-numeric levels never move the extremes off their starting sentinels
    let levels = || members.iter().filter_map(|b| b.level);
    let min = format_number(levels().fold(100.0, f64::min));
    let max = format_number(levels().fold(0.0, f64::max));
    let range = if min == max {
        min.clone()
    } else {
        format!("{min}-{max}")
    };

    text.replace("{min}", &min)
        .replace("{max}", &max)
        .replace("{count}", &members.len().to_string())
        .replace("{range}", &range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ResolveContext;
    use crate::diagnostics::MemorySink;
    use crate::host::StateTable;
    use fluxion_card_types::{EntityConfig, EntitySnapshot};
    use serde_json::json;

    fn setup(states: &[(&str, &str)]) -> (StateTable, Vec<String>, HashMap<String, ResolvedBattery>) {
        let mut table = StateTable::from_states(
            states.iter().map(|(id, state)| EntitySnapshot::new(*id, *state)),
        );
        table.insert(
            EntitySnapshot::new("group.phones", "on")
                .with_attribute("entity_id", json!(["sensor.a", "sensor.b"]))
                .with_attribute("friendly_name", "Phones")
                .with_attribute("icon", "mdi:cellphone"),
        );
        let sink = MemorySink::new();
        let ctx = ResolveContext::new(Some(&table), &sink);
        let ids: Vec<String> = states.iter().map(|(id, _)| (*id).to_owned()).collect();
        let batteries = ids
            .iter()
            .map(|id| (id.clone(), ResolvedBattery::resolve(&EntityConfig::new(id.as_str()), &ctx)))
            .collect();
        (table, ids, batteries)
    }

    #[test]
    fn test_no_collapse() {
        let (_, ids, batteries) = setup(&[("sensor.a", "10"), ("sensor.b", "20")]);
        let model = get_battery_groups(&batteries, &ids, None, None).unwrap();
        assert_eq!(model.list, ids);
        assert!(model.groups.is_empty());
    }

    #[test]
    fn test_collapse_after_count() {
        let (_, ids, batteries) = setup(&[
            ("sensor.a", "1"),
            ("sensor.b", "2"),
            ("sensor.c", "3"),
            ("sensor.d", "4"),
            ("sensor.e", "5"),
        ]);
        let model = get_battery_groups(&batteries, &ids, Some(&Collapse::Count(2)), None).unwrap();
        assert_eq!(model.list, vec!["sensor.a", "sensor.b"]);
        assert_eq!(model.groups.len(), 1);
        assert_eq!(model.groups[0].battery_ids, vec!["sensor.c", "sensor.d", "sensor.e"]);

        let all_visible =
            get_battery_groups(&batteries, &ids, Some(&Collapse::Count(10)), None).unwrap();
        assert!(all_visible.groups.is_empty());
    }

    #[test]
    fn test_range_groups_with_aggregates() {
        let (_, ids, batteries) = setup(&[
            ("sensor.a", "4"),
            ("sensor.b", "15"),
            ("sensor.c", "80"),
            ("sensor.d", "unavailable"),
        ]);
        let collapse = Collapse::Groups(vec![GroupConfig {
            name: Some("Low ({count}): {range}%".to_owned()),
            secondary_info: Some("min {min}, max {max}".to_owned()),
            icon: Some("first".to_owned()),
            icon_color: Some("last".to_owned()),
            max: Some(20.0),
            ..GroupConfig::default()
        }]);

        let model = get_battery_groups(&batteries, &ids, Some(&collapse), None).unwrap();
        assert_eq!(model.list, vec!["sensor.c", "sensor.d"]);
        let group = &model.groups[0];
        assert_eq!(group.battery_ids, vec!["sensor.a", "sensor.b"]);
        assert_eq!(group.title.as_deref(), Some("Low (2): 4-15%"));
        assert_eq!(group.secondary_info.as_deref(), Some("min 4, max 15"));
        assert_eq!(group.icon.as_deref(), Some("mdi:battery-outline"));
        assert_eq!(group.icon_color.as_deref(), Some("var(--label-badge-red)"));
    }

    #[test]
    fn test_first_matching_group_claims() {
        let (_, ids, batteries) = setup(&[("sensor.a", "5"), ("sensor.b", "50"), ("sensor.c", "na")]);
        let collapse = Collapse::Groups(vec![
            GroupConfig {
                entities: vec!["sensor.a".to_owned(), "sensor.b".to_owned()],
                name: Some("Explicit".to_owned()),
                ..GroupConfig::default()
            },
            GroupConfig {
                name: Some("Everything".to_owned()),
                ..GroupConfig::default()
            },
        ]);
        let model = get_battery_groups(&batteries, &ids, Some(&collapse), None).unwrap();
        assert!(model.list.is_empty());
        assert_eq!(model.groups[0].battery_ids, vec!["sensor.a", "sensor.b"]);
        assert_eq!(model.groups[1].battery_ids, vec!["sensor.c"]);
        assert_eq!(model.groups[1].title.as_deref(), Some("Everything"));
    }

    #[test]
    fn test_host_group_membership() {
        let (table, ids, batteries) = setup(&[("sensor.a", "30"), ("sensor.b", "30"), ("sensor.c", "30")]);
        let collapse = Collapse::Groups(vec![GroupConfig {
            group_id: Some("group.phones".to_owned()),
            ..GroupConfig::default()
        }]);
        let model = get_battery_groups(&batteries, &ids, Some(&collapse), Some(&table)).unwrap();
        assert_eq!(model.list, vec!["sensor.c"]);
        let group = &model.groups[0];
        assert_eq!(group.battery_ids, vec!["sensor.a", "sensor.b"]);
        assert_eq!(group.title.as_deref(), Some("Phones"));
        assert_eq!(group.icon.as_deref(), Some("mdi:cellphone"));
    }

    #[test]
    fn test_missing_host_group_is_an_error() {
        let (table, ids, batteries) = setup(&[("sensor.a", "30")]);
        let collapse = Collapse::Groups(vec![GroupConfig {
            group_id: Some("group.nope".to_owned()),
            ..GroupConfig::default()
        }]);
        let err = get_battery_groups(&batteries, &ids, Some(&collapse), Some(&table)).unwrap_err();
        assert_eq!(err, ConfigError::GroupNotFound("group.nope".to_owned()));
        assert_eq!(err.to_string(), r#"Group "group.nope" doesn't exist"#);
    }

    #[test]
    fn test_equal_extremes_collapse_range() {
        let (_, _, batteries) = setup(&[("sensor.a", "40"), ("sensor.b", "40")]);
        let members: Vec<&ResolvedBattery> = batteries.values().collect();
        assert_eq!(enrich_text("{range}", &members), "40");
        assert_eq!(enrich_text("{min}-{max}", &[]), "100-0");
    }
}
