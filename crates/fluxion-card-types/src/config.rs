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

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::errors::{ConfigError, ConfigResult};
use crate::validation::ValidationResult;

// ============= Loose shape helpers =============

/// Scalar config value written either as a string or as a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl fmt::Display for StringOrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => {
                if let Some(i) = n.as_i64() {
                    write!(f, "{i}")
                } else if let Some(u) = n.as_u64() {
                    write!(f, "{u}")
                } else {
                    write!(f, "{}", n.as_f64().unwrap_or(f64::NAN))
                }
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Accepts either a single item or a list and normalizes it into a list
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::<T>::deserialize(deserializer)? {
        OneOrMany::One(item) => vec![item],
        OneOrMany::Many(items) => items,
    })
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(StringOrNumber::deserialize(deserializer)?.to_string())
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| v.to_string()))
}

// ============= Entity configuration =============

/// Maps a raw entity state to a replacement state and optional display text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMapEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub from: String,
    #[serde(deserialize_with = "string_or_number")]
    pub to: String,
    #[serde(default)]
    pub display: Option<String>,
}

/// Attribute indicating charging; `value` is the expected value, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargingAttribute {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

/// Where and how to detect that a battery is charging
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargingStateConfig {
    /// Entity to take the charging state from instead of the battery entity
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub attribute: Vec<ChargingAttribute>,
    /// States indicating charging
    #[serde(default, deserialize_with = "one_or_many")]
    pub state: Vec<Value>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Text substituted for `{charging}` while charging
    #[serde(default)]
    pub secondary_info_text: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorStepRepr {
    Color(String),
    Threshold {
        #[serde(default)]
        value: Option<f64>,
        color: String,
    },
}

/// Color used for levels up to and including `value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColorStepRepr")]
pub struct ColorStep {
    pub value: Option<f64>,
    pub color: String,
}

impl From<ColorStepRepr> for ColorStep {
    fn from(repr: ColorStepRepr) -> Self {
        match repr {
            ColorStepRepr::Color(color) => Self { value: None, color },
            ColorStepRepr::Threshold { value, color } => Self { value, color },
        }
    }
}

impl ColorStep {
    pub fn new(value: f64, color: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorSettings {
    #[serde(default)]
    pub steps: Vec<ColorStep>,
    /// Interpolate between step colors instead of picking a threshold
    #[serde(default)]
    pub gradient: bool,
    /// Step values are raw values rather than percentages
    #[serde(default)]
    pub non_percent_values: bool,
}

/// Literal (`from`) or `/regex/flags` rename rule applied to entity names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameRule {
    pub from: String,
    #[serde(default)]
    pub to: String,
}

/// Per-entity display settings; at card level they act as defaults for all entities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Attribute holding the battery level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    /// Number of decimal places
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_map: Vec<StateMapEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charging_state: Option<ChargingStateConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<ColorSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_info: Option<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub bulk_rename: Vec<RenameRule>,
    /// Skip `battery_level`/`battery` attribute probing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_battery_entity: Option<bool>,
    /// Debug override for the displayed value, processed as a template
    #[serde(
        default,
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub value_override: Option<String>,
    /// Let the host format the state (defaults to true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_state_formatting: Option<bool>,
}

impl EntitySettings {
    /// Fill every setting not set here from `defaults`
    #[must_use]
    pub fn merged_over(&self, defaults: &EntitySettings) -> EntitySettings {
        fn pick<T: Clone>(own: &Option<T>, fallback: &Option<T>) -> Option<T> {
            own.as_ref().or(fallback.as_ref()).cloned()
        }
        fn pick_list<T: Clone>(own: &[T], fallback: &[T]) -> Vec<T> {
            if own.is_empty() {
                fallback.to_vec()
            } else {
                own.to_vec()
            }
        }

        EntitySettings {
            name: pick(&self.name, &defaults.name),
            icon: pick(&self.icon, &defaults.icon),
            unit: pick(&self.unit, &defaults.unit),
            attribute: pick(&self.attribute, &defaults.attribute),
            multiplier: pick(&self.multiplier, &defaults.multiplier),
            round: pick(&self.round, &defaults.round),
            state_map: pick_list(&self.state_map, &defaults.state_map),
            charging_state: pick(&self.charging_state, &defaults.charging_state),
            colors: pick(&self.colors, &defaults.colors),
            secondary_info: pick(&self.secondary_info, &defaults.secondary_info),
            bulk_rename: pick_list(&self.bulk_rename, &defaults.bulk_rename),
            non_battery_entity: pick(&self.non_battery_entity, &defaults.non_battery_entity),
            value_override: pick(&self.value_override, &defaults.value_override),
            default_state_formatting: pick(
                &self.default_state_formatting,
                &defaults.default_state_formatting,
            ),
        }
    }
}

#[derive(Deserialize)]
struct EntityConfigFields {
    #[serde(default)]
    entity: String,
    #[serde(flatten)]
    settings: EntitySettings,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntityConfigRepr {
    Id(String),
    Config(EntityConfigFields),
}

/// Configuration of a single tracked entity; a bare string is shorthand for `{ entity }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntityConfigRepr")]
pub struct EntityConfig {
    pub entity: String,
    #[serde(flatten)]
    pub settings: EntitySettings,
}

impl From<EntityConfigRepr> for EntityConfig {
    fn from(repr: EntityConfigRepr) -> Self {
        match repr {
            EntityConfigRepr::Id(entity) => Self::new(entity),
            EntityConfigRepr::Config(EntityConfigFields { entity, settings }) => {
                Self { entity, settings }
            }
        }
    }
}

impl EntityConfig {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            settings: EntitySettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: EntitySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Whether this entry references a host group to be expanded into its members
    pub fn is_group(&self) -> bool {
        self.entity.starts_with("group.")
    }
}

// ============= Filters =============

/// Declarative condition on an entity; composite when `and`/`or`/`not` are used
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// `state`, `attributes.x` or a dotted path into entity data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub and: Vec<FilterSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub or: Vec<FilterSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<FilterSpec>>,
}

impl FilterSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    #[must_use]
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.and.is_empty() && self.or.is_empty() && self.not.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub include: Vec<FilterSpec>,
    #[serde(default)]
    pub exclude: Vec<FilterSpec>,
}

// ============= Sorting & grouping =============

#[derive(Deserialize)]
#[serde(untagged)]
enum SortOptionRepr {
    By(String),
    Full {
        by: String,
        #[serde(default)]
        desc: bool,
    },
}

/// Sort key; `by` is `name`, `state`, `entity.<path>`, a dotted path or a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SortOptionRepr")]
pub struct SortOption {
    pub by: String,
    pub desc: bool,
}

impl From<SortOptionRepr> for SortOption {
    fn from(repr: SortOptionRepr) -> Self {
        match repr {
            SortOptionRepr::By(by) => Self { by, desc: false },
            SortOptionRepr::Full { by, desc } => Self { by, desc },
        }
    }
}

impl SortOption {
    pub fn asc(by: impl Into<String>) -> Self {
        Self {
            by: by.into(),
            desc: false,
        }
    }

    pub fn desc(by: impl Into<String>) -> Self {
        Self {
            by: by.into(),
            desc: true,
        }
    }
}

/// Collapsible group of batteries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Host group entity whose members belong to this group
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Icon, or `first`/`last` to take it from a member battery
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub icon_color: Option<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub secondary_info: Option<String>,
}

impl GroupConfig {
    pub fn min(&self) -> f64 {
        self.min.unwrap_or(0.0)
    }

    pub fn max(&self) -> f64 {
        self.max.unwrap_or(100.0)
    }

    /// True when neither bound was configured
    pub fn has_default_range(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Collapse after N batteries, or collapse into configured groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Collapse {
    Count(usize),
    Groups(Vec<GroupConfig>),
}

// ============= Card configuration =============

/// Complete card configuration as handed in by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
    #[serde(default)]
    pub filter: FilterSettings,
    #[serde(default, deserialize_with = "one_or_many")]
    pub sort: Vec<SortOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse: Option<Collapse>,
    /// Defaults applied to every entity
    #[serde(flatten)]
    pub defaults: EntitySettings,
}

impl CardConfig {
    /// Entity config with card-level defaults filled in
    pub fn entity_config(&self, entity: &EntityConfig) -> EntityConfig {
        EntityConfig {
            entity: entity.entity.clone(),
            settings: entity.settings.merged_over(&self.defaults),
        }
    }

    /// Validate configuration with field-level errors and warnings
    pub fn validate_detailed(&self) -> ValidationResult {
        let mut result = ValidationResult::success();

        for (idx, entity) in self.entities.iter().enumerate() {
            let prefix = format!("entities[{idx}]");
            if entity.entity.trim().is_empty() {
                result.add_error(
                    format!("{prefix}.entity"),
                    format!(
                        "Missing 'entity' property: {}",
                        serde_json::to_string(entity).unwrap_or_default()
                    ),
                );
            }
            validate_settings(&entity.settings, &prefix, &mut result);
        }
        validate_settings(&self.defaults, "card", &mut result);

        for (idx, spec) in self.filter.include.iter().enumerate() {
            validate_filter(spec, &format!("filter.include[{idx}]"), &mut result);
        }
        for (idx, spec) in self.filter.exclude.iter().enumerate() {
            validate_filter(spec, &format!("filter.exclude[{idx}]"), &mut result);
        }

        for (idx, option) in self.sort.iter().enumerate() {
            if option.by.trim().is_empty() {
                result.add_error(format!("sort[{idx}].by"), "Sort key cannot be empty");
            }
        }

        if let Some(Collapse::Groups(groups)) = &self.collapse {
            for (idx, group) in groups.iter().enumerate() {
                let prefix = format!("collapse[{idx}]");
                if group.min() > group.max() {
                    result.add_error(
                        format!("{prefix}.min"),
                        format!(
                            "Group min ({}) cannot be greater than max ({})",
                            group.min(),
                            group.max()
                        ),
                    );
                }
                if group.group_id.is_none() && group.entities.is_empty() && group.has_default_range()
                {
                    result.add_warning(
                        prefix,
                        "Group has no group_id, entities or range and will catch every battery",
                    );
                }
            }
        }

        result
    }

    /// Validate configuration, failing on the first error
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some((idx, entity)) = self
            .entities
            .iter()
            .enumerate()
            .find(|(_, e)| e.entity.trim().is_empty())
        {
            return Err(ConfigError::MissingEntity {
                index: idx,
                fragment: serde_json::to_string(entity).unwrap_or_default(),
            });
        }

        let result = self.validate_detailed();
        match result.errors.into_iter().next() {
            Some(issue) => Err(ConfigError::InvalidField {
                field: issue.field,
                message: issue.message,
            }),
            None => Ok(()),
        }
    }
}

fn validate_settings(settings: &EntitySettings, prefix: &str, result: &mut ValidationResult) {
    if let Some(colors) = &settings.colors
        && colors.gradient
        && colors.steps.len() < 2
    {
        result.add_warning(
            format!("{prefix}.colors.steps"),
            "Gradient colors need at least two steps",
        );
    }

    if let Some(multiplier) = settings.multiplier
        && !multiplier.is_finite()
    {
        result.add_error(
            format!("{prefix}.multiplier"),
            "Multiplier must be a finite number",
        );
    }

    for (idx, rule) in settings.bulk_rename.iter().enumerate() {
        if rule.from.is_empty() {
            result.add_error(
                format!("{prefix}.bulk_rename[{idx}].from"),
                "Rename rule 'from' cannot be empty",
            );
        }
    }
}

fn validate_filter(spec: &FilterSpec, field: &str, result: &mut ValidationResult) {
    if spec.is_empty() {
        result.add_warning(field, "Missing filter 'name' property");
    }
    for (idx, nested) in spec.and.iter().enumerate() {
        validate_filter(nested, &format!("{field}.and[{idx}]"), result);
    }
    for (idx, nested) in spec.or.iter().enumerate() {
        validate_filter(nested, &format!("{field}.or[{idx}]"), result);
    }
    if let Some(nested) = &spec.not {
        validate_filter(nested, &format!("{field}.not"), result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entities_accept_strings_and_objects() {
        let config: CardConfig = serde_json::from_value(json!({
            "entities": [
                "sensor.phone_battery",
                { "entity": "sensor.remote", "name": "Remote", "multiplier": 10 }
            ]
        }))
        .unwrap();

        assert_eq!(config.entities.len(), 2);
        assert_eq!(config.entities[0].entity, "sensor.phone_battery");
        assert_eq!(config.entities[1].settings.name.as_deref(), Some("Remote"));
        assert_eq!(config.entities[1].settings.multiplier, Some(10.0));
    }

    #[test]
    fn test_one_or_many_shapes_are_normalized() {
        let config: CardConfig = serde_json::from_value(json!({
            "sort": "name",
            "bulk_rename": { "from": " battery", "to": "" },
            "charging_state": { "state": "charging", "attribute": [{ "name": "is_charging" }] }
        }))
        .unwrap();

        assert_eq!(config.sort, vec![SortOption::asc("name")]);
        assert_eq!(config.defaults.bulk_rename.len(), 1);
        let charging = config.defaults.charging_state.unwrap();
        assert_eq!(charging.state, vec![json!("charging")]);
        assert_eq!(charging.attribute[0].name, "is_charging");
    }

    #[test]
    fn test_sort_list_with_mixed_options() {
        let config: CardConfig = serde_json::from_value(json!({
            "sort": ["state", { "by": "name", "desc": true }]
        }))
        .unwrap();

        assert_eq!(
            config.sort,
            vec![SortOption::asc("state"), SortOption::desc("name")]
        );
    }

    #[test]
    fn test_collapse_count_or_groups() {
        let count: CardConfig = serde_json::from_value(json!({ "collapse": 3 })).unwrap();
        assert_eq!(count.collapse, Some(Collapse::Count(3)));

        let groups: CardConfig = serde_json::from_value(json!({
            "collapse": [{ "name": "Low", "max": 20 }]
        }))
        .unwrap();
        let Some(Collapse::Groups(groups)) = groups.collapse else {
            panic!("expected group list");
        };
        assert_eq!(groups[0].min(), 0.0);
        assert_eq!(groups[0].max(), 20.0);
    }

    #[test]
    fn test_color_steps_accept_plain_colors() {
        let settings: EntitySettings = serde_json::from_value(json!({
            "colors": { "steps": ["#ff0000", { "value": 50, "color": "#00ff00" }], "gradient": true }
        }))
        .unwrap();

        let colors = settings.colors.unwrap();
        assert_eq!(colors.steps[0], ColorStep { value: None, color: "#ff0000".to_owned() });
        assert_eq!(colors.steps[1], ColorStep::new(50.0, "#00ff00"));
    }

    #[test]
    fn test_state_map_accepts_numbers() {
        let settings: EntitySettings = serde_json::from_value(json!({
            "state_map": [{ "from": "on", "to": 100, "display": "Full" }, { "from": 0, "to": "low" }],
            "value_override": 45
        }))
        .unwrap();

        assert_eq!(settings.state_map[0].to, "100");
        assert_eq!(settings.state_map[1].from, "0");
        assert_eq!(settings.value_override.as_deref(), Some("45"));
    }

    #[test]
    fn test_entity_settings_merge_over_defaults() {
        let defaults = EntitySettings {
            unit: Some("%".to_owned()),
            round: Some(1),
            ..Default::default()
        };
        let own = EntitySettings {
            round: Some(0),
            ..Default::default()
        };

        let merged = own.merged_over(&defaults);
        assert_eq!(merged.unit.as_deref(), Some("%"));
        assert_eq!(merged.round, Some(0));
    }

    #[test]
    fn test_missing_entity_is_fatal() {
        let config: CardConfig = serde_json::from_value(json!({
            "entities": ["sensor.ok", { "name": "Orphan" }]
        }))
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEntity { index: 1, .. }));
        assert!(err.to_string().contains("Orphan"));
    }

    #[test]
    fn test_validate_detailed_reports_warnings() {
        let config: CardConfig = serde_json::from_value(json!({
            "entities": ["sensor.ok"],
            "colors": { "steps": ["#ff0000"], "gradient": true },
            "filter": { "exclude": [{}] }
        }))
        .unwrap();

        let result = config.validate_detailed();
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_config() {
        let config: CardConfig = toml::from_str(
            r#"
            title = "Batteries"
            sort = ["state"]
            collapse = 4

            [[entities]]
            entity = "sensor.door_battery"
            round = 0

            [filter]
            include = [{ name = "attributes.device_class", value = "battery" }]
            "#,
        )
        .unwrap();

        assert_eq!(config.title.as_deref(), Some("Batteries"));
        assert_eq!(config.entities[0].settings.round, Some(0));
        assert_eq!(config.filter.include[0].value, Some(json!("battery")));
        assert_eq!(config.collapse, Some(Collapse::Count(4)));
    }
}
