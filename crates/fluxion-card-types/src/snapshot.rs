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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::config::StringOrNumber;

/// State of a single Home Assistant entity as pushed by the host for one update cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub entity_id: String,
    #[serde(deserialize_with = "deserialize_state")]
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default = "unix_epoch")]
    pub last_changed: DateTime<Utc>,
    #[serde(default = "unix_epoch")]
    pub last_updated: DateTime<Utc>,
    /// Additional host-provided data (e.g. `device`, `area`, `context`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn deserialize_state<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(StringOrNumber::deserialize(deserializer)?.to_string())
}

impl EntitySnapshot {
    /// Create a snapshot with no attributes and epoch timestamps
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Map::new(),
            last_changed: unix_epoch(),
            last_updated: unix_epoch(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_last_changed(mut self, at: DateTime<Utc>) -> Self {
        self.last_changed = at;
        self.last_updated = at;
        self
    }

    /// Entity domain, the part of the id before the first dot
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map_or(self.entity_id.as_str(), |(domain, _)| domain)
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.attributes.get("friendly_name").and_then(Value::as_str)
    }

    pub fn unit_of_measurement(&self) -> Option<&str> {
        self.attributes
            .get("unit_of_measurement")
            .and_then(Value::as_str)
    }

    /// JSON view of the snapshot used as template/filter data context
    pub fn to_entity_data(&self) -> Value {
        let mut data = Map::new();
        for (key, value) in &self.extra {
            data.insert(key.clone(), value.clone());
        }
        data.insert("entity_id".to_owned(), Value::from(self.entity_id.clone()));
        data.insert("state".to_owned(), Value::from(self.state.clone()));
        data.insert(
            "attributes".to_owned(),
            Value::Object(self.attributes.clone()),
        );
        data.insert(
            "last_changed".to_owned(),
            Value::from(self.last_changed.to_rfc3339()),
        );
        data.insert(
            "last_updated".to_owned(),
            Value::from(self.last_updated.to_rfc3339()),
        );
        Value::Object(data)
    }
}
