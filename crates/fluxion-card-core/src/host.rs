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

use fluxion_card_types::EntitySnapshot;
use fluxion_i18n::{I18n, I18nError, Language};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::number::is_numeric_str;

/// Members and presentation hints of a host group entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub entity_id: Vec<String>,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// What the card core needs from the hosting application for one update cycle
pub trait HostContext: fmt::Debug {
    /// Current state of an entity
    fn state(&self, entity_id: &str) -> Option<&EntitySnapshot>;

    /// Ids of every known entity, in host order
    fn entity_ids(&self) -> Vec<String>;

    /// Translated UI text
    fn localize(&self, key: &str) -> Option<String>;

    /// Host-formatted state, e.g. `"21,5 %"`
    fn format_entity_state(&self, entity: &EntitySnapshot) -> Option<String>;

    /// Members of a group entity
    fn group(&self, group_id: &str) -> Option<GroupMembership>;
}

/// In-memory state table, the shape of Home Assistant's `/api/states`
#[derive(Debug, Default)]
pub struct StateTable {
    states: HashMap<String, EntitySnapshot>,
    order: Vec<String>,
    i18n: Option<I18n>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_states(states: impl IntoIterator<Item = EntitySnapshot>) -> Self {
        let mut table = Self::new();
        for state in states {
            table.insert(state);
        }
        table
    }

    /// Translate placeholders into `language`
    pub fn with_language(mut self, language: Language) -> Result<Self, I18nError> {
        self.i18n = Some(I18n::new(language)?);
        Ok(self)
    }

    /// Insert or replace an entity state
    pub fn insert(&mut self, snapshot: EntitySnapshot) {
        if !self.states.contains_key(&snapshot.entity_id) {
            self.order.push(snapshot.entity_id.clone());
        }
        self.states.insert(snapshot.entity_id.clone(), snapshot);
    }

    pub fn remove(&mut self, entity_id: &str) -> Option<EntitySnapshot> {
        self.order.retain(|id| id != entity_id);
        self.states.remove(entity_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl HostContext for StateTable {
    fn state(&self, entity_id: &str) -> Option<&EntitySnapshot> {
        self.states.get(entity_id)
    }

    fn entity_ids(&self) -> Vec<String> {
        self.order.clone()
    }

    fn localize(&self, key: &str) -> Option<String> {
        self.i18n.as_ref().and_then(|i18n| i18n.get(key).ok())
    }

    fn format_entity_state(&self, entity: &EntitySnapshot) -> Option<String> {
        Some(match entity.unit_of_measurement() {
            Some(unit) if is_numeric_str(&entity.state) => format!("{} {}", entity.state, unit),
            _ => entity.state.clone(),
        })
    }

    fn group(&self, group_id: &str) -> Option<GroupMembership> {
        let group = self.states.get(group_id)?;
        let entity_id = group
            .attributes
            .get("entity_id")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Some(GroupMembership {
            entity_id,
            friendly_name: group.friendly_name().map(str::to_owned),
            icon: group
                .attributes
                .get("icon")
                .and_then(Value::as_str)
                .map(str::to_owned),
        })
    }
}
