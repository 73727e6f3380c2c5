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

use fluxion_card_types::{CardConfig, ConfigError, ConfigResult, EntityConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::battery::ResolvedBattery;
use crate::context::ResolveContext;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::errors::CardResult;
use crate::filter::Filter;
use crate::grouping::{RenderModel, get_battery_groups};
use crate::host::HostContext;
use crate::sorting::get_ids_of_sorted_batteries;

/// Live collection of batteries for one card instance
///
/// The first [`update`](Self::update) expands host groups and runs include filters.
/// Every update re-resolves the tracked batteries and applies exclude filters.
#[derive(Debug)]
pub struct BatteryProvider {
    config: CardConfig,
    include: Vec<Filter>,
    exclude: Vec<Filter>,
    configs: HashMap<String, EntityConfig>,
    batteries: HashMap<String, ResolvedBattery>,
    /// Tracked ids in insertion order
    order: Vec<String>,
    groups_to_resolve: Vec<EntityConfig>,
    initialized: bool,
    render_model: RenderModel,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl BatteryProvider {
    pub fn new(config: CardConfig) -> ConfigResult<Self> {
        Self::with_diagnostics(config, Arc::new(TracingSink))
    }

    /// Validates the config and registers the explicitly listed entities
    pub fn with_diagnostics(
        config: CardConfig,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> ConfigResult<Self> {
        config.validate()?;

        let include = config
            .filter
            .include
            .iter()
            .map(|spec| Filter::compile(spec, diagnostics.as_ref()))
            .collect();
        let exclude = config
            .filter
            .exclude
            .iter()
            .map(|spec| Filter::compile(spec, diagnostics.as_ref()))
            .collect();

        let mut provider = Self {
            include,
            exclude,
            configs: HashMap::new(),
            batteries: HashMap::new(),
            order: Vec::new(),
            groups_to_resolve: Vec::new(),
            initialized: false,
            render_model: RenderModel::default(),
            diagnostics,
            config,
        };

        for entity in provider.config.entities.clone() {
            let merged = provider.config.entity_config(&entity);
            if merged.is_group() {
                provider.groups_to_resolve.push(merged);
            } else {
                provider.track(merged);
            }
        }

        Ok(provider)
    }

    /// Recompute every battery from the host's current state
    pub fn update(&mut self, host: &dyn HostContext) -> CardResult<()> {
        let sink = Arc::clone(&self.diagnostics);
        let ctx = ResolveContext::new(Some(host), sink.as_ref());

        if !self.initialized {
            self.resolve_host_groups(host)?;
            self.apply_includes(host, &ctx);
            self.initialized = true;
            info!("🔋 Battery card initialized with {} entities", self.order.len());
        }

        for id in &self.order {
            let Some(config) = self.configs.get(id) else {
                continue;
            };
            match self.batteries.get_mut(id) {
                Some(battery) => battery.update(config, &ctx),
                None => {
                    self.batteries
                        .insert(id.clone(), ResolvedBattery::resolve(config, &ctx));
                }
            }
        }

        self.apply_excludes(host, &ctx);

        let visible: Vec<String> = self
            .order
            .iter()
            .filter(|id| self.batteries.get(*id).is_some_and(|b| !b.is_hidden))
            .cloned()
            .collect();
        let sorted = get_ids_of_sorted_batteries(&visible, &self.batteries, &self.config.sort, &ctx);
        self.render_model =
            get_battery_groups(&self.batteries, &sorted, self.config.collapse.as_ref(), Some(host))?;

        Ok(())
    }

    pub fn batteries(&self) -> &HashMap<String, ResolvedBattery> {
        &self.batteries
    }

    pub fn battery(&self, entity_id: &str) -> Option<&ResolvedBattery> {
        self.batteries.get(entity_id)
    }

    pub fn render_model(&self) -> &RenderModel {
        &self.render_model
    }

    /// Tracked entity ids in the order they were added
    pub fn tracked_ids(&self) -> &[String] {
        &self.order
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    fn track(&mut self, config: EntityConfig) {
        if self.configs.contains_key(&config.entity) {
            return;
        }
        self.order.push(config.entity.clone());
        self.configs.insert(config.entity.clone(), config);
    }

    fn untrack(&mut self, entity_id: &str) {
        self.order.retain(|id| id != entity_id);
        self.configs.remove(entity_id);
        self.batteries.remove(entity_id);
    }

    /// Members of a group entry inherit the entry's settings
    fn resolve_host_groups(&mut self, host: &dyn HostContext) -> ConfigResult<()> {
        for group in self.groups_to_resolve.clone() {
            let membership = host
                .group(&group.entity)
                .ok_or_else(|| ConfigError::GroupNotFound(group.entity.clone()))?;
            if membership.entity_id.is_empty() {
                return Err(ConfigError::GroupWithoutEntities(group.entity.clone()));
            }

            debug!(
                "Expanding group {} into {} entities",
                group.entity,
                membership.entity_id.len()
            );
            for member in membership.entity_id {
                self.track(EntityConfig {
                    entity: member,
                    settings: group.settings.clone(),
                });
            }
        }
        Ok(())
    }

    fn apply_includes(&mut self, host: &dyn HostContext, ctx: &ResolveContext<'_>) {
        if self.include.is_empty() {
            return;
        }

        let mut added = 0;
        for entity_id in host.entity_ids() {
            if self.configs.contains_key(&entity_id) {
                continue;
            }
            let Some(entity) = host.state(&entity_id) else {
                continue;
            };
            let data = entity.to_entity_data();
            if self
                .include
                .iter()
                .any(|filter| filter.is_valid(&data, None, ctx.diagnostics))
            {
                let config = self.config.entity_config(&EntityConfig::new(entity_id));
                self.track(config);
                added += 1;
            }
        }
        debug!("Include filters added {} entities", added);
    }

    /// Permanent matches are dropped for good, state-based ones only hide the battery
    fn apply_excludes(&mut self, host: &dyn HostContext, ctx: &ResolveContext<'_>) {
        let mut to_remove = Vec::new();

        for id in &self.order {
            let Some(battery) = self.batteries.get_mut(id) else {
                continue;
            };
            battery.is_hidden = false;

            // entities missing from the host stay tracked
            if host.state(id).is_none() {
                continue;
            }

            let matches = self.exclude.iter().filter(|filter| {
                filter.is_valid(&battery.entity_data, Some(&battery.state), ctx.diagnostics)
            });
            let mut hidden = false;
            let mut permanent = false;
            for filter in matches {
                if filter.is_permanent() {
                    permanent = true;
                    break;
                }
                hidden = true;
            }

            if permanent {
                to_remove.push(id.clone());
            } else {
                battery.is_hidden = hidden;
            }
        }

        for id in to_remove {
            debug!("Entity {} removed by exclude filter", id);
            self.untrack(&id);
        }
    }
}
