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

use anyhow::{Context, Result, bail};
use fluxion_card_core::types::{CardConfig, EntitySnapshot};
use std::path::Path;
use tracing::{info, warn};

/// Load a card configuration from a `.toml` or `.json` file
pub fn load_card_config(path: &Path) -> Result<CardConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read card config: {}", path.display()))?;

    let config: CardConfig = match extension(path).as_deref() {
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
        _ => bail!(
            "Unsupported config format '{}', expected .toml or .json",
            path.display()
        ),
    };

    let validation = config.validate_detailed();
    for warning in &validation.warnings {
        warn!("⚠️ Config warning at {}: {}", warning.field, warning.message);
    }
    info!(
        "📋 Loaded card config with {} entities from {}",
        config.entities.len(),
        path.display()
    );

    Ok(config)
}

/// Load a Home Assistant `/api/states` dump (a JSON array of entity states)
pub fn load_states(path: &Path) -> Result<Vec<EntitySnapshot>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read states file: {}", path.display()))?;
    let states: Vec<EntitySnapshot> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse states file: {}", path.display()))?;

    info!("🏠 Loaded {} entity states", states.len());
    Ok(states)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}
