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

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use fluxion_card_core::{BatteryProvider, ResolvedBattery, StateTable};
use fluxion_i18n::Language;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "fluxion-card-preview")]
#[command(about = "Resolve a battery card config against a Home Assistant state dump", long_about = None)]
struct Cli {
    /// Card configuration (.toml or .json)
    #[arg(short, long)]
    config: PathBuf,

    /// JSON array of entity states, as returned by /api/states
    #[arg(short, long)]
    states: PathBuf,

    /// Language of placeholder texts (en, cs)
    #[arg(short, long, default_value = "en")]
    language: Language,

    /// Number of update cycles to run
    #[arg(long, default_value_t = 1)]
    cycles: usize,
}

#[derive(Serialize)]
struct PreviewOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    batteries: Vec<&'a ResolvedBattery>,
    render_model: &'a fluxion_card_core::RenderModel,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays valid JSON
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set default tracing subscriber")?;

    let card = config::load_card_config(&cli.config)?;
    let states = config::load_states(&cli.states)?;
    let table = StateTable::from_states(states)
        .with_language(cli.language)
        .context("Failed to load translations")?;

    let mut provider = BatteryProvider::new(card).context("Invalid card configuration")?;
    for cycle in 1..=cli.cycles.max(1) {
        provider
            .update(&table)
            .with_context(|| format!("Update cycle {cycle} failed"))?;
    }
    info!("✅ Resolved {} batteries", provider.batteries().len());

    let output = PreviewOutput {
        title: provider.config().title.as_deref(),
        batteries: provider
            .tracked_ids()
            .iter()
            .filter_map(|id| provider.battery(id))
            .collect(),
        render_model: provider.render_model(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
