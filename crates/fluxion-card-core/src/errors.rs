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

use fluxion_card_types::ConfigError;
use fluxion_i18n::I18nError;
use thiserror::Error;

/// Fatal errors surfaced to the host's error boundary
#[derive(Error, Debug)]
pub enum CardError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Localization error: {0}")]
    I18n(#[from] I18nError),
}

pub type CardResult<T> = Result<T, CardError>;
