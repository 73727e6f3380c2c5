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

use thiserror::Error;

/// Fatal configuration problems, surfaced to the host for display
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid entity configuration, missing 'entity' property: {fragment}")]
    MissingEntity { index: usize, fragment: String },

    #[error("Group \"{0}\" doesn't exist")]
    GroupNotFound(String),

    #[error("Entities not found in \"{0}\"")]
    GroupWithoutEntities(String),

    #[error("Invalid configuration at '{field}': {message}")]
    InvalidField { field: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
