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

use fluent::{FluentArgs, FluentBundle, FluentResource};
use thiserror::Error;
use unic_langid::LanguageIdentifier;

/// Translation key for the placeholder shown when a battery level cannot be read
pub const KEY_STATE_UNKNOWN: &str = "state-unknown";

/// Translation key for the default charging secondary text
pub const KEY_CHARGING: &str = "charging";

/// Supported languages
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English (default)
    #[default]
    English,
    /// Czech
    Czech,
}

impl Language {
    /// Get the language identifier string (e.g., "en", "cs")
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Czech => "cs",
        }
    }

    /// List all supported languages
    pub const ALL: [Language; 2] = [Language::English, Language::Czech];

    /// Parse language from string code
    ///
    /// # Errors
    ///
    /// Returns `I18nError::UnsupportedLanguage` if the language code is not supported.
    pub fn from_code(code: &str) -> Result<Self, I18nError> {
        match code.to_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "cs" | "czech" | "cz" => Ok(Self::Czech),
            _ => Err(I18nError::UnsupportedLanguage(code.to_owned())),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = I18nError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

/// Translation errors
#[derive(Debug, Error)]
pub enum I18nError {
    /// Translation key not found
    #[error("Translation key not found: {0}")]
    KeyNotFound(String),

    /// Failed to load translation resource
    #[error("Failed to load translation resource: {0}")]
    LoadError(String),

    /// Unsupported language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Formatting error
    #[error("Failed to format translation: {0}")]
    FormatError(String),
}

/// Card translations for a single language
pub struct I18n {
    bundle: FluentBundle<FluentResource>,
    language: Language,
}

impl std::fmt::Debug for I18n {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I18n")
            .field("language", &self.language)
            .field("bundle", &"<FluentBundle>")
            .finish()
    }
}

impl I18n {
    /// Create a new i18n instance for the specified language
    ///
    /// # Errors
    ///
    /// Returns `I18nError::LoadError` if the embedded translation file cannot be parsed.
    pub fn new(language: Language) -> Result<Self, I18nError> {
        let lang_code = language.code();
        let ftl_content = Self::load_ftl_file(language);

        let resource = FluentResource::try_new(ftl_content.to_owned())
            .map_err(|e| I18nError::LoadError(format!("Failed to parse card.ftl: {e:?}")))?;

        let lang_id: LanguageIdentifier = lang_code
            .parse()
            .map_err(|e| I18nError::LoadError(format!("Invalid language ID: {e}")))?;

        let mut bundle = FluentBundle::new(vec![lang_id]);
        // Placeholders end up inside plain text, no bidi isolation marks wanted
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|e| I18nError::LoadError(format!("Failed to add resource: {e:?}")))?;

        Ok(Self { bundle, language })
    }

    fn load_ftl_file(language: Language) -> &'static str {
        match language {
            Language::English => include_str!("../locales/en/card.ftl"),
            Language::Czech => include_str!("../locales/cs/card.ftl"),
        }
    }

    /// Get a translated string by key
    ///
    /// # Errors
    ///
    /// Returns `I18nError::KeyNotFound` if the translation key is not defined.
    pub fn get(&self, key: &str) -> Result<String, I18nError> {
        self.format(key, None)
    }

    /// Format a translated string with arguments
    ///
    /// # Errors
    ///
    /// Returns `I18nError::KeyNotFound` if the translation key is not found.
    /// Returns `I18nError::FormatError` if formatting fails.
    pub fn format(&self, key: &str, args: Option<&FluentArgs<'_>>) -> Result<String, I18nError> {
        let message = self
            .bundle
            .get_message(key)
            .and_then(|msg| msg.value())
            .ok_or_else(|| I18nError::KeyNotFound(key.to_owned()))?;

        let mut errors = vec![];
        let value = self.bundle.format_pattern(message, args, &mut errors);

        if !errors.is_empty() {
            return Err(I18nError::FormatError(format!(
                "Formatting errors: {errors:?}"
            )));
        }

        Ok(value.to_string())
    }

    /// Get the current language
    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }
}
