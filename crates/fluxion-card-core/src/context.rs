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

use crate::diagnostics::DiagnosticSink;
use crate::host::HostContext;

/// Everything a resolver may consult besides the entity itself
///
/// `host` is optional: without it resolvers degrade to their most conservative
/// result (no charging, entity id as name, untranslated placeholders).
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub host: Option<&'a dyn HostContext>,
    pub diagnostics: &'a dyn DiagnosticSink,
}

impl<'a> ResolveContext<'a> {
    pub fn new(host: Option<&'a dyn HostContext>, diagnostics: &'a dyn DiagnosticSink) -> Self {
        Self { host, diagnostics }
    }

    /// Localized text for `key`, or `fallback` when no host translation exists
    pub fn localize_or(&self, key: &str, fallback: &str) -> String {
        self.host
            .and_then(|host| host.localize(key))
            .unwrap_or_else(|| fallback.to_owned())
    }
}
