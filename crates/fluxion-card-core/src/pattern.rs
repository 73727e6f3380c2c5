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

//! User-supplied patterns: `/regex/flags` literals and `*` wildcards.

use regex::{Regex, RegexBuilder};

/// Regex written as a `/pattern/flags` literal
#[derive(Debug, Clone)]
pub struct RegexLiteral {
    pub regex: Regex,
    /// `g` flag: replace every match rather than the first one
    pub global: bool,
}

impl RegexLiteral {
    /// Replace the first match, or every match with the `g` flag
    pub fn replace(&self, text: &str, replacement: &str) -> String {
        let limit = if self.global { 0 } else { 1 };
        self.regex
            .replacen(text, limit, replacement)
            .into_owned()
    }
}

const SUPPORTED_FLAGS: &str = "gimsuy";

/// Parse `/pattern/flags`
///
/// Returns `None` when the text is not delimited like a regex literal, and
/// `Some(Err(..))` when it is but the pattern does not compile.
pub fn parse_regex_literal(text: &str) -> Option<Result<RegexLiteral, regex::Error>> {
    let body = text.strip_prefix('/')?;
    let end = body.rfind('/')?;
    let (pattern, flags) = (&body[..end], &body[end + 1..]);
    if pattern.is_empty() || !flags.chars().all(|c| SUPPORTED_FLAGS.contains(c)) {
        return None;
    }

    let regex = RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build();

    Some(regex.map(|regex| RegexLiteral {
        regex,
        global: flags.contains('g'),
    }))
}

/// Anchored regex where `*` matches any run of characters
pub fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
    Regex::new(&format!("^{}$", escaped.join(".*")))
}
