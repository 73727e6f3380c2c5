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

use parking_lot::Mutex;
use std::fmt;
use tracing::{debug, error, warn};

/// Severity of a resolution diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Debug,
    Warning,
    Error,
}

/// A single diagnostic emitted while resolving batteries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Observability channel for non-fatal resolution problems
///
/// Resolution never fails because of these; they only explain which fallback was taken.
pub trait DiagnosticSink: fmt::Debug {
    fn emit(&self, severity: Severity, message: &str);

    fn debug(&self, message: &str) {
        self.emit(Severity::Debug, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Severity::Warning, message);
    }

    fn error(&self, message: &str) {
        self.emit(Severity::Error, message);
    }
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => debug!("{}", message),
            Severity::Warning => warn!("⚠️ {}", message),
            Severity::Error => error!("❌ {}", message),
        }
    }
}

/// Keeps diagnostics in memory so they can be inspected later
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    /// True if any diagnostic message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().iter().any(|d| d.message.contains(needle))
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, severity: Severity, message: &str) {
        self.entries.lock().push(Diagnostic {
            severity,
            message: message.to_owned(),
        });
    }
}
