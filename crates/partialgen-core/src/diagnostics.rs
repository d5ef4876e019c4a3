//! Diagnostics reported by partialgen analyzers
//!
//! A [`DiagnosticDescriptor`] is the static part of a diagnostic (stable id,
//! message template, severity); a [`Diagnostic`] is one report of it at a
//! source location with format arguments.

use crate::model::Location;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hidden,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
            Severity::Hidden => write!(f, "hidden"),
        }
    }
}

/// Static description of one kind of diagnostic
#[derive(Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DiagnosticDescriptor {
    /// Stable, unique id such as `PG0002`
    pub id: &'static str,
    pub title: &'static str,
    /// Template with `{0}`, `{1}`, ... placeholders
    pub message_format: &'static str,
    pub category: &'static str,
    pub severity: Severity,
}

/// One reported diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub descriptor: &'static DiagnosticDescriptor,
    pub location: Location,
    pub arguments: Vec<String>,
    /// Extra data for code fixes, never shown to users
    pub properties: BTreeMap<String, String>,
}

impl Diagnostic {
    /// Create a diagnostic for `descriptor` at `location`
    pub fn new(descriptor: &'static DiagnosticDescriptor, location: Location, arguments: Vec<String>) -> Self {
        Self {
            descriptor,
            location,
            arguments,
            properties: BTreeMap::new(),
        }
    }

    /// Attach a property for code fixes
    pub fn with_property<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &'static str {
        self.descriptor.id
    }

    pub fn severity(&self) -> Severity {
        self.descriptor.severity
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Render the message template with the format arguments
    pub fn message(&self) -> String {
        let mut message = self.descriptor.message_format.to_string();
        for (index, argument) in self.arguments.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", index), argument);
        }
        message
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {}: {}",
            self.location,
            self.severity(),
            self.id(),
            self.message()
        )
    }
}

/// Diagnostic collector for gathering analysis results
#[derive(Debug, Default, Clone)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new diagnostic collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic to the collector
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Move every diagnostic of `other` into this collector
    pub fn extend(&mut self, other: DiagnosticCollector) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Get all diagnostics
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity() == Severity::Error)
    }

    /// Get the number of errors
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity() == Severity::Error).count()
    }

    /// Diagnostics with a given id
    pub fn with_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.id() == id)
    }

    /// Clear all diagnostics
    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }

    /// Consume the collector, returning diagnostics ordered by location, id and message
    pub fn into_sorted(mut self) -> Vec<Diagnostic> {
        self.diagnostics.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then_with(|| a.id().cmp(b.id()))
                .then_with(|| a.arguments.cmp(&b.arguments))
        });
        self.diagnostics
    }
}
