// src/core/hierarchy/diagnostics.rs
use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

pub const UNREACHABLE_NODE: &str = "UNREACHABLE_NODE";
pub const INVALID_SEQUENCE_REF: &str = "INVALID_SEQUENCE_REF";
pub const NO_START_EVENT: &str = "NO_START_EVENT";
pub const LOW_CONFIDENCE_MATCH: &str = "LOW_CONFIDENCE_MATCH";
pub const AMBIGUOUS_CALL_ACTIVITY: &str = "AMBIGUOUS_CALL_ACTIVITY";
pub const UNRESOLVED_CALL_ACTIVITY: &str = "UNRESOLVED_CALL_ACTIVITY";
pub const NO_ROOT_CANDIDATE: &str = "NO_ROOT_CANDIDATE";
pub const DELEGATION_CYCLE: &str = "DELEGATION_CYCLE";
pub const CYCLE_DETECTED: &str = "CYCLE_DETECTED";
pub const MISSING_SUBPROCESS: &str = "MISSING_SUBPROCESS";
pub const PARSE_WARNING: &str = "PARSE_WARNING";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Structured, non-fatal finding attached to a graph or tree element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsEntry {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl DiagnosticsEntry {
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.to_string(),
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

/// Accumulates diagnostics keyed by the element they concern.
///
/// Entries are only ever appended; `take` hands them over to the node they concern.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticsCollector {
    by_element: BTreeMap<String, Vec<DiagnosticsEntry>>,
}

impl DiagnosticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element_id: &str, entry: DiagnosticsEntry) {
        self.by_element
            .entry(element_id.to_string())
            .or_default()
            .push(entry);
    }

    pub fn for_element(&self, element_id: &str) -> &[DiagnosticsEntry] {
        self.by_element
            .get(element_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn take(&mut self, element_id: &str) -> Vec<DiagnosticsEntry> {
        self.by_element.remove(element_id).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_element.values().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.by_element.values().map(Vec::len).sum()
    }

    /// Element ids that still hold entries, in sorted order
    pub fn element_ids(&self) -> Vec<String> {
        self.by_element.keys().cloned().collect()
    }
}

/// Counts of diagnostics by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsSummary {
    pub warnings: usize,
    pub errors: usize,
}

impl DiagnosticsSummary {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a DiagnosticsEntry>) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            match entry.severity {
                Severity::Warning => summary.warnings += 1,
                Severity::Error => summary.errors += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.warnings + self.errors
    }
}
