//! Declarative process-to-file associations, authored outside this crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use super::hierarchy::{CallActivityResolution, ResolutionOutcome};

/// The subprocess map document, keyed by internal process id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubprocessMap {
    pub entries: BTreeMap<String, SubprocessMapEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubprocessMapEntry {
    pub bpmn_file: String,
    pub process_id: String,
    #[serde(default)]
    pub call_activities: Vec<CallActivityMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallActivityMapping {
    pub bpmn_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub called_element: Option<String>,
    #[serde(default)]
    pub subprocess_bpmn_file: Option<String>,
    pub match_status: MatchStatus,
    #[serde(default)]
    pub needs_manual_review: bool,
    pub source: MappingSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Matched,
    Unresolved,
    Ambiguous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingSource {
    Manual,
    Heuristic,
    Llm,
}

impl CallActivityMapping {
    /// Manual mappings are never rewritten by resolution or refinement
    pub fn is_manual(&self) -> bool {
        self.source == MappingSource::Manual
    }

    /// Whether an LLM may be asked about this mapping
    pub fn wants_refinement(&self) -> bool {
        !self.is_manual()
            && (self.needs_manual_review || self.match_status == MatchStatus::Unresolved)
    }
}

impl SubprocessMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: SubprocessMapEntry) {
        self.entries.insert(key.into(), entry);
    }

    /// Mapping recorded for a call activity declared in `owning_file`
    pub fn lookup(&self, owning_file: &str, call_activity_id: &str) -> Option<&CallActivityMapping> {
        self.entries
            .values()
            .filter(|entry| entry.bpmn_file == owning_file)
            .flat_map(|entry| entry.call_activities.iter())
            .find(|mapping| mapping.bpmn_id == call_activity_id)
    }

    fn lookup_mut(&mut self, owning_file: &str, call_activity_id: &str) -> Option<&mut CallActivityMapping> {
        self.entries
            .values_mut()
            .filter(|entry| entry.bpmn_file == owning_file)
            .flat_map(|entry| entry.call_activities.iter_mut())
            .find(|mapping| mapping.bpmn_id == call_activity_id)
    }

    /// Iterate over every call activity mapping with its owning file
    pub fn mappings(&self) -> impl Iterator<Item = (&str, &CallActivityMapping)> {
        self.entries.values().flat_map(|entry| {
            entry
                .call_activities
                .iter()
                .map(move |mapping| (entry.bpmn_file.as_str(), mapping))
        })
    }

    pub(crate) fn mappings_mut(&mut self) -> impl Iterator<Item = (&str, &mut CallActivityMapping)> {
        self.entries.values_mut().flat_map(|entry| {
            let file = entry.bpmn_file.as_str();
            entry.call_activities.iter_mut().map(move |mapping| (file, mapping))
        })
    }

    /// Write resolver outcomes back into the map as heuristic entries.
    ///
    /// Manual mappings are left exactly as they are, and LLM mappings the
    /// resolvers agree with keep their source. Returns the number of
    /// mappings created or changed.
    pub fn merge_resolutions(&mut self, resolutions: &[CallActivityResolution]) -> usize {
        let mut changed = 0;

        for resolution in resolutions {
            let proposed = proposed_mapping(resolution);

            if let Some(existing) = self.lookup_mut(&resolution.owning_file, &resolution.call_activity_id) {
                if existing.is_manual() {
                    debug!("Keeping manual mapping for {}:{}", resolution.owning_file, resolution.call_activity_id);
                    continue;
                }
                if existing.source == MappingSource::Llm
                    && existing.subprocess_bpmn_file == proposed.subprocess_bpmn_file
                    && existing.match_status == proposed.match_status
                {
                    // same answer the refiner gave, keep its provenance
                    continue;
                }
                if *existing != proposed {
                    *existing = proposed;
                    changed += 1;
                }
                continue;
            }

            let key = self
                .entries
                .iter()
                .find(|(_, entry)| {
                    entry.bpmn_file == resolution.owning_file && entry.process_id == resolution.owning_process_id
                })
                .map(|(key, _)| key.clone())
                .unwrap_or_else(|| format!("{}:{}", resolution.owning_file, resolution.owning_process_id));

            self.entries
                .entry(key)
                .or_insert_with(|| SubprocessMapEntry {
                    bpmn_file: resolution.owning_file.clone(),
                    process_id: resolution.owning_process_id.clone(),
                    call_activities: Vec::new(),
                })
                .call_activities
                .push(proposed);
            changed += 1;
        }

        changed
    }
}

fn proposed_mapping(resolution: &CallActivityResolution) -> CallActivityMapping {
    let (subprocess_bpmn_file, match_status, needs_manual_review) = match &resolution.outcome {
        ResolutionOutcome::Matched { file, needs_manual_review, .. } => {
            (Some(file.clone()), MatchStatus::Matched, *needs_manual_review)
        }
        ResolutionOutcome::Ambiguous { .. } => (None, MatchStatus::Ambiguous, true),
        ResolutionOutcome::Unresolved { .. } => (None, MatchStatus::Unresolved, true),
    };

    CallActivityMapping {
        bpmn_id: resolution.call_activity_id.clone(),
        name: resolution.call_activity_name.clone(),
        called_element: resolution.called_element_id.clone(),
        subprocess_bpmn_file,
        match_status,
        needs_manual_review,
        source: MappingSource::Heuristic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hierarchy::{MatchStrategy, UnresolvedReason};

    fn resolution(id: &str, outcome: ResolutionOutcome) -> CallActivityResolution {
        CallActivityResolution {
            owning_file: "root.bpmn".to_string(),
            owning_process_id: "root".to_string(),
            call_activity_id: id.to_string(),
            call_activity_name: Some(id.to_string()),
            called_element_id: None,
            outcome,
        }
    }

    fn manual_map() -> SubprocessMap {
        let mut map = SubprocessMap::new();
        map.insert(
            "root",
            SubprocessMapEntry {
                bpmn_file: "root.bpmn".to_string(),
                process_id: "root".to_string(),
                call_activities: vec![CallActivityMapping {
                    bpmn_id: "a".to_string(),
                    name: Some("A".to_string()),
                    called_element: None,
                    subprocess_bpmn_file: Some("manual-a.bpmn".to_string()),
                    match_status: MatchStatus::Matched,
                    needs_manual_review: false,
                    source: MappingSource::Manual,
                }],
            },
        );
        map
    }

    #[test]
    fn test_merge_never_touches_manual_entries() {
        let mut map = manual_map();
        let before = map.clone();

        let resolutions = vec![resolution(
            "a",
            ResolutionOutcome::Matched {
                file: "other.bpmn".to_string(),
                process_id: None,
                strategy: MatchStrategy::NameHeuristic,
                needs_manual_review: true,
            },
        )];

        for _ in 0..3 {
            assert_eq!(map.merge_resolutions(&resolutions), 0);
        }
        assert_eq!(map, before);
    }

    #[test]
    fn test_merge_adds_heuristic_entries_under_owning_process() {
        let mut map = manual_map();
        let resolutions = vec![resolution(
            "b",
            ResolutionOutcome::Unresolved {
                reason: UnresolvedReason::NoCandidate,
            },
        )];

        assert_eq!(map.merge_resolutions(&resolutions), 1);
        let added = map.lookup("root.bpmn", "b").unwrap();
        assert_eq!(added.match_status, MatchStatus::Unresolved);
        assert_eq!(added.source, MappingSource::Heuristic);
        assert!(added.wants_refinement());
        assert_eq!(map.entries["root"].call_activities.len(), 2);
    }

    #[test]
    fn test_merge_keeps_llm_source_when_resolution_agrees() {
        let mut map = manual_map();
        map.entries.get_mut("root").unwrap().call_activities.push(CallActivityMapping {
            bpmn_id: "b".to_string(),
            name: Some("B".to_string()),
            called_element: None,
            subprocess_bpmn_file: Some("llm-b.bpmn".to_string()),
            match_status: MatchStatus::Matched,
            needs_manual_review: false,
            source: MappingSource::Llm,
        });
        let before = map.clone();

        let resolutions = vec![resolution(
            "b",
            ResolutionOutcome::Matched {
                file: "llm-b.bpmn".to_string(),
                process_id: Some("b".to_string()),
                strategy: MatchStrategy::SubprocessMap,
                needs_manual_review: false,
            },
        )];

        for _ in 0..2 {
            assert_eq!(map.merge_resolutions(&resolutions), 0);
        }
        assert_eq!(map, before);
        assert_eq!(map.lookup("root.bpmn", "b").unwrap().source, MappingSource::Llm);

        // a different answer replaces it
        let moved = vec![resolution(
            "b",
            ResolutionOutcome::Matched {
                file: "other-b.bpmn".to_string(),
                process_id: None,
                strategy: MatchStrategy::CalledElement,
                needs_manual_review: false,
            },
        )];
        assert_eq!(map.merge_resolutions(&moved), 1);
        assert_eq!(map.lookup("root.bpmn", "b").unwrap().source, MappingSource::Heuristic);
    }

    #[test]
    fn test_map_json_uses_snake_case_document_shape() {
        let json = r#"{
            "mortgage": {
                "bpmn_file": "mortgage.bpmn",
                "process_id": "mortgage",
                "call_activities": [{
                    "bpmn_id": "household",
                    "name": "Household",
                    "called_element": null,
                    "subprocess_bpmn_file": "mortgage-se-household.bpmn",
                    "match_status": "matched",
                    "needs_manual_review": false,
                    "source": "manual"
                }]
            }
        }"#;
        let map: SubprocessMap = serde_json::from_str(json).unwrap();
        let mapping = map.lookup("mortgage.bpmn", "household").unwrap();
        assert!(mapping.is_manual());
        assert!(!mapping.wants_refinement());
    }
}
