// src/core/hierarchy/resolver.rs
use regex::Regex;
use serde::{Serialize, Deserialize};
use tracing::debug;

use super::super::metadata::{file_stem, CallActivityRef, ProcessMetadata};
use super::super::subprocess_map::{MatchStatus, SubprocessMap};

/// How confident the resolver is about a call activity's target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ResolutionOutcome {
    Matched {
        file: String,
        /// Target process inside `file`; the file's first process when unset
        process_id: Option<String>,
        strategy: MatchStrategy,
        needs_manual_review: bool,
    },
    Ambiguous {
        candidates: Vec<String>,
    },
    Unresolved {
        reason: UnresolvedReason,
    },
}

impl ResolutionOutcome {
    pub fn matched_file(&self) -> Option<&str> {
        match self {
            ResolutionOutcome::Matched { file, .. } => Some(file),
            _ => None,
        }
    }
}

/// Outcome of resolving one call activity, with enough context to revisit it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallActivityResolution {
    pub owning_file: String,
    pub owning_process_id: String,
    pub call_activity_id: String,
    pub call_activity_name: Option<String>,
    pub called_element_id: Option<String>,
    pub outcome: ResolutionOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchStrategy {
    SubprocessMap,
    CalledElement,
    NameHeuristic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UnresolvedReason {
    /// Nothing in the map, the called element or the name pointed anywhere
    NoCandidate,
    /// The map names a file that is not among the loaded files
    MappedFileNotLoaded { file: String },
    /// The name heuristic matched more than one file
    AmbiguousName { candidates: Vec<String> },
}

/// Normalizes display names and file stems for comparison.
///
/// Case-folds and collapses every run of non-alphanumerics (spaces, hyphens,
/// underscores, punctuation) into a single `-`.
pub struct NameNormalizer {
    non_alphanumeric: Regex,
}

impl NameNormalizer {
    pub fn new() -> Self {
        Self {
            non_alphanumeric: Regex::new(r"[^a-z0-9]+").expect("Invalid separator regex"),
        }
    }

    pub fn normalize(&self, value: &str) -> String {
        let lowered = value.to_lowercase();
        self.non_alphanumeric
            .replace_all(&lowered, "-")
            .trim_matches('-')
            .to_string()
    }
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

struct CatalogFile {
    file_name: String,
    normalized_stem: String,
    /// (process id, normalized process id, normalized display name)
    processes: Vec<(String, String, Option<String>)>,
}

/// Resolves call activities to subprocess files.
///
/// Priority: subprocess map, `calledElement`, then the name heuristic. A
/// manual map entry is final, even when it points at a file that is not loaded.
pub struct SubprocessResolver<'a> {
    map: &'a SubprocessMap,
    catalog: Vec<CatalogFile>,
    normalizer: NameNormalizer,
}

impl<'a> SubprocessResolver<'a> {
    pub fn new(files: &[ProcessMetadata], map: &'a SubprocessMap) -> Self {
        let normalizer = NameNormalizer::new();
        let catalog = files
            .iter()
            .map(|metadata| CatalogFile {
                file_name: metadata.file_name.clone(),
                normalized_stem: normalizer.normalize(metadata.file_stem()),
                processes: metadata
                    .processes
                    .iter()
                    .map(|process| {
                        (
                            process.process_id.clone(),
                            normalizer.normalize(&process.process_id),
                            process.name.as_deref().map(|name| normalizer.normalize(name)),
                        )
                    })
                    .collect(),
            })
            .collect();

        Self {
            map,
            catalog,
            normalizer,
        }
    }

    /// Loaded file name matching `file`, by exact name or by stem
    pub fn loaded_file(&self, file: &str) -> Option<&str> {
        self.catalog
            .iter()
            .find(|entry| entry.file_name == file)
            .or_else(|| {
                let stem = file_stem(file);
                self.catalog
                    .iter()
                    .find(|entry| file_stem(&entry.file_name) == stem)
            })
            .map(|entry| entry.file_name.as_str())
    }

    pub fn resolve(&self, call_activity: &CallActivityRef, owning_file: &str) -> ResolutionOutcome {
        if let Some(outcome) = self.resolve_from_map(call_activity, owning_file) {
            return outcome;
        }

        if let Some(outcome) = self.resolve_called_element(call_activity) {
            return outcome;
        }

        match self.resolve_by_name(call_activity, owning_file) {
            NameMatch::Unique { file, process_id } => {
                debug!("Name heuristic matched {} -> {}", call_activity.id, file);
                ResolutionOutcome::Matched {
                    file,
                    process_id,
                    strategy: MatchStrategy::NameHeuristic,
                    needs_manual_review: true,
                }
            }
            NameMatch::Several(candidates) => ResolutionOutcome::Unresolved {
                reason: UnresolvedReason::AmbiguousName { candidates },
            },
            NameMatch::None => ResolutionOutcome::Unresolved {
                reason: UnresolvedReason::NoCandidate,
            },
        }
    }

    fn resolve_from_map(&self, call_activity: &CallActivityRef, owning_file: &str) -> Option<ResolutionOutcome> {
        let mapping = self.map.lookup(owning_file, &call_activity.id)?;

        if mapping.match_status == MatchStatus::Unresolved && !mapping.is_manual() {
            return None;
        }

        match mapping.subprocess_bpmn_file.as_deref() {
            Some(mapped) => match self.loaded_file(mapped) {
                Some(file) => Some(ResolutionOutcome::Matched {
                    file: file.to_string(),
                    process_id: None,
                    strategy: MatchStrategy::SubprocessMap,
                    needs_manual_review: mapping.needs_manual_review,
                }),
                // A renamed file may still be found below, unless a human pinned it
                None if mapping.is_manual() => Some(ResolutionOutcome::Unresolved {
                    reason: UnresolvedReason::MappedFileNotLoaded {
                        file: mapped.to_string(),
                    },
                }),
                None => None,
            },
            None if mapping.is_manual() && mapping.match_status == MatchStatus::Unresolved => {
                Some(ResolutionOutcome::Unresolved {
                    reason: UnresolvedReason::NoCandidate,
                })
            }
            None => None,
        }
    }

    fn resolve_called_element(&self, call_activity: &CallActivityRef) -> Option<ResolutionOutcome> {
        let called = call_activity.called_element_id.as_deref()?;

        let files: Vec<&str> = self
            .catalog
            .iter()
            .filter(|entry| entry.processes.iter().any(|(id, _, _)| id == called))
            .map(|entry| entry.file_name.as_str())
            .collect();

        match files.as_slice() {
            [] => None,
            [file] => Some(ResolutionOutcome::Matched {
                file: file.to_string(),
                process_id: Some(called.to_string()),
                strategy: MatchStrategy::CalledElement,
                needs_manual_review: false,
            }),
            several => Some(ResolutionOutcome::Ambiguous {
                candidates: several.iter().map(|f| f.to_string()).collect(),
            }),
        }
    }

    fn resolve_by_name(&self, call_activity: &CallActivityRef, owning_file: &str) -> NameMatch {
        let display = call_activity.name.as_deref().unwrap_or(&call_activity.id);
        let key = self.normalizer.normalize(display);
        if key.is_empty() {
            return NameMatch::None;
        }
        let suffix = format!("-{}", key);

        let mut hits: Vec<(String, Option<String>)> = Vec::new();
        for entry in self.catalog.iter().filter(|entry| entry.file_name != owning_file) {
            let by_process = entry
                .processes
                .iter()
                .find(|(_, id, name)| *id == key || name.as_deref() == Some(key.as_str()))
                .map(|(id, _, _)| id.clone());

            let by_stem = entry.normalized_stem == key || entry.normalized_stem.ends_with(&suffix);

            if by_process.is_some() || by_stem {
                hits.push((entry.file_name.clone(), by_process));
            }
        }

        match hits.len() {
            0 => NameMatch::None,
            1 => {
                let (file, process_id) = hits.remove(0);
                NameMatch::Unique { file, process_id }
            }
            _ => NameMatch::Several(hits.into_iter().map(|(file, _)| file).collect()),
        }
    }
}

enum NameMatch {
    Unique { file: String, process_id: Option<String> },
    Several(Vec<String>),
    None,
}
