use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use super::super::subprocess_map::{MappingSource, MatchStatus, SubprocessMap};

/// Suggestions below this confidence are never applied
pub const REFINEMENT_CONFIDENCE_THRESHOLD: f32 = 0.8;

/// Everything a provider is told about one doubtful call activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementRequest {
    /// File declaring the call activity
    pub owning_file: String,
    pub call_activity_id: String,
    pub call_activity_name: Option<String>,
    pub called_element: Option<String>,
    /// File the heuristic settled on, if any
    pub current_file: Option<String>,
    /// Loaded files the answer must be chosen from
    pub candidate_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementSuggestion {
    /// `None` when the provider sees no fitting file
    pub suggested_file: Option<String>,
    /// 0.0 to 1.0
    pub confidence: f32,
    #[serde(default)]
    pub rationale: Option<String>,
}

/// A capability that proposes the subprocess file for a call activity
#[async_trait::async_trait]
pub trait SubprocessRefiner: Send + Sync {
    async fn refine(&self, request: RefinementRequest) -> Result<RefinementSuggestion>;

    /// Get the provider name (e.g., "OpenAI gpt-4o-mini")
    fn provider_name(&self) -> &str;
}

/// What one refinement pass did to the map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementReport {
    /// Mappings the provider was asked about
    pub consulted: usize,
    pub applied: usize,
    /// Answers below the threshold, naming no file, or naming a file that is not loaded
    pub rejected: usize,
    /// Provider errors; those mappings are left untouched
    pub failed: usize,
}

/// Ask `refiner` about every non-manual mapping that is flagged for review or
/// unresolved, and apply confident answers that point at a loaded file.
pub async fn refine_map(
    map: &mut SubprocessMap,
    refiner: &dyn SubprocessRefiner,
    loaded_files: &[String],
) -> RefinementReport {
    let requests: Vec<RefinementRequest> = map
        .mappings()
        .filter(|(_, mapping)| mapping.wants_refinement())
        .map(|(owning_file, mapping)| RefinementRequest {
            owning_file: owning_file.to_string(),
            call_activity_id: mapping.bpmn_id.clone(),
            call_activity_name: mapping.name.clone(),
            called_element: mapping.called_element.clone(),
            current_file: mapping.subprocess_bpmn_file.clone(),
            candidate_files: loaded_files
                .iter()
                .filter(|file| file.as_str() != owning_file)
                .cloned()
                .collect(),
        })
        .collect();

    let mut report = RefinementReport::default();
    if requests.is_empty() {
        debug!("No mappings need refinement");
        return report;
    }

    info!("Refining {} mappings with {}", requests.len(), refiner.provider_name());

    for request in requests {
        report.consulted += 1;
        let owning_file = request.owning_file.clone();
        let call_activity_id = request.call_activity_id.clone();

        let suggestion = match refiner.refine(request).await {
            Ok(suggestion) => suggestion,
            Err(e) => {
                warn!("Refinement of {}:{} failed: {}", owning_file, call_activity_id, e);
                report.failed += 1;
                continue;
            }
        };

        let accepted = suggestion
            .suggested_file
            .as_ref()
            .filter(|_| suggestion.confidence >= REFINEMENT_CONFIDENCE_THRESHOLD)
            .filter(|file| loaded_files.contains(*file));

        let Some(file) = accepted else {
            debug!(
                "Rejected suggestion {:?} ({:.2}) for {}:{}",
                suggestion.suggested_file, suggestion.confidence, owning_file, call_activity_id
            );
            report.rejected += 1;
            continue;
        };

        let target = map
            .mappings_mut()
            .find(|(owner, mapping)| *owner == owning_file && mapping.bpmn_id == call_activity_id)
            .map(|(_, mapping)| mapping);

        if let Some(mapping) = target {
            debug!("{}:{} -> {} ({:.2})", owning_file, call_activity_id, file, suggestion.confidence);
            mapping.subprocess_bpmn_file = Some(file.clone());
            mapping.match_status = MatchStatus::Matched;
            mapping.needs_manual_review = false;
            mapping.source = MappingSource::Llm;
            report.applied += 1;
        }
    }

    info!(
        "Refinement finished: {} applied, {} rejected, {} failed",
        report.applied, report.rejected, report.failed
    );
    report
}
