//! LLM integration for refining the subprocess map
//!
//! Call activities the heuristics could not settle are described to an LLM
//! provider, which proposes the subprocess file. Only confident answers that
//! point at a loaded file are written back, and manual mappings are never
//! touched.

mod refiner;
mod providers;

pub use refiner::{
    refine_map, RefinementReport, RefinementRequest, RefinementSuggestion, SubprocessRefiner,
    REFINEMENT_CONFIDENCE_THRESHOLD,
};
pub use providers::{create_refiner, OpenAiRefiner};
