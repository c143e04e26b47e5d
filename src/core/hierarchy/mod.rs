// src/core/hierarchy/mod.rs
//! Cross-file process hierarchy
//!
//! Builds one directed graph over every loaded BPMN file, resolving call
//! activities to the subprocess files they delegate to, and derives ordered
//! trees from it for documentation and test generation.

mod diagnostics;
mod resolver;
mod sequence;
mod graph_builder;
mod tree_builder;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use diagnostics::{
    DiagnosticsCollector, DiagnosticsEntry, DiagnosticsSummary, Severity,
    AMBIGUOUS_CALL_ACTIVITY, CYCLE_DETECTED, DELEGATION_CYCLE, INVALID_SEQUENCE_REF,
    LOW_CONFIDENCE_MATCH, MISSING_SUBPROCESS, NO_ROOT_CANDIDATE, NO_START_EVENT,
    PARSE_WARNING, UNREACHABLE_NODE, UNRESOLVED_CALL_ACTIVITY,
};
pub use resolver::{
    CallActivityResolution, MatchStrategy, NameNormalizer, ResolutionOutcome,
    SubprocessResolver, UnresolvedReason,
};
pub use sequence::{OrderInfo, SequenceOrder, SequenceOrderer};
pub use graph_builder::{
    node_id, Edge, EdgeKind, GraphBuilder, GraphNode, MissingDependency, MissingReason,
    NodeType, ProcessGraph,
};
pub use tree_builder::{GraphSummary, PlaceholderKind, ProcessTreeNode, TreeBuilder};
