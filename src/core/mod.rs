// src/core/mod.rs
pub mod metadata;
pub mod subprocess_map;
pub mod loader;
pub mod hierarchy;
pub mod llm;
mod engine;

pub use metadata::{ProcessDefinition, ProcessMetadata};
pub use subprocess_map::{CallActivityMapping, MappingSource, MatchStatus, SubprocessMap, SubprocessMapEntry};
pub use loader::{LoadedFile, MetadataLoader, MetadataSet};
pub use hierarchy::{GraphBuilder, GraphSummary, ProcessGraph, ProcessTreeNode, TreeBuilder};
pub use llm::{refine_map, SubprocessRefiner};

// Export the main engine
pub use engine::{write_default_config, Engine, HierarchyReport};
