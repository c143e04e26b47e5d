//! Cross-file BPMN process hierarchy.
//!
//! Loads the metadata the BPMN parser extracted from each file, resolves call
//! activities to the files that implement them, and builds a process graph
//! plus ordered trees for documentation and test generation.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;

pub use error::{HierarchyError, Result};
