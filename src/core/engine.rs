// src/core/engine.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Result;
use serde::{Serialize, Deserialize};
use tracing::{info, warn, debug};

use crate::config::Config;
use super::hierarchy::{
    DiagnosticsEntry, DiagnosticsSummary, GraphBuilder, GraphSummary, ProcessGraph, ProcessTreeNode,
    Severity, TreeBuilder,
};
use super::llm::{create_refiner, refine_map, SubprocessRefiner};
use super::loader::{MetadataLoader, MetadataSet};
use super::subprocess_map::SubprocessMap;

/// Everything `build` writes out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyReport {
    /// Hash over the metadata documents and the subprocess map
    pub fingerprint: String,
    /// Summary of the tree below the primary root
    pub summary: Option<GraphSummary>,
    pub diagnostics: DiagnosticsSummary,
    /// One tree per root, primary root first
    pub trees: Vec<ProcessTreeNode>,
    pub graph: ProcessGraph,
}

/// Main orchestration engine
pub struct Engine {
    config: Config,
    loader: MetadataLoader,
    graph_builder: GraphBuilder,
    refiner: Option<Box<dyn SubprocessRefiner>>,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        debug!("Using configuration: {:?}", config);

        let refiner = if config.llm.enabled {
            match create_refiner(&config.llm) {
                Ok(refiner) => {
                    info!("LLM refinement enabled: {}", refiner.provider_name());
                    Some(refiner)
                }
                Err(e) => {
                    warn!("Failed to initialize LLM refiner: {}", e);
                    warn!("Continuing without LLM refinement");
                    None
                }
            }
        } else {
            debug!("LLM refinement disabled");
            None
        };

        Self {
            graph_builder: GraphBuilder::new(config.hierarchy.root_tie_break),
            loader: MetadataLoader::new(),
            config,
            refiner,
        }
    }

    /// Swap in a refiner regardless of configuration
    pub fn with_refiner(mut self, refiner: Box<dyn SubprocessRefiner>) -> Self {
        self.refiner = Some(refiner);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn load_inputs(&self) -> Result<(MetadataSet, SubprocessMap)> {
        let metadata = self.loader.load_directory(&self.config.input.metadata_dir)?;

        let map = match &self.config.input.subprocess_map {
            Some(path) if path.exists() => {
                let map = SubprocessMap::load(path)?;
                info!("Loaded subprocess map {} ({} mappings)", path.display(), map.mappings().count());
                map
            }
            Some(path) => {
                debug!("Subprocess map {} does not exist, starting empty", path.display());
                SubprocessMap::new()
            }
            None => SubprocessMap::new(),
        };

        Ok((metadata, map))
    }

    fn build_graph(&self, metadata: &MetadataSet, map: &SubprocessMap) -> Result<ProcessGraph> {
        let graph = self.graph_builder.build(
            &metadata.metadata(),
            map,
            self.config.hierarchy.preferred_root.as_deref(),
        )?;
        Ok(graph)
    }

    /// Build one tree per root; roots are expanded on the blocking pool in parallel
    async fn build_trees(&self, graph: Arc<ProcessGraph>) -> Result<Vec<ProcessTreeNode>> {
        let handles: Vec<_> = graph
            .roots
            .iter()
            .cloned()
            .map(|root| {
                let graph = Arc::clone(&graph);
                tokio::task::spawn_blocking(move || TreeBuilder::new().build_tree(&graph, &root))
            })
            .collect();

        let mut trees = Vec::with_capacity(handles.len());
        for handle in handles {
            trees.push(handle.await??);
        }

        info!("Built {} process trees", trees.len());
        Ok(trees)
    }

    /// Load, resolve and build everything without writing anything
    pub async fn build_report(&self) -> Result<HierarchyReport> {
        let (metadata, map) = self.load_inputs()?;
        let fingerprint = metadata.fingerprint(Some(&map))?;
        debug!("Input fingerprint: {}", fingerprint);

        let graph = Arc::new(self.build_graph(&metadata, &map)?);
        let trees = self.build_trees(Arc::clone(&graph)).await?;

        let summary = trees.first().map(|tree| GraphSummary::new(&graph, tree));
        let diagnostics = DiagnosticsSummary::from_entries(collect_diagnostics(&graph, &trees));
        let graph = Arc::try_unwrap(graph).unwrap_or_else(|shared| (*shared).clone());

        Ok(HierarchyReport {
            fingerprint,
            summary,
            diagnostics,
            trees,
            graph,
        })
    }

    /// Build the hierarchy and write the report as JSON
    pub async fn build(&self, output: Option<PathBuf>) -> Result<()> {
        info!("Building process hierarchy from {}", self.config.input.metadata_dir.display());

        let report = self.build_report().await?;
        let content = if self.config.output.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };

        match output.or_else(|| self.config.output.path.clone()) {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, content)?;
                info!("Wrote hierarchy report to {}", path.display());
            }
            None => println!("{}", content),
        }

        log_diagnostics_summary(&report.diagnostics);
        Ok(())
    }

    /// Log the summary of the primary tree
    pub async fn summary(&self) -> Result<()> {
        let report = self.build_report().await?;

        match &report.summary {
            Some(summary) => {
                let root = report.trees.first().map(|tree| tree.name.as_str()).unwrap_or_default();
                info!("Root process: {}", root);
                info!("  - {} files loaded", summary.total_files);
                info!("  - {} files in the tree", summary.files_included.len());
                info!("  - {} tree nodes", summary.total_nodes);
                info!("  - hierarchy depth {}", summary.hierarchy_depth);
            }
            None => warn!("No root process could be determined"),
        }

        info!("  - {} missing dependencies", report.graph.missing_dependencies.len());
        info!("  - {} delegation cycles", report.graph.cycles.len());
        log_diagnostics_summary(&report.diagnostics);
        Ok(())
    }

    /// Write resolver outcomes back into the subprocess map, optionally refining them
    pub async fn map(&self, refine: bool, output: Option<PathBuf>) -> Result<()> {
        let (metadata, mut map) = self.load_inputs()?;
        let graph = self.build_graph(&metadata, &map)?;

        let changed = map.merge_resolutions(&graph.resolutions);
        info!("Merged {} resolutions ({} mappings changed)", graph.resolutions.len(), changed);

        if refine {
            match &self.refiner {
                Some(refiner) => {
                    let report = refine_map(&mut map, refiner.as_ref(), &metadata.file_names()).await;
                    info!(
                        "Refinement: {} consulted, {} applied",
                        report.consulted, report.applied
                    );
                }
                None => warn!("Refinement requested but no LLM refiner is configured"),
            }
        }

        let target = output
            .or_else(|| self.config.input.subprocess_map.clone())
            .unwrap_or_else(|| PathBuf::from("bpmn-map.json"));
        map.save(&target)?;
        info!("Wrote subprocess map to {}", target.display());
        Ok(())
    }

    /// Fail when the hierarchy carries error diagnostics, or any diagnostics when strict
    pub async fn validate(&self, strict: bool) -> Result<()> {
        info!("Validating process hierarchy...");

        let report = self.build_report().await?;
        let entries = collect_diagnostics(&report.graph, &report.trees);

        for entry in &entries {
            match entry.severity {
                Severity::Error => warn!("[{}] {}", entry.code, entry.message),
                Severity::Warning if strict => warn!("[{}] {}", entry.code, entry.message),
                Severity::Warning => debug!("[{}] {}", entry.code, entry.message),
            }
        }

        let summary = report.diagnostics;
        if summary.errors > 0 || (strict && summary.total() > 0) {
            return Err(anyhow::anyhow!(
                "Hierarchy validation failed: {} errors, {} warnings",
                summary.errors,
                summary.warnings
            ));
        }

        info!("Hierarchy validation passed ({} warnings)", summary.warnings);
        Ok(())
    }
}

/// Graph diagnostics plus those only present on tree placeholders
fn collect_diagnostics<'a>(graph: &'a ProcessGraph, trees: &'a [ProcessTreeNode]) -> Vec<&'a DiagnosticsEntry> {
    graph
        .all_diagnostics()
        .chain(
            trees
                .iter()
                .flat_map(|tree| tree.walk())
                .filter(|node| node.is_placeholder())
                .flat_map(|node| node.diagnostics.iter()),
        )
        .collect()
}

fn log_diagnostics_summary(summary: &DiagnosticsSummary) {
    if summary.errors > 0 {
        warn!("{} errors, {} warnings", summary.errors, summary.warnings);
    } else {
        info!("{} errors, {} warnings", summary.errors, summary.warnings);
    }
}

/// Write a default configuration file
pub fn write_default_config(path: &Path) -> Result<()> {
    Config::default().save(path)?;
    info!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use predicates::prelude::*;
    use crate::core::hierarchy::{CYCLE_DETECTED, MISSING_SUBPROCESS};
    use crate::core::llm::{RefinementRequest, RefinementSuggestion};
    use crate::core::subprocess_map::MappingSource;

    const APPLICATION: &str = r#"{
        "file_name": "mortgage-se-application.bpmn",
        "processes": [{
            "process_id": "mortgage-se-application",
            "name": "Application",
            "events": [
                { "id": "start", "kind": "start" },
                { "id": "end", "kind": "end" }
            ],
            "call_activities": [
                { "id": "internal-data-gathering", "name": "Internal data gathering" },
                { "id": "household", "name": "Household" }
            ],
            "sequence_flows": [
                { "source_id": "start", "target_id": "internal-data-gathering" },
                { "source_id": "internal-data-gathering", "target_id": "household" },
                { "source_id": "household", "target_id": "end" }
            ]
        }]
    }"#;

    const DATA_GATHERING: &str = r#"{
        "file_name": "mortgage-se-internal-data-gathering.bpmn",
        "processes": [{
            "process_id": "internal-data-gathering",
            "tasks": [{ "id": "fetch-party-information", "kind": "serviceTask" }]
        }]
    }"#;

    fn workspace(documents: &[(&str, &str)]) -> (assert_fs::TempDir, Config) {
        let temp = assert_fs::TempDir::new().unwrap();
        for (name, content) in documents {
            temp.child("metadata").child(name).write_str(content).unwrap();
        }

        let mut config = Config::default();
        config.input.metadata_dir = temp.child("metadata").path().to_path_buf();
        config.input.subprocess_map = Some(temp.child("bpmn-map.json").path().to_path_buf());
        (temp, config)
    }

    struct FixedRefiner;

    #[async_trait::async_trait]
    impl SubprocessRefiner for FixedRefiner {
        async fn refine(&self, request: RefinementRequest) -> crate::error::Result<RefinementSuggestion> {
            Ok(RefinementSuggestion {
                suggested_file: request.candidate_files.first().cloned(),
                confidence: 0.95,
                rationale: None,
            })
        }

        fn provider_name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_build_report_for_partial_load() {
        let (_temp, config) = workspace(&[
            ("application.json", APPLICATION),
            ("data-gathering.json", DATA_GATHERING),
        ]);

        let report = Engine::new(config).build_report().await.unwrap();
        let summary = report.summary.unwrap();
        assert_eq!(summary.total_files, 2);
        assert_eq!(summary.hierarchy_depth, 4);
        assert_eq!(report.trees.len(), 1);
        assert_eq!(report.graph.missing_dependencies.len(), 1);

        let household = &report.trees[0].children[1];
        assert_eq!(household.children[0].diagnostics[0].code, MISSING_SUBPROCESS);
        assert!(report.diagnostics.errors >= 2);
    }

    #[tokio::test]
    async fn test_build_writes_report_file() {
        let (temp, config) = workspace(&[("data-gathering.json", DATA_GATHERING)]);
        let output = temp.child("out/report.json");

        Engine::new(config).build(Some(output.path().to_path_buf())).await.unwrap();

        output.assert(predicate::path::exists());
        output.assert(predicate::str::contains("\"fingerprint\""));
        output.assert(predicate::str::contains("fetch-party-information"));
    }

    #[tokio::test]
    async fn test_validate_fails_on_errors_and_strict_warnings() {
        let (_temp, config) = workspace(&[("application.json", APPLICATION)]);
        assert!(Engine::new(config).validate(false).await.is_err());

        // an unconnected task is only a warning
        let orphan = r#"{ "file_name": "orphan.bpmn", "processes": [{ "process_id": "orphan",
            "events": [{ "id": "start", "kind": "start" }],
            "tasks": [{ "id": "forgotten", "kind": "userTask" }] }] }"#;
        let (_temp, config) = workspace(&[("orphan.json", orphan)]);
        let engine = Engine::new(config);
        assert!(engine.validate(false).await.is_ok());
        assert!(engine.validate(true).await.is_err());
    }

    #[tokio::test]
    async fn test_cycles_end_in_placeholders() {
        let a = r#"{ "file_name": "a.bpmn", "processes": [{ "process_id": "a",
            "call_activities": [{ "id": "to-b", "name": "B" }] }] }"#;
        let b = r#"{ "file_name": "b.bpmn", "processes": [{ "process_id": "b",
            "call_activities": [{ "id": "to-a", "name": "A" }] }] }"#;
        let (_temp, mut config) = workspace(&[("a.json", a), ("b.json", b)]);
        config.hierarchy.preferred_root = Some("a".to_string());

        let report = Engine::new(config).build_report().await.unwrap();
        let placeholder = report.trees[0]
            .walk()
            .into_iter()
            .find(|node| node.is_placeholder())
            .cloned()
            .unwrap();
        assert_eq!(placeholder.diagnostics[0].code, CYCLE_DETECTED);
        assert_eq!(report.graph.cycles.len(), 1);
    }

    #[tokio::test]
    async fn test_map_merges_and_refines() {
        let (temp, config) = workspace(&[
            ("application.json", APPLICATION),
            ("data-gathering.json", DATA_GATHERING),
        ]);

        let engine = Engine::new(config).with_refiner(Box::new(FixedRefiner));
        engine.map(true, None).await.unwrap();

        let map = SubprocessMap::load(temp.child("bpmn-map.json").path()).unwrap();
        let gathering = map
            .lookup("mortgage-se-application.bpmn", "internal-data-gathering")
            .unwrap();
        assert_eq!(
            gathering.subprocess_bpmn_file.as_deref(),
            Some("mortgage-se-internal-data-gathering.bpmn")
        );
        assert_eq!(gathering.source, MappingSource::Llm);

        let household = map.lookup("mortgage-se-application.bpmn", "household").unwrap();
        assert_eq!(household.source, MappingSource::Llm);

        // rerunning without refinement keeps the refined answers as they are
        engine.map(false, None).await.unwrap();
        let rerun = SubprocessMap::load(temp.child("bpmn-map.json").path()).unwrap();
        assert_eq!(rerun, map);
    }

    #[test]
    fn test_write_default_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.child("bpmn-hierarchy.toml");
        write_default_config(path.path()).unwrap();
        path.assert(predicate::str::contains("[hierarchy]"));
        assert!(Config::load(path.path()).is_ok());
    }
}
