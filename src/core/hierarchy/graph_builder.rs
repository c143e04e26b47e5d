// src/core/hierarchy/graph_builder.rs
use std::collections::{BTreeMap, BTreeSet, HashSet};
use serde::{Serialize, Deserialize};
use tracing::{info, debug};

use crate::config::RootTieBreak;
use crate::error::{HierarchyError, Result};
use super::super::metadata::{
    file_stem, CallActivityRef, ElementKind, FlowElement, ProcessDefinition, ProcessMetadata, TaskKind,
};
use super::super::subprocess_map::SubprocessMap;
use super::diagnostics::{
    DiagnosticsEntry, AMBIGUOUS_CALL_ACTIVITY, DELEGATION_CYCLE, LOW_CONFIDENCE_MATCH,
    NO_ROOT_CANDIDATE, PARSE_WARNING, UNRESOLVED_CALL_ACTIVITY,
};
use super::resolver::{CallActivityResolution, ResolutionOutcome, SubprocessResolver, UnresolvedReason};
use super::sequence::{OrderInfo, SequenceOrderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Process,
    CallActivity,
    UserTask,
    ServiceTask,
    BusinessRuleTask,
    Gateway,
    Event,
    SubProcess,
    DmnDecision,
}

impl NodeType {
    /// Interesting nodes are documentable units of work and stay in the tree
    pub fn is_interesting(self) -> bool {
        matches!(
            self,
            NodeType::Process
                | NodeType::CallActivity
                | NodeType::UserTask
                | NodeType::ServiceTask
                | NodeType::BusinessRuleTask
        )
    }
}

impl From<ElementKind> for NodeType {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Task(TaskKind::UserTask) => NodeType::UserTask,
            ElementKind::Task(TaskKind::ServiceTask) => NodeType::ServiceTask,
            ElementKind::Task(TaskKind::BusinessRuleTask) => NodeType::BusinessRuleTask,
            ElementKind::CallActivity => NodeType::CallActivity,
            ElementKind::Gateway(_) => NodeType::Gateway,
            ElementKind::Event(_) => NodeType::Event,
            ElementKind::SubProcess => NodeType::SubProcess,
        }
    }
}

/// Node of the cross-file process graph. Children are referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub node_type: NodeType,
    pub bpmn_file: String,
    pub bpmn_element_id: String,
    /// Top-level process node this node belongs to
    pub process_node: String,
    /// `contains` children, in declaration order
    pub children: Vec<String>,
    pub order_index: Option<u32>,
    pub branch_id: Option<String>,
    /// Position among siblings in the source document
    pub declaration_index: usize,
    /// Target file of a call activity, also set when the mapped file is not loaded
    pub subprocess_file: Option<String>,
    /// Root process node of the resolved subprocess
    pub subprocess_node: Option<String>,
    pub diagnostics: Vec<DiagnosticsEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    Contains,
    DelegatesTo,
    Sequence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub kind: EdgeKind,
    pub source: String,
    pub target: String,
    /// Sequence edge closing a loop; kept but not used for ordering
    #[serde(default)]
    pub loop_back: bool,
}

/// A call activity that could not be tied to exactly one loaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingDependency {
    pub parent_file: String,
    pub child_process_name_or_id: String,
    pub call_activity_node: String,
    pub reason: MissingReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MissingReason {
    NoCandidate,
    MappedFileNotLoaded { file: String },
    AmbiguousName { candidates: Vec<String> },
    AmbiguousCalledElement { candidates: Vec<String> },
    TargetHasNoProcess { file: String },
}

impl MissingReason {
    fn describe(&self) -> String {
        match self {
            MissingReason::NoCandidate => "no loaded file matches".to_string(),
            MissingReason::MappedFileNotLoaded { file } => format!("mapped file {} is not loaded", file),
            MissingReason::AmbiguousName { candidates } => {
                format!("name matches several files: {}", candidates.join(", "))
            }
            MissingReason::AmbiguousCalledElement { candidates } => {
                format!("called element is declared in several files: {}", candidates.join(", "))
            }
            MissingReason::TargetHasNoProcess { file } => format!("{} declares no process", file),
        }
    }
}

/// Directed graph over every loaded file, with its structural findings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessGraph {
    pub nodes: BTreeMap<String, GraphNode>,
    pub edges: BTreeMap<String, Edge>,
    /// Root process nodes; the first one is the primary root
    pub roots: Vec<String>,
    /// Delegation cycles as process node paths, closing node repeated at the end
    pub cycles: Vec<Vec<String>>,
    pub missing_dependencies: Vec<MissingDependency>,
    pub resolutions: Vec<CallActivityResolution>,
    /// File name -> files it delegates to
    pub file_dependencies: BTreeMap<String, BTreeSet<String>>,
    /// Loaded files in input order
    pub files: Vec<String>,
    /// Top-level process nodes in input order
    pub process_nodes: Vec<String>,
    /// Findings not tied to one element
    pub diagnostics: Vec<DiagnosticsEntry>,
}

impl ProcessGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// First process node of a file
    pub fn file_root(&self, file: &str) -> Option<&GraphNode> {
        self.process_nodes
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .find(|node| node.bpmn_file == file)
    }

    /// Locate a top-level process by node id, process id, name, file name or file stem
    pub fn find_process(&self, query: &str) -> Option<&GraphNode> {
        let processes: Vec<&GraphNode> = self
            .process_nodes
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect();

        processes
            .iter()
            .find(|node| node.id == query)
            .or_else(|| processes.iter().find(|node| node.bpmn_element_id == query))
            .or_else(|| processes.iter().find(|node| node.name == query))
            .or_else(|| processes.iter().find(|node| node.bpmn_file == query))
            .or_else(|| {
                processes
                    .iter()
                    .find(|node| file_stem(&node.bpmn_file) == query)
            })
            .copied()
    }

    /// Every diagnostic in the graph: graph-level first, then per node in id order
    pub fn all_diagnostics(&self) -> impl Iterator<Item = &DiagnosticsEntry> {
        self.diagnostics
            .iter()
            .chain(self.nodes.values().flat_map(|node| node.diagnostics.iter()))
    }

    fn add_node(&mut self, node: GraphNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    fn add_edge(&mut self, kind: EdgeKind, source: &str, target: &str, discriminator: Option<usize>, loop_back: bool) {
        let prefix = match kind {
            EdgeKind::Contains => "contains",
            EdgeKind::DelegatesTo => "delegates",
            EdgeKind::Sequence => "sequence",
        };
        let id = match discriminator {
            Some(n) => format!("{}:{}->{}#{}", prefix, source, target, n),
            None => format!("{}:{}->{}", prefix, source, target),
        };
        self.edges.insert(
            id.clone(),
            Edge {
                id,
                kind,
                source: source.to_string(),
                target: target.to_string(),
                loop_back,
            },
        );
    }
}

/// Graph-wide node id for an element of a file
pub fn node_id(file: &str, element_id: &str) -> String {
    format!("{}:{}", file, element_id)
}

struct PendingCall {
    file: String,
    owning_process_id: String,
    process_node: String,
    node: String,
    call: CallActivityRef,
}

/// Builds the cross-file process graph
pub struct GraphBuilder {
    orderer: SequenceOrderer,
    root_tie_break: RootTieBreak,
}

impl GraphBuilder {
    pub fn new(root_tie_break: RootTieBreak) -> Self {
        Self {
            orderer: SequenceOrderer::new(),
            root_tie_break,
        }
    }

    /// Build the graph from every loaded file.
    ///
    /// `files` is taken in input order; that order is the final fallback for
    /// root selection. Fails only when no files are given or the preferred
    /// root does not exist.
    pub fn build(
        &self,
        files: &[ProcessMetadata],
        map: &SubprocessMap,
        preferred_root: Option<&str>,
    ) -> Result<ProcessGraph> {
        if files.is_empty() {
            return Err(HierarchyError::NoFiles);
        }

        let mut seen = HashSet::new();
        for metadata in files {
            if !seen.insert(metadata.file_name.as_str()) {
                return Err(HierarchyError::Metadata(format!(
                    "File {} was supplied more than once",
                    metadata.file_name
                )));
            }
        }

        let mut graph = ProcessGraph {
            files: files.iter().map(|m| m.file_name.clone()).collect(),
            ..Default::default()
        };
        let mut pending = Vec::new();

        for metadata in files {
            for (position, process) in metadata.processes.iter().enumerate() {
                let id = node_id(&metadata.file_name, &process.process_id);
                if graph.nodes.contains_key(&id) {
                    graph.diagnostics.push(
                        DiagnosticsEntry::warning(
                            PARSE_WARNING,
                            format!("Process {} is declared twice in {}", process.process_id, metadata.file_name),
                        )
                        .with_context("file", metadata.file_name.clone()),
                    );
                    continue;
                }
                graph.process_nodes.push(id.clone());
                self.add_container(
                    &mut graph,
                    &mut pending,
                    &metadata.file_name,
                    process,
                    &process.process_id,
                    &id,
                    NodeType::Process,
                    position,
                    None,
                    Vec::new(),
                );
            }
        }

        info!(
            "Materialized {} nodes from {} files ({} call activities)",
            graph.nodes.len(),
            files.len(),
            pending.len()
        );

        let delegations = self.resolve_calls(&mut graph, files, map, pending);
        self.select_roots(&mut graph, preferred_root)?;
        self.detect_cycles(&mut graph, &delegations);

        info!(
            "Built process graph: {} nodes, {} edges, {} roots, {} missing dependencies, {} cycles",
            graph.nodes.len(),
            graph.edges.len(),
            graph.roots.len(),
            graph.missing_dependencies.len(),
            graph.cycles.len()
        );

        Ok(graph)
    }

    /// Materialize a process or embedded subprocess with all of its children
    #[allow(clippy::too_many_arguments)]
    fn add_container(
        &self,
        graph: &mut ProcessGraph,
        pending: &mut Vec<PendingCall>,
        file: &str,
        definition: &ProcessDefinition,
        top_process_id: &str,
        process_node: &str,
        node_type: NodeType,
        declaration_index: usize,
        order: Option<&OrderInfo>,
        mut diagnostics: Vec<DiagnosticsEntry>,
    ) -> String {
        let container_id = node_id(file, &definition.process_id);
        let mut sequence = self.orderer.order(definition);

        for message in &definition.parse_diagnostics {
            diagnostics.push(DiagnosticsEntry::warning(PARSE_WARNING, message.clone()));
        }

        let elements: Vec<FlowElement<'_>> = definition.flow_elements();
        let mut children = Vec::with_capacity(elements.len());

        for element in &elements {
            let child_id = node_id(file, element.id);
            let info = sequence.get(element.id).cloned();
            let element_diagnostics = sequence.diagnostics.take(element.id);

            match element.kind {
                ElementKind::SubProcess => {
                    if let Some(nested) = definition
                        .sub_processes
                        .iter()
                        .find(|sub| sub.process_id == element.id)
                    {
                        self.add_container(
                            graph,
                            pending,
                            file,
                            nested,
                            top_process_id,
                            process_node,
                            NodeType::SubProcess,
                            element.declaration_index,
                            info.as_ref(),
                            element_diagnostics,
                        );
                    }
                }
                kind => {
                    let mut grandchildren = Vec::new();
                    if let ElementKind::Task(TaskKind::BusinessRuleTask) = kind {
                        if let Some(decision) = definition
                            .tasks
                            .iter()
                            .find(|task| task.id == element.id)
                            .and_then(|task| task.decision_ref.as_deref())
                        {
                            let decision_id = node_id(file, &format!("{}/{}", element.id, decision));
                            graph.add_node(GraphNode {
                                id: decision_id.clone(),
                                name: decision.to_string(),
                                node_type: NodeType::DmnDecision,
                                bpmn_file: file.to_string(),
                                bpmn_element_id: decision.to_string(),
                                process_node: process_node.to_string(),
                                children: Vec::new(),
                                order_index: None,
                                branch_id: None,
                                declaration_index: 0,
                                subprocess_file: None,
                                subprocess_node: None,
                                diagnostics: Vec::new(),
                            });
                            graph.add_edge(EdgeKind::Contains, &child_id, &decision_id, None, false);
                            grandchildren.push(decision_id);
                        }
                    }

                    if kind == ElementKind::CallActivity {
                        if let Some(call) = definition.call_activities.iter().find(|c| c.id == element.id) {
                            pending.push(PendingCall {
                                file: file.to_string(),
                                owning_process_id: top_process_id.to_string(),
                                process_node: process_node.to_string(),
                                node: child_id.clone(),
                                call: call.clone(),
                            });
                        }
                    }

                    graph.add_node(GraphNode {
                        id: child_id.clone(),
                        name: element.name.unwrap_or(element.id).to_string(),
                        node_type: NodeType::from(kind),
                        bpmn_file: file.to_string(),
                        bpmn_element_id: element.id.to_string(),
                        process_node: process_node.to_string(),
                        children: grandchildren,
                        order_index: info.as_ref().map(|i| i.primary_path_index),
                        branch_id: info.as_ref().and_then(|i| i.branch_id.clone()),
                        declaration_index: element.declaration_index,
                        subprocess_file: None,
                        subprocess_node: None,
                        diagnostics: element_diagnostics,
                    });
                }
            }

            graph.add_edge(EdgeKind::Contains, &container_id, &child_id, None, false);
            children.push(child_id);
        }

        for (flow_index, flow) in definition.sequence_flows.iter().enumerate() {
            if definition.declares(&flow.source_id) && definition.declares(&flow.target_id) {
                graph.add_edge(
                    EdgeKind::Sequence,
                    &node_id(file, &flow.source_id),
                    &node_id(file, &flow.target_id),
                    Some(flow_index),
                    sequence.loop_back_flows.contains(&flow_index),
                );
            }
        }

        // process-wide findings, plus anything anchored on an id that is not a child
        for element_id in sequence.diagnostics.element_ids() {
            diagnostics.extend(sequence.diagnostics.take(&element_id));
        }

        graph.add_node(GraphNode {
            id: container_id.clone(),
            name: definition.display_name().to_string(),
            node_type,
            bpmn_file: file.to_string(),
            bpmn_element_id: definition.process_id.clone(),
            process_node: process_node.to_string(),
            children,
            order_index: order.map(|i| i.primary_path_index),
            branch_id: order.and_then(|i| i.branch_id.clone()),
            declaration_index,
            subprocess_file: None,
            subprocess_node: None,
            diagnostics,
        });

        container_id
    }

    /// Resolve every call activity; returns (process node, call node, target node) triples
    fn resolve_calls(
        &self,
        graph: &mut ProcessGraph,
        files: &[ProcessMetadata],
        map: &SubprocessMap,
        pending: Vec<PendingCall>,
    ) -> Vec<(String, String, String)> {
        let resolver = SubprocessResolver::new(files, map);
        let mut delegations = Vec::new();

        for call in pending {
            let outcome = resolver.resolve(&call.call, &call.file);
            debug!("Resolved {} -> {:?}", call.node, outcome);

            let declared_name = call
                .call
                .name
                .clone()
                .or_else(|| call.call.called_element_id.clone())
                .unwrap_or_else(|| call.call.id.clone());

            let missing = match &outcome {
                ResolutionOutcome::Matched { file, process_id, strategy, needs_manual_review } => {
                    let target = process_id
                        .as_deref()
                        .map(|pid| node_id(file, pid))
                        .filter(|id| graph.nodes.contains_key(id))
                        .or_else(|| graph.file_root(file).map(|node| node.id.clone()));

                    match target {
                        Some(target) => {
                            graph.add_edge(EdgeKind::DelegatesTo, &call.node, &target, None, false);
                            graph
                                .file_dependencies
                                .entry(call.file.clone())
                                .or_default()
                                .insert(file.clone());
                            if let Some(node) = graph.nodes.get_mut(&call.node) {
                                node.subprocess_file = Some(file.clone());
                                node.subprocess_node = Some(target.clone());
                                if *needs_manual_review {
                                    node.diagnostics.push(
                                        DiagnosticsEntry::warning(
                                            LOW_CONFIDENCE_MATCH,
                                            format!("{} was matched to {} and needs manual review", declared_name, file),
                                        )
                                        .with_context("file", file.clone())
                                        .with_context("strategy", format!("{:?}", strategy)),
                                    );
                                }
                            }
                            delegations.push((call.process_node.clone(), call.node.clone(), target));
                            None
                        }
                        None => Some(MissingReason::TargetHasNoProcess { file: file.clone() }),
                    }
                }
                ResolutionOutcome::Ambiguous { candidates } => Some(MissingReason::AmbiguousCalledElement {
                    candidates: candidates.clone(),
                }),
                ResolutionOutcome::Unresolved { reason } => Some(match reason {
                    UnresolvedReason::NoCandidate => MissingReason::NoCandidate,
                    UnresolvedReason::MappedFileNotLoaded { file } => {
                        MissingReason::MappedFileNotLoaded { file: file.clone() }
                    }
                    UnresolvedReason::AmbiguousName { candidates } => MissingReason::AmbiguousName {
                        candidates: candidates.clone(),
                    },
                }),
            };

            if let Some(reason) = missing {
                let ambiguous = matches!(
                    reason,
                    MissingReason::AmbiguousName { .. } | MissingReason::AmbiguousCalledElement { .. }
                );
                let mut entry = if ambiguous {
                    DiagnosticsEntry::warning(
                        AMBIGUOUS_CALL_ACTIVITY,
                        format!("{} is ambiguous: {}", declared_name, reason.describe()),
                    )
                } else {
                    DiagnosticsEntry::error(
                        UNRESOLVED_CALL_ACTIVITY,
                        format!("{} could not be resolved: {}", declared_name, reason.describe()),
                    )
                };
                entry = entry.with_context("parent_file", call.file.clone());

                if let Some(node) = graph.nodes.get_mut(&call.node) {
                    if let MissingReason::MappedFileNotLoaded { file } | MissingReason::TargetHasNoProcess { file } = &reason {
                        node.subprocess_file = Some(file.clone());
                        entry = entry.with_context("missing_file", file.clone());
                    }
                    node.diagnostics.push(entry);
                }

                graph.missing_dependencies.push(MissingDependency {
                    parent_file: call.file.clone(),
                    child_process_name_or_id: declared_name,
                    call_activity_node: call.node.clone(),
                    reason,
                });
            }

            graph.resolutions.push(CallActivityResolution {
                owning_file: call.file,
                owning_process_id: call.owning_process_id,
                call_activity_id: call.call.id,
                call_activity_name: call.call.name,
                called_element_id: call.call.called_element_id,
                outcome,
            });
        }

        delegations
    }

    fn select_roots(&self, graph: &mut ProcessGraph, preferred_root: Option<&str>) -> Result<()> {
        if let Some(requested) = preferred_root {
            let root = graph
                .find_process(requested)
                .map(|node| node.id.clone())
                .ok_or_else(|| HierarchyError::RootNotFound {
                    requested: requested.to_string(),
                    available: graph.files.clone(),
                })?;
            graph.roots = vec![root];
            return Ok(());
        }

        let called: HashSet<&str> = graph
            .edges
            .values()
            .filter(|edge| edge.kind == EdgeKind::DelegatesTo)
            .filter(|edge| {
                graph
                    .nodes
                    .get(&edge.source)
                    .map_or(false, |caller| caller.process_node != edge.target)
            })
            .map(|edge| edge.target.as_str())
            .collect();

        let mut candidates: Vec<(usize, usize, &GraphNode)> = graph
            .process_nodes
            .iter()
            .filter(|id| !called.contains(id.as_str()))
            .filter_map(|id| graph.nodes.get(id))
            .filter_map(|node| {
                graph
                    .files
                    .iter()
                    .position(|file| *file == node.bpmn_file)
                    .map(|position| (position, node.declaration_index, node))
            })
            .collect();

        match self.root_tie_break {
            RootTieBreak::FileName => candidates.sort_by(|a, b| {
                a.2.bpmn_file
                    .cmp(&b.2.bpmn_file)
                    .then(a.1.cmp(&b.1))
            }),
            RootTieBreak::InputOrder => candidates.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1))),
        }

        let roots: Vec<String> = candidates.iter().map(|(_, _, node)| node.id.clone()).collect();

        if roots.is_empty() {
            if let Some(fallback) = graph.process_nodes.first().cloned() {
                graph.diagnostics.push(
                    DiagnosticsEntry::warning(
                        NO_ROOT_CANDIDATE,
                        format!("Every process is called by another process; falling back to {}", fallback),
                    )
                    .with_context("fallback", fallback.clone()),
                );
                graph.roots = vec![fallback];
            } else {
                graph.diagnostics.push(DiagnosticsEntry::warning(
                    NO_ROOT_CANDIDATE,
                    "No loaded file declares a process",
                ));
            }
        } else {
            graph.roots = roots;
        }

        debug!("Selected roots: {:?}", graph.roots);
        Ok(())
    }

    /// Walk delegations from each root (then from any process not yet seen)
    /// and record every path that re-enters a file already on it
    fn detect_cycles(&self, graph: &mut ProcessGraph, delegations: &[(String, String, String)]) {
        let mut adjacency: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
        for (process, call, target) in delegations {
            adjacency
                .entry(process.as_str())
                .or_default()
                .push((call.as_str(), target.as_str()));
        }

        let file_of: BTreeMap<&str, &str> = graph
            .nodes
            .values()
            .map(|node| (node.id.as_str(), node.bpmn_file.as_str()))
            .collect();

        let starts: Vec<String> = graph
            .roots
            .iter()
            .chain(graph.process_nodes.iter())
            .cloned()
            .collect();

        let mut visited = HashSet::new();
        let mut found: Vec<(String, Vec<String>)> = Vec::new();

        for start in &starts {
            if !visited.contains(start.as_str()) {
                let mut path = Vec::new();
                dfs_cycle_detection(start, &adjacency, &file_of, &mut visited, &mut path, &mut found);
            }
        }

        let mut recorded = BTreeSet::new();
        let mut reported = BTreeSet::new();
        for (call, cycle) in found {
            if !reported.insert((call.clone(), cycle.clone())) {
                continue;
            }
            let rendered = cycle.join(" -> ");
            if let Some(node) = graph.nodes.get_mut(&call) {
                node.diagnostics.push(
                    DiagnosticsEntry::error(DELEGATION_CYCLE, format!("Delegation cycle: {}", rendered))
                        .with_context("path", rendered.clone()),
                );
            }
            if recorded.insert(cycle.clone()) {
                info!("Delegation cycle detected: {}", rendered);
                graph.cycles.push(cycle);
            }
        }
    }
}

/// DFS helper for cycle detection; `path` holds process node ids.
/// `visited` only tells the caller which processes still need a start,
/// every path through a node is expanded so each call closing a cycle is seen
fn dfs_cycle_detection(
    node: &str,
    adjacency: &BTreeMap<&str, Vec<(&str, &str)>>,
    file_of: &BTreeMap<&str, &str>,
    visited: &mut HashSet<String>,
    path: &mut Vec<String>,
    found: &mut Vec<(String, Vec<String>)>,
) {
    visited.insert(node.to_string());
    path.push(node.to_string());

    for &(call, target) in adjacency.get(node).map(Vec::as_slice).unwrap_or_default() {
        let target_file = file_of.get(target).copied();
        let reentry = path
            .iter()
            .position(|on_path| file_of.get(on_path.as_str()).copied() == target_file);

        if let Some(cycle_start) = reentry {
            let mut cycle = path[cycle_start..].to_vec();
            cycle.push(target.to_string());
            found.push((call.to_string(), cycle));
        } else {
            dfs_cycle_detection(target, adjacency, file_of, visited, path, found);
        }
    }

    path.pop();
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(RootTieBreak::FileName)
    }
}
