// src/core/hierarchy/tree_builder.rs
use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::error::{HierarchyError, Result};
use super::diagnostics::{DiagnosticsEntry, CYCLE_DETECTED, MISSING_SUBPROCESS};
use super::graph_builder::{GraphNode, NodeType, ProcessGraph};

/// Node of the rooted, ordered process tree. Owns its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessTreeNode {
    pub id: String,
    pub name: String,
    pub node_type: NodeType,
    pub bpmn_file: String,
    pub bpmn_element_id: String,
    pub order_index: Option<u32>,
    pub branch_id: Option<String>,
    pub subprocess_file: Option<String>,
    /// Set on leaves standing in for a subprocess that was not expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<PlaceholderKind>,
    pub children: Vec<ProcessTreeNode>,
    pub diagnostics: Vec<DiagnosticsEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaceholderKind {
    Cycle,
    MissingSubprocess,
}

impl ProcessTreeNode {
    fn from_graph(node: &GraphNode) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            node_type: node.node_type,
            bpmn_file: node.bpmn_file.clone(),
            bpmn_element_id: node.bpmn_element_id.clone(),
            order_index: node.order_index,
            branch_id: node.branch_id.clone(),
            subprocess_file: node.subprocess_file.clone(),
            placeholder: None,
            children: Vec::new(),
            diagnostics: node.diagnostics.clone(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder.is_some()
    }

    /// Number of node levels below and including this node
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(ProcessTreeNode::depth).max().unwrap_or(0)
    }

    /// Pre-order traversal
    pub fn walk(&self) -> Vec<&ProcessTreeNode> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.walk());
        }
        nodes
    }

    /// Diagnostics of this node and every descendant, in pre-order
    pub fn all_diagnostics(&self) -> Vec<&DiagnosticsEntry> {
        self.walk()
            .into_iter()
            .flat_map(|node| node.diagnostics.iter())
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<&ProcessTreeNode> {
        self.walk().into_iter().find(|node| node.id == id)
    }
}

/// Convenience projection of one built tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Files loaded into the graph
    pub total_files: usize,
    /// Tree nodes, placeholders excluded
    pub total_nodes: usize,
    /// Files that contribute at least one tree node, sorted
    pub files_included: Vec<String>,
    /// Node levels from the root to the deepest leaf; the root alone is 1
    pub hierarchy_depth: usize,
}

impl GraphSummary {
    pub fn new(graph: &ProcessGraph, tree: &ProcessTreeNode) -> Self {
        let real: Vec<&ProcessTreeNode> = tree
            .walk()
            .into_iter()
            .filter(|node| !node.is_placeholder())
            .collect();

        let files_included: BTreeSet<&str> = real.iter().map(|node| node.bpmn_file.as_str()).collect();

        Self {
            total_files: graph.files.len(),
            total_nodes: real.len(),
            files_included: files_included.into_iter().map(str::to_string).collect(),
            hierarchy_depth: tree.depth(),
        }
    }
}

/// Converts the process graph into an ordered tree.
///
/// Structural nodes are spliced out. Call activities are expanded into a fresh
/// copy of their subprocess, tracking the files on the current expansion path
/// so a delegation cycle ends in a placeholder leaf.
pub struct TreeBuilder;

impl TreeBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build_tree(&self, graph: &ProcessGraph, root_process_id: &str) -> Result<ProcessTreeNode> {
        let root = graph
            .find_process(root_process_id)
            .ok_or_else(|| HierarchyError::RootNotFound {
                requested: root_process_id.to_string(),
                available: graph.files.clone(),
            })?;

        let mut path = vec![root.bpmn_file.clone()];
        let tree = self.expand(graph, root, &mut path);
        debug!("Built tree for {} ({} levels)", root.id, tree.depth());
        Ok(tree)
    }

    /// Convert an interesting node and everything below it
    fn expand(&self, graph: &ProcessGraph, node: &GraphNode, path: &mut Vec<String>) -> ProcessTreeNode {
        let mut tree_node = ProcessTreeNode::from_graph(node);
        let mut hoisted = Vec::new();

        for child in sorted_children(graph, node) {
            self.flatten(graph, child, path, &mut tree_node.children, &mut hoisted);
        }

        if node.node_type == NodeType::CallActivity {
            let subtree = match node.subprocess_node.as_deref().and_then(|id| graph.node(id)) {
                Some(target) if path.contains(&target.bpmn_file) => cycle_placeholder(node, target, path),
                Some(target) => {
                    path.push(target.bpmn_file.clone());
                    let expanded = self.expand(graph, target, path);
                    path.pop();
                    expanded
                }
                None => missing_placeholder(node),
            };
            tree_node.children.push(subtree);
        }

        tree_node.diagnostics.extend(hoisted);
        tree_node
    }

    /// Keep interesting nodes, splice structural ones into `out`
    fn flatten(
        &self,
        graph: &ProcessGraph,
        node: &GraphNode,
        path: &mut Vec<String>,
        out: &mut Vec<ProcessTreeNode>,
        hoisted: &mut Vec<DiagnosticsEntry>,
    ) {
        if node.node_type.is_interesting() {
            out.push(self.expand(graph, node, path));
            return;
        }

        hoisted.extend(node.diagnostics.iter().cloned());
        for child in sorted_children(graph, node) {
            self.flatten(graph, child, path, out, hoisted);
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Children by execution order, then branch, then declaration; unordered last
fn sorted_children<'g>(graph: &'g ProcessGraph, node: &GraphNode) -> Vec<&'g GraphNode> {
    let mut children: Vec<&GraphNode> = node.children.iter().filter_map(|id| graph.node(id)).collect();
    children.sort_by(|a, b| {
        let key_a = (a.order_index.is_none(), a.order_index, &a.branch_id, a.declaration_index);
        let key_b = (b.order_index.is_none(), b.order_index, &b.branch_id, b.declaration_index);
        key_a.cmp(&key_b)
    });
    children
}

fn cycle_placeholder(call: &GraphNode, target: &GraphNode, path: &[String]) -> ProcessTreeNode {
    let rendered = path
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(target.bpmn_file.as_str()))
        .collect::<Vec<_>>()
        .join(" -> ");

    ProcessTreeNode {
        id: format!("{}::cycle", call.id),
        name: target.name.clone(),
        node_type: NodeType::Process,
        bpmn_file: target.bpmn_file.clone(),
        bpmn_element_id: target.bpmn_element_id.clone(),
        order_index: None,
        branch_id: None,
        subprocess_file: None,
        placeholder: Some(PlaceholderKind::Cycle),
        children: Vec::new(),
        diagnostics: vec![DiagnosticsEntry::error(
            CYCLE_DETECTED,
            format!("{} re-enters {}, which is already being expanded", call.name, target.bpmn_file),
        )
        .with_context("path", rendered)
        .with_context("file", target.bpmn_file.clone())],
    }
}

fn missing_placeholder(call: &GraphNode) -> ProcessTreeNode {
    let missing = call.subprocess_file.clone().unwrap_or_else(|| call.name.clone());

    ProcessTreeNode {
        id: format!("{}::missing", call.id),
        name: call.name.clone(),
        node_type: NodeType::Process,
        bpmn_file: call.subprocess_file.clone().unwrap_or_default(),
        bpmn_element_id: call.bpmn_element_id.clone(),
        order_index: None,
        branch_id: None,
        subprocess_file: None,
        placeholder: Some(PlaceholderKind::MissingSubprocess),
        children: Vec::new(),
        diagnostics: vec![DiagnosticsEntry::error(
            MISSING_SUBPROCESS,
            format!("Subprocess for {} is not loaded", call.name),
        )
        .with_context("missing_file", missing)
        .with_context("call_activity", call.id.clone())],
    }
}
