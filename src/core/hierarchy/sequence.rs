// src/core/hierarchy/sequence.rs
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use serde::{Serialize, Deserialize};

use super::super::metadata::{ElementKind, EventKind, ProcessDefinition};
use super::diagnostics::{
    DiagnosticsCollector, DiagnosticsEntry, INVALID_SEQUENCE_REF, NO_START_EVENT, UNREACHABLE_NODE,
};

/// Position of one element along its process's sequence flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub primary_path_index: u32,
    /// `<splitting element id>#<n>` for elements on the n-th outgoing branch
    pub branch_id: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct SequenceOrder {
    /// Ordered elements, keyed by element id; unreachable elements are absent
    pub positions: BTreeMap<String, OrderInfo>,
    /// Indices into `sequence_flows` of edges that close a loop
    pub loop_back_flows: BTreeSet<usize>,
    /// Findings keyed by element id, or by the process id for process-wide ones
    pub diagnostics: DiagnosticsCollector,
}

impl SequenceOrder {
    pub fn get(&self, element_id: &str) -> Option<&OrderInfo> {
        self.positions.get(element_id)
    }
}

/// Assigns a deterministic linear order to the elements of one process.
///
/// Breadth-first from the start events. Ties between successors are broken by
/// declaration order, so the result depends only on the input lists.
pub struct SequenceOrderer;

impl SequenceOrderer {
    pub fn new() -> Self {
        Self
    }

    pub fn order(&self, process: &ProcessDefinition) -> SequenceOrder {
        let elements = process.flow_elements();
        let mut result = SequenceOrder::default();
        if elements.is_empty() {
            return result;
        }

        let index_of: HashMap<&str, usize> = elements
            .iter()
            .map(|element| (element.id, element.declaration_index))
            .collect();

        // (target, originating flow index) per source
        let mut successors: Vec<Vec<(usize, Option<usize>)>> = vec![Vec::new(); elements.len()];
        let mut in_degree = vec![0usize; elements.len()];

        for (flow_index, flow) in process.sequence_flows.iter().enumerate() {
            let source = index_of.get(flow.source_id.as_str()).copied();
            let target = index_of.get(flow.target_id.as_str()).copied();

            match (source, target) {
                (Some(s), Some(t)) => {
                    successors[s].push((t, Some(flow_index)));
                    in_degree[t] += 1;
                }
                _ => {
                    let anchor = match (source, target) {
                        (Some(_), None) => flow.source_id.as_str(),
                        (None, Some(_)) => flow.target_id.as_str(),
                        _ => process.process_id.as_str(),
                    };
                    let mut entry = DiagnosticsEntry::warning(
                        INVALID_SEQUENCE_REF,
                        format!(
                            "Sequence flow {} -> {} references an element not declared in process {}",
                            flow.source_id, flow.target_id, process.process_id
                        ),
                    )
                    .with_context("source_id", flow.source_id.clone())
                    .with_context("target_id", flow.target_id.clone());
                    if let Some(id) = &flow.id {
                        entry = entry.with_context("flow_id", id.clone());
                    }
                    result.diagnostics.push(anchor, entry);
                }
            }
        }

        for event in &process.events {
            if event.kind != EventKind::Boundary {
                continue;
            }
            let Some(host) = event.attached_to.as_deref() else {
                continue;
            };
            match (index_of.get(host), index_of.get(event.id.as_str())) {
                (Some(&h), Some(&b)) => {
                    successors[h].push((b, None));
                    in_degree[b] += 1;
                }
                _ => result.diagnostics.push(
                    &event.id,
                    DiagnosticsEntry::warning(
                        INVALID_SEQUENCE_REF,
                        format!("Boundary event {} is attached to unknown activity {}", event.id, host),
                    )
                    .with_context("attached_to", host),
                ),
            }
        }

        for list in successors.iter_mut() {
            list.sort_by_key(|(target, _)| *target);
        }

        let mut starts: Vec<usize> = elements
            .iter()
            .filter(|element| matches!(element.kind, ElementKind::Event(EventKind::Start)))
            .map(|element| element.declaration_index)
            .collect();
        if starts.is_empty() {
            starts = (0..elements.len()).filter(|&i| in_degree[i] == 0).collect();
        }
        if starts.is_empty() {
            result.diagnostics.push(
                &process.process_id,
                DiagnosticsEntry::warning(
                    NO_START_EVENT,
                    format!(
                        "Process {} has no start event and no element without incoming flow; ordering from {}",
                        process.process_id, elements[0].id
                    ),
                ),
            );
            starts.push(0);
        }

        let mut order: Vec<Option<u32>> = vec![None; elements.len()];
        let mut branch: Vec<Option<String>> = vec![None; elements.len()];
        let mut branch_parent: HashMap<String, Option<String>> = HashMap::new();
        let mut queue = VecDeque::new();
        let mut next_index: u32 = 0;
        // (source, already ordered target, flow index)
        let mut revisits: Vec<(usize, usize, usize)> = Vec::new();

        for start in starts {
            if order[start].is_none() {
                order[start] = Some(next_index);
                next_index += 1;
                queue.push_back(start);
            }
        }

        while let Some(current) = queue.pop_front() {
            let current_order = order[current].unwrap_or(0);
            let distinct_targets: BTreeSet<usize> =
                successors[current].iter().map(|(target, _)| *target).collect();
            let is_split = distinct_targets.len() > 1;

            for (branch_number, &(target, flow_index)) in successors[current].iter().enumerate() {
                if let Some(target_order) = order[target] {
                    if target_order <= current_order {
                        if let Some(flow_index) = flow_index {
                            revisits.push((current, target, flow_index));
                        }
                    }
                    continue;
                }

                branch[target] = if is_split {
                    let id = format!("{}#{}", elements[current].id, branch_number + 1);
                    branch_parent.insert(id.clone(), branch[current].clone());
                    Some(id)
                } else if in_degree[target] > 1 {
                    // join: leave the branch the split opened
                    branch[current]
                        .as_ref()
                        .and_then(|b| branch_parent.get(b).cloned())
                        .flatten()
                } else {
                    branch[current].clone()
                };

                order[target] = Some(next_index);
                next_index += 1;
                queue.push_back(target);
            }
        }

        // only an edge whose target can reach its source closes a loop
        for (source, target, flow_index) in revisits {
            if reaches(&successors, target, source) {
                result.loop_back_flows.insert(flow_index);
            }
        }

        for element in &elements {
            match order[element.declaration_index] {
                Some(primary_path_index) => {
                    result.positions.insert(
                        element.id.to_string(),
                        OrderInfo {
                            primary_path_index,
                            branch_id: branch[element.declaration_index].clone(),
                        },
                    );
                }
                None => result.diagnostics.push(
                    element.id,
                    DiagnosticsEntry::warning(
                        UNREACHABLE_NODE,
                        format!("{} is not reachable from any start event of {}", element.id, process.process_id),
                    ),
                ),
            }
        }

        result
    }
}

/// Whether `to` is reachable from `from` along flow edges
fn reaches(successors: &[Vec<(usize, Option<usize>)>], from: usize, to: usize) -> bool {
    let mut seen = vec![false; successors.len()];
    let mut stack = vec![from];
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if std::mem::replace(&mut seen[node], true) {
            continue;
        }
        stack.extend(successors[node].iter().map(|(target, _)| *target));
    }
    false
}

impl Default for SequenceOrderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::{
        EventRef, GatewayKind, GatewayRef, SequenceFlowRef, TaskKind, TaskRef,
    };

    fn task(id: &str) -> TaskRef {
        TaskRef {
            id: id.to_string(),
            name: None,
            kind: TaskKind::ServiceTask,
            decision_ref: None,
        }
    }

    fn event(id: &str, kind: EventKind) -> EventRef {
        EventRef {
            id: id.to_string(),
            name: None,
            kind,
            attached_to: None,
        }
    }

    fn flow(source: &str, target: &str) -> SequenceFlowRef {
        SequenceFlowRef {
            id: None,
            source_id: source.to_string(),
            target_id: target.to_string(),
        }
    }

    fn index(order: &SequenceOrder, id: &str) -> u32 {
        order.get(id).unwrap().primary_path_index
    }

    #[test]
    fn test_linear_sequence_is_strictly_increasing() {
        let mut process = ProcessDefinition::new("screening", None);
        process.events = vec![event("start", EventKind::Start), event("end", EventKind::End)];
        // declared out of execution order on purpose
        process.tasks = vec![
            task("fetch-engagements"),
            task("pre-screen-party"),
            task("fetch-party-information"),
        ];
        process.sequence_flows = vec![
            flow("start", "fetch-party-information"),
            flow("fetch-party-information", "pre-screen-party"),
            flow("pre-screen-party", "fetch-engagements"),
            flow("fetch-engagements", "end"),
        ];

        let order = SequenceOrderer::new().order(&process);
        let a = index(&order, "fetch-party-information");
        let b = index(&order, "pre-screen-party");
        let c = index(&order, "fetch-engagements");
        assert!(a < b && b < c);
        assert!(order.diagnostics.is_empty());
    }

    #[test]
    fn test_parallel_branches_share_gateway_prefix() {
        let mut process = ProcessDefinition::new("p", None);
        process.events = vec![event("start", EventKind::Start)];
        process.tasks = vec![task("left"), task("right"), task("after")];
        process.gateways = vec![
            GatewayRef { id: "split".to_string(), name: None, kind: GatewayKind::Parallel },
            GatewayRef { id: "join".to_string(), name: None, kind: GatewayKind::Parallel },
        ];
        process.sequence_flows = vec![
            flow("start", "split"),
            flow("split", "right"),
            flow("split", "left"),
            flow("left", "join"),
            flow("right", "join"),
            flow("join", "after"),
        ];

        let order = SequenceOrderer::new().order(&process);
        assert_eq!(order.get("left").unwrap().branch_id.as_deref(), Some("split#1"));
        assert_eq!(order.get("right").unwrap().branch_id.as_deref(), Some("split#2"));
        assert_eq!(order.get("join").unwrap().branch_id, None);
        assert_eq!(order.get("after").unwrap().branch_id, None);
        assert!(index(&order, "left") < index(&order, "right"));
        assert!(index(&order, "after") > index(&order, "join"));
    }

    #[test]
    fn test_loop_back_terminates_and_is_recorded() {
        let mut process = ProcessDefinition::new("p", None);
        process.events = vec![event("start", EventKind::Start)];
        process.tasks = vec![task("a"), task("b")];
        process.sequence_flows = vec![flow("start", "a"), flow("a", "b"), flow("b", "a")];

        let order = SequenceOrderer::new().order(&process);
        assert!(index(&order, "a") < index(&order, "b"));
        assert_eq!(order.loop_back_flows.iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_cross_edge_between_branches_is_not_a_loop() {
        let mut process = ProcessDefinition::new("p", None);
        process.events = vec![event("start", EventKind::Start)];
        process.tasks = vec![task("x"), task("y")];
        process.sequence_flows = vec![flow("start", "x"), flow("start", "y"), flow("y", "x")];

        let order = SequenceOrderer::new().order(&process);
        assert!(order.loop_back_flows.is_empty());
        assert!(index(&order, "x") < index(&order, "y"));
    }

    #[test]
    fn test_self_loop_is_a_loop_back() {
        let mut process = ProcessDefinition::new("p", None);
        process.events = vec![event("start", EventKind::Start)];
        process.tasks = vec![task("retry")];
        process.sequence_flows = vec![flow("start", "retry"), flow("retry", "retry")];

        let order = SequenceOrderer::new().order(&process);
        assert_eq!(order.loop_back_flows.iter().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_disconnected_node_is_flagged_not_ordered() {
        let mut process = ProcessDefinition::new("p", None);
        process.events = vec![event("start", EventKind::Start)];
        process.tasks = vec![task("a"), task("orphan")];
        process.sequence_flows = vec![flow("start", "a")];

        let order = SequenceOrderer::new().order(&process);
        assert!(order.get("orphan").is_none());
        let diagnostics = order.diagnostics.for_element("orphan");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, UNREACHABLE_NODE);
    }

    #[test]
    fn test_unknown_flow_reference_is_reported_on_known_endpoint() {
        let mut process = ProcessDefinition::new("p", None);
        process.tasks = vec![task("a")];
        process.sequence_flows = vec![flow("a", "ghost")];

        let order = SequenceOrderer::new().order(&process);
        assert_eq!(index(&order, "a"), 0);
        assert_eq!(order.diagnostics.for_element("a")[0].code, INVALID_SEQUENCE_REF);
        assert_eq!(order.diagnostics.for_element("a")[0].context["target_id"], "ghost");
    }

    #[test]
    fn test_cycle_without_entry_reports_no_start() {
        let mut process = ProcessDefinition::new("p", None);
        process.tasks = vec![task("a"), task("b")];
        process.sequence_flows = vec![flow("a", "b"), flow("b", "a")];

        let order = SequenceOrderer::new().order(&process);
        assert_eq!(index(&order, "a"), 0);
        assert_eq!(index(&order, "b"), 1);
        assert_eq!(order.diagnostics.for_element("p")[0].code, NO_START_EVENT);
    }

    #[test]
    fn test_boundary_event_follows_its_host() {
        let mut process = ProcessDefinition::new("p", None);
        process.events = vec![
            event("start", EventKind::Start),
            EventRef {
                id: "timeout".to_string(),
                name: None,
                kind: EventKind::Boundary,
                attached_to: Some("review".to_string()),
            },
        ];
        process.tasks = vec![task("review"), task("escalate")];
        process.sequence_flows = vec![flow("start", "review"), flow("timeout", "escalate")];

        let order = SequenceOrderer::new().order(&process);
        assert!(index(&order, "timeout") > index(&order, "review"));
        assert!(index(&order, "escalate") > index(&order, "timeout"));
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let mut process = ProcessDefinition::new("p", None);
        process.events = vec![event("start", EventKind::Start)];
        process.tasks = (0..20).map(|i| task(&format!("t{}", i))).collect();
        process.sequence_flows = (0..20).map(|i| flow("start", &format!("t{}", i))).collect();

        let first = SequenceOrderer::new().order(&process);
        let second = SequenceOrderer::new().order(&process);
        assert_eq!(first.positions, second.positions);
        assert_eq!(index(&first, "t0") + 1, index(&first, "t1"));
    }
}
