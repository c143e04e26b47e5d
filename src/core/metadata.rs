//! Normalized, file-scoped view of one BPMN document.
//!
//! These records are produced by the BPMN parser and only consumed here.
//! Element ids are the `id` attributes from the original XML.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Process metadata extracted from one BPMN file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessMetadata {
    /// BPMN file name, e.g. `mortgage-se-application.bpmn`
    pub file_name: String,

    /// `<process>` elements in document order
    #[serde(default)]
    pub processes: Vec<ProcessDefinition>,
}

impl ProcessMetadata {
    pub fn new(file_name: impl Into<String>, processes: Vec<ProcessDefinition>) -> Self {
        Self {
            file_name: file_name.into(),
            processes,
        }
    }

    /// File name without directory and `.bpmn` extension
    pub fn file_stem(&self) -> &str {
        file_stem(&self.file_name)
    }
}

/// Strip directories and the extension from a BPMN file name
pub fn file_stem(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub process_id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub call_activities: Vec<CallActivityRef>,

    #[serde(default)]
    pub tasks: Vec<TaskRef>,

    #[serde(default)]
    pub sequence_flows: Vec<SequenceFlowRef>,

    #[serde(default)]
    pub gateways: Vec<GatewayRef>,

    #[serde(default)]
    pub events: Vec<EventRef>,

    /// Embedded `<subProcess>` containers; `process_id` is the element id
    #[serde(default)]
    pub sub_processes: Vec<ProcessDefinition>,

    /// Ids of all flow elements in document order, when the parser knows it
    #[serde(default)]
    pub element_order: Vec<String>,

    /// Problems the parser noticed while extracting this process
    #[serde(default)]
    pub parse_diagnostics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallActivityRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub called_element_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: TaskKind,
    /// DMN decision referenced by a business rule task
    #[serde(default)]
    pub decision_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    UserTask,
    ServiceTask,
    BusinessRuleTask,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceFlowRef {
    #[serde(default)]
    pub id: Option<String>,
    pub source_id: String,
    pub target_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: GatewayKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GatewayKind {
    Exclusive,
    Parallel,
    Inclusive,
    EventBased,
    Complex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: EventKind,
    /// Activity a boundary event is attached to
    #[serde(default)]
    pub attached_to: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Start,
    End,
    Intermediate,
    Boundary,
}

/// Category of a flow element within its process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Task(TaskKind),
    CallActivity,
    Gateway(GatewayKind),
    Event(EventKind),
    SubProcess,
}

/// A flow element together with its position in the process
#[derive(Debug, Clone, Copy)]
pub struct FlowElement<'a> {
    pub id: &'a str,
    pub name: Option<&'a str>,
    pub kind: ElementKind,
    pub declaration_index: usize,
}

impl ProcessDefinition {
    pub fn new(process_id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            process_id: process_id.into(),
            name: name.map(str::to_string),
            ..Default::default()
        }
    }

    /// Display name, falling back to the process id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.process_id)
    }

    /// All flow elements in declaration order.
    ///
    /// Elements listed in `element_order` come first, in that order. Anything
    /// not listed follows in the fallback order: events, tasks, call
    /// activities, gateways, embedded subprocesses.
    pub fn flow_elements(&self) -> Vec<FlowElement<'_>> {
        let mut fallback: Vec<(&str, Option<&str>, ElementKind)> = Vec::new();
        for event in &self.events {
            fallback.push((&event.id, event.name.as_deref(), ElementKind::Event(event.kind)));
        }
        for task in &self.tasks {
            fallback.push((&task.id, task.name.as_deref(), ElementKind::Task(task.kind)));
        }
        for call in &self.call_activities {
            fallback.push((&call.id, call.name.as_deref(), ElementKind::CallActivity));
        }
        for gateway in &self.gateways {
            fallback.push((&gateway.id, gateway.name.as_deref(), ElementKind::Gateway(gateway.kind)));
        }
        for sub in &self.sub_processes {
            fallback.push((&sub.process_id, sub.name.as_deref(), ElementKind::SubProcess));
        }

        let mut ordered = Vec::with_capacity(fallback.len());
        let mut placed: HashSet<&str> = HashSet::new();

        for id in &self.element_order {
            if let Some(entry) = fallback.iter().find(|(eid, _, _)| *eid == id.as_str()) {
                if placed.insert(entry.0) {
                    ordered.push(*entry);
                }
            }
        }
        for entry in &fallback {
            if placed.insert(entry.0) {
                ordered.push(*entry);
            }
        }

        ordered
            .into_iter()
            .enumerate()
            .map(|(declaration_index, (id, name, kind))| FlowElement {
                id,
                name,
                kind,
                declaration_index,
            })
            .collect()
    }

    /// Whether an element id is declared directly in this process
    pub fn declares(&self, element_id: &str) -> bool {
        self.events.iter().any(|e| e.id == element_id)
            || self.tasks.iter().any(|t| t.id == element_id)
            || self.call_activities.iter().any(|c| c.id == element_id)
            || self.gateways.iter().any(|g| g.id == element_id)
            || self.sub_processes.iter().any(|s| s.process_id == element_id)
    }
}
