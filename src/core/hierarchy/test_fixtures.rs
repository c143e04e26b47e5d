// Shared metadata fixtures for hierarchy tests
use crate::core::metadata::{
    CallActivityRef, EventKind, EventRef, ProcessDefinition, ProcessMetadata, SequenceFlowRef,
    TaskKind, TaskRef,
};

pub fn task(id: &str) -> TaskRef {
    TaskRef {
        id: id.to_string(),
        name: None,
        kind: TaskKind::UserTask,
        decision_ref: None,
    }
}

pub fn call(id: &str, name: &str, called: Option<&str>) -> CallActivityRef {
    CallActivityRef {
        id: id.to_string(),
        name: Some(name.to_string()),
        called_element_id: called.map(str::to_string),
    }
}

pub fn flow(source: &str, target: &str) -> SequenceFlowRef {
    SequenceFlowRef {
        id: None,
        source_id: source.to_string(),
        target_id: target.to_string(),
    }
}

pub fn start_end() -> Vec<EventRef> {
    vec![
        EventRef {
            id: "start".to_string(),
            name: None,
            kind: EventKind::Start,
            attached_to: None,
        },
        EventRef {
            id: "end".to_string(),
            name: None,
            kind: EventKind::End,
            attached_to: None,
        },
    ]
}

/// `start -> ids... -> end`, where every id is a task unless already declared
pub fn chain(process: &mut ProcessDefinition, ids: &[&str]) {
    process.events = start_end();
    let mut previous = "start".to_string();
    for id in ids {
        if !process.declares(id) {
            process.tasks.push(task(id));
        }
        process.sequence_flows.push(flow(&previous, id));
        previous = id.to_string();
    }
    process.sequence_flows.push(flow(&previous, "end"));
}

pub fn linear_file(file: &str, process_id: &str, tasks: &[&str]) -> ProcessMetadata {
    let mut process = ProcessDefinition::new(process_id, None);
    chain(&mut process, tasks);
    ProcessMetadata::new(file, vec![process])
}

/// One process with a single call activity named `callee_name`
pub fn calling_file(file: &str, process_id: &str, call_id: &str, callee_name: &str) -> ProcessMetadata {
    let mut process = ProcessDefinition::new(process_id, None);
    process.call_activities = vec![call(call_id, callee_name, None)];
    chain(&mut process, &[call_id]);
    ProcessMetadata::new(file, vec![process])
}

pub fn mortgage_application() -> ProcessMetadata {
    let mut process = ProcessDefinition::new("mortgage-se-application", Some("Application"));
    process.call_activities = vec![
        call("internal-data-gathering", "Internal data gathering", None),
        call("stakeholder", "Stakeholder", None),
        call("object", "Object", None),
        call("household", "Household", None),
    ];
    chain(
        &mut process,
        &["internal-data-gathering", "stakeholder", "object", "household"],
    );
    ProcessMetadata::new("mortgage-se-application.bpmn", vec![process])
}

pub fn internal_data_gathering() -> ProcessMetadata {
    let mut process = ProcessDefinition::new("internal-data-gathering", Some("Internal data gathering"));
    chain(
        &mut process,
        &["fetch-party-information", "pre-screen-party", "fetch-engagements"],
    );
    ProcessMetadata::new("mortgage-se-internal-data-gathering.bpmn", vec![process])
}

pub fn household() -> ProcessMetadata {
    let mut file = linear_file("mortgage-se-household.bpmn", "household", &["register-household-economy"]);
    file.processes[0].name = Some("Household".to_string());
    file
}
