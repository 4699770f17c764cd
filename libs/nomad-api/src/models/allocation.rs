//! Allocation models

use std::collections::BTreeMap;

use serde::Deserialize;

use super::null_as_default;

/// Allocation as listed by `/v1/deployment/allocations/:id`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AllocationListStub {
    #[serde(rename = "ID", default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub task_states: BTreeMap<String, TaskState>,
}

impl AllocationListStub {
    /// Every error string recorded by the task events of this allocation
    pub fn task_errors(&self) -> Vec<String> {
        self.task_states
            .values()
            .flat_map(|state| state.events.iter())
            .flat_map(TaskEvent::errors)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskState {
    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub failed: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub events: Vec<TaskEvent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskEvent {
    #[serde(rename = "Type", default)]
    pub event_type: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub driver_error: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub download_error: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub validation_error: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub setup_error: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub vault_error: String,
}

impl TaskEvent {
    /// Non-empty error strings: driver, download, validation, setup, secrets
    pub fn errors(&self) -> Vec<String> {
        [
            &self.driver_error,
            &self.download_error,
            &self.validation_error,
            &self.setup_error,
            &self.vault_error,
        ]
        .into_iter()
        .filter(|e| !e.is_empty())
        .cloned()
        .collect()
    }
}
