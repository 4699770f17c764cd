//! Job specification models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::null_as_default;

/// Job type that produces deployments
pub const JOB_TYPE_SERVICE: &str = "service";

/// A job specification as accepted by `/v1/jobs`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Job {
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub datacenters: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub constraints: Vec<Constraint>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub task_groups: Vec<TaskGroup>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdateStrategy>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Job {
    /// Job ID, falling back to the job name
    pub fn id_or_name(&self) -> Option<&str> {
        self.id.as_deref().or(self.name.as_deref())
    }

    /// Job type, defaulting to `service` like the scheduler does
    pub fn job_type(&self) -> &str {
        self.job_type.as_deref().unwrap_or(JOB_TYPE_SERVICE)
    }

    /// Canary count of the job level update strategy, zero when unset
    pub fn canary_count(&self) -> u32 {
        self.update
            .as_ref()
            .and_then(|u| u.canary)
            .unwrap_or(0)
    }

    /// Whether the scheduler promotes canaries by itself
    pub fn auto_promote(&self) -> bool {
        self.update
            .as_ref()
            .and_then(|u| u.auto_promote)
            .unwrap_or(false)
    }

    /// Add a constraint unless an identical one is already present
    pub fn constrain(&mut self, constraint: Constraint) {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
    }
}

/// Placement constraint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(rename = "LTarget", default)]
    pub l_target: String,

    #[serde(rename = "RTarget", default)]
    pub r_target: String,

    #[serde(rename = "Operand", default)]
    pub operand: String,
}

impl Constraint {
    /// Equality constraint against a node attribute
    pub fn equals(l_target: impl Into<String>, r_target: impl Into<String>) -> Self {
        Self {
            l_target: l_target.into(),
            r_target: r_target.into(),
            operand: "=".to_string(),
        }
    }
}

/// Rolling update strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateStrategy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canary: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_promote: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Task group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<Task>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdateStrategy>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub config: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Resources>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Task resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(rename = "CPU", default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,

    #[serde(rename = "MemoryMB", default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `PUT /v1/validate/job`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobValidateRequest<'a> {
    pub job: &'a Job,
}

/// Response of `PUT /v1/validate/job`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobValidateResponse {
    #[serde(default)]
    pub driver_config_validated: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub validation_errors: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub error: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub warnings: String,
}

/// Body of `PUT /v1/job/:id/plan`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobPlanRequest<'a> {
    pub job: &'a Job,
    pub diff: bool,
}

/// Response of `PUT /v1/job/:id/plan`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobPlanResponse {
    #[serde(default)]
    pub job_modify_index: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub warnings: String,
}

/// Body of `PUT /v1/jobs`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobRegisterRequest<'a> {
    pub job: &'a Job,
    pub enforce_index: bool,
    pub job_modify_index: u64,
}

/// Response of `PUT /v1/jobs`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobRegisterResponse {
    #[serde(rename = "EvalID", default, deserialize_with = "null_as_default")]
    pub eval_id: String,

    #[serde(default)]
    pub job_modify_index: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub warnings: String,
}

/// Body of `POST /v1/jobs/parse`
#[derive(Debug, Clone, Serialize)]
pub struct JobsParseRequest<'a> {
    #[serde(rename = "JobHCL")]
    pub job_hcl: &'a str,

    #[serde(rename = "Canonicalize")]
    pub canonicalize: bool,
}
