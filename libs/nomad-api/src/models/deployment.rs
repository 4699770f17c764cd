//! Deployment models

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::null_as_default;

pub const DEPLOYMENT_STATUS_RUNNING: &str = "running";
pub const DEPLOYMENT_STATUS_SUCCESSFUL: &str = "successful";
pub const DEPLOYMENT_STATUS_FAILED: &str = "failed";
pub const DEPLOYMENT_STATUS_CANCELLED: &str = "cancelled";

/// Rollout tracked by the scheduler
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Deployment {
    #[serde(rename = "ID", default)]
    pub id: String,

    #[serde(rename = "JobID", default)]
    pub job_id: String,

    #[serde(default)]
    pub status: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status_description: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub task_groups: BTreeMap<String, DeploymentState>,
}

impl Deployment {
    pub fn status(&self) -> DeploymentStatus {
        DeploymentStatus::from(self.status.as_str())
    }
}

/// Per task group progress of a deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentState {
    #[serde(default)]
    pub desired_total: u32,

    #[serde(default)]
    pub placed_allocs: u32,

    #[serde(default)]
    pub healthy_allocs: u32,

    #[serde(default)]
    pub unhealthy_allocs: u32,

    #[serde(default)]
    pub desired_canaries: u32,

    #[serde(default, deserialize_with = "null_as_default")]
    pub placed_canaries: Vec<String>,

    #[serde(default)]
    pub promoted: bool,
}

/// Deployment status as seen by the deployer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentStatus {
    Running,
    Successful,
    Failed,
    Cancelled,
    /// Any other status string, treated as terminal
    Other(String),
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DeploymentStatus::Running => DEPLOYMENT_STATUS_RUNNING,
            DeploymentStatus::Successful => DEPLOYMENT_STATUS_SUCCESSFUL,
            DeploymentStatus::Failed => DEPLOYMENT_STATUS_FAILED,
            DeploymentStatus::Cancelled => DEPLOYMENT_STATUS_CANCELLED,
            DeploymentStatus::Other(s) => s,
        }
    }
}

impl From<&str> for DeploymentStatus {
    fn from(s: &str) -> Self {
        match s {
            DEPLOYMENT_STATUS_RUNNING => DeploymentStatus::Running,
            DEPLOYMENT_STATUS_SUCCESSFUL => DeploymentStatus::Successful,
            DEPLOYMENT_STATUS_FAILED => DeploymentStatus::Failed,
            DEPLOYMENT_STATUS_CANCELLED => DeploymentStatus::Cancelled,
            other => DeploymentStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `PUT /v1/deployment/promote/:id`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentPromoteRequest<'a> {
    #[serde(rename = "DeploymentID")]
    pub deployment_id: &'a str,
    pub all: bool,
}

/// Body of `PUT /v1/deployment/fail/:id`
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentFailRequest<'a> {
    #[serde(rename = "DeploymentID")]
    pub deployment_id: &'a str,
}

/// Response of deployment update endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentUpdateResponse {
    #[serde(rename = "EvalID", default, deserialize_with = "null_as_default")]
    pub eval_id: String,

    #[serde(default)]
    pub deployment_modify_index: u64,
}
