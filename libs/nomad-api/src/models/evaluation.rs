//! Evaluation models

use serde::Deserialize;

use super::null_as_default;

pub const EVAL_STATUS_PENDING: &str = "pending";
pub const EVAL_STATUS_COMPLETE: &str = "complete";
pub const EVAL_STATUS_FAILED: &str = "failed";
pub const EVAL_STATUS_CANCELED: &str = "canceled";

/// Evaluation created by registering a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Evaluation {
    #[serde(rename = "ID", default)]
    pub id: String,

    #[serde(default)]
    pub status: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status_description: String,

    #[serde(rename = "Type", default)]
    pub eval_type: String,

    #[serde(rename = "DeploymentID", default, deserialize_with = "null_as_default")]
    pub deployment_id: String,
}

impl Evaluation {
    /// Deployment created by this evaluation, if any
    pub fn deployment_id(&self) -> Option<&str> {
        if self.deployment_id.is_empty() {
            None
        } else {
            Some(&self.deployment_id)
        }
    }

    /// Whether the scheduler gave up on the evaluation
    pub fn is_aborted(&self) -> bool {
        self.status == EVAL_STATUS_FAILED || self.status == EVAL_STATUS_CANCELED
    }
}
