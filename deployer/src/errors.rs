//! Error types for the deployer

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the deployer
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Configuration not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Configuration parse error in {}: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("Service {service} is not configured for {environment}")]
    ServiceNotConfigured { service: String, environment: String },

    #[error("Job template not found for service {0}")]
    TemplateNotFound(String),

    #[error("Job validation failed: {0}")]
    Validation(String),

    #[error("Job was modified concurrently, plan again: {0}")]
    RegisterConflict(String),

    #[error("Scheduler error: {0}")]
    Gateway(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Evaluation {eval_id} ended without a deployment: {reason}")]
    EvaluationFailed { eval_id: String, reason: String },

    #[error("Deployment {deployment_id} {status}: {description}{}", format_causes(.causes))]
    DeploymentFailed {
        deployment_id: String,
        status: String,
        description: String,
        causes: Vec<String>,
    },

    #[error("Canary promotion failed: {0}")]
    CanaryPromotionFailed(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Settings error: {0}")]
    SettingsError(String),

    #[error("Deployment interrupted")]
    Interrupted,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployError {
    /// Network or RPC failure talking to the scheduler. The pipeline never
    /// retries these itself.
    pub fn is_transient(&self) -> bool {
        matches!(self, DeployError::Gateway(_) | DeployError::Http(_))
    }
}

fn format_causes(causes: &[String]) -> String {
    if causes.is_empty() {
        String::new()
    } else {
        format!(" ({})", causes.join("; "))
    }
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::Internal(err.to_string())
    }
}
