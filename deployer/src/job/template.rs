//! Job template lookup and parsing

use std::path::{Path, PathBuf};

use nomad_api::Job;
use tracing::debug;

use crate::errors::DeployError;
use crate::gateway::SchedulerGateway;
use crate::storage::layout::ConfigLayout;

/// Source format of a job template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    /// Nomad JSON job, bare or wrapped in `{"Job": ...}`
    Json,
    /// HCL jobspec, converted by the scheduler
    Hcl,
}

impl TemplateFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => TemplateFormat::Json,
            _ => TemplateFormat::Hcl,
        }
    }
}

/// Job template of a service as stored in the repository
#[derive(Debug, Clone)]
pub struct JobTemplate {
    pub path: PathBuf,
    pub format: TemplateFormat,
    pub source: String,
}

impl JobTemplate {
    /// Find the template of `service`, service jobs first, then system jobs
    pub async fn locate(layout: &ConfigLayout, service: &str) -> Result<Self, DeployError> {
        for file in layout.template_candidates(service) {
            if let Some(source) = file.read_string_opt().await? {
                debug!("Loaded job template from {}", file.path().display());
                return Ok(Self {
                    format: TemplateFormat::from_path(file.path()),
                    path: file.path().to_path_buf(),
                    source,
                });
            }
        }
        Err(DeployError::TemplateNotFound(service.to_string()))
    }

    /// Template from an in-memory JSON job
    pub fn from_json(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: TemplateFormat::Json,
            source: source.into(),
        }
    }

    /// Parse the template into a job, asking the scheduler to convert HCL
    pub async fn to_job<G>(&self, gateway: &G) -> Result<Job, DeployError>
    where
        G: SchedulerGateway + ?Sized,
    {
        match self.format {
            TemplateFormat::Json => self.parse_json(),
            TemplateFormat::Hcl => gateway.parse_job(&self.source).await,
        }
    }

    fn parse_json(&self) -> Result<Job, DeployError> {
        let invalid =
            |e: serde_json::Error| DeployError::Validation(format!("{}: {}", self.path.display(), e));

        let mut value: serde_json::Value = serde_json::from_str(&self.source).map_err(invalid)?;
        if let Some(inner) = value.get_mut("Job") {
            value = inner.take();
        }
        serde_json::from_value(value).map_err(invalid)
    }
}
