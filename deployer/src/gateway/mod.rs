//! Scheduler gateway
//!
//! The operations the deployer needs from the cluster scheduler. The Nomad
//! implementation lives in [`nomad`]; tests use an in-memory fake.

pub mod nomad;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nomad_api::{Deployment, Evaluation, Job};

use crate::errors::DeployError;

pub use nomad::NomadConnector;

/// Region and datacenter the connected server belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentDefaults {
    pub region: String,
    pub datacenter: String,
}

/// Read options of deployment queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Block until the index moves past this value, zero does not block
    pub wait_index: u64,

    /// Upper bound of a blocking query
    pub wait_time: Duration,

    /// Allow any server to answer, not only the leader
    pub allow_stale: bool,
}

impl QueryOptions {
    /// Blocking query returning on change or after `wait_time`
    pub fn blocking(wait_index: u64, wait_time: Duration) -> Self {
        Self {
            wait_index,
            wait_time,
            allow_stale: true,
        }
    }

    /// Immediate, possibly stale read
    pub fn stale() -> Self {
        Self {
            wait_index: 0,
            wait_time: Duration::ZERO,
            allow_stale: true,
        }
    }
}

/// Operations of the remote scheduler used by a deployment
#[async_trait]
pub trait SchedulerGateway: Send + Sync {
    /// Server default region and datacenter
    async fn agent_defaults(&self) -> Result<AgentDefaults, DeployError>;

    /// Convert an HCL jobspec into a job
    async fn parse_job(&self, hcl: &str) -> Result<Job, DeployError>;

    /// Syntactic and semantic check of a job
    async fn validate(&self, job: &Job) -> Result<(), DeployError>;

    /// Dry-run the job, returning the job modify index to register against
    async fn plan(&self, job: &Job) -> Result<u64, DeployError>;

    /// Register the job only if its modify index still equals `modify_index`,
    /// returning the evaluation id
    async fn register(&self, job: &Job, modify_index: u64) -> Result<String, DeployError>;

    async fn evaluation_info(&self, eval_id: &str) -> Result<Evaluation, DeployError>;

    /// Deployment status and the index to block on next
    async fn deployment_info(
        &self,
        deployment_id: &str,
        query: &QueryOptions,
    ) -> Result<(Deployment, u64), DeployError>;

    async fn promote_all(&self, deployment_id: &str) -> Result<(), DeployError>;

    async fn fail_deployment(&self, deployment_id: &str) -> Result<(), DeployError>;

    /// Task event error strings of the deployment's allocations
    async fn allocation_errors(&self, deployment_id: &str) -> Result<Vec<String>, DeployError>;
}

/// Opens gateway connections
#[async_trait]
pub trait Connector: Send + Sync {
    type Gateway: SchedulerGateway + 'static;

    async fn connect(&self, address: &str) -> Result<Self::Gateway, DeployError>;
}

#[async_trait]
impl<G: SchedulerGateway + ?Sized> SchedulerGateway for Arc<G> {
    async fn agent_defaults(&self) -> Result<AgentDefaults, DeployError> {
        (**self).agent_defaults().await
    }

    async fn parse_job(&self, hcl: &str) -> Result<Job, DeployError> {
        (**self).parse_job(hcl).await
    }

    async fn validate(&self, job: &Job) -> Result<(), DeployError> {
        (**self).validate(job).await
    }

    async fn plan(&self, job: &Job) -> Result<u64, DeployError> {
        (**self).plan(job).await
    }

    async fn register(&self, job: &Job, modify_index: u64) -> Result<String, DeployError> {
        (**self).register(job, modify_index).await
    }

    async fn evaluation_info(&self, eval_id: &str) -> Result<Evaluation, DeployError> {
        (**self).evaluation_info(eval_id).await
    }

    async fn deployment_info(
        &self,
        deployment_id: &str,
        query: &QueryOptions,
    ) -> Result<(Deployment, u64), DeployError> {
        (**self).deployment_info(deployment_id, query).await
    }

    async fn promote_all(&self, deployment_id: &str) -> Result<(), DeployError> {
        (**self).promote_all(deployment_id).await
    }

    async fn fail_deployment(&self, deployment_id: &str) -> Result<(), DeployError> {
        (**self).fail_deployment(deployment_id).await
    }

    async fn allocation_errors(&self, deployment_id: &str) -> Result<Vec<String>, DeployError> {
        (**self).allocation_errors(deployment_id).await
    }
}
