//! Nomad implementation of the scheduler gateway

use std::time::Duration;

use async_trait::async_trait;
use nomad_api::{Deployment, Evaluation, Job};
use secrecy::SecretString;
use tracing::{debug, info};

use crate::errors::DeployError;
use crate::gateway::{AgentDefaults, Connector, QueryOptions, SchedulerGateway};
use crate::http::client::HttpClient;

/// Gateway talking to a Nomad server over HTTP
pub struct NomadGateway {
    client: HttpClient,
}

impl NomadGateway {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SchedulerGateway for NomadGateway {
    async fn agent_defaults(&self) -> Result<AgentDefaults, DeployError> {
        let agent = self.client.agent_self().await?;
        Ok(AgentDefaults {
            region: agent.config.region,
            datacenter: agent.config.datacenter,
        })
    }

    async fn parse_job(&self, hcl: &str) -> Result<Job, DeployError> {
        self.client.parse_job_hcl(hcl).await
    }

    async fn validate(&self, job: &Job) -> Result<(), DeployError> {
        self.client.validate_job(job).await
    }

    async fn plan(&self, job: &Job) -> Result<u64, DeployError> {
        let plan = self.client.plan_job(job).await?;
        if !plan.warnings.is_empty() {
            info!("Plan warnings: {}", plan.warnings.trim());
        }
        Ok(plan.job_modify_index)
    }

    async fn register(&self, job: &Job, modify_index: u64) -> Result<String, DeployError> {
        let registered = self.client.register_job(job, modify_index).await?;
        if !registered.warnings.is_empty() {
            info!("Register warnings: {}", registered.warnings.trim());
        }
        Ok(registered.eval_id)
    }

    async fn evaluation_info(&self, eval_id: &str) -> Result<Evaluation, DeployError> {
        self.client.get_evaluation(eval_id).await
    }

    async fn deployment_info(
        &self,
        deployment_id: &str,
        query: &QueryOptions,
    ) -> Result<(Deployment, u64), DeployError> {
        self.client.get_deployment(deployment_id, query).await
    }

    async fn promote_all(&self, deployment_id: &str) -> Result<(), DeployError> {
        let response = self.client.promote_deployment(deployment_id).await?;
        debug!("Promotion created evaluation {}", response.eval_id);
        Ok(())
    }

    async fn fail_deployment(&self, deployment_id: &str) -> Result<(), DeployError> {
        let response = self.client.fail_deployment(deployment_id).await?;
        debug!("Fail created evaluation {}", response.eval_id);
        Ok(())
    }

    async fn allocation_errors(&self, deployment_id: &str) -> Result<Vec<String>, DeployError> {
        let allocations = self.client.deployment_allocations(deployment_id).await?;
        Ok(allocations
            .iter()
            .flat_map(|alloc| alloc.task_errors())
            .collect())
    }
}

/// Connects to Nomad servers with a shared token and timeout
#[derive(Debug, Clone)]
pub struct NomadConnector {
    token: Option<SecretString>,
    timeout: Duration,
}

impl NomadConnector {
    pub fn new(token: Option<SecretString>, timeout: Duration) -> Self {
        Self { token, timeout }
    }
}

#[async_trait]
impl Connector for NomadConnector {
    type Gateway = NomadGateway;

    async fn connect(&self, address: &str) -> Result<NomadGateway, DeployError> {
        let client = HttpClient::new(address, self.token.clone(), self.timeout)?;
        info!("Connected to scheduler at {}", client.base_url());
        Ok(NomadGateway::new(client))
    }
}
