//! Deployments API client

use nomad_api::{
    AllocationListStub, Deployment, DeploymentFailRequest, DeploymentPromoteRequest,
    DeploymentUpdateResponse,
};

use crate::errors::DeployError;
use crate::gateway::QueryOptions;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Read a deployment, blocking while its index is at `query.wait_index`
    pub async fn get_deployment(
        &self,
        deployment_id: &str,
        query: &QueryOptions,
    ) -> Result<(Deployment, u64), DeployError> {
        let path = format!("/v1/deployment/{}", deployment_id);
        self.get_blocking(&path, query).await
    }

    /// Promote every canary of the deployment
    pub async fn promote_deployment(
        &self,
        deployment_id: &str,
    ) -> Result<DeploymentUpdateResponse, DeployError> {
        let path = format!("/v1/deployment/promote/{}", deployment_id);
        let body = DeploymentPromoteRequest {
            deployment_id,
            all: true,
        };
        self.put(&path, &body).await
    }

    /// Mark the deployment as failed, rolling back if the job allows it
    pub async fn fail_deployment(
        &self,
        deployment_id: &str,
    ) -> Result<DeploymentUpdateResponse, DeployError> {
        let path = format!("/v1/deployment/fail/{}", deployment_id);
        self.put(&path, &DeploymentFailRequest { deployment_id }).await
    }

    /// Allocations placed by the deployment
    pub async fn deployment_allocations(
        &self,
        deployment_id: &str,
    ) -> Result<Vec<AllocationListStub>, DeployError> {
        let path = format!("/v1/deployment/allocations/{}", deployment_id);
        self.get(&path).await
    }
}
