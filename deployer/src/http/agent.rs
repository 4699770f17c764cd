//! Agent API client

use nomad_api::AgentSelf;

use crate::errors::DeployError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Configuration of the agent answering the request
    pub async fn agent_self(&self) -> Result<AgentSelf, DeployError> {
        self.get("/v1/agent/self").await
    }
}
