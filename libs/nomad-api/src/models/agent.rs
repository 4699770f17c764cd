//! Agent models

use serde::Deserialize;

/// Response of `GET /v1/agent/self`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentSelf {
    #[serde(default)]
    pub config: AgentConfig,
}

/// Server defaults read from the agent configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentConfig {
    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub datacenter: String,
}
