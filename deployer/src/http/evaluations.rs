//! Evaluations API client

use nomad_api::Evaluation;

use crate::errors::DeployError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Read an evaluation
    pub async fn get_evaluation(&self, eval_id: &str) -> Result<Evaluation, DeployError> {
        let path = format!("/v1/evaluation/{}", eval_id);
        self.get(&path).await
    }
}
