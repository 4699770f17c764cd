//! Jobs API client

use nomad_api::{
    Job, JobPlanRequest, JobPlanResponse, JobRegisterRequest, JobRegisterResponse,
    JobValidateRequest, JobValidateResponse, JobsParseRequest,
};
use reqwest::Method;

use crate::errors::DeployError;
use crate::http::client::{ApiResponse, HttpClient};

/// Prefix of the scheduler's error when an enforced register loses the race
const ENFORCE_INDEX_ERROR: &str = "Enforcing job modify index";

impl HttpClient {
    /// Convert an HCL jobspec to a job
    pub async fn parse_job_hcl(&self, hcl: &str) -> Result<Job, DeployError> {
        let path = "/v1/jobs/parse";
        let body = JobsParseRequest {
            job_hcl: hcl,
            canonicalize: false,
        };
        let response = self.post_raw(path, &body).await?;
        if response.status.is_client_error() {
            return Err(DeployError::Validation(response.body.trim().to_string()));
        }
        response.ok(&Method::POST, path)?.json()
    }

    /// Validate a job
    pub async fn validate_job(&self, job: &Job) -> Result<(), DeployError> {
        let path = "/v1/validate/job";
        let response = self.put_raw(path, &JobValidateRequest { job }).await?;
        if response.status.is_client_error() {
            return Err(DeployError::Validation(response.body.trim().to_string()));
        }

        let result: JobValidateResponse = response.ok(&Method::PUT, path)?.json()?;
        if !result.validation_errors.is_empty() {
            return Err(DeployError::Validation(result.validation_errors.join("; ")));
        }
        if !result.error.is_empty() {
            return Err(DeployError::Validation(result.error));
        }
        Ok(())
    }

    /// Dry-run a job update
    pub async fn plan_job(&self, job: &Job) -> Result<JobPlanResponse, DeployError> {
        let path = format!("/v1/job/{}/plan", job_id(job)?);
        self.put(&path, &JobPlanRequest { job, diff: false }).await
    }

    /// Register a job if its modify index still equals `modify_index`
    pub async fn register_job(
        &self,
        job: &Job,
        modify_index: u64,
    ) -> Result<JobRegisterResponse, DeployError> {
        let path = "/v1/jobs";
        let body = JobRegisterRequest {
            job,
            enforce_index: true,
            job_modify_index: modify_index,
        };
        let response = self.put_raw(path, &body).await?;
        if is_index_conflict(&response) {
            return Err(DeployError::RegisterConflict(response.body.trim().to_string()));
        }
        response.ok(&Method::PUT, path)?.json()
    }
}

fn job_id(job: &Job) -> Result<&str, DeployError> {
    job.id_or_name()
        .ok_or_else(|| DeployError::Validation("job has neither ID nor Name".to_string()))
}

fn is_index_conflict(response: &ApiResponse) -> bool {
    !response.status.is_success() && response.body.contains(ENFORCE_INDEX_ERROR)
}
