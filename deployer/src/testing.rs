//! In-memory scheduler and reporter used by the unit tests

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nomad_api::{
    Deployment, DeploymentState, Evaluation, Job, EVAL_STATUS_COMPLETE, JOB_TYPE_SERVICE,
};

use crate::errors::DeployError;
use crate::gateway::{AgentDefaults, Connector, QueryOptions, SchedulerGateway};
use crate::terminal::{DeploymentProgress, Reporter};

pub const DEPLOYMENT_ID: &str = "dep-1";
pub const EVAL_ID: &str = "eval-1";

/// Deployment with the given status and one `api` group
pub fn deployment(status: &str, desired_canaries: u32, healthy: u32) -> Deployment {
    let mut task_groups = BTreeMap::new();
    task_groups.insert(
        "api".to_string(),
        DeploymentState {
            desired_total: 3,
            placed_allocs: 3,
            healthy_allocs: healthy,
            desired_canaries,
            ..Default::default()
        },
    );
    Deployment {
        id: DEPLOYMENT_ID.to_string(),
        job_id: "api".to_string(),
        status: status.to_string(),
        status_description: format!("Deployment is {}", status),
        task_groups,
    }
}

/// Scripted scheduler.
///
/// Blocking deployment reads walk through the scripted deployments, the last
/// one repeating. Running deployments block for the full wait time like a
/// long poll that saw no change. Non-blocking reads return the current
/// script head without consuming it.
pub struct FakeGateway {
    defaults: AgentDefaults,
    evaluations: Mutex<VecDeque<Evaluation>>,
    deployments: Mutex<VecDeque<Deployment>>,
    plan_index: u64,
    register_conflict: bool,
    validation_error: Option<String>,
    watch_error: Option<String>,
    promote_error: Option<String>,
    promote_delay: Duration,
    allocation_errors: Vec<String>,
    registered: Mutex<Vec<(Job, u64)>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            defaults: AgentDefaults {
                region: "global".to_string(),
                datacenter: "dc1".to_string(),
            },
            evaluations: Mutex::new(VecDeque::new()),
            deployments: Mutex::new(VecDeque::new()),
            plan_index: 42,
            register_conflict: false,
            validation_error: None,
            watch_error: None,
            promote_error: None,
            promote_delay: Duration::ZERO,
            allocation_errors: Vec::new(),
            registered: Mutex::new(Vec::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl FakeGateway {
    pub fn with_deployments(self, deployments: Vec<Deployment>) -> Self {
        *self.deployments.lock().unwrap() = deployments.into();
        self
    }

    /// Shorthand for deployments without canaries
    pub fn with_statuses(self, statuses: &[&str]) -> Self {
        let deployments = statuses.iter().map(|s| deployment(s, 0, 3)).collect();
        self.with_deployments(deployments)
    }

    pub fn with_evaluations(self, evaluations: Vec<Evaluation>) -> Self {
        *self.evaluations.lock().unwrap() = evaluations.into();
        self
    }

    pub fn with_register_conflict(mut self) -> Self {
        self.register_conflict = true;
        self
    }

    pub fn with_validation_error(mut self, message: &str) -> Self {
        self.validation_error = Some(message.to_string());
        self
    }

    pub fn with_watch_error(mut self, message: &str) -> Self {
        self.watch_error = Some(message.to_string());
        self
    }

    pub fn with_promote_error(mut self, message: &str) -> Self {
        self.promote_error = Some(message.to_string());
        self
    }

    /// Promotions take this long before they are recorded
    pub fn with_promote_delay(mut self, delay: Duration) -> Self {
        self.promote_delay = delay;
        self
    }

    pub fn with_allocation_errors(mut self, errors: &[&str]) -> Self {
        self.allocation_errors = errors.iter().map(|e| e.to_string()).collect();
        self
    }

    /// Number of calls of a gateway operation
    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    /// Jobs registered so far with their enforced index
    pub fn registered(&self) -> Vec<(Job, u64)> {
        self.registered.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
    }

    fn next_deployment(&self, consume: bool) -> Deployment {
        let mut deployments = self.deployments.lock().unwrap();
        let current = deployments
            .front()
            .cloned()
            .unwrap_or_else(|| deployment("successful", 0, 3));
        if consume && deployments.len() > 1 {
            deployments.pop_front();
        }
        current
    }
}

#[async_trait]
impl SchedulerGateway for FakeGateway {
    async fn agent_defaults(&self) -> Result<AgentDefaults, DeployError> {
        self.record("agent_defaults");
        Ok(self.defaults.clone())
    }

    async fn parse_job(&self, _hcl: &str) -> Result<Job, DeployError> {
        self.record("parse_job");
        Ok(Job {
            id: Some("api".to_string()),
            ..Default::default()
        })
    }

    async fn validate(&self, _job: &Job) -> Result<(), DeployError> {
        self.record("validate");
        match &self.validation_error {
            Some(message) => Err(DeployError::Validation(message.clone())),
            None => Ok(()),
        }
    }

    async fn plan(&self, _job: &Job) -> Result<u64, DeployError> {
        self.record("plan");
        Ok(self.plan_index)
    }

    async fn register(&self, job: &Job, modify_index: u64) -> Result<String, DeployError> {
        self.record("register");
        if self.register_conflict {
            return Err(DeployError::RegisterConflict(format!(
                "Enforcing job modify index {}: job exists with conflicting job modify index: {}",
                modify_index,
                modify_index + 1
            )));
        }
        self.registered
            .lock()
            .unwrap()
            .push((job.clone(), modify_index));
        Ok(EVAL_ID.to_string())
    }

    async fn evaluation_info(&self, eval_id: &str) -> Result<Evaluation, DeployError> {
        self.record("evaluation_info");
        let mut evaluations = self.evaluations.lock().unwrap();
        let evaluation = evaluations.front().cloned().unwrap_or_else(|| Evaluation {
            id: eval_id.to_string(),
            status: EVAL_STATUS_COMPLETE.to_string(),
            eval_type: JOB_TYPE_SERVICE.to_string(),
            deployment_id: DEPLOYMENT_ID.to_string(),
            ..Default::default()
        });
        if evaluations.len() > 1 {
            evaluations.pop_front();
        }
        Ok(evaluation)
    }

    async fn deployment_info(
        &self,
        _deployment_id: &str,
        query: &QueryOptions,
    ) -> Result<(Deployment, u64), DeployError> {
        if query.wait_index == 0 {
            self.record("deployment_read");
            return Ok((self.next_deployment(false), 0));
        }

        self.record("deployment_info");
        if let Some(message) = &self.watch_error {
            return Err(DeployError::Gateway(message.clone()));
        }
        let deployment = self.next_deployment(true);
        if deployment.status == "running" {
            tokio::time::sleep(query.wait_time).await;
        }
        Ok((deployment, query.wait_index + 1))
    }

    async fn promote_all(&self, _deployment_id: &str) -> Result<(), DeployError> {
        if !self.promote_delay.is_zero() {
            tokio::time::sleep(self.promote_delay).await;
        }
        self.record("promote_all");
        match &self.promote_error {
            Some(message) => Err(DeployError::Gateway(message.clone())),
            None => Ok(()),
        }
    }

    async fn fail_deployment(&self, _deployment_id: &str) -> Result<(), DeployError> {
        self.record("fail_deployment");
        Ok(())
    }

    async fn allocation_errors(&self, _deployment_id: &str) -> Result<Vec<String>, DeployError> {
        self.record("allocation_errors");
        Ok(self.allocation_errors.clone())
    }
}

/// Connector handing out one shared fake gateway
pub struct FakeConnector {
    pub gateway: Arc<FakeGateway>,
}

impl FakeConnector {
    pub fn new(gateway: FakeGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Gateway = Arc<FakeGateway>;

    async fn connect(&self, _address: &str) -> Result<Arc<FakeGateway>, DeployError> {
        self.gateway.record("connect");
        Ok(self.gateway.clone())
    }
}

/// Reporter remembering what it was told
#[derive(Default)]
pub struct RecordingReporter {
    pub steps: Mutex<Vec<String>>,
    pub progress: Mutex<Vec<DeploymentProgress>>,
    pub allocation_errors: Mutex<Vec<String>>,
    pub jobs: Mutex<Vec<Job>>,
    pub warnings: Mutex<Vec<String>>,
}

impl Reporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.steps.lock().unwrap().push(message.to_string());
    }

    fn progress(&self, progress: &DeploymentProgress) {
        self.progress.lock().unwrap().push(progress.clone());
    }

    fn allocation_errors(&self, errors: &[String]) {
        self.allocation_errors
            .lock()
            .unwrap()
            .extend(errors.iter().cloned());
    }

    fn job(&self, job: &Job) {
        self.jobs.lock().unwrap().push(job.clone());
    }

    fn warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn success(&self, message: &str) {
        self.steps.lock().unwrap().push(message.to_string());
    }
}
