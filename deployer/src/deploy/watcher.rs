//! Deployment watcher
//!
//! Follows a deployment with blocking queries until it reaches a terminal
//! status. A failure sent by the canary worker preempts the poll in flight.

use std::time::Duration;

use nomad_api::{Deployment, DeploymentStatus};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::errors::DeployError;
use crate::gateway::{QueryOptions, SchedulerGateway};
use crate::terminal::{DeploymentProgress, Reporter};

/// Watcher options
#[derive(Debug, Clone)]
pub struct Options {
    /// Upper bound of one blocking query
    pub wait_time: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            wait_time: Duration::from_secs(5),
        }
    }
}

enum Step {
    Polled(Result<(Deployment, u64), DeployError>),
    Signalled(Result<DeployError, oneshot::error::RecvError>),
}

/// Watches one deployment to completion
pub struct DeploymentWatcher<'a, G: SchedulerGateway + ?Sized> {
    gateway: &'a G,
    reporter: &'a dyn Reporter,
    deployment_id: &'a str,
    options: Options,
}

impl<'a, G: SchedulerGateway + ?Sized> DeploymentWatcher<'a, G> {
    pub fn new(
        gateway: &'a G,
        reporter: &'a dyn Reporter,
        deployment_id: &'a str,
        options: Options,
    ) -> Self {
        Self {
            gateway,
            reporter,
            deployment_id,
            options,
        }
    }

    /// Watch until the deployment succeeds or fails.
    ///
    /// `failure_rx` carries the canary worker's failure. A closed channel
    /// means the worker finished without one.
    pub async fn watch(
        &self,
        mut failure_rx: Option<oneshot::Receiver<DeployError>>,
    ) -> Result<(), DeployError> {
        let mut wait_index = 1;

        loop {
            let query = QueryOptions::blocking(wait_index, self.options.wait_time);
            let poll = self.gateway.deployment_info(self.deployment_id, &query);

            let step = match failure_rx.as_mut() {
                Some(rx) => tokio::select! {
                    signal = rx => Step::Signalled(signal),
                    result = poll => Step::Polled(result),
                },
                None => Step::Polled(poll.await),
            };

            let (deployment, last_index) = match step {
                Step::Signalled(Ok(cause)) => return Err(self.abort(cause).await),
                Step::Signalled(Err(_)) => {
                    debug!("Canary worker finished without failure");
                    failure_rx = None;
                    continue;
                }
                Step::Polled(Ok(polled)) => polled,
                Step::Polled(Err(e)) => {
                    error!("Lost track of deployment {}: {}", self.deployment_id, e);
                    self.fail_best_effort().await;
                    return Err(e);
                }
            };

            match deployment.status() {
                DeploymentStatus::Running => {
                    self.reporter.progress(&DeploymentProgress::from(&deployment));
                    wait_index = last_index;
                }
                DeploymentStatus::Successful => {
                    info!("Deployment {} successful", self.deployment_id);
                    return Ok(());
                }
                status => {
                    warn!("Deployment {} ended {}", self.deployment_id, status);
                    let causes = self.collect_errors().await;
                    return Err(DeployError::DeploymentFailed {
                        deployment_id: self.deployment_id.to_string(),
                        status: status.to_string(),
                        description: deployment.status_description,
                        causes,
                    });
                }
            }
        }
    }

    /// Fail the deployment if it is still running after a canary failure
    async fn abort(&self, cause: DeployError) -> DeployError {
        warn!("Canary promotion of {} failed: {}", self.deployment_id, cause);
        let status = self.fail_if_running().await;

        DeployError::DeploymentFailed {
            deployment_id: self.deployment_id.to_string(),
            status: status.to_string(),
            description: cause.to_string(),
            causes: self.collect_errors().await,
        }
    }

    /// Stop following the deployment on interrupt. A running deployment is
    /// failed so no half-finished rollout is left behind.
    pub async fn interrupt(&self) -> DeployError {
        let status = self.fail_if_running().await;
        info!("Left deployment {} {}", self.deployment_id, status);
        DeployError::Interrupted
    }

    /// Re-read the status and fail the deployment once if it is running
    async fn fail_if_running(&self) -> DeploymentStatus {
        let status = match self
            .gateway
            .deployment_info(self.deployment_id, &QueryOptions::stale())
            .await
        {
            Ok((deployment, _)) => deployment.status(),
            Err(e) => {
                warn!("Cannot re-read deployment {}: {}", self.deployment_id, e);
                DeploymentStatus::Running
            }
        };
        if status != DeploymentStatus::Running {
            return status;
        }

        self.reporter
            .warning(&format!("Failing deployment {}", self.deployment_id));
        match self.gateway.fail_deployment(self.deployment_id).await {
            Ok(()) => DeploymentStatus::Failed,
            Err(e) => {
                error!("Failed to fail deployment {}: {}", self.deployment_id, e);
                status
            }
        }
    }

    /// One fail call after losing the deployment, errors are only logged
    async fn fail_best_effort(&self) {
        if let Err(e) = self.gateway.fail_deployment(self.deployment_id).await {
            warn!("Could not fail deployment {}: {}", self.deployment_id, e);
        }
    }

    async fn collect_errors(&self) -> Vec<String> {
        match self.gateway.allocation_errors(self.deployment_id).await {
            Ok(errors) => {
                self.reporter.allocation_errors(&errors);
                errors
            }
            Err(e) => {
                warn!("Cannot read allocations of {}: {}", self.deployment_id, e);
                Vec::new()
            }
        }
    }
}
