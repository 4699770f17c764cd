//! Canary promotion worker
//!
//! Runs next to the deployment watcher for jobs with canaries. Once every
//! canary-bearing task group reports enough healthy allocations, the
//! deployment is promoted. A failed promotion is handed to the watcher
//! through a one-shot channel, the watcher then fails the deployment.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use nomad_api::Deployment;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::errors::DeployError;
use crate::gateway::{QueryOptions, SchedulerGateway};

/// Canary worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Health check interval
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

/// How the worker ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanaryOutcome {
    Promoted,
    /// Promoted by the scheduler or an operator
    AlreadyPromoted,
    PromotionFailed,
    Shutdown,
}

/// Canary state of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Waiting,
    Healthy,
    Promoted,
}

/// Readiness of the canary groups not promoted yet. Deployments without
/// canary groups are waiting.
pub fn readiness(deployment: &Deployment) -> Readiness {
    let canary_groups: Vec<_> = deployment
        .task_groups
        .values()
        .filter(|state| state.desired_canaries > 0)
        .collect();
    if canary_groups.is_empty() {
        return Readiness::Waiting;
    }

    let mut pending = canary_groups.iter().filter(|state| !state.promoted).peekable();
    if pending.peek().is_none() {
        Readiness::Promoted
    } else if pending.all(|state| state.healthy_allocs >= state.desired_canaries) {
        Readiness::Healthy
    } else {
        Readiness::Waiting
    }
}

/// Run the canary worker until the deployment is promoted, the promotion
/// fails or shutdown is signalled. The failure sender is consumed on a failed
/// promotion and dropped otherwise.
pub async fn run<G, S, F>(
    options: &Options,
    gateway: &G,
    deployment_id: &str,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
    failure_tx: oneshot::Sender<DeployError>,
) -> CanaryOutcome
where
    G: SchedulerGateway + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Canary worker starting for deployment {}", deployment_id);

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Canary worker shutting down...");
                return CanaryOutcome::Shutdown;
            }
            _ = sleep_fn(options.interval) => {}
        }

        let deployment = match gateway
            .deployment_info(deployment_id, &QueryOptions::stale())
            .await
        {
            Ok((deployment, _)) => deployment,
            Err(e) => {
                warn!("Failed to read canary health: {}", e);
                continue;
            }
        };

        match readiness(&deployment) {
            Readiness::Waiting => {
                debug!("Canaries of {} not healthy yet", deployment_id);
                continue;
            }
            Readiness::Promoted => {
                info!("Deployment {} already promoted", deployment_id);
                return CanaryOutcome::AlreadyPromoted;
            }
            Readiness::Healthy => {}
        }

        info!("Canaries healthy, promoting deployment {}", deployment_id);
        return match gateway.promote_all(deployment_id).await {
            Ok(()) => {
                info!("Deployment {} promoted", deployment_id);
                CanaryOutcome::Promoted
            }
            Err(e) => {
                error!("Failed to promote deployment {}: {}", deployment_id, e);
                let _ = failure_tx.send(DeployError::CanaryPromotionFailed(e.to_string()));
                CanaryOutcome::PromotionFailed
            }
        };
    }
}
