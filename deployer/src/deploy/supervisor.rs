//! Deployment supervisor
//!
//! Drives one deployment through connect, validate, plan, register and
//! watch. Every stage stops the run on its first error; the only wait
//! is the evaluation poll for the deployment id.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use nomad_api::{Job, EVAL_STATUS_COMPLETE};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::deploy::fsm::{SupervisorEvent, SupervisorFsm, SupervisorState};
use crate::deploy::watcher::{self, DeploymentWatcher};
use crate::errors::DeployError;
use crate::gateway::{Connector, SchedulerGateway};
use crate::job::{assemble, AssemblyContext, JobTemplate};
use crate::terminal::Reporter;
use crate::workers::canary::{self, CanaryOutcome};

/// Supervisor options
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Interval between evaluation reads
    pub eval_poll: Duration,

    /// Give up waiting for a deployment id after this long
    pub eval_timeout: Duration,

    pub watch: watcher::Options,

    pub canary: canary::Options,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            eval_poll: Duration::from_secs(1),
            eval_timeout: Duration::from_secs(120),
            watch: watcher::Options::default(),
            canary: canary::Options::default(),
        }
    }
}

/// Everything needed to deploy one service revision
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Scheduler address
    pub address: String,
    pub service_name: String,
    pub service: ServiceConfig,
    pub template: JobTemplate,
    pub image: String,
    pub deployment_label: Option<String>,
    pub federated_dcs: Option<String>,
    /// Stop after validation and report the job
    pub dry_run: bool,
}

/// Successful end of a run
#[derive(Debug, Clone, PartialEq)]
pub enum DeployOutcome {
    /// Rollout finished. No deployment id when the evaluation needed none.
    Succeeded { deployment_id: Option<String> },

    /// Job assembled and validated, nothing submitted
    DryRun(Job),
}

/// Runs one deployment through the supervisor state machine
pub struct DeploymentSupervisor<C: Connector> {
    connector: C,
    reporter: Arc<dyn Reporter>,
    options: SupervisorOptions,
    fsm: SupervisorFsm,
}

/// Registered job waiting to be watched
struct Rollout<G> {
    gateway: Arc<G>,
    deployment_id: String,
    canaries: u32,
}

enum Submitted<G> {
    Finished(DeployOutcome),
    Rollout(Rollout<G>),
}

impl<C: Connector> DeploymentSupervisor<C> {
    pub fn new(connector: C, reporter: Arc<dyn Reporter>, options: SupervisorOptions) -> Self {
        Self {
            connector,
            reporter,
            options,
            fsm: SupervisorFsm::new(),
        }
    }

    /// Run the deployment, returning the result with the final state
    /// machine. On error the state machine ends in `Failed`.
    ///
    /// The shutdown signal interrupts the run. While watching, the canary
    /// worker is stopped and joined and a running deployment is failed
    /// before `Interrupted` is returned.
    pub async fn run<F>(
        mut self,
        request: &DeployRequest,
        shutdown_signal: F,
    ) -> (Result<DeployOutcome, DeployError>, SupervisorFsm)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown_signal);
        let result = self.drive(request, shutdown_signal.as_mut()).await;
        if let Err(e) = &result {
            if let Err(fsm_err) = self.fsm.process(SupervisorEvent::Fail(e.to_string())) {
                warn!("{}", fsm_err);
            }
        }
        (result, self.fsm)
    }

    async fn drive<F>(
        &mut self,
        request: &DeployRequest,
        mut shutdown: Pin<&mut F>,
    ) -> Result<DeployOutcome, DeployError>
    where
        F: Future<Output = ()>,
    {
        if self.fsm.state() != SupervisorState::Loaded {
            return Err(DeployError::InvalidTransition(format!(
                "{:?} -> {:?}",
                self.fsm.state(),
                SupervisorEvent::Connect
            )));
        }

        let submitted = tokio::select! {
            submitted = self.submit(request) => submitted?,
            _ = shutdown.as_mut() => return Err(DeployError::Interrupted),
        };
        let rollout = match submitted {
            Submitted::Finished(outcome) => return Ok(outcome),
            Submitted::Rollout(rollout) => rollout,
        };

        self.reporter
            .step(&format!("Watching deployment {}", rollout.deployment_id));
        self.watch(&rollout, shutdown).await?;
        self.fsm.process(SupervisorEvent::DeploymentSucceeded)?;

        self.reporter
            .success(&format!("Deployment {} successful", rollout.deployment_id));
        Ok(DeployOutcome::Succeeded {
            deployment_id: Some(rollout.deployment_id),
        })
    }

    /// Everything up to the deployment id. Nothing runs in the background
    /// yet, so this can be dropped at any await.
    async fn submit(
        &mut self,
        request: &DeployRequest,
    ) -> Result<Submitted<C::Gateway>, DeployError> {
        self.reporter
            .step(&format!("Connecting to {}", request.address));
        let gateway = Arc::new(self.connector.connect(&request.address).await?);
        let defaults = gateway.agent_defaults().await?;
        info!(
            "Scheduler region {} datacenter {}",
            defaults.region, defaults.datacenter
        );
        self.fsm.process(SupervisorEvent::Connect)?;

        let template = request.template.to_job(&*gateway).await?;
        let ctx = AssemblyContext {
            service: &request.service_name,
            image: &request.image,
            region: &defaults.region,
            datacenter: &defaults.datacenter,
            deployment_label: request.deployment_label.as_deref(),
            federated_dcs: request.federated_dcs.as_deref(),
        };
        let job = assemble(&template, &request.service, &ctx)?;
        let job_name = job
            .id_or_name()
            .unwrap_or(&request.service_name)
            .to_string();
        self.reporter.step(&format!("Validating job {}", job_name));
        gateway.validate(&job).await?;
        self.fsm.process(SupervisorEvent::Validate)?;

        if request.dry_run {
            self.reporter.job(&job);
            self.fsm.process(SupervisorEvent::DryRun)?;
            return Ok(Submitted::Finished(DeployOutcome::DryRun(job)));
        }

        let modify_index = gateway.plan(&job).await?;
        debug!("Planned job {} at modify index {}", job_name, modify_index);
        self.fsm.process(SupervisorEvent::Plan(modify_index))?;

        self.reporter
            .step(&format!("Registering {} with image {}", job_name, request.image));
        let eval_id = gateway.register(&job, modify_index).await?;
        info!("Job registered, evaluation {}", eval_id);
        self.fsm.process(SupervisorEvent::Register(eval_id.clone()))?;

        self.fsm.process(SupervisorEvent::AwaitDeployment)?;
        let deployment_id = match self.await_deployment(&*gateway, &eval_id).await? {
            Some(id) => id,
            None => {
                info!(
                    "Evaluation {} of {} job {} needs no deployment",
                    eval_id,
                    job.job_type(),
                    job_name
                );
                self.fsm.process(SupervisorEvent::NoDeployment)?;
                return Ok(Submitted::Finished(DeployOutcome::Succeeded {
                    deployment_id: None,
                }));
            }
        };
        self.fsm
            .process(SupervisorEvent::DeploymentCreated(deployment_id.clone()))?;

        let canaries = if job.auto_promote() {
            info!("Canaries of {} are promoted by the scheduler", job_name);
            0
        } else {
            job.canary_count()
        };
        Ok(Submitted::Rollout(Rollout {
            gateway,
            deployment_id,
            canaries,
        }))
    }

    /// Poll the evaluation until it names a deployment. `None` when the
    /// evaluation completes without one, there is no rollout to watch then.
    async fn await_deployment<G>(
        &self,
        gateway: &G,
        eval_id: &str,
    ) -> Result<Option<String>, DeployError>
    where
        G: SchedulerGateway + ?Sized,
    {
        let deadline = Instant::now() + self.options.eval_timeout;

        loop {
            let evaluation = gateway.evaluation_info(eval_id).await?;

            if let Some(deployment_id) = evaluation.deployment_id() {
                return Ok(Some(deployment_id.to_string()));
            }
            if evaluation.is_aborted() {
                return Err(DeployError::EvaluationFailed {
                    eval_id: eval_id.to_string(),
                    reason: format!(
                        "evaluation {} {}",
                        evaluation.status, evaluation.status_description
                    )
                    .trim_end()
                    .to_string(),
                });
            }
            if evaluation.status == EVAL_STATUS_COMPLETE {
                // a service job registered unchanged completes without a deployment
                return Ok(None);
            }
            if Instant::now() >= deadline {
                return Err(DeployError::EvaluationFailed {
                    eval_id: eval_id.to_string(),
                    reason: format!(
                        "no deployment after {}s",
                        self.options.eval_timeout.as_secs()
                    ),
                });
            }

            debug!("Evaluation {} is {}", eval_id, evaluation.status);
            tokio::time::sleep(self.options.eval_poll).await;
        }
    }

    /// Watch the deployment, with the canary worker alongside for canary
    /// jobs. The worker is stopped and joined before returning, also when
    /// the shutdown signal ends the watch.
    async fn watch<F>(
        &self,
        rollout: &Rollout<C::Gateway>,
        shutdown: Pin<&mut F>,
    ) -> Result<(), DeployError>
    where
        F: Future<Output = ()>,
    {
        let watcher = DeploymentWatcher::new(
            &*rollout.gateway,
            &*self.reporter,
            &rollout.deployment_id,
            self.options.watch.clone(),
        );

        let (failure_rx, monitor) = if rollout.canaries > 0 {
            info!(
                "Job has {} canaries, starting canary worker",
                rollout.canaries
            );
            let (failure_tx, failure_rx) = oneshot::channel();
            let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
            let handle = self.spawn_canary_worker(
                rollout.gateway.clone(),
                rollout.deployment_id.clone(),
                failure_tx,
                shutdown_rx,
            );
            (Some(failure_rx), Some((shutdown_tx, handle)))
        } else {
            (None, None)
        };

        let result = tokio::select! {
            result = watcher.watch(failure_rx) => result,
            _ = shutdown => Err(DeployError::Interrupted),
        };

        if let Some((shutdown_tx, handle)) = monitor {
            let _ = shutdown_tx.send(());
            match handle.await {
                Ok(outcome) => debug!("Canary worker ended: {:?}", outcome),
                Err(e) => warn!("Canary worker panicked: {}", e),
            }
        }

        match result {
            Err(DeployError::Interrupted) => {
                self.reporter.warning("Interrupted, stopping the deployment");
                Err(watcher.interrupt().await)
            }
            other => other,
        }
    }

    fn spawn_canary_worker(
        &self,
        gateway: Arc<C::Gateway>,
        deployment_id: String,
        failure_tx: oneshot::Sender<DeployError>,
        shutdown_rx: oneshot::Receiver<()>,
    ) -> JoinHandle<CanaryOutcome> {
        let options = self.options.canary.clone();
        tokio::spawn(async move {
            let shutdown = Box::pin(async move {
                let _ = shutdown_rx.await;
            });
            canary::run(
                &options,
                &*gateway,
                &deployment_id,
                tokio::time::sleep,
                shutdown,
                failure_tx,
            )
            .await
        })
    }
}
