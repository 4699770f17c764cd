//! Finite State Machine of a deployment run

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Supervisor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    /// Configuration and template loaded
    Loaded,

    /// Connected to the scheduler
    Connected,

    /// Job assembled and accepted by the scheduler
    Validated,

    /// Job planned against the current state
    Planned,

    /// Job registered, evaluation created
    Registered,

    /// Waiting for the evaluation to produce a deployment
    AwaitingDeploymentId,

    /// Deployment rollout in progress
    Watching,

    /// Rollout finished, or no rollout was needed
    Succeeded,

    /// Any stage failed
    Failed,

    /// Assembled job was reported without submitting it
    DryRun,
}

impl SupervisorState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SupervisorState::Succeeded | SupervisorState::Failed | SupervisorState::DryRun
        )
    }
}

/// Supervisor event
#[derive(Debug, Clone)]
pub enum SupervisorEvent {
    /// Scheduler connection established
    Connect,

    /// Assembled job passed validation
    Validate,

    /// Dry run requested after validation
    DryRun,

    /// Plan returned a modify index
    Plan(u64),

    /// Job registered, evaluation id returned
    Register(String),

    /// Evaluation polling started
    AwaitDeployment,

    /// Evaluation produced a deployment
    DeploymentCreated(String),

    /// Evaluation completed without a rollout
    NoDeployment,

    /// Deployment reached `successful`
    DeploymentSucceeded,

    /// Stage error
    Fail(String),
}

/// Supervisor FSM
#[derive(Debug, Clone)]
pub struct SupervisorFsm {
    state: SupervisorState,
    modify_index: Option<u64>,
    eval_id: Option<String>,
    deployment_id: Option<String>,
    error: Option<String>,
}

impl SupervisorFsm {
    /// Create a new FSM in loaded state
    pub fn new() -> Self {
        Self {
            state: SupervisorState::Loaded,
            modify_index: None,
            eval_id: None,
            deployment_id: None,
            error: None,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Job modify index returned by the plan
    pub fn modify_index(&self) -> Option<u64> {
        self.modify_index
    }

    pub fn eval_id(&self) -> Option<&str> {
        self.eval_id.as_deref()
    }

    pub fn deployment_id(&self) -> Option<&str> {
        self.deployment_id.as_deref()
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: SupervisorEvent) -> Result<SupervisorState, DeployError> {
        use SupervisorEvent as E;
        use SupervisorState as S;

        let new_state = match (self.state, event) {
            (S::Loaded, E::Connect) => S::Connected,
            (S::Connected, E::Validate) => S::Validated,
            (S::Validated, E::DryRun) => S::DryRun,

            (S::Validated, E::Plan(index)) => {
                self.modify_index = Some(index);
                S::Planned
            }
            (S::Planned, E::Register(eval_id)) => {
                self.eval_id = Some(eval_id);
                S::Registered
            }
            (S::Registered, E::AwaitDeployment) => S::AwaitingDeploymentId,

            (S::AwaitingDeploymentId, E::DeploymentCreated(id)) => {
                self.deployment_id = Some(id);
                S::Watching
            }
            (S::AwaitingDeploymentId, E::NoDeployment) => S::Succeeded,
            (S::Watching, E::DeploymentSucceeded) => S::Succeeded,

            (state, E::Fail(err)) if !state.is_terminal() => {
                self.error = Some(err);
                S::Failed
            }

            // Invalid transitions
            (state, event) => {
                return Err(DeployError::InvalidTransition(format!(
                    "{:?} -> {:?}",
                    state, event
                )));
            }
        };

        self.state = new_state;
        Ok(new_state)
    }
}

impl Default for SupervisorFsm {
    fn default() -> Self {
        Self::new()
    }
}
