//! FSM unit tests

use shipyard::deploy::fsm::{SupervisorEvent, SupervisorFsm, SupervisorState};
use shipyard::errors::DeployError;

fn validated() -> SupervisorFsm {
    let mut fsm = SupervisorFsm::new();
    fsm.process(SupervisorEvent::Connect).unwrap();
    fsm.process(SupervisorEvent::Validate).unwrap();
    fsm
}

#[test]
fn test_fsm_initial_state() {
    let fsm = SupervisorFsm::new();
    assert_eq!(fsm.state(), SupervisorState::Loaded);
    assert!(fsm.error().is_none());
    assert!(fsm.deployment_id().is_none());
}

#[test]
fn test_fsm_full_rollout() {
    let mut fsm = validated();

    fsm.process(SupervisorEvent::Plan(11)).unwrap();
    fsm.process(SupervisorEvent::Register("eval-9".to_string()))
        .unwrap();
    assert_eq!(fsm.eval_id(), Some("eval-9"));

    fsm.process(SupervisorEvent::AwaitDeployment).unwrap();
    fsm.process(SupervisorEvent::DeploymentCreated("dep-3".to_string()))
        .unwrap();
    let state = fsm.process(SupervisorEvent::DeploymentSucceeded).unwrap();

    assert_eq!(state, SupervisorState::Succeeded);
    assert!(state.is_terminal());
    assert_eq!(fsm.modify_index(), Some(11));
}

#[test]
fn test_fsm_dry_run_ends_after_validation() {
    let mut fsm = validated();
    fsm.process(SupervisorEvent::DryRun).unwrap();
    assert_eq!(fsm.state(), SupervisorState::DryRun);

    let err = fsm.process(SupervisorEvent::Plan(1)).unwrap_err();
    assert!(matches!(err, DeployError::InvalidTransition(_)));
}

#[test]
fn test_fsm_evaluation_without_deployment() {
    let mut fsm = validated();
    fsm.process(SupervisorEvent::Plan(1)).unwrap();
    fsm.process(SupervisorEvent::Register("eval-1".to_string()))
        .unwrap();
    fsm.process(SupervisorEvent::AwaitDeployment).unwrap();
    fsm.process(SupervisorEvent::NoDeployment).unwrap();

    assert_eq!(fsm.state(), SupervisorState::Succeeded);
    assert!(fsm.deployment_id().is_none());
}

#[test]
fn test_fsm_stages_cannot_be_skipped() {
    let mut fsm = SupervisorFsm::new();
    assert!(fsm.process(SupervisorEvent::Validate).is_err());
    assert!(fsm.process(SupervisorEvent::Register("eval".to_string())).is_err());

    let mut fsm = validated();
    assert!(fsm
        .process(SupervisorEvent::DeploymentCreated("dep".to_string()))
        .is_err());
    assert_eq!(fsm.state(), SupervisorState::Validated);
}

#[test]
fn test_fsm_failure_from_watching() {
    let mut fsm = validated();
    fsm.process(SupervisorEvent::Plan(1)).unwrap();
    fsm.process(SupervisorEvent::Register("eval-1".to_string()))
        .unwrap();
    fsm.process(SupervisorEvent::AwaitDeployment).unwrap();
    fsm.process(SupervisorEvent::DeploymentCreated("dep-1".to_string()))
        .unwrap();
    fsm.process(SupervisorEvent::Fail("Deployment dep-1 failed".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), SupervisorState::Failed);
    assert_eq!(fsm.error(), Some("Deployment dep-1 failed"));
    assert!(fsm.process(SupervisorEvent::DeploymentSucceeded).is_err());
}
