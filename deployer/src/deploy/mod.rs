//! Deployment module

pub mod fsm;
pub mod supervisor;
pub mod watcher;

pub use supervisor::{DeployOutcome, DeployRequest, DeploymentSupervisor, SupervisorOptions};
