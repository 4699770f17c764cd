//! Scheduler HTTP API client

pub mod agent;
pub mod client;
pub mod deployments;
pub mod evaluations;
pub mod jobs;
