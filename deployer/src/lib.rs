//! Shipyard
//!
//! Deploys service revisions onto a Nomad cluster and supervises the
//! rollout, including canary promotion, until it succeeds or fails.

pub mod app;
pub mod config;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod gateway;
pub mod http;
pub mod job;
pub mod logs;
pub mod storage;
pub mod terminal;
pub mod utils;
pub mod workers;

#[cfg(test)]
pub(crate) mod testing;
