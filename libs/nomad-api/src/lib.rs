//! Nomad API models
//!
//! Serde models for the subset of the Nomad HTTP API used by the deployer.
//! Fields the deployer does not touch are kept in an `extra` map so that a
//! job read from a template survives a round trip unchanged.

pub mod models;

pub use models::*;
