//! Environment configuration

pub mod environment;

pub use environment::{EnvironmentConfig, ServiceConfig};
