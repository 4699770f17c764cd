//! Deploy command wiring

pub mod options;
pub mod run;
