//! Background workers

pub mod canary;
