//! API models

mod agent;
mod allocation;
mod deployment;
mod evaluation;
mod job;

pub use agent::*;
pub use allocation::*;
pub use deployment::*;
pub use evaluation::*;
pub use job::*;

use serde::{Deserialize, Deserializer};

/// Nomad encodes empty collections as `null`; treat that as the default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
