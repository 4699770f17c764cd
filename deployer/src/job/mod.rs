//! Job description assembly

pub mod assembler;
pub mod template;

pub use assembler::{assemble, AssemblyContext};
pub use template::JobTemplate;
