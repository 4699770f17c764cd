//! Local storage: repository layout and settings

pub mod layout;
pub mod settings;
