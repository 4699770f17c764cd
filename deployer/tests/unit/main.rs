//! Integration tests of the public API

mod test_assembler;
mod test_config;
mod test_fsm;
