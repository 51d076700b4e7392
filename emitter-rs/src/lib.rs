//! Emitter-RS library
//!
//! Scenario loading and command implementations behind the `emitter-rs`
//! binary.

pub mod cli;
pub mod commands;
pub mod scenario;
pub mod utils;
