//! Shared utilities for the emitter-rs CLI

pub mod progress;

pub use progress::*;
