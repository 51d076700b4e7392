use thiserror::Error;

use crate::shape::ShapeId;

/// Error types for emitter operations
///
/// `Full` and `EmptyOrOutOfRange` are refusals rather than failures: the
/// per-step scheduler swallows them and carries on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmitterError {
    /// Emission attempted while every slot of the pool is active
    #[error("Emitter is full: all {capacity} particles are active")]
    Full { capacity: usize },

    /// Retirement attempted on an empty pool or an inactive slot
    #[error("Cannot retire particle {index}: {active} particles are active")]
    EmptyOrOutOfRange { index: usize, active: usize },

    /// The operation needs solver storage but the emitter is detached
    #[error("Emitter is not attached to a solver")]
    NotAttached,

    /// Attach requested while already attached
    #[error("Emitter is already attached to a solver")]
    AlreadyAttached,

    /// The solver has no room for the requested particles
    #[error("Solver cannot allocate {requested} particles: only {available} are free")]
    SolverFull { requested: usize, available: usize },

    /// A configuration or material value is out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No shape with this id is attached to the emitter
    #[error("Unknown shape: {0}")]
    UnknownShape(ShapeId),
}

/// Result type using EmitterError
pub type Result<T> = std::result::Result<T, EmitterError>;
