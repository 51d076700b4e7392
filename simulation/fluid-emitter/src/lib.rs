//! Particle emitter for position-based fluid and granular solvers.
//!
//! An [`Emitter`] owns a bounded pool of particle slots inside a shared
//! solver. Once per step it ages its particles, retires expired ones and
//! injects new ones from its shapes, keeping mass, radius, phase and fluid
//! coefficients in sync with its [`EmitterMaterial`].
//!
//! ```
//! use fluid_emitter::{ActorId, Emitter, EmitterConfig, Simulation, Solver, SolverParameters};
//!
//! let mut sim = Simulation::new(Solver::new(1024, SolverParameters::default()));
//! let actor = sim.add_emitter(Emitter::new(ActorId(1), EmitterConfig::default()))?;
//! sim.step(0.02)?;
//! assert!(sim.emitter(actor).unwrap().active_count() > 0);
//! # Ok::<(), fluid_emitter::EmitterError>(())
//! ```

pub mod consumers;
pub mod distribution;
pub mod emitter;
pub mod error;
pub mod material;
pub mod phase;
pub mod pool;
pub mod scheduler;
pub mod shape;
pub mod simulation;
pub mod solver;
pub mod sync;

// Re-export common types
pub use consumers::{ColorFromViscosity, FluidPropertyColorizer, Gradient, ViscositySurfTensionToUserData};
pub use distribution::{DistributionCursor, SpawnPoint};
pub use emitter::{Emitter, EmitterConfig, EmitterStats, ParticleEvent};
pub use error::{EmitterError, Result};
pub use material::{EmitterMaterial, FluidMaterial, GranularMaterial};
pub use phase::{PhaseFlags, encode_phase};
pub use pool::{ParticleId, ParticlePool};
pub use scheduler::{EmissionMethod, StepReport};
pub use shape::{DiskShape, EdgeShape, EmitterShape, ShapeConfig, ShapeId, ShapeKind, SphereShape, SquareShape};
pub use simulation::{Simulation, StepObserver};
pub use solver::{ActorId, ParticleSolver, Solver, SolverMode, SolverParameters};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
