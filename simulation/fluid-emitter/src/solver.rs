//! Solver-facing storage and the reference in-memory solver
//!
//! Emitters never own particle storage. A solver hands out global indices
//! into its flat per-particle arrays, and every actor writes only the slots
//! it was given. [`ParticleSolver`] is the seam an emitter talks to; [`Solver`]
//! is a plain in-memory implementation that integrates particles ballistically
//! and is enough to drive headless simulations and tests.

use std::fmt;

use glam::{Mat4, Vec3, Vec4};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{EmitterError, Result};

/// Dimensionality the solver simulates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SolverMode {
    /// Planar simulation, particles are discs
    #[cfg_attr(feature = "serde", serde(rename = "2d"))]
    Mode2D,
    /// Volumetric simulation, particles are spheres
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "3d"))]
    Mode3D,
}

impl SolverMode {
    /// Number of spatial dimensions
    pub fn dimensions(self) -> i32 {
        match self {
            Self::Mode2D => 2,
            Self::Mode3D => 3,
        }
    }
}

/// Global solver parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverParameters {
    /// Simulation dimensionality
    pub mode: SolverMode,
    /// Duration of one fixed simulation step in seconds
    pub fixed_step: f32,
    /// Constant acceleration applied to every dynamic particle
    pub gravity: Vec3,
    /// Velocity damping per second (0 = none, 1 = full stop)
    pub damping: f32,
    /// Transform from world space into solver space
    pub world_to_solver: Mat4,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            mode: SolverMode::Mode3D,
            fixed_step: 0.02,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            damping: 0.0,
            world_to_solver: Mat4::IDENTITY,
        }
    }
}

/// Identifier of an actor (emitter, cloth, rope...) that owns solver slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Back-reference from a global solver index to the actor slot using it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleOwner {
    /// Actor owning the slot
    pub actor: ActorId,
    /// Index of the particle inside the actor
    pub index_in_actor: usize,
}

/// Flat per-particle arrays, indexed by global solver index
#[derive(Debug, Clone, Default)]
pub struct ParticleArrays {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
    pub inv_masses: Vec<f32>,
    pub radii: Vec<f32>,
    pub phases: Vec<i32>,
    pub smoothing_radii: Vec<f32>,
    pub rest_densities: Vec<f32>,
    pub viscosities: Vec<f32>,
    pub surface_tension: Vec<f32>,
    pub buoyancies: Vec<f32>,
    pub atmospheric_drag: Vec<f32>,
    pub atmospheric_pressure: Vec<f32>,
    pub diffusion: Vec<f32>,
    /// Four free channels per particle, diffused by the fluid solver
    pub user_data: Vec<Vec4>,
    pub active: Vec<bool>,
}

impl ParticleArrays {
    /// Create zeroed storage for `capacity` particles
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: vec![Vec3::ZERO; capacity],
            velocities: vec![Vec3::ZERO; capacity],
            inv_masses: vec![0.0; capacity],
            radii: vec![0.0; capacity],
            phases: vec![0; capacity],
            smoothing_radii: vec![0.0; capacity],
            rest_densities: vec![0.0; capacity],
            viscosities: vec![0.0; capacity],
            surface_tension: vec![0.0; capacity],
            buoyancies: vec![0.0; capacity],
            atmospheric_drag: vec![0.0; capacity],
            atmospheric_pressure: vec![0.0; capacity],
            diffusion: vec![0.0; capacity],
            user_data: vec![Vec4::ZERO; capacity],
            active: vec![false; capacity],
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether there are no slots at all
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Zero out a single slot
    pub fn clear_slot(&mut self, index: usize) {
        self.positions[index] = Vec3::ZERO;
        self.velocities[index] = Vec3::ZERO;
        self.inv_masses[index] = 0.0;
        self.radii[index] = 0.0;
        self.phases[index] = 0;
        self.smoothing_radii[index] = 0.0;
        self.rest_densities[index] = 0.0;
        self.viscosities[index] = 0.0;
        self.surface_tension[index] = 0.0;
        self.buoyancies[index] = 0.0;
        self.atmospheric_drag[index] = 0.0;
        self.atmospheric_pressure[index] = 0.0;
        self.diffusion[index] = 0.0;
        self.user_data[index] = Vec4::ZERO;
        self.active[index] = false;
    }
}

/// Services a solver provides to the actors attached to it
pub trait ParticleSolver {
    /// Current global parameters
    fn parameters(&self) -> &SolverParameters;

    /// Reserve `count` slots for `actor`, returning their global indices.
    ///
    /// Local index `i` of the actor maps to element `i` of the result.
    fn allocate(&mut self, actor: ActorId, count: usize) -> Result<Vec<usize>>;

    /// Give slots back to the solver
    fn release(&mut self, indices: &[usize]);

    /// Per-particle storage
    fn particles(&self) -> &ParticleArrays;

    /// Mutable per-particle storage
    fn particles_mut(&mut self) -> &mut ParticleArrays;

    /// Which actor slot a global index belongs to
    fn owner(&self, index: usize) -> Option<ParticleOwner>;

    /// Rewrite the back-reference of a global index
    fn set_owner(&mut self, index: usize, owner: ParticleOwner);

    /// Publish the active flags of an actor's slots
    fn push_active_status(&mut self, indices: &[usize], active: &[bool]) {
        let arrays = self.particles_mut();
        for (&index, &flag) in indices.iter().zip(active) {
            arrays.active[index] = flag;
        }
    }
}

/// In-memory solver with free-list slot allocation
#[derive(Debug, Clone)]
pub struct Solver {
    parameters: SolverParameters,
    arrays: ParticleArrays,
    owners: Vec<Option<ParticleOwner>>,
    free: Vec<usize>,
    active_pushes: u64,
}

impl Solver {
    /// Create a solver able to hold `capacity` particles
    pub fn new(capacity: usize, parameters: SolverParameters) -> Self {
        Self {
            parameters,
            arrays: ParticleArrays::with_capacity(capacity),
            owners: vec![None; capacity],
            // popped from the back, so low indices are handed out first
            free: (0..capacity).rev().collect(),
            active_pushes: 0,
        }
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.arrays.len()
    }

    /// Number of slots not owned by any actor
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of slots currently flagged active
    pub fn active_particle_count(&self) -> usize {
        self.arrays.active.iter().filter(|&&a| a).count()
    }

    /// How many times actors pushed their active status
    pub fn active_pushes(&self) -> u64 {
        self.active_pushes
    }

    /// Replace the global parameters.
    ///
    /// The caller is responsible for notifying attached actors afterwards.
    pub fn set_parameters(&mut self, parameters: SolverParameters) {
        log::debug!(
            "Solver parameters changed: mode={:?} fixed_step={}",
            parameters.mode,
            parameters.fixed_step
        );
        self.parameters = parameters;
    }

    /// Integrate active dynamic particles over `dt` seconds.
    ///
    /// Plain semi-implicit Euler with gravity and damping. No constraints are
    /// solved here.
    pub fn advance(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        let gravity = self.parameters.gravity;
        let damping = (1.0 - self.parameters.damping).clamp(0.0, 1.0).powf(dt);
        let arrays = &mut self.arrays;

        for i in 0..arrays.len() {
            if !arrays.active[i] || arrays.inv_masses[i] <= 0.0 {
                continue;
            }
            let velocity = (arrays.velocities[i] + gravity * dt) * damping;
            arrays.velocities[i] = velocity;
            arrays.positions[i] += velocity * dt;
        }
    }
}

impl ParticleSolver for Solver {
    fn parameters(&self) -> &SolverParameters {
        &self.parameters
    }

    fn allocate(&mut self, actor: ActorId, count: usize) -> Result<Vec<usize>> {
        if count > self.free.len() {
            return Err(EmitterError::SolverFull {
                requested: count,
                available: self.free.len(),
            });
        }

        let split = self.free.len() - count;
        let mut indices = self.free.split_off(split);
        indices.reverse();

        for (local, &global) in indices.iter().enumerate() {
            self.arrays.clear_slot(global);
            self.owners[global] = Some(ParticleOwner {
                actor,
                index_in_actor: local,
            });
        }

        log::debug!("Allocated {} solver slots for {}", count, actor);
        Ok(indices)
    }

    fn release(&mut self, indices: &[usize]) {
        for &index in indices {
            if self.owners[index].take().is_some() {
                self.arrays.clear_slot(index);
                self.free.push(index);
            }
        }
        log::debug!("Released {} solver slots", indices.len());
    }

    fn particles(&self) -> &ParticleArrays {
        &self.arrays
    }

    fn particles_mut(&mut self) -> &mut ParticleArrays {
        &mut self.arrays
    }

    fn owner(&self, index: usize) -> Option<ParticleOwner> {
        self.owners.get(index).copied().flatten()
    }

    fn set_owner(&mut self, index: usize, owner: ParticleOwner) {
        self.owners[index] = Some(owner);
    }

    fn push_active_status(&mut self, indices: &[usize], active: &[bool]) {
        for (&index, &flag) in indices.iter().zip(active) {
            self.arrays.active[index] = flag;
        }
        self.active_pushes += 1;
    }
}
