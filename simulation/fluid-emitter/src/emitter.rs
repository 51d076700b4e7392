//! Particle emitter runtime state
//!
//! An [`Emitter`] owns a fixed pool of particle slots and feeds them into a
//! [`ParticleSolver`]. It is driven once per simulation step through
//! [`Emitter::step`], which ages live particles, retires the expired ones and
//! emits new ones from the attached shapes.
//!
//! The solver is borrowed for every call rather than stored. While detached,
//! synchronization calls are no-ops and emission is refused.

use std::f32::consts::TAU;

use glam::{Mat4, Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distribution::{DistributionCursor, SpawnPoint};
use crate::error::{EmitterError, Result};
use crate::material::{self, EmitterMaterial};
use crate::pool::{ParticleId, ParticlePool};
use crate::scheduler::{EmissionMethod, EmissionScheduler, StepReport};
use crate::shape::{EmitterShape, ShapeId};
use crate::solver::{ActorId, ParticleOwner, ParticleSolver, SolverMode, SolverParameters};
use crate::sync::{self, StampContext};

/// User-facing emitter settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EmitterConfig {
    /// Number of particle slots
    pub capacity: usize,
    pub emission_method: EmissionMethod,
    /// Emission speed in units per second
    pub speed: f32,
    /// Seconds a particle lives before being retired
    pub lifespan: f32,
    /// Blend between the spawn direction (0) and a random direction (1)
    pub random_velocity: f32,
    /// Collision group of emitted particles
    pub fluid_phase: i32,
    /// Whether particles of this emitter collide with each other
    pub self_collisions: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            emission_method: EmissionMethod::Stream,
            speed: 0.25,
            lifespan: 4.0,
            random_velocity: 0.0,
            fluid_phase: 1,
            self_collisions: true,
        }
    }
}

impl EmitterConfig {
    /// Same settings with a different number of slots
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.random_velocity) {
            return Err(EmitterError::InvalidParameter(format!(
                "random velocity must be within 0-1, got {}",
                self.random_velocity
            )));
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(EmitterError::InvalidParameter(format!(
                "speed must be a non-negative number, got {}",
                self.speed
            )));
        }
        if self.lifespan.is_nan() {
            return Err(EmitterError::InvalidParameter(
                "lifespan must be a number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Notification about a particle entering or leaving the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleEvent {
    /// A particle was emitted into local slot `index`
    Emitted { index: usize, id: ParticleId },
    /// The particle at local slot `index` was retired; the slot now holds
    /// whatever particle was last in the active range
    Killed { index: usize, id: ParticleId },
}

impl ParticleEvent {
    pub fn index(&self) -> usize {
        match *self {
            Self::Emitted { index, .. } | Self::Killed { index, .. } => index,
        }
    }

    pub fn id(&self) -> ParticleId {
        match *self {
            Self::Emitted { id, .. } | Self::Killed { id, .. } => id,
        }
    }
}

/// Running totals of an emitter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EmitterStats {
    pub active: usize,
    pub capacity: usize,
    pub total_emitted: u64,
    pub total_killed: u64,
    pub total_refused: u64,
    pub steps: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttachState {
    Detached,
    Attached,
}

#[derive(Debug)]
struct ShapeSlot {
    id: ShapeId,
    shape: Box<dyn EmitterShape>,
}

impl AsRef<dyn EmitterShape> for ShapeSlot {
    fn as_ref(&self) -> &(dyn EmitterShape + 'static) {
        self.shape.as_ref()
    }
}

/// Stamp inputs from an emitter's fields, borrowed apart from its RNG
fn stamp_context<'a>(
    material: Option<&'a EmitterMaterial>,
    parameters: &SolverParameters,
    config: &EmitterConfig,
) -> StampContext<'a> {
    StampContext {
        material,
        mode: parameters.mode,
        group: config.fluid_phase,
        self_collisions: config.self_collisions,
    }
}

/// Runtime particle emitter
#[derive(Debug)]
pub struct Emitter {
    actor: ActorId,
    config: EmitterConfig,
    material: Option<EmitterMaterial>,
    /// Emitter transform in world space
    local_to_world: Mat4,
    /// Cached transform into solver space, refreshed every step
    local_to_solver: Mat4,
    pool: ParticlePool,
    shapes: Vec<ShapeSlot>,
    next_shape_id: u32,
    cursor: DistributionCursor,
    scheduler: EmissionScheduler,
    rng: StdRng,
    state: AttachState,
    /// Solver parameters seen at attach or at the last change notification
    parameters: SolverParameters,
    events: Vec<ParticleEvent>,
    stats: EmitterStats,
}

impl Emitter {
    /// Create a detached emitter
    pub fn new(actor: ActorId, config: EmitterConfig) -> Self {
        if config.capacity == 0 {
            log::warn!("{} has zero capacity and will never emit", actor);
        }

        Self {
            actor,
            pool: ParticlePool::new(config.capacity),
            config,
            material: None,
            local_to_world: Mat4::IDENTITY,
            local_to_solver: Mat4::IDENTITY,
            shapes: Vec::new(),
            next_shape_id: 0,
            cursor: DistributionCursor::new(),
            scheduler: EmissionScheduler::new(),
            rng: StdRng::from_os_rng(),
            state: AttachState::Detached,
            parameters: SolverParameters::default(),
            events: Vec::new(),
            stats: EmitterStats::default(),
        }
    }

    /// Use `material` for emitted particles.
    ///
    /// An invalid material is dropped with a warning and the emitter keeps
    /// the default particle properties.
    pub fn with_material(mut self, material: EmitterMaterial) -> Self {
        match material.validate() {
            Ok(()) => self.material = Some(material),
            Err(e) => log::warn!("{} ignoring material: {}", self.actor, e),
        }
        self
    }

    /// Place the emitter in the world
    pub fn with_transform(mut self, local_to_world: Mat4) -> Self {
        self.local_to_world = local_to_world;
        self.local_to_solver = self.parameters.world_to_solver * local_to_world;
        self
    }

    /// Make radius jitter and random velocities reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    pub fn material(&self) -> Option<&EmitterMaterial> {
        self.material.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.state == AttachState::Attached
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    /// Slot bookkeeping, read-only
    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    pub fn stats(&self) -> EmitterStats {
        EmitterStats {
            active: self.pool.active_count(),
            capacity: self.pool.capacity(),
            ..self.stats
        }
    }

    /// Global solver index of a local slot, while attached
    pub fn global_index(&self, index: usize) -> Option<usize> {
        self.pool.global_index(index)
    }

    /// Current local slot of a live particle
    pub fn particle_index(&self, id: ParticleId) -> Option<usize> {
        self.pool.find(id)
    }

    /// Color of every slot
    pub fn colors(&self) -> &[Vec4] {
        self.pool.colors()
    }

    /// Recolor a slot. Returns false if the slot does not exist.
    pub fn set_particle_color(&mut self, index: usize, color: Vec4) -> bool {
        self.pool.set_color(index, color)
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.config.speed = speed.max(0.0);
    }

    pub fn set_lifespan(&mut self, lifespan: f32) {
        self.config.lifespan = lifespan;
    }

    pub fn set_random_velocity(&mut self, random_velocity: f32) {
        self.config.random_velocity = random_velocity.clamp(0.0, 1.0);
    }

    /// Switch between stream and burst emission
    pub fn set_emission_method(&mut self, method: EmissionMethod) {
        if method != self.config.emission_method {
            self.scheduler.reset();
        }
        self.config.emission_method = method;
    }

    pub fn local_to_world(&self) -> Mat4 {
        self.local_to_world
    }

    /// Move the emitter. Takes effect on the next step.
    pub fn set_transform(&mut self, local_to_world: Mat4) {
        self.local_to_world = local_to_world;
    }

    /// Dimensionality the emitter currently sizes particles for
    pub fn mode(&self) -> SolverMode {
        self.parameters.mode
    }

    /// Distance between neighboring particles at rest
    pub fn particle_size(&self) -> f32 {
        material::particle_size(self.material.as_ref(), self.parameters.mode)
    }

    /// Mass of one particle
    pub fn particle_mass(&self) -> f32 {
        material::particle_mass(self.material.as_ref(), self.parameters.mode)
    }

    /// Phase tag currently stamped on this emitter's particles
    pub fn phase(&self) -> i32 {
        self.stamp_context().phase()
    }

    /// Number of particles released per burst
    pub fn emission_points(&self) -> usize {
        let total: usize = self
            .shapes
            .iter()
            .map(|slot| slot.shape.distribution().len())
            .sum();
        total.max(1)
    }

    /// Take the notifications accumulated since the last call
    pub fn drain_events(&mut self) -> Vec<ParticleEvent> {
        std::mem::take(&mut self.events)
    }

    /// Notifications accumulated since the last drain
    pub fn pending_events(&self) -> &[ParticleEvent] {
        &self.events
    }

    fn stamp_context(&self) -> StampContext<'_> {
        stamp_context(self.material.as_ref(), &self.parameters, &self.config)
    }

    // Attachment

    /// Reserve solver storage for every slot and stamp default properties
    pub fn attach(&mut self, solver: &mut dyn ParticleSolver) -> Result<()> {
        if self.is_attached() {
            return Err(EmitterError::AlreadyAttached);
        }

        let indices = solver.allocate(self.actor, self.pool.capacity()).map_err(|e| {
            log::warn!("{} could not attach: {}", self.actor, e);
            e
        })?;

        self.pool.bind(indices);
        self.state = AttachState::Attached;
        self.parameters = solver.parameters().clone();
        self.refresh_transforms();
        self.cursor.reset();
        self.scheduler.reset();

        // full resync: every slot gets the default properties of the material
        let context = stamp_context(self.material.as_ref(), &self.parameters, &self.config);
        let arrays = solver.particles_mut();
        for &global in self.pool.global_indices() {
            sync::update_material(arrays, global, &context, &mut self.rng);
        }
        self.update_emitter_distribution();
        solver.push_active_status(self.pool.global_indices(), self.pool.active_flags());

        log::debug!(
            "{} attached with {} slots (particle size {})",
            self.actor,
            self.pool.capacity(),
            self.particle_size()
        );
        Ok(())
    }

    /// Release solver storage.
    ///
    /// Live particles are discarded: their positions live in the solver.
    pub fn detach(&mut self, solver: &mut dyn ParticleSolver) -> Result<()> {
        if !self.is_attached() {
            return Err(EmitterError::NotAttached);
        }

        self.state = AttachState::Detached;
        let discarded = self.pool.active_count();
        let indices = self.pool.unbind();
        solver.release(&indices);

        self.pool.reset(self.config.capacity);
        self.scheduler.reset();
        self.cursor.reset();

        log::debug!(
            "{} detached, discarding {} live particles",
            self.actor,
            discarded
        );
        Ok(())
    }

    /// Resize the pool while detached. All slots are discarded.
    pub fn resize(&mut self, capacity: usize) -> Result<()> {
        if self.is_attached() {
            return Err(EmitterError::AlreadyAttached);
        }
        if capacity == self.pool.capacity() {
            return Ok(());
        }
        if capacity == 0 {
            log::warn!("{} resized to zero capacity and will never emit", self.actor);
        }

        self.config.capacity = capacity;
        self.pool.reset(capacity);
        self.scheduler.reset();
        log::debug!("{} resized to {} slots", self.actor, capacity);
        Ok(())
    }

    /// Resize the pool, moving solver storage along when attached
    pub fn set_capacity(&mut self, solver: &mut dyn ParticleSolver, capacity: usize) -> Result<()> {
        if capacity == self.pool.capacity() {
            return Ok(());
        }
        if !self.is_attached() {
            return self.resize(capacity);
        }

        self.detach(solver)?;
        self.resize(capacity)?;
        self.attach(solver)
    }

    // Shapes

    /// Add a distribution source. Its points are generated for the current
    /// particle size right away.
    pub fn add_shape(&mut self, mut shape: Box<dyn EmitterShape>) -> ShapeId {
        let id = ShapeId(self.next_shape_id);
        self.next_shape_id += 1;

        shape.generate_distribution(self.particle_size());
        shape.update_local_to_solver(&self.parameters.world_to_solver);
        self.shapes.push(ShapeSlot { id, shape });
        self.cursor.reset();

        log::debug!("{} added {}", self.actor, id);
        id
    }

    /// Detach a distribution source, handing it back
    pub fn remove_shape(&mut self, id: ShapeId) -> Result<Box<dyn EmitterShape>> {
        let position = self
            .shapes
            .iter()
            .position(|slot| slot.id == id)
            .ok_or(EmitterError::UnknownShape(id))?;
        let slot = self.shapes.remove(position);
        self.cursor.reset();

        log::debug!("{} removed {}", self.actor, id);
        Ok(slot.shape)
    }

    pub fn shape(&self, id: ShapeId) -> Option<&dyn EmitterShape> {
        self.shapes
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| slot.shape.as_ref())
    }

    /// Mutable access to a shape. Call
    /// [`EmitterShape::generate_distribution`] after changing its geometry.
    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut (dyn EmitterShape + 'static)> {
        self.shapes
            .iter_mut()
            .find(|slot| slot.id == id)
            .map(|slot| slot.shape.as_mut())
    }

    /// Shape handles in emission order
    pub fn shape_ids(&self) -> Vec<ShapeId> {
        self.shapes.iter().map(|slot| slot.id).collect()
    }

    /// Regenerate every shape's points for the current particle size
    pub fn update_emitter_distribution(&mut self) {
        let size = self.particle_size();
        if !(size > 0.0) {
            log::warn!(
                "{} has non-positive particle size {}, shapes will be empty",
                self.actor,
                size
            );
        }
        for slot in &mut self.shapes {
            slot.shape.generate_distribution(size);
        }
    }

    fn refresh_transforms(&mut self) {
        let world_to_solver = self.parameters.world_to_solver;
        self.local_to_solver = world_to_solver * self.local_to_world;
        for slot in &mut self.shapes {
            slot.shape.update_local_to_solver(&world_to_solver);
        }
    }

    // Material synchronization

    /// Re-stamp radius, mass and smoothing radius of a live slot
    pub fn update_particle_resolution(&mut self, solver: &mut dyn ParticleSolver, index: usize) {
        let Some(global) = self.attached_global(index) else {
            return;
        };
        let context = stamp_context(self.material.as_ref(), &self.parameters, &self.config);
        sync::update_resolution(solver.particles_mut(), global, &context, &mut self.rng);
    }

    /// Re-stamp every material-derived property of a live slot
    pub fn update_particle_material(&mut self, solver: &mut dyn ParticleSolver, index: usize) {
        let Some(global) = self.attached_global(index) else {
            return;
        };
        let context = stamp_context(self.material.as_ref(), &self.parameters, &self.config);
        sync::update_material(solver.particles_mut(), global, &context, &mut self.rng);
    }

    /// Re-stamp the phase of every slot, live or not
    pub fn update_particle_phases(&mut self, solver: &mut dyn ParticleSolver) {
        if !self.is_attached() {
            return;
        }
        let phase = self.phase();
        let arrays = solver.particles_mut();
        for &global in self.pool.global_indices() {
            arrays.phases[global] = phase;
        }
        log::debug!("{} phases set to {:#x}", self.actor, phase);
    }

    /// Change the collision group of emitted particles
    pub fn set_fluid_phase(&mut self, solver: &mut dyn ParticleSolver, group: i32) {
        self.config.fluid_phase = group;
        self.update_particle_phases(solver);
    }

    /// Toggle collisions between particles of this emitter
    pub fn set_self_collisions(&mut self, solver: &mut dyn ParticleSolver, enabled: bool) {
        self.config.self_collisions = enabled;
        self.update_particle_phases(solver);
    }

    /// Replace the material and resynchronize every live particle
    pub fn set_material(
        &mut self,
        solver: &mut dyn ParticleSolver,
        material: Option<EmitterMaterial>,
    ) -> Result<()> {
        if let Some(material) = &material {
            material.validate()?;
        }
        self.material = material;
        self.on_material_changed(solver);
        Ok(())
    }

    /// Edit the current material in place and resynchronize.
    ///
    /// Returns `Ok(false)` when no material is assigned. An edit that leaves
    /// the material invalid is rolled back.
    pub fn modify_material<F>(&mut self, solver: &mut dyn ParticleSolver, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut EmitterMaterial),
    {
        let Some(material) = self.material.as_mut() else {
            return Ok(false);
        };

        let previous = material.clone();
        edit(material);
        if let Err(e) = material.validate() {
            *material = previous;
            return Err(e);
        }

        self.on_material_changed(solver);
        Ok(true)
    }

    fn on_material_changed(&mut self, solver: &mut dyn ParticleSolver) {
        if self.is_attached() {
            for i in 0..self.pool.active_count() {
                self.update_particle_material(solver, i);
            }
        }
        self.update_emitter_distribution();
        log::debug!(
            "{} material changed, particle size now {}",
            self.actor,
            self.particle_size()
        );
    }

    /// React to a change of the solver's global parameters
    pub fn on_solver_parameters_changed(&mut self, solver: &mut dyn ParticleSolver) {
        self.parameters = solver.parameters().clone();
        if self.is_attached() {
            for i in 0..self.pool.active_count() {
                self.update_particle_resolution(solver, i);
            }
        }
        self.update_emitter_distribution();
        self.refresh_transforms();
        log::debug!(
            "{} resynchronized for {:?}, particle size now {}",
            self.actor,
            self.parameters.mode,
            self.particle_size()
        );
    }

    fn attached_global(&self, index: usize) -> Option<usize> {
        if self.is_attached() {
            self.pool.global_index(index)
        } else {
            None
        }
    }

    // Emission

    fn random_unit_vector(&mut self) -> Vec3 {
        let z: f32 = self.rng.random_range(-1.0..=1.0);
        let theta: f32 = self.rng.random_range(0.0..TAU);
        let r = (1.0 - z * z).max(0.0).sqrt();
        Vec3::new(r * theta.cos(), r * theta.sin(), z)
    }

    /// Emit one particle from the next spawn point.
    ///
    /// `offset` in `[0, 1)` pushes the particle along its velocity by that
    /// fraction of a fixed step. The active status is not pushed to the
    /// solver; [`Emitter::step`] does that once per step.
    pub fn emit_particle(&mut self, solver: &mut dyn ParticleSolver, offset: f32) -> Result<usize> {
        if !self.is_attached() {
            return Err(EmitterError::NotAttached);
        }
        if self.pool.is_full() {
            return Err(EmitterError::Full {
                capacity: self.pool.capacity(),
            });
        }

        let spawn: SpawnPoint = self.cursor.next(&self.shapes, &self.local_to_solver);
        let direction = if self.config.random_velocity > 0.0 {
            let random = self.random_unit_vector();
            spawn.direction.lerp(random, self.config.random_velocity)
        } else {
            spawn.direction
        };

        let index = self.pool.claim(self.config.lifespan, spawn.color)?;
        let Some(global) = self.pool.global_index(index) else {
            return Err(EmitterError::NotAttached);
        };

        let speed = self.config.speed;
        let fixed_step = self.parameters.fixed_step;
        {
            let arrays = solver.particles_mut();
            arrays.positions[global] = spawn.position + direction * (speed * fixed_step) * offset;
            arrays.velocities[global] = direction * speed;
        }
        self.update_particle_material(solver, index);

        let id = self.pool.particle_id(index).unwrap_or_default();
        self.events.push(ParticleEvent::Emitted { index, id });
        self.stats.total_emitted += 1;
        log::trace!("{} emitted {} into slot {}", self.actor, id, index);
        Ok(index)
    }

    /// Retire the live particle at `index`, moving the last live particle
    /// into its slot
    pub fn kill_particle(&mut self, solver: &mut dyn ParticleSolver, index: usize) -> Result<()> {
        let retirement = self.pool.retire(index)?;

        if self.is_attached() {
            for slot in [retirement.vacated, retirement.tail] {
                if let Some(global) = self.pool.global_index(slot) {
                    solver.set_owner(
                        global,
                        ParticleOwner {
                            actor: self.actor,
                            index_in_actor: slot,
                        },
                    );
                }
            }
        }

        self.events.push(ParticleEvent::Killed {
            index,
            id: retirement.id,
        });
        self.stats.total_killed += 1;
        log::trace!("{} killed {} from slot {}", self.actor, retirement.id, index);
        Ok(())
    }

    /// Retire every live particle
    pub fn kill_all(&mut self, solver: &mut dyn ParticleSolver) {
        for i in (0..self.pool.active_count()).rev() {
            if let Err(e) = self.kill_particle(solver, i) {
                log::warn!("{} failed to retire slot {}: {}", self.actor, i, e);
            }
        }
        self.push_active_status(solver);
    }

    /// Publish which slots are live
    pub fn push_active_status(&self, solver: &mut dyn ParticleSolver) {
        if self.is_attached() {
            solver.push_active_status(self.pool.global_indices(), self.pool.active_flags());
        }
    }

    fn emit_batch(
        &mut self,
        solver: &mut dyn ParticleSolver,
        count: usize,
        offset: f32,
        report: &mut StepReport,
    ) -> Result<()> {
        for _ in 0..count {
            match self.emit_particle(solver, offset) {
                Ok(_) => report.emitted += 1,
                Err(EmitterError::Full { .. }) => report.refused += 1,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Run one simulation step of `dt` seconds.
    ///
    /// Transforms are refreshed, expired particles retired (highest slot
    /// first), then new particles emitted. Stream emission is sized by the
    /// solver's fixed step, aging by `dt`.
    pub fn step(&mut self, solver: &mut dyn ParticleSolver, dt: f32) -> Result<StepReport> {
        if !self.is_attached() {
            return Err(EmitterError::NotAttached);
        }

        let mut report = StepReport::default();
        self.refresh_transforms();

        for i in (0..self.pool.active_count()).rev() {
            if self.pool.age(i, dt) <= 0.0 {
                self.kill_particle(solver, i)?;
                report.killed += 1;
            }
        }

        let emission_points = self.emission_points();
        match self.config.emission_method {
            EmissionMethod::Stream => {
                let offsets = self.scheduler.stream_bursts(
                    self.config.speed,
                    self.parameters.fixed_step,
                    self.particle_size(),
                );
                for offset in offsets {
                    self.emit_batch(solver, emission_points, offset, &mut report)?;
                }
            }
            EmissionMethod::Burst => {
                if self.pool.is_empty() {
                    self.emit_batch(solver, emission_points, 0.0, &mut report)?;
                }
            }
        }

        if report.changed() {
            self.push_active_status(solver);
        }

        self.stats.total_refused += report.refused as u64;
        self.stats.steps += 1;
        Ok(report)
    }
}
