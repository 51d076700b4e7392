//! Stamping material properties into solver storage
//!
//! Everything here writes a single global solver slot. The emitter decides
//! which slots to touch and when.

use rand::Rng;

use crate::material::{
    self, DEFAULT_SMOOTHING_RADIUS, EmitterMaterial, FluidCoefficients, MIN_PARTICLE_RADIUS,
};
use crate::phase::encode_phase;
use crate::solver::{ParticleArrays, SolverMode};

/// Inputs shared by every stamp of one emitter
#[derive(Debug, Clone, Copy)]
pub struct StampContext<'a> {
    pub material: Option<&'a EmitterMaterial>,
    pub mode: SolverMode,
    pub group: i32,
    pub self_collisions: bool,
}

impl StampContext<'_> {
    /// Whether particles join the fluid solve.
    ///
    /// No material counts as non-fluid for both the phase flag and the
    /// coefficients, including on re-stamps after a material is removed.
    /// Assign a fluid material to keep particles in the fluid solve.
    pub fn is_fluid(&self) -> bool {
        self.material.is_some_and(EmitterMaterial::is_fluid)
    }

    pub fn particle_size(&self) -> f32 {
        material::particle_size(self.material, self.mode)
    }

    pub fn particle_mass(&self) -> f32 {
        material::particle_mass(self.material, self.mode)
    }

    /// Phase tag for this emitter's particles
    pub fn phase(&self) -> i32 {
        encode_phase(self.group, self.self_collisions, self.is_fluid())
    }

    /// Kernel radius for this emitter's particles
    pub fn smoothing_radius(&self) -> f32 {
        match self.material {
            Some(material) => material.smoothing_radius(self.mode),
            None => DEFAULT_SMOOTHING_RADIUS,
        }
    }

    /// Collision radius, jittered for granular materials
    pub fn particle_radius<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let size = self.particle_size();
        match self.material {
            Some(material) if !material.is_fluid() => {
                let max_jitter = (size / 100.0 * material.randomness()).max(0.0);
                let jitter = if max_jitter.is_finite() && max_jitter > 0.0 {
                    rng.random_range(0.0..=max_jitter)
                } else {
                    0.0
                };
                (MIN_PARTICLE_RADIUS + size * 0.5 - jitter).max(MIN_PARTICLE_RADIUS)
            }
            _ => size * 0.5,
        }
    }

    fn coefficients(&self) -> FluidCoefficients {
        self.material
            .map_or(FluidCoefficients::DISABLED, EmitterMaterial::fluid_coefficients)
    }
}

/// Write the resolution-dependent properties of one slot: radius, inverse
/// mass and smoothing radius
pub fn update_resolution<R: Rng + ?Sized>(
    arrays: &mut ParticleArrays,
    index: usize,
    context: &StampContext<'_>,
    rng: &mut R,
) {
    let mass = context.particle_mass();
    arrays.radii[index] = context.particle_radius(rng);
    arrays.inv_masses[index] = if mass > 0.0 { 1.0 / mass } else { 0.0 };
    arrays.smoothing_radii[index] = context.smoothing_radius();
}

/// Write every material-derived property of one slot: resolution, fluid
/// coefficients, user data and phase
pub fn update_material<R: Rng + ?Sized>(
    arrays: &mut ParticleArrays,
    index: usize,
    context: &StampContext<'_>,
    rng: &mut R,
) {
    update_resolution(arrays, index, context, rng);

    let coefficients = context.coefficients();
    arrays.rest_densities[index] = coefficients.rest_density;
    arrays.viscosities[index] = coefficients.viscosity;
    arrays.surface_tension[index] = coefficients.surface_tension;
    arrays.buoyancies[index] = coefficients.buoyancy;
    arrays.atmospheric_drag[index] = coefficients.atmospheric_drag;
    arrays.atmospheric_pressure[index] = coefficients.atmospheric_pressure;
    arrays.diffusion[index] = coefficients.diffusion;
    arrays.user_data[index] = coefficients.user_data;

    arrays.phases[index] = context.phase();
}
