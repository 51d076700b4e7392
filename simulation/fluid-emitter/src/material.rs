//! Emitter materials
//!
//! A material decides how large and heavy emitted particles are and whether
//! they behave as a fluid or as loose granular matter. Both variants derive
//! their particle size from a `resolution` (particles per unit length,
//! area or volume depending on the solver mode) and their mass from a rest
//! density.

use glam::Vec4;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{EmitterError, Result};
use crate::solver::SolverMode;

/// Particle size used when no material is assigned
pub const DEFAULT_PARTICLE_SIZE: f32 = 0.1;

/// Particle mass used when no material is assigned
pub const DEFAULT_PARTICLE_MASS: f32 = 0.1;

/// Smoothing radius stamped on particles that are not fluid
pub const DEFAULT_SMOOTHING_RADIUS: f32 = 0.1;

/// Lower bound for a particle's collision radius
pub const MIN_PARTICLE_RADIUS: f32 = 0.001;

/// Properties of a fluid material
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FluidMaterial {
    /// Particles per unit length/area/volume
    pub resolution: f32,
    /// Mass per unit volume at rest
    pub rest_density: f32,
    /// Smoothing radius as a multiple of particle size
    pub smoothing: f32,
    pub viscosity: f32,
    pub surface_tension: f32,
    /// Positive values float, negative values sink
    pub buoyancy: f32,
    pub atmospheric_drag: f32,
    pub atmospheric_pressure: f32,
    /// Rate at which user data diffuses between neighbors
    pub diffusion: f32,
    /// Initial user data of emitted particles
    pub diffusion_data: Vec4,
}

impl Default for FluidMaterial {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            rest_density: 1000.0,
            smoothing: 1.5,
            viscosity: 0.05,
            surface_tension: 0.1,
            buoyancy: -1.0,
            atmospheric_drag: 0.0,
            atmospheric_pressure: 0.0,
            diffusion: 0.0,
            diffusion_data: Vec4::ZERO,
        }
    }
}

/// Properties of a granular material
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GranularMaterial {
    /// Particles per unit length/area/volume
    pub resolution: f32,
    /// Mass per unit volume at rest
    pub rest_density: f32,
    /// Radius jitter as a percentage of particle size (0-100)
    pub randomness: f32,
}

impl Default for GranularMaterial {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            rest_density: 1000.0,
            randomness: 0.0,
        }
    }
}

/// Material assigned to an emitter
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum EmitterMaterial {
    Fluid(FluidMaterial),
    Granular(GranularMaterial),
}

/// Fluid coefficients written per particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidCoefficients {
    pub rest_density: f32,
    pub viscosity: f32,
    pub surface_tension: f32,
    pub buoyancy: f32,
    pub atmospheric_drag: f32,
    pub atmospheric_pressure: f32,
    pub diffusion: f32,
    pub user_data: Vec4,
}

impl FluidCoefficients {
    /// Coefficients for particles that take no part in the fluid solve
    pub const DISABLED: Self = Self {
        rest_density: 0.0,
        viscosity: 0.0,
        surface_tension: 0.0,
        buoyancy: -1.0,
        atmospheric_drag: 0.0,
        atmospheric_pressure: 0.0,
        diffusion: 0.0,
        user_data: Vec4::ZERO,
    };
}

impl EmitterMaterial {
    /// Whether particles of this material are simulated as a fluid
    pub fn is_fluid(&self) -> bool {
        matches!(self, Self::Fluid(_))
    }

    /// Fluid properties, if this is a fluid material
    pub fn as_fluid(&self) -> Option<&FluidMaterial> {
        match self {
            Self::Fluid(fluid) => Some(fluid),
            Self::Granular(_) => None,
        }
    }

    pub fn resolution(&self) -> f32 {
        match self {
            Self::Fluid(fluid) => fluid.resolution,
            Self::Granular(granular) => granular.resolution,
        }
    }

    pub fn rest_density(&self) -> f32 {
        match self {
            Self::Fluid(fluid) => fluid.rest_density,
            Self::Granular(granular) => granular.rest_density,
        }
    }

    /// Radius jitter percentage; always zero for fluids
    pub fn randomness(&self) -> f32 {
        match self {
            Self::Fluid(_) => 0.0,
            Self::Granular(granular) => granular.randomness,
        }
    }

    /// Distance between neighboring particles at rest
    pub fn particle_size(&self, mode: SolverMode) -> f32 {
        let exponent = 1.0 / mode.dimensions() as f32;
        1.0 / (10.0 * self.resolution().powf(exponent))
    }

    /// Mass of a single particle
    pub fn particle_mass(&self, mode: SolverMode) -> f32 {
        self.rest_density() * self.particle_size(mode).powi(mode.dimensions())
    }

    /// Kernel radius used by the density solve
    pub fn smoothing_radius(&self, mode: SolverMode) -> f32 {
        match self {
            Self::Fluid(fluid) => self.particle_size(mode) * fluid.smoothing,
            Self::Granular(_) => DEFAULT_SMOOTHING_RADIUS,
        }
    }

    /// Coefficients to stamp on particles of this material
    pub fn fluid_coefficients(&self) -> FluidCoefficients {
        match self {
            Self::Fluid(fluid) => FluidCoefficients {
                rest_density: fluid.rest_density,
                viscosity: fluid.viscosity,
                surface_tension: fluid.surface_tension,
                buoyancy: fluid.buoyancy,
                atmospheric_drag: fluid.atmospheric_drag,
                atmospheric_pressure: fluid.atmospheric_pressure,
                diffusion: fluid.diffusion,
                user_data: fluid.diffusion_data,
            },
            Self::Granular(_) => FluidCoefficients::DISABLED,
        }
    }

    /// Check that the material can produce finite particles
    pub fn validate(&self) -> Result<()> {
        if !(self.resolution() > 0.0) {
            return Err(EmitterError::InvalidParameter(format!(
                "resolution must be positive, got {}",
                self.resolution()
            )));
        }
        if !(self.rest_density() > 0.0) {
            return Err(EmitterError::InvalidParameter(format!(
                "rest density must be positive, got {}",
                self.rest_density()
            )));
        }
        match self {
            Self::Fluid(fluid) if !(fluid.smoothing > 0.0) => {
                Err(EmitterError::InvalidParameter(format!(
                    "smoothing must be positive, got {}",
                    fluid.smoothing
                )))
            }
            Self::Granular(granular) if !(0.0..=100.0).contains(&granular.randomness) => {
                Err(EmitterError::InvalidParameter(format!(
                    "randomness must be within 0-100, got {}",
                    granular.randomness
                )))
            }
            _ => Ok(()),
        }
    }
}

impl From<FluidMaterial> for EmitterMaterial {
    fn from(value: FluidMaterial) -> Self {
        Self::Fluid(value)
    }
}

impl From<GranularMaterial> for EmitterMaterial {
    fn from(value: GranularMaterial) -> Self {
        Self::Granular(value)
    }
}

/// Particle size for an optional material
pub fn particle_size(material: Option<&EmitterMaterial>, mode: SolverMode) -> f32 {
    material.map_or(DEFAULT_PARTICLE_SIZE, |m| m.particle_size(mode))
}

/// Particle mass for an optional material
pub fn particle_mass(material: Option<&EmitterMaterial>, mode: SolverMode) -> f32 {
    material.map_or(DEFAULT_PARTICLE_MASS, |m| m.particle_mass(mode))
}
