//! Emitter shapes
//!
//! A shape precomputes a list of spawn points in its own local frame, spaced
//! by the current particle size. Each step the emitter refreshes the shape's
//! local-to-solver transform, and the distribution cursor transforms the
//! points on the fly.
//!
//! Shapes available:
//! - [`DiskShape`]: filled disk or ring
//! - [`SquareShape`]: rectangular grid
//! - [`EdgeShape`]: line segment
//! - [`SphereShape`]: sphere surface

mod disk;
mod edge;
mod sphere;
mod square;

use std::f32::consts::PI;
use std::fmt;

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distribution::SpawnPoint;

pub use disk::DiskShape;
pub use edge::EdgeShape;
pub use sphere::SphereShape;
pub use square::SquareShape;

/// Golden angle in radians, used for sunflower and Fibonacci layouts
pub(crate) const GOLDEN_ANGLE: f32 = PI * (3.0 - 2.236_068);

/// Handle to a shape attached to an emitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub(crate) u32);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape#{}", self.0)
    }
}

/// State shared by every shape: placement, tint and the generated points
#[derive(Debug, Clone)]
pub struct ShapeFrame {
    /// Shape transform in world space
    pub local_to_world: Mat4,
    /// Cached transform into solver space, refreshed every step
    local_to_solver: Mat4,
    /// Tint multiplied into every spawn point color
    pub color: Vec4,
    /// Points generated for the current particle size
    distribution: Vec<SpawnPoint>,
    /// Particle size the distribution was generated for
    particle_size: f32,
}

impl Default for ShapeFrame {
    fn default() -> Self {
        Self {
            local_to_world: Mat4::IDENTITY,
            local_to_solver: Mat4::IDENTITY,
            color: Vec4::ONE,
            distribution: Vec::new(),
            particle_size: 0.0,
        }
    }
}

impl ShapeFrame {
    /// Frame placed at `local_to_world`
    pub fn new(local_to_world: Mat4) -> Self {
        Self {
            local_to_world,
            local_to_solver: local_to_world,
            ..Default::default()
        }
    }

    pub fn distribution(&self) -> &[SpawnPoint] {
        &self.distribution
    }

    pub fn local_to_solver(&self) -> Mat4 {
        self.local_to_solver
    }

    pub fn particle_size(&self) -> f32 {
        self.particle_size
    }

    /// Replace the generated points
    pub fn set_distribution(&mut self, particle_size: f32, points: Vec<SpawnPoint>) {
        self.particle_size = particle_size;
        self.distribution = points;
    }

    /// Recompute the solver-space transform
    pub fn update_local_to_solver(&mut self, world_to_solver: &Mat4) {
        self.local_to_solver = *world_to_solver * self.local_to_world;
    }
}

/// A spatial source of spawn points
pub trait EmitterShape: fmt::Debug {
    /// Shared placement state
    fn frame(&self) -> &ShapeFrame;

    /// Mutable shared placement state
    fn frame_mut(&mut self) -> &mut ShapeFrame;

    /// Compute the local-frame points for the given particle size
    fn sample(&self, particle_size: f32) -> Vec<SpawnPoint>;

    /// Regenerate the distribution. Non-positive sizes clear it.
    fn generate_distribution(&mut self, particle_size: f32) {
        let points = if particle_size > 0.0 {
            self.sample(particle_size)
        } else {
            Vec::new()
        };
        log::trace!(
            "Generated {} spawn points for particle size {}",
            points.len(),
            particle_size
        );
        self.frame_mut().set_distribution(particle_size, points);
    }

    fn distribution(&self) -> &[SpawnPoint] {
        self.frame().distribution()
    }

    fn color(&self) -> Vec4 {
        self.frame().color
    }

    fn local_to_solver(&self) -> Mat4 {
        self.frame().local_to_solver()
    }

    fn update_local_to_solver(&mut self, world_to_solver: &Mat4) {
        self.frame_mut().update_local_to_solver(world_to_solver);
    }
}

/// Geometry of a configurable shape
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum ShapeKind {
    Disk {
        radius: f32,
        #[cfg_attr(feature = "serde", serde(default))]
        edge_emission: bool,
    },
    Square {
        size: Vec2,
    },
    Edge {
        length: f32,
    },
    Sphere {
        radius: f32,
        #[cfg_attr(feature = "serde", serde(default))]
        inward: bool,
    },
}

/// Declarative description of a shape, as found in scenario files
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShapeConfig {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub kind: ShapeKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub translation: Vec3,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rotation: Quat,
    #[cfg_attr(feature = "serde", serde(default = "white"))]
    pub color: Vec4,
}

#[cfg(feature = "serde")]
fn white() -> Vec4 {
    Vec4::ONE
}

impl ShapeConfig {
    /// Config for `kind` at the origin with no tint
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            color: Vec4::ONE,
        }
    }

    /// World transform of the configured shape
    pub fn transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    /// Instantiate the shape
    pub fn build(&self) -> Box<dyn EmitterShape> {
        let transform = self.transform();
        let mut shape: Box<dyn EmitterShape> = match self.kind {
            ShapeKind::Disk {
                radius,
                edge_emission,
            } => Box::new(DiskShape::new(radius, edge_emission, transform)),
            ShapeKind::Square { size } => Box::new(SquareShape::new(size, transform)),
            ShapeKind::Edge { length } => Box::new(EdgeShape::new(length, transform)),
            ShapeKind::Sphere { radius, inward } => {
                Box::new(SphereShape::new(radius, inward, transform))
            }
        };
        shape.frame_mut().color = self.color;
        shape
    }
}
