//! Sphere surface emission

use std::f32::consts::PI;

use glam::{Mat4, Vec3, Vec4};

use super::{EmitterShape, GOLDEN_ANGLE, ShapeFrame};
use crate::distribution::SpawnPoint;

/// Sphere surface with radial emission
///
/// Points follow a Fibonacci lattice so spacing stays close to the particle
/// size regardless of the point count.
#[derive(Debug, Clone)]
pub struct SphereShape {
    frame: ShapeFrame,
    /// Sphere radius
    pub radius: f32,
    /// Emit toward the center instead of away from it
    pub inward: bool,
}

impl SphereShape {
    pub fn new(radius: f32, inward: bool, local_to_world: Mat4) -> Self {
        Self {
            frame: ShapeFrame::new(local_to_world),
            radius,
            inward,
        }
    }
}

impl EmitterShape for SphereShape {
    fn frame(&self) -> &ShapeFrame {
        &self.frame
    }

    fn frame_mut(&mut self) -> &mut ShapeFrame {
        &mut self.frame
    }

    fn sample(&self, particle_size: f32) -> Vec<SpawnPoint> {
        let radius = self.radius.max(0.0);
        let area = 4.0 * PI * radius * radius;
        let count = ((area / (particle_size * particle_size)) as usize).max(1);
        let sign = if self.inward { -1.0 } else { 1.0 };

        (0..count)
            .map(|i| {
                let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
                let ring = (1.0 - y * y).max(0.0).sqrt();
                let angle = i as f32 * GOLDEN_ANGLE;
                let normal = Vec3::new(angle.cos() * ring, y, angle.sin() * ring);
                SpawnPoint::new(normal * radius, normal * sign, Vec4::ONE)
            })
            .collect()
    }
}
