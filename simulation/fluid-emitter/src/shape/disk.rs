//! Disk and ring emission

use std::f32::consts::TAU;

use glam::{Mat4, Vec3, Vec4};

use super::{EmitterShape, GOLDEN_ANGLE, ShapeFrame};
use crate::distribution::SpawnPoint;

/// Disk in the local XY plane
///
/// A filled disk emits along +Z from a sunflower layout. With edge emission
/// enabled, points lie on the rim and emit radially outward.
#[derive(Debug, Clone)]
pub struct DiskShape {
    frame: ShapeFrame,
    /// Disk radius
    pub radius: f32,
    /// Emit from the rim instead of the face
    pub edge_emission: bool,
}

impl DiskShape {
    pub fn new(radius: f32, edge_emission: bool, local_to_world: Mat4) -> Self {
        Self {
            frame: ShapeFrame::new(local_to_world),
            radius,
            edge_emission,
        }
    }
}

impl EmitterShape for DiskShape {
    fn frame(&self) -> &ShapeFrame {
        &self.frame
    }

    fn frame_mut(&mut self) -> &mut ShapeFrame {
        &mut self.frame
    }

    fn sample(&self, particle_size: f32) -> Vec<SpawnPoint> {
        let radius = self.radius.max(0.0);

        if self.edge_emission {
            let count = ((TAU * radius / particle_size) as usize).max(1);
            return (0..count)
                .map(|i| {
                    let angle = TAU * i as f32 / count as f32;
                    let direction = Vec3::new(angle.cos(), angle.sin(), 0.0);
                    SpawnPoint::new(direction * radius, direction, Vec4::ONE)
                })
                .collect();
        }

        let area = TAU * 0.5 * radius * radius;
        let count = ((area / (particle_size * particle_size)) as usize).max(1);
        (0..count)
            .map(|i| {
                let r = radius * ((i as f32 + 0.5) / count as f32).sqrt();
                let angle = i as f32 * GOLDEN_ANGLE;
                SpawnPoint::new(
                    Vec3::new(r * angle.cos(), r * angle.sin(), 0.0),
                    Vec3::Z,
                    Vec4::ONE,
                )
            })
            .collect()
    }
}
