//! Line segment emission

use glam::{Mat4, Vec3, Vec4};

use super::{EmitterShape, ShapeFrame};
use crate::distribution::SpawnPoint;

/// Segment along the local X axis, emitting along +Y
#[derive(Debug, Clone)]
pub struct EdgeShape {
    frame: ShapeFrame,
    /// Segment length
    pub length: f32,
}

impl EdgeShape {
    pub fn new(length: f32, local_to_world: Mat4) -> Self {
        Self {
            frame: ShapeFrame::new(local_to_world),
            length,
        }
    }
}

impl EmitterShape for EdgeShape {
    fn frame(&self) -> &ShapeFrame {
        &self.frame
    }

    fn frame_mut(&mut self) -> &mut ShapeFrame {
        &mut self.frame
    }

    fn sample(&self, particle_size: f32) -> Vec<SpawnPoint> {
        let length = self.length.max(0.0);
        let count = ((length / particle_size) as usize).max(1);
        let step = length / count as f32;

        (0..count)
            .map(|i| {
                let x = -length * 0.5 + step * (i as f32 + 0.5);
                SpawnPoint::new(Vec3::new(x, 0.0, 0.0), Vec3::Y, Vec4::ONE)
            })
            .collect()
    }
}
