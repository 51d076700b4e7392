//! Rectangular grid emission

use glam::{Mat4, Vec2, Vec3, Vec4};

use super::{EmitterShape, ShapeFrame};
use crate::distribution::SpawnPoint;

/// Rectangle centered on the origin of the local XY plane, emitting along +Z
#[derive(Debug, Clone)]
pub struct SquareShape {
    frame: ShapeFrame,
    /// Width and height
    pub size: Vec2,
}

impl SquareShape {
    pub fn new(size: Vec2, local_to_world: Mat4) -> Self {
        Self {
            frame: ShapeFrame::new(local_to_world),
            size,
        }
    }
}

impl EmitterShape for SquareShape {
    fn frame(&self) -> &ShapeFrame {
        &self.frame
    }

    fn frame_mut(&mut self) -> &mut ShapeFrame {
        &mut self.frame
    }

    fn sample(&self, particle_size: f32) -> Vec<SpawnPoint> {
        let size = self.size.max(Vec2::ZERO);
        let columns = ((size.x / particle_size) as usize).max(1);
        let rows = ((size.y / particle_size) as usize).max(1);
        let step = Vec2::new(size.x / columns as f32, size.y / rows as f32);
        let corner = -size * 0.5;

        let mut points = Vec::with_capacity(columns * rows);
        for row in 0..rows {
            for column in 0..columns {
                let offset = corner + step * Vec2::new(column as f32 + 0.5, row as f32 + 0.5);
                points.push(SpawnPoint::new(offset.extend(0.0), Vec3::Z, Vec4::ONE));
            }
        }
        points
    }
}
