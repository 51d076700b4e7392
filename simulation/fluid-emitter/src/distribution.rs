//! Spawn point sampling
//!
//! [`DistributionCursor`] walks the emitter's shapes round-robin and never
//! runs dry: after the last point of the last shape it wraps back to the
//! first shape. The cursor only remembers where it is, so it stays valid
//! while shapes move or regenerate. It must be reset whenever the shape
//! list itself changes.

use glam::{Mat4, Vec3, Vec4};

use crate::shape::EmitterShape;

/// Where and how a particle is born
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub position: Vec3,
    /// Emission axis; scaled by the emitter speed to get the velocity
    pub direction: Vec3,
    pub color: Vec4,
}

impl SpawnPoint {
    pub fn new(position: Vec3, direction: Vec3, color: Vec4) -> Self {
        Self {
            position,
            direction,
            color,
        }
    }

    /// Origin and forward (+Z) axis of a transform
    pub fn from_frame(frame: &Mat4, color: Vec4) -> Self {
        Self {
            position: frame.w_axis.truncate(),
            direction: frame.z_axis.truncate(),
            color,
        }
    }

    /// This point moved into another space and tinted
    pub fn transformed(&self, transform: &Mat4, tint: Vec4) -> Self {
        Self {
            position: transform.transform_point3(self.position),
            direction: transform.transform_vector3(self.direction),
            color: self.color * tint,
        }
    }
}

/// Position of the sampler inside the shape list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributionCursor {
    shape: usize,
    point: usize,
}

impl DistributionCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart from the first point of the first shape
    pub fn reset(&mut self) {
        self.shape = 0;
        self.point = 0;
    }

    /// Current shape index
    pub fn shape_index(&self) -> usize {
        self.shape
    }

    /// Current point index within the shape
    pub fn point_index(&self) -> usize {
        self.point
    }

    /// Produce the next spawn point.
    ///
    /// With no shapes the emitter itself is the source: its origin and
    /// forward axis in solver space, `fallback`. A shape with no points
    /// contributes a single point at its own origin.
    pub fn next<S>(&mut self, shapes: &[S], fallback: &Mat4) -> SpawnPoint
    where
        S: AsRef<dyn EmitterShape>,
    {
        if shapes.is_empty() {
            return SpawnPoint::from_frame(fallback, Vec4::ONE);
        }

        if self.shape >= shapes.len() {
            self.reset();
        }

        // A regenerated distribution may have shrunk under the cursor; that
        // shape is then finished. At most one full lap is needed.
        for _ in 0..=shapes.len() {
            let shape = shapes[self.shape].as_ref();
            let points = shape.distribution();
            let transform = shape.local_to_solver();

            if points.is_empty() {
                let point = SpawnPoint::from_frame(&transform, Vec4::ONE);
                self.advance_shape(shapes.len());
                return point;
            }

            if self.point < points.len() {
                let point = points[self.point].transformed(&transform, shape.color());
                self.point += 1;
                if self.point >= points.len() {
                    self.advance_shape(shapes.len());
                }
                return point;
            }

            self.advance_shape(shapes.len());
        }

        SpawnPoint::from_frame(fallback, Vec4::ONE)
    }

    fn advance_shape(&mut self, shape_count: usize) {
        self.point = 0;
        self.shape = (self.shape + 1) % shape_count;
    }
}
