//! Step observers that read and write particle data
//!
//! These recolor particles from fluid properties and shuttle properties
//! through the user data channels. None of them touch pool bookkeeping.

use glam::Vec4;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::emitter::{Emitter, ParticleEvent};
use crate::simulation::StepObserver;
use crate::solver::ParticleSolver;

/// A color at a position along a gradient
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColorStop {
    pub time: f32,
    pub color: Vec4,
}

/// Piecewise linear color ramp over `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Vec<ColorStop>", into = "Vec<ColorStop>"))]
pub struct Gradient {
    stops: Vec<ColorStop>,
}

impl Gradient {
    pub fn new() -> Self {
        Self { stops: Vec::new() }
    }

    /// Add a stop, keeping stops ordered by time
    pub fn add_stop(mut self, time: f32, color: Vec4) -> Self {
        self.stops.push(ColorStop { time, color });
        self.stops.sort_by(|a, b| a.time.total_cmp(&b.time));
        self
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color at `t`, clamped to the outermost stops
    pub fn evaluate(&self, t: f32) -> Vec4 {
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return Vec4::ONE;
        };
        if t.is_nan() || t <= first.time {
            return first.color;
        }
        if t >= last.time {
            return last.color;
        }

        for pair in self.stops.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if t >= a.time && t <= b.time {
                let span = b.time - a.time;
                if span <= 0.0 {
                    return b.color;
                }
                return a.color.lerp(b.color, (t - a.time) / span);
            }
        }
        last.color
    }
}

impl From<Vec<ColorStop>> for Gradient {
    fn from(mut stops: Vec<ColorStop>) -> Self {
        stops.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { stops }
    }
}

impl From<Gradient> for Vec<ColorStop> {
    fn from(gradient: Gradient) -> Self {
        gradient.stops
    }
}

impl Default for Gradient {
    /// Black to white
    fn default() -> Self {
        Self::new()
            .add_stop(0.0, Vec4::new(0.0, 0.0, 0.0, 1.0))
            .add_stop(1.0, Vec4::ONE)
    }
}

/// Stores each new particle's viscosity and surface tension in user data
/// channels 0 and 1, so later observers can restore them
#[derive(Debug, Clone, Copy, Default)]
pub struct ViscositySurfTensionToUserData;

impl StepObserver for ViscositySurfTensionToUserData {
    fn on_step_end(
        &mut self,
        emitter: &mut Emitter,
        solver: &mut dyn ParticleSolver,
        events: &[ParticleEvent],
    ) {
        let arrays = solver.particles_mut();
        for event in events {
            let ParticleEvent::Emitted { id, .. } = *event else {
                continue;
            };
            // a later kill in the same step may have moved it
            let Some(global) = emitter
                .particle_index(id)
                .and_then(|index| emitter.global_index(index))
            else {
                continue;
            };

            let data = &mut arrays.user_data[global];
            data.x = arrays.viscosities[global];
            data.y = arrays.surface_tension[global];
        }
    }
}

/// Colors every slot from its first user data channel
#[derive(Debug, Clone, Default)]
pub struct FluidPropertyColorizer {
    pub gradient: Gradient,
}

impl FluidPropertyColorizer {
    pub fn new(gradient: Gradient) -> Self {
        Self { gradient }
    }
}

impl StepObserver for FluidPropertyColorizer {
    fn on_step_end(
        &mut self,
        emitter: &mut Emitter,
        solver: &mut dyn ParticleSolver,
        _events: &[ParticleEvent],
    ) {
        let arrays = solver.particles();
        for index in 0..emitter.capacity() {
            let Some(global) = emitter.global_index(index) else {
                break;
            };
            let color = self.gradient.evaluate(arrays.user_data[global].x);
            emitter.set_particle_color(index, color);
        }
    }
}

/// Colors every slot by viscosity normalized to `[min, max]`, then restores
/// viscosity and surface tension from user data channels 0 and 1
#[derive(Debug, Clone)]
pub struct ColorFromViscosity {
    pub min: f32,
    pub max: f32,
    pub gradient: Gradient,
}

impl Default for ColorFromViscosity {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            gradient: Gradient::default(),
        }
    }
}

impl ColorFromViscosity {
    fn normalize(&self, viscosity: f32) -> f32 {
        let range = self.max - self.min;
        if range.abs() <= f32::EPSILON {
            return 0.0;
        }
        (viscosity - self.min) / range
    }
}

impl StepObserver for ColorFromViscosity {
    fn on_step_end(
        &mut self,
        emitter: &mut Emitter,
        solver: &mut dyn ParticleSolver,
        _events: &[ParticleEvent],
    ) {
        let arrays = solver.particles_mut();
        for index in 0..emitter.capacity() {
            let Some(global) = emitter.global_index(index) else {
                break;
            };
            let color = self.gradient.evaluate(self.normalize(arrays.viscosities[global]));
            emitter.set_particle_color(index, color);

            let data = arrays.user_data[global];
            arrays.viscosities[global] = data.x;
            arrays.surface_tension[global] = data.y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::EmitterConfig;
    use crate::material::{EmitterMaterial, FluidMaterial};
    use crate::solver::{ActorId, Solver, SolverParameters};

    const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
    const BLUE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

    fn fluid_emitter(solver: &mut Solver, viscosity: f32) -> Emitter {
        let material = EmitterMaterial::Fluid(FluidMaterial {
            viscosity,
            surface_tension: 0.4,
            ..Default::default()
        });
        let mut emitter = Emitter::new(ActorId(1), EmitterConfig::default().with_capacity(2))
            .with_material(material)
            .with_seed(3);
        emitter.attach(solver).unwrap();
        emitter
    }

    #[test]
    fn test_gradient_interpolates() {
        let gradient = Gradient::new().add_stop(1.0, BLUE).add_stop(0.0, RED);
        assert_eq!(gradient.evaluate(0.0), RED);
        assert_eq!(gradient.evaluate(1.0), BLUE);
        assert_eq!(gradient.evaluate(0.5), Vec4::new(0.5, 0.0, 0.5, 1.0));
        assert_eq!(gradient.evaluate(-3.0), RED);
        assert_eq!(gradient.evaluate(7.0), BLUE);
        assert_eq!(gradient.evaluate(f32::NAN), RED);
    }

    #[test]
    fn test_gradient_from_unsorted_stops() {
        let gradient = Gradient::from(vec![
            ColorStop { time: 1.0, color: BLUE },
            ColorStop { time: 0.0, color: RED },
        ]);
        assert_eq!(gradient.stops()[0].color, RED);
        assert_eq!(gradient.evaluate(0.25), Vec4::new(0.75, 0.0, 0.25, 1.0));
    }

    #[test]
    fn test_empty_gradient_is_white() {
        assert_eq!(Gradient::new().evaluate(0.3), Vec4::ONE);
    }

    #[test]
    fn test_user_data_captures_emitted_properties() {
        let mut solver = Solver::new(4, SolverParameters::default());
        let mut emitter = fluid_emitter(&mut solver, 0.25);
        let index = emitter.emit_particle(&mut solver, 0.0).unwrap();
        let events = emitter.drain_events();

        ViscositySurfTensionToUserData.on_step_end(&mut emitter, &mut solver, &events);

        let global = emitter.global_index(index).unwrap();
        let data = solver.particles().user_data[global];
        assert_eq!(data.x, 0.25);
        assert_eq!(data.y, 0.4);
    }

    #[test]
    fn test_color_from_viscosity_restores_properties() {
        let mut solver = Solver::new(4, SolverParameters::default());
        let mut emitter = fluid_emitter(&mut solver, 0.25);
        let index = emitter.emit_particle(&mut solver, 0.0).unwrap();
        let global = emitter.global_index(index).unwrap();

        // something else bumped the viscosity this step
        {
            let arrays = solver.particles_mut();
            arrays.user_data[global] = Vec4::new(0.25, 0.4, 0.0, 0.0);
            arrays.viscosities[global] = 1.0;
            arrays.surface_tension[global] = 0.0;
        }

        let mut colorizer = ColorFromViscosity {
            min: 0.0,
            max: 1.0,
            gradient: Gradient::new().add_stop(0.0, RED).add_stop(1.0, BLUE),
        };
        colorizer.on_step_end(&mut emitter, &mut solver, &[]);

        assert_eq!(emitter.colors()[index], BLUE);
        assert_eq!(solver.particles().viscosities[global], 0.25);
        assert_eq!(solver.particles().surface_tension[global], 0.4);
    }

    #[test]
    fn test_property_colorizer_reads_first_channel() {
        let mut solver = Solver::new(4, SolverParameters::default());
        let mut emitter = fluid_emitter(&mut solver, 0.25);
        let index = emitter.emit_particle(&mut solver, 0.0).unwrap();
        let global = emitter.global_index(index).unwrap();
        solver.particles_mut().user_data[global].x = 1.0;

        let mut colorizer =
            FluidPropertyColorizer::new(Gradient::new().add_stop(0.0, RED).add_stop(1.0, BLUE));
        colorizer.on_step_end(&mut emitter, &mut solver, &[]);
        assert_eq!(emitter.colors()[index], BLUE);
    }
}
