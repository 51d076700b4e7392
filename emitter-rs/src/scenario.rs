//! Scenario files
//!
//! A scenario describes one solver and one emitter feeding it. Files are
//! YAML (`.yaml`, `.yml`) or JSON (`.json`); every section is optional.
//!
//! ```yaml
//! solver:
//!   mode: 3d
//!   fixed_step: 0.02
//! solver_capacity: 4096
//! emitter:
//!   capacity: 500
//!   speed: 1.5
//! material:
//!   type: fluid
//!   viscosity: 0.2
//! shapes:
//!   - type: disk
//!     radius: 0.3
//! observers:
//!   - type: color_from_viscosity
//!     max: 0.5
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use fluid_emitter::{
    ActorId, ColorFromViscosity, Emitter, EmitterConfig, EmitterMaterial, FluidPropertyColorizer,
    Gradient, ShapeConfig, Simulation, Solver, SolverParameters, StepObserver,
    ViscositySurfTensionToUserData,
};
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Actor id given to the scenario's emitter
pub const EMITTER_ACTOR: ActorId = ActorId(1);

fn default_solver_capacity() -> usize {
    4096
}

/// Step observer attached to the emitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObserverSpec {
    ViscositySurfTensionToUserData,
    FluidPropertyColorizer {
        #[serde(default)]
        gradient: Option<Gradient>,
    },
    ColorFromViscosity {
        #[serde(default)]
        min: f32,
        #[serde(default = "one")]
        max: f32,
        #[serde(default)]
        gradient: Option<Gradient>,
    },
}

fn one() -> f32 {
    1.0
}

impl ObserverSpec {
    fn build(&self) -> Box<dyn StepObserver> {
        match self {
            Self::ViscositySurfTensionToUserData => Box::new(ViscositySurfTensionToUserData),
            Self::FluidPropertyColorizer { gradient } => Box::new(FluidPropertyColorizer::new(
                gradient.clone().unwrap_or_default(),
            )),
            Self::ColorFromViscosity { min, max, gradient } => Box::new(ColorFromViscosity {
                min: *min,
                max: *max,
                gradient: gradient.clone().unwrap_or_default(),
            }),
        }
    }
}

/// Everything needed to set up a headless simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub solver: SolverParameters,
    #[serde(default = "default_solver_capacity")]
    pub solver_capacity: usize,
    #[serde(default)]
    pub emitter: EmitterConfig,
    #[serde(default)]
    pub material: Option<EmitterMaterial>,
    #[serde(default)]
    pub shapes: Vec<ShapeConfig>,
    #[serde(default)]
    pub observers: Vec<ObserverSpec>,
    /// Emitter placement in world space
    #[serde(default)]
    pub translation: Vec3,
    #[serde(default)]
    pub rotation: Quat,
    /// Seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            solver: SolverParameters::default(),
            solver_capacity: default_solver_capacity(),
            emitter: EmitterConfig::default(),
            material: None,
            shapes: Vec::new(),
            observers: Vec::new(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            seed: None,
        }
    }
}

impl Scenario {
    /// Load a scenario, picking the format from the file extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let scenario: Self = match extension.as_deref() {
            Some("yaml" | "yml") => serde_yaml_ng::from_str(&content)
                .with_context(|| format!("Failed to parse YAML scenario {}", path.display()))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON scenario {}", path.display()))?,
            _ => bail!(
                "Unsupported scenario format for {} (expected .yaml, .yml or .json)",
                path.display()
            ),
        };

        scenario.validate()?;
        log::info!("Loaded scenario {}", path.display());
        Ok(scenario)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.solver.fixed_step > 0.0) {
            bail!("solver.fixed_step must be positive, got {}", self.solver.fixed_step);
        }
        if self.emitter.capacity > self.solver_capacity {
            bail!(
                "emitter capacity {} exceeds solver capacity {}",
                self.emitter.capacity,
                self.solver_capacity
            );
        }
        self.emitter.validate().context("Invalid emitter settings")?;
        if let Some(material) = &self.material {
            material.validate().context("Invalid material")?;
        }
        Ok(())
    }

    /// Emitter transform in world space
    pub fn transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    /// Emitter described by this scenario, detached
    pub fn build_emitter(&self) -> Emitter {
        let mut emitter =
            Emitter::new(EMITTER_ACTOR, self.emitter.clone()).with_transform(self.transform());
        if let Some(material) = &self.material {
            emitter = emitter.with_material(material.clone());
        }
        if let Some(seed) = self.seed {
            emitter = emitter.with_seed(seed);
        }
        for shape in &self.shapes {
            emitter.add_shape(shape.build());
        }
        emitter
    }

    /// Solver, emitter and observers wired together
    pub fn build(&self) -> Result<Simulation> {
        let solver = Solver::new(self.solver_capacity, self.solver.clone());
        let mut simulation = Simulation::new(solver);
        let actor = simulation
            .add_emitter(self.build_emitter())
            .context("Failed to attach emitter")?;

        for observer in &self.observers {
            simulation.observe(actor, observer.build())?;
        }
        Ok(simulation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluid_emitter::{EmissionMethod, ShapeKind, SolverMode};

    #[test]
    fn test_yaml_sections_are_optional() {
        let scenario: Scenario = serde_yaml_ng::from_str("emitter:\n  capacity: 10\n").unwrap();
        assert_eq!(scenario.emitter.capacity, 10);
        assert_eq!(scenario.emitter.speed, EmitterConfig::default().speed);
        assert_eq!(scenario.solver_capacity, 4096);
        assert!(scenario.material.is_none());
    }

    #[test]
    fn test_yaml_full_scenario() {
        let yaml = r"
solver:
  mode: 2d
  fixed_step: 0.01
emitter:
  capacity: 64
  emission_method: burst
material:
  type: granular
  randomness: 20
shapes:
  - type: edge
    length: 0.5
    translation: [0.0, 1.0, 0.0]
observers:
  - type: color_from_viscosity
    max: 2.0
";
        let scenario: Scenario = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(scenario.solver.mode, SolverMode::Mode2D);
        assert_eq!(scenario.emitter.emission_method, EmissionMethod::Burst);
        assert!(matches!(
            scenario.material,
            Some(EmitterMaterial::Granular(ref g)) if g.randomness == 20.0
        ));
        assert_eq!(scenario.shapes[0].kind, ShapeKind::Edge { length: 0.5 });
        assert_eq!(scenario.shapes[0].translation, Vec3::Y);
        assert_eq!(
            scenario.observers,
            vec![ObserverSpec::ColorFromViscosity {
                min: 0.0,
                max: 2.0,
                gradient: None
            }]
        );
    }

    #[test]
    fn test_capacity_must_fit_solver() {
        let scenario = Scenario {
            solver_capacity: 10,
            emitter: EmitterConfig::default().with_capacity(11),
            ..Default::default()
        };
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_build_runs() {
        let scenario = Scenario {
            solver_capacity: 100,
            emitter: EmitterConfig::default().with_capacity(50),
            seed: Some(1),
            ..Default::default()
        };
        let mut simulation = scenario.build().unwrap();
        simulation.step(0.02).unwrap();
        assert_eq!(simulation.stats()[0].1.active, 1);
    }
}
