//! Resolved particle properties of a scenario

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use fluid_emitter::material::{self, DEFAULT_SMOOTHING_RADIUS};
use fluid_emitter::{EmitterMaterial, EmitterShape, SolverMode, encode_phase};
use serde::Serialize;

use crate::scenario::Scenario;

#[derive(Args)]
pub struct InspectArgs {
    /// Path to the scenario file (.yaml, .yml or .json)
    pub scenario: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Particle properties for one dimensionality
#[derive(Debug, Serialize, PartialEq)]
pub struct ModeReport {
    pub mode: SolverMode,
    pub particle_size: f32,
    pub particle_mass: f32,
    /// Radius before granular jitter
    pub radius: f32,
    pub smoothing_radius: f32,
    /// Spawn points over all shapes, at least one
    pub emission_points: usize,
    /// Stream bursts owed per fixed step
    pub bursts_per_step: f32,
}

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub material: String,
    pub phase: i32,
    pub modes: Vec<ModeReport>,
}

fn describe(material: Option<&EmitterMaterial>) -> String {
    match material {
        None => "none (defaults)".to_string(),
        Some(EmitterMaterial::Fluid(_)) => "fluid".to_string(),
        Some(EmitterMaterial::Granular(g)) => format!("granular (randomness {}%)", g.randomness),
    }
}

fn mode_report(scenario: &Scenario, mode: SolverMode) -> ModeReport {
    let assigned = scenario.material.as_ref();
    let size = material::particle_size(assigned, mode);

    let mut shapes: Vec<_> = scenario.shapes.iter().map(|s| s.build()).collect();
    for shape in &mut shapes {
        shape.generate_distribution(size);
    }
    let emission_points = shapes
        .iter()
        .map(|s| s.distribution().len())
        .sum::<usize>()
        .max(1);

    let radius = match assigned {
        Some(m) if !m.is_fluid() => material::MIN_PARTICLE_RADIUS + size * 0.5,
        _ => size * 0.5,
    };

    ModeReport {
        mode,
        particle_size: size,
        particle_mass: material::particle_mass(assigned, mode),
        radius,
        smoothing_radius: assigned.map_or(DEFAULT_SMOOTHING_RADIUS, |m| m.smoothing_radius(mode)),
        emission_points,
        bursts_per_step: if size > 0.0 {
            scenario.emitter.speed * scenario.solver.fixed_step / size
        } else {
            0.0
        },
    }
}

/// Resolve a scenario's particle properties in both modes
pub fn report(scenario: &Scenario) -> InspectReport {
    let assigned = scenario.material.as_ref();
    InspectReport {
        material: describe(assigned),
        phase: encode_phase(
            scenario.emitter.fluid_phase,
            scenario.emitter.self_collisions,
            assigned.is_some_and(EmitterMaterial::is_fluid),
        ),
        modes: vec![
            mode_report(scenario, SolverMode::Mode2D),
            mode_report(scenario, SolverMode::Mode3D),
        ],
    }
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let report = report(&scenario);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Scenario: {}", args.scenario.display());
    println!("\n=== Emitter ===");
    println!("Material:  {}", report.material);
    println!("Phase:     {:#010x}", report.phase);
    println!("Capacity:  {}", scenario.emitter.capacity);
    println!("Method:    {:?}", scenario.emitter.emission_method);

    for mode in &report.modes {
        println!("\n=== {:?} ===", mode.mode);
        println!("Particle size:    {}", mode.particle_size);
        println!("Particle mass:    {}", mode.particle_mass);
        println!("Radius:           {}", mode.radius);
        println!("Smoothing radius: {}", mode.smoothing_radius);
        println!("Emission points:  {}", mode.emission_points);
        println!("Bursts per step:  {:.4}", mode.bursts_per_step);
    }
    Ok(())
}
