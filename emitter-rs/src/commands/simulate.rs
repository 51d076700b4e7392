//! Headless simulation runs

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use fluid_emitter::{EmitterStats, Simulation};
use glam::Vec4;
use serde::Serialize;

use crate::scenario::{EMITTER_ACTOR, Scenario};
use crate::utils::create_step_bar;

#[derive(Args)]
pub struct SimulateArgs {
    /// Path to the scenario file (.yaml, .yml or .json)
    pub scenario: PathBuf,

    /// Number of steps to run
    #[arg(short, long, default_value = "100")]
    pub steps: u64,

    /// Seconds per step (defaults to the solver's fixed step)
    #[arg(long)]
    pub dt: Option<f32>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Outcome of a run
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub steps: u64,
    pub elapsed: f64,
    pub particle_size: f32,
    pub emitter: EmitterStats,
    pub solver_active: usize,
    pub solver_free: usize,
    /// Average color of live particles, if any
    pub mean_color: Option<[f32; 4]>,
}

impl RunSummary {
    fn collect(simulation: &Simulation) -> Result<Self> {
        let emitter = simulation
            .emitter(EMITTER_ACTOR)
            .context("Scenario emitter is missing")?;

        let active = emitter.active_count();
        let mean_color = (active > 0).then(|| {
            let sum: Vec4 = emitter.colors()[..active].iter().copied().sum();
            (sum / active as f32).to_array()
        });

        Ok(Self {
            steps: simulation.steps(),
            elapsed: simulation.elapsed(),
            particle_size: emitter.particle_size(),
            emitter: emitter.stats(),
            solver_active: simulation.solver().active_particle_count(),
            solver_free: simulation.solver().free_count(),
            mean_color,
        })
    }

    fn print(&self) {
        println!("\n=== Simulation Summary ===");
        println!("Steps:            {}", self.steps);
        println!("Simulated time:   {:.3}s", self.elapsed);
        println!("Particle size:    {}", self.particle_size);
        println!(
            "Active particles: {}/{}",
            self.emitter.active, self.emitter.capacity
        );
        println!("Total emitted:    {}", self.emitter.total_emitted);
        println!("Total killed:     {}", self.emitter.total_killed);
        println!("Refused (full):   {}", self.emitter.total_refused);
        println!(
            "Solver slots:     {} active, {} free",
            self.solver_active, self.solver_free
        );
        if let Some([r, g, b, a]) = self.mean_color {
            println!("Mean color:       ({r:.3}, {g:.3}, {b:.3}, {a:.3})");
        }
    }
}

/// Run a scenario for a number of steps
pub fn run(scenario: &Scenario, steps: u64, dt: Option<f32>, quiet: bool) -> Result<RunSummary> {
    let dt = dt.unwrap_or(scenario.solver.fixed_step);
    if !(dt > 0.0) {
        anyhow::bail!("Step duration must be positive, got {dt}");
    }

    let mut simulation = scenario.build()?;
    let pb = create_step_bar(steps, "simulating", quiet);
    for step in 0..steps {
        simulation
            .step(dt)
            .with_context(|| format!("Simulation failed at step {step}"))?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    RunSummary::collect(&simulation)
}

pub fn execute(args: SimulateArgs, quiet: bool) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    log::info!(
        "Running {} steps of {}",
        args.steps,
        args.scenario.display()
    );

    let summary = run(&scenario, args.steps, args.dt, quiet || args.json)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !quiet {
        summary.print();
    }
    Ok(())
}
