//! Headless host loop
//!
//! [`Simulation`] owns a [`Solver`] and the emitters feeding it. Each call to
//! [`Simulation::step`] runs every emitter, advances the solver, then hands
//! each emitter's particle events to the observers registered for it.

use std::collections::BTreeMap;

use crate::emitter::{Emitter, EmitterStats, ParticleEvent};
use crate::error::{EmitterError, Result};
use crate::scheduler::StepReport;
use crate::solver::{ActorId, ParticleSolver, Solver, SolverParameters};

/// Hook run after the solver has advanced
pub trait StepObserver {
    /// Called once per step for the observed emitter with the events it
    /// produced during that step
    fn on_step_end(
        &mut self,
        emitter: &mut Emitter,
        solver: &mut dyn ParticleSolver,
        events: &[ParticleEvent],
    );
}

/// A solver plus the emitters attached to it
pub struct Simulation {
    solver: Solver,
    emitters: BTreeMap<ActorId, Emitter>,
    observers: Vec<(ActorId, Box<dyn StepObserver>)>,
    elapsed: f64,
    steps: u64,
}

impl Simulation {
    pub fn new(solver: Solver) -> Self {
        Self {
            solver,
            emitters: BTreeMap::new(),
            observers: Vec::new(),
            elapsed: 0.0,
            steps: 0,
        }
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// Simulated time in seconds
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Attach an emitter and take ownership of it
    pub fn add_emitter(&mut self, mut emitter: Emitter) -> Result<ActorId> {
        let actor = emitter.actor();
        if self.emitters.contains_key(&actor) {
            return Err(EmitterError::InvalidParameter(format!(
                "{} is already part of the simulation",
                actor
            )));
        }

        emitter.attach(&mut self.solver)?;
        self.emitters.insert(actor, emitter);
        Ok(actor)
    }

    /// Detach an emitter and hand it back, dropping its observers
    pub fn remove_emitter(&mut self, actor: ActorId) -> Option<Emitter> {
        let mut emitter = self.emitters.remove(&actor)?;
        if let Err(e) = emitter.detach(&mut self.solver) {
            log::warn!("Removing {}: {}", actor, e);
        }
        self.observers.retain(|(observed, _)| *observed != actor);
        Some(emitter)
    }

    pub fn emitter(&self, actor: ActorId) -> Option<&Emitter> {
        self.emitters.get(&actor)
    }

    pub fn emitters(&self) -> impl Iterator<Item = &Emitter> {
        self.emitters.values()
    }

    /// Run `f` with mutable access to an emitter and the solver it feeds
    pub fn with_emitter<R>(
        &mut self,
        actor: ActorId,
        f: impl FnOnce(&mut Emitter, &mut Solver) -> R,
    ) -> Option<R> {
        let emitter = self.emitters.get_mut(&actor)?;
        Some(f(emitter, &mut self.solver))
    }

    /// Register an observer for one emitter
    pub fn observe(&mut self, actor: ActorId, observer: Box<dyn StepObserver>) -> Result<()> {
        if !self.emitters.contains_key(&actor) {
            return Err(EmitterError::InvalidParameter(format!(
                "cannot observe {}: not part of the simulation",
                actor
            )));
        }
        self.observers.push((actor, observer));
        Ok(())
    }

    /// Change the solver parameters and resynchronize every emitter
    pub fn set_parameters(&mut self, parameters: SolverParameters) {
        self.solver.set_parameters(parameters);
        for emitter in self.emitters.values_mut() {
            emitter.on_solver_parameters_changed(&mut self.solver);
        }
    }

    /// Advance by `dt` seconds. Returns the combined report of all emitters.
    pub fn step(&mut self, dt: f32) -> Result<StepReport> {
        let mut total = StepReport::default();

        for emitter in self.emitters.values_mut() {
            let report = emitter.step(&mut self.solver, dt)?;
            total.emitted += report.emitted;
            total.killed += report.killed;
            total.refused += report.refused;
        }

        self.solver.advance(dt);

        for (actor, emitter) in self.emitters.iter_mut() {
            let events = emitter.drain_events();
            for (_, observer) in self.observers.iter_mut().filter(|(o, _)| o == actor) {
                observer.on_step_end(emitter, &mut self.solver, &events);
            }
        }

        self.elapsed += f64::from(dt);
        self.steps += 1;
        log::trace!(
            "Step {}: emitted {} killed {} refused {}",
            self.steps,
            total.emitted,
            total.killed,
            total.refused
        );
        Ok(total)
    }

    /// Statistics of every emitter, ordered by actor
    pub fn stats(&self) -> Vec<(ActorId, EmitterStats)> {
        self.emitters
            .iter()
            .map(|(&actor, emitter)| (actor, emitter.stats()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::EmitterConfig;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<ParticleEvent>>>);

    impl StepObserver for Recorder {
        fn on_step_end(
            &mut self,
            _emitter: &mut Emitter,
            _solver: &mut dyn ParticleSolver,
            events: &[ParticleEvent],
        ) {
            self.0.borrow_mut().extend_from_slice(events);
        }
    }

    fn simulation() -> Simulation {
        Simulation::new(Solver::new(
            32,
            SolverParameters {
                fixed_step: 1.0,
                gravity: Vec3::new(0.0, -1.0, 0.0),
                ..Default::default()
            },
        ))
    }

    fn emitter(actor: u32) -> Emitter {
        let config = EmitterConfig {
            capacity: 4,
            speed: 0.1,
            lifespan: 2.0,
            ..Default::default()
        };
        Emitter::new(ActorId(actor), config).with_seed(1)
    }

    #[test]
    fn test_duplicate_actor_rejected() {
        let mut sim = simulation();
        sim.add_emitter(emitter(1)).unwrap();
        assert!(sim.add_emitter(emitter(1)).is_err());
        assert_eq!(sim.solver().free_count(), 28);
    }

    #[test]
    fn test_step_emits_and_integrates() {
        let mut sim = simulation();
        let actor = sim.add_emitter(emitter(1)).unwrap();

        let report = sim.step(1.0).unwrap();
        assert_eq!(report.emitted, 1);
        assert_eq!(sim.solver().active_particle_count(), 1);

        let global = sim.emitter(actor).unwrap().global_index(0).unwrap();
        // gravity pulled the particle down during the step
        assert!(sim.solver().particles().positions[global].y < 0.0);
    }

    #[test]
    fn test_observers_see_events_once() {
        let mut sim = simulation();
        let actor = sim.add_emitter(emitter(1)).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        sim.observe(actor, Box::new(Recorder(seen.clone()))).unwrap();

        sim.step(1.0).unwrap();
        sim.step(1.0).unwrap();
        sim.step(1.0).unwrap();

        let seen = seen.borrow();
        let emitted = seen
            .iter()
            .filter(|e| matches!(e, ParticleEvent::Emitted { .. }))
            .count();
        assert_eq!(emitted, 3);
        assert!(sim.emitter(actor).unwrap().pending_events().is_empty());
    }

    #[test]
    fn test_remove_emitter_frees_solver() {
        let mut sim = simulation();
        let actor = sim.add_emitter(emitter(1)).unwrap();
        sim.step(1.0).unwrap();

        let removed = sim.remove_emitter(actor).unwrap();
        assert!(!removed.is_attached());
        assert_eq!(sim.solver().free_count(), 32);
        assert_eq!(sim.solver().active_particle_count(), 0);
    }

    #[test]
    fn test_parameter_change_reaches_emitters() {
        let mut sim = simulation();
        let actor = sim.add_emitter(emitter(1)).unwrap();

        let mut params = sim.solver().parameters().clone();
        params.mode = crate::solver::SolverMode::Mode2D;
        sim.set_parameters(params);

        assert_eq!(
            sim.emitter(actor).unwrap().mode(),
            crate::solver::SolverMode::Mode2D
        );
    }
}
