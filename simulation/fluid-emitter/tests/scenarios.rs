//! End-to-end emitter behavior against the in-memory solver

use fluid_emitter::{
    ActorId, EdgeShape, EmissionMethod, Emitter, EmitterConfig, EmitterError, EmitterMaterial,
    FluidMaterial, GranularMaterial, ParticleEvent, ParticleSolver, Solver, SolverMode,
    SolverParameters, encode_phase,
};
use glam::{Mat4, Vec3};
use pretty_assertions::assert_eq;
use test_case::test_case;

fn unit_step_solver(capacity: usize) -> Solver {
    Solver::new(
        capacity,
        SolverParameters {
            fixed_step: 1.0,
            gravity: Vec3::ZERO,
            ..Default::default()
        },
    )
}

fn attach(config: EmitterConfig, solver: &mut Solver) -> Emitter {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut emitter = Emitter::new(ActorId(7), config).with_seed(11);
    emitter.attach(solver).unwrap();
    emitter
}

#[test]
fn single_slot_stream_recycles_after_lifespan() {
    let mut solver = unit_step_solver(4);
    // no material: particle size 0.1, so one burst per unit step
    let config = EmitterConfig {
        capacity: 1,
        emission_method: EmissionMethod::Stream,
        speed: 0.1,
        lifespan: 2.0,
        ..Default::default()
    };
    let mut emitter = attach(config, &mut solver);
    assert_eq!(emitter.emission_points(), 1);

    let step1 = emitter.step(&mut solver, 1.0).unwrap();
    assert_eq!((step1.emitted, step1.killed, step1.refused), (1, 0, 0));
    assert_eq!(emitter.active_count(), 1);

    let step2 = emitter.step(&mut solver, 1.0).unwrap();
    assert_eq!((step2.emitted, step2.killed, step2.refused), (0, 0, 1));
    assert_eq!(emitter.pool().remaining_life(0), Some(1.0));
    assert_eq!(
        emitter.emit_particle(&mut solver, 0.0),
        Err(EmitterError::Full { capacity: 1 })
    );

    let step3 = emitter.step(&mut solver, 1.0).unwrap();
    assert_eq!((step3.emitted, step3.killed, step3.refused), (1, 1, 0));
    assert_eq!(emitter.active_count(), 1);
    assert_eq!(emitter.pool().remaining_life(0), Some(2.0));

    let events = emitter.drain_events();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            ParticleEvent::Emitted { .. } => "emitted",
            ParticleEvent::Killed { .. } => "killed",
        })
        .collect();
    assert_eq!(kinds, vec!["emitted", "killed", "emitted"]);
    assert_ne!(events[0].id(), events[2].id());
}

#[test]
fn burst_waits_for_an_empty_pool() {
    let mut solver = unit_step_solver(16);
    let config = EmitterConfig {
        capacity: 10,
        emission_method: EmissionMethod::Burst,
        lifespan: 1.5,
        ..Default::default()
    };
    let mut emitter = attach(config, &mut solver);
    emitter.add_shape(Box::new(EdgeShape::new(0.35, Mat4::IDENTITY)));
    assert_eq!(emitter.emission_points(), 3);

    assert_eq!(emitter.step(&mut solver, 1.0).unwrap().emitted, 3);
    assert_eq!(emitter.active_count(), 3);

    // still alive, nothing new
    assert_eq!(emitter.step(&mut solver, 0.25).unwrap().emitted, 0);
    assert_eq!(emitter.active_count(), 3);

    // everything expires, pool empties and refills in the same step
    let report = emitter.step(&mut solver, 1.5).unwrap();
    assert_eq!(report.killed, 3);
    assert_eq!(report.emitted, 3);
}

#[test]
fn active_status_pushed_only_on_change() {
    let mut solver = unit_step_solver(16);
    let config = EmitterConfig {
        capacity: 4,
        emission_method: EmissionMethod::Burst,
        lifespan: 100.0,
        ..Default::default()
    };
    let mut emitter = attach(config, &mut solver);
    let after_attach = solver.active_pushes();

    emitter.step(&mut solver, 0.1).unwrap();
    assert_eq!(solver.active_pushes(), after_attach + 1);
    assert_eq!(solver.active_particle_count(), 1);

    emitter.step(&mut solver, 0.1).unwrap();
    emitter.step(&mut solver, 0.1).unwrap();
    assert_eq!(solver.active_pushes(), after_attach + 1);
}

#[test]
fn spawn_points_follow_shape_order() {
    let mut solver = unit_step_solver(16);
    let config = EmitterConfig {
        capacity: 8,
        speed: 1.0,
        ..Default::default()
    };
    let mut emitter = attach(config, &mut solver);
    emitter.add_shape(Box::new(EdgeShape::new(0.15, Mat4::from_translation(Vec3::X))));
    emitter.add_shape(Box::new(EdgeShape::new(0.15, Mat4::from_translation(Vec3::Y))));

    let mut origins = Vec::new();
    for _ in 0..4 {
        let index = emitter.emit_particle(&mut solver, 0.0).unwrap();
        let global = emitter.global_index(index).unwrap();
        origins.push(solver.particles().positions[global]);
    }
    assert_eq!(origins, vec![Vec3::X, Vec3::Y, Vec3::X, Vec3::Y]);
}

#[test_case(SolverMode::Mode3D ; "volumetric")]
#[test_case(SolverMode::Mode2D ; "planar")]
fn phase_tracks_every_change(mode: SolverMode) {
    let mut solver = Solver::new(
        32,
        SolverParameters {
            mode,
            ..Default::default()
        },
    );
    let mut emitter = attach(EmitterConfig::default().with_capacity(6), &mut solver);
    for _ in 0..4 {
        emitter.emit_particle(&mut solver, 0.0).unwrap();
    }

    let assert_phases = |emitter: &Emitter, solver: &Solver, expected: i32| {
        for index in 0..emitter.active_count() {
            let global = emitter.global_index(index).unwrap();
            assert_eq!(solver.particles().phases[global], expected);
        }
    };

    assert_phases(&emitter, &solver, encode_phase(1, true, false));

    emitter.set_fluid_phase(&mut solver, 42);
    assert_phases(&emitter, &solver, encode_phase(42, true, false));

    emitter.set_self_collisions(&mut solver, false);
    assert_phases(&emitter, &solver, encode_phase(42, false, false));

    emitter
        .set_material(&mut solver, Some(FluidMaterial::default().into()))
        .unwrap();
    assert_phases(&emitter, &solver, encode_phase(42, false, true));

    emitter
        .set_material(&mut solver, Some(GranularMaterial::default().into()))
        .unwrap();
    assert_phases(&emitter, &solver, encode_phase(42, false, false));
}

#[test]
fn solver_mode_change_resizes_particles() {
    let mut solver = unit_step_solver(16);
    let material = EmitterMaterial::Fluid(FluidMaterial {
        resolution: 4.0,
        ..Default::default()
    });
    let mut emitter = Emitter::new(ActorId(1), EmitterConfig::default().with_capacity(2))
        .with_material(material)
        .with_seed(5);
    emitter.attach(&mut solver).unwrap();
    let index = emitter.emit_particle(&mut solver, 0.0).unwrap();
    let global = emitter.global_index(index).unwrap();
    solver.particles_mut().viscosities[global] = 123.0;

    let mut params = solver.parameters().clone();
    params.mode = SolverMode::Mode2D;
    solver.set_parameters(params);
    emitter.on_solver_parameters_changed(&mut solver);

    // sqrt(4) = 2 particles per unit length in 2D
    let radius = solver.particles().radii[global];
    assert!((radius - 0.025).abs() < 1e-6);
    // only resolution-dependent values are re-stamped
    assert_eq!(solver.particles().viscosities[global], 123.0);
}

#[test]
fn detached_sync_is_a_no_op() {
    let mut solver = unit_step_solver(4);
    let mut emitter = Emitter::new(ActorId(1), EmitterConfig::default().with_capacity(2));

    emitter.set_fluid_phase(&mut solver, 9);
    emitter.update_particle_material(&mut solver, 0);
    emitter.push_active_status(&mut solver);
    assert_eq!(solver.active_pushes(), 0);
    assert!(solver.particles().phases.iter().all(|&p| p == 0));

    emitter.attach(&mut solver).unwrap();
    let global = emitter.global_index(0).unwrap();
    assert_eq!(solver.particles().phases[global], encode_phase(9, true, false));
}
