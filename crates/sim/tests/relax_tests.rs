//! Integration tests for the relaxation fluid engine.
//!
//! These pin the parts of the tick with exact expectations (free fall for
//! an isolated particle), the containment guarantee, and determinism under
//! a fixed seed.

use glam::Vec2;
use sim::RelaxSimulation;

const DT: f32 = 1.0 / 60.0;
// Mirrors the engine's gravity constant.
const GRAVITY_Y: f32 = -9.8;

/// A single particle has no neighbors: one tick is pure ballistic motion.
/// Velocity gains exactly gravity·dt and position moves by velocity·dt.
#[test]
fn isolated_particle_free_falls() {
    let mut sim = RelaxSimulation::with_seed(1, 42);
    let pos_before = sim.positions[0];
    let vel_before = sim.velocities[0];

    sim.update(DT);

    let vel_after = sim.velocities[0];
    let expected_vel = Vec2::new(vel_before.x, vel_before.y + GRAVITY_Y * DT);
    assert!(
        (vel_after - expected_vel).length() < 1e-5,
        "free-fall velocity {vel_after:?}, expected {expected_vel:?}"
    );

    let expected_pos = pos_before + expected_vel * DT;
    assert!(
        (sim.positions[0] - expected_pos).length() < 1e-5,
        "free-fall position {:?}, expected {expected_pos:?}",
        sim.positions[0]
    );
}

/// Several ticks of free fall accumulate gravity linearly while the
/// particle stays clear of walls and neighbors.
#[test]
fn free_fall_accumulates() {
    let mut sim = RelaxSimulation::with_seed(1, 7);
    let vy0 = sim.velocities[0].y;

    for _ in 0..10 {
        sim.update(DT);
    }
    let expected = vy0 + 10.0 * GRAVITY_Y * DT;
    assert!(
        (sim.velocities[0].y - expected).abs() < 1e-4,
        "vy {} after 10 ticks, expected {expected}",
        sim.velocities[0].y
    );
}

/// Every particle stays inside the unit square, however long the run.
#[test]
fn particles_stay_in_unit_domain() {
    let mut sim = RelaxSimulation::with_seed(300, 1234);

    for frame in 0..600 {
        sim.update(DT);
        if frame % 50 == 0 || frame == 599 {
            for (i, pos) in sim.positions.iter().enumerate() {
                assert!(
                    (0.0..=1.0).contains(&pos.x) && (0.0..=1.0).contains(&pos.y),
                    "particle {i} escaped to {pos:?} on frame {frame}"
                );
                assert!(pos.is_finite(), "particle {i} went non-finite on frame {frame}");
            }
        }
    }
}

/// Velocities stay finite even after the fluid has piled up on the floor,
/// where the coincident-particle epsilon guard matters.
#[test]
fn settled_fluid_stays_finite() {
    let mut sim = RelaxSimulation::with_seed(200, 9);

    for _ in 0..400 {
        sim.update(DT);
    }
    for (i, vel) in sim.velocities.iter().enumerate() {
        assert!(vel.is_finite(), "velocity {i} is {vel:?} after settling");
    }
}

/// Equal seeds, equal trajectories.
#[test]
fn runs_are_deterministic() {
    let mut a = RelaxSimulation::with_seed(150, 77);
    let mut b = RelaxSimulation::with_seed(150, 77);

    for _ in 0..100 {
        a.update(DT);
        b.update(DT);
    }

    for i in 0..a.particle_count() {
        assert!(
            (a.positions[i] - b.positions[i]).length() < 1e-6,
            "positions diverged at {i}: {:?} vs {:?}",
            a.positions[i],
            b.positions[i]
        );
        assert!(
            (a.velocities[i] - b.velocities[i]).length() < 1e-6,
            "velocities diverged at {i}"
        );
    }
}

/// A mouse puff pushes nearby particles directly away from the point.
#[test]
fn mouse_puff_pushes_away() {
    let mut sim = RelaxSimulation::with_seed(50, 21);

    let target = sim.positions[0];
    let point = target - Vec2::new(0.02, 0.0);
    let vel_before = sim.velocities[0];

    sim.add_mouse_puff(point);

    let kick = sim.velocities[0] - vel_before;
    assert!(
        kick.length() > 0.0,
        "puff did not reach the particle next to it"
    );
    assert!(
        kick.dot(target - point) > 0.0,
        "puff kick {kick:?} should point away from the puff origin"
    );
}

/// Clear removes every particle and leaves the engine ticking safely.
#[test]
fn clear_empties_the_simulation() {
    let mut sim = RelaxSimulation::with_seed(64, 5);
    assert_eq!(sim.particle_count(), 64);

    sim.clear();
    assert_eq!(sim.particle_count(), 0);
    sim.update(DT);
    sim.add_mouse_puff(Vec2::new(0.5, 0.5));
}
