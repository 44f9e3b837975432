//! Integration tests for the grid fluid engine.
//!
//! These verify transfer-level invariants (mass conservation through the
//! quadratic stencil), containment over long runs, and seed-for-seed
//! determinism.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sim::{Fluid, MpmSimulation};

const WIDTH: f32 = 32.0;
const HEIGHT: f32 = 32.0;
const SCALE: f32 = 1.0;

/// Build a simulation with one species of `count` particles scattered
/// around the middle of the tank.
fn sim_with_particles(count: usize, seed: u64) -> MpmSimulation {
    let mut sim = MpmSimulation::with_seed(WIDTH, HEIGHT, SCALE, seed);
    let mut fluid = Fluid::new(sim.grid_width, sim.grid_height);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let center = Vec2::new(sim.grid_width as f32, sim.grid_height as f32) * 0.5;
    for _ in 0..count {
        let x = center.x + (rng.gen::<f32>() - 0.5) * 8.0;
        let y = center.y + (rng.gen::<f32>() - 0.5) * 8.0;
        fluid.add_particle(x, y, 0.0, 0.0);
    }

    sim.add_fluid(fluid);
    sim
}

/// Scattering N unit-weight particles deposits total mass N on the grid
/// (the 3×3 stencil weights are a partition of unity).
#[test]
fn scatter_conserves_mass() {
    const COUNT: usize = 200;
    let mut sim = sim_with_particles(COUNT, 7);
    sim.update();

    let total: f32 = sim.cells.iter().map(|c| c.mass).sum();
    assert!(
        (total - COUNT as f32).abs() < 1e-3,
        "grid mass {total} should equal particle count {COUNT}"
    );
}

/// Particles stay inside the valid interior band for arbitrarily long runs.
#[test]
fn particles_stay_in_bounds() {
    let mut sim = sim_with_particles(150, 11);
    let max_x = sim.grid_width as f32 - 2.0;
    let max_y = sim.grid_height as f32 - 2.0;

    for frame in 0..200 {
        sim.update();
        for fluid in &sim.fluids {
            for p in &fluid.particles {
                assert!(
                    (1.0..=max_x).contains(&p.pos.x) && (1.0..=max_y).contains(&p.pos.y),
                    "particle escaped to {:?} on frame {frame}",
                    p.pos
                );
                assert!(
                    p.pos.is_finite() && p.vel.is_finite(),
                    "non-finite particle state on frame {frame}"
                );
            }
        }
    }
}

/// Two runs with equal seeds and inputs produce equal trajectories.
#[test]
fn runs_are_deterministic() {
    let mut a = sim_with_particles(120, 99);
    let mut b = sim_with_particles(120, 99);

    for _ in 0..50 {
        a.update();
        b.update();
    }

    for (pa, pb) in a.fluids[0].particles.iter().zip(&b.fluids[0].particles) {
        assert!(
            (pa.pos - pb.pos).length() < 1e-6,
            "positions diverged: {:?} vs {:?}",
            pa.pos,
            pb.pos
        );
        assert!(
            (pa.vel - pb.vel).length() < 1e-6,
            "velocities diverged: {:?} vs {:?}",
            pa.vel,
            pb.vel
        );
    }
}

/// Gravity pulls a sparse cloud downward (y grows downward).
#[test]
fn gravity_moves_particles_down() {
    let mut sim = sim_with_particles(40, 3);
    let before: f32 = sim.fluids[0].particles.iter().map(|p| p.pos.y).sum();

    for _ in 0..30 {
        sim.update();
    }
    let after: f32 = sim.fluids[0].particles.iter().map(|p| p.pos.y).sum();

    assert!(
        after > before,
        "mean particle height did not fall: {before} -> {after}"
    );
}

/// Species tallies add up, and bulk clear empties every roster.
#[test]
fn particle_count_and_clear() {
    let mut sim = MpmSimulation::with_seed(WIDTH, HEIGHT, SCALE, 5);
    let mut water = Fluid::new(sim.grid_width, sim.grid_height);
    let mut oil = Fluid::new(sim.grid_width, sim.grid_height);
    oil.density = 1.0;
    oil.viscosity = 4.0;

    for i in 0..10 {
        water.add_particle(12.0 + i as f32 * 0.3, 14.0, 0.0, 0.0);
    }
    for i in 0..6 {
        oil.add_particle(18.0 + i as f32 * 0.3, 14.0, 0.0, 0.0);
    }
    sim.add_fluid(water);
    sim.add_fluid(oil);

    assert_eq!(sim.particle_count(), 16);
    sim.update();
    assert_eq!(sim.particle_count(), 16, "update must not drop particles");

    sim.clear_particles();
    assert_eq!(sim.particle_count(), 0);
    sim.update();
}

/// An empty simulation ticks without touching the grid.
#[test]
fn empty_update_is_a_no_op() {
    let mut sim = MpmSimulation::with_seed(WIDTH, HEIGHT, SCALE, 1);
    sim.update();
    assert!(sim.cells.iter().all(|c| c.mass == 0.0));
}
