//! Particle relaxation fluid engine over the unit square.
//!
//! Velocity is only ever integrated for gravity; everything else happens in
//! position space. Each tick predicts positions, runs one pass of
//! double-density relaxation against the spatial hash, and reconstructs
//! velocity from the position delta. Walls are resolved with a swept
//! time-of-impact so fast particles reflect off the surface they actually
//! crossed instead of the point they ended up at.

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const GRAVITY: f32 = -9.8;

/// Buckets per axis of the spatial hash. Bucket width equals the
/// interaction radius, so a 3×3 scan covers every candidate neighbor.
const HASH_RES: usize = 8;
/// Interaction radius; pairs farther apart than this never interact.
const NEAR_DISTANCE: f32 = 1.0 / HASH_RES as f32;

/// Linear and quadratic viscosity coefficients.
const VISCOSITY_SIGMA: f32 = 0.25;
const VISCOSITY_BETA: f32 = 0.5;

const STIFFNESS: f32 = 8.0;
const STIFFNESS_NEAR: f32 = 16.0;
const REST_DENSITY: f32 = 6.0;

/// Velocity kept along the wall normal after a bounce.
const RESTITUTION: f32 = 0.3;
/// Velocity kept along the wall tangent after a bounce.
const WALL_FRICTION: f32 = 0.9;

/// Minimum pair separation before normalizing a direction. Coincident
/// particles would otherwise produce NaN displacements.
const MIN_SEPARATION: f32 = 1e-6;

const PUFF_STRENGTH: f32 = 5e-4;

/// Height of the band below the top wall that `new` seeds particles into.
const SPAWN_BAND: f32 = 0.1;
/// Largest initial horizontal speed handed to a seeded particle.
const SPAWN_DRIFT: f32 = 0.05;

const DEFAULT_SEED: u64 = 0xf1d0;

/// Spring-model constants for the viscoelastic extension. The tick does not
/// run a spring pass; these are reserved for hosts that add one.
pub const SPRING_STIFFNESS: f32 = 0.3;
pub const SPRING_YIELD: f32 = 0.1;
pub const SPRING_PLASTICITY: f32 = 0.3;

/// Relaxation-based fluid simulation in the unit square, y-up.
pub struct RelaxSimulation {
    /// Particle positions in `[0,1]²`. Public for host rendering.
    pub positions: Vec<Vec2>,
    /// Particle velocities, reconstructed from the position delta each tick.
    pub velocities: Vec<Vec2>,
    old_positions: Vec<Vec2>,

    // Linked-cell spatial hash: head index per bucket, next index per
    // particle, -1 terminated.
    cell_head: Vec<i32>,
    particle_next: Vec<i32>,
}

impl RelaxSimulation {
    /// Seed `count` particles near the top of the domain with a small
    /// random horizontal drift, using the default seed.
    pub fn new(count: usize) -> Self {
        Self::with_seed(count, DEFAULT_SEED)
    }

    /// Same as [`RelaxSimulation::new`] with an explicit seed, for
    /// reproducible runs.
    pub fn with_seed(count: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut sim = Self {
            positions: Vec::with_capacity(count),
            velocities: Vec::with_capacity(count),
            old_positions: vec![Vec2::ZERO; count],
            cell_head: vec![-1; HASH_RES * HASH_RES],
            particle_next: Vec::with_capacity(count),
        };

        for _ in 0..count {
            let pos = Vec2::new(rng.gen::<f32>(), 1.0 - rng.gen::<f32>() * SPAWN_BAND);
            let vel = Vec2::new((rng.gen::<f32>() * 2.0 - 1.0) * SPAWN_DRIFT, 0.0);
            sim.positions.push(pos);
            sim.velocities.push(vel);
        }
        sim.build_spatial_hash();

        log::info!("relaxation simulation: {count} particles");
        sim
    }

    /// Number of live particles.
    #[inline]
    pub fn particle_count(&self) -> usize {
        self.positions.len()
    }

    /// Remove every particle. The only form of particle removal.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.old_positions.clear();
        self.velocities.clear();
        self.particle_next.clear();
        self.cell_head.fill(-1);
    }

    /// Run one simulation tick of length `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let count = self.positions.len();

        // 1. Gravity
        for vel in &mut self.velocities {
            vel.y += dt * GRAVITY;
        }

        // 2. Pairwise viscosity impulses. Every pair is visited from both
        // sides, so each visit applies half the impulse.
        for i in 0..count {
            let (bx, by) = bucket_of(self.positions[i]);
            for dy in -1..=1i32 {
                for dx in -1..=1i32 {
                    let nx = bx + dx;
                    let ny = by + dy;
                    if nx < 0 || ny < 0 || nx >= HASH_RES as i32 || ny >= HASH_RES as i32 {
                        continue;
                    }
                    let mut j = self.cell_head[ny as usize * HASH_RES + nx as usize];
                    while j >= 0 {
                        let ji = j as usize;
                        if ji != i {
                            let r_vec = self.positions[ji] - self.positions[i];
                            let r2 = r_vec.length_squared();
                            if r2 < NEAR_DISTANCE * NEAR_DISTANCE {
                                let r = r2.sqrt().max(MIN_SEPARATION);
                                let q = r / NEAR_DISTANCE;
                                let dir = r_vec / r;

                                // Approach speed along the separation axis
                                let u = (self.velocities[i] - self.velocities[ji]).dot(dir);
                                if u > 0.0 {
                                    let impulse = dir
                                        * (dt
                                            * (1.0 - q)
                                            * (VISCOSITY_SIGMA * u + VISCOSITY_BETA * u * u)
                                            * 0.5);
                                    self.velocities[i] -= impulse;
                                    self.velocities[ji] += impulse;
                                }
                            }
                        }
                        j = self.particle_next[ji];
                    }
                }
            }
        }

        // 3. Predict positions
        self.old_positions.copy_from_slice(&self.positions);
        for i in 0..count {
            let vel = self.velocities[i];
            self.positions[i] += vel * dt;
        }

        // 4. Double-density relaxation, one pass. Neighbor displacements
        // apply immediately; the particle's own correction is the negated
        // sum, which conserves momentum.
        for i in 0..count {
            let pos_i = self.positions[i];
            let (bx, by) = bucket_of(pos_i);

            let mut p_sum = 0.0;
            let mut p_near = 0.0;
            for dy in -1..=1i32 {
                for dx in -1..=1i32 {
                    let nx = bx + dx;
                    let ny = by + dy;
                    if nx < 0 || ny < 0 || nx >= HASH_RES as i32 || ny >= HASH_RES as i32 {
                        continue;
                    }
                    let mut j = self.cell_head[ny as usize * HASH_RES + nx as usize];
                    while j >= 0 {
                        let ji = j as usize;
                        if ji != i {
                            let r2 = (self.positions[ji] - pos_i).length_squared();
                            if r2 < NEAR_DISTANCE * NEAR_DISTANCE {
                                let q = r2.sqrt() / NEAR_DISTANCE;
                                p_sum += (1.0 - q) * (1.0 - q);
                                p_near += (1.0 - q) * (1.0 - q) * (1.0 - q);
                            }
                        }
                        j = self.particle_next[ji];
                    }
                }
            }

            let pressure = STIFFNESS * (p_sum - REST_DENSITY);
            let pressure_near = STIFFNESS_NEAR * p_near;

            let mut shift = Vec2::ZERO;
            for dy in -1..=1i32 {
                for dx in -1..=1i32 {
                    let nx = bx + dx;
                    let ny = by + dy;
                    if nx < 0 || ny < 0 || nx >= HASH_RES as i32 || ny >= HASH_RES as i32 {
                        continue;
                    }
                    let mut j = self.cell_head[ny as usize * HASH_RES + nx as usize];
                    while j >= 0 {
                        let ji = j as usize;
                        if ji != i {
                            let r_vec = self.positions[ji] - pos_i;
                            let r2 = r_vec.length_squared();
                            if r2 < NEAR_DISTANCE * NEAR_DISTANCE {
                                let r = r2.sqrt().max(MIN_SEPARATION);
                                let q = r / NEAR_DISTANCE;
                                let dir = r_vec / r;

                                let displace = dir
                                    * (dt
                                        * dt
                                        * (pressure * (1.0 - q)
                                            + pressure_near * (1.0 - q) * (1.0 - q))
                                        * 0.5);
                                self.positions[ji] += displace;
                                shift += displace;
                            }
                        }
                        j = self.particle_next[ji];
                    }
                }
            }
            self.positions[i] -= shift;
        }

        // 5. Rebuild the hash from the relaxed positions
        self.build_spatial_hash();

        // 6. Velocity from position delta
        for i in 0..count {
            self.velocities[i] = (self.positions[i] - self.old_positions[i]) / dt;
        }

        // 7. Wall collisions, swept per axis
        for i in 0..count {
            self.collide_axis(i, dt, Axis::X);
            self.collide_axis(i, dt, Axis::Y);
            // Containment guard for degenerate trajectories the sweep
            // cannot resolve (zero velocity outside the domain).
            self.positions[i] = self.positions[i].clamp(Vec2::ZERO, Vec2::ONE);
        }
    }

    /// Reflect particle `i` off the domain wall it crossed on `axis`,
    /// reconstructing the post-impact position from the time of impact.
    fn collide_axis(&mut self, i: usize, dt: f32, axis: Axis) {
        let pos = self.positions[i];
        let coord = match axis {
            Axis::X => pos.x,
            Axis::Y => pos.y,
        };
        if (0.0..=1.0).contains(&coord) {
            return;
        }

        let old = self.old_positions[i];
        let mut vel = self.velocities[i];
        let wall = if coord < 0.0 { 0.0 } else { 1.0 };

        let along = match axis {
            Axis::X => vel.x,
            Axis::Y => vel.y,
        };
        if along == 0.0 {
            return;
        }

        let origin = match axis {
            Axis::X => old.x,
            Axis::Y => old.y,
        };
        let col_dt = ((wall - origin) / along).clamp(0.0, dt);
        let impact = old + vel * col_dt;

        match axis {
            Axis::X => {
                vel.x = -vel.x * RESTITUTION;
                vel.y *= WALL_FRICTION;
            }
            Axis::Y => {
                vel.y = -vel.y * RESTITUTION;
                vel.x *= WALL_FRICTION;
            }
        }

        self.positions[i] = impact + vel * (dt - col_dt);
        self.velocities[i] = vel;
    }

    /// Kick particles near `point` away from it, with inverse-square
    /// falloff. Interactive forcing, not part of the physical model.
    pub fn add_mouse_puff(&mut self, point: Vec2) {
        let (bx, by) = bucket_of(point);
        for dy in -1..=1i32 {
            for dx in -1..=1i32 {
                let nx = bx + dx;
                let ny = by + dy;
                if nx < 0 || ny < 0 || nx >= HASH_RES as i32 || ny >= HASH_RES as i32 {
                    continue;
                }
                let mut j = self.cell_head[ny as usize * HASH_RES + nx as usize];
                while j >= 0 {
                    let ji = j as usize;
                    let dir = self.positions[ji] - point;
                    let d2 = dir.length_squared().max(MIN_SEPARATION * MIN_SEPARATION);
                    let d = d2.sqrt();
                    self.velocities[ji] += (dir / d) * (PUFF_STRENGTH / d2);
                    j = self.particle_next[ji];
                }
            }
        }
    }

    /// Rebuild the linked-cell lists from current positions. No incremental
    /// maintenance; the whole hash is rebuilt every tick.
    fn build_spatial_hash(&mut self) {
        self.cell_head.fill(-1);
        self.particle_next.clear();
        self.particle_next.resize(self.positions.len(), -1);

        for (i, pos) in self.positions.iter().enumerate() {
            let (bx, by) = bucket_of(*pos);
            let cell = by as usize * HASH_RES + bx as usize;
            self.particle_next[i] = self.cell_head[cell];
            self.cell_head[cell] = i as i32;
        }
    }
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

/// Bucket coordinates for a position, clamped into the hash.
#[inline]
fn bucket_of(pos: Vec2) -> (i32, i32) {
    let bx = ((pos.x * HASH_RES as f32) as i32).clamp(0, HASH_RES as i32 - 1);
    let by = ((pos.y * HASH_RES as f32) as i32).clamp(0, HASH_RES as i32 - 1);
    (bx, by)
}
