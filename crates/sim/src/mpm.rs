//! Multi-species grid fluid engine.
//!
//! Each tick moves particle state through a shared grid:
//! 1. Zero the shared grid and every species' private grid
//! 2. Scatter particle mass and momentum to the shared grid (3×3 quadratic
//!    stencil)
//! 3. Normalize grid velocity by mass
//! 4. Per-particle force pass: EOS pressure, viscosity, boundary push from
//!    the distance field; scattered back as grid force
//! 5. Normalize grid acceleration by mass
//! 6. Velocity pass: gather acceleration, gravity, boundary nudge at the
//!    predicted position, scatter into the species-private grid
//! 7. Advect: gather private-grid velocity, move, PIC/FLIP blend, resolve
//!    collisions, clamp to the interior
//!
//! Later phases read state normalized by earlier ones, so the order is
//! load-bearing. Species only meet through the shared grid.

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::distance_field::DistanceField;
use crate::grid::{stencil_anchor, CellWeight, GridCell};
use crate::particle::Fluid;
use crate::physics::{GRAVITY, GRAVITY_TIME_SCALE, SDF_RESOLUTION};

/// Distance (in cells) under which the force pass starts pushing particles
/// away from collision geometry.
const PUSH_BAND: f32 = 3.0;

/// Seed used by [`MpmSimulation::new`]; pick your own with `with_seed`.
const DEFAULT_SEED: u64 = 0x5d15_7a9c;

/// Shared-grid fluid simulation over a signed-distance collision field.
pub struct MpmSimulation {
    pub grid_width: usize,
    pub grid_height: usize,
    /// World units per grid cell.
    pub scale: f32,

    /// Per-tick acceleration applied to every particle, grid units.
    pub gravity: Vec2,
    /// PIC/FLIP mix: 1 = take grid velocity, 0 = keep particle velocity.
    pub grid_coeff: f32,

    /// Fluid species sharing this domain.
    pub fluids: Vec<Fluid>,
    /// Collision geometry, sampled read-only during `update`.
    pub sdf: DistanceField,

    /// Shared transfer grid, rebuilt every tick. Readable between ticks for
    /// diagnostics; contents are ephemeral.
    pub cells: Vec<GridCell>,
    rng: ChaCha8Rng,
}

impl MpmSimulation {
    /// Build a simulation covering `width × height` world units at
    /// `scale` units per cell, with the default jitter seed.
    ///
    /// The collision field starts as a solid block with the tank interior
    /// carved out and smoothed; shapes can be added/carved afterwards
    /// through [`MpmSimulation::sdf`].
    pub fn new(width: f32, height: f32, scale: f32) -> Self {
        Self::with_seed(width, height, scale, DEFAULT_SEED)
    }

    /// Same as [`MpmSimulation::new`] with an explicit seed for the
    /// boundary-nudge jitter, for reproducible runs.
    pub fn with_seed(width: f32, height: f32, scale: f32, seed: u64) -> Self {
        let grid_width = (width / scale) as usize + 1;
        let grid_height = (height / scale) as usize + 1;

        let mut sdf = DistanceField::new(SDF_RESOLUTION, grid_width as f32, grid_height as f32);
        sdf.sub_rect(2.0, 2.0, grid_width as f32 - 4.0, grid_height as f32 - 4.0);
        sdf.blur();

        log::info!(
            "grid fluid simulation: {grid_width}x{grid_height} cells, scale {scale}"
        );

        Self {
            grid_width,
            grid_height,
            scale,
            gravity: Vec2::new(0.0, (GRAVITY / scale) * GRAVITY_TIME_SCALE),
            grid_coeff: 1.0,
            fluids: Vec::new(),
            sdf,
            cells: vec![GridCell::default(); grid_width * grid_height],
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Register a species and return its index.
    pub fn add_fluid(&mut self, fluid: Fluid) -> usize {
        self.fluids.push(fluid);
        self.fluids.len() - 1
    }

    /// Total particles across all species.
    pub fn particle_count(&self) -> usize {
        self.fluids.iter().map(|f| f.particle_count()).sum()
    }

    /// Remove every particle from every species.
    pub fn clear_particles(&mut self) {
        for fluid in &mut self.fluids {
            fluid.clear();
        }
    }

    /// Run one simulation tick.
    pub fn update(&mut self) {
        // 1. Clear all grid cells
        self.cells.fill(GridCell::default());
        for fluid in &mut self.fluids {
            fluid.grid.fill(GridCell::default());
        }

        // 2. Scatter particle mass and momentum
        for fi in 0..self.fluids.len() {
            self.init_grid(fi);
        }

        // 3. Average grid velocity (zero-mass cells contribute nothing)
        for cell in &mut self.cells {
            if cell.mass == 0.0 {
                continue;
            }
            cell.vx /= cell.mass;
            cell.vy /= cell.mass;
        }

        // 4. Particle forces, scattered back to the grid
        for fi in 0..self.fluids.len() {
            self.calc_accel(fi);
        }

        // 5. Average grid acceleration
        for cell in &mut self.cells {
            if cell.mass == 0.0 {
                continue;
            }
            cell.ax /= cell.mass;
            cell.ay /= cell.mass;
        }

        // 6/7. Velocity update and advection per species
        for fi in 0..self.fluids.len() {
            self.calc_velocity(fi);
            self.update_particles(fi);
        }
    }

    /// Scatter one species' mass and momentum into the shared grid and
    /// cache its stencil weights for the rest of the tick.
    fn init_grid(&mut self, fi: usize) {
        let (gw, gh) = (self.grid_width, self.grid_height);
        let Self { fluids, cells, .. } = self;
        let fluid = &mut fluids[fi];

        for i in 0..fluid.particles.len() {
            let p = fluid.particles[i];
            let cx = stencil_anchor(p.pos.x, gw);
            let cy = stencil_anchor(p.pos.y, gh);

            let weight = CellWeight::from_offsets(cx as f32 - p.pos.x, cy as f32 - p.pos.y);
            fluid.weights[i] = weight;

            for y in 0..3 {
                for x in 0..3 {
                    let w = weight.wy[y] * weight.wx[x];
                    let cell = &mut cells[(cy + y) * gw + cx + x];
                    cell.mass += w;
                    cell.vx += p.vel.x * w;
                    cell.vy += p.vel.y * w;
                }
            }
        }
    }

    /// Force pass for one species: interpolate the velocity gradient and
    /// local mass at each particle, derive pressure and viscosity forces
    /// plus the near-boundary push, and scatter them to the shared grid.
    fn calc_accel(&mut self, fi: usize) {
        let (gw, gh) = (self.grid_width, self.grid_height);
        let Self {
            fluids, cells, sdf, ..
        } = self;
        let fluid = &fluids[fi];

        for i in 0..fluid.particles.len() {
            let pos = fluid.particles[i].pos;
            let cx = stencil_anchor(pos.x, gw);
            let cy = stencil_anchor(pos.y, gh);
            let weight = fluid.weights[i];

            // Interpolated mass and velocity derivatives at the particle
            let mut dudx = 0.0;
            let mut dudy = 0.0;
            let mut dvdx = 0.0;
            let mut dvdy = 0.0;
            let mut mass = 0.0;
            for y in 0..3 {
                for x in 0..3 {
                    let w = weight.wx[x] * weight.wy[y];
                    let dx = weight.gx[x] * weight.wy[y];
                    let dy = weight.wx[x] * weight.gy[y];

                    let cell = &cells[(cy + y) * gw + cx + x];
                    dudx += cell.vx * dx;
                    dudy += cell.vx * dy;
                    dvdx += cell.vy * dx;
                    dvdy += cell.vy * dy;
                    mass += cell.mass * w;
                }
            }

            // Weakly-compressible equation of state
            let pressure =
                (fluid.stiffness / fluid.density.max(1.0)) * (mass - fluid.density);

            // Push away from collision geometry inside the boundary band
            let mut acc = Vec2::ZERO;
            let d = sdf.sample(pos);
            if d < PUSH_BAND {
                acc += sdf.sample_gradient(pos) * (1.0 - d / PUSH_BAND);
            }

            for y in 0..3 {
                for x in 0..3 {
                    let w = weight.wx[x] * weight.wy[y];
                    let dx = weight.gx[x] * weight.wy[y];
                    let dy = weight.wx[x] * weight.gy[y];

                    let cell = &mut cells[(cy + y) * gw + cx + x];
                    cell.ax +=
                        acc.x * w - dx * pressure - (dudx * dx + dudy * dy) * fluid.viscosity * w;
                    cell.ay +=
                        acc.y * w - dy * pressure - (dvdx * dx + dvdy * dy) * fluid.viscosity * w;
                }
            }
        }
    }

    /// Velocity pass for one species: gather grid acceleration, apply
    /// gravity, nudge particles whose predicted position is about to cross
    /// the boundary, and scatter corrected velocities into the species'
    /// private grid.
    fn calc_velocity(&mut self, fi: usize) {
        let (gw, gh) = (self.grid_width, self.grid_height);
        let gravity = self.gravity;
        let Self {
            fluids,
            cells,
            sdf,
            rng,
            ..
        } = self;
        let fluid = &mut fluids[fi];

        for i in 0..fluid.particles.len() {
            let weight = fluid.weights[i];
            let p = &mut fluid.particles[i];
            let cx = stencil_anchor(p.pos.x, gw);
            let cy = stencil_anchor(p.pos.y, gh);

            for y in 0..3 {
                for x in 0..3 {
                    let w = weight.wx[x] * weight.wy[y];
                    let cell = &cells[(cy + y) * gw + cx + x];
                    p.vel.x += w * cell.ax;
                    p.vel.y += w * cell.ay;
                }
            }

            p.vel += gravity;

            // Steer away from geometry the particle is about to enter.
            // The jitter keeps stacked particles from locking into the
            // same correction.
            let predicted = p.pos + p.vel;
            let d = sdf.sample(predicted);
            if d < 1.0 {
                let dir = sdf.sample_gradient(predicted);
                p.vel.x += dir.x * (1.0 - d) * (1.0 + rng.gen::<f32>() * 0.01);
                p.vel.y += dir.y * (1.0 - d) * (1.0 + rng.gen::<f32>() * 0.01);
            }

            for y in 0..3 {
                for x in 0..3 {
                    let w = weight.wx[x] * weight.wy[y];
                    let cell = &mut fluid.grid[(cy + y) * gw + cx + x];
                    cell.mass += w;
                    cell.vx += w * p.vel.x;
                    cell.vy += w * p.vel.y;
                }
            }
        }

        // Average the species-private velocity grid
        for cell in &mut fluid.grid {
            if cell.mass == 0.0 {
                continue;
            }
            cell.vx /= cell.mass;
            cell.vy /= cell.mass;
        }
    }

    /// Advection pass for one species: gather the private-grid velocity at
    /// the pre-move stencil, advance, blend particle velocity toward the
    /// grid, resolve boundary penetration, and clamp to the interior.
    fn update_particles(&mut self, fi: usize) {
        let (gw, gh) = (self.grid_width, self.grid_height);
        let grid_coeff = self.grid_coeff;
        let Self { fluids, sdf, .. } = self;
        let fluid = &mut fluids[fi];

        for i in 0..fluid.particles.len() {
            let weight = fluid.weights[i];
            let p = &mut fluid.particles[i];
            let cx = stencil_anchor(p.pos.x, gw);
            let cy = stencil_anchor(p.pos.y, gh);

            let mut grid_vel = Vec2::ZERO;
            for y in 0..3 {
                for x in 0..3 {
                    let w = weight.wx[x] * weight.wy[y];
                    let cell = &fluid.grid[(cy + y) * gw + cx + x];
                    grid_vel.x += w * cell.vx;
                    grid_vel.y += w * cell.vy;
                }
            }

            p.pos += grid_vel;
            p.vel += grid_coeff * (grid_vel - p.vel);

            // Step out of any geometry the move landed in
            let mut pos = p.pos;
            let d = sdf.sample(pos);
            if d < 0.0 {
                pos -= sdf.sample_gradient(pos);
            }

            pos.x = pos.x.clamp(1.0, gw as f32 - 2.0);
            pos.y = pos.y.clamp(1.0, gh as f32 - 2.0);
            p.pos = pos;
        }
    }
}
