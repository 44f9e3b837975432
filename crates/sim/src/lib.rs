//! Interactive 2D fluid simulation library.
//!
//! Three independent pieces:
//! - Signed distance field for collision geometry (chamfer-propagated,
//!   editable with boolean circle/rect stamps)
//! - Multi-species grid fluid solver (particle↔grid transfer with quadratic
//!   B-spline weights, pressure + viscosity + boundary forces)
//! - Single-species relaxation fluid solver (spatial hash, double-density
//!   position relaxation, swept wall collisions)
//!
//! This crate is host-agnostic: it handles simulation only. Rendering,
//! input translation, and command parsing belong to the embedding
//! application, which drives everything through the public types below.
//!
//! All randomness is owned by the simulation values and seeded explicitly,
//! so runs with equal seeds and inputs are reproducible.

pub mod distance_field;
pub mod grid;
pub mod mpm;
pub mod particle;
pub mod physics;
pub mod relax;

pub use distance_field::DistanceField;
pub use grid::{CellWeight, GridCell};
pub use mpm::MpmSimulation;
pub use particle::{Fluid, Particle};
pub use relax::RelaxSimulation;
