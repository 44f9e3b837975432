//! Shared physics constants for the grid fluid engine.
//!
//! Modules use these instead of defining their own copies, so the
//! host-facing units stay consistent when tuning.

/// Standard gravity in world units/s².
pub const GRAVITY: f32 = 9.81;

/// Converts gravity from per-second² to per-tick² units.
///
/// The reference host steps the grid engine at a fixed 30 Hz with velocities
/// expressed in grid cells per tick, so accelerations carry a (1/30)² factor.
pub const GRAVITY_TIME_SCALE: f32 = 1.0 / 900.0;

/// Interior resolution of the collision distance field.
///
/// Fixed for every simulation regardless of grid size; the field covers the
/// grid extent in cell units.
pub const SDF_RESOLUTION: usize = 256;
