//! Signed distance field for collision geometry.
//!
//! The field is built from two seed grids: `filled` holds the distance to
//! the nearest solid seed, `empty` the distance to the nearest carved seed.
//! Shape edits overwrite seeds (last writer wins per cell), and every edit
//! runs a full chamfer repropagation over both grids. The combined field
//! `values = filled - empty` is negative inside solids and positive outside.
//!
//! Repropagation is a full O(resolution²) pass per edit. Fields are edited a
//! handful of times per scene, so incremental updates are not worth the
//! bookkeeping.
//!
//! ORDERING HAZARD: `blur()` smooths `values` directly and leaves the
//! filled/empty seeds untouched. Any edit after a blur repropagates from the
//! seeds and silently discards the blur, so blur must come last.

use glam::Vec2;

const SQRT2: f32 = std::f32::consts::SQRT_2;

/// Seed value for a cell on the shape being measured (distance zero).
const SEED: f32 = 0.0;
/// Sentinel for a cell far from the shape; propagation pulls it down.
const FAR: f32 = 10_000.0;

/// Chamfer-propagated signed distance field over a square grid with a
/// 1-cell clamp border.
pub struct DistanceField {
    /// Combined signed distance, `filled - empty`. Valid immediately after
    /// `propagate()`; `blur()` mutates it in place.
    values: Vec<f32>,
    /// Distance to the nearest filled (solid) seed.
    filled: Vec<f32>,
    /// Distance to the nearest empty (carved) seed.
    empty: Vec<f32>,

    width: f32,
    height: f32,
    resolution: usize,
    /// `resolution + 2`: interior plus the border cells.
    internal_res: usize,
}

impl DistanceField {
    /// Build a field of `resolution²` interior cells covering a
    /// `width × height` region. The whole domain starts solid.
    pub fn new(resolution: usize, width: f32, height: f32) -> Self {
        let internal_res = resolution + 2;
        let count = internal_res * internal_res;

        let mut field = Self {
            values: vec![0.0; count],
            filled: vec![SEED; count],
            empty: vec![FAR; count],
            width,
            height,
            resolution,
            internal_res,
        };
        field.propagate();
        field
    }

    /// Interior resolution the field was created with.
    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Mark every cell within `r` of `(x, y)` (world units) as solid,
    /// then repropagate.
    pub fn add_circle(&mut self, x: f32, y: f32, r: f32) {
        self.stamp_circle(x, y, r, SEED, FAR);
    }

    /// Carve every cell within `r` of `(x, y)` out of the solid,
    /// then repropagate.
    pub fn sub_circle(&mut self, x: f32, y: f32, r: f32) {
        self.stamp_circle(x, y, r, FAR, SEED);
    }

    fn stamp_circle(&mut self, x: f32, y: f32, r: f32, filled: f32, empty: f32) {
        for iy in 0..self.resolution {
            let fy = (iy as f32 / self.resolution as f32) * self.height;
            for ix in 0..self.resolution {
                let fx = (ix as f32 / self.resolution as f32) * self.width;

                let d = Vec2::new(fx - x, fy - y).length() - r;
                if d < 0.0 {
                    let i = (iy + 1) * self.internal_res + ix + 1;
                    self.filled[i] = filled;
                    self.empty[i] = empty;
                }
            }
        }

        self.propagate();
    }

    /// Carve an axis-aligned rectangle (strict interior test, boundary
    /// excluded), then repropagate.
    pub fn sub_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        for iy in 0..self.resolution {
            let fy = (iy as f32 / self.resolution as f32) * self.height;
            for ix in 0..self.resolution {
                let fx = (ix as f32 / self.resolution as f32) * self.width;

                if fx > x && fx < x + w && fy > y && fy < y + h {
                    let i = (iy + 1) * self.internal_res + ix + 1;
                    self.filled[i] = FAR;
                    self.empty[i] = SEED;
                }
            }
        }

        self.propagate();
    }

    /// Signed distance at an interior cell, in world units.
    /// Coordinates clamp to the field edge.
    #[inline]
    pub fn sample_cell(&self, x: i32, y: i32) -> f32 {
        let n = self.internal_res as i32;
        let x = (x + 1).clamp(0, n - 1) as usize;
        let y = (y + 1).clamp(0, n - 1) as usize;

        self.values[y * self.internal_res + x] * (self.width / self.resolution as f32)
    }

    /// Signed distance at a world-space position.
    #[inline]
    pub fn sample(&self, pos: Vec2) -> f32 {
        self.sample_normalized(Vec2::new(pos.x / self.width, pos.y / self.height))
    }

    /// Signed distance at a normalized `[0,1]²` position, bilinearly
    /// interpolated. The integer sampler clamps to the edge, so
    /// extrapolation beyond the domain is constant.
    pub fn sample_normalized(&self, uv: Vec2) -> f32 {
        let x = uv.x * self.resolution as f32;
        let y = uv.y * self.resolution as f32;
        let ix = x as i32;
        let iy = y as i32;
        let dx = x - ix as f32;
        let dy = y - iy as f32;

        let d0 = self.sample_cell(ix, iy);
        let d1 = self.sample_cell(ix + 1, iy);
        let d2 = self.sample_cell(ix, iy + 1);
        let d3 = self.sample_cell(ix + 1, iy + 1);

        let top = d0 * (1.0 - dx) + d1 * dx;
        let bottom = d2 * (1.0 - dx) + d3 * dx;
        top * (1.0 - dy) + bottom * dy
    }

    /// Central-difference gradient at a world-space position, sampled half a
    /// cell out along each axis. Not normalized.
    pub fn sample_gradient(&self, pos: Vec2) -> Vec2 {
        let half = 0.5 / self.resolution as f32;

        let d0 = self.sample(Vec2::new(pos.x, pos.y - half));
        let d1 = self.sample(Vec2::new(pos.x - half, pos.y));
        let d2 = self.sample(Vec2::new(pos.x + half, pos.y));
        let d3 = self.sample(Vec2::new(pos.x, pos.y + half));

        Vec2::new(d2 - d1, d3 - d0) * self.resolution as f32
    }

    /// Normalized gradient plus its pre-normalization magnitude.
    ///
    /// The magnitude is a field-quality signal: ≈1 where the chamfer
    /// approximation is healthy. A degenerate (flat) field yields a zero
    /// normal and zero magnitude.
    pub fn sample_normal(&self, pos: Vec2) -> (Vec2, f32) {
        let grad = self.sample_gradient(pos);
        let len = grad.length();
        if len > 0.0 {
            (grad / len, len)
        } else {
            (Vec2::ZERO, 0.0)
        }
    }

    /// Recompute both distance transforms from their seeds and refresh the
    /// combined field.
    ///
    /// Two passes per field: forward (top-left to bottom-right) against the
    /// {NW, N, NE, W} mask, then the reverse scan against the mirrored mask,
    /// with weight 1 for axis neighbors and √2 for diagonals. Each cell
    /// keeps the minimum of the propagated neighbors and its own value.
    pub fn propagate(&mut self) {
        chamfer_sweeps(&mut self.filled, self.internal_res);
        chamfer_sweeps(&mut self.empty, self.internal_res);

        for i in 0..self.values.len() {
            self.values[i] = self.filled[i] - self.empty[i];
        }

        log::trace!(
            "distance field repropagated ({}x{} cells)",
            self.internal_res,
            self.internal_res
        );
    }

    /// Smooth the combined field with two in-place separable passes of a
    /// 5-tap [2,4,8,4,2]/20 kernel (x then y), clamping at the borders.
    ///
    /// This touches only `values`: the filled/empty seeds are left stale, so
    /// a later edit (which repropagates) discards the smoothing. Call blur
    /// after the final edit of a scene.
    pub fn blur(&mut self) {
        let n = self.internal_res;

        for y in 0..n {
            for x in 0..n {
                let x = x as i32;
                let y = y as i32;
                let sum = clamped(&self.values, n, x - 2, y) * 2.0
                    + clamped(&self.values, n, x - 1, y) * 4.0
                    + clamped(&self.values, n, x, y) * 8.0
                    + clamped(&self.values, n, x + 1, y) * 4.0
                    + clamped(&self.values, n, x + 2, y) * 2.0;

                self.values[y as usize * n + x as usize] = sum / 20.0;
            }
        }

        for y in 0..n {
            for x in 0..n {
                let x = x as i32;
                let y = y as i32;
                let sum = clamped(&self.values, n, x, y - 2) * 2.0
                    + clamped(&self.values, n, x, y - 1) * 4.0
                    + clamped(&self.values, n, x, y) * 8.0
                    + clamped(&self.values, n, x, y + 1) * 4.0
                    + clamped(&self.values, n, x, y + 2) * 2.0;

                self.values[y as usize * n + x as usize] = sum / 20.0;
            }
        }
    }
}

/// Clamp-to-edge read from a square field of side `n`.
#[inline]
fn clamped(field: &[f32], n: usize, x: i32, y: i32) -> f32 {
    let x = x.clamp(0, n as i32 - 1) as usize;
    let y = y.clamp(0, n as i32 - 1) as usize;
    field[y * n + x]
}

/// One full chamfer distance transform: forward and backward sweeps over a
/// square field of side `n`, in place.
fn chamfer_sweeps(field: &mut [f32], n: usize) {
    let ni = n as i32;

    for y in 0..ni {
        for x in 0..ni {
            let mut d = clamped(field, n, x - 1, y - 1) + SQRT2;
            d = d.min(clamped(field, n, x, y - 1) + 1.0);
            d = d.min(clamped(field, n, x + 1, y - 1) + SQRT2);
            d = d.min(clamped(field, n, x - 1, y) + 1.0);
            d = d.min(clamped(field, n, x, y));
            field[y as usize * n + x as usize] = d;
        }
    }

    for y in (0..ni).rev() {
        for x in (0..ni).rev() {
            let mut d = clamped(field, n, x - 1, y + 1) + SQRT2;
            d = d.min(clamped(field, n, x, y + 1) + 1.0);
            d = d.min(clamped(field, n, x + 1, y + 1) + SQRT2);
            d = d.min(clamped(field, n, x + 1, y) + 1.0);
            d = d.min(clamped(field, n, x, y));
            field[y as usize * n + x as usize] = d;
        }
    }
}
