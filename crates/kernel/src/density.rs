//! Inverse-square density field, color mapping, and the CPU backend.
//!
//! For every pixel `(x, y)` the density is
//!
//! ```text
//! density = sum_i 1 / ((cx_i - x)^2 + (cy_i - y)^2)
//! ```
//!
//! with integer pixel coordinates. Densities above [`THRESHOLD`] are drawn in
//! [`INNER_COLOR`]; below it each channel is `min(255, FACTOR * density * BASE)`.

use rayon::prelude::*;

use crate::charge::ChargeArrays;
use crate::pixel::PixelBuffer;
use crate::{Backend, DensityEvaluator, RenderError};

/// Brightness gain applied before clamping a channel.
pub const FACTOR: f32 = 100.0;
/// Density above which a pixel is considered inside a ball.
pub const THRESHOLD: f32 = 0.008;
/// Glow color (R, G, B) scaled by density outside the balls.
pub const BASE_COLOR: [u8; 3] = [255, 51, 102];
/// Solid color (R, G, B) inside the balls.
pub const INNER_COLOR: [u8; 3] = [255, 255, 255];

/// Density at pixel `(x, y)` for interleaved `positions`.
///
/// A charge exactly on the pixel contributes `+inf`; the sum stays `+inf`
/// because every contribution is non-negative.
#[inline]
pub fn density_at(positions: &[f32], x: f32, y: f32) -> f32 {
    let mut density = 0.0_f32;
    for c in positions.chunks_exact(2) {
        let dx = c[0] - x;
        let dy = c[1] - y;
        density += 1.0 / (dx * dx + dy * dy);
    }
    density
}

/// Map a density to a color triple.
///
/// Anything not `<= THRESHOLD` selects [`INNER_COLOR`], which covers `+inf`
/// and NaN as well, so degenerate densities saturate instead of reaching the
/// channel arithmetic.
#[inline]
pub fn shade(density: f32) -> [u8; 3] {
    if !(density <= THRESHOLD) {
        return INNER_COLOR;
    }
    BASE_COLOR.map(|base| channel(density, base))
}

/// `min(255, FACTOR * density * base)`, truncated toward zero.
#[inline]
fn channel(density: f32, base: u8) -> u8 {
    (FACTOR * density * base as f32).min(255.0) as u8
}

/// Evaluate the whole field on the host, fanning rows out over the rayon pool.
///
/// Each row is a disjoint `&mut` slice of the output, and the charge
/// positions are shared read-only, so the rows need no synchronisation. The
/// call returns once every row is written.
pub fn render_cpu(charges: &ChargeArrays, out: &mut PixelBuffer) {
    let row_bytes = out.row_bytes();
    if row_bytes == 0 {
        return;
    }
    let positions = charges.positions();
    out.as_bytes_mut()
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            let fy = y as f32;
            for (x, px) in row.chunks_exact_mut(PixelBuffer::CHANNELS).enumerate() {
                px.copy_from_slice(&shade(density_at(positions, x as f32, fy)));
            }
        });
}

/// Host backend of [`DensityEvaluator`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuEvaluator;

impl CpuEvaluator {
    /// Create the CPU evaluator. It holds no state; work runs on rayon's
    /// global pool.
    pub fn new() -> Self {
        Self
    }
}

impl DensityEvaluator for CpuEvaluator {
    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    fn render(&mut self, charges: &ChargeArrays, out: &mut PixelBuffer) -> Result<(), RenderError> {
        render_cpu(charges, out);
        Ok(())
    }
}
