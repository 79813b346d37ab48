//! Per-frame charge motion with elastic reflection at the domain walls.

use crate::charge::ChargeArrays;

/// Rectangular domain `[0, width] x [0, height]` the charges bounce inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    /// Extent along x (pixels).
    pub width: f32,
    /// Extent along y (pixels).
    pub height: f32,
}

impl Domain {
    /// Create a domain of the given extent.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn extent(&self, axis: usize) -> f32 {
        if axis == 0 {
            self.width
        } else {
            self.height
        }
    }
}

/// Advance every charge by `velocity * dt` and reflect at the walls.
///
/// Axes are handled independently. When a coordinate leaves `[0, extent]`,
/// its velocity component is negated and the position is moved by
/// `2 * dt * v_new`. The overshoot is mirrored with the post-flip velocity
/// instead of solving for the exact crossing point, so with a large `dt` a
/// charge can sit slightly outside the wall for one frame before the next
/// step brings it back. No allocation; O(N).
pub fn step(charges: &mut ChargeArrays, domain: Domain, dt: f32) {
    let (positions, velocities) = charges.split_mut();
    for (p, v) in positions
        .chunks_exact_mut(2)
        .zip(velocities.chunks_exact_mut(2))
    {
        for axis in 0..2 {
            p[axis] += dt * v[axis];
            if p[axis] < 0.0 || p[axis] > domain.extent(axis) {
                v[axis] = -v[axis];
                p[axis] += 2.0 * dt * v[axis];
            }
        }
    }
}
