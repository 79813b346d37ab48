//! Charge storage using flat interleaved arrays for direct GPU upload.

use rand::Rng;

/// Error returned when addressing a charge beyond the fixed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityError {
    /// Number of charges the store was created with.
    pub capacity: usize,
    /// Index that was requested.
    pub index: usize,
}

impl std::fmt::Display for CapacityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "charge index {} out of range for capacity {}",
            self.index, self.capacity
        )
    }
}

impl std::error::Error for CapacityError {}

/// Fixed-capacity charge storage.
///
/// Positions and velocities are two parallel arrays of length `2 * n` with x
/// and y interleaved (`[x0, y0, x1, y1, ...]`). This is exactly the layout of
/// the storage buffer the GPU backend reads, so an upload is a plain byte copy.
/// Both arrays are boxed slices: the charge count is fixed at construction and
/// the storage is never reallocated.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeArrays {
    positions: Box<[f32]>,
    velocities: Box<[f32]>,
}

impl ChargeArrays {
    /// Create `n` charges at the origin with zero velocity.
    pub fn zeroed(n: usize) -> Self {
        Self {
            positions: vec![0.0; 2 * n].into_boxed_slice(),
            velocities: vec![0.0; 2 * n].into_boxed_slice(),
        }
    }

    /// Create `n` charges placed uniformly at random in `[0, width] x [0, height]`,
    /// each moving at `speed` in a uniformly random direction.
    pub fn seeded<R: Rng + ?Sized>(
        n: usize,
        width: f32,
        height: f32,
        speed: f32,
        rng: &mut R,
    ) -> Self {
        let mut charges = Self::zeroed(n);
        for i in 0..n {
            let x = rng.gen_range(0.0..=width);
            let y = rng.gen_range(0.0..=height);
            let theta = rng.gen_range(0.0..std::f64::consts::TAU);
            let vx = (speed as f64 * theta.cos()) as f32;
            let vy = (speed as f64 * theta.sin()) as f32;
            charges.positions[2 * i] = x;
            charges.positions[2 * i + 1] = y;
            charges.velocities[2 * i] = vx;
            charges.velocities[2 * i + 1] = vy;
        }
        charges
    }

    /// Number of charges.
    pub fn len(&self) -> usize {
        self.positions.len() / 2
    }

    /// Return `true` if the store holds no charges.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Interleaved positions `[x0, y0, x1, y1, ...]`.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Interleaved velocities `[vx0, vy0, vx1, vy1, ...]`.
    pub fn velocities(&self) -> &[f32] {
        &self.velocities
    }

    /// Mutable views of both arrays at once, for the stepper.
    pub(crate) fn split_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.positions, &mut self.velocities)
    }

    /// Position of charge `i`, or `None` past the capacity.
    pub fn position(&self, i: usize) -> Option<[f32; 2]> {
        (i < self.len()).then(|| [self.positions[2 * i], self.positions[2 * i + 1]])
    }

    /// Velocity of charge `i`, or `None` past the capacity.
    pub fn velocity(&self, i: usize) -> Option<[f32; 2]> {
        (i < self.len()).then(|| [self.velocities[2 * i], self.velocities[2 * i + 1]])
    }

    /// Overwrite the state of charge `i`.
    pub fn set(
        &mut self,
        i: usize,
        position: [f32; 2],
        velocity: [f32; 2],
    ) -> Result<(), CapacityError> {
        if i >= self.len() {
            return Err(CapacityError {
                capacity: self.len(),
                index: i,
            });
        }
        self.positions[2 * i..2 * i + 2].copy_from_slice(&position);
        self.velocities[2 * i..2 * i + 2].copy_from_slice(&velocity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn zeroed_has_fixed_length() {
        let charges = ChargeArrays::zeroed(5);
        assert_eq!(charges.len(), 5);
        assert!(!charges.is_empty());
        assert_eq!(charges.positions().len(), 10);
        assert_eq!(charges.velocities().len(), 10);
        assert!(ChargeArrays::zeroed(0).is_empty());
    }

    #[test]
    fn set_and_read_back() {
        let mut charges = ChargeArrays::zeroed(2);
        charges.set(1, [3.0, 4.0], [-1.0, 2.0]).unwrap();
        assert_eq!(charges.position(1), Some([3.0, 4.0]));
        assert_eq!(charges.velocity(1), Some([-1.0, 2.0]));
        assert_eq!(charges.positions(), &[0.0, 0.0, 3.0, 4.0]);
        assert_eq!(charges.position(2), None);
    }

    #[test]
    fn set_past_capacity_is_an_error() {
        let mut charges = ChargeArrays::zeroed(2);
        let err = charges.set(2, [0.0, 0.0], [0.0, 0.0]).unwrap_err();
        assert_eq!(err, CapacityError { capacity: 2, index: 2 });
    }

    #[test]
    fn seeded_charges_are_in_domain_at_fixed_speed() {
        let mut rng = StdRng::seed_from_u64(7);
        let charges = ChargeArrays::seeded(256, 1200.0, 800.0, 200.0, &mut rng);
        assert_eq!(charges.len(), 256);
        for i in 0..charges.len() {
            let [x, y] = charges.position(i).unwrap();
            assert!((0.0..=1200.0).contains(&x));
            assert!((0.0..=800.0).contains(&y));
            let [vx, vy] = charges.velocity(i).unwrap();
            let speed = (vx * vx + vy * vy).sqrt();
            assert!((speed - 200.0).abs() < 1e-2, "speed {speed}");
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let a = ChargeArrays::seeded(16, 100.0, 50.0, 10.0, &mut StdRng::seed_from_u64(42));
        let b = ChargeArrays::seeded(16, 100.0, 50.0, 10.0, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
