//! Seeded per-instance transformations.
//!
//! Instance 1 is the untransformed function. Every other instance shifts the
//! optimum inside the search box and applies a positive affine map to the
//! objective value, both drawn from an RNG seeded by (function, instance), so
//! an instance is the same problem on every machine and in every run.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Largest absolute shift of any optimum coordinate.
pub const MAX_SHIFT: f64 = 3.0;

/// Affine transformation of variables and objective of one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceTransform {
    shift: Array1<f64>,
    scale: f64,
    offset: f64,
}

fn instance_seed(function: usize, instance: usize) -> u64 {
    (function as u64).wrapping_mul(1_000_003) ^ (instance as u64).wrapping_mul(7_919)
}

impl InstanceTransform {
    /// The untransformed problem.
    pub fn identity(dimension: usize) -> Self {
        Self {
            shift: Array1::zeros(dimension),
            scale: 1.0,
            offset: 0.0,
        }
    }

    /// Transformation of `instance` of `function` in `dimension`.
    pub fn for_instance(function: usize, dimension: usize, instance: usize) -> Self {
        if instance <= 1 {
            return Self::identity(dimension);
        }
        let mut rng = StdRng::seed_from_u64(instance_seed(function, instance));
        let shift = Array1::from_shape_fn(dimension, |_| rng.random_range(-MAX_SHIFT..MAX_SHIFT));
        let scale = 10f64.powf(rng.random_range(-1.0..1.0));
        let offset = (rng.random_range(-1000.0..1000.0f64) * 100.0).round() / 100.0;
        Self {
            shift,
            scale,
            offset,
        }
    }

    /// Location of the untransformed optimum in the search space.
    pub fn shift(&self) -> &Array1<f64> {
        &self.shift
    }

    /// Multiplicative factor of the objective.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Additive offset of the objective, the transformed optimal value.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Map a candidate to the function's own coordinates.
    pub fn variables(&self, x: &Array1<f64>) -> Array1<f64> {
        x - &self.shift
    }

    /// Map a raw objective value to the transformed one.
    pub fn objective(&self, raw: f64) -> f64 {
        self.scale * raw + self.offset
    }
}
