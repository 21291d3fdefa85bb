//! Sphere test function

use ndarray::Array1;

/// Sphere function - unimodal, separable
/// Global minimum: f(x) = 0 at x = (0, 0, ..., 0)
pub fn sphere(x: &Array1<f64>) -> f64 {
    x.dot(x)
}
