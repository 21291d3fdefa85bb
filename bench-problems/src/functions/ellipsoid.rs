//! Separable ellipsoid test function

use ndarray::Array1;

/// Conditioning between the first and the last coordinate.
const CONDITION: f64 = 1e6;

/// Ellipsoid function - unimodal, separable, ill-conditioned
/// Global minimum: f(x) = 0 at x = (0, 0, ..., 0)
///
/// Coordinate `i` is weighted by `CONDITION^(i / (n - 1))`.
pub fn ellipsoid(x: &Array1<f64>) -> f64 {
    let n = x.len();
    if n == 1 {
        return x[0].powi(2);
    }
    x.iter()
        .enumerate()
        .map(|(i, &xi)| CONDITION.powf(i as f64 / (n - 1) as f64) * xi.powi(2))
        .sum()
}
