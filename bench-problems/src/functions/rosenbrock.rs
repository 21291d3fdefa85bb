//! Rosenbrock test function

use ndarray::Array1;

/// Rosenbrock function - N-dimensional, non-separable
/// Global minimum: f(x) = 0 at x = (1, 1, ..., 1)
pub fn rosenbrock(x: &Array1<f64>) -> f64 {
    x.windows(2)
        .into_iter()
        .map(|w| 100.0 * (w[1] - w[0].powi(2)).powi(2) + (1.0 - w[0]).powi(2))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rosenbrock_values() {
        assert_eq!(rosenbrock(&Array1::ones(6)), 0.0);
        assert_eq!(rosenbrock(&array![0.0, 0.0]), 1.0);
        assert_eq!(rosenbrock(&array![-1.0, 1.0, 1.0]), 4.0);
    }
}
