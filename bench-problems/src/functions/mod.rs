//! Objective functions, defined on untransformed variables.
//!
//! Every function has its global minimum 0 at the origin, except Rosenbrock
//! whose minimum 0 lies at `(1, ..., 1)`.

mod ackley;
mod ellipsoid;
mod rastrigin;
mod rosenbrock;
mod sphere;

pub use ackley::ackley;
pub use ellipsoid::ellipsoid;
pub use rastrigin::rastrigin;
pub use rosenbrock::rosenbrock;
pub use sphere::sphere;
