//! Mathematical utilities: Poisson/χ² probabilities and curvature-based errors.

pub mod hessian;
pub mod poisson;

pub use hessian::*;
pub use poisson::*;
