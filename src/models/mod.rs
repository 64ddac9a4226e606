//! Parametric functions: broken-power-law flux models, energy-correction
//! terms and the catalog that names them.

pub mod catalog;
pub mod correction;
pub mod flux;
pub mod function;

pub use catalog::*;
pub use correction::*;
pub use flux::*;
pub use function::*;
