//! Spectrum data: dataset records, readers, discovery and synthetic spectra.

pub mod container;
pub mod dataset;
pub mod registry;
pub mod simulate;
pub mod source;
pub mod tabular;

pub use container::*;
pub use dataset::*;
pub use registry::*;
pub use simulate::*;
pub use source::*;
pub use tabular::*;
