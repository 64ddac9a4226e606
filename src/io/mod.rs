//! Input/output helpers.
//!
//! - fit result and spectrum exports (`export`)
//!
//! Reading spectra lives in `data::tabular`.

pub mod export;

pub use export::*;
