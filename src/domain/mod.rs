//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - run configuration (`FitConfig`, `ScanConfig`, `SpectrumResults`)
//! - fit outputs (`FitResult`, `LikelihoodStatistic`, `SignificanceResult`, `ScanPoint`)

pub mod types;

pub use types::*;
