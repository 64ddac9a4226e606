//! Joint spectrum fitting.
//!
//! Responsibilities:
//!
//! - validate a request and assemble the joint-fit spec (`request`)
//! - drive a fit engine through one fit (`orchestrator`, `engine`)
//! - the binned Poisson engine and its minimizer (`poisson_engine`, `likelihood`, `minimizer`)
//! - the shoulder significance test and parameter scans (`significance`, `scan`)

pub mod engine;
pub mod likelihood;
pub mod minimizer;
pub mod orchestrator;
pub mod poisson_engine;
pub mod request;
pub mod scan;
pub mod significance;

pub use engine::*;
pub use likelihood::*;
pub use minimizer::*;
pub use orchestrator::*;
pub use poisson_engine::*;
pub use request::*;
pub use scan::*;
pub use significance::*;
