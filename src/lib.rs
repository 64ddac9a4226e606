//! `specfit` library crate.
//!
//! The binary (`specfit`) is a thin wrapper around this library so that:
//!
//! - the fitting workflow is testable without spawning processes
//! - catalog, registry and engine can be driven from other front-ends

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
