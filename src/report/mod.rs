//! Reporting utilities: result lines, tables and listings.

pub mod format;

pub use format::*;
