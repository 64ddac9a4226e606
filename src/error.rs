//! Error types.
//!
//! `AppError` is what crosses the process boundary: it carries the exit code
//! `main` returns. Component errors are typed enums that convert into it:
//!
//! - exit code 2: configuration (unknown names, malformed options)
//! - exit code 3: data (unreadable tables, missing backends)
//! - exit code 4: computation (fit engine failures)

use std::path::PathBuf;

use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Catalog lookups and function composition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("unknown {kind} function '{name}'; valid choices: {}", valid.join(", "))]
    NotFound {
        kind: &'static str,
        name: String,
        valid: Vec<String>,
    },

    #[error(
        "cannot compose '{constant}' (domain {constant_domain:?}) with '{nonlinear}' (domain {nonlinear_domain:?}): domains differ"
    )]
    IncompatibleDomain {
        constant: String,
        constant_domain: (f64, f64),
        nonlinear: String,
        nonlinear_domain: (f64, f64),
    },
}

/// Building a joint-fit request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("malformed correction pair '{0}': expected CONSTANT,NONLINEAR (e.g. fNOCONSTCORR,fNONONLINCORR)")]
    MalformedCorrectionPair(String),
}

/// Reading spectrum tables and resolving data sources.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("unreadable table '{}': {reason}", path.display())]
    UnreadableTable { path: PathBuf, reason: String },

    #[error("no structured-container backend available to read '{}'", .0.display())]
    ContainerUnavailable(PathBuf),

    #[error("spectrum_results = '{0}' must name exactly one of 'data' or 'simulation'")]
    AmbiguousResultsMode(String),
}

/// Failures reported by a fit engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("no datasets registered with the fit engine")]
    NoDatasets,

    #[error("no flux function set")]
    NoFunction,

    #[error("no bins inside the fit window [{min}, {max}]")]
    EmptyWindow { min: f64, max: f64 },

    #[error("minimizer did not converge: {0}")]
    NotConverged(String),

    #[error("minimizer error: {0}")]
    Minimizer(String),

    #[error("non-finite log-likelihood at the minimum")]
    NonFinite,

    #[error("parameter index {index} out of range (0..{len})")]
    ParameterIndex { index: usize, len: usize },

    #[error("no successful fit to scan around")]
    NotFitted,
}

/// A joint fit that produced no usable result.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("fit failed: {diagnostic}")]
pub struct FitFailure {
    pub diagnostic: String,
}

impl From<EngineError> for FitFailure {
    fn from(err: EngineError) -> Self {
        Self {
            diagnostic: err.to_string(),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        AppError::new(2, err.to_string())
    }
}

impl From<RequestError> for AppError {
    fn from(err: RequestError) -> Self {
        AppError::new(2, err.to_string())
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        let code = match err {
            DataError::AmbiguousResultsMode(_) => 2,
            _ => 3,
        };
        AppError::new(code, err.to_string())
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let code = match err {
            EngineError::ParameterIndex { .. } | EngineError::NotFitted => 2,
            _ => 4,
        };
        AppError::new(code, err.to_string())
    }
}
