//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory between the fit stages
//! - exported to JSON
//! - compared in tests

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::models::Parameter;

/// Which family of spectra a run reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectrumResults {
    /// Measured spectra under `<root>/data`.
    Data,
    /// Simulated spectra under `<root>/sim`.
    Simulation,
}

impl SpectrumResults {
    /// Interpret a `spectrum_results` setting. The value must mention exactly
    /// one of `data` or `simulation` (case-insensitive).
    pub fn parse(value: &str) -> Result<Self, DataError> {
        let lower = value.to_ascii_lowercase();
        match (lower.contains("data"), lower.contains("simulation")) {
            (true, false) => Ok(SpectrumResults::Data),
            (false, true) => Ok(SpectrumResults::Simulation),
            _ => Err(DataError::AmbiguousResultsMode(value.to_string())),
        }
    }

    pub fn subdir(self) -> &'static str {
        match self {
            SpectrumResults::Data => "data",
            SpectrumResults::Simulation => "sim",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SpectrumResults::Data => "data",
            SpectrumResults::Simulation => "simulation",
        }
    }
}

/// The three flavours of `-2 ln L` the engine reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticKind {
    /// Every bin in the window.
    Full,
    /// Bins with at least one event.
    Nonzero,
    /// Bins with at least `RESTRICTED_MIN_EVENTS` events.
    Restricted,
}

/// Minimum count for a bin to enter the restricted statistic.
pub const RESTRICTED_MIN_EVENTS: f64 = 7.0;

impl StatisticKind {
    pub const ALL: [StatisticKind; 3] = [StatisticKind::Full, StatisticKind::Nonzero, StatisticKind::Restricted];

    pub fn display_name(self) -> &'static str {
        match self {
            StatisticKind::Full => "log_likelihood",
            StatisticKind::Nonzero => "log_likelihood_nonzero",
            StatisticKind::Restricted => "log_likelihood_restricted",
        }
    }

    pub fn includes(self, nevents: f64) -> bool {
        match self {
            StatisticKind::Full => true,
            StatisticKind::Nonzero => nevents > 0.0,
            StatisticKind::Restricted => nevents >= RESTRICTED_MIN_EVENTS,
        }
    }
}

/// One `-2 ln L` value with its degrees of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodStatistic {
    pub kind: StatisticKind,
    pub value: f64,
    pub bins: usize,
    /// `bins - npar`; may be zero or negative for tiny windows.
    pub ndof: i64,
}

impl LikelihoodStatistic {
    pub fn new(kind: StatisticKind, value: f64, bins: usize, npar: usize) -> Self {
        Self {
            kind,
            value,
            bins,
            ndof: bins as i64 - npar as i64,
        }
    }

    /// `value / ndof`, or `value` when there are no degrees of freedom.
    pub fn per_dof(&self) -> f64 {
        if self.ndof > 0 {
            self.value / self.ndof as f64
        } else {
            self.value
        }
    }

    pub fn probability(&self) -> f64 {
        crate::math::chi2_prob(self.value, self.ndof)
    }
}

/// Outcome of a successful joint fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub flux_function: String,
    /// Flux parameters followed by the shared correction parameters.
    pub parameters: Vec<Parameter>,
    pub n_flux_parameters: usize,
    /// Full, non-zero and restricted statistics, in that order.
    pub statistics: Vec<LikelihoodStatistic>,
}

impl FitResult {
    pub fn statistic(&self, kind: StatisticKind) -> Option<&LikelihoodStatistic> {
        self.statistics.iter().find(|s| s.kind == kind)
    }

    pub fn flux_parameters(&self) -> &[Parameter] {
        &self.parameters[..self.n_flux_parameters.min(self.parameters.len())]
    }
}

/// Expected vs observed counts over the shoulder interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignificanceResult {
    /// Null-model interval `[logEshld, logEgzk]`.
    pub log10en_min: f64,
    pub log10en_max: f64,
    pub expected: f64,
    pub observed: f64,
    pub pchance: f64,
    pub sigma: f64,
}

/// One point of a parameter scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanPoint {
    pub value: f64,
    pub statistic: f64,
}

/// Options for a parameter scan after the main fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub parameter: usize,
    pub points: usize,
    /// Scan window; equal bounds mean "best ± 2σ".
    pub lower: f64,
    pub upper: f64,
    pub deltas: bool,
}

/// Resolved run configuration for `specfit fit`.
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    /// Requested datasets; empty means the default selection.
    pub datasets: Vec<String>,
    pub flux_function: String,
    pub constant_correction: String,
    pub nonlinear_correction: String,
    pub log10en_min: f64,
    pub log10en_max: f64,
    pub fixed_shoulder: Option<f64>,
    pub batch: bool,
    pub quit: bool,
    /// Output basename for exports (`%dt` already expanded).
    pub save_basename: Option<String>,
    /// Overrides the environment-derived spectra directory.
    pub data_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub scan: Option<ScanConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_mode_parsing() {
        assert_eq!(SpectrumResults::parse("data").unwrap(), SpectrumResults::Data);
        assert_eq!(SpectrumResults::parse("TA_data").unwrap(), SpectrumResults::Data);
        assert_eq!(SpectrumResults::parse("Simulation").unwrap(), SpectrumResults::Simulation);
        assert!(SpectrumResults::parse("").is_err());
        assert!(SpectrumResults::parse("data/simulation").is_err());
    }

    #[test]
    fn ndof_may_go_negative() {
        let s = LikelihoodStatistic::new(StatisticKind::Restricted, 4.0, 3, 6);
        assert_eq!(s.ndof, -3);
        assert_eq!(s.per_dof(), 4.0);
        assert_eq!(s.probability(), 0.0);
    }

    #[test]
    fn per_dof_divides_when_positive() {
        let s = LikelihoodStatistic::new(StatisticKind::Full, 8.0, 10, 6);
        assert_eq!(s.ndof, 4);
        assert_eq!(s.per_dof(), 2.0);
    }

    #[test]
    fn bin_membership_per_statistic() {
        assert!(StatisticKind::Full.includes(0.0));
        assert!(!StatisticKind::Nonzero.includes(0.0));
        assert!(StatisticKind::Nonzero.includes(1.0));
        assert!(!StatisticKind::Restricted.includes(6.0));
        assert!(StatisticKind::Restricted.includes(7.0));
    }
}
