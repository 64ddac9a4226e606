//! The fit-engine capability the orchestrator drives.
//!
//! An engine owns copies of the registered spectra, a shared flux function and
//! the fit window. `PoissonFitEngine` is the concrete implementation; tests
//! can substitute their own.

use std::path::Path;

use crate::data::{SpectrumData, read_spectrum_table};
use crate::domain::LikelihoodStatistic;
use crate::error::{DataError, EngineError};
use crate::fit::likelihood::FittedSpectrum;
use crate::models::{CompositeCorrection, FluxFunction, Parameter};

/// Summed counts over the shoulder interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NullExpectation {
    pub expected: f64,
    pub observed: f64,
}

pub trait FitEngine {
    /// Drop all datasets and any previous fit.
    fn reset(&mut self);

    fn add_dataset(&mut self, name: &str, title: &str, data: SpectrumData, correction: Option<CompositeCorrection>);

    /// Read a flat tabular file and register it.
    fn load_dataset(
        &mut self,
        name: &str,
        title: &str,
        path: &Path,
        correction: Option<CompositeCorrection>,
    ) -> Result<(), DataError> {
        let data = read_spectrum_table(path)?;
        self.add_dataset(name, title, data, correction);
        Ok(())
    }

    fn set_flux_function(&mut self, function: FluxFunction);

    /// Keep only bins with centres in `[min, max]` in every dataset.
    fn restrict_range(&mut self, min: f64, max: f64);

    /// Minimize the joint deviance; on success the statistics are available.
    fn fit(&mut self) -> Result<(), EngineError>;

    /// The flux function with its current (after a fit: best) parameters.
    fn flux_function(&self) -> Option<&FluxFunction>;

    /// Flux parameters followed by shared correction parameters, as last fitted.
    fn fit_parameters(&self) -> Option<Vec<Parameter>>;

    /// Full, non-zero and restricted statistics of the last successful fit.
    fn log_likelihood_stats(&self) -> Option<Vec<LikelihoodStatistic>>;

    /// Expected counts under `null` and observed counts, summed over bins whose
    /// centre lies in `null`'s domain translated to each dataset's energy scale.
    fn evaluate_null_expectation(&self, null: &FluxFunction) -> NullExpectation;

    /// Fix parameter `index` at `value`, re-optimize the others from the best
    /// fit and return the full statistic. Leaves the stored best fit untouched.
    fn refit_with_fixed(&mut self, index: usize, value: f64) -> Result<f64, EngineError>;

    fn n_datasets(&self) -> usize;

    fn dataset(&self, index: usize) -> Option<&FittedSpectrum>;
}
