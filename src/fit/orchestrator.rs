//! Drives a fit engine through one joint fit.
//!
//! `run` resets the engine, registers every dataset of the joint-fit spec with its
//! correction (deferred files are read by the engine; unreadable ones are
//! skipped with a warning), sets the shared flux function, restricts the
//! window and fits.

use tracing::{info, warn};

use crate::data::SpectrumSource;
use crate::domain::FitResult;
use crate::error::{EngineError, FitFailure};
use crate::fit::engine::FitEngine;
use crate::fit::likelihood::FittedSpectrum;
use crate::fit::request::JointFitSpec;
use crate::models::{FluxFunction, ParametricFunction};

pub struct JointFitOrchestrator<E> {
    engine: E,
}

impl<E: FitEngine> JointFitOrchestrator<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn run(&mut self, spec: &JointFitSpec<'_>) -> Result<FitResult, FitFailure> {
        self.engine.reset();

        for ds in &spec.datasets {
            let correction = ds.correction.clone();
            match &ds.source {
                SpectrumSource::Loaded(data) => {
                    self.engine.add_dataset(&ds.name, &ds.title, data.clone(), correction);
                }
                SpectrumSource::Deferred(path) => {
                    if let Err(e) = self.engine.load_dataset(&ds.name, &ds.title, path, correction) {
                        warn!(dataset = %ds.name, "skipping: {e}");
                    }
                }
            }
        }

        self.engine.set_flux_function(spec.flux_function.clone());
        self.engine.restrict_range(spec.log10en_min, spec.log10en_max);
        info!(
            datasets = self.engine.n_datasets(),
            flux = spec.flux_function.name(),
            min = spec.log10en_min,
            max = spec.log10en_max,
            "starting joint fit"
        );

        self.engine.fit()?;

        let statistics = self.engine.log_likelihood_stats().ok_or(EngineError::NotFitted)?;
        let parameters = self.engine.fit_parameters().ok_or(EngineError::NotFitted)?;
        Ok(FitResult {
            flux_function: spec.flux_function.name().to_string(),
            n_flux_parameters: spec.flux_function.n_parameters(),
            parameters,
            statistics,
        })
    }

    /// The flux function as fitted (or as last set).
    pub fn fitted_function(&self) -> Option<&FluxFunction> {
        self.engine.flux_function()
    }

    pub fn n_datasets(&self) -> usize {
        self.engine.n_datasets()
    }

    pub fn dataset(&self, index: usize) -> Option<&FittedSpectrum> {
        self.engine.dataset(index)
    }

    pub fn datasets(&self) -> impl Iterator<Item = &FittedSpectrum> {
        (0..self.n_datasets()).filter_map(|i| self.dataset(i))
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}
