//! Joint binned-Poisson fit engine.
//!
//! All registered spectra share one flux function. Correction parameters are
//! shared too: the fit vector is the flux parameters followed by the
//! parameters of the first registered correction that has any, and every
//! correction of the same shape is evaluated with those values. Parameters with
//! zero error are held fixed.

use tracing::{debug, warn};

use crate::data::SpectrumData;
use crate::domain::LikelihoodStatistic;
use crate::error::EngineError;
use crate::fit::engine::{FitEngine, NullExpectation};
use crate::fit::likelihood::{DevianceSums, FittedSpectrum};
use crate::fit::minimizer::{MinimizerOptions, Minimum, PENALTY, minimize};
use crate::math::{deviance_errors, numerical_hessian};
use crate::models::{CompositeCorrection, FluxFunction, Parameter, ParametricFunction};

/// Finite-difference step relative to a parameter's error.
const HESSIAN_STEP: f64 = 1e-2;
const DEFAULT_STEP: f64 = 0.1;

#[derive(Debug, Clone)]
struct BestFit {
    theta: Vec<f64>,
    parameters: Vec<Parameter>,
    statistics: Vec<LikelihoodStatistic>,
}

#[derive(Debug, Clone, Default)]
pub struct PoissonFitEngine {
    spectra: Vec<FittedSpectrum>,
    flux: Option<FluxFunction>,
    window: Option<(f64, f64)>,
    options: MinimizerOptions,
    best: Option<BestFit>,
}

impl PoissonFitEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn shared_correction_parameters(&self) -> Vec<Parameter> {
        self.spectra
            .iter()
            .filter_map(|s| s.correction.as_ref())
            .find(|c| c.n_parameters() > 0)
            .map(|c| c.parameters().to_vec())
            .unwrap_or_default()
    }

    fn total_bins(&self) -> usize {
        self.spectra.iter().map(|s| s.data.len()).sum()
    }

    /// Write fitted values back into the flux function, the corrections and
    /// the per-bin expectations.
    fn apply(&mut self, parameters: &[Parameter], n_flux: usize) {
        let values: Vec<f64> = parameters.iter().map(|p| p.value).collect();
        let errors: Vec<f64> = parameters.iter().map(|p| p.error).collect();
        let (flux_values, corr_values) = values.split_at(n_flux);
        let corr_errors = &errors[n_flux..];

        if let Some(flux) = self.flux.as_mut() {
            flux.set_parameters(flux_values, Some(&errors[..n_flux]));
        }
        for s in &mut self.spectra {
            if let Some(c) = s.correction.as_mut() {
                if c.n_parameters() == corr_values.len() {
                    c.set_parameters(corr_values, Some(corr_errors));
                }
            }
        }
        if let Some(flux) = self.flux.as_ref() {
            for s in &mut self.spectra {
                s.nevents_fit = s.expected(flux, flux_values, corr_values);
            }
        }
    }
}

fn total_deviance(spectra: &[FittedSpectrum], flux: &FluxFunction, theta: &[f64], n_flux: usize) -> DevianceSums {
    let (flux_params, corr_params) = theta.split_at(n_flux.min(theta.len()));
    let mut sums = DevianceSums::default();
    for s in spectra {
        sums.merge(&s.deviance(flux, flux_params, corr_params));
    }
    sums
}

/// Replace the `free` coordinates of `base` with `x`.
fn embed(base: &[f64], free: &[usize], x: &[f64]) -> Vec<f64> {
    let mut theta = base.to_vec();
    for (&i, &v) in free.iter().zip(x) {
        theta[i] = v;
    }
    theta
}

fn step_for(p: &Parameter) -> f64 {
    if p.error.is_finite() && p.error > 0.0 {
        p.error
    } else {
        DEFAULT_STEP
    }
}

fn minimize_subset(
    spectra: &[FittedSpectrum],
    flux: &FluxFunction,
    theta0: &[f64],
    params: &[Parameter],
    free: &[usize],
    n_flux: usize,
    options: &MinimizerOptions,
) -> Result<(Vec<f64>, Minimum), EngineError> {
    let objective = |x: &[f64]| total_deviance(spectra, flux, &embed(theta0, free, x), n_flux).full();
    let start: Vec<f64> = free.iter().map(|&i| theta0[i]).collect();
    let steps: Vec<f64> = free.iter().map(|&i| step_for(&params[i])).collect();
    let min = minimize(objective, &start, &steps, options)?;
    Ok((embed(theta0, free, &min.x), min))
}

impl FitEngine for PoissonFitEngine {
    fn reset(&mut self) {
        self.spectra.clear();
        self.window = None;
        self.best = None;
    }

    fn add_dataset(&mut self, name: &str, title: &str, data: SpectrumData, correction: Option<CompositeCorrection>) {
        let mut spectrum = FittedSpectrum::new(name, title, data, correction);
        if let Some((min, max)) = self.window {
            spectrum.restrict(min, max);
        }
        debug!(name, bins = spectrum.data.len(), "registered dataset");
        self.spectra.push(spectrum);
        self.best = None;
    }

    fn set_flux_function(&mut self, function: FluxFunction) {
        self.flux = Some(function);
        self.best = None;
    }

    fn restrict_range(&mut self, min: f64, max: f64) {
        self.window = Some((min, max));
        for s in &mut self.spectra {
            s.restrict(min, max);
        }
        self.best = None;
    }

    fn fit(&mut self) -> Result<(), EngineError> {
        self.best = None;
        let flux = self.flux.clone().ok_or(EngineError::NoFunction)?;
        if self.spectra.is_empty() {
            return Err(EngineError::NoDatasets);
        }
        if self.total_bins() == 0 {
            let (min, max) = self.window.unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
            return Err(EngineError::EmptyWindow { min, max });
        }

        let mut params = flux.parameters().to_vec();
        let n_flux = params.len();
        params.extend(self.shared_correction_parameters());
        let theta0: Vec<f64> = params.iter().map(|p| p.value).collect();
        let free: Vec<usize> = (0..params.len()).filter(|&i| !params[i].is_fixed()).collect();

        let (theta, min) = minimize_subset(&self.spectra, &flux, &theta0, &params, &free, n_flux, &self.options)?;
        debug!(iterations = min.iterations, cost = min.cost, "minimization finished");
        if !min.converged {
            return Err(EngineError::NotConverged(min.message));
        }

        let sums = total_deviance(&self.spectra, &flux, &theta, n_flux);
        if !sums.full().is_finite() || sums.full() >= PENALTY {
            return Err(EngineError::NonFinite);
        }

        // Errors from the curvature over the free coordinates.
        let x_free: Vec<f64> = free.iter().map(|&i| theta[i]).collect();
        let h: Vec<f64> = free.iter().map(|&i| step_for(&params[i]) * HESSIAN_STEP).collect();
        let hessian = numerical_hessian(
            |x| total_deviance(&self.spectra, &flux, &embed(&theta, &free, x), n_flux).full(),
            &x_free,
            &h,
        );
        let errors = deviance_errors(&hessian);
        if errors.is_none() {
            warn!("Hessian is singular at the minimum; keeping step sizes as parameter errors");
        }

        for (i, p) in params.iter_mut().enumerate() {
            p.value = theta[i];
        }
        if let Some(errors) = errors {
            for (&i, e) in free.iter().zip(errors) {
                params[i].error = e;
            }
        }

        self.apply(&params, n_flux);
        self.best = Some(BestFit {
            theta,
            statistics: sums.statistics(params.len()),
            parameters: params,
        });
        Ok(())
    }

    fn flux_function(&self) -> Option<&FluxFunction> {
        self.flux.as_ref()
    }

    fn fit_parameters(&self) -> Option<Vec<Parameter>> {
        self.best.as_ref().map(|b| b.parameters.clone())
    }

    fn log_likelihood_stats(&self) -> Option<Vec<LikelihoodStatistic>> {
        self.best.as_ref().map(|b| b.statistics.clone())
    }

    fn evaluate_null_expectation(&self, null: &FluxFunction) -> NullExpectation {
        let domain = null.domain();
        let null_values = null.parameter_values();
        let mut out = NullExpectation::default();

        for s in &self.spectra {
            let (lo, hi) = s.corrected_bounds(domain.xmin, domain.xmax);
            let own = s.correction.as_ref().map(|c| c.parameter_values()).unwrap_or_default();
            let expected = s.expected(null, &null_values, &own);
            for (bin, mu) in s.data.bins().zip(expected) {
                if bin.log10en >= lo && bin.log10en <= hi {
                    out.expected += mu;
                    out.observed += bin.nevents;
                }
            }
        }
        out
    }

    fn refit_with_fixed(&mut self, index: usize, value: f64) -> Result<f64, EngineError> {
        let best = self.best.as_ref().ok_or(EngineError::NotFitted)?;
        let flux = self.flux.as_ref().ok_or(EngineError::NoFunction)?;
        let len = best.theta.len();
        if index >= len {
            return Err(EngineError::ParameterIndex { index, len });
        }

        let n_flux = flux.n_parameters();
        let mut theta0 = best.theta.clone();
        theta0[index] = value;
        let free: Vec<usize> = (0..len)
            .filter(|&i| i != index && !best.parameters[i].is_fixed())
            .collect();

        let (theta, min) = minimize_subset(&self.spectra, flux, &theta0, &best.parameters, &free, n_flux, &self.options)?;
        if !min.converged {
            return Err(EngineError::NotConverged(min.message));
        }
        let cost = total_deviance(&self.spectra, flux, &theta, n_flux).full();
        if !cost.is_finite() || cost >= PENALTY {
            return Err(EngineError::NonFinite);
        }
        Ok(cost)
    }

    fn n_datasets(&self) -> usize {
        self.spectra.len()
    }

    fn dataset(&self, index: usize) -> Option<&FittedSpectrum> {
        self.spectra.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StatisticKind;
    use crate::models::FluxKind;

    /// Bins filled with the exact expectation of `truth`.
    fn asimov(truth: &FluxFunction, centres: &[f64], exposure: f64) -> SpectrumData {
        let mut data = SpectrumData::from_columns(
            centres.to_vec(),
            vec![0.1; centres.len()],
            vec![0.0; centres.len()],
            vec![exposure; centres.len()],
        )
        .unwrap();
        let s = FittedSpectrum::new("t", "t", data.clone(), None);
        data.nevents = s.expected(truth, &truth.parameter_values(), &[]);
        data
    }

    fn single_power_law() -> FluxFunction {
        FluxFunction::new(
            "pl",
            1e-30,
            crate::models::Domain::new(18.0, 21.0),
            vec![Parameter::new("const", 2.0, 0.1), Parameter::new("p1", -3.0, 0.1)],
        )
    }

    #[test]
    fn fit_recovers_asimov_power_law() {
        let truth = single_power_law();
        let centres: Vec<f64> = (0..8).map(|i| 18.05 + 0.1 * i as f64).collect();
        let mut engine = PoissonFitEngine::new();
        engine.add_dataset("a", "A", asimov(&truth, &centres, 1e16), None);

        let mut start = truth.clone();
        start.set_parameters(&[1.5, -2.8], None);
        engine.set_flux_function(start);
        engine.restrict_range(18.0, 21.0);
        engine.fit().unwrap();

        let fitted = engine.flux_function().unwrap();
        assert!((fitted.parameters()[0].value - 2.0).abs() < 1e-2);
        assert!((fitted.parameters()[1].value + 3.0).abs() < 1e-2);
        let stats = engine.log_likelihood_stats().unwrap();
        assert_eq!(stats[0].kind, StatisticKind::Full);
        assert_eq!(stats[0].ndof, 6);
        assert!(stats[0].value < 1e-3);
        assert!(fitted.parameters()[1].error > 0.0);
    }

    #[test]
    fn fixed_parameters_do_not_move() {
        let truth = single_power_law();
        let centres: Vec<f64> = (0..6).map(|i| 18.05 + 0.1 * i as f64).collect();
        let mut engine = PoissonFitEngine::new();
        engine.add_dataset("a", "A", asimov(&truth, &centres, 1e16), None);

        let mut start = truth.clone();
        start.set_parameters(&[1.0, -3.0], Some(&[0.1, 0.0]));
        engine.set_flux_function(start);
        engine.fit().unwrap();
        assert_eq!(engine.flux_function().unwrap().parameters()[1].value, -3.0);
    }

    #[test]
    fn empty_window_fails() {
        let truth = FluxKind::TwoBreaks19.function();
        let mut engine = PoissonFitEngine::new();
        engine.add_dataset("a", "A", asimov(&truth, &[19.0, 19.1], 1e17), None);
        engine.set_flux_function(truth);
        engine.restrict_range(20.5, 21.0);
        assert!(matches!(engine.fit(), Err(EngineError::EmptyWindow { .. })));
    }

    #[test]
    fn no_datasets_fails() {
        let mut engine = PoissonFitEngine::new();
        engine.set_flux_function(FluxKind::TwoBreaks19.function());
        assert_eq!(engine.fit(), Err(EngineError::NoDatasets));
    }

    #[test]
    fn refit_requires_a_fit_and_valid_index() {
        let truth = single_power_law();
        let centres: Vec<f64> = (0..6).map(|i| 18.05 + 0.1 * i as f64).collect();
        let mut engine = PoissonFitEngine::new();
        engine.add_dataset("a", "A", asimov(&truth, &centres, 1e16), None);
        engine.set_flux_function(truth);
        assert_eq!(engine.refit_with_fixed(0, 2.0), Err(EngineError::NotFitted));

        engine.fit().unwrap();
        assert!(matches!(
            engine.refit_with_fixed(5, 0.0),
            Err(EngineError::ParameterIndex { index: 5, len: 2 })
        ));
        let at_best = engine.refit_with_fixed(1, -3.0).unwrap();
        let off = engine.refit_with_fixed(1, -2.9).unwrap();
        assert!(off > at_best);
    }

    #[test]
    fn null_expectation_sums_inside_domain() {
        let truth = single_power_law();
        let centres = [18.05, 18.15, 18.25, 18.35];
        let mut engine = PoissonFitEngine::new();
        let data = asimov(&truth, &centres, 1e16);
        let inside: f64 = data.nevents[1] + data.nevents[2];
        engine.add_dataset("a", "A", data, None);
        engine.set_flux_function(truth.clone());

        let mut null = truth;
        null.set_domain(crate::models::Domain::new(18.1, 18.3));
        let e = engine.evaluate_null_expectation(&null);
        assert!((e.observed - inside).abs() < 1e-9 * inside);
        assert!((e.expected - inside).abs() < 1e-9 * inside);
    }
}
