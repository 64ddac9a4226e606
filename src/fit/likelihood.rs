//! Binned Poisson likelihood for corrected spectra.
//!
//! For a bin at `x` with full log-width `w`, exposure `A` and energy factor
//! `k = 1 + δ(x)`:
//!
//! ```text
//! μ = J(x + log10 k) * k * (10^(x + w/2) - 10^(x - w/2)) * A
//! D = 2 μ                              if n <= 1e-3
//!     2 ((μ - n) + n ln(n / μ))        otherwise
//! ```
//!
//! `D` summed over bins is `-2 ln λ` against the saturated model.

use serde::Serialize;

use crate::data::{SpectrumBin, SpectrumData};
use crate::domain::{LikelihoodStatistic, StatisticKind};
use crate::math::lin_bin_size;
use crate::models::{CompositeCorrection, FluxFunction, ParametricFunction};

const EMPTY_BIN_EVENTS: f64 = 1e-3;

/// A correction together with the parameter values to evaluate it with.
pub type CorrectionView<'a> = (&'a CompositeCorrection, &'a [f64]);

/// Expected events in one bin.
pub fn expected_events(
    flux: &FluxFunction,
    flux_params: &[f64],
    correction: Option<CorrectionView<'_>>,
    bin: &SpectrumBin,
) -> f64 {
    let k = correction
        .map(|(c, p)| c.energy_factor_with(bin.log10en, p))
        .unwrap_or(1.0);
    let x_corr = bin.log10en + k.log10();
    flux.eval_with(x_corr, flux_params) * k * lin_bin_size(bin.log10en, bin.log10en_bsize) * bin.exposure
}

/// Deviance contribution of one bin. Negative expectations are non-physical
/// and yield `NaN`.
pub fn bin_deviance(expected: f64, nevents: f64) -> f64 {
    if expected < 0.0 {
        return f64::NAN;
    }
    if nevents <= EMPTY_BIN_EVENTS {
        2.0 * expected
    } else {
        2.0 * ((expected - nevents) + nevents * (nevents / expected).ln())
    }
}

/// Running sums for the three statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DevianceSums {
    values: [f64; 3],
    bins: [usize; 3],
}

impl DevianceSums {
    pub fn add(&mut self, expected: f64, nevents: f64) {
        let d = bin_deviance(expected, nevents);
        for (i, kind) in StatisticKind::ALL.iter().enumerate() {
            if kind.includes(nevents) {
                self.values[i] += d;
                self.bins[i] += 1;
            }
        }
    }

    pub fn merge(&mut self, other: &DevianceSums) {
        for i in 0..3 {
            self.values[i] += other.values[i];
            self.bins[i] += other.bins[i];
        }
    }

    pub fn full(&self) -> f64 {
        self.values[0]
    }

    pub fn total_bins(&self) -> usize {
        self.bins[0]
    }

    pub fn statistics(&self, npar: usize) -> Vec<LikelihoodStatistic> {
        StatisticKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| LikelihoodStatistic::new(*kind, self.values[i], self.bins[i], npar))
            .collect()
    }
}

/// A dataset as held by the fit engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedSpectrum {
    pub name: String,
    pub title: String,
    #[serde(skip)]
    raw: SpectrumData,
    /// Bins inside the current fit window.
    pub data: SpectrumData,
    pub correction: Option<CompositeCorrection>,
    /// Expected events per windowed bin at the last evaluated parameters.
    pub nevents_fit: Vec<f64>,
}

impl FittedSpectrum {
    pub fn new(name: &str, title: &str, data: SpectrumData, correction: Option<CompositeCorrection>) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            data: data.clone(),
            raw: data,
            correction,
            nevents_fit: Vec::new(),
        }
    }

    /// Keep only bins with centres in `[min, max]`; always relative to the
    /// originally registered bins.
    pub fn restrict(&mut self, min: f64, max: f64) {
        self.data = self.raw.restricted(min, max);
        self.nevents_fit.clear();
    }

    /// Correction parameters to use: the shared fit values when the shapes
    /// agree, else the correction's own values.
    pub fn correction_values(&self, shared: &[f64]) -> Option<Vec<f64>> {
        self.correction.as_ref().map(|c| {
            if c.n_parameters() == shared.len() {
                shared.to_vec()
            } else {
                c.parameter_values()
            }
        })
    }

    pub fn deviance(&self, flux: &FluxFunction, flux_params: &[f64], shared_corr: &[f64]) -> DevianceSums {
        let corr_values = self.correction_values(shared_corr);
        let view = self.correction.as_ref().zip(corr_values.as_deref());
        let mut sums = DevianceSums::default();
        for bin in self.data.bins() {
            sums.add(expected_events(flux, flux_params, view, &bin), bin.nevents);
        }
        sums
    }

    pub fn expected(&self, flux: &FluxFunction, flux_params: &[f64], shared_corr: &[f64]) -> Vec<f64> {
        let corr_values = self.correction_values(shared_corr);
        let view = self.correction.as_ref().zip(corr_values.as_deref());
        self.data
            .bins()
            .map(|bin| expected_events(flux, flux_params, view, &bin))
            .collect()
    }

    /// `log10(E)` bounds translated onto this dataset's energy scale.
    pub fn corrected_bounds(&self, lo: f64, hi: f64) -> (f64, f64) {
        match &self.correction {
            Some(c) => (c.shift_log_energy(lo), c.shift_log_energy(hi)),
            None => (lo, hi),
        }
    }
}
