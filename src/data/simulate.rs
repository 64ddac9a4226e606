//! Synthetic spectra drawn from a flux model.
//!
//! Each bin's expectation is `J(x) * ΔE * exposure`; the observed count is a
//! Poisson draw around it. Seeded so a given configuration is reproducible.

use rand::Rng;
use rand_distr::{Distribution, Poisson};

use crate::data::dataset::{SpectrumBin, SpectrumData};
use crate::math::lin_bin_size;
use crate::models::{FluxFunction, ParametricFunction};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub log10en_min: f64,
    pub log10en_max: f64,
    /// Full bin width in `log10(E/eV)`.
    pub bin_width: f64,
    pub exposure: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            log10en_min: 18.0,
            log10en_max: 20.5,
            bin_width: 0.1,
            exposure: 1e16,
        }
    }
}

/// Upper limit on bins per simulated spectrum.
pub const MAX_SIMULATION_BINS: usize = 100_000;

/// Bin centres from `min + w/2` up to (and including, within rounding) `max - w/2`.
///
/// Empty when the range or width is invalid or the grid would exceed
/// `MAX_SIMULATION_BINS`.
pub fn bin_centres(config: &SimulationConfig) -> Vec<f64> {
    let w = config.bin_width;
    if !(w > 0.0 && config.log10en_max > config.log10en_min) {
        return Vec::new();
    }
    let n = ((config.log10en_max - config.log10en_min) / w + 1e-9).floor();
    if !(n.is_finite() && n <= MAX_SIMULATION_BINS as f64) {
        return Vec::new();
    }
    let n = n as usize;
    (0..n)
        .map(|i| config.log10en_min + (i as f64 + 0.5) * w)
        .collect()
}

/// Expected counts per bin for `flux` under `config`.
pub fn expected_counts(flux: &FluxFunction, config: &SimulationConfig) -> Vec<(f64, f64)> {
    bin_centres(config)
        .into_iter()
        .map(|x| {
            let mu = flux.eval(x) * lin_bin_size(x, config.bin_width) * config.exposure;
            (x, mu)
        })
        .collect()
}

pub fn simulate_spectrum<R: Rng + ?Sized>(flux: &FluxFunction, config: &SimulationConfig, rng: &mut R) -> SpectrumData {
    let mut data = SpectrumData::default();
    for (x, mu) in expected_counts(flux, config) {
        let nevents = if mu.is_finite() && mu > 0.0 {
            Poisson::new(mu).map(|p| p.sample(rng)).unwrap_or(0.0)
        } else {
            0.0
        };
        data.push(SpectrumBin {
            log10en: x,
            log10en_bsize: config.bin_width,
            nevents,
            exposure: config.exposure,
        });
    }
    data
}
