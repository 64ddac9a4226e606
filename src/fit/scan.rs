//! Profile scan of one fit parameter.
//!
//! The scan is a lazy iterator over evenly spaced parameter values. Each step
//! fixes the parameter, re-optimizes the others and yields the full `-2 ln L`
//! (optionally relative to the global minimum). Points where the refit fails
//! are skipped with a warning. `restart` rewinds to the first point.

use tracing::warn;

use crate::domain::{ScanPoint, StatisticKind};
use crate::error::EngineError;
use crate::fit::engine::FitEngine;
use crate::fit::orchestrator::JointFitOrchestrator;

/// Half-width of the default window, in fitted errors.
const DEFAULT_WINDOW_ERRORS: f64 = 2.0;

/// `n` evenly spaced values from `lower` to `upper` inclusive.
pub fn scan_grid(lower: f64, upper: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lower],
        _ => {
            let step = (upper - lower) / (n - 1) as f64;
            (0..n).map(|i| lower + step * i as f64).collect()
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ParameterScanner;

impl ParameterScanner {
    /// Prepare a scan of parameter `index` (flux parameters first, then shared
    /// correction parameters). `lower == upper` selects best ± 2σ.
    pub fn scan<'a, E: FitEngine>(
        &self,
        fit: &'a mut JointFitOrchestrator<E>,
        index: usize,
        points: usize,
        lower: f64,
        upper: f64,
        deltas: bool,
    ) -> Result<ParameterScan<'a, E>, EngineError> {
        let params = fit.engine().fit_parameters().ok_or(EngineError::NotFitted)?;
        let param = params.get(index).ok_or(EngineError::ParameterIndex {
            index,
            len: params.len(),
        })?;
        let minimum = fit
            .engine()
            .log_likelihood_stats()
            .and_then(|s| s.into_iter().find(|s| s.kind == StatisticKind::Full))
            .map(|s| s.value)
            .ok_or(EngineError::NotFitted)?;

        let (lo, hi) = if lower == upper {
            let half = DEFAULT_WINDOW_ERRORS * param.error;
            (param.value - half, param.value + half)
        } else {
            (lower, upper)
        };

        Ok(ParameterScan {
            engine: fit.engine_mut(),
            index,
            values: scan_grid(lo, hi, points),
            position: 0,
            offset: if deltas { minimum } else { 0.0 },
        })
    }
}

pub struct ParameterScan<'a, E> {
    engine: &'a mut E,
    index: usize,
    values: Vec<f64>,
    position: usize,
    offset: f64,
}

impl<E> ParameterScan<'_, E> {
    pub fn restart(&mut self) {
        self.position = 0;
    }

    /// Parameter values the scan visits, in order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl<E: FitEngine> Iterator for ParameterScan<'_, E> {
    type Item = ScanPoint;

    fn next(&mut self) -> Option<ScanPoint> {
        while let Some(&value) = self.values.get(self.position) {
            self.position += 1;
            match self.engine.refit_with_fixed(self.index, value) {
                Ok(stat) => {
                    return Some(ScanPoint {
                        value,
                        statistic: stat - self.offset,
                    });
                }
                Err(e) => warn!(parameter = self.index, value, "scan point skipped: {e}"),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.values.len().saturating_sub(self.position)))
    }
}
