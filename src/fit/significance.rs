//! Shoulder significance: how unlikely are the counts between `logEshld` and
//! `logEgzk` if the spectrum simply continued without the shoulder break?
//!
//! The null model is the fitted flux function with both breaks pushed to the
//! upper edge of its domain, evaluated only over the fitted `[logEshld,
//! logEgzk]` interval.

use tracing::debug;

use crate::domain::SignificanceResult;
use crate::fit::engine::FitEngine;
use crate::fit::orchestrator::JointFitOrchestrator;
use crate::math::{pchance_to_sigma, poisson_pchance};
use crate::models::{Domain, FluxFunction, ParametricFunction};

#[derive(Debug, Clone, Copy, Default)]
pub struct ShoulderSignificanceTester;

impl ShoulderSignificanceTester {
    /// Build the null-hypothesis copy of `fitted`, or `None` if it has no
    /// shoulder/GZK pair.
    pub fn null_model(&self, fitted: &FluxFunction) -> Option<FluxFunction> {
        let i_shld = fitted.shoulder_index()?;
        let i_gzk = fitted.gzk_index()?;
        let shld = fitted.parameters()[i_shld].value;
        let gzk = fitted.parameters()[i_gzk].value;
        let edge = fitted.domain().xmax;

        let mut null = fitted.clone();
        null.rename(format!("{}_null", fitted.name()));
        null.parameters_mut()[i_shld].value = edge;
        null.parameters_mut()[i_gzk].value = edge;
        null.set_domain(Domain::new(shld, gzk));
        Some(null)
    }

    pub fn test<E: FitEngine>(
        &self,
        fitted: &FluxFunction,
        orchestrator: &JointFitOrchestrator<E>,
    ) -> Option<SignificanceResult> {
        let null = self.null_model(fitted)?;
        let counts = orchestrator.engine().evaluate_null_expectation(&null);
        let pchance = poisson_pchance(counts.observed, counts.expected, false);
        let domain = null.domain();
        debug!(expected = counts.expected, observed = counts.observed, pchance, "shoulder test");

        Some(SignificanceResult {
            log10en_min: domain.xmin,
            log10en_max: domain.xmax,
            expected: counts.expected,
            observed: counts.observed,
            pchance,
            sigma: pchance_to_sigma(pchance),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FluxKind;

    #[test]
    fn null_model_moves_breaks_to_domain_edge() {
        let fitted = FluxKind::ThreeBreaks18.function();
        let null = ShoulderSignificanceTester.null_model(&fitted).unwrap();
        let i = null.shoulder_index().unwrap();
        let j = null.gzk_index().unwrap();
        assert_eq!(null.parameters()[i].value, 21.0);
        assert_eq!(null.parameters()[j].value, 21.0);
        assert_eq!(null.domain(), Domain::new(19.1, 19.7));
        // The fitted function is untouched.
        assert_eq!(fitted.parameters()[i].value, 19.1);
    }

    #[test]
    fn null_model_continues_the_pre_shoulder_slope() {
        let fitted = FluxKind::ThreeBreaks18.function();
        let null = ShoulderSignificanceTester.null_model(&fitted).unwrap();
        // Between the ankle and the shoulder the two agree.
        assert!((null.eval(19.0) / fitted.eval(19.0) - 1.0).abs() < 1e-12);
        // Past the GZK break the null keeps the p2 slope, so it lies above.
        assert!(null.eval(19.9) > fitted.eval(19.9));
    }

    #[test]
    fn no_shoulder_truth_gives_matching_counts() {
        use crate::data::{SimulationConfig, SpectrumBin, SpectrumData, expected_counts};
        use crate::fit::PoissonFitEngine;

        let mut truth = FluxKind::TwoBreaks19.function();
        let i = truth.shoulder_index().unwrap();
        let j = truth.gzk_index().unwrap();
        truth.parameters_mut()[i].value = 21.0;
        truth.parameters_mut()[j].value = 21.0;

        let config = SimulationConfig {
            log10en_min: 18.8,
            log10en_max: 20.4,
            bin_width: 0.1,
            exposure: 1e17,
        };
        let mut data = SpectrumData::default();
        for (x, mu) in expected_counts(&truth, &config) {
            data.push(SpectrumBin {
                log10en: x,
                log10en_bsize: config.bin_width,
                nevents: mu,
                exposure: config.exposure,
            });
        }

        let mut orchestrator = JointFitOrchestrator::new(PoissonFitEngine::new());
        orchestrator.engine_mut().add_dataset("a", "A", data, None);

        // Breaks at their catalog values; the null model removes them again.
        let fitted = FluxKind::TwoBreaks19.function();
        let result = ShoulderSignificanceTester.test(&fitted, &orchestrator).unwrap();
        assert!(result.observed > 0.0);
        assert!(
            (result.expected / result.observed - 1.0).abs() < 1e-9,
            "expected {} observed {}",
            result.expected,
            result.observed
        );
        assert!(result.sigma < 1.0);
    }

    #[test]
    fn no_null_model_without_shoulder() {
        assert!(ShoulderSignificanceTester
            .null_model(&FluxKind::TwoBreaks18.function())
            .is_none());
        assert!(ShoulderSignificanceTester
            .null_model(&FluxKind::OneBreak19.function())
            .is_none());
    }
}
