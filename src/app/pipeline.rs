//! Shared "fit pipeline" logic.
//!
//! One place for the core workflow:
//! selection -> request validation -> joint fit -> shoulder significance -> scan -> export
//!
//! The CLI front-end only prints what comes back.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::app::{SpecfitContext, selection_rng};
use crate::domain::{FitConfig, FitResult, ScanPoint, SignificanceResult};
use crate::error::AppError;
use crate::fit::{
    FitRequest, FitRequestBuilder, FittedSpectrum, JointFitOrchestrator, ParameterScanner, PoissonFitEngine,
    ShoulderSignificanceTester,
};
use crate::models::ParametricFunction;

/// All computed outputs of a single successful `specfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub datasets: Vec<String>,
    pub result: FitResult,
    pub significance: Option<SignificanceResult>,
    pub scan: Option<Vec<ScanPoint>>,
    pub exported: Vec<PathBuf>,
}

/// Execute the full fitting pipeline.
///
/// Configuration problems are errors. A fit that does not converge is logged
/// and yields `Ok(None)`.
pub fn run_fit(config: &FitConfig, ctx: &mut SpecfitContext) -> Result<Option<RunOutput>, AppError> {
    // 1) Decide which datasets take part.
    let datasets = if config.datasets.is_empty() {
        let available = ctx.registry.list_available();
        let mut rng = selection_rng(config.seed);
        ctx.source.default_selection(&available, &mut rng)
    } else {
        config.datasets.clone()
    };

    let request = FitRequest {
        datasets,
        flux_function: config.flux_function.clone(),
        constant_correction: config.constant_correction.clone(),
        nonlinear_correction: config.nonlinear_correction.clone(),
        log10en_min: config.log10en_min,
        log10en_max: config.log10en_max,
        fixed_shoulder: config.fixed_shoulder,
    };

    // 2) Validate against the catalog and registry.
    let builder = FitRequestBuilder::new(&ctx.catalog);
    let spec = builder.build(&request, &mut ctx.registry)?;
    let names: Vec<String> = spec.dataset_names().into_iter().map(str::to_string).collect();
    let window = (spec.log10en_min, spec.log10en_max);

    // 3) Joint fit.
    let mut orchestrator = JointFitOrchestrator::new(PoissonFitEngine::new());
    let result = match orchestrator.run(&spec) {
        Ok(result) => result,
        Err(failure) => {
            warn!(flux = %config.flux_function, "{failure}");
            return Ok(None);
        }
    };

    // 4) Shoulder significance, for flux functions that have the break pair.
    let significance = orchestrator
        .fitted_function()
        .filter(|f| f.has_shoulder())
        .cloned()
        .and_then(|fitted| ShoulderSignificanceTester.test(&fitted, &orchestrator));

    // 5) Optional profile scan.
    let scan = match &config.scan {
        Some(scan) => {
            let points: Vec<ScanPoint> = ParameterScanner
                .scan(
                    &mut orchestrator,
                    scan.parameter,
                    scan.points,
                    scan.lower,
                    scan.upper,
                    scan.deltas,
                )?
                .collect();
            info!(parameter = scan.parameter, points = points.len(), "scan finished");
            Some(points)
        }
        None => None,
    };

    // 6) Optional export.
    let exported = match &config.save_basename {
        Some(basename) => {
            let spectra: Vec<&FittedSpectrum> = orchestrator.datasets().collect();
            crate::io::write_fit_outputs(basename, &result, significance.as_ref(), &spectra, window)?
        }
        None => Vec::new(),
    };

    if let Some(f) = orchestrator.fitted_function() {
        info!(flux = f.name(), datasets = names.len(), "joint fit done");
    }

    Ok(Some(RunOutput {
        datasets: names,
        result,
        significance,
        scan,
        exported,
    }))
}
