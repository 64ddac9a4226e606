use specfit::app::SpecfitContext;
use specfit::app::pipeline::run_fit;
use specfit::data::{DataSource, SimulationConfig, SpectrumBin, SpectrumData, SpectrumRegistry, expected_counts};
use specfit::domain::{FitConfig, ScanConfig, StatisticKind};
use specfit::io::write_spectrum_ascii;
use specfit::math::pchance_to_sigma;
use specfit::models::{FluxKind, FunctionCatalog, ParametricFunction};
use tempfile::tempdir;

/// Rounded expectation of `flux`, so the files hold integer counts.
fn rounded_spectrum(flux: &specfit::models::FluxFunction, config: &SimulationConfig) -> SpectrumData {
    let mut data = SpectrumData::default();
    for (x, mu) in expected_counts(flux, config) {
        data.push(SpectrumBin {
            log10en: x,
            log10en_bsize: config.bin_width,
            nevents: mu.round(),
            exposure: config.exposure,
        });
    }
    data
}

fn sim_config() -> SimulationConfig {
    SimulationConfig {
        log10en_min: 18.8,
        log10en_max: 20.4,
        bin_width: 0.1,
        exposure: 3e17,
    }
}

fn base_config(datasets: &[&str]) -> FitConfig {
    FitConfig {
        datasets: datasets.iter().map(|s| s.to_string()).collect(),
        flux_function: "fJ2B_19".to_string(),
        constant_correction: "fNOCONSTCORR".to_string(),
        nonlinear_correction: "fNONONLINCORR".to_string(),
        log10en_min: 18.0,
        log10en_max: 21.0,
        fixed_shoulder: None,
        batch: true,
        quit: true,
        save_basename: None,
        data_dir: None,
        seed: Some(3),
        scan: None,
    }
}

#[test]
fn joint_fit_of_two_spectra_from_disk() {
    let dir = tempdir().unwrap();
    let config = sim_config();

    let truth = FluxKind::TwoBreaks19.function();
    let mut perturbed = truth.clone();
    let mut values = perturbed.parameter_values();
    values[0] *= 1.05;
    perturbed.set_parameters(&values, None);

    write_spectrum_ascii(&dir.path().join("ta.txt"), &rounded_spectrum(&truth, &config)).unwrap();
    write_spectrum_ascii(&dir.path().join("auger.txt"), &rounded_spectrum(&perturbed, &config)).unwrap();

    let mut registry = SpectrumRegistry::new();
    assert_eq!(registry.discover(dir.path()), 2);
    let mut ctx = SpecfitContext {
        catalog: FunctionCatalog::standard(),
        registry,
        source: DataSource::from_values(Some(dir.path().to_str().unwrap()), Some("data")).unwrap(),
    };

    let mut fit_config = base_config(&["ta", "auger", "ta"]);
    fit_config.save_basename = Some(format!("{}/out/run_", dir.path().display()));
    fit_config.scan = Some(ScanConfig {
        parameter: 0,
        points: 5,
        lower: 5.0,
        upper: 7.0,
        deltas: true,
    });

    let run = run_fit(&fit_config, &mut ctx).unwrap().expect("fit should succeed");
    assert_eq!(run.datasets, vec!["ta", "auger"]);
    assert_eq!(run.result.flux_function, "fJ2B_19");
    assert_eq!(run.result.n_flux_parameters, 6);
    assert!(run.result.parameters.iter().all(|p| p.value.is_finite()));

    // 2 × 16 bins against 6 free parameters.
    let full = run.result.statistic(StatisticKind::Full).unwrap();
    assert_eq!(full.bins, 32);
    assert_eq!(full.ndof, 26);
    assert!(full.value.is_finite() && full.value >= 0.0);
    assert_eq!(run.result.statistics.len(), 3);

    // The fitted normalization sits between the two inputs.
    let norm = run.result.parameters[0].value;
    assert!(norm > 5.7 && norm < 6.5, "norm = {norm}");

    let sig = run.significance.expect("fJ2B_19 has a shoulder");
    assert!((0.0..=1.0).contains(&sig.pchance));
    assert!(sig.observed > 0.0);
    let expected_sigma = pchance_to_sigma(sig.pchance);
    assert!(sig.sigma == expected_sigma || (sig.sigma - expected_sigma).abs() < 1e-12);

    let scan = run.scan.expect("scan requested");
    assert!(!scan.is_empty());
    for pair in scan.windows(2) {
        assert!(pair[0].value < pair[1].value);
    }
    for point in &scan {
        assert!(point.statistic > -0.5, "profile below the global minimum: {point:?}");
    }

    assert_eq!(run.exported.len(), 3);
    for path in &run.exported {
        assert!(path.exists(), "{} missing", path.display());
    }
}

#[test]
fn unknown_datasets_only_soft_fail() {
    let dir = tempdir().unwrap();
    let mut ctx = SpecfitContext {
        catalog: FunctionCatalog::standard(),
        registry: SpectrumRegistry::new(),
        source: DataSource::from_values(Some(dir.path().to_str().unwrap()), None).unwrap(),
    };
    let run = run_fit(&base_config(&["nope"]), &mut ctx).unwrap();
    assert!(run.is_none());
}

#[test]
fn malformed_correction_is_a_configuration_error() {
    let mut ctx = SpecfitContext {
        catalog: FunctionCatalog::standard(),
        registry: SpectrumRegistry::new(),
        source: DataSource::from_values(None, None).unwrap(),
    };
    let mut config = base_config(&[]);
    config.nonlinear_correction = "fNONLINCORR9".to_string();
    let err = run_fit(&config, &mut ctx).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn two_datasets_of_five_bins_with_a_ten_point_scan() {
    let config = SimulationConfig {
        log10en_min: 18.8,
        log10en_max: 20.3,
        bin_width: 0.3,
        exposure: 3e17,
    };
    let truth = FluxKind::TwoBreaks19.function();
    let mut brighter = truth.clone();
    let mut values = brighter.parameter_values();
    values[0] *= 1.05;
    brighter.set_parameters(&values, None);

    let mut registry = SpectrumRegistry::new();
    registry.insert_data("first", std::path::Path::new("first.txt"), rounded_spectrum(&truth, &config));
    registry.insert_data("second", std::path::Path::new("second.txt"), rounded_spectrum(&brighter, &config));
    let mut ctx = SpecfitContext {
        catalog: FunctionCatalog::standard(),
        registry,
        source: DataSource::from_values(None, Some("data")).unwrap(),
    };

    let mut fit_config = base_config(&["first", "second"]);
    fit_config.scan = Some(ScanConfig {
        parameter: 0,
        points: 10,
        lower: 5.5,
        upper: 6.8,
        deltas: true,
    });

    let run = run_fit(&fit_config, &mut ctx).unwrap().expect("fit should succeed");
    let npar = run.result.parameters.len() as i64;
    assert_eq!(npar, 6);
    assert!(run.result.parameters.iter().all(|p| p.value.is_finite() && p.error.is_finite()));
    for kind in StatisticKind::ALL {
        assert!(run.result.statistic(kind).is_some());
    }
    let full = run.result.statistic(StatisticKind::Full).unwrap();
    assert_eq!(full.ndof, 10 - npar);

    let sig = run.significance.unwrap();
    assert!((0.0..=1.0).contains(&sig.pchance));
    assert_eq!(sig.sigma, pchance_to_sigma(sig.pchance));

    let scan = run.scan.unwrap();
    assert_eq!(scan.len(), 10);
    assert!(scan.windows(2).all(|w| w[0].value < w[1].value));
}
