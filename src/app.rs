//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - builds the catalog/registry context
//! - runs the joint fit, significance test and optional scan
//! - prints result lines
//! - writes optional exports

use std::path::PathBuf;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::cli::{Command, FitArgs, ListArgs, SimulateArgs};
use crate::data::{DataSource, SimulationConfig, SpectrumRegistry, simulate_spectrum};
use crate::domain::{FitConfig, ScanConfig};
use crate::error::AppError;
use crate::fit::parse_correction_pair;
use crate::models::FunctionCatalog;

pub mod pipeline;

/// Catalog and registry, built once at startup and passed explicitly.
#[derive(Debug)]
pub struct SpecfitContext {
    pub catalog: FunctionCatalog,
    pub registry: SpectrumRegistry,
    pub source: DataSource,
}

impl SpecfitContext {
    /// Standard catalog plus every dataset found under `data_dir` (or the
    /// environment-derived spectra directory).
    pub fn discover(data_dir: Option<PathBuf>) -> Result<Self, AppError> {
        let source = DataSource::from_env()?;
        let dir = data_dir.unwrap_or_else(|| source.spectra_dir());
        info!(mode = source.mode.display_name(), path = %dir.display(), "spectrum source");
        let mut registry = SpectrumRegistry::new();
        registry.discover(&dir);
        Ok(Self {
            catalog: FunctionCatalog::standard(),
            registry,
            source,
        })
    }
}

/// Entry point for the `specfit` binary.
pub fn run() -> Result<(), AppError> {
    // `specfit` and `specfit --fun X` behave like `specfit fit ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::List(args) => handle_list(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args, chrono::Local::now())?;
    let mut ctx = SpecfitContext::discover(config.data_dir.clone())?;
    let run = pipeline::run_fit(&config, &mut ctx)?;

    let Some(run) = run else {
        // Fit failures are reported by the pipeline; nothing more to print.
        return Ok(());
    };

    let names: Vec<&str> = run.datasets.iter().map(String::as_str).collect();
    print!(
        "{}",
        crate::report::format_fit_result(&run.result, &names, run.significance.as_ref())
    );
    if let (Some(points), Some(scan)) = (&run.scan, &config.scan) {
        let name = run
            .result
            .parameters
            .get(scan.parameter)
            .map(|p| p.name.as_str())
            .unwrap_or("?");
        println!("{}", crate::report::format_scan(points, name, scan.deltas));
    }
    for path in &run.exported {
        info!(path = %path.display(), "wrote");
    }
    if !config.batch && !config.quit {
        info!("interactive session not available; exiting (use -b or -q to silence this)");
    }
    Ok(())
}

fn handle_list(args: ListArgs) -> Result<(), AppError> {
    let ctx = SpecfitContext::discover(args.data_dir)?;
    println!("{}", crate::report::format_listing(&ctx.registry, &ctx.catalog));
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let catalog = FunctionCatalog::standard();
    let flux = catalog.flux_function(&args.fun)?;
    let out_dir = match args.out_dir {
        Some(dir) => dir,
        None => DataSource::from_env()?.root.join("sim"),
    };
    let config = SimulationConfig {
        log10en_min: args.log10en_min,
        log10en_max: args.log10en_max,
        bin_width: args.bin_width,
        exposure: args.exposure,
    };
    if crate::data::bin_centres(&config).is_empty() {
        return Err(AppError::new(
            2,
            format!(
                "Simulation needs log10en-max > log10en-min, a positive bin width and at most {} bins.",
                crate::data::MAX_SIMULATION_BINS
            ),
        ));
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    for k in 0..args.count {
        let data = simulate_spectrum(flux, &config, &mut rng);
        let path = out_dir.join(format!("{}_{k}.txt", args.prefix));
        crate::io::write_spectrum_ascii(&path, &data)?;
        info!(path = %path.display(), events = data.total_events(), "wrote simulated spectrum");
    }
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs, now: chrono::DateTime<chrono::Local>) -> Result<FitConfig, AppError> {
    let (constant, nonlinear) = parse_correction_pair(&args.encorr)?;
    let scan = args.scan.map(|parameter| ScanConfig {
        parameter,
        points: args.scan_points,
        lower: args.scan_lo,
        upper: args.scan_up,
        deltas: !args.no_deltas,
    });
    if args.batch && args.quit {
        warn!("both -b and -q given; -q implies -b");
    }

    Ok(FitConfig {
        datasets: args
            .spec
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        flux_function: args.fun.clone(),
        constant_correction: constant,
        nonlinear_correction: nonlinear,
        log10en_min: args.log10en_min,
        log10en_max: args.log10en_max,
        fixed_shoulder: args.fix_shld,
        batch: args.batch || args.quit,
        quit: args.quit,
        save_basename: args
            .save
            .as_deref()
            .map(|b| crate::io::expand_basename(b, now)),
        data_dir: args.data_dir.clone(),
        seed: args.seed,
        scan,
    })
}

/// Seeded when the user asked for reproducibility, otherwise from entropy.
pub(crate) fn selection_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Rewrite argv so `specfit` defaults to `specfit fit`.
///
/// Rules:
/// - `specfit`                      -> `specfit fit`
/// - `specfit --fun X ...`          -> `specfit fit --fun X ...`
/// - `specfit --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("fit".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "list" | "simulate");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "fit flags".
    if arg1.starts_with('-') {
        argv.insert(1, "fit".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_fit() {
        assert_eq!(rewrite_args(argv(&["specfit"])), argv(&["specfit", "fit"]));
        assert_eq!(
            rewrite_args(argv(&["specfit", "--fun", "fJ2B_19"])),
            argv(&["specfit", "fit", "--fun", "fJ2B_19"])
        );
        assert_eq!(rewrite_args(argv(&["specfit", "list"])), argv(&["specfit", "list"]));
        assert_eq!(rewrite_args(argv(&["specfit", "--help"])), argv(&["specfit", "--help"]));
    }

    #[test]
    fn config_from_args() {
        let cli = crate::cli::Cli::parse_from([
            "specfit",
            "fit",
            "--encorr",
            "fCONSTCORR,fNONLINCORR1",
            "-s",
            "out/%dt_",
            "-q",
            "--scan",
            "2",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let now = chrono::Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let config = fit_config_from_args(&args, now).unwrap();
        assert_eq!(config.constant_correction, "fCONSTCORR");
        assert_eq!(config.nonlinear_correction, "fNONLINCORR1");
        assert_eq!(config.save_basename.as_deref(), Some("out/20250102_030405_"));
        assert!(config.batch);
        let scan = config.scan.unwrap();
        assert_eq!(scan.parameter, 2);
        assert!(scan.deltas);
    }

    #[test]
    fn empty_dataset_tokens_are_dropped() {
        let cli = crate::cli::Cli::parse_from(["specfit", "fit", "--spec", "a,,b, "]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = fit_config_from_args(&args, chrono::Local::now()).unwrap();
        assert_eq!(config.datasets, vec!["a", "b"]);
    }

    #[test]
    fn malformed_correction_pair_exits_2() {
        let cli = crate::cli::Cli::parse_from(["specfit", "fit", "--encorr", "fCONSTCORR"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let err = fit_config_from_args(&args, chrono::Local::now()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
