//! Command-line parsing for the spectrum joint fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting code; `app` turns the parsed arguments into a `FitConfig`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::DEFAULT_FLUX;

/// Shoulder energy used when `--fix-shld` is given without a value.
pub const DEFAULT_FIXED_SHOULDER: f64 = 19.1;

/// `DEFAULT_FIXED_SHOULDER` as clap sees it.
const DEFAULT_FIXED_SHOULDER_ARG: &str = "19.1";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "specfit",
    version,
    about = "Joint broken-power-law fits of cosmic-ray energy spectra"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the selected spectra jointly and test the shoulder significance.
    Fit(FitArgs),
    /// List available datasets, flux functions and corrections.
    List(ListArgs),
    /// Write Poisson-fluctuated synthetic spectra drawn from a flux function.
    Simulate(SimulateArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Comma-separated dataset names (default: all available, or a random
    /// eight in simulation mode).
    #[arg(long = "spec", value_delimiter = ',')]
    pub spec: Vec<String>,

    /// Flux function to fit.
    #[arg(long = "fun", default_value = DEFAULT_FLUX)]
    pub fun: String,

    /// Energy-correction pair, CONSTANT,NONLINEAR.
    #[arg(long, default_value = "fNOCONSTCORR,fNONONLINCORR")]
    pub encorr: String,

    /// Lower edge of the fit window, log10(E/eV).
    #[arg(long = "log10en-min", default_value_t = 18.0, allow_negative_numbers = true)]
    pub log10en_min: f64,

    /// Upper edge of the fit window, log10(E/eV).
    #[arg(long = "log10en-max", default_value_t = 21.0, allow_negative_numbers = true)]
    pub log10en_max: f64,

    /// Fix the shoulder break at this log10(E/eV) (19.1 if no value is given).
    #[arg(long = "fix-shld", num_args = 0..=1, default_missing_value = DEFAULT_FIXED_SHOULDER_ARG)]
    pub fix_shld: Option<f64>,

    /// Batch mode: no interactive session after the fit.
    #[arg(short = 'b', long)]
    pub batch: bool,

    /// Quit right after the fit.
    #[arg(short = 'q', long)]
    pub quit: bool,

    /// Save results under this basename (`%dt` expands to YYYYMMDD_HHMMSS).
    #[arg(short = 's', long = "save", value_name = "BASENAME")]
    pub save: Option<String>,

    /// Directory to scan for spectra (overrides SPECFIT / spectrum_results).
    #[arg(long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Seed for the random default selection in simulation mode.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Scan this parameter (index into flux + correction parameters) after the fit.
    #[arg(long = "scan", value_name = "IPAR")]
    pub scan: Option<usize>,

    /// Number of scan points.
    #[arg(long = "scan-points", default_value_t = 40)]
    pub scan_points: usize,

    /// Lower scan bound (equal bounds mean best ± 2σ).
    #[arg(long = "scan-lo", default_value_t = 0.0, allow_negative_numbers = true)]
    pub scan_lo: f64,

    /// Upper scan bound.
    #[arg(long = "scan-up", default_value_t = 0.0, allow_negative_numbers = true)]
    pub scan_up: f64,

    /// Report the absolute statistic instead of differences from the minimum.
    #[arg(long = "no-deltas")]
    pub no_deltas: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct ListArgs {
    /// Directory to scan for spectra (overrides SPECFIT / spectrum_results).
    #[arg(long = "data-dir")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Flux function to draw from.
    #[arg(long = "fun", default_value = DEFAULT_FLUX)]
    pub fun: String,

    /// Number of spectra to write.
    #[arg(short = 'n', long, default_value_t = 8)]
    pub count: usize,

    /// Output directory (default: <SPECFIT>/sim).
    #[arg(short = 'o', long = "out-dir")]
    pub out_dir: Option<PathBuf>,

    /// File name prefix; files are `<prefix>_<k>.txt`.
    #[arg(long, default_value = "sim")]
    pub prefix: String,

    /// Lowest bin edge, log10(E/eV).
    #[arg(long = "log10en-min", default_value_t = 18.0)]
    pub log10en_min: f64,

    /// Highest bin edge, log10(E/eV).
    #[arg(long = "log10en-max", default_value_t = 20.5)]
    pub log10en_max: f64,

    /// Bin width in log10(E/eV).
    #[arg(long = "bin-width", default_value_t = 0.1)]
    pub bin_width: f64,

    /// Exposure per bin, m² sr s.
    #[arg(long, default_value_t = 1e16)]
    pub exposure: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults() {
        let cli = Cli::parse_from(["specfit", "fit"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert!(args.spec.is_empty());
        assert_eq!(args.fun, "fJ3B_18");
        assert_eq!(args.encorr, "fNOCONSTCORR,fNONONLINCORR");
        assert_eq!(args.fix_shld, None);
        assert_eq!(args.scan_points, 40);
    }

    #[test]
    fn fix_shld_without_value_uses_default() {
        let cli = Cli::parse_from(["specfit", "fit", "--fix-shld", "-b"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.fix_shld, Some(DEFAULT_FIXED_SHOULDER));
        assert!(args.batch);

        let cli = Cli::parse_from(["specfit", "fit", "--fix-shld", "19.3"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.fix_shld, Some(19.3));
    }

    #[test]
    fn fixed_shoulder_default_arg_parses_to_the_constant() {
        assert_eq!(DEFAULT_FIXED_SHOULDER_ARG.parse::<f64>().unwrap(), DEFAULT_FIXED_SHOULDER);
    }

    #[test]
    fn spec_list_is_comma_separated() {
        let cli = Cli::parse_from(["specfit", "fit", "--spec", "ta,auger,ta"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.spec, vec!["ta", "auger", "ta"]);
    }
}
