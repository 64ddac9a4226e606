//! Export fit results and spectra.
//!
//! - `<basename>fit.json`: flux function, parameters, statistics, significance
//! - `<basename><dataset>.txt`: per-bin observed and fitted counts
//! - plain spectrum tables in the format the tabular reader accepts

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::data::SpectrumData;
use crate::domain::{FitResult, SignificanceResult};
use crate::error::AppError;
use crate::fit::FittedSpectrum;

const DATETIME_TOKEN: &str = "%dt";

/// Expand `%dt` to `YYYYMMDD_HHMMSS`; `\%dt` stays a literal `%dt`.
pub fn expand_basename(basename: &str, now: DateTime<Local>) -> String {
    let stamp = now.format("%Y%m%d_%H%M%S").to_string();
    let escaped = format!("\\{DATETIME_TOKEN}");
    basename
        .split(escaped.as_str())
        .map(|part| part.replace(DATETIME_TOKEN, &stamp))
        .collect::<Vec<_>>()
        .join(DATETIME_TOKEN)
}

#[derive(Debug, Serialize)]
struct FitExport<'a> {
    tool: &'static str,
    created: String,
    datasets: Vec<&'a str>,
    log10en_min: f64,
    log10en_max: f64,
    #[serde(flatten)]
    result: &'a FitResult,
    significance: Option<&'a SignificanceResult>,
}

/// Write `<basename>fit.json` and one `<basename><dataset>.txt` per dataset.
/// Returns the written paths.
pub fn write_fit_outputs(
    basename: &str,
    result: &FitResult,
    significance: Option<&SignificanceResult>,
    spectra: &[&FittedSpectrum],
    window: (f64, f64),
) -> Result<Vec<PathBuf>, AppError> {
    let mut written = Vec::with_capacity(spectra.len() + 1);

    let json_path = PathBuf::from(format!("{basename}fit.json"));
    ensure_parent(&json_path)?;
    let file = File::create(&json_path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", json_path.display())))?;
    let export = FitExport {
        tool: "specfit",
        created: Local::now().to_rfc3339(),
        datasets: spectra.iter().map(|s| s.name.as_str()).collect(),
        log10en_min: window.0,
        log10en_max: window.1,
        result,
        significance,
    };
    serde_json::to_writer_pretty(BufWriter::new(file), &export)
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;
    written.push(json_path);

    for s in spectra {
        let path = PathBuf::from(format!("{basename}{}.txt", s.name));
        write_fitted_spectrum(&path, s)?;
        written.push(path);
    }
    Ok(written)
}

fn write_fitted_spectrum(path: &Path, spectrum: &FittedSpectrum) -> Result<(), AppError> {
    let mut w = create(path)?;
    let io_err = |e: std::io::Error| AppError::new(2, format!("Failed to write '{}': {e}", path.display()));

    writeln!(w, "#{}", spectrum.title).map_err(io_err)?;
    writeln!(w, "#log10en log10en_bsize nevents nevents_fit exposure").map_err(io_err)?;
    for (i, bin) in spectrum.data.bins().enumerate() {
        let fit = spectrum.nevents_fit.get(i).copied().unwrap_or(f64::NAN);
        writeln!(
            w,
            "{:.4} {:.4} {} {:.6e} {:.6e}",
            bin.log10en, bin.log10en_bsize, bin.nevents, fit, bin.exposure
        )
        .map_err(io_err)?;
    }
    w.flush().map_err(io_err)
}

/// Write a spectrum as a four-column ASCII table.
pub fn write_spectrum_ascii(path: &Path, data: &SpectrumData) -> Result<(), AppError> {
    let mut w = create(path)?;
    let io_err = |e: std::io::Error| AppError::new(2, format!("Failed to write '{}': {e}", path.display()));

    writeln!(w, "#log10en log10en_bsize nevents exposure").map_err(io_err)?;
    for bin in data.bins() {
        writeln!(
            w,
            "{:.4} {:.4} {} {:.6e}",
            bin.log10en, bin.log10en_bsize, bin.nevents, bin.exposure
        )
        .map_err(io_err)?;
    }
    w.flush().map_err(io_err)
}

fn create(path: &Path) -> Result<BufWriter<File>, AppError> {
    ensure_parent(path)?;
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", path.display())))
}

fn ensure_parent(path: &Path) -> Result<(), AppError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => std::fs::create_dir_all(dir)
            .map_err(|e| AppError::new(2, format!("Failed to create directory '{}': {e}", dir.display()))),
        _ => Ok(()),
    }
}
