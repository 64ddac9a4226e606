//! Flat tabular spectrum reader.
//!
//! Accepts whitespace-, tab- or comma-separated ASCII tables with at least four
//! numeric columns per row:
//!
//! ```text
//! #log10en log10en_bsize nevents exposure
//! 18.05    0.1           4321    2.1e16
//! ```
//!
//! `#` starts a comment line; blank lines and extra columns are ignored. Rows
//! that do not parse are skipped and logged; a file with no usable rows is an
//! `UnreadableTable`.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::data::dataset::{SpectrumBin, SpectrumData};
use crate::error::DataError;

pub fn read_spectrum_table(path: &Path) -> Result<SpectrumData, DataError> {
    let unreadable = |reason: String| DataError::UnreadableTable {
        path: path.to_path_buf(),
        reason,
    };

    let raw = fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    let normalized = raw.replace(['\t', ','], " ");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b' ')
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(normalized.as_bytes());

    let mut data = SpectrumData::default();
    let mut skipped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(path = %path.display(), row = idx + 1, "skipping row: {e}");
                skipped += 1;
                continue;
            }
        };

        let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
        if fields.is_empty() {
            continue;
        }
        match parse_bin(&fields) {
            Some(bin) => data.push(bin),
            None => {
                debug!(path = %path.display(), row = idx + 1, "skipping non-numeric row");
                skipped += 1;
            }
        }
    }

    if data.is_empty() {
        return Err(unreadable(format!(
            "no rows with four numeric columns ({skipped} rows skipped)"
        )));
    }
    Ok(data)
}

fn parse_bin(fields: &[&str]) -> Option<SpectrumBin> {
    if fields.len() < 4 {
        return None;
    }
    let num = |i: usize| fields[i].parse::<f64>().ok().filter(|v| v.is_finite());
    Some(SpectrumBin {
        log10en: num(0)?,
        log10en_bsize: num(1)?,
        nevents: num(2)?,
        exposure: num(3)?,
    })
}
