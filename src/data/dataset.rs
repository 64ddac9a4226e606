//! Spectrum datasets: observation arrays plus naming/metadata.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::CompositeCorrection;

/// Four equal-length columns describing a binned energy spectrum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectrumData {
    /// Bin centre, `log10(E/eV)`.
    pub log10en: Vec<f64>,
    /// Full bin width in `log10(E/eV)`.
    pub log10en_bsize: Vec<f64>,
    pub nevents: Vec<f64>,
    /// Exposure, m² sr s.
    pub exposure: Vec<f64>,
}

/// One bin, borrowed out of a `SpectrumData`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumBin {
    pub log10en: f64,
    pub log10en_bsize: f64,
    pub nevents: f64,
    pub exposure: f64,
}

impl SpectrumData {
    /// Build from columns; `None` if the lengths disagree.
    pub fn from_columns(
        log10en: Vec<f64>,
        log10en_bsize: Vec<f64>,
        nevents: Vec<f64>,
        exposure: Vec<f64>,
    ) -> Option<Self> {
        let n = log10en.len();
        if log10en_bsize.len() != n || nevents.len() != n || exposure.len() != n {
            return None;
        }
        Some(Self {
            log10en,
            log10en_bsize,
            nevents,
            exposure,
        })
    }

    pub fn len(&self) -> usize {
        self.log10en.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log10en.is_empty()
    }

    pub fn push(&mut self, bin: SpectrumBin) {
        self.log10en.push(bin.log10en);
        self.log10en_bsize.push(bin.log10en_bsize);
        self.nevents.push(bin.nevents);
        self.exposure.push(bin.exposure);
    }

    pub fn bin(&self, i: usize) -> Option<SpectrumBin> {
        Some(SpectrumBin {
            log10en: *self.log10en.get(i)?,
            log10en_bsize: *self.log10en_bsize.get(i)?,
            nevents: *self.nevents.get(i)?,
            exposure: *self.exposure.get(i)?,
        })
    }

    pub fn bins(&self) -> impl Iterator<Item = SpectrumBin> + '_ {
        (0..self.len()).filter_map(|i| self.bin(i))
    }

    /// Bins whose centre lies in `[min, max]`.
    pub fn restricted(&self, min: f64, max: f64) -> Self {
        let mut out = Self::default();
        for b in self.bins().filter(|b| b.log10en >= min && b.log10en <= max) {
            out.push(b);
        }
        out
    }

    pub fn total_events(&self) -> f64 {
        self.nevents.iter().sum()
    }
}

/// Where a dataset's observations come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SpectrumSource {
    Loaded(SpectrumData),
    /// A flat tabular file, read by the fit engine when the dataset is registered.
    Deferred(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumDataset {
    pub name: String,
    pub title: String,
    pub source: SpectrumSource,
    pub correction: Option<CompositeCorrection>,
}

impl SpectrumDataset {
    pub fn loaded(name: &str, file: &Path, data: SpectrumData) -> Self {
        Self::with_source(name, file, SpectrumSource::Loaded(data))
    }

    pub fn deferred(name: &str, file: &Path) -> Self {
        Self::with_source(name, file, SpectrumSource::Deferred(file.to_path_buf()))
    }

    fn with_source(name: &str, file: &Path, source: SpectrumSource) -> Self {
        let name = sanitize_name(name);
        let file_name = file
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        Self {
            title: format!("Result {name} from {file_name}"),
            name,
            source,
            correction: None,
        }
    }
}

/// Turn an arbitrary label into a valid identifier.
///
/// - a single leading `/` is dropped (unless it is the whole label)
/// - a leading digit becomes `_`
/// - `.`, `/`, space and `-` become `_`
///
/// Applying it twice gives the same result as applying it once.
pub fn sanitize_name(raw: &str) -> String {
    let trimmed = match raw.strip_prefix('/') {
        Some(rest) if !rest.is_empty() => rest,
        _ => raw,
    };
    trimmed
        .chars()
        .enumerate()
        .map(|(i, c)| match c {
            '.' | '/' | ' ' | '-' => '_',
            c if i == 0 && c.is_ascii_digit() => '_',
            c => c,
        })
        .collect()
}
