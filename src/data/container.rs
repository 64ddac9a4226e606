//! Structured multi-table containers (`.h5`, `.hd5`, `.hdf5`).
//!
//! Each table key in a container is one spectrum. The registry only talks to
//! the `ContainerReader` trait; the default build ships no HDF5 backend, so
//! `UnavailableContainerReader` reports every container as unreadable and the
//! registry skips it with a warning.

use std::path::Path;

use crate::data::dataset::SpectrumData;
use crate::error::DataError;

pub const CONTAINER_EXTENSIONS: [&str; 3] = ["h5", "hd5", "hdf5"];

/// Column names recognised when a table is read by name.
pub const NAMED_COLUMNS: [&str; 4] = ["log10en", "log10en_bsize", "nevents", "exposure"];

/// A raw table as a backend returns it: optional column names plus columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub column_names: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl RawTable {
    /// Map to spectrum columns, by name when all four names are present and
    /// positionally (first four columns) otherwise.
    pub fn into_spectrum(self) -> Option<SpectrumData> {
        let by_name: Option<Vec<usize>> = NAMED_COLUMNS
            .iter()
            .map(|want| self.column_names.iter().position(|n| n == want))
            .collect();
        let order = by_name.unwrap_or_else(|| vec![0, 1, 2, 3]);

        let mut columns = self.columns;
        let mut pick = |i: usize| columns.get_mut(i).map(std::mem::take);
        let log10en = pick(order[0])?;
        let bsize = pick(order[1])?;
        let nevents = pick(order[2])?;
        let exposure = pick(order[3])?;
        SpectrumData::from_columns(log10en, bsize, nevents, exposure)
    }
}

pub trait ContainerReader {
    /// Table keys stored in the container.
    fn table_keys(&self, path: &Path) -> Result<Vec<String>, DataError>;

    /// Read one table. Failures are per key and never abort the container.
    fn read_table(&self, path: &Path, key: &str) -> Result<RawTable, DataError>;
}

/// Stand-in used when no container backend is compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableContainerReader;

impl ContainerReader for UnavailableContainerReader {
    fn table_keys(&self, path: &Path) -> Result<Vec<String>, DataError> {
        Err(DataError::ContainerUnavailable(path.to_path_buf()))
    }

    fn read_table(&self, path: &Path, _key: &str) -> Result<RawTable, DataError> {
        Err(DataError::ContainerUnavailable(path.to_path_buf()))
    }
}

pub fn is_container(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| CONTAINER_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_columns_win_over_position() {
        let table = RawTable {
            column_names: vec![
                "exposure".into(),
                "nevents".into(),
                "log10en".into(),
                "log10en_bsize".into(),
            ],
            columns: vec![vec![1e16], vec![5.0], vec![19.0], vec![0.1]],
        };
        let data = table.into_spectrum().unwrap();
        assert_eq!(data.log10en, vec![19.0]);
        assert_eq!(data.exposure, vec![1e16]);
    }

    #[test]
    fn positional_fallback() {
        let table = RawTable {
            column_names: vec![],
            columns: vec![vec![19.0], vec![0.1], vec![5.0], vec![1e16], vec![7.0]],
        };
        let data = table.into_spectrum().unwrap();
        assert_eq!(data.nevents, vec![5.0]);
    }

    #[test]
    fn too_few_columns() {
        let table = RawTable {
            column_names: vec![],
            columns: vec![vec![19.0], vec![0.1]],
        };
        assert!(table.into_spectrum().is_none());
    }

    #[test]
    fn container_extensions() {
        assert!(is_container(Path::new("a/b.h5")));
        assert!(is_container(Path::new("b.HDF5")));
        assert!(!is_container(Path::new("b.txt")));
    }
}
