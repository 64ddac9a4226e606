//! Index of available spectrum datasets.
//!
//! Discovery walks a directory tree (deterministic order) and registers:
//!
//! - `.txt` / `.dat` / `.asc` files as deferred datasets named after the file stem
//! - every table of `.h5` / `.hd5` / `.hdf5` containers as a loaded dataset
//!
//! Colliding names overwrite earlier entries.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::data::container::{ContainerReader, UnavailableContainerReader, is_container};
use crate::data::dataset::{SpectrumData, SpectrumDataset, sanitize_name};
use crate::models::CompositeCorrection;

const TABLE_EXTENSIONS: [&str; 3] = ["txt", "dat", "asc"];

pub struct SpectrumRegistry {
    datasets: BTreeMap<String, SpectrumDataset>,
    container_reader: Box<dyn ContainerReader>,
}

impl std::fmt::Debug for SpectrumRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumRegistry")
            .field("datasets", &self.datasets.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for SpectrumRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumRegistry {
    pub fn new() -> Self {
        Self::with_container_reader(Box::new(UnavailableContainerReader))
    }

    pub fn with_container_reader(container_reader: Box<dyn ContainerReader>) -> Self {
        Self {
            datasets: BTreeMap::new(),
            container_reader,
        }
    }

    /// Register every dataset found under `root`. Returns how many entries were
    /// added (or replaced).
    pub fn discover(&mut self, root: &Path) -> usize {
        if !root.is_dir() {
            warn!(path = %root.display(), "spectrum directory not found; no datasets discovered");
            return 0;
        }

        let mut files = Vec::new();
        collect_files(root, &mut files);
        files.sort();

        let mut added = 0;
        for path in files {
            if has_extension(&path, &TABLE_EXTENSIONS) {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.insert(SpectrumDataset::deferred(&stem, &path));
                added += 1;
            } else if is_container(&path) {
                added += self.discover_container(&path);
            }
        }
        info!(path = %root.display(), datasets = self.datasets.len(), "discovered spectra");
        added
    }

    fn discover_container(&mut self, path: &Path) -> usize {
        let keys = match self.container_reader.table_keys(path) {
            Ok(keys) => keys,
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                return 0;
            }
        };

        let mut added = 0;
        for key in keys {
            let data = self
                .container_reader
                .read_table(path, &key)
                .map(|t| t.into_spectrum());
            match data {
                Ok(Some(data)) => {
                    self.insert(SpectrumDataset::loaded(&key, path, data));
                    added += 1;
                }
                Ok(None) => warn!(key = %key, "skipping table in {}: fewer than four usable columns", path.display()),
                Err(e) => warn!(key = %key, "skipping table in {}: {e}", path.display()),
            }
        }
        added
    }

    /// Add or replace a dataset under its (sanitized) name.
    pub fn insert(&mut self, mut dataset: SpectrumDataset) {
        dataset.name = sanitize_name(&dataset.name);
        if self.datasets.contains_key(&dataset.name) {
            debug!(name = %dataset.name, "dataset name collision; replacing earlier entry");
        }
        self.datasets.insert(dataset.name.clone(), dataset);
    }

    /// Convenience for in-memory spectra (tests, simulation).
    pub fn insert_data(&mut self, name: &str, origin: &Path, data: SpectrumData) {
        self.insert(SpectrumDataset::loaded(name, origin, data));
    }

    /// Dataset names, sorted lexicographically.
    pub fn list_available(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&SpectrumDataset> {
        self.datasets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Attach the same correction to every registered dataset.
    pub fn assign_correction(&mut self, correction: &CompositeCorrection) {
        for ds in self.datasets.values_mut() {
            ds.correction = Some(correction.clone());
        }
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            collect_files(&path, out);
        } else if file_type.is_file() {
            out.push(path);
        }
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}
