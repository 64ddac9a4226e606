//! Where spectra live on disk, resolved from the environment.
//!
//! - `SPECFIT`: data root (defaults to the current directory)
//! - `spectrum_results`: `data` (scan `<root>/data`, the default) or
//!   `simulation` (scan `<root>/sim`)
//!
//! A `.env` file in the working directory is loaded first.

use std::path::PathBuf;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::domain::SpectrumResults;
use crate::error::DataError;

/// How many datasets a simulation-mode run picks when none are requested.
pub const SIMULATION_DEFAULT_SELECTION: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub root: PathBuf,
    pub mode: SpectrumResults,
}

impl DataSource {
    pub fn from_env() -> Result<Self, DataError> {
        dotenvy::dotenv().ok();
        let root = std::env::var("SPECFIT").ok();
        let results = std::env::var("spectrum_results").ok();
        Self::from_values(root.as_deref(), results.as_deref())
    }

    pub fn from_values(root: Option<&str>, results: Option<&str>) -> Result<Self, DataError> {
        let root = root
            .filter(|r| !r.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let mode = match results {
            Some(v) => SpectrumResults::parse(v)?,
            None => SpectrumResults::Data,
        };
        Ok(Self { root, mode })
    }

    pub fn spectra_dir(&self) -> PathBuf {
        self.root.join(self.mode.subdir())
    }

    /// Datasets used when the caller did not name any.
    ///
    /// Measured data: everything available. Simulation: a random sample of at
    /// most eight, sorted.
    pub fn default_selection<R: Rng + ?Sized>(&self, available: &[String], rng: &mut R) -> Vec<String> {
        match self.mode {
            SpectrumResults::Data => available.to_vec(),
            SpectrumResults::Simulation => {
                let mut picked: Vec<String> = available
                    .choose_multiple(rng, SIMULATION_DEFAULT_SELECTION)
                    .cloned()
                    .collect();
                picked.sort();
                picked
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn defaults_to_measured_data_under_cwd() {
        let src = DataSource::from_values(None, None).unwrap();
        assert_eq!(src.mode, SpectrumResults::Data);
        assert_eq!(src.spectra_dir(), PathBuf::from("./data"));
    }

    #[test]
    fn simulation_mode_uses_sim_dir() {
        let src = DataSource::from_values(Some("/srv/specfit"), Some("simulation_v2")).unwrap();
        assert_eq!(src.spectra_dir(), PathBuf::from("/srv/specfit/sim"));
    }

    #[test]
    fn ambiguous_mode_is_an_error() {
        assert!(DataSource::from_values(None, Some("data_and_simulation")).is_err());
        assert!(DataSource::from_values(None, Some("whatever")).is_err());
    }

    #[test]
    fn simulation_selection_is_sorted_and_capped() {
        let src = DataSource::from_values(None, Some("simulation")).unwrap();
        let available: Vec<String> = (0..20).map(|i| format!("sim_{i:02}")).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let picked = src.default_selection(&available, &mut rng);
        assert_eq!(picked.len(), 8);
        let mut sorted = picked.clone();
        sorted.sort();
        assert_eq!(picked, sorted);
    }

    #[test]
    fn data_selection_takes_everything() {
        let src = DataSource::from_values(None, Some("data")).unwrap();
        let available = vec!["a".to_string(), "b".to_string()];
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(src.default_selection(&available, &mut rng), available);
    }
}
