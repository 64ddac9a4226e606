//! Validating a fit request and turning it into a `JointFitSpec`.
//!
//! - dataset names are deduplicated (first occurrence wins) and unknown names
//!   dropped, each with a warning
//! - the flux function and both correction terms must exist; anything else is
//!   a fatal configuration error
//! - the composed correction is attached to every registered dataset before the
//!   spec is built
//! - an optional fixed shoulder energy pins `logEshld` (error 0) on flux
//!   functions that have one and is ignored otherwise

use std::collections::HashSet;

use tracing::warn;

use crate::data::{SpectrumDataset, SpectrumRegistry};
use crate::error::RequestError;
use crate::models::{FluxFunction, FunctionCatalog, ParametricFunction};

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct FitRequest {
    pub datasets: Vec<String>,
    pub flux_function: String,
    pub constant_correction: String,
    pub nonlinear_correction: String,
    pub log10en_min: f64,
    pub log10en_max: f64,
    pub fixed_shoulder: Option<f64>,
}

/// A non-fatal problem with the dataset selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionWarning {
    Duplicate(String),
    Unknown(String),
}

impl std::fmt::Display for SelectionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionWarning::Duplicate(name) => write!(f, "dataset '{name}' requested more than once; using it once"),
            SelectionWarning::Unknown(name) => write!(f, "dataset '{name}' not found; skipping"),
        }
    }
}

/// A validated joint fit: datasets (in request order), the flux function and
/// the energy window.
#[derive(Debug, Clone)]
pub struct JointFitSpec<'r> {
    pub flux_function: FluxFunction,
    pub datasets: Vec<&'r SpectrumDataset>,
    pub log10en_min: f64,
    pub log10en_max: f64,
    pub warnings: Vec<SelectionWarning>,
}

impl JointFitSpec<'_> {
    pub fn dataset_names(&self) -> Vec<&str> {
        self.datasets.iter().map(|d| d.name.as_str()).collect()
    }
}

/// Split a `CONSTANT,NONLINEAR` pair.
pub fn parse_correction_pair(pair: &str) -> Result<(String, String), RequestError> {
    let parts: Vec<&str> = pair.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [c, n] if !c.is_empty() && !n.is_empty() => Ok((c.to_string(), n.to_string())),
        _ => Err(RequestError::MalformedCorrectionPair(pair.to_string())),
    }
}

pub struct FitRequestBuilder<'c> {
    catalog: &'c FunctionCatalog,
}

impl<'c> FitRequestBuilder<'c> {
    pub fn new(catalog: &'c FunctionCatalog) -> Self {
        Self { catalog }
    }

    pub fn build<'r>(
        &self,
        request: &FitRequest,
        registry: &'r mut SpectrumRegistry,
    ) -> Result<JointFitSpec<'r>, RequestError> {
        let mut flux = self.catalog.flux_function(&request.flux_function)?.clone();
        let correction = self
            .catalog
            .correction(&request.constant_correction, &request.nonlinear_correction)?;

        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        for name in &request.datasets {
            if !seen.insert(name.as_str()) {
                warnings.push(SelectionWarning::Duplicate(name.clone()));
                continue;
            }
            if !registry.contains(name) {
                warnings.push(SelectionWarning::Unknown(name.clone()));
                continue;
            }
            selected.push(name.clone());
        }
        for w in &warnings {
            warn!("{w}");
        }

        registry.assign_correction(&correction);
        let registry: &'r SpectrumRegistry = registry;

        if let Some(energy) = request.fixed_shoulder {
            if let Some(i) = flux.shoulder_index() {
                let p = &mut flux.parameters_mut()[i];
                p.value = energy;
                p.error = 0.0;
            }
        }

        let (lo, hi) = if request.log10en_min <= request.log10en_max {
            (request.log10en_min, request.log10en_max)
        } else {
            (request.log10en_max, request.log10en_min)
        };

        Ok(JointFitSpec {
            flux_function: flux,
            datasets: selected.iter().filter_map(|n| registry.get(n)).collect(),
            log10en_min: lo,
            log10en_max: hi,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SpectrumData;
    use crate::error::CatalogError;
    use std::path::Path;

    fn registry(names: &[&str]) -> SpectrumRegistry {
        let mut reg = SpectrumRegistry::new();
        for n in names {
            let data = SpectrumData::from_columns(vec![19.0], vec![0.1], vec![1.0], vec![1e17]).unwrap();
            reg.insert_data(n, Path::new("test.txt"), data);
        }
        reg
    }

    fn request(datasets: &[&str], flux: &str) -> FitRequest {
        FitRequest {
            datasets: datasets.iter().map(|s| s.to_string()).collect(),
            flux_function: flux.to_string(),
            constant_correction: "fNOCONSTCORR".to_string(),
            nonlinear_correction: "fNONONLINCORR".to_string(),
            log10en_min: 18.0,
            log10en_max: 21.0,
            fixed_shoulder: None,
        }
    }

    #[test]
    fn duplicates_collapse_to_first_occurrence() {
        let catalog = FunctionCatalog::standard();
        let mut reg = registry(&["A", "B", "C"]);
        let spec = FitRequestBuilder::new(&catalog)
            .build(&request(&["A", "B", "A", "C"], "fJ3B_18"), &mut reg)
            .unwrap();
        assert_eq!(spec.dataset_names(), vec!["A", "B", "C"]);
        assert_eq!(spec.warnings, vec![SelectionWarning::Duplicate("A".to_string())]);
    }

    #[test]
    fn unknown_datasets_are_dropped() {
        let catalog = FunctionCatalog::standard();
        let mut reg = registry(&["A"]);
        let spec = FitRequestBuilder::new(&catalog)
            .build(&request(&["A", "ZZZ"], "fJ3B_18"), &mut reg)
            .unwrap();
        assert_eq!(spec.dataset_names(), vec!["A"]);
        assert_eq!(spec.warnings, vec![SelectionWarning::Unknown("ZZZ".to_string())]);
    }

    #[test]
    fn unknown_flux_is_fatal() {
        let catalog = FunctionCatalog::standard();
        let mut reg = registry(&["A"]);
        let err = FitRequestBuilder::new(&catalog)
            .build(&request(&["A"], "fJ7B_18"), &mut reg)
            .unwrap_err();
        assert!(matches!(err, RequestError::Catalog(CatalogError::NotFound { .. })));
    }

    #[test]
    fn correction_is_attached_to_every_dataset() {
        let catalog = FunctionCatalog::standard();
        let mut reg = registry(&["A", "B"]);
        let mut req = request(&["A"], "fJ3B_18");
        req.constant_correction = "fCONSTCORRPAR".to_string();
        let spec = FitRequestBuilder::new(&catalog).build(&req, &mut reg).unwrap();
        let corr = spec.datasets[0].correction.as_ref().unwrap();
        assert_eq!(corr.n_parameters(), 1);
        assert!(reg.get("B").unwrap().correction.is_some());
    }

    #[test]
    fn shoulder_is_pinned_when_present() {
        let catalog = FunctionCatalog::standard();
        let mut reg = registry(&["A"]);
        let mut req = request(&["A"], "fJ2B_19");
        req.fixed_shoulder = Some(19.2);
        let spec = FitRequestBuilder::new(&catalog).build(&req, &mut reg).unwrap();
        let i = spec.flux_function.shoulder_index().unwrap();
        assert_eq!(spec.flux_function.parameters()[i].value, 19.2);
        assert!(spec.flux_function.parameters()[i].is_fixed());
    }

    #[test]
    fn shoulder_request_ignored_without_logeshld() {
        let catalog = FunctionCatalog::standard();
        let mut reg = registry(&["A"]);
        let mut req = request(&["A"], "fJ2B_18");
        req.fixed_shoulder = Some(19.2);
        let spec = FitRequestBuilder::new(&catalog).build(&req, &mut reg).unwrap();
        assert_eq!(&spec.flux_function, catalog.flux_function("fJ2B_18").unwrap());
    }

    #[test]
    fn window_is_sorted() {
        let catalog = FunctionCatalog::standard();
        let mut reg = registry(&["A"]);
        let mut req = request(&["A"], "fJ3B_18");
        req.log10en_min = 20.0;
        req.log10en_max = 18.5;
        let spec = FitRequestBuilder::new(&catalog).build(&req, &mut reg).unwrap();
        assert_eq!((spec.log10en_min, spec.log10en_max), (18.5, 20.0));
    }

    #[test]
    fn correction_pair_parsing() {
        assert_eq!(
            parse_correction_pair("fCONSTCORR, fNONLINCORR0").unwrap(),
            ("fCONSTCORR".to_string(), "fNONLINCORR0".to_string())
        );
        assert!(parse_correction_pair("fCONSTCORR").is_err());
        assert!(parse_correction_pair("a,b,c").is_err());
        assert!(parse_correction_pair(",b").is_err());
    }
}
