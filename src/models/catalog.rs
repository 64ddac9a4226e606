//! Named function catalogs.
//!
//! The `FunctionCatalog` holds three sub-catalogs (flux models, constant
//! corrections, nonlinear corrections). Lookups never fall back silently: an
//! unknown name is a `CatalogError::NotFound` listing the valid choices.

use crate::error::CatalogError;
use crate::models::correction::{
    CompositeCorrection, ConstantCorrection, CorrectionFunction, CorrectionShape, NonlinearCorrection, compose,
};
use crate::models::flux::{FluxFunction, FluxKind};
use crate::models::function::ParametricFunction;

/// An insertion-ordered set of functions keyed by name.
#[derive(Debug, Clone)]
pub struct Catalog<T> {
    kind: &'static str,
    entries: Vec<T>,
}

impl<T: ParametricFunction> Catalog<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Add a function, replacing any entry with the same name in place.
    pub fn register(&mut self, function: T) {
        match self.entries.iter().position(|f| f.name() == function.name()) {
            Some(i) => self.entries[i] = function,
            None => self.entries.push(function),
        }
    }

    pub fn lookup(&self, name: &str) -> Result<&T, CatalogError> {
        self.entries
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| CatalogError::NotFound {
                kind: self.kind,
                name: name.to_string(),
                valid: self.names(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|f| f.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FunctionCatalog {
    pub flux: Catalog<FluxFunction>,
    pub constant: Catalog<CorrectionFunction<ConstantCorrection>>,
    pub nonlinear: Catalog<CorrectionFunction<NonlinearCorrection>>,
}

impl FunctionCatalog {
    pub fn empty() -> Self {
        Self {
            flux: Catalog::new("flux"),
            constant: Catalog::new(ConstantCorrection::KIND),
            nonlinear: Catalog::new(NonlinearCorrection::KIND),
        }
    }

    /// The built-in flux models and correction terms.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        for kind in FluxKind::ALL {
            catalog.flux.register(kind.function());
        }
        for shape in ConstantCorrection::all() {
            catalog.constant.register(CorrectionFunction::new(*shape));
        }
        for shape in NonlinearCorrection::all() {
            catalog.nonlinear.register(CorrectionFunction::new(*shape));
        }
        catalog
    }

    pub fn flux_function(&self, name: &str) -> Result<&FluxFunction, CatalogError> {
        self.flux.lookup(name)
    }

    /// Look up both terms of a correction pair and compose them with unit scales.
    pub fn correction(&self, constant: &str, nonlinear: &str) -> Result<CompositeCorrection, CatalogError> {
        let c = self.constant.lookup(constant)?;
        let n = self.nonlinear.lookup(nonlinear)?;
        compose(c, n, 1.0, 1.0, None)
    }
}

impl Default for FunctionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
