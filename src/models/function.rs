//! The parametric 1-D function abstraction shared by flux models and energy
//! corrections.
//!
//! Functions are plain values: cloning one gives an independent instance with
//! its own parameter state (the null-hypothesis copy relies on this).

use serde::{Deserialize, Serialize};

/// One named parameter with its current value and uncertainty.
///
/// An error of exactly `0.0` marks the parameter as fixed during fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
    pub error: f64,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: f64, error: f64) -> Self {
        Self {
            name: name.into(),
            value,
            error,
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.error == 0.0
    }
}

/// Closed interval `[xmin, xmax]` in `log10(E/eV)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub xmin: f64,
    pub xmax: f64,
}

impl Domain {
    pub fn new(xmin: f64, xmax: f64) -> Self {
        Self { xmin, xmax }
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.xmin && x <= self.xmax
    }

    pub fn as_tuple(&self) -> (f64, f64) {
        (self.xmin, self.xmax)
    }
}

pub trait ParametricFunction {
    fn name(&self) -> &str;

    /// Human-readable formula over `x` and the parameter names.
    fn formula(&self) -> String;

    fn domain(&self) -> Domain;

    fn parameters(&self) -> &[Parameter];

    fn parameters_mut(&mut self) -> &mut [Parameter];

    /// Evaluate at `x` with an explicit parameter vector (same order as
    /// `parameters()`). Used by the minimizer to avoid mutating the function.
    fn eval_with(&self, x: f64, params: &[f64]) -> f64;

    fn eval(&self, x: f64) -> f64 {
        self.eval_with(x, &self.parameter_values())
    }

    fn n_parameters(&self) -> usize {
        self.parameters().len()
    }

    fn parameter_values(&self) -> Vec<f64> {
        self.parameters().iter().map(|p| p.value).collect()
    }

    fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters().iter().position(|p| p.name == name)
    }

    /// Overwrite values (and optionally errors) in parameter order. Extra
    /// entries are ignored.
    fn set_parameters(&mut self, values: &[f64], errors: Option<&[f64]>) {
        for (i, p) in self.parameters_mut().iter_mut().enumerate() {
            if let Some(v) = values.get(i) {
                p.value = *v;
            }
            if let Some(e) = errors.and_then(|e| e.get(i)) {
                p.error = *e;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_error_means_fixed() {
        assert!(Parameter::new("a", 1.0, 0.0).is_fixed());
        assert!(!Parameter::new("a", 1.0, 0.1).is_fixed());
    }

    #[test]
    fn domain_is_closed() {
        let d = Domain::new(18.0, 21.0);
        assert!(d.contains(18.0));
        assert!(d.contains(21.0));
        assert!(!d.contains(21.000001));
    }
}
