//! Energy-scale correction terms and their composition.
//!
//! Corrections describe a fractional energy shift `δ(x)`; a bin at `x` is
//! moved to `x + log10(1 + δ(x))` and its flux scaled by `1 + δ(x)`.

use serde::Serialize;

use crate::error::CatalogError;
use crate::models::function::{Domain, Parameter, ParametricFunction};

/// Default correction pair, `CONSTANT,NONLINEAR`.
pub const DEFAULT_CORRECTION_PAIR: (&str, &str) = ("fNOCONSTCORR", "fNONONLINCORR");

/// Domain shared by all built-in correction terms.
pub const CORRECTION_DOMAIN: Domain = Domain {
    xmin: 17.0,
    xmax: 21.0,
};

/// Shape of a correction term: name, formula and how to evaluate it.
pub trait CorrectionShape: Copy + std::fmt::Debug {
    /// Sub-catalog label used in listings and lookup errors.
    const KIND: &'static str;

    fn all() -> &'static [Self];
    fn name(self) -> &'static str;
    fn formula(self) -> &'static str;
    fn default_parameters(self) -> Vec<Parameter>;
    fn eval(self, x: f64, params: &[f64]) -> f64;
}

/// Energy-independent shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstantCorrection {
    None,
    Fixed,
    Free,
}

impl CorrectionShape for ConstantCorrection {
    const KIND: &'static str = "constant correction";

    fn all() -> &'static [Self] {
        &[
            ConstantCorrection::None,
            ConstantCorrection::Fixed,
            ConstantCorrection::Free,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            ConstantCorrection::None => "fNOCONSTCORR",
            ConstantCorrection::Fixed => "fCONSTCORR",
            ConstantCorrection::Free => "fCONSTCORRPAR",
        }
    }

    fn formula(self) -> &'static str {
        match self {
            ConstantCorrection::None => "0.0",
            ConstantCorrection::Fixed => "0.052",
            ConstantCorrection::Free => "[S0]",
        }
    }

    fn default_parameters(self) -> Vec<Parameter> {
        match self {
            ConstantCorrection::Free => vec![Parameter::new("S0", 0.052, 0.01)],
            _ => Vec::new(),
        }
    }

    fn eval(self, _x: f64, params: &[f64]) -> f64 {
        match self {
            ConstantCorrection::None => 0.0,
            ConstantCorrection::Fixed => 0.052,
            ConstantCorrection::Free => params.first().copied().unwrap_or(f64::NAN),
        }
    }
}

/// Energy-dependent shifts switched on above a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NonlinearCorrection {
    None,
    Step,
    Ramp,
    FreeStep,
    FreeRamp,
}

impl CorrectionShape for NonlinearCorrection {
    const KIND: &'static str = "nonlinear correction";

    fn all() -> &'static [Self] {
        &[
            NonlinearCorrection::None,
            NonlinearCorrection::Step,
            NonlinearCorrection::Ramp,
            NonlinearCorrection::FreeStep,
            NonlinearCorrection::FreeRamp,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            NonlinearCorrection::None => "fNONONLINCORR",
            NonlinearCorrection::Step => "fNONLINCORR0",
            NonlinearCorrection::Ramp => "fNONLINCORR1",
            NonlinearCorrection::FreeStep => "fNONLINCORRPAR0",
            NonlinearCorrection::FreeRamp => "fNONLINCORRPAR1",
        }
    }

    fn formula(self) -> &'static str {
        match self {
            NonlinearCorrection::None => "0.0",
            NonlinearCorrection::Step => "(x>19.5)*0.08",
            NonlinearCorrection::Ramp => "(x>19.0)*(0.1*(x-19.0))",
            NonlinearCorrection::FreeStep => "(x>[logEs])*[S]",
            NonlinearCorrection::FreeRamp => "(x>[logEs])*([slope]*(x-[logEs]))",
        }
    }

    fn default_parameters(self) -> Vec<Parameter> {
        match self {
            NonlinearCorrection::FreeStep => vec![
                Parameter::new("logEs", 19.5, 0.1),
                Parameter::new("S", 0.08, 0.01),
            ],
            NonlinearCorrection::FreeRamp => vec![
                Parameter::new("logEs", 19.5, 0.1),
                Parameter::new("slope", 0.1, 0.01),
            ],
            _ => Vec::new(),
        }
    }

    fn eval(self, x: f64, params: &[f64]) -> f64 {
        let step = |threshold: f64| if x > threshold { 1.0 } else { 0.0 };
        match self {
            NonlinearCorrection::None => 0.0,
            NonlinearCorrection::Step => step(19.5) * 0.08,
            NonlinearCorrection::Ramp => step(19.0) * (0.1 * (x - 19.0)),
            NonlinearCorrection::FreeStep | NonlinearCorrection::FreeRamp => {
                let [threshold, amount] = match params {
                    [a, b, ..] => [*a, *b],
                    _ => return f64::NAN,
                };
                if self == NonlinearCorrection::FreeStep {
                    step(threshold) * amount
                } else {
                    step(threshold) * (amount * (x - threshold))
                }
            }
        }
    }
}

/// A single catalog entry: a shape with its own parameter state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionFunction<S> {
    shape: S,
    domain: Domain,
    params: Vec<Parameter>,
}

impl<S: CorrectionShape> CorrectionFunction<S> {
    pub fn new(shape: S) -> Self {
        Self {
            shape,
            domain: CORRECTION_DOMAIN,
            params: shape.default_parameters(),
        }
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    pub fn shape(&self) -> S {
        self.shape
    }
}

impl<S: CorrectionShape> ParametricFunction for CorrectionFunction<S> {
    fn name(&self) -> &str {
        self.shape.name()
    }

    fn formula(&self) -> String {
        self.shape.formula().to_string()
    }

    fn domain(&self) -> Domain {
        self.domain
    }

    fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.params
    }

    fn eval_with(&self, x: f64, params: &[f64]) -> f64 {
        self.shape.eval(x, params)
    }
}

/// `scale_a * constant(x) + scale_b * nonlinear(x)`.
///
/// Parameters are the constant term's followed by the nonlinear term's; the
/// composite owns copies, so fitting it never touches the catalog entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeCorrection {
    name: String,
    constant: ConstantCorrection,
    nonlinear: NonlinearCorrection,
    scale_a: f64,
    scale_b: f64,
    domain: Domain,
    params: Vec<Parameter>,
    split: usize,
}

impl CompositeCorrection {
    pub fn constant(&self) -> ConstantCorrection {
        self.constant
    }

    pub fn nonlinear(&self) -> NonlinearCorrection {
        self.nonlinear
    }

    /// Multiplicative energy factor `1 + δ(x)`.
    pub fn energy_factor_with(&self, x: f64, params: &[f64]) -> f64 {
        1.0 + self.eval_with(x, params)
    }

    pub fn energy_factor(&self, x: f64) -> f64 {
        1.0 + self.eval(x)
    }

    /// Translate a nominal `log10(E)` onto this correction's energy scale.
    pub fn shift_log_energy(&self, x: f64) -> f64 {
        x + self.energy_factor(x).log10()
    }

    pub fn is_identity(&self) -> bool {
        self.constant == ConstantCorrection::None && self.nonlinear == NonlinearCorrection::None
    }
}

impl ParametricFunction for CompositeCorrection {
    fn name(&self) -> &str {
        &self.name
    }

    fn formula(&self) -> String {
        format!(
            "{}*({}) + {}*({})",
            self.scale_a,
            self.constant.formula(),
            self.scale_b,
            self.nonlinear.formula()
        )
    }

    fn domain(&self) -> Domain {
        self.domain
    }

    fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.params
    }

    fn eval_with(&self, x: f64, params: &[f64]) -> f64 {
        let split = self.split.min(params.len());
        let (a, b) = params.split_at(split);
        self.scale_a * self.constant.eval(x, a) + self.scale_b * self.nonlinear.eval(x, b)
    }
}

/// Compose a constant and a nonlinear term into one correction.
///
/// The two domains must agree unless `domain_override` is given.
pub fn compose(
    constant: &CorrectionFunction<ConstantCorrection>,
    nonlinear: &CorrectionFunction<NonlinearCorrection>,
    scale_a: f64,
    scale_b: f64,
    domain_override: Option<Domain>,
) -> Result<CompositeCorrection, CatalogError> {
    let domain = match domain_override {
        Some(d) => d,
        None if constant.domain() == nonlinear.domain() => constant.domain(),
        None => {
            return Err(CatalogError::IncompatibleDomain {
                constant: constant.name().to_string(),
                constant_domain: constant.domain().as_tuple(),
                nonlinear: nonlinear.name().to_string(),
                nonlinear_domain: nonlinear.domain().as_tuple(),
            });
        }
    };

    let mut params = constant.parameters().to_vec();
    params.extend_from_slice(nonlinear.parameters());

    Ok(CompositeCorrection {
        name: format!("{}+{}", constant.name(), nonlinear.name()),
        constant: constant.shape(),
        nonlinear: nonlinear.shape(),
        scale_a,
        scale_b,
        domain,
        params,
        split: constant.n_parameters(),
    })
}
