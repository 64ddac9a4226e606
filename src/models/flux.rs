//! Broken-power-law flux models `J(E)`.
//!
//! With `n` breaks the parameter vector is `[const, p1..p(n+1), b1..bn]` and,
//! writing `u = x - xmin` with `xmin` the lower edge of the domain the function
//! was built with (later domain changes do not move it),
//!
//! `J(x) = const * scale * Σ_k [segment k] * 10^(pcf_k + p(k+1) * u)`
//!
//! where segment 0 is `x < b1`, segment `k` is `b_k <= x < b_(k+1)` and the last
//! segment is `b_n <= x`. The offsets `pcf_k` keep `log10 J` continuous at the
//! breaks.

use serde::Serialize;

use crate::models::function::{Domain, Parameter, ParametricFunction};

pub const SHOULDER_PARAM: &str = "logEshld";
pub const GZK_PARAM: &str = "logEgzk";

/// Name of the flux function used when none is requested.
pub const DEFAULT_FLUX: &str = "fJ3B_18";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FluxFunction {
    name: String,
    breaks: usize,
    scale: f64,
    /// `xmin` of the construction domain; the origin of `u = x - xmin`.
    log10en_ref: f64,
    domain: Domain,
    params: Vec<Parameter>,
}

impl FluxFunction {
    /// Build a broken power law. The break count is derived from the
    /// parameter count, `(npar - 2) / 2`.
    pub fn new(name: impl Into<String>, scale: f64, domain: Domain, params: Vec<Parameter>) -> Self {
        let breaks = params.len().saturating_sub(2) / 2;
        Self {
            name: name.into(),
            breaks,
            scale,
            log10en_ref: domain.xmin,
            domain,
            params,
        }
    }

    pub fn breaks(&self) -> usize {
        self.breaks
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Reference energy of the power-law segments. Fixed at construction.
    pub fn log10en_ref(&self) -> f64 {
        self.log10en_ref
    }

    pub fn shoulder_index(&self) -> Option<usize> {
        self.parameter_index(SHOULDER_PARAM)
    }

    pub fn gzk_index(&self) -> Option<usize> {
        self.parameter_index(GZK_PARAM)
    }

    /// Whether the shoulder significance test applies to this function.
    pub fn has_shoulder(&self) -> bool {
        self.shoulder_index().is_some() && self.gzk_index().is_some()
    }

    /// Change the evaluation interval. The power-law reference stays put.
    pub fn set_domain(&mut self, domain: Domain) {
        self.domain = domain;
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl ParametricFunction for FluxFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn formula(&self) -> String {
        let n = self.breaks;
        let xmin = self.log10en_ref;
        let names: Vec<&str> = self.params.iter().map(|p| p.name.as_str()).collect();
        if names.len() < 2 * n + 2 {
            return String::new();
        }
        let slope = |k: usize| names[1 + k];
        let brk = |j: usize| names[n + 2 + j];

        let mut segments = Vec::with_capacity(n + 1);
        if n == 0 {
            segments.push(format!("10^([{}]*(x-{xmin}))", slope(0)));
        } else {
            segments.push(format!("(x<[{}])*10^([{}]*(x-{xmin}))", brk(0), slope(0)));
            for k in 1..=n {
                let upper = if k < n {
                    format!("*(x<[{}])", brk(k))
                } else {
                    String::new()
                };
                segments.push(format!(
                    "(x>=[{}]){upper}*10^(pcf{k}+[{}]*(x-{xmin}))",
                    brk(k - 1),
                    slope(k)
                ));
            }
        }
        format!("[{}]*{:e}*({})", names[0], self.scale, segments.join(" + "))
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
        broken_power_law(x, self.log10en_ref, self.scale, self.breaks, params)
    }
}

/// Evaluate a broken power law with `n` breaks.
///
/// Segment indicators are evaluated independently, so a segment whose lower
/// break is not below its upper break contributes nothing.
pub fn broken_power_law(x: f64, xmin: f64, scale: f64, n: usize, params: &[f64]) -> f64 {
    if params.len() < 2 * n + 2 {
        return f64::NAN;
    }
    let norm = params[0] * scale;
    let u = x - xmin;
    let slope = |k: usize| params[1 + k];
    let brk = |j: usize| params[n + 2 + j];

    if n == 0 {
        return norm * 10f64.powf(slope(0) * u);
    }

    let mut sum = 0.0;
    if x < brk(0) {
        sum += 10f64.powf(slope(0) * u);
    }
    let mut pcf = 0.0;
    for k in 1..=n {
        pcf += (slope(k - 1) - slope(k)) * (brk(k - 1) - xmin);
        let above_lower = brk(k - 1) <= x;
        let below_upper = k == n || x < brk(k);
        if above_lower && below_upper {
            sum += 10f64.powf(pcf + slope(k) * u);
        }
    }
    norm * sum
}

/// The built-in flux models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxKind {
    TwoBreaks18,
    ThreeBreaks18,
    OneBreak19,
    TwoBreaks19,
}

impl FluxKind {
    pub const ALL: [FluxKind; 4] = [
        FluxKind::TwoBreaks18,
        FluxKind::ThreeBreaks18,
        FluxKind::OneBreak19,
        FluxKind::TwoBreaks19,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FluxKind::TwoBreaks18 => "fJ2B_18",
            FluxKind::ThreeBreaks18 => "fJ3B_18",
            FluxKind::OneBreak19 => "fJ1B_19",
            FluxKind::TwoBreaks19 => "fJ2B_19",
        }
    }

    pub fn function(self) -> FluxFunction {
        let (scale, domain, spec): (f64, Domain, &[(&str, f64)]) = match self {
            FluxKind::TwoBreaks18 => (
                1e-30,
                Domain::new(18.0, 21.0),
                &[
                    ("const", 2.0),
                    ("p1", -3.25),
                    ("p2", -2.7),
                    ("p3", -4.2),
                    ("logEank", 18.75),
                    (GZK_PARAM, 19.75),
                ],
            ),
            FluxKind::ThreeBreaks18 => (
                1e-30,
                Domain::new(18.0, 21.0),
                &[
                    ("const", 2.0),
                    ("p1", -3.25),
                    ("p2", -2.7),
                    ("p3", -3.0),
                    ("p4", -5.1),
                    ("logEank", 18.75),
                    (SHOULDER_PARAM, 19.1),
                    (GZK_PARAM, 19.7),
                ],
            ),
            FluxKind::OneBreak19 => (
                1e-33,
                Domain::new(18.8, 21.0),
                &[("const", 2.0), ("p1", -2.7), ("p2", -4.2), (GZK_PARAM, 19.75)],
            ),
            FluxKind::TwoBreaks19 => (
                1e-33,
                Domain::new(18.8, 21.0),
                &[
                    ("const", 6.0),
                    ("p1", -2.8),
                    ("p2", -2.9),
                    ("p3", -5.1),
                    (SHOULDER_PARAM, 19.1),
                    (GZK_PARAM, 19.7),
                ],
            ),
        };
        let params = spec
            .iter()
            .map(|(name, value)| Parameter::new(*name, *value, 0.1))
            .collect();
        FluxFunction::new(self.name(), scale, domain, params)
    }
}
