//! Derivative-free minimization of a scalar objective.
//!
//! Wraps argmin's Nelder-Mead. The simplex starts at the initial point plus one
//! step per free coordinate; after convergence the search restarts from the
//! best point with a fresh simplex to avoid premature collapse. Non-finite
//! objective values are replaced by a large penalty so the simplex moves away
//! from non-physical regions.

use argmin::core::{CostFunction, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;

use crate::error::EngineError;

/// Stand-in for non-finite objective values.
pub const PENALTY: f64 = 1e300;

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizerOptions {
    pub max_iters: u64,
    /// Convergence once the standard deviation of simplex costs drops below this.
    pub sd_tolerance: f64,
    /// Extra passes started from the previous best point.
    pub restarts: usize,
}

impl Default for MinimizerOptions {
    fn default() -> Self {
        Self {
            max_iters: 20_000,
            sd_tolerance: 1e-9,
            restarts: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub cost: f64,
    pub converged: bool,
    pub iterations: u64,
    pub message: String,
}

struct Objective<F> {
    f: F,
}

impl<F> CostFunction for Objective<F>
where
    F: Fn(&[f64]) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let v = (self.f)(params.as_slice());
        Ok(if v.is_finite() { v } else { PENALTY })
    }
}

/// Minimize `f` starting at `start` with initial simplex steps `steps`.
pub fn minimize<F>(f: F, start: &[f64], steps: &[f64], opts: &MinimizerOptions) -> Result<Minimum, EngineError>
where
    F: Fn(&[f64]) -> f64,
{
    if start.is_empty() {
        let cost = f(start);
        return Ok(Minimum {
            x: Vec::new(),
            cost,
            converged: cost.is_finite(),
            iterations: 0,
            message: "no free parameters".to_string(),
        });
    }

    let problem = Objective { f };
    let mut best = start.to_vec();
    let mut result = None;
    let mut iterations = 0;

    for _ in 0..=opts.restarts {
        let pass = run_pass(&problem, &best, steps, opts)?;
        iterations += pass.iterations;
        best = pass.x.clone();
        result = Some(pass);
    }

    let mut out = result.ok_or_else(|| EngineError::Minimizer("no minimization pass ran".to_string()))?;
    out.iterations = iterations;
    Ok(out)
}

fn run_pass<F>(problem: &Objective<F>, start: &[f64], steps: &[f64], opts: &MinimizerOptions) -> Result<Minimum, EngineError>
where
    F: Fn(&[f64]) -> f64,
{
    let simplex = initial_simplex(start, steps);
    let solver = NelderMead::new(simplex)
        .with_sd_tolerance(opts.sd_tolerance)
        .map_err(|e| EngineError::Minimizer(format!("invalid tolerance: {e}")))?;

    let res = Executor::new(ObjectiveRef(problem), solver)
        .configure(|state| state.max_iters(opts.max_iters))
        .run()
        .map_err(|e| EngineError::Minimizer(e.to_string()))?;

    let state = res.state();
    let x = state
        .get_best_param()
        .cloned()
        .ok_or_else(|| EngineError::Minimizer("no best parameters found".to_string()))?;
    let termination = state.get_termination_status();
    let converged = matches!(
        termination,
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );

    Ok(Minimum {
        x,
        cost: state.get_best_cost(),
        converged,
        iterations: state.get_iter(),
        message: termination.to_string(),
    })
}

/// Lets one objective be reused across passes without moving it.
struct ObjectiveRef<'a, F>(&'a Objective<F>);

impl<F> CostFunction for ObjectiveRef<'_, F>
where
    F: Fn(&[f64]) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        self.0.cost(params)
    }
}

fn initial_simplex(start: &[f64], steps: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(start.len() + 1);
    simplex.push(start.to_vec());
    for i in 0..start.len() {
        let mut vertex = start.to_vec();
        let step = steps.get(i).copied().filter(|s| *s != 0.0 && s.is_finite()).unwrap_or(0.1);
        vertex[i] += step;
        simplex.push(vertex);
    }
    simplex
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn finds_quadratic_minimum() {
        let f = |p: &[f64]| (p[0] - 2.0).powi(2) + 3.0 * (p[1] + 1.0).powi(2) + 0.5;
        let min = minimize(f, &[0.0, 0.0], &[0.5, 0.5], &MinimizerOptions::default()).unwrap();
        assert!(min.converged, "{}", min.message);
        assert_relative_eq!(min.x[0], 2.0, epsilon = 1e-3);
        assert_relative_eq!(min.x[1], -1.0, epsilon = 1e-3);
        assert_relative_eq!(min.cost, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn non_finite_region_is_avoided() {
        // ln is undefined for p <= 0; the minimum of p - ln p is at p = 1.
        let f = |p: &[f64]| p[0] - p[0].ln();
        let min = minimize(f, &[3.0], &[0.5], &MinimizerOptions::default()).unwrap();
        assert_relative_eq!(min.x[0], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn no_free_parameters_evaluates_once() {
        let min = minimize(|_| 4.0, &[], &[], &MinimizerOptions::default()).unwrap();
        assert!(min.converged);
        assert_eq!(min.cost, 4.0);
    }

    #[test]
    fn simplex_has_one_vertex_per_coordinate() {
        let s = initial_simplex(&[1.0, 2.0], &[0.1, 0.0]);
        assert_eq!(s.len(), 3);
        assert_eq!(s[1], vec![1.1, 2.0]);
        assert_eq!(s[2], vec![1.0, 2.1]);
    }
}
