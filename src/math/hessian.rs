//! Parameter uncertainties from the curvature of a deviance surface.
//!
//! For a statistic `D = -2 ln L` the covariance of the estimates is
//!
//! ```text
//! cov = 2 * H^-1,   H_ij = ∂²D / ∂θ_i ∂θ_j
//! ```
//!
//! i.e. a change of 1 in `D` is one standard deviation. `H` is estimated by
//! central finite differences.

use nalgebra::DMatrix;

/// Central-difference Hessian of `f` at `x` with per-coordinate steps `h`.
pub fn numerical_hessian<F>(f: F, x: &[f64], h: &[f64]) -> DMatrix<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let n = x.len();
    let f0 = f(x);
    let mut hess = DMatrix::zeros(n, n);
    let mut p = x.to_vec();

    let shifted = |p: &mut Vec<f64>, moves: &[(usize, f64)]| {
        for &(i, d) in moves {
            p[i] += d;
        }
        let v = f(p.as_slice());
        for &(i, d) in moves {
            p[i] -= d;
        }
        v
    };

    for i in 0..n {
        let hi = h[i];
        let fp = shifted(&mut p, &[(i, hi)]);
        let fm = shifted(&mut p, &[(i, -hi)]);
        hess[(i, i)] = (fp - 2.0 * f0 + fm) / (hi * hi);

        for j in (i + 1)..n {
            let hj = h[j];
            let fpp = shifted(&mut p, &[(i, hi), (j, hj)]);
            let fpm = shifted(&mut p, &[(i, hi), (j, -hj)]);
            let fmp = shifted(&mut p, &[(i, -hi), (j, hj)]);
            let fmm = shifted(&mut p, &[(i, -hi), (j, -hj)]);
            let v = (fpp - fpm - fmp + fmm) / (4.0 * hi * hj);
            hess[(i, j)] = v;
            hess[(j, i)] = v;
        }
    }
    hess
}

/// Standard errors `sqrt(diag(2 H^-1))`.
///
/// Returns `None` if `H` is singular or the implied variances are not
/// positive and finite.
pub fn deviance_errors(hessian: &DMatrix<f64>) -> Option<Vec<f64>> {
    if hessian.nrows() == 0 {
        return Some(Vec::new());
    }
    let inv = hessian.clone().try_inverse()?;
    let mut out = Vec::with_capacity(inv.nrows());
    for i in 0..inv.nrows() {
        let var = 2.0 * inv[(i, i)];
        if !(var.is_finite() && var > 0.0) {
            return None;
        }
        out.push(var.sqrt());
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quadratic_hessian_is_exact() {
        // D = (x-1)^2 / s1^2 + (y+2)^2 / s2^2  ->  errors sqrt(2 * s^2 / 2) = s
        let (s1, s2) = (0.5, 3.0);
        let f = |p: &[f64]| (p[0] - 1.0).powi(2) / (s1 * s1) + (p[1] + 2.0).powi(2) / (s2 * s2);
        let hess = numerical_hessian(f, &[1.0, -2.0], &[1e-3, 1e-3]);
        assert_relative_eq!(hess[(0, 1)], 0.0, epsilon = 1e-6);

        let errors = deviance_errors(&hess).unwrap();
        assert_relative_eq!(errors[0], s1, max_relative = 1e-5);
        assert_relative_eq!(errors[1], s2, max_relative = 1e-5);
    }

    #[test]
    fn flat_direction_has_no_errors() {
        let f = |p: &[f64]| p[0] * p[0];
        let hess = numerical_hessian(f, &[0.0, 5.0], &[1e-3, 1e-3]);
        assert!(deviance_errors(&hess).is_none());
    }
}
