//! Poisson chance probabilities and their Gaussian-sigma equivalents.
//!
//! Sigma convention is one-sided: `sigma` is the point where the standard
//! normal upper tail equals the chance probability,
//! `pchance = 0.5 * erfc(sigma / sqrt(2))`.

use statrs::distribution::{ChiSquared, ContinuousCDF};
use statrs::function::erf::{erfc, erfc_inv};
use statrs::function::gamma::gamma_lr;

/// Probability of observing at least `observed` events when `expected` are
/// expected. `observed` is truncated to an integer.
///
/// With `as_sigma` the probability is converted with [`pchance_to_sigma`].
pub fn poisson_pchance(observed: f64, expected: f64, as_sigma: bool) -> f64 {
    let p = poisson_upper_tail(observed, expected);
    if as_sigma { pchance_to_sigma(p) } else { p }
}

fn poisson_upper_tail(observed: f64, expected: f64) -> f64 {
    let n = observed.trunc().max(0.0);
    if expected <= 0.0 {
        return if n == 0.0 { 1.0 } else { 0.0 };
    }
    if n == 0.0 {
        return 1.0;
    }
    // P(X >= n) for X ~ Poisson(λ) equals the regularized lower incomplete
    // gamma function P(n, λ).
    gamma_lr(n, expected).clamp(0.0, 1.0)
}

/// One-sided Gaussian significance of a chance probability.
///
/// `p >= 0.5` maps to 0 and `p == 0` to `+inf`.
pub fn pchance_to_sigma(p: f64) -> f64 {
    if p.is_nan() {
        return f64::NAN;
    }
    if p >= 0.5 {
        return 0.0;
    }
    if p <= 0.0 {
        return f64::INFINITY;
    }
    std::f64::consts::SQRT_2 * erfc_inv(2.0 * p)
}

/// Inverse of [`pchance_to_sigma`] for `sigma >= 0`.
pub fn sigma_to_pchance(sigma: f64) -> f64 {
    0.5 * erfc(sigma / std::f64::consts::SQRT_2)
}

/// Upper-tail χ² probability of `chi2` with `ndof` degrees of freedom; 0 when
/// `ndof <= 0`.
pub fn chi2_prob(chi2: f64, ndof: i64) -> f64 {
    if ndof <= 0 || !chi2.is_finite() {
        return 0.0;
    }
    ChiSquared::new(ndof as f64)
        .map(|d| d.sf(chi2.max(0.0)))
        .unwrap_or(0.0)
}

/// Linear width of a bin centred at `log10en` with full log-width `log10_width`.
pub fn lin_bin_size(log10en: f64, log10_width: f64) -> f64 {
    10f64.powf(log10en + 0.5 * log10_width) - 10f64.powf(log10en - 0.5 * log10_width)
}
