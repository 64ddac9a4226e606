//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays free of presentation concerns
//! - output changes are localized

use crate::data::SpectrumRegistry;
use crate::domain::{FitResult, LikelihoodStatistic, ScanPoint, SignificanceResult};
use crate::models::{DEFAULT_FLUX, FunctionCatalog, ParametricFunction};

/// Scientific notation with a signed, at-least-two-digit exponent
/// (`1.234e-05`), the way C's `%e` prints it.
pub fn fmt_sci(v: f64, precision: usize) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    let raw = format!("{v:.precision$e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => raw,
    }
}

/// `(lo - hi) n_expect: X n_observe: Y pchance = Z (W sigma)`
pub fn format_significance(sig: &SignificanceResult) -> String {
    format!(
        "({:.2} - {:.2}) n_expect: {:.3} n_observe: {:.0} pchance = {} ({:.1} sigma)",
        sig.log10en_min,
        sig.log10en_max,
        sig.expected,
        sig.observed,
        fmt_sci(sig.pchance, 3),
        sig.sigma
    )
}

/// `<name> / ndof = <chi2> / <ndof> = <chi2/ndof> Prob. = <p>`
pub fn format_statistic(stat: &LikelihoodStatistic) -> String {
    format!(
        "{} / ndof = {:.2} / {} = {:.1} Prob. = {}",
        stat.kind.display_name(),
        stat.value,
        stat.ndof,
        stat.per_dof(),
        fmt_sci(stat.probability(), 1)
    )
}

/// Parameter table, then the significance line (when the test ran), then the
/// three statistic lines.
pub fn format_fit_result(result: &FitResult, datasets: &[&str], significance: Option<&SignificanceResult>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== specfit - joint fit of {} dataset(s) with {} ===\n",
        datasets.len(),
        result.flux_function
    ));
    out.push_str(&format!("Datasets: {}\n", datasets.join(", ")));
    out.push('\n');

    out.push_str(&format!("{:<4} {:<12} {:>14} {:>12}\n", "#", "parameter", "value", "error"));
    out.push_str(&format!("{:-<4} {:-<12} {:-<14} {:-<12}\n", "", "", "", ""));
    let n_flux = result.flux_parameters().len();
    for (i, p) in result.parameters.iter().enumerate() {
        if i == n_flux {
            out.push_str("     (energy correction)\n");
        }
        let error = if p.is_fixed() {
            "fixed".to_string()
        } else {
            format!("{:.6}", p.error)
        };
        out.push_str(&format!("{:<4} {:<12} {:>14.6} {:>12}\n", i, p.name, p.value, error));
    }
    out.push('\n');

    if let Some(sig) = significance {
        out.push_str(&format_significance(sig));
        out.push('\n');
    }
    for stat in &result.statistics {
        out.push_str(&format_statistic(stat));
        out.push('\n');
    }
    out
}

pub fn format_scan(points: &[ScanPoint], parameter: &str, deltas: bool) -> String {
    let label = if deltas { "delta(-2lnL)" } else { "-2lnL" };
    let mut out = format!("Scan of {parameter}:\n{:>14} {:>14}\n", parameter, label);
    for p in points {
        out.push_str(&format!("{:>14.6} {:>14.4}\n", p.value, p.statistic));
    }
    out
}

/// Available datasets and catalog functions, used for `specfit list`.
pub fn format_listing(registry: &SpectrumRegistry, catalog: &FunctionCatalog) -> String {
    let mut out = String::new();

    out.push_str("Datasets:\n");
    if registry.is_empty() {
        out.push_str("  (none found)\n");
    }
    for name in registry.list_available() {
        let title = registry.get(&name).map(|d| d.title.as_str()).unwrap_or("");
        out.push_str(&format!("  {name:<28} {title}\n"));
    }

    out.push_str("\nFlux functions (J):\n");
    for f in catalog.flux.iter() {
        let marker = if f.name() == DEFAULT_FLUX { "*" } else { " " };
        let d = f.domain();
        out.push_str(&format!(
            "{marker} {:<10} npar={} nbreaks={} domain=[{}, {}]\n",
            f.name(),
            f.n_parameters(),
            f.breaks(),
            d.xmin,
            d.xmax
        ));
    }

    out.push_str("\nConstant corrections:\n");
    for f in catalog.constant.iter() {
        out.push_str(&correction_line(f));
    }
    out.push_str("\nNonlinear corrections:\n");
    for f in catalog.nonlinear.iter() {
        out.push_str(&correction_line(f));
    }
    out
}

fn correction_line<F: ParametricFunction>(f: &F) -> String {
    let d = f.domain();
    format!(
        "  {:<16} npar={} formula={} domain=[{}, {}]\n",
        f.name(),
        f.n_parameters(),
        f.formula(),
        d.xmin,
        d.xmax
    )
}
