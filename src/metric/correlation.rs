//! Normalized cross-correlation metrics.

use crate::kernel::{ActiveKernel, Kernel, Products};
use crate::metric::mutual_info::HistogramScratch;
use crate::metric::{Direction, MetricParams};

/// Relative energy below which a patch is treated as degenerate.
const DEGENERATE_EPS: f64 = 1e-12;

/// Raw correlation `Σab / sqrt(Σa² Σb²)`.
pub(super) fn cross_correlation(
    a: &[f64],
    b: &[f64],
    _params: &MetricParams,
    _scratch: &mut HistogramScratch,
) -> f64 {
    let p = ActiveKernel::products(a, b, 0.0, 0.0);
    normalized(p, a.len(), 0.0, 0.0)
}

/// Correlation after subtracting each patch's mean.
///
/// Means are computed first and subtracted inside the second pass, so a
/// constant patch yields an (almost) exactly zero variance instead of the
/// cancellation noise of the one-pass formula.
pub(super) fn cross_correlation_mean_subtracted(
    a: &[f64],
    b: &[f64],
    _params: &MetricParams,
    _scratch: &mut HistogramScratch,
) -> f64 {
    let n = a.len() as f64;
    let mean_a = ActiveKernel::sum(a) / n;
    let mean_b = ActiveKernel::sum(b) / n;
    let p = ActiveKernel::products(a, b, mean_a, mean_b);
    normalized(p, a.len(), mean_a, mean_b)
}

/// Normalizes the cross term; zero-energy patches score the worst value.
fn normalized(p: Products, n: usize, shift_a: f64, shift_b: f64) -> f64 {
    let worst = Direction::Maximize.worst();
    let n = n as f64;
    let tol_a = DEGENERATE_EPS * n * (1.0 + shift_a * shift_a);
    let tol_b = DEGENERATE_EPS * n * (1.0 + shift_b * shift_b);
    if !(p.aa > tol_a) || !(p.bb > tol_b) {
        return worst;
    }
    let denom = (p.aa * p.bb).sqrt();
    let score = p.ab / denom;
    if score.is_finite() {
        score
    } else {
        worst
    }
}
