//! Squared-difference metrics.

use crate::kernel::{ActiveKernel, Kernel};
use crate::metric::mutual_info::HistogramScratch;
use crate::metric::MetricParams;

/// `Σ(a-b)² / n`, lower is better.
pub(super) fn mean_square_difference(
    a: &[f64],
    b: &[f64],
    _params: &MetricParams,
    _scratch: &mut HistogramScratch,
) -> f64 {
    ActiveKernel::sum_sq_diff(a, b) / a.len() as f64
}

/// `Σ 1 / (1 + (a-b)²/λ) / n`, in `(0, 1]`, higher is better.
///
/// Each term saturates towards zero for large mismatches, so outliers cannot
/// dominate the score.
pub(super) fn mean_reciprocal_square_difference(
    a: &[f64],
    b: &[f64],
    params: &MetricParams,
    _scratch: &mut HistogramScratch,
) -> f64 {
    let lambda = params.mrsd_lambda;
    let mut acc = 0.0f64;
    for (&va, &vb) in a.iter().zip(b) {
        let d = va - vb;
        acc += 1.0 / (1.0 + d * d / lambda);
    }
    acc / a.len() as f64
}
