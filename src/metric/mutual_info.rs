//! Mutual information from a Parzen-windowed joint intensity histogram.
//!
//! Each patch is mapped onto `bins` over its own `[min, max]` range, which
//! makes the score invariant to per-patch affine intensity changes. Every
//! sample spreads its unit weight over four neighbouring bins with a cubic
//! B-spline, so the score varies continuously with sub-pixel shifts.

use crate::metric::MetricParams;

/// Bins touched by one sample and their B-spline weights.
type BinWeights = [(usize, f64); 4];

/// Reusable histogram buffers.
#[derive(Debug, Default)]
pub(crate) struct HistogramScratch {
    joint: Vec<f64>,
    hist_a: Vec<f64>,
    hist_b: Vec<f64>,
}

impl HistogramScratch {
    fn reset(&mut self, bins: usize) {
        self.joint.clear();
        self.joint.resize(bins * bins, 0.0);
        self.hist_a.clear();
        self.hist_a.resize(bins, 0.0);
        self.hist_b.clear();
        self.hist_b.resize(bins, 0.0);
    }
}

fn value_range(values: &[f64]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    (lo, hi)
}

/// Cubic B-spline, support `(-2, 2)`, partition of unity.
#[inline]
fn cubic_bspline(t: f64) -> f64 {
    let t = t.abs();
    if t < 1.0 {
        (4.0 - 6.0 * t * t + 3.0 * t * t * t) / 6.0
    } else if t < 2.0 {
        let u = 2.0 - t;
        u * u * u / 6.0
    } else {
        0.0
    }
}

/// Spreads `v` over the bins around its continuous bin position.
///
/// Bins beyond either end fold onto the edge bin so the weights still sum
/// to one. A flat range puts everything in bin 0.
#[inline]
fn bin_weights(v: f64, lo: f64, hi: f64, bins: usize) -> BinWeights {
    let mut out = [(0usize, 0.0f64); 4];
    if !(hi > lo) {
        out[0] = (0, 1.0);
        return out;
    }
    let last = (bins - 1) as isize;
    let t = (v - lo) / (hi - lo) * last as f64;
    let k0 = t.floor() as isize;
    for (slot, k) in out.iter_mut().zip(k0 - 1..=k0 + 2) {
        *slot = (k.clamp(0, last) as usize, cubic_bspline(t - k as f64));
    }
    out
}

/// `Σ p(a,b) ln(p(a,b) / (p(a) p(b)))`, in nats; higher is better.
pub(super) fn mutual_information(
    a: &[f64],
    b: &[f64],
    params: &MetricParams,
    scratch: &mut HistogramScratch,
) -> f64 {
    let bins = params.mi_bins.max(2);
    let (lo_a, hi_a) = value_range(a);
    let (lo_b, hi_b) = value_range(b);
    scratch.reset(bins);

    for (&va, &vb) in a.iter().zip(b) {
        let wa = bin_weights(va, lo_a, hi_a, bins);
        let wb = bin_weights(vb, lo_b, hi_b, bins);
        for &(ia, pa) in &wa {
            if pa <= 0.0 {
                continue;
            }
            scratch.hist_a[ia] += pa;
            let row = &mut scratch.joint[ia * bins..(ia + 1) * bins];
            for &(ib, pb) in &wb {
                row[ib] += pa * pb;
            }
        }
        for &(ib, pb) in &wb {
            scratch.hist_b[ib] += pb;
        }
    }

    let n = a.len().min(b.len()) as f64;
    let mut mi = 0.0f64;
    for ia in 0..bins {
        let ca = scratch.hist_a[ia];
        if ca <= 0.0 {
            continue;
        }
        let row = &scratch.joint[ia * bins..(ia + 1) * bins];
        for (ib, &cab) in row.iter().enumerate() {
            if cab <= 0.0 {
                continue;
            }
            let cb = scratch.hist_b[ib];
            mi += cab / n * (cab * n / (ca * cb)).ln();
        }
    }
    mi
}

#[cfg(test)]
mod tests {
    use super::{bin_weights, mutual_information, HistogramScratch};
    use crate::metric::MetricParams;

    fn mi(a: &[f64], b: &[f64]) -> f64 {
        mutual_information(a, b, &MetricParams::default(), &mut HistogramScratch::default())
    }

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn bin_weights_sum_to_one() {
        for v in [0.0, 0.3, 7.5, 14.99, 15.0] {
            let total: f64 = bin_weights(v, 0.0, 15.0, 16).iter().map(|w| w.1).sum();
            assert!((total - 1.0).abs() < 1e-12, "v {v}: {total}");
        }
        assert_eq!(bin_weights(4.0, 2.0, 2.0, 16)[0], (0, 1.0));
    }

    #[test]
    fn identical_patch_beats_permuted_patch() {
        let a = ramp(25);
        let permuted: Vec<f64> = (0..25).map(|i| ((7 * i) % 25) as f64).collect();
        assert!(mi(&a, &a) > mi(&a, &permuted) + 0.5);
    }

    #[test]
    fn constant_patch_has_zero_information() {
        let a = [0.0, 1.0, 2.0, 3.0];
        let flat = [7.0; 4];
        assert!(mi(&a, &flat).abs() < 1e-12);
    }

    #[test]
    fn mi_is_invariant_to_inversion() {
        let a = [0.0, 1.0, 2.0, 3.0, 5.0, 8.0];
        let b: Vec<f64> = a.iter().map(|v| 100.0 - 3.0 * v).collect();
        assert!((mi(&a, &b) - mi(&a, &a)).abs() < 1e-9);
    }

    #[test]
    fn tiny_perturbation_on_a_bin_edge_barely_moves_the_score() {
        let a = ramp(17);
        let mut b = a.clone();
        b[5] -= 1e-9;
        assert!((mi(&a, &a) - mi(&a, &b)).abs() < 1e-9);
    }
}
