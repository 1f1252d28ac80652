//! Scalar reference kernel.

use crate::kernel::{Kernel, Products};

/// Straight-line scalar accumulation in `f64`.
pub struct ScalarKernel;

impl Kernel for ScalarKernel {
    #[inline]
    fn sum(a: &[f64]) -> f64 {
        let mut s = 0.0f64;
        for &v in a {
            s += v;
        }
        s
    }

    #[inline]
    fn products(a: &[f64], b: &[f64], shift_a: f64, shift_b: f64) -> Products {
        debug_assert_eq!(a.len(), b.len());
        let mut out = Products::default();
        for (&va, &vb) in a.iter().zip(b) {
            let da = va - shift_a;
            let db = vb - shift_b;
            out.aa += da * da;
            out.bb += db * db;
            out.ab += da * db;
        }
        out
    }

    #[inline]
    fn sum_sq_diff(a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        let mut sse = 0.0f64;
        for (&va, &vb) in a.iter().zip(b) {
            let d = va - vb;
            sse += d * d;
        }
        sse
    }
}
