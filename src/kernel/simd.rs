//! SIMD-accelerated kernel using the `wide` crate.
//!
//! Processes four `f64` lanes at a time with a scalar tail. The horizontal
//! reduction order is fixed, so the kernel is deterministic.

use crate::kernel::{Kernel, Products};
use wide::f64x4;

const LANES: usize = 4;

/// Load 4 f64 values into f64x4.
#[inline]
fn load_f64x4(slice: &[f64]) -> f64x4 {
    f64x4::from([slice[0], slice[1], slice[2], slice[3]])
}

/// Horizontal sum of f64x4.
#[inline]
fn hsum(v: f64x4) -> f64 {
    let arr = v.to_array();
    (arr[0] + arr[1]) + (arr[2] + arr[3])
}

/// `wide::f64x4` kernel.
pub struct SimdKernel;

impl Kernel for SimdKernel {
    fn sum(a: &[f64]) -> f64 {
        let simd_end = a.len() / LANES * LANES;
        let mut acc = f64x4::ZERO;
        let mut i = 0;
        while i < simd_end {
            acc += load_f64x4(&a[i..]);
            i += LANES;
        }
        let mut tail = 0.0f64;
        for &v in &a[simd_end..] {
            tail += v;
        }
        hsum(acc) + tail
    }

    fn products(a: &[f64], b: &[f64], shift_a: f64, shift_b: f64) -> Products {
        debug_assert_eq!(a.len(), b.len());
        let len = a.len().min(b.len());
        let simd_end = len / LANES * LANES;
        let sa = f64x4::splat(shift_a);
        let sb = f64x4::splat(shift_b);
        let mut aa = f64x4::ZERO;
        let mut bb = f64x4::ZERO;
        let mut ab = f64x4::ZERO;

        let mut i = 0;
        while i < simd_end {
            let da = load_f64x4(&a[i..]) - sa;
            let db = load_f64x4(&b[i..]) - sb;
            aa += da * da;
            bb += db * db;
            ab += da * db;
            i += LANES;
        }

        let mut out = Products {
            aa: hsum(aa),
            bb: hsum(bb),
            ab: hsum(ab),
        };
        for j in simd_end..len {
            let da = a[j] - shift_a;
            let db = b[j] - shift_b;
            out.aa += da * da;
            out.bb += db * db;
            out.ab += da * db;
        }
        out
    }

    fn sum_sq_diff(a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        let len = a.len().min(b.len());
        let simd_end = len / LANES * LANES;
        let mut acc = f64x4::ZERO;
        let mut i = 0;
        while i < simd_end {
            let d = load_f64x4(&a[i..]) - load_f64x4(&b[i..]);
            acc += d * d;
            i += LANES;
        }
        let mut sse = hsum(acc);
        for j in simd_end..len {
            let d = a[j] - b[j];
            sse += d * d;
        }
        sse
    }
}
