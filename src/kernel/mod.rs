//! Moment accumulators used by the similarity metrics.
//!
//! A kernel reduces a pair of equally sized patches to the handful of sums
//! the metrics need. The scalar kernel is the reference; the `simd` feature
//! swaps in a `wide`-based kernel. Within one build every caller uses the
//! same kernel, so results stay bit-identical across tiles and threads.

/// Centered second-order sums over a patch pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Products {
    /// `Σ (a - shift_a)²`.
    pub aa: f64,
    /// `Σ (b - shift_b)²`.
    pub bb: f64,
    /// `Σ (a - shift_a)(b - shift_b)`.
    pub ab: f64,
}

/// Reduction kernel over patch slices.
pub trait Kernel {
    /// Sum of all samples.
    fn sum(a: &[f64]) -> f64;

    /// Second-order sums after subtracting `shift_a` / `shift_b`.
    fn products(a: &[f64], b: &[f64], shift_a: f64, shift_b: f64) -> Products;

    /// Sum of squared differences.
    fn sum_sq_diff(a: &[f64], b: &[f64]) -> f64;
}

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(not(feature = "simd"))]
pub(crate) use scalar::ScalarKernel as ActiveKernel;
#[cfg(feature = "simd")]
pub(crate) use simd::SimdKernel as ActiveKernel;
