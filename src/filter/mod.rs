//! Pre-registration smoothing.

mod gaussian;

pub use gaussian::{gaussian_blur, gaussian_kernel};
