//! Separable Gaussian blur with clamp-to-edge borders.

use crate::image::Image;
use crate::util::{FineRegError, FineRegResult};

/// Normalized 1D Gaussian taps of radius `ceil(3 sigma)`.
///
/// `sigma == 0` yields the identity kernel `[1.0]`.
pub fn gaussian_kernel(sigma: f64) -> FineRegResult<Vec<f64>> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(FineRegError::InvalidConfig {
            field: "sigma",
            reason: format!("must be finite and >= 0, got {sigma}"),
        });
    }
    if sigma == 0.0 {
        return Ok(vec![1.0]);
    }
    let radius = (3.0 * sigma).ceil() as isize;
    let denom = 2.0 * sigma * sigma;
    let mut taps: Vec<f64> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / denom).exp())
        .collect();
    let sum: f64 = taps.iter().sum();
    for t in &mut taps {
        *t /= sum;
    }
    Ok(taps)
}

/// Blurs `image` with per-axis standard deviations `sigma` (in pixels).
///
/// An axis with zero sigma is left untouched. The geometry is preserved.
pub fn gaussian_blur(image: &Image, sigma: [f64; 2]) -> FineRegResult<Image> {
    let kx = gaussian_kernel(sigma[0])?;
    let ky = gaussian_kernel(sigma[1])?;
    let (w, h) = (image.width(), image.height());
    let src: Vec<f64> = image.data().iter().map(|&v| f64::from(v)).collect();

    let horizontal = convolve(&src, w, h, &kx, 1, w);
    let vertical = convolve(&horizontal, w, h, &ky, w, h);

    let data = vertical.into_iter().map(|v| v as f32).collect();
    Image::new(data, w, h)?.with_geometry(image.geometry())
}

/// 1D convolution along the axis with element step `step` and length `len`.
fn convolve(src: &[f64], w: usize, h: usize, taps: &[f64], step: usize, len: usize) -> Vec<f64> {
    if taps.len() == 1 {
        return src.to_vec();
    }
    let radius = (taps.len() / 2) as isize;
    let last = len as isize - 1;
    let mut dst = vec![0.0; src.len()];
    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let pos = (if step == 1 { x } else { y }) as isize;
            let base = idx - pos as usize * step;
            let mut acc = 0.0;
            for (k, &t) in taps.iter().enumerate() {
                let p = (pos + k as isize - radius).clamp(0, last) as usize;
                acc += t * src[base + p * step];
            }
            dst[idx] = acc;
        }
    }
    dst
}
