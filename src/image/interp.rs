//! Bilinear sampling and patch extraction.
//!
//! Interpolation weights are always derived from the global continuous
//! coordinate, never from a coordinate relative to a buffer origin, so a tile
//! buffer and the full image produce bit-identical samples.

use crate::image::Image;
use crate::util::math::split_coord;

/// Source of scalar samples addressed by global pixel indices.
pub trait SampleGrid {
    /// Full extent `(width, height)` of the underlying image. Patch validity
    /// is always decided against this extent.
    fn dims(&self) -> (usize, usize);

    /// Returns the sample at global index `(x, y)` if it is readable.
    fn sample(&self, x: usize, y: usize) -> Option<f32>;
}

impl SampleGrid for Image {
    fn dims(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    #[inline]
    fn sample(&self, x: usize, y: usize) -> Option<f32> {
        self.get(x, y)
    }
}

/// Interpolates between `(x, y)` and its +1 neighbours with weights `fx, fy`.
///
/// Neighbours with a zero weight are not read, so integer positions on the
/// last row or column are valid.
#[inline]
fn interpolate<G: SampleGrid + ?Sized>(grid: &G, x: usize, y: usize, fx: f64, fy: f64) -> Option<f64> {
    let v00 = f64::from(grid.sample(x, y)?);
    let top = if fx > 0.0 {
        let v10 = f64::from(grid.sample(x + 1, y)?);
        v00 + fx * (v10 - v00)
    } else {
        v00
    };
    if fy > 0.0 {
        let v01 = f64::from(grid.sample(x, y + 1)?);
        let bottom = if fx > 0.0 {
            let v11 = f64::from(grid.sample(x + 1, y + 1)?);
            v01 + fx * (v11 - v01)
        } else {
            v01
        };
        Some(top + fy * (bottom - top))
    } else {
        Some(top)
    }
}

/// Samples `grid` at continuous index `(cx, cy)`.
///
/// Returns `None` when the position or one of its non-zero-weight neighbours
/// falls outside the grid.
pub(crate) fn bilinear_at<G: SampleGrid + ?Sized>(grid: &G, cx: f64, cy: f64) -> Option<f64> {
    if !cx.is_finite() || !cy.is_finite() {
        return None;
    }
    let (ix, fx) = split_coord(cx);
    let (iy, fy) = split_coord(cy);
    if ix < 0 || iy < 0 {
        return None;
    }
    let (w, h) = grid.dims();
    let last_x = ix + isize::from(fx > 0.0);
    let last_y = iy + isize::from(fy > 0.0);
    if last_x >= w as isize || last_y >= h as isize {
        return None;
    }
    interpolate(grid, ix as usize, iy as usize, fx, fy)
}

/// Returns true when a patch of `radius` centred at `center` lies inside a
/// `width x height` image, including the bilinear neighbours it needs.
pub(crate) fn patch_fits(width: usize, height: usize, center: [f64; 2], radius: [usize; 2]) -> bool {
    if !center[0].is_finite() || !center[1].is_finite() {
        return false;
    }
    let (ix, fx) = split_coord(center[0]);
    let (iy, fy) = split_coord(center[1]);
    let rx = radius[0] as isize;
    let ry = radius[1] as isize;
    ix - rx >= 0
        && iy - ry >= 0
        && ix + rx + isize::from(fx > 0.0) < width as isize
        && iy + ry + isize::from(fy > 0.0) < height as isize
}

/// Samples the `(2*rx+1) x (2*ry+1)` patch centred at `center` into `out`
/// (row-major). Returns `None` if the patch does not fit.
///
/// The centre is split once into floor and fraction; every sample reuses the
/// same fraction so the patch is a pure function of `center`.
pub(crate) fn sample_patch<G: SampleGrid + ?Sized>(
    grid: &G,
    center: [f64; 2],
    radius: [usize; 2],
    out: &mut Vec<f64>,
) -> Option<()> {
    let (w, h) = grid.dims();
    if !patch_fits(w, h, center, radius) {
        return None;
    }
    let (ix, fx) = split_coord(center[0]);
    let (iy, fy) = split_coord(center[1]);
    let rx = radius[0] as isize;
    let ry = radius[1] as isize;

    out.clear();
    for v in -ry..=ry {
        let y = (iy + v) as usize;
        for u in -rx..=rx {
            let x = (ix + u) as usize;
            out.push(interpolate(grid, x, y, fx, fy)?);
        }
    }
    Some(())
}
