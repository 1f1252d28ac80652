//! Resampling an image through a deformation field.

use crate::field::DeformationField;
use crate::image::interp::bilinear_at;
use crate::image::Image;
use crate::util::math::split_coord;
use crate::util::FineRegResult;

/// Warps `moving` onto the lattice of `like` using `field`.
///
/// For every pixel of `like`, the displacement is interpolated bilinearly from
/// the field (clamped to its extent, so a coarse grid step is upsampled) and
/// `moving` is sampled at the displaced physical point. Pixels whose
/// displacement is invalid or whose source falls outside `moving` receive
/// `fill`. The result carries the geometry of `like`.
pub fn warp_image(
    field: &DeformationField,
    moving: &Image,
    like: &Image,
    fill: f32,
) -> FineRegResult<Image> {
    let lattice = like.geometry();
    let field_geom = field.geometry();
    let moving_geom = moving.geometry();

    let warped = Image::from_fn(like.width(), like.height(), |x, y| {
        let p = lattice.index_to_physical(x as f64, y as f64);
        let Some(d) = displacement_at(field, field_geom.physical_to_index(p)) else {
            return fill;
        };
        let src = moving_geom.physical_to_index([p[0] + d[0], p[1] + d[1]]);
        bilinear_at(moving, src[0], src[1]).map_or(fill, |v| v as f32)
    })?;
    warped.with_geometry(lattice)
}

/// Bilinear interpolation of the field at continuous index `c`, clamped to
/// the field extent. `None` if a contributing cell is invalid.
fn displacement_at(field: &DeformationField, c: [f64; 2]) -> Option<[f64; 2]> {
    if !c[0].is_finite() || !c[1].is_finite() {
        return None;
    }
    let max_x = field.width().checked_sub(1)? as f64;
    let max_y = field.height().checked_sub(1)? as f64;
    let (ix, fx) = split_coord(c[0].clamp(0.0, max_x));
    let (iy, fy) = split_coord(c[1].clamp(0.0, max_y));
    let (ix, iy) = (ix as usize, iy as usize);

    let mut acc = [0.0; 2];
    for (dy, wy) in [(0, 1.0 - fy), (1, fy)] {
        for (dx, wx) in [(0, 1.0 - fx), (1, fx)] {
            let w = wx * wy;
            if w == 0.0 {
                continue;
            }
            let d = field.get(ix + dx, iy + dy)?;
            if !d[0].is_finite() || !d[1].is_finite() {
                return None;
            }
            acc[0] += w * d[0];
            acc[1] += w * d[1];
        }
    }
    Some(acc)
}

#[cfg(test)]
mod tests {
    use super::warp_image;
    use crate::field::Grid;
    use crate::image::{Geometry, Image};

    #[test]
    fn constant_field_shifts_image() {
        let moving = Image::from_fn(8, 6, |x, y| (x + 10 * y) as f32).unwrap();
        let field = Grid::filled(8, 6, Geometry::default(), [1.0, 0.0]);
        let out = warp_image(&field, &moving, &moving, -1.0).unwrap();
        assert_eq!(out.get(0, 0), Some(1.0));
        assert_eq!(out.get(3, 2), Some(24.0));
        assert_eq!(out.get(7, 2), Some(-1.0));
    }

    #[test]
    fn coarse_field_is_upsampled() {
        let moving = Image::from_fn(9, 9, |x, y| (x + 100 * y) as f32).unwrap();
        let mut field = Grid::filled(3, 3, Geometry::new([0.0, 0.0], [4.0, 4.0]), [0.0, 0.0]);
        for y in 0..3 {
            for x in 0..3 {
                field.set(x, y, [x as f64, 0.0]);
            }
        }
        let out = warp_image(&field, &moving, &moving, 0.0).unwrap();
        // Pixel 2 lies halfway between cells 0 and 1: d = 0.5.
        assert_eq!(out.get(2, 1), Some(102.5));
        // Beyond the last cell the field is clamped: d = 2.
        assert_eq!(out.get(8, 0), Some(0.0));
        assert_eq!(out.get(4, 0), Some(5.0));
        assert_eq!(out.get(6, 0), Some(7.5));
    }

    #[test]
    fn invalid_cells_get_fill() {
        let moving = Image::from_fn(4, 4, |_, _| 5.0).unwrap();
        let field = Grid::filled(4, 4, Geometry::default(), [f64::NAN, f64::NAN]);
        let out = warp_image(&field, &moving, &moving, 7.0).unwrap();
        assert!(out.data().iter().all(|&v| v == 7.0));
    }
}
