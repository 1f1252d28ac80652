//! Per-cell displacement search.
//!
//! For one output cell the `Matcher` samples the reference patch, scans the
//! integer candidate box (`candidates`), then refines the best candidate to
//! sub-pixel accuracy (`subpixel`). All positions are expressed as offsets in
//! reference pixels and converted to physical translations through `Frame`.

use crate::image::interp::sample_patch;
use crate::image::{Geometry, SampleGrid};
use crate::metric::Evaluator;

pub(crate) mod candidates;
mod config;
pub(crate) mod subpixel;

pub use config::{BoundaryPolicy, SearchConfig};

/// Estimated displacement and score of one output cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellMatch {
    /// Physical translation `(dx, dy)` from the reference point to the
    /// matching secondary point.
    pub displacement: [f64; 2],
    /// Raw metric score at the optimum.
    pub score: f64,
}

/// Coordinate bridge between the reference lattice and the secondary image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Frame {
    pub(crate) reference: Geometry,
    pub(crate) secondary: Geometry,
    pub(crate) coarse_offset: [f64; 2],
}

impl Frame {
    pub(crate) fn new(reference: Geometry, secondary: Geometry, coarse_offset: [f64; 2]) -> Self {
        Self {
            reference,
            secondary,
            coarse_offset,
        }
    }

    /// Physical point of a reference pixel.
    #[inline]
    pub(crate) fn reference_point(&self, ix: usize, iy: usize) -> [f64; 2] {
        self.reference.index_to_physical(ix as f64, iy as f64)
    }

    /// Physical translation for an offset given in reference pixels.
    #[inline]
    pub(crate) fn translation(&self, offset: [f64; 2]) -> [f64; 2] {
        [
            self.coarse_offset[0] + offset[0] * self.reference.spacing[0],
            self.coarse_offset[1] + offset[1] * self.reference.spacing[1],
        ]
    }

    /// Continuous secondary index matched to `point` under `offset`.
    #[inline]
    pub(crate) fn secondary_center(&self, point: [f64; 2], offset: [f64; 2]) -> [f64; 2] {
        let t = self.translation(offset);
        self.secondary
            .physical_to_index([point[0] + t[0], point[1] + t[1]])
    }
}

/// Reusable per-worker cell matcher.
pub(crate) struct Matcher {
    config: SearchConfig,
    frame: Frame,
    evaluator: Evaluator,
    ref_patch: Vec<f64>,
    sec_patch: Vec<f64>,
}

impl Matcher {
    pub(crate) fn new(config: &SearchConfig, frame: Frame) -> Self {
        let len = (2 * config.metric_radius[0] + 1) * (2 * config.metric_radius[1] + 1);
        Self {
            config: config.clone(),
            frame,
            evaluator: Evaluator::new(config.metric, config.metric_params()),
            ref_patch: Vec::with_capacity(len),
            sec_patch: Vec::with_capacity(len),
        }
    }

    /// Estimates the displacement at reference pixel `(ix, iy)`.
    ///
    /// Returns `None` for invalid cells: reference patch outside the image,
    /// no admissible candidate, or only degenerate scores.
    pub(crate) fn match_cell<R, S>(
        &mut self,
        reference: &R,
        secondary: &S,
        ix: usize,
        iy: usize,
    ) -> Option<CellMatch>
    where
        R: SampleGrid + ?Sized,
        S: SampleGrid + ?Sized,
    {
        let radius = self.config.metric_radius;
        sample_patch(
            reference,
            [ix as f64, iy as f64],
            radius,
            &mut self.ref_patch,
        )?;

        let point = self.frame.reference_point(ix, iy);
        let best = candidates::scan_candidates(
            secondary,
            &self.frame,
            &self.config,
            point,
            &self.ref_patch,
            &mut self.evaluator,
            &mut self.sec_patch,
        )?;

        Some(subpixel::refine(
            secondary,
            &self.frame,
            &self.config,
            point,
            &self.ref_patch,
            &mut self.evaluator,
            &mut self.sec_patch,
            best,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{Frame, Matcher, SearchConfig};
    use crate::image::{Geometry, Image};
    use crate::metric::MetricKind;

    fn texture(width: usize, height: usize) -> Image {
        Image::from_fn(width, height, |x, y| {
            let (xf, yf) = (x as f32, y as f32);
            100.0 + 30.0 * (0.45 * xf).sin() * (0.3 * yf).cos() + 10.0 * (0.2 * (xf + 2.0 * yf)).sin()
        })
        .unwrap()
    }

    #[test]
    fn frame_converts_offsets_through_both_geometries() {
        let frame = Frame::new(
            Geometry::new([10.0, 20.0], [2.0, -2.0]),
            Geometry::new([10.0, 20.0], [1.0, -1.0]),
            [1.0, 0.0],
        );
        let p = frame.reference_point(3, 4);
        assert_eq!(p, [16.0, 12.0]);
        assert_eq!(frame.translation([1.0, 1.0]), [3.0, -2.0]);
        assert_eq!(frame.secondary_center(p, [1.0, 1.0]), [9.0, 10.0]);
    }

    #[test]
    fn matcher_finds_integer_shift() {
        let reference = texture(40, 40);
        let secondary = Image::from_fn(40, 40, |x, y| {
            let sx = x as isize - 2;
            let sy = y as isize + 1;
            if sx < 0 || sy < 0 || sy >= 40 {
                0.0
            } else {
                reference.get(sx as usize, sy as usize).unwrap_or(0.0)
            }
        })
        .unwrap();

        let cfg = SearchConfig {
            metric: MetricKind::Ccsm,
            metric_radius: [4, 4],
            search_radius: [4, 4],
            ..SearchConfig::default()
        };
        let frame = Frame::new(Geometry::default(), Geometry::default(), [0.0, 0.0]);
        let mut matcher = Matcher::new(&cfg, frame);
        let m = matcher.match_cell(&reference, &secondary, 20, 20).unwrap();
        assert!((m.displacement[0] - 2.0).abs() < 1e-9);
        assert!((m.displacement[1] + 1.0).abs() < 1e-9);
        assert!((m.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn matcher_rejects_reference_patch_on_border() {
        let reference = texture(20, 20);
        let cfg = SearchConfig::default();
        let frame = Frame::new(Geometry::default(), Geometry::default(), [0.0, 0.0]);
        let mut matcher = Matcher::new(&cfg, frame);
        assert!(matcher.match_cell(&reference, &reference, 1, 10).is_none());
    }
}
