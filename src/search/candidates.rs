//! Integer candidate enumeration.
//!
//! Candidates are visited rows outer, columns inner, each ascending from
//! `-radius` to `+radius`. Only strictly better scores replace the incumbent,
//! so the first candidate in scan order wins ties; the result is therefore
//! independent of how cells are scheduled.

use crate::image::interp::{patch_fits, sample_patch};
use crate::image::SampleGrid;
use crate::metric::Evaluator;
use crate::search::{BoundaryPolicy, Frame, SearchConfig};

/// Best integer candidate of a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct IntegerBest {
    /// Offset in reference pixels relative to the coarse offset.
    pub(crate) offset: [isize; 2],
    pub(crate) score: f64,
}

/// Returns true if every candidate patch of the search box fits inside the
/// secondary image.
///
/// The secondary index is affine in each offset component, so checking the
/// two opposite corners of the box covers all candidates.
pub(crate) fn search_box_fits(
    sec_dims: (usize, usize),
    frame: &Frame,
    config: &SearchConfig,
    point: [f64; 2],
) -> bool {
    let rx = config.search_radius[0] as f64;
    let ry = config.search_radius[1] as f64;
    let (w, h) = sec_dims;
    [[-rx, -ry], [rx, ry]].iter().all(|&offset| {
        patch_fits(
            w,
            h,
            frame.secondary_center(point, offset),
            config.metric_radius,
        )
    })
}

/// Scans all integer offsets and returns the best admissible one.
///
/// `None` means the cell is invalid: the search box violates the boundary
/// policy, no candidate patch fits, or every score was degenerate.
pub(crate) fn scan_candidates<S>(
    secondary: &S,
    frame: &Frame,
    config: &SearchConfig,
    point: [f64; 2],
    ref_patch: &[f64],
    evaluator: &mut Evaluator,
    sec_patch: &mut Vec<f64>,
) -> Option<IntegerBest>
where
    S: SampleGrid + ?Sized,
{
    if config.boundary == BoundaryPolicy::Exclude
        && !search_box_fits(secondary.dims(), frame, config, point)
    {
        return None;
    }

    let direction = evaluator.direction();
    let rx = config.search_radius[0] as isize;
    let ry = config.search_radius[1] as isize;
    let mut best: Option<IntegerBest> = None;

    for j in -ry..=ry {
        for i in -rx..=rx {
            let center = frame.secondary_center(point, [i as f64, j as f64]);
            if sample_patch(secondary, center, config.metric_radius, sec_patch).is_none() {
                continue;
            }
            let mut score = evaluator.score(ref_patch, sec_patch);
            if score.is_nan() {
                score = direction.worst();
            }
            let replace = match best {
                None => true,
                Some(current) => direction.is_better(score, current.score),
            };
            if replace {
                best = Some(IntegerBest {
                    offset: [i, j],
                    score,
                });
            }
        }
    }

    best.filter(|b| b.score.is_finite())
}
