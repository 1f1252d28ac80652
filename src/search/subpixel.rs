//! Sub-pixel refinement of the best integer candidate.
//!
//! Pattern search on the continuous offset plane: evaluate the eight
//! neighbours at the current step, move to the best strictly improving one,
//! otherwise halve the step. The search stays inside the open one-pixel box
//! around the integer optimum and stops once the step, in physical units,
//! drops below the configured accuracy or the round budget is spent.

use crate::image::interp::sample_patch;
use crate::image::SampleGrid;
use crate::metric::Evaluator;
use crate::search::candidates::IntegerBest;
use crate::search::{CellMatch, Frame, SearchConfig};
use crate::util::math::max_abs;

/// Initial step in reference pixels.
const INITIAL_STEP: f64 = 0.5;

/// Neighbour directions in scan order (rows outer, columns inner).
const NEIGHBOURS: [[f64; 2]; 8] = [
    [-1.0, -1.0],
    [0.0, -1.0],
    [1.0, -1.0],
    [-1.0, 0.0],
    [1.0, 0.0],
    [-1.0, 1.0],
    [0.0, 1.0],
    [1.0, 1.0],
];

#[allow(clippy::too_many_arguments)]
pub(crate) fn refine<S>(
    secondary: &S,
    frame: &Frame,
    config: &SearchConfig,
    point: [f64; 2],
    ref_patch: &[f64],
    evaluator: &mut Evaluator,
    sec_patch: &mut Vec<f64>,
    start: IntegerBest,
) -> CellMatch
where
    S: SampleGrid + ?Sized,
{
    let direction = evaluator.direction();
    let base = [start.offset[0] as f64, start.offset[1] as f64];
    let pixel_size = max_abs(frame.reference.spacing);

    let mut delta = [0.0f64, 0.0];
    let mut score = start.score;
    let mut step = INITIAL_STEP;

    for _ in 0..config.max_refine_iterations {
        if step * pixel_size < config.subpixel_accuracy {
            break;
        }

        let mut best_move: Option<[f64; 2]> = None;
        let mut best_score = score;
        for dir in NEIGHBOURS {
            let cand = [delta[0] + dir[0] * step, delta[1] + dir[1] * step];
            if cand[0].abs() >= 1.0 || cand[1].abs() >= 1.0 {
                continue;
            }
            let center = frame.secondary_center(point, [base[0] + cand[0], base[1] + cand[1]]);
            if sample_patch(secondary, center, config.metric_radius, sec_patch).is_none() {
                continue;
            }
            let s = evaluator.score(ref_patch, sec_patch);
            if direction.is_better(s, best_score) {
                best_score = s;
                best_move = Some(cand);
            }
        }

        match best_move {
            Some(cand) => {
                delta = cand;
                score = best_score;
            }
            None => step *= 0.5,
        }
    }

    CellMatch {
        displacement: frame.translation([base[0] + delta[0], base[1] + delta[1]]),
        score,
    }
}
