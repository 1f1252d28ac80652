//! Tile-parallel driver (feature-gated).
//!
//! Each worker owns a `Matcher` created through `map_init`; tiles are
//! independent, so the collected outputs equal the sequential ones.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use super::{process_tile, Halo, RegionSource, RunControl, TileOutput, TilePlan, TileProgress};
use crate::search::{Frame, Matcher, SearchConfig};
use crate::util::FineRegResult;

/// Runs the plan on the rayon pool.
///
/// Tiles not yet started when cancellation is observed are skipped; the
/// returned outputs keep plan order.
pub(crate) fn run_parallel<R, S>(
    reference: &R,
    secondary: &S,
    config: &SearchConfig,
    frame: &Frame,
    plan: &TilePlan,
    control: &RunControl<'_>,
) -> FineRegResult<Vec<TileOutput>>
where
    R: RegionSource + Sync + ?Sized,
    S: RegionSource + Sync + ?Sized,
{
    let halo = Halo::new(config);
    let completed = AtomicUsize::new(0);
    let total = plan.len();

    let results: Vec<FineRegResult<Option<TileOutput>>> = plan
        .tiles()
        .par_iter()
        .map_init(
            || Matcher::new(config, *frame),
            |matcher, &tile| {
                if control.is_cancelled() {
                    return Ok(None);
                }
                let out = process_tile(reference, secondary, &halo, frame, matcher, tile)?;
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                control.report(TileProgress {
                    completed: done,
                    total,
                    tile,
                });
                Ok(Some(out))
            },
        )
        .collect();

    let mut outputs = Vec::with_capacity(total);
    for result in results {
        if let Some(out) = result? {
            outputs.push(out);
        }
    }
    Ok(outputs)
}
