//! Windowed tile engine.
//!
//! The output lattice is cut into tiles of `tile_size` cells. For each tile
//! the engine reads a halo-padded region of both images into owned
//! `TileBuffer`s, then matches every cell of the tile against those buffers.
//! Buffers are addressed with global indices and patch validity is always
//! decided against the full image extent, so tiling only bounds memory: the
//! results are bit-identical to a single whole-image tile.
//!
//! Tiles share nothing but the read-only sources, so they run sequentially or
//! on the rayon pool (feature `rayon`) with identical output.

use crate::image::Region;
use crate::search::{CellMatch, Frame, Matcher, SearchConfig};
use crate::trace::{trace_event, trace_span};
use crate::util::math::div_ceil;
use crate::util::FineRegResult;

mod buffer;
mod control;
#[cfg(feature = "rayon")]
mod rayon;

pub use buffer::{RegionSource, TileBuffer};
pub use control::{CancelToken, RunControl, TileProgress};

/// One tile of the output lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    /// Position in row-major tile order.
    pub index: usize,
    /// Output cells covered by the tile.
    pub cells: Region,
}

/// Partition of an output lattice into tiles.
#[derive(Clone, Debug, PartialEq)]
pub struct TilePlan {
    out_width: usize,
    out_height: usize,
    tiles: Vec<Tile>,
}

impl TilePlan {
    /// Cuts a `out_width x out_height` lattice into tiles of at most
    /// `tile_size` cells per axis (a zero tile size is treated as 1).
    pub fn new(out_width: usize, out_height: usize, tile_size: [usize; 2]) -> Self {
        let tw = tile_size[0].max(1);
        let th = tile_size[1].max(1);
        let nx = div_ceil(out_width, tw);
        let ny = div_ceil(out_height, th);
        let mut tiles = Vec::with_capacity(nx * ny);
        for ty in 0..ny {
            for tx in 0..nx {
                let x = tx * tw;
                let y = ty * th;
                tiles.push(Tile {
                    index: tiles.len(),
                    cells: Region::new(x, y, tw.min(out_width - x), th.min(out_height - y)),
                });
            }
        }
        Self {
            out_width,
            out_height,
            tiles,
        }
    }

    /// Output lattice width.
    pub fn out_width(&self) -> usize {
        self.out_width
    }

    /// Output lattice height.
    pub fn out_height(&self) -> usize {
        self.out_height
    }

    /// Number of tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// True if the lattice is empty.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tiles in row-major order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }
}

/// Input regions a tile needs, computed from the search geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Halo {
    grid_step: [usize; 2],
    metric_radius: [usize; 2],
    search_radius: [usize; 2],
}

impl Halo {
    pub(crate) fn new(config: &SearchConfig) -> Self {
        Self {
            grid_step: config.grid_step,
            metric_radius: config.metric_radius,
            search_radius: config.search_radius,
        }
    }

    /// Reference pixels spanned by the tile's cells (inclusive bounds).
    fn reference_span(&self, tile: &Tile) -> [usize; 4] {
        let c = tile.cells;
        [
            c.x * self.grid_step[0],
            c.y * self.grid_step[1],
            (c.end_x() - 1) * self.grid_step[0],
            (c.end_y() - 1) * self.grid_step[1],
        ]
    }

    /// Reference read region: the tile grown by the metric radius.
    pub(crate) fn reference_region(
        &self,
        tile: &Tile,
        ref_width: usize,
        ref_height: usize,
    ) -> Option<Region> {
        let [x0, y0, x1, y1] = self.reference_span(tile);
        let [mx, my] = self.metric_radius;
        Region::clamped(
            x0 as isize - mx as isize,
            y0 as isize - my as isize,
            (x1 + mx) as isize,
            (y1 + my) as isize,
            ref_width,
            ref_height,
        )
    }

    /// Secondary read region: the tile mapped through the coarse offset and
    /// grown by `search_radius + metric_radius`, plus one pixel for the
    /// refiner's sub-pixel box and one for bilinear neighbours.
    pub(crate) fn secondary_region(
        &self,
        tile: &Tile,
        frame: &Frame,
        sec_width: usize,
        sec_height: usize,
    ) -> Option<Region> {
        let [x0, y0, x1, y1] = self.reference_span(tile);
        let reach = [
            self.search_radius[0] as f64 + 1.0,
            self.search_radius[1] as f64 + 1.0,
        ];

        let mut lo = [f64::INFINITY; 2];
        let mut hi = [f64::NEG_INFINITY; 2];
        for (ix, iy) in [(x0, y0), (x1, y1)] {
            let point = frame.reference_point(ix, iy);
            for offset in [[-reach[0], -reach[1]], [reach[0], reach[1]]] {
                let c = frame.secondary_center(point, offset);
                for axis in 0..2 {
                    lo[axis] = lo[axis].min(c[axis]);
                    hi[axis] = hi[axis].max(c[axis]);
                }
            }
        }
        if !lo.iter().chain(hi.iter()).all(|v| v.is_finite()) {
            return None;
        }

        let pad_x = self.metric_radius[0] as f64 + 1.0;
        let pad_y = self.metric_radius[1] as f64 + 1.0;
        Region::clamped(
            clamp_to_isize((lo[0] - pad_x).floor()),
            clamp_to_isize((lo[1] - pad_y).floor()),
            clamp_to_isize((hi[0] + pad_x).ceil()),
            clamp_to_isize((hi[1] + pad_y).ceil()),
            sec_width,
            sec_height,
        )
    }
}

fn clamp_to_isize(v: f64) -> isize {
    v.clamp(isize::MIN as f64 / 2.0, isize::MAX as f64 / 2.0) as isize
}

/// Matches of one tile in row-major cell order.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TileOutput {
    pub(crate) tile: Tile,
    pub(crate) cells: Vec<Option<CellMatch>>,
}

/// Loads the tile's halo buffers and matches each of its cells.
pub(crate) fn process_tile<R, S>(
    reference: &R,
    secondary: &S,
    halo: &Halo,
    frame: &Frame,
    matcher: &mut Matcher,
    tile: Tile,
) -> FineRegResult<TileOutput>
where
    R: RegionSource + ?Sized,
    S: RegionSource + ?Sized,
{
    let _span = trace_span!(
        "tile",
        index = tile.index,
        x = tile.cells.x,
        y = tile.cells.y,
        width = tile.cells.width,
        height = tile.cells.height
    )
    .entered();

    let mut cells = vec![None; tile.cells.area()];
    let ref_region = halo.reference_region(&tile, reference.width(), reference.height());
    let sec_region = halo.secondary_region(&tile, frame, secondary.width(), secondary.height());
    let (ref_region, sec_region) = match (ref_region, sec_region) {
        (Some(r), Some(s)) => (r, s),
        _ => return Ok(TileOutput { tile, cells }),
    };

    let ref_buf = TileBuffer::load(reference, ref_region)?;
    let sec_buf = TileBuffer::load(secondary, sec_region)?;

    let mut valid = 0usize;
    for (k, cell) in cells.iter_mut().enumerate() {
        let ox = tile.cells.x + k % tile.cells.width;
        let oy = tile.cells.y + k / tile.cells.width;
        let ix = ox * halo.grid_step[0];
        let iy = oy * halo.grid_step[1];
        *cell = matcher.match_cell(&ref_buf, &sec_buf, ix, iy);
        valid += usize::from(cell.is_some());
    }

    trace_event!("tile_done", index = tile.index, valid = valid);
    Ok(TileOutput { tile, cells })
}

/// Runs every tile in order on the calling thread.
///
/// Stops before starting a tile once cancellation is requested; the tiles
/// already produced are returned intact.
pub(crate) fn run_sequential<R, S>(
    reference: &R,
    secondary: &S,
    config: &SearchConfig,
    frame: &Frame,
    plan: &TilePlan,
    control: &RunControl<'_>,
) -> FineRegResult<Vec<TileOutput>>
where
    R: RegionSource + ?Sized,
    S: RegionSource + ?Sized,
{
    let halo = Halo::new(config);
    let mut matcher = Matcher::new(config, *frame);
    let mut outputs = Vec::with_capacity(plan.len());
    for &tile in plan.tiles() {
        if control.is_cancelled() {
            break;
        }
        let out = process_tile(reference, secondary, &halo, frame, &mut matcher, tile)?;
        outputs.push(out);
        control.report(TileProgress {
            completed: outputs.len(),
            total: plan.len(),
            tile,
        });
    }
    Ok(outputs)
}

#[cfg(feature = "rayon")]
pub(crate) use self::rayon::run_parallel;

#[cfg(test)]
mod tests {
    use super::{Halo, Tile, TilePlan};
    use crate::image::{Geometry, Region};
    use crate::search::{Frame, SearchConfig};

    #[test]
    fn plan_covers_lattice_exactly_once() {
        let plan = TilePlan::new(37, 20, [16, 16]);
        assert_eq!(plan.len(), 6);
        let mut hits = vec![0u8; 37 * 20];
        for (k, tile) in plan.tiles().iter().enumerate() {
            assert_eq!(tile.index, k);
            for y in tile.cells.y..tile.cells.end_y() {
                for x in tile.cells.x..tile.cells.end_x() {
                    hits[y * 37 + x] += 1;
                }
            }
        }
        assert!(hits.iter().all(|&h| h == 1));
        assert_eq!(plan.tiles()[2].cells, Region::new(32, 0, 5, 16));
    }

    #[test]
    fn empty_lattice_has_no_tiles() {
        assert!(TilePlan::new(0, 5, [4, 4]).is_empty());
    }

    #[test]
    fn reference_halo_grows_by_metric_radius() {
        let cfg = SearchConfig {
            metric_radius: [2, 3],
            grid_step: [2, 2],
            ..SearchConfig::default()
        };
        let halo = Halo::new(&cfg);
        let tile = Tile {
            index: 0,
            cells: Region::new(2, 2, 3, 3),
        };
        // Cells 2..=4 map to reference pixels 4..=8.
        let region = halo.reference_region(&tile, 100, 100).unwrap();
        assert_eq!(region, Region::new(2, 1, 9, 11));
        let clamped = halo.reference_region(&tile, 8, 8).unwrap();
        assert_eq!(clamped, Region::new(2, 1, 6, 7));
    }

    #[test]
    fn secondary_halo_follows_coarse_offset() {
        let cfg = SearchConfig {
            metric_radius: [1, 1],
            search_radius: [2, 2],
            ..SearchConfig::default()
        };
        let halo = Halo::new(&cfg);
        let frame = Frame::new(Geometry::default(), Geometry::default(), [10.0, -3.0]);
        let tile = Tile {
            index: 0,
            cells: Region::new(20, 20, 4, 4),
        };
        // x: 20 + 10 - 3 - 2 = 25 .. 23 + 10 + 3 + 2 = 38
        // y: 20 - 3 - 3 - 2 = 12 .. 23 - 3 + 3 + 2 = 25
        let region = halo.secondary_region(&tile, &frame, 100, 100).unwrap();
        assert_eq!(region, Region::new(25, 12, 14, 14));
        assert!(halo.secondary_region(&tile, &frame, 20, 100).is_none());
    }
}
