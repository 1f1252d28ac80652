//! Registration output: displacement, score and validity fields.
//!
//! All fields share one output lattice. Cells that could not be matched hold
//! `NaN` in every band and `0.0` in the mask.

use std::fmt;
use std::str::FromStr;

use crate::image::Geometry;
use crate::metric::MetricKind;
use crate::tile::TileOutput;
use crate::util::{FineRegError, FineRegResult};

/// Side of the threshold on which a score counts as valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThresholdDirection {
    /// Valid iff `score < value`.
    LowerThan,
    /// Valid iff `score > value`.
    GreaterThan,
}

impl ThresholdDirection {
    /// Textual token accepted by `FromStr`.
    pub fn token(self) -> &'static str {
        match self {
            ThresholdDirection::LowerThan => "lowerThan",
            ThresholdDirection::GreaterThan => "greaterThan",
        }
    }
}

impl fmt::Display for ThresholdDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ThresholdDirection {
    type Err = FineRegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lowerThan" => Ok(ThresholdDirection::LowerThan),
            "greaterThan" => Ok(ThresholdDirection::GreaterThan),
            _ => Err(FineRegError::InvalidThresholdDirection { got: s.to_string() }),
        }
    }
}

/// Score threshold used to build the validity mask.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValidityThreshold {
    /// Comparison applied to the score.
    pub direction: ThresholdDirection,
    /// Threshold value.
    pub value: f64,
}

impl ValidityThreshold {
    /// Creates a threshold.
    pub fn new(direction: ThresholdDirection, value: f64) -> Self {
        Self { direction, value }
    }

    /// Returns true if `score` passes the threshold. Non-finite scores never
    /// pass.
    pub fn is_valid(&self, score: f64) -> bool {
        if !score.is_finite() {
            return false;
        }
        match self.direction {
            ThresholdDirection::LowerThan => score < self.value,
            ThresholdDirection::GreaterThan => score > self.value,
        }
    }
}

/// Row-major grid of values on the output lattice.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    geometry: Geometry,
    data: Vec<T>,
}

/// Per-cell physical displacement `[dx, dy]`.
pub type DeformationField = Grid<[f64; 2]>;
/// Per-cell score.
pub type ScoreField = Grid<f64>;
/// Per-cell validity, `1.0` valid and `0.0` invalid.
pub type ValidityMask = Grid<f64>;

impl<T: Copy> Grid<T> {
    pub(crate) fn filled(width: usize, height: usize, geometry: Geometry, value: T) -> Self {
        Self {
            width,
            height,
            geometry,
            data: vec![value; width * height],
        }
    }

    /// Grid width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Geometry of the lattice.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Row-major values.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Value at `(x, y)` if in bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    pub(crate) fn set(&mut self, x: usize, y: usize, value: T) {
        if let Some(slot) = self.data.get_mut(y * self.width + x) {
            *slot = value;
        }
    }

    fn map<U, F: Fn(T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            geometry: self.geometry,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }
}

/// Result of a registration run.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistrationOutput {
    /// Physical displacement per cell.
    pub deformation: DeformationField,
    /// Score per cell (absolute value for correlation metrics).
    pub score: ScoreField,
    /// Present when a validity threshold was configured.
    pub mask: Option<ValidityMask>,
    /// Metric used for the scores.
    pub metric: MetricKind,
    /// Tiles processed before the run finished or was cancelled.
    pub completed_tiles: usize,
    /// Tiles in the plan.
    pub total_tiles: usize,
}

impl RegistrationOutput {
    /// Output lattice width.
    pub fn width(&self) -> usize {
        self.deformation.width()
    }

    /// Output lattice height.
    pub fn height(&self) -> usize {
        self.deformation.height()
    }

    /// Output lattice geometry.
    pub fn geometry(&self) -> Geometry {
        self.deformation.geometry()
    }

    /// True if the cell was matched and, when a mask exists, passed the
    /// threshold.
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        let matched = self
            .score
            .get(x, y)
            .is_some_and(|s| !s.is_nan());
        match &self.mask {
            Some(mask) => matched && mask.get(x, y) == Some(1.0),
            None => matched,
        }
    }

    /// True if every tile was processed.
    pub fn is_complete(&self) -> bool {
        self.completed_tiles == self.total_tiles
    }

    /// Splits the output into bands: dx, dy, score and, if present, the mask.
    pub fn to_bands(&self) -> Vec<Grid<f64>> {
        let mut bands = vec![
            self.deformation.map(|d| d[0]),
            self.deformation.map(|d| d[1]),
            self.score.clone(),
        ];
        if let Some(mask) = &self.mask {
            bands.push(mask.clone());
        }
        bands
    }
}

/// Collects tile outputs into the final fields.
pub(crate) struct FieldAssembler {
    metric: MetricKind,
    validity: Option<ValidityThreshold>,
    deformation: DeformationField,
    score: ScoreField,
    mask: Option<ValidityMask>,
}

impl FieldAssembler {
    pub(crate) fn new(
        width: usize,
        height: usize,
        geometry: Geometry,
        metric: MetricKind,
        validity: Option<ValidityThreshold>,
    ) -> Self {
        Self {
            metric,
            validity,
            deformation: Grid::filled(width, height, geometry, [f64::NAN; 2]),
            score: Grid::filled(width, height, geometry, f64::NAN),
            mask: validity.map(|_| Grid::filled(width, height, geometry, 0.0)),
        }
    }

    /// Writes every cell of one tile.
    pub(crate) fn write(&mut self, out: &TileOutput) -> FineRegResult<()> {
        let cells = out.tile.cells;
        if out.cells.len() != cells.area()
            || cells.end_x() > self.deformation.width()
            || cells.end_y() > self.deformation.height()
        {
            return Err(FineRegError::RoiOutOfBounds {
                x: cells.x,
                y: cells.y,
                width: cells.width,
                height: cells.height,
                img_width: self.deformation.width(),
                img_height: self.deformation.height(),
            });
        }

        for (k, cell) in out.cells.iter().enumerate() {
            let Some(m) = cell else { continue };
            let x = cells.x + k % cells.width;
            let y = cells.y + k / cells.width;
            let score = if self.metric.is_correlation() {
                m.score.abs()
            } else {
                m.score
            };
            self.deformation.set(x, y, m.displacement);
            self.score.set(x, y, score);
            if let (Some(mask), Some(threshold)) = (self.mask.as_mut(), self.validity) {
                mask.set(x, y, if threshold.is_valid(score) { 1.0 } else { 0.0 });
            }
        }
        Ok(())
    }

    pub(crate) fn finish(self, completed_tiles: usize, total_tiles: usize) -> RegistrationOutput {
        RegistrationOutput {
            deformation: self.deformation,
            score: self.score,
            mask: self.mask,
            metric: self.metric,
            completed_tiles,
            total_tiles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldAssembler, ThresholdDirection, ValidityThreshold};
    use crate::image::{Geometry, Region};
    use crate::metric::MetricKind;
    use crate::search::CellMatch;
    use crate::tile::{Tile, TileOutput};
    use crate::util::FineRegError;

    #[test]
    fn threshold_direction_parses_tokens() {
        assert_eq!(
            "lowerThan".parse::<ThresholdDirection>().unwrap(),
            ThresholdDirection::LowerThan
        );
        assert_eq!(
            "greaterThan".parse::<ThresholdDirection>().unwrap(),
            ThresholdDirection::GreaterThan
        );
        let err = "above".parse::<ThresholdDirection>().unwrap_err();
        assert!(matches!(err, FineRegError::InvalidThresholdDirection { .. }));
    }

    #[test]
    fn threshold_is_strict_and_rejects_nan() {
        let gt = ValidityThreshold::new(ThresholdDirection::GreaterThan, 0.5);
        assert!(gt.is_valid(0.6));
        assert!(!gt.is_valid(0.5));
        assert!(!gt.is_valid(f64::NAN));
        let lt = ValidityThreshold::new(ThresholdDirection::LowerThan, 0.5);
        assert!(lt.is_valid(0.4));
        assert!(!lt.is_valid(0.5));
        assert!(!lt.is_valid(f64::NEG_INFINITY));
    }

    fn tile_output(cells: Vec<Option<CellMatch>>) -> TileOutput {
        TileOutput {
            tile: Tile {
                index: 0,
                cells: Region::new(1, 0, 2, 1),
            },
            cells,
        }
    }

    #[test]
    fn assembler_takes_absolute_correlation_and_builds_mask() {
        let threshold = ValidityThreshold::new(ThresholdDirection::GreaterThan, 0.9);
        let mut asm = FieldAssembler::new(3, 2, Geometry::default(), MetricKind::Cc, Some(threshold));
        asm.write(&tile_output(vec![
            Some(CellMatch {
                displacement: [0.5, -1.0],
                score: -0.95,
            }),
            Some(CellMatch {
                displacement: [0.0, 0.0],
                score: 0.5,
            }),
        ]))
        .unwrap();
        let out = asm.finish(1, 1);

        assert_eq!(out.score.get(1, 0), Some(0.95));
        assert_eq!(out.deformation.get(1, 0), Some([0.5, -1.0]));
        assert!(out.is_valid(1, 0));
        assert!(!out.is_valid(2, 0));
        assert_eq!(out.mask.as_ref().unwrap().get(2, 0), Some(0.0));
        assert!(out.score.get(0, 0).unwrap().is_nan());
        assert!(!out.is_valid(0, 0));
        assert!(out.is_complete());

        let bands = out.to_bands();
        assert_eq!(bands.len(), 4);
        assert_eq!(bands[0].get(1, 0), Some(0.5));
        assert_eq!(bands[1].get(1, 0), Some(-1.0));
        assert_eq!(bands[3].get(1, 0), Some(1.0));
    }

    #[test]
    fn difference_scores_keep_their_sign_and_no_mask_without_threshold() {
        let mut asm = FieldAssembler::new(3, 1, Geometry::default(), MetricKind::Msd, None);
        asm.write(&tile_output(vec![
            Some(CellMatch {
                displacement: [1.0, 1.0],
                score: 2.5,
            }),
            None,
        ]))
        .unwrap();
        let out = asm.finish(1, 2);
        assert!(out.mask.is_none());
        assert_eq!(out.to_bands().len(), 3);
        assert_eq!(out.score.get(1, 0), Some(2.5));
        assert!(!out.is_valid(2, 0));
        assert!(!out.is_complete());
    }

    #[test]
    fn assembler_rejects_tile_outside_lattice() {
        let mut asm = FieldAssembler::new(2, 1, Geometry::default(), MetricKind::Msd, None);
        assert!(asm.write(&tile_output(vec![None, None])).is_err());
    }
}
