//! Search configuration and validation.

use crate::field::ValidityThreshold;
use crate::metric::{Direction, MetricKind, MetricParams};
use crate::util::{FineRegError, FineRegResult};

/// How cells near the secondary image border are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BoundaryPolicy {
    /// A cell is invalid unless its whole search window (all candidates plus
    /// the metric radius) lies inside the secondary image.
    #[default]
    Exclude,
    /// Out-of-bounds candidates are skipped individually; a cell is invalid
    /// only if no candidate fits.
    Clip,
}

/// Immutable parameters of a registration run.
///
/// Radii and steps are in pixels; `coarse_offset` and `subpixel_accuracy`
/// are in physical units of the reference geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
    /// Similarity metric; also fixes the optimization direction.
    pub metric: MetricKind,
    /// Patch half-size used for scoring (x, y).
    pub metric_radius: [usize; 2],
    /// Half-size of the integer candidate box (x, y).
    pub search_radius: [usize; 2],
    /// Output sampling stride in reference pixels (x, y).
    pub grid_step: [usize; 2],
    /// Constant bias added to every search, in physical units.
    pub coarse_offset: [f64; 2],
    /// Sub-pixel refinement stops once its step is below this value.
    pub subpixel_accuracy: f64,
    /// Optional threshold producing the validity mask.
    pub validity: Option<ValidityThreshold>,
    /// Border handling for the candidate search.
    pub boundary: BoundaryPolicy,
    /// Output cells per tile (x, y); bounds the working memory.
    pub tile_size: [usize; 2],
    /// Process tiles on the rayon pool (requires the `rayon` feature).
    pub parallel: bool,
    /// Upper bound on refinement rounds per cell.
    pub max_refine_iterations: usize,
    /// Histogram bins per axis for mutual information.
    pub mi_bins: usize,
    /// Saturation scale for the reciprocal square difference.
    pub mrsd_lambda: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            metric: MetricKind::Cc,
            metric_radius: [3, 3],
            search_radius: [3, 3],
            grid_step: [1, 1],
            coarse_offset: [0.0, 0.0],
            subpixel_accuracy: 0.01,
            validity: None,
            boundary: BoundaryPolicy::Exclude,
            tile_size: [64, 64],
            parallel: false,
            max_refine_iterations: 64,
            mi_bins: 16,
            mrsd_lambda: 1.0,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> FineRegError {
    FineRegError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}

impl SearchConfig {
    /// Optimization direction implied by the metric.
    pub fn direction(&self) -> Direction {
        self.metric.direction()
    }

    /// Parameters forwarded to the metric evaluator.
    pub fn metric_params(&self) -> MetricParams {
        MetricParams {
            mi_bins: self.mi_bins,
            mrsd_lambda: self.mrsd_lambda,
        }
    }

    /// Checks every field; called before any pixel is touched.
    pub fn validate(&self) -> FineRegResult<()> {
        if self.metric_radius.contains(&0) {
            return Err(invalid(
                "metric_radius",
                format!("must be at least 1 on each axis, got {:?}", self.metric_radius),
            ));
        }
        if self.grid_step.contains(&0) {
            return Err(invalid(
                "grid_step",
                format!("must be at least 1 on each axis, got {:?}", self.grid_step),
            ));
        }
        if self.tile_size.contains(&0) {
            return Err(invalid(
                "tile_size",
                format!("must be at least 1 on each axis, got {:?}", self.tile_size),
            ));
        }
        if !self.coarse_offset.iter().all(|v| v.is_finite()) {
            return Err(invalid(
                "coarse_offset",
                format!("must be finite, got {:?}", self.coarse_offset),
            ));
        }
        if !(self.subpixel_accuracy.is_finite() && self.subpixel_accuracy > 0.0) {
            return Err(invalid(
                "subpixel_accuracy",
                format!("must be finite and positive, got {}", self.subpixel_accuracy),
            ));
        }
        if self.mi_bins < 2 {
            return Err(invalid(
                "mi_bins",
                format!("must be at least 2, got {}", self.mi_bins),
            ));
        }
        if !(self.mrsd_lambda.is_finite() && self.mrsd_lambda > 0.0) {
            return Err(invalid(
                "mrsd_lambda",
                format!("must be finite and positive, got {}", self.mrsd_lambda),
            ));
        }
        if let Some(threshold) = self.validity {
            if !threshold.value.is_finite() {
                return Err(invalid(
                    "validity",
                    format!("threshold must be finite, got {}", threshold.value),
                ));
            }
        }
        Ok(())
    }
}
