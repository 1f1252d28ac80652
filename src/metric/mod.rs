//! Patch similarity metrics.
//!
//! The metric set is closed: `MetricKind` is an enum and each kind is
//! statically paired with its optimization `Direction` and with a strategy
//! function selected by `match`. MSD is the only minimized metric.

use crate::util::FineRegError;
use std::fmt;
use std::str::FromStr;

mod correlation;
mod difference;
mod mutual_info;

use mutual_info::HistogramScratch;

/// Optimization direction of a metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Higher scores are better matches.
    Maximize,
    /// Lower scores are better matches.
    Minimize,
}

impl Direction {
    /// Returns true if `candidate` is strictly better than `incumbent`.
    ///
    /// Equal scores are not an improvement, so the first candidate seen wins
    /// ties. NaN never wins.
    #[inline]
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::Maximize => candidate > incumbent,
            Direction::Minimize => candidate < incumbent,
        }
    }

    /// The worst possible score in this direction.
    #[inline]
    pub fn worst(self) -> f64 {
        match self {
            Direction::Maximize => f64::NEG_INFINITY,
            Direction::Minimize => f64::INFINITY,
        }
    }
}

/// Similarity metric used to score a patch pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Normalized cross-correlation without mean subtraction.
    #[default]
    Cc,
    /// Normalized cross-correlation with per-patch mean subtracted.
    Ccsm,
    /// Mean square difference.
    Msd,
    /// Mean reciprocal square difference.
    Mrsd,
    /// Mutual information of the Parzen-windowed joint intensity histogram.
    Mi,
}

impl MetricKind {
    /// All supported metrics in declaration order.
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Cc,
        MetricKind::Ccsm,
        MetricKind::Msd,
        MetricKind::Mrsd,
        MetricKind::Mi,
    ];

    /// Optimization direction paired with this metric.
    pub fn direction(self) -> Direction {
        match self {
            MetricKind::Cc | MetricKind::Ccsm | MetricKind::Mrsd | MetricKind::Mi => {
                Direction::Maximize
            }
            MetricKind::Msd => Direction::Minimize,
        }
    }

    /// True for the correlation family, whose output scores are reported as
    /// absolute values.
    pub fn is_correlation(self) -> bool {
        matches!(self, MetricKind::Cc | MetricKind::Ccsm)
    }

    /// Short token used on the command line.
    pub fn token(self) -> &'static str {
        match self {
            MetricKind::Cc => "CC",
            MetricKind::Ccsm => "CCSM",
            MetricKind::Msd => "MSD",
            MetricKind::Mrsd => "MRSD",
            MetricKind::Mi => "MI",
        }
    }

    /// Human readable name.
    pub fn description(self) -> &'static str {
        match self {
            MetricKind::Cc => "Cross-correlation",
            MetricKind::Ccsm => "Cross-correlation (mean subtracted)",
            MetricKind::Msd => "Mean square difference",
            MetricKind::Mrsd => "Mean reciprocal square difference",
            MetricKind::Mi => "Mutual information",
        }
    }

    fn strategy(self) -> MetricFn {
        match self {
            MetricKind::Cc => correlation::cross_correlation,
            MetricKind::Ccsm => correlation::cross_correlation_mean_subtracted,
            MetricKind::Msd => difference::mean_square_difference,
            MetricKind::Mrsd => difference::mean_reciprocal_square_difference,
            MetricKind::Mi => mutual_info::mutual_information,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for MetricKind {
    type Err = FineRegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.token().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FineRegError::UnknownMetric { got: s.to_owned() })
    }
}

/// Tuning knobs for metrics that take parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricParams {
    /// Histogram bins per axis for mutual information.
    pub mi_bins: usize,
    /// Saturation scale of the reciprocal square difference.
    pub mrsd_lambda: f64,
}

impl Default for MetricParams {
    fn default() -> Self {
        Self {
            mi_bins: 16,
            mrsd_lambda: 1.0,
        }
    }
}

type MetricFn = fn(&[f64], &[f64], &MetricParams, &mut HistogramScratch) -> f64;

/// Reusable metric evaluator holding the strategy and its scratch buffers.
///
/// One evaluator is owned per worker; it carries no state between calls
/// other than buffer capacity.
pub struct Evaluator {
    kind: MetricKind,
    params: MetricParams,
    strategy: MetricFn,
    scratch: HistogramScratch,
}

impl Evaluator {
    /// Creates an evaluator for `kind`.
    pub fn new(kind: MetricKind, params: MetricParams) -> Self {
        Self {
            kind,
            params,
            strategy: kind.strategy(),
            scratch: HistogramScratch::default(),
        }
    }

    /// Metric evaluated by this instance.
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Optimization direction of the metric.
    pub fn direction(&self) -> Direction {
        self.kind.direction()
    }

    /// Scores a reference patch `a` against a secondary patch `b`.
    ///
    /// Both slices hold the same patch layout. Degenerate inputs return
    /// `Direction::worst()` rather than failing.
    pub fn score(&mut self, a: &[f64], b: &[f64]) -> f64 {
        if a.is_empty() || a.len() != b.len() {
            return self.direction().worst();
        }
        (self.strategy)(a, b, &self.params, &mut self.scratch)
    }
}

/// Scores a patch pair with a one-off evaluator.
pub fn evaluate(kind: MetricKind, a: &[f64], b: &[f64], params: &MetricParams) -> f64 {
    Evaluator::new(kind, *params).score(a, b)
}

#[cfg(test)]
mod tests {
    use super::{evaluate, Direction, MetricKind, MetricParams};
    use crate::util::FineRegError;

    fn texture(n: usize, phase: f64) -> Vec<f64> {
        (0..n)
            .map(|i| 50.0 + 20.0 * ((i as f64) * 0.7 + phase).sin() + (i % 3) as f64)
            .collect()
    }

    #[test]
    fn directions_are_paired_with_kinds() {
        assert_eq!(MetricKind::Cc.direction(), Direction::Maximize);
        assert_eq!(MetricKind::Ccsm.direction(), Direction::Maximize);
        assert_eq!(MetricKind::Msd.direction(), Direction::Minimize);
        assert_eq!(MetricKind::Mrsd.direction(), Direction::Maximize);
        assert_eq!(MetricKind::Mi.direction(), Direction::Maximize);
    }

    #[test]
    fn is_better_is_strict_and_rejects_nan() {
        assert!(Direction::Maximize.is_better(1.0, 0.5));
        assert!(!Direction::Maximize.is_better(0.5, 0.5));
        assert!(Direction::Minimize.is_better(0.1, 0.5));
        assert!(!Direction::Minimize.is_better(f64::NAN, 0.5));
        assert!(Direction::Maximize.is_better(-1.0, Direction::Maximize.worst()));
    }

    #[test]
    fn tokens_parse_and_unknown_lists_choices() {
        for kind in MetricKind::ALL {
            assert_eq!(kind.token().parse::<MetricKind>().unwrap(), kind);
        }
        assert_eq!("ccsm".parse::<MetricKind>().unwrap(), MetricKind::Ccsm);
        let err = "NCC".parse::<MetricKind>().err().unwrap();
        assert_eq!(err, FineRegError::UnknownMetric { got: "NCC".into() });
        assert!(err.to_string().contains("CC, CCSM, MSD, MRSD, MI"));
    }

    #[test]
    fn identical_patches_score_best_for_every_metric() {
        let params = MetricParams::default();
        let a = texture(49, 0.0);
        let b = texture(49, 1.3);
        for kind in MetricKind::ALL {
            let same = evaluate(kind, &a, &a, &params);
            let other = evaluate(kind, &a, &b, &params);
            assert!(
                kind.direction().is_better(same, other),
                "{kind}: identical {same} should beat shifted {other}"
            );
        }
    }

    #[test]
    fn mismatched_lengths_score_worst() {
        let params = MetricParams::default();
        let a = texture(9, 0.0);
        let b = texture(8, 0.0);
        for kind in MetricKind::ALL {
            assert_eq!(evaluate(kind, &a, &b, &params), kind.direction().worst());
        }
    }
}
