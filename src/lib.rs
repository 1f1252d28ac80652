//! FineReg is a CPU dense image registration library.
//!
//! For every cell of a regular grid over the reference image it searches the
//! secondary image for the translation that optimizes a patch similarity
//! metric (CC, CCSM, MSD, MRSD or MI), refines it to sub-pixel accuracy and
//! writes a displacement field, a score field and an optional validity mask.
//! Images are processed in halo-padded tiles so memory stays bounded; tiles
//! run in parallel with the `rayon` feature and the moment kernels use SIMD
//! with the `simd` feature.

pub mod field;
pub mod filter;
pub mod image;
pub mod kernel;
pub mod metric;
mod registration;
pub mod search;
pub mod tile;
mod trace;
pub mod util;
pub mod warp;

pub use field::{
    DeformationField, Grid, RegistrationOutput, ScoreField, ThresholdDirection, ValidityMask,
    ValidityThreshold,
};
pub use image::{Geometry, Image, ImageView, Region, SampleGrid};
pub use kernel::Kernel;
pub use metric::{evaluate, Direction, Evaluator, MetricKind, MetricParams};
pub use registration::Registration;
pub use search::{BoundaryPolicy, CellMatch, SearchConfig};
pub use tile::{CancelToken, RegionSource, RunControl, TileBuffer, TilePlan, TileProgress};
pub use util::{FineRegError, FineRegResult};
pub use warp::warp_image;
