//! Dense registration entry point.
//!
//! `Registration` validates a `SearchConfig` once and then estimates a
//! displacement field between a reference and a secondary image. Images are
//! read through `RegionSource`, one halo-padded tile at a time.

use crate::field::{FieldAssembler, RegistrationOutput};
use crate::image::Geometry;
use crate::search::{Frame, SearchConfig};
use crate::tile::{self, RegionSource, RunControl, TilePlan};
use crate::trace::{trace_event, trace_span};
use crate::util::math::div_ceil;
use crate::util::{FineRegError, FineRegResult};

/// Configured dense registration engine.
#[derive(Clone, Debug)]
pub struct Registration {
    config: SearchConfig,
}

impl Registration {
    /// Validates `config` and builds the engine.
    pub fn new(config: SearchConfig) -> FineRegResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// True when the crate was built with the `rayon` feature; otherwise
    /// `SearchConfig::parallel` is ignored and tiles run sequentially.
    pub const fn supports_parallel() -> bool {
        cfg!(feature = "rayon")
    }

    /// Returns the validated configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Output lattice size for a reference of `width x height` pixels.
    pub fn output_size(&self, width: usize, height: usize) -> (usize, usize) {
        (
            div_ceil(width, self.config.grid_step[0]),
            div_ceil(height, self.config.grid_step[1]),
        )
    }

    /// Output lattice geometry for a reference with `geometry`.
    pub fn output_geometry(&self, geometry: Geometry) -> Geometry {
        Geometry::new(
            geometry.origin,
            [
                geometry.spacing[0] * self.config.grid_step[0] as f64,
                geometry.spacing[1] * self.config.grid_step[1] as f64,
            ],
        )
    }

    /// Runs the registration over the whole reference lattice.
    pub fn run<R, S>(&self, reference: &R, secondary: &S) -> FineRegResult<RegistrationOutput>
    where
        R: RegionSource + Sync + ?Sized,
        S: RegionSource + Sync + ?Sized,
    {
        self.run_with(reference, secondary, &RunControl::new())
    }

    /// Runs the registration with cancellation and progress hooks.
    ///
    /// A cancelled run is not an error: the output reports
    /// `completed_tiles < total_tiles` and unprocessed cells stay invalid.
    pub fn run_with<R, S>(
        &self,
        reference: &R,
        secondary: &S,
        control: &RunControl<'_>,
    ) -> FineRegResult<RegistrationOutput>
    where
        R: RegionSource + Sync + ?Sized,
        S: RegionSource + Sync + ?Sized,
    {
        check_source(reference)?;
        check_source(secondary)?;

        let (out_w, out_h) = self.output_size(reference.width(), reference.height());
        let plan = TilePlan::new(out_w, out_h, self.config.tile_size);
        let frame = Frame::new(
            reference.geometry(),
            secondary.geometry(),
            self.config.coarse_offset,
        );

        let _span = trace_span!(
            "registration",
            metric = self.config.metric.token(),
            out_width = out_w,
            out_height = out_h,
            tiles = plan.len(),
            parallel = self.config.parallel
        )
        .entered();

        let outputs = self.run_tiles(reference, secondary, &frame, &plan, control)?;

        let mut assembler = FieldAssembler::new(
            out_w,
            out_h,
            self.output_geometry(reference.geometry()),
            self.config.metric,
            self.config.validity,
        );
        for out in &outputs {
            assembler.write(out)?;
        }

        if outputs.len() < plan.len() {
            trace_event!(
                "registration_cancelled",
                completed = outputs.len(),
                total = plan.len()
            );
        } else {
            trace_event!("registration_done", tiles = plan.len());
        }
        Ok(assembler.finish(outputs.len(), plan.len()))
    }

    #[cfg(feature = "rayon")]
    fn run_tiles<R, S>(
        &self,
        reference: &R,
        secondary: &S,
        frame: &Frame,
        plan: &TilePlan,
        control: &RunControl<'_>,
    ) -> FineRegResult<Vec<tile::TileOutput>>
    where
        R: RegionSource + Sync + ?Sized,
        S: RegionSource + Sync + ?Sized,
    {
        if self.config.parallel {
            tile::run_parallel(reference, secondary, &self.config, frame, plan, control)
        } else {
            tile::run_sequential(reference, secondary, &self.config, frame, plan, control)
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn run_tiles<R, S>(
        &self,
        reference: &R,
        secondary: &S,
        frame: &Frame,
        plan: &TilePlan,
        control: &RunControl<'_>,
    ) -> FineRegResult<Vec<tile::TileOutput>>
    where
        R: RegionSource + Sync + ?Sized,
        S: RegionSource + Sync + ?Sized,
    {
        tile::run_sequential(reference, secondary, &self.config, frame, plan, control)
    }
}

fn check_source<S: RegionSource + ?Sized>(source: &S) -> FineRegResult<()> {
    if source.width() == 0 || source.height() == 0 {
        return Err(FineRegError::InvalidDimensions {
            width: source.width(),
            height: source.height(),
        });
    }
    source.geometry().validate()
}
