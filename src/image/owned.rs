//! Owned scalar images with physical geometry.

use crate::image::{ImageView, Region};
use crate::util::{FineRegError, FineRegResult};

/// Mapping between pixel indices and physical coordinates.
///
/// `physical = origin + index * spacing` on each axis. Spacing may be
/// negative (north-up rasters) but never zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    /// Physical coordinate of pixel `(0, 0)`.
    pub origin: [f64; 2],
    /// Physical size of one pixel step along x and y.
    pub spacing: [f64; 2],
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            origin: [0.0, 0.0],
            spacing: [1.0, 1.0],
        }
    }
}

impl Geometry {
    /// Creates a geometry from origin and spacing.
    pub fn new(origin: [f64; 2], spacing: [f64; 2]) -> Self {
        Self { origin, spacing }
    }

    /// Checks that origin is finite and spacing finite and non-zero.
    pub fn validate(&self) -> FineRegResult<()> {
        if !self.origin.iter().all(|v| v.is_finite()) {
            return Err(FineRegError::InvalidGeometry {
                reason: "origin must be finite",
            });
        }
        if !self.spacing.iter().all(|v| v.is_finite() && *v != 0.0) {
            return Err(FineRegError::InvalidGeometry {
                reason: "spacing must be finite and non-zero",
            });
        }
        Ok(())
    }

    /// Physical point of a (possibly fractional) index.
    #[inline]
    pub fn index_to_physical(&self, ix: f64, iy: f64) -> [f64; 2] {
        [
            self.origin[0] + ix * self.spacing[0],
            self.origin[1] + iy * self.spacing[1],
        ]
    }

    /// Continuous index of a physical point.
    #[inline]
    pub fn physical_to_index(&self, p: [f64; 2]) -> [f64; 2] {
        [
            (p[0] - self.origin[0]) / self.spacing[0],
            (p[1] - self.origin[1]) / self.spacing[1],
        ]
    }
}

/// Owned contiguous single-band image of `f32` samples.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    data: Vec<f32>,
    width: usize,
    height: usize,
    geometry: Geometry,
}

impl Image {
    /// Creates an image with unit geometry from a row-major buffer.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> FineRegResult<Self> {
        if width == 0 || height == 0 {
            return Err(FineRegError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(FineRegError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(FineRegError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(FineRegError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
            geometry: Geometry::default(),
        })
    }

    /// Builds an image by evaluating `f(x, y)` at every pixel.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> FineRegResult<Self>
    where
        F: FnMut(usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(width.saturating_mul(height));
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(data, width, height)
    }

    /// Copies a borrowed view into an owned image with unit geometry.
    pub fn from_view(view: ImageView<'_, f32>) -> FineRegResult<Self> {
        Self::new(view.to_vec(), view.width(), view.height())
    }

    /// Replaces the geometry after validating it.
    pub fn with_geometry(mut self, geometry: Geometry) -> FineRegResult<Self> {
        geometry.validate()?;
        self.geometry = geometry;
        Ok(self)
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the physical geometry.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Returns the row-major samples.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the sample at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Region covering the whole image.
    pub fn region(&self) -> Region {
        Region::full(self.width, self.height)
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, f32> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }
}
