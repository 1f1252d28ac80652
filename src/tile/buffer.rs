//! Tile-local copies of image regions.

use crate::image::{Geometry, Image, Region, SampleGrid};
use crate::util::{FineRegError, FineRegResult};

/// Random-access provider of image regions.
///
/// The engine only ever reads rectangular regions, so sources can be backed by
/// memory, a file reader or a block cache. Reads must be deterministic.
pub trait RegionSource {
    /// Full image width.
    fn width(&self) -> usize;
    /// Full image height.
    fn height(&self) -> usize;
    /// Index-to-physical mapping of the image.
    fn geometry(&self) -> Geometry;
    /// Returns the samples of `region` in row-major order.
    fn read_region(&self, region: Region) -> FineRegResult<Vec<f32>>;
}

impl RegionSource for Image {
    fn width(&self) -> usize {
        Image::width(self)
    }

    fn height(&self) -> usize {
        Image::height(self)
    }

    fn geometry(&self) -> Geometry {
        Image::geometry(self)
    }

    fn read_region(&self, region: Region) -> FineRegResult<Vec<f32>> {
        Ok(self.view().roi(region)?.to_vec())
    }
}

/// Owned region of a larger image, addressed with global indices.
#[derive(Clone, Debug, PartialEq)]
pub struct TileBuffer {
    region: Region,
    image_dims: (usize, usize),
    data: Vec<f32>,
}

impl TileBuffer {
    /// Reads `region` from `source`.
    pub fn load<S: RegionSource + ?Sized>(source: &S, region: Region) -> FineRegResult<Self> {
        let data = source.read_region(region)?;
        if data.len() != region.area() {
            return Err(FineRegError::BufferTooSmall {
                needed: region.area(),
                got: data.len(),
            });
        }
        Ok(Self {
            region,
            image_dims: (source.width(), source.height()),
            data,
        })
    }

    /// Region of the source image held by this buffer.
    pub fn region(&self) -> Region {
        self.region
    }
}

impl SampleGrid for TileBuffer {
    fn dims(&self) -> (usize, usize) {
        self.image_dims
    }

    #[inline]
    fn sample(&self, x: usize, y: usize) -> Option<f32> {
        if !self.region.contains(x, y) {
            return None;
        }
        let lx = x - self.region.x;
        let ly = y - self.region.y;
        self.data.get(ly * self.region.width + lx).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::{RegionSource, TileBuffer};
    use crate::image::{Image, Region, SampleGrid};

    #[test]
    fn buffer_uses_global_indices() {
        let img = Image::from_fn(10, 8, |x, y| (y * 10 + x) as f32).unwrap();
        let buf = TileBuffer::load(&img, Region::new(3, 2, 4, 3)).unwrap();
        assert_eq!(buf.dims(), (10, 8));
        assert_eq!(buf.sample(3, 2), Some(23.0));
        assert_eq!(buf.sample(6, 4), Some(46.0));
        assert_eq!(buf.sample(7, 4), None);
        assert_eq!(buf.sample(2, 3), None);
    }

    #[test]
    fn image_source_rejects_out_of_bounds_region() {
        let img = Image::from_fn(4, 4, |_, _| 0.0).unwrap();
        assert!(img.read_region(Region::new(2, 2, 3, 1)).is_err());
    }

    struct Short;

    impl RegionSource for Short {
        fn width(&self) -> usize {
            4
        }
        fn height(&self) -> usize {
            4
        }
        fn geometry(&self) -> crate::image::Geometry {
            crate::image::Geometry::default()
        }
        fn read_region(&self, _region: Region) -> crate::util::FineRegResult<Vec<f32>> {
            Ok(vec![0.0; 2])
        }
    }

    #[test]
    fn short_read_is_an_error() {
        assert!(TileBuffer::load(&Short, Region::new(0, 0, 2, 2)).is_err());
    }
}
