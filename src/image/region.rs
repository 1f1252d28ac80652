//! Rectangular index-space regions.

/// Axis-aligned region in pixel index space, stored as origin plus extent.
///
/// Regions are plain values: tiles, halos and clamped read windows are all
/// passed around by copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
    /// First column.
    pub x: usize,
    /// First row.
    pub y: usize,
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
}

impl Region {
    /// Creates a region from origin and extent.
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covering a whole `width x height` image.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Builds the region spanned by inclusive signed bounds, clamped to a
    /// `img_width x img_height` image. Returns `None` if nothing remains.
    pub fn clamped(
        x0: isize,
        y0: isize,
        x1: isize,
        y1: isize,
        img_width: usize,
        img_height: usize,
    ) -> Option<Self> {
        if img_width == 0 || img_height == 0 {
            return None;
        }
        let max_x = img_width as isize - 1;
        let max_y = img_height as isize - 1;
        let cx0 = x0.max(0);
        let cy0 = y0.max(0);
        let cx1 = x1.min(max_x);
        let cy1 = y1.min(max_y);
        if cx0 > cx1 || cy0 > cy1 {
            return None;
        }
        Some(Self::new(
            cx0 as usize,
            cy0 as usize,
            (cx1 - cx0 + 1) as usize,
            (cy1 - cy0 + 1) as usize,
        ))
    }

    /// One past the last column.
    pub fn end_x(&self) -> usize {
        self.x + self.width
    }

    /// One past the last row.
    pub fn end_y(&self) -> usize {
        self.y + self.height
    }

    /// Number of cells in the region.
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Returns true if `(x, y)` lies inside the region.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.end_x() && y >= self.y && y < self.end_y()
    }
}
