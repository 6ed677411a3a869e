//! Area mask: restrict tracing to a subset of cells.
//!
//! Cells marked `true` take part in tracing; cells marked `false` are
//! treated as absent and never appear in any output polygon. A mask must
//! have exactly the band's dimensions.

use geo::{Intersects, MultiPolygon, Point};

use crate::transform::Affine;
use crate::types::{Dimensions, GrayImage, RasterError, flatten_rows};

/// Boolean include/exclude grid, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    dimensions: Dimensions,
    cells: Vec<bool>,
}

impl Mask {
    /// Create a mask from row-major flags.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::CellCount`] if `cells.len()` is not
    /// `width * height`.
    pub fn new(dimensions: Dimensions, cells: Vec<bool>) -> Result<Self, RasterError> {
        if cells.len() != dimensions.cell_count() {
            return Err(RasterError::CellCount {
                dimensions,
                len: cells.len(),
            });
        }
        Ok(Self { dimensions, cells })
    }

    /// Create a mask from nested rows, top row first.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::RaggedRows`] if the rows differ in length.
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Result<Self, RasterError> {
        let (dimensions, cells) = flatten_rows(rows)?;
        Ok(Self { dimensions, cells })
    }

    /// A mask that includes (or excludes) every cell.
    #[must_use]
    pub fn all(dimensions: Dimensions, include: bool) -> Self {
        Self {
            dimensions,
            cells: vec![include; dimensions.cell_count()],
        }
    }

    /// Create a mask by evaluating `include(col, row)` for every cell.
    #[must_use]
    pub fn from_fn(dimensions: Dimensions, mut include: impl FnMut(u32, u32) -> bool) -> Self {
        let mut cells = Vec::with_capacity(dimensions.cell_count());
        for row in 0..dimensions.height {
            for col in 0..dimensions.width {
                cells.push(include(col, row));
            }
        }
        Self { dimensions, cells }
    }

    /// Include every cell whose centre, mapped through `transform`,
    /// intersects `area` (points on the boundary count as inside).
    #[must_use]
    pub fn from_geometry(
        dimensions: Dimensions,
        transform: &Affine,
        area: &MultiPolygon<f64>,
    ) -> Self {
        Self::from_fn(dimensions, |col, row| {
            area.intersects(&Point::from(transform.cell_center(col, row)))
        })
    }

    /// Mask dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Whether cell (`col`, `row`) is included. Out-of-bounds cells are
    /// never included.
    #[must_use]
    pub fn includes(&self, col: u32, row: u32) -> bool {
        self.dimensions
            .index(col, row)
            .and_then(|i| self.cells.get(i).copied())
            .unwrap_or(false)
    }

    /// Number of included cells.
    #[must_use]
    pub fn included_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Number of excluded cells.
    #[must_use]
    pub fn excluded_count(&self) -> usize {
        self.cells.len() - self.included_count()
    }

    /// The complementary mask.
    #[must_use]
    pub fn invert(&self) -> Self {
        Self {
            dimensions: self.dimensions,
            cells: self.cells.iter().map(|c| !c).collect(),
        }
    }

    /// All flags in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }
}

impl From<&GrayImage> for Mask {
    /// Non-zero pixels are included.
    fn from(image: &GrayImage) -> Self {
        Self {
            dimensions: Dimensions::new(image.width(), image.height()),
            cells: image.pixels().map(|p| p.0[0] != 0).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geo::polygon;

    use super::*;

    #[test]
    fn new_rejects_wrong_length() {
        let result = Mask::new(Dimensions::new(2, 2), vec![true; 5]);
        assert!(matches!(result, Err(RasterError::CellCount { len: 5, .. })));
    }

    #[test]
    fn from_rows_reads_row_major() {
        let mask = Mask::from_rows(vec![vec![true, false], vec![false, true]]).unwrap();
        assert_eq!(mask.dimensions(), Dimensions::new(2, 2));
        assert!(mask.includes(0, 0));
        assert!(!mask.includes(1, 0));
        assert!(!mask.includes(0, 1));
        assert!(mask.includes(1, 1));
    }

    #[test]
    fn out_of_bounds_is_excluded() {
        let mask = Mask::all(Dimensions::new(2, 2), true);
        assert!(!mask.includes(2, 0));
        assert!(!mask.includes(0, 2));
    }

    #[test]
    fn counts_and_invert() {
        let mask = Mask::from_fn(Dimensions::new(4, 2), |col, _| col < 1);
        assert_eq!(mask.included_count(), 2);
        assert_eq!(mask.excluded_count(), 6);
        let inverted = mask.invert();
        assert_eq!(inverted.included_count(), 6);
        assert!(!inverted.includes(0, 0));
        assert!(inverted.includes(3, 1));
    }

    #[test]
    fn from_gray_image_uses_nonzero_pixels() {
        let mut img = GrayImage::new(3, 1);
        img.put_pixel(2, 0, image::Luma([1]));
        let mask = Mask::from(&img);
        assert_eq!(mask.cells(), &[false, false, true]);
    }

    #[test]
    fn from_geometry_selects_cell_centres() {
        // North-up 4x4 grid of unit cells with its top-left corner at (0, 4).
        let transform = Affine::north_up(0.0, 4.0, 1.0, 1.0);
        // Covers map x in [0, 2], y in [2, 4]: the top-left 2x2 block.
        let area = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 2.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 4.0),
            (x: 0.0, y: 4.0),
        ]]);
        let mask = Mask::from_geometry(Dimensions::new(4, 4), &transform, &area);
        assert_eq!(mask.included_count(), 4);
        assert!(mask.includes(0, 0));
        assert!(mask.includes(1, 1));
        assert!(!mask.includes(2, 0));
        assert!(!mask.includes(0, 2));
    }
}
