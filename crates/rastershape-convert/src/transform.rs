//! Affine mapping from grid positions to map coordinates.
//!
//! Coefficients follow the rasterio ordering:
//!
//! ```text
//! x = a * col + b * row + c
//! y = d * col + e * row + f
//! ```
//!
//! where (`col`, `row`) addresses cell *corners*: (0, 0) is the top-left
//! corner of the top-left cell and (`width`, `height`) the bottom-right
//! corner of the grid. GDAL geotransforms store the same six numbers in a
//! different order; see [`Affine::from_gdal`].

use std::fmt;

use geo::{AffineTransform, Coord};
use serde::{Deserialize, Serialize};

/// A 2D affine transform from grid space to map space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    /// Column scale.
    pub a: f64,
    /// Row rotation / shear into x.
    pub b: f64,
    /// X of the grid origin.
    pub c: f64,
    /// Column rotation / shear into y.
    pub d: f64,
    /// Row scale (negative for north-up rasters).
    pub e: f64,
    /// Y of the grid origin.
    pub f: f64,
}

impl Affine {
    /// The identity transform: map coordinates equal grid coordinates.
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);

    /// Create a transform from rasterio-ordered coefficients.
    #[must_use]
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Create a transform from a GDAL geotransform
    /// `[c, a, b, f, d, e]` (origin x, pixel width, row rotation,
    /// origin y, column rotation, pixel height).
    #[must_use]
    pub const fn from_gdal(geotransform: [f64; 6]) -> Self {
        let [c, a, b, f, d, e] = geotransform;
        Self::new(a, b, c, d, e, f)
    }

    /// The GDAL geotransform ordering of this transform.
    #[must_use]
    pub const fn to_gdal(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// A north-up transform for square-ish cells: origin at the top-left
    /// corner (`west`, `north`), cells `cell_width` wide and
    /// `cell_height` tall (both positive).
    #[must_use]
    pub const fn north_up(west: f64, north: f64, cell_width: f64, cell_height: f64) -> Self {
        Self::new(cell_width, 0.0, west, 0.0, -cell_height, north)
    }

    /// Determinant of the linear part; its magnitude is the map-space
    /// area of one cell.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.a.mul_add(self.e, -(self.b * self.d))
    }

    /// A transform is degenerate when it collapses the grid (zero
    /// determinant) or has non-finite coefficients.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let coefficients = [self.a, self.b, self.c, self.d, self.e, self.f];
        let det = self.determinant();
        coefficients.iter().any(|v| !v.is_finite()) || !det.is_finite() || det == 0.0
    }

    /// Map a grid position (corner coordinates) to map coordinates.
    #[must_use]
    pub fn apply(&self, col: f64, row: f64) -> Coord<f64> {
        Coord {
            x: self.a.mul_add(col, self.b.mul_add(row, self.c)),
            y: self.d.mul_add(col, self.e.mul_add(row, self.f)),
        }
    }

    /// Map coordinates of the centre of cell (`col`, `row`).
    #[must_use]
    pub fn cell_center(&self, col: u32, row: u32) -> Coord<f64> {
        self.apply(f64::from(col) + 0.5, f64::from(row) + 0.5)
    }

    /// The equivalent `geo` transform, for use with
    /// [`geo::AffineOps`].
    #[must_use]
    pub fn to_geo(&self) -> AffineTransform<f64> {
        AffineTransform::new(self.a, self.b, self.c, self.d, self.e, self.f)
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for Affine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}, {}, {}]",
            self.a, self.b, self.c, self.d, self.e, self.f,
        )
    }
}
