//! Shared types for raster-to-vector conversion.

use std::fmt;

use geo::{Geometry, Validation};
use serde::{Deserialize, Serialize};

use crate::transform::Affine;

/// Re-export `GrayImage` so callers can build bands and masks from
/// decoded images without depending on `image` directly.
pub use image::GrayImage;

/// Grid dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl Dimensions {
    /// Create a new set of dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of cells (`width * height`).
    #[must_use]
    pub const fn cell_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns `true` if the grid has no cells.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Row-major index of the cell at (`col`, `row`), if it is in bounds.
    #[must_use]
    pub const fn index(self, col: u32, row: u32) -> Option<usize> {
        if col < self.width && row < self.height {
            Some(row as usize * self.width as usize + col as usize)
        } else {
            None
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A numeric raster cell type.
///
/// `same_value` is the equality used both for merging neighbouring cells
/// into one region and for matching the nodata sentinel. For floating
/// point cells `NaN` matches `NaN` and `-0.0` matches `0.0`.
pub trait CellValue: Copy + PartialEq + fmt::Debug + Serialize + Send + Sync + 'static {
    /// A key that is equal for two cells exactly when they hold the
    /// same value.
    fn class_key(self) -> u64;

    /// Whether two cells hold the same value.
    fn same_value(self, other: Self) -> bool {
        self.class_key() == other.class_key()
    }
}

macro_rules! impl_integer_cell {
    ($($t:ty),* $(,)?) => {
        $(
            impl CellValue for $t {
                #[allow(clippy::cast_sign_loss)]
                fn class_key(self) -> u64 {
                    i64::from(self) as u64
                }
            }
        )*
    };
}

impl_integer_cell!(u8, u16, u32, i8, i16, i32);

impl CellValue for f64 {
    #[allow(clippy::float_cmp)]
    fn class_key(self) -> u64 {
        if self.is_nan() {
            Self::NAN.to_bits()
        } else if self == 0.0 {
            0.0_f64.to_bits()
        } else {
            self.to_bits()
        }
    }
}

impl CellValue for f32 {
    fn class_key(self) -> u64 {
        f64::from(self).class_key()
    }
}

/// One 2D layer of raster cells, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Band<T> {
    dimensions: Dimensions,
    cells: Vec<T>,
}

impl<T: CellValue> Band<T> {
    /// Create a band from row-major cells.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::CellCount`] if `cells.len()` is not
    /// `width * height`.
    pub fn new(dimensions: Dimensions, cells: Vec<T>) -> Result<Self, RasterError> {
        if cells.len() != dimensions.cell_count() {
            return Err(RasterError::CellCount {
                dimensions,
                len: cells.len(),
            });
        }
        Ok(Self { dimensions, cells })
    }

    /// Create a band from nested rows, top row first.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::RaggedRows`] if the rows differ in length
    /// and [`RasterError::TooLarge`] if either side exceeds `u32::MAX`.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, RasterError> {
        let (dimensions, cells) = flatten_rows(rows)?;
        Ok(Self { dimensions, cells })
    }

    /// Create a band by evaluating `f(col, row)` for every cell.
    #[must_use]
    pub fn from_fn(dimensions: Dimensions, mut f: impl FnMut(u32, u32) -> T) -> Self {
        let mut cells = Vec::with_capacity(dimensions.cell_count());
        for row in 0..dimensions.height {
            for col in 0..dimensions.width {
                cells.push(f(col, row));
            }
        }
        Self { dimensions, cells }
    }

    /// Create a band where every cell holds `value`.
    #[must_use]
    pub fn filled(dimensions: Dimensions, value: T) -> Self {
        Self {
            dimensions,
            cells: vec![value; dimensions.cell_count()],
        }
    }

    /// Band dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Value at (`col`, `row`), or `None` if out of bounds.
    #[must_use]
    pub fn get(&self, col: u32, row: u32) -> Option<T> {
        self.dimensions
            .index(col, row)
            .and_then(|i| self.cells.get(i).copied())
    }

    /// All cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[T] {
        &self.cells
    }
}

impl<T> From<&image::ImageBuffer<image::Luma<T>, Vec<T>>> for Band<T>
where
    T: CellValue + image::Primitive,
{
    fn from(image: &image::ImageBuffer<image::Luma<T>, Vec<T>>) -> Self {
        Self {
            dimensions: Dimensions::new(image.width(), image.height()),
            cells: image.as_raw().clone(),
        }
    }
}

/// Flatten nested rows into row-major cells plus their dimensions.
pub(crate) fn flatten_rows<T>(rows: Vec<Vec<T>>) -> Result<(Dimensions, Vec<T>), RasterError> {
    let expected = rows.first().map_or(0, Vec::len);
    if let Some((row, len)) = rows
        .iter()
        .map(Vec::len)
        .enumerate()
        .find(|&(_, len)| len != expected)
    {
        return Err(RasterError::RaggedRows { row, len, expected });
    }

    let width = u32::try_from(expected).map_err(|_| RasterError::TooLarge { len: expected })?;
    let height = u32::try_from(rows.len()).map_err(|_| RasterError::TooLarge { len: rows.len() })?;
    let cells = rows.into_iter().flatten().collect();
    Ok((Dimensions::new(width, height), cells))
}

/// Coordinate reference system identifier.
///
/// Opaque to the converter: any authority string, WKT, or PROJ
/// definition is carried through unchanged from input to output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(String);

impl Crs {
    /// Wrap an arbitrary CRS definition.
    #[must_use]
    pub fn new(definition: impl Into<String>) -> Self {
        Self(definition.into())
    }

    /// An `EPSG:<code>` identifier.
    #[must_use]
    pub fn epsg(code: u32) -> Self {
        Self(format!("EPSG:{code}"))
    }

    /// The definition string as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The EPSG code, for `EPSG:4326` and
    /// `urn:ogc:def:crs:EPSG::4326` style identifiers.
    #[must_use]
    pub fn epsg_code(&self) -> Option<u32> {
        if !self.0.to_ascii_uppercase().contains("EPSG") {
            return None;
        }
        self.0.rsplit(':').next()?.trim().parse().ok()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Crs {
    fn from(definition: &str) -> Self {
        Self::new(definition)
    }
}

/// One traced region: its outline and the cell value it was traced from.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature<T> {
    /// `Polygon` or `MultiPolygon` in map coordinates.
    pub geometry: Geometry<f64>,
    /// The value shared by every cell in the region.
    pub value: T,
}

/// Ordered feature rows tagged with a coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable<T> {
    features: Vec<Feature<T>>,
    crs: Option<Crs>,
}

impl<T: CellValue> FeatureTable<T> {
    /// An empty table.
    #[must_use]
    pub const fn new(crs: Option<Crs>) -> Self {
        Self {
            features: Vec::new(),
            crs,
        }
    }

    /// Build a table from features, keeping their order.
    #[must_use]
    pub const fn from_features(features: Vec<Feature<T>>, crs: Option<Crs>) -> Self {
        Self { features, crs }
    }

    /// Number of rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// The table's coordinate reference system.
    #[must_use]
    pub const fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// All rows.
    #[must_use]
    pub fn features(&self) -> &[Feature<T>] {
        &self.features
    }

    /// Iterate over rows.
    pub fn iter(&self) -> std::slice::Iter<'_, Feature<T>> {
        self.features.iter()
    }

    /// The `value` column.
    pub fn values(&self) -> impl Iterator<Item = T> + '_ {
        self.features.iter().map(|f| f.value)
    }

    /// The `geometry` column.
    pub fn geometries(&self) -> impl Iterator<Item = &Geometry<f64>> {
        self.features.iter().map(|f| &f.geometry)
    }

    /// Append a row.
    pub fn push(&mut self, feature: Feature<T>) {
        self.features.push(feature);
    }

    /// Keep only rows for which `keep` returns `true`; order is preserved.
    pub fn retain(&mut self, keep: impl FnMut(&Feature<T>) -> bool) {
        self.features.retain(keep);
    }

    /// Number of rows whose geometry fails OGC validity checks
    /// (self-intersection, non-finite coordinates, degenerate rings...).
    #[must_use]
    pub fn invalid_geometry_count(&self) -> usize {
        self.geometries().filter(|g| !g.is_valid()).count()
    }

    /// Consume the table, returning its rows and CRS.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Feature<T>>, Option<Crs>) {
        (self.features, self.crs)
    }
}

impl<'a, T> IntoIterator for &'a FeatureTable<T> {
    type Item = &'a Feature<T>;
    type IntoIter = std::slice::Iter<'a, Feature<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

/// Errors reading or constructing raster data.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// The requested band index does not exist (bands are 1-based).
    #[error("band {index} not found (raster has {count} band(s))")]
    BandNotFound {
        /// Requested 1-based band index.
        index: usize,
        /// Number of bands available.
        count: usize,
    },

    /// A band added to a raster does not match the existing bands.
    #[error("band shape {actual} does not match raster shape {expected}")]
    BandShape {
        /// Shape of the raster's existing bands.
        expected: Dimensions,
        /// Shape of the rejected band.
        actual: Dimensions,
    },

    /// Flat cell data does not fill the declared grid.
    #[error("{len} cells do not fill a {dimensions} grid")]
    CellCount {
        /// Declared grid dimensions.
        dimensions: Dimensions,
        /// Number of cells supplied.
        len: usize,
    },

    /// Nested rows of unequal length.
    #[error("row {row} has {len} cells, expected {expected}")]
    RaggedRows {
        /// Index of the first offending row.
        row: usize,
        /// Length of that row.
        len: usize,
        /// Length of the first row.
        expected: usize,
    },

    /// A grid side does not fit in `u32`.
    #[error("grid side of {len} cells is too large")]
    TooLarge {
        /// Offending side length.
        len: usize,
    },

    /// The underlying source could not be read.
    #[error("failed to read raster: {0}")]
    Io(#[from] std::io::Error),

    /// The underlying source could not be decoded.
    #[error("failed to decode raster: {0}")]
    Decode(#[from] image::ImageError),
}

/// Errors that can occur during conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The band could not be read from the source.
    #[error(transparent)]
    Raster(#[from] RasterError),

    /// The area mask does not have the band's shape.
    #[error("mask shape {actual} does not match band shape {expected}")]
    MaskShape {
        /// Band dimensions.
        expected: Dimensions,
        /// Mask dimensions.
        actual: Dimensions,
    },

    /// The affine transform is singular or has non-finite coefficients.
    #[error("affine transform {0} is degenerate")]
    DegenerateTransform(Affine),

    /// Region boundaries could not be assembled into polygons.
    #[error("failed to construct geometry: {0}")]
    Geometry(String),

    /// The invalid-geometry warning could not be written.
    #[error("failed to write diagnostic: {0}")]
    Diagnostic(#[source] std::io::Error),
}
