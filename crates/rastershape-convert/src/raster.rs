//! Raster sources: the read-only input to conversion.
//!
//! [`RasterSource`] is the seam between the converter and whatever holds
//! the raster (a decoded image, a GDAL dataset, a test fixture). The
//! converter only ever reads one band plus the georeferencing metadata;
//! opening and closing the underlying resource is the caller's business.

use crate::transform::Affine;
use crate::types::{Band, CellValue, Crs, Dimensions, RasterError};

/// A readable, georeferenced raster.
pub trait RasterSource {
    /// Cell type of the raster's bands.
    type Value: CellValue;

    /// Number of bands available.
    fn band_count(&self) -> usize;

    /// Read band `index` (1-based, as in GDAL) into memory.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::BandNotFound`] for an index outside
    /// `1..=band_count()`, or an I/O / decode error from the source.
    fn read_band(&self, index: usize) -> Result<Band<Self::Value>, RasterError>;

    /// Grid-to-map transform.
    fn transform(&self) -> Affine;

    /// Coordinate reference system, if the raster declares one.
    fn crs(&self) -> Option<&Crs>;

    /// Nodata sentinel, if the raster declares one.
    fn nodata(&self) -> Option<Self::Value>;
}

/// A raster held entirely in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryRaster<T> {
    bands: Vec<Band<T>>,
    transform: Affine,
    crs: Option<Crs>,
    nodata: Option<T>,
}

impl<T: CellValue> InMemoryRaster<T> {
    /// A single-band raster with an identity transform, no CRS and no
    /// nodata value.
    #[must_use]
    pub fn new(band: Band<T>) -> Self {
        Self {
            bands: vec![band],
            transform: Affine::IDENTITY,
            crs: None,
            nodata: None,
        }
    }

    /// Set the grid-to-map transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    /// Set the coordinate reference system.
    #[must_use]
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    /// Set the nodata sentinel.
    #[must_use]
    pub fn with_nodata(mut self, nodata: T) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Append a band. Every band must share the first band's shape.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::BandShape`] if `band` has different
    /// dimensions.
    pub fn push_band(&mut self, band: Band<T>) -> Result<(), RasterError> {
        let expected = self.dimensions();
        if band.dimensions() != expected {
            return Err(RasterError::BandShape {
                expected,
                actual: band.dimensions(),
            });
        }
        self.bands.push(band);
        Ok(())
    }

    /// Shape shared by all bands.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.bands
            .first()
            .map_or(Dimensions::new(0, 0), Band::dimensions)
    }
}

impl<T: CellValue> RasterSource for InMemoryRaster<T> {
    type Value = T;

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn read_band(&self, index: usize) -> Result<Band<T>, RasterError> {
        index
            .checked_sub(1)
            .and_then(|i| self.bands.get(i))
            .cloned()
            .ok_or(RasterError::BandNotFound {
                index,
                count: self.bands.len(),
            })
    }

    fn transform(&self) -> Affine {
        self.transform
    }

    fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    fn nodata(&self) -> Option<T> {
        self.nodata
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn band(value: u8) -> Band<u8> {
        Band::filled(Dimensions::new(2, 2), value)
    }

    #[test]
    fn defaults_have_no_georeferencing() {
        let raster = InMemoryRaster::new(band(1));
        assert_eq!(raster.band_count(), 1);
        assert_eq!(raster.transform(), Affine::IDENTITY);
        assert!(raster.crs().is_none());
        assert!(raster.nodata().is_none());
    }

    #[test]
    fn builder_sets_metadata() {
        let raster = InMemoryRaster::new(band(1))
            .with_transform(Affine::north_up(0.0, 10.0, 1.0, 1.0))
            .with_crs(Crs::epsg(3857))
            .with_nodata(255);
        assert_eq!(raster.crs(), Some(&Crs::epsg(3857)));
        assert_eq!(raster.nodata(), Some(255));
        assert!((raster.transform().f - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bands_are_one_based() {
        let mut raster = InMemoryRaster::new(band(1));
        raster.push_band(band(2)).unwrap();
        assert_eq!(raster.read_band(1).unwrap().get(0, 0), Some(1));
        assert_eq!(raster.read_band(2).unwrap().get(0, 0), Some(2));
    }

    #[test]
    fn band_zero_is_not_found() {
        let raster = InMemoryRaster::new(band(1));
        assert!(matches!(
            raster.read_band(0),
            Err(RasterError::BandNotFound { index: 0, count: 1 })
        ));
    }

    #[test]
    fn band_past_end_is_not_found() {
        let raster = InMemoryRaster::new(band(1));
        assert!(matches!(
            raster.read_band(2),
            Err(RasterError::BandNotFound { index: 2, count: 1 })
        ));
    }

    #[test]
    fn push_band_rejects_other_shapes() {
        let mut raster = InMemoryRaster::new(band(1));
        let result = raster.push_band(Band::filled(Dimensions::new(3, 2), 0));
        assert!(matches!(result, Err(RasterError::BandShape { .. })));
        assert_eq!(raster.band_count(), 1);
    }
}
