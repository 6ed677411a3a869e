//! rastershape-convert: raster-to-vector conversion (sans-IO).
//!
//! Turns one band of a georeferenced raster into polygons:
//! read band -> label same-valued regions -> trace outlines ->
//! transform to map space -> drop nodata rows -> check validity.
//!
//! The crate never opens files itself. Callers hand in a
//! [`RasterSource`] (an [`InMemoryRaster`] built from decoded image data
//! or any other implementation) and get back a [`FeatureTable`] of
//! geometries paired with the cell value they were traced from.
//!
//! ```
//! use rastershape_convert::{Band, ConvertOptions, InMemoryRaster, convert_with_diagnostics};
//!
//! let band = Band::from_rows(vec![vec![1_u8, 1], vec![2, 2]])?;
//! let raster = InMemoryRaster::new(band);
//! let (table, diagnostics) = convert_with_diagnostics(&raster, None, &ConvertOptions::default())?;
//! assert_eq!(table.values().collect::<Vec<_>>(), vec![1, 2]);
//! assert!(diagnostics.warning().is_none());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod convert;
pub mod diagnostics;
mod label;
pub mod mask;
pub mod raster;
pub mod trace;
pub mod transform;
pub mod types;

pub use convert::{
    ConvertOptions, convert_raster_to_vectors, convert_with_diagnostics, convert_with_options,
};
pub use diagnostics::{ConversionDiagnostics, StageTimings, invalid_geometry_warning};
pub use mask::Mask;
pub use raster::{InMemoryRaster, RasterSource};
pub use trace::{Connectivity, shapes};
pub use transform::Affine;
pub use types::{
    Band, CellValue, ConvertError, Crs, Dimensions, Feature, FeatureTable, GrayImage, RasterError,
};
