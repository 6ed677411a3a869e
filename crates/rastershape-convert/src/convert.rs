//! Raster-to-vector conversion: read a band, trace its regions, drop
//! nodata rows and report invalid geometries.

use std::io::Write;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{ConversionDiagnostics, StageTimings};
use crate::mask::Mask;
use crate::raster::RasterSource;
use crate::trace::{Connectivity, shapes};
use crate::types::{CellValue, ConvertError, FeatureTable};

/// Options controlling a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// 1-based index of the band to convert.
    pub band: usize,

    /// Neighbourhood used to merge same-valued cells into regions.
    pub connectivity: Connectivity,
}

impl ConvertOptions {
    /// Default band index (the first band).
    pub const DEFAULT_BAND: usize = 1;

    /// Default region connectivity.
    pub const DEFAULT_CONNECTIVITY: Connectivity = Connectivity::Four;
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            band: Self::DEFAULT_BAND,
            connectivity: Self::DEFAULT_CONNECTIVITY,
        }
    }
}

/// Convert the first band of `raster` into value-labelled polygons.
///
/// Uses [`ConvertOptions::default`]. When any output geometry is invalid a
/// single `Warning: <N> invalid geometries found in raster data.` line is
/// written to standard output; the invalid rows are kept as they are.
///
/// # Errors
///
/// See [`convert_with_options`].
pub fn convert_raster_to_vectors<R: RasterSource>(
    raster: &R,
    mask: Option<&Mask>,
) -> Result<FeatureTable<R::Value>, ConvertError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    convert_with_options(raster, mask, &ConvertOptions::default(), &mut out)
}

/// Convert a band of `raster`, writing the invalid-geometry warning (if
/// any) to `out`.
///
/// # Errors
///
/// Returns [`ConvertError::Raster`] if the band cannot be read,
/// [`ConvertError::MaskShape`] if the mask does not match the band,
/// [`ConvertError::DegenerateTransform`] or [`ConvertError::Geometry`] if
/// polygons cannot be built, and [`ConvertError::Diagnostic`] if the
/// warning cannot be written.
pub fn convert_with_options<R: RasterSource, W: Write>(
    raster: &R,
    mask: Option<&Mask>,
    options: &ConvertOptions,
    out: &mut W,
) -> Result<FeatureTable<R::Value>, ConvertError> {
    let (table, diagnostics) = convert_with_diagnostics(raster, mask, options)?;
    if let Some(warning) = diagnostics.warning() {
        log::warn!("{warning}");
        writeln!(out, "{warning}").map_err(ConvertError::Diagnostic)?;
    }
    Ok(table)
}

/// Convert a band of `raster` without writing anything, returning the
/// table together with counts and stage timings.
///
/// # Steps
///
/// 1. Read band `options.band`.
/// 2. Trace one geometry per region (see [`shapes`]).
/// 3. Tag the table with the raster's CRS.
/// 4. Drop rows whose value matches the raster's nodata sentinel.
/// 5. Count invalid geometries.
///
/// # Errors
///
/// As [`convert_with_options`], minus the write failure.
pub fn convert_with_diagnostics<R: RasterSource>(
    raster: &R,
    mask: Option<&Mask>,
    options: &ConvertOptions,
) -> Result<(FeatureTable<R::Value>, ConversionDiagnostics), ConvertError> {
    let total_start = Instant::now();

    let start = Instant::now();
    let band = raster.read_band(options.band)?;
    let read = start.elapsed();

    let start = Instant::now();
    let features = shapes(&band, mask, &raster.transform(), options.connectivity)?;
    let region_count = features.len();
    let mut table = FeatureTable::from_features(features, raster.crs().cloned());
    let trace = start.elapsed();

    let start = Instant::now();
    if let Some(nodata) = raster.nodata() {
        table.retain(|feature| !feature.value.same_value(nodata));
    }
    let filter = start.elapsed();

    let start = Instant::now();
    let invalid_geometry_count = table.invalid_geometry_count();
    let validate = start.elapsed();

    let diagnostics = ConversionDiagnostics {
        band: options.band,
        dimensions: band.dimensions(),
        connectivity: options.connectivity,
        masked_cell_count: mask.map_or(0, Mask::excluded_count),
        region_count,
        nodata_region_count: region_count - table.len(),
        feature_count: table.len(),
        invalid_geometry_count,
        timings: StageTimings {
            read,
            trace,
            filter,
            validate,
            total: total_start.elapsed(),
        },
    };

    log::debug!(
        "converted band {} ({}): {} regions, {} nodata dropped, {} invalid",
        diagnostics.band,
        diagnostics.dimensions,
        region_count,
        diagnostics.nodata_region_count,
        invalid_geometry_count,
    );

    Ok((table, diagnostics))
}
