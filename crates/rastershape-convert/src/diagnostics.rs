//! Conversion diagnostics: counts and timings for each stage.
//!
//! Every call to [`convert_with_diagnostics`](crate::convert_with_diagnostics)
//! collects these alongside the output table. The invalid-geometry count
//! drives the single warning line the converter prints.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::trace::Connectivity;
use crate::types::Dimensions;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionDiagnostics {
    /// 1-based index of the band that was converted.
    pub band: usize,
    /// Band dimensions in cells.
    pub dimensions: Dimensions,
    /// Neighbourhood used to grow regions.
    pub connectivity: Connectivity,
    /// Cells excluded by the area mask (0 without a mask).
    pub masked_cell_count: usize,
    /// Regions traced before nodata filtering.
    pub region_count: usize,
    /// Rows dropped because their value matched the nodata sentinel.
    pub nodata_region_count: usize,
    /// Rows in the returned table.
    pub feature_count: usize,
    /// Returned rows whose geometry fails validity checks.
    pub invalid_geometry_count: usize,
    /// Wall-clock duration of each stage.
    pub timings: StageTimings,
}

/// Wall-clock duration of each conversion stage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageTimings {
    /// Reading the band from the source.
    #[serde(with = "duration_serde")]
    pub read: Duration,
    /// Labelling regions and tracing their outlines.
    #[serde(with = "duration_serde")]
    pub trace: Duration,
    /// Dropping nodata rows.
    #[serde(with = "duration_serde")]
    pub filter: Duration,
    /// Checking geometry validity.
    #[serde(with = "duration_serde")]
    pub validate: Duration,
    /// The whole conversion.
    #[serde(with = "duration_serde")]
    pub total: Duration,
}

impl ConversionDiagnostics {
    /// The warning line for invalid geometries, or `None` when every
    /// geometry is valid.
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        (self.invalid_geometry_count > 0)
            .then(|| invalid_geometry_warning(self.invalid_geometry_count))
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Conversion Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Band {}: {} ({} cells, {} masked out)",
            self.band,
            self.dimensions,
            self.dimensions.cell_count(),
            self.masked_cell_count,
        ));
        lines.push(format!("Connectivity: {:?}", self.connectivity));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.timings.total),
        ));
        lines.push(String::new());

        lines.push(format!("{:<12} {:>10} {:>10}", "Stage", "Duration", "% Total"));
        lines.push("-".repeat(34));
        let total_ms = duration_ms(self.timings.total);
        for (name, duration) in [
            ("Read", self.timings.read),
            ("Trace", self.timings.trace),
            ("Filter", self.timings.filter),
            ("Validate", self.timings.validate),
        ] {
            let ms = duration_ms(duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("{name:<12} {ms:>8.3}ms {pct:>9.1}%"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Regions: {}  |  Nodata dropped: {}  |  Features: {}  |  Invalid: {}",
            self.region_count,
            self.nodata_region_count,
            self.feature_count,
            self.invalid_geometry_count,
        ));

        lines.join("\n")
    }
}

/// The diagnostic line reported when `count` geometries are invalid.
#[must_use]
pub fn invalid_geometry_warning(count: usize) -> String {
    format!("Warning: {count} invalid geometries found in raster data.")
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
