//! rastershape-export: Pure format serializers (sans-IO)
//!
//! Converts feature tables into output formats: GeoJSON for downstream
//! GIS tools and SVG for a quick visual preview.

pub mod geojson;
pub mod svg;

use geo::{BoundingRect, Rect, coord};
use rastershape_convert::{CellValue, FeatureTable};

pub use crate::geojson::{ExportError, VALUE_PROPERTY, to_geojson, to_geojson_string};
pub use crate::svg::{SvgMetadata, to_svg};

/// Bounding box of every geometry in `table`, or `None` for an empty
/// table.
#[must_use]
pub fn table_bounds<T: CellValue>(table: &FeatureTable<T>) -> Option<Rect<f64>> {
    table
        .geometries()
        .filter_map(|geometry| geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        })
}
