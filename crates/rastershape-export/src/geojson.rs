//! GeoJSON export serializer.
//!
//! Each table row becomes one GeoJSON `Feature` whose geometry is the
//! region outline and whose `value` property is the source cell value.
//! A table CRS is written as the legacy named-CRS `crs` member of the
//! `FeatureCollection`, which most GIS tools still honour; tables
//! without a CRS omit it.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use rastershape_convert::{CellValue, Crs, FeatureTable};

/// Name of the property holding each feature's cell value.
pub const VALUE_PROPERTY: &str = "value";

/// Errors that can occur during export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A value or document could not be serialized to JSON.
    #[error("failed to serialize GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convert a feature table into a GeoJSON `FeatureCollection`.
///
/// Row order is preserved. The collection's `bbox` is the bounding box of
/// all geometries (absent for an empty table).
///
/// # Errors
///
/// Returns [`ExportError::Json`] if a cell value cannot be represented
/// as JSON.
pub fn to_geojson<T: CellValue>(table: &FeatureTable<T>) -> Result<FeatureCollection, ExportError> {
    let features = table
        .iter()
        .map(|feature| {
            let mut properties = JsonObject::new();
            properties.insert(
                VALUE_PROPERTY.to_owned(),
                serde_json::to_value(feature.value)?,
            );
            Ok(Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&feature.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect::<Result<Vec<_>, ExportError>>()?;

    let foreign_members = table.crs().map(|crs| {
        let mut members = JsonObject::new();
        members.insert("crs".to_owned(), named_crs(crs));
        members
    });

    let bbox = crate::table_bounds(table).map(|rect| {
        vec![rect.min().x, rect.min().y, rect.max().x, rect.max().y]
    });

    Ok(FeatureCollection {
        bbox,
        features,
        foreign_members,
    })
}

/// Serialize a feature table as a compact GeoJSON string.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails.
pub fn to_geojson_string<T: CellValue>(table: &FeatureTable<T>) -> Result<String, ExportError> {
    let collection = to_geojson(table)?;
    Ok(serde_json::to_string(&collection)?)
}

/// The legacy GeoJSON 2008 named-CRS object for `crs`.
///
/// EPSG codes are written as OGC URNs; anything else is passed through.
fn named_crs(crs: &Crs) -> JsonValue {
    let name = crs.epsg_code().map_or_else(
        || crs.as_str().to_owned(),
        |code| format!("urn:ogc:def:crs:EPSG::{code}"),
    );
    serde_json::json!({
        "type": "name",
        "properties": { "name": name },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geo::{Geometry as GeoGeometry, polygon};
    use rastershape_convert::Feature as Row;

    use super::*;

    fn square(value: u16, crs: Option<Crs>) -> FeatureTable<u16> {
        let geometry = GeoGeometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ]);
        FeatureTable::from_features(vec![Row { geometry, value }], crs)
    }

    #[test]
    fn value_becomes_property() {
        let collection = to_geojson(&square(42, None)).unwrap();
        assert_eq!(collection.features.len(), 1);
        let properties = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(properties[VALUE_PROPERTY], JsonValue::from(42));
    }

    #[test]
    fn geometry_is_polygon() {
        let collection = to_geojson(&square(1, None)).unwrap();
        let geometry = collection.features[0].geometry.as_ref().unwrap();
        assert!(matches!(geometry.value, geojson::Value::Polygon(_)));
    }

    #[test]
    fn missing_crs_is_omitted() {
        let collection = to_geojson(&square(1, None)).unwrap();
        assert!(collection.foreign_members.is_none());
    }

    #[test]
    fn epsg_crs_is_written_as_urn() {
        let collection = to_geojson(&square(1, Some(Crs::epsg(4326)))).unwrap();
        let members = collection.foreign_members.unwrap();
        assert_eq!(members["crs"]["type"], "name");
        assert_eq!(
            members["crs"]["properties"]["name"],
            "urn:ogc:def:crs:EPSG::4326"
        );
    }

    #[test]
    fn other_crs_is_passed_through() {
        let crs = Crs::new("+proj=longlat +datum=WGS84");
        assert_eq!(
            named_crs(&crs)["properties"]["name"],
            "+proj=longlat +datum=WGS84"
        );
    }

    #[test]
    fn bbox_spans_table() {
        let collection = to_geojson(&square(1, None)).unwrap();
        assert_eq!(collection.bbox, Some(vec![0.0, 0.0, 1.0, 1.0]));
    }

    #[test]
    fn empty_table_is_empty_collection() {
        let table = FeatureTable::<u8>::new(None);
        let collection = to_geojson(&table).unwrap();
        assert!(collection.features.is_empty());
        assert!(collection.bbox.is_none());
    }

    #[test]
    fn string_output_is_feature_collection() {
        let json = to_geojson_string(&square(7, Some(Crs::epsg(3857)))).unwrap();
        assert!(json.contains(r#""type":"FeatureCollection""#));
        assert!(json.contains(r#""value":7"#));
        assert!(json.contains("EPSG::3857"));
    }
}
