//! SVG preview serializer.
//!
//! Renders a feature table as an SVG document using the [`svg`] crate for
//! document construction, XML escaping, and path data formatting.
//!
//! The `viewBox` is the table's bounding box in map units. Map y grows
//! northwards while SVG y grows downwards, so every y coordinate is
//! negated to keep north at the top. Each feature becomes one `<path>`
//! holding all of its rings; `fill-rule="evenodd"` punches the holes.
//! Features sharing a value share a fill colour.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use std::collections::HashMap;

use geo::{Geometry, LineString, Polygon};
use rastershape_convert::{CellValue, FeatureTable};
use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Path, Title};
use svg::node::{Text, Value};

/// Fill colours, assigned to distinct values in order of first
/// appearance and reused cyclically.
pub const FILL_COLORS: &[&str] = &[
    "#4e79a7", // blue
    "#f28e2b", // orange
    "#e15759", // red
    "#76b7b2", // teal
    "#59a14f", // green
    "#edc948", // yellow
    "#b07aa1", // purple
    "#ff9da7", // pink
    "#9c755f", // brown
    "#bab0ac", // grey
];

/// Metadata to embed in the SVG document.
///
/// Both fields are optional. When present, a `<title>` and/or `<desc>`
/// element is emitted immediately after the opening `<svg>` tag.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source raster filename.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,
}

/// Build SVG path data for every ring of a polygon or multi-polygon.
///
/// Each ring is emitted as `M x,y L ... z` with y negated. Rings with
/// fewer than 3 distinct points are skipped.
///
/// # Examples
///
/// ```
/// use geo::{Geometry, polygon};
/// use rastershape_export::svg::build_path_data;
///
/// let square = Geometry::Polygon(polygon![
///     (x: 0.0, y: 0.0),
///     (x: 2.0, y: 0.0),
///     (x: 2.0, y: 2.0),
///     (x: 0.0, y: 2.0),
/// ]);
/// assert_eq!(build_path_data(&square), "M0,0 L2,0 L2,-2 L0,-2 z");
/// ```
#[must_use]
pub fn build_path_data(geometry: &Geometry<f64>) -> String {
    let polygons: Vec<&Polygon<f64>> = match geometry {
        Geometry::Polygon(polygon) => vec![polygon],
        Geometry::MultiPolygon(multi) => multi.iter().collect(),
        _ => Vec::new(),
    };

    let mut data = Data::new();
    for polygon in polygons {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            data = append_ring(data, ring);
        }
    }
    String::from(Value::from(data))
}

/// Append one closed ring to `data`.
fn append_ring(data: Data, ring: &LineString<f64>) -> Data {
    // Closed rings repeat their first point; `z` closes instead.
    let points = ring.0.split_last().map_or(&ring.0[..], |(_, rest)| rest);
    let Some((first, rest)) = points.split_first() else {
        return data;
    };
    if rest.len() < 2 {
        return data;
    }
    let mut data = data.move_to((first.x, flip(first.y)));
    for point in rest {
        data = data.line_to((point.x, flip(point.y)));
    }
    data.close()
}

/// Map y to SVG y. Written as a subtraction so that 0 stays `0`, not `-0`.
fn flip(y: f64) -> f64 {
    0.0 - y
}

/// Serialize a feature table into an SVG preview document.
///
/// Returns a complete SVG document as a string. An empty table yields a
/// document with no `viewBox` and no paths.
#[must_use]
pub fn to_svg<T: CellValue>(table: &FeatureTable<T>, metadata: &SvgMetadata<'_>) -> String {
    let mut doc = Document::new();
    if let Some(bounds) = crate::table_bounds(table) {
        doc = doc
            .set(
                "viewBox",
                (
                    bounds.min().x,
                    flip(bounds.max().y),
                    bounds.width(),
                    bounds.height(),
                ),
            )
            .set("preserveAspectRatio", "xMidYMid meet");
    }

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    let mut colors: HashMap<u64, &str> = HashMap::new();
    for feature in table {
        let d = build_path_data(&feature.geometry);
        if d.is_empty() {
            continue;
        }

        let next = FILL_COLORS[colors.len() % FILL_COLORS.len()];
        let fill = *colors.entry(feature.value.class_key()).or_insert(next);

        let path = Path::new()
            .set("d", d)
            .set("fill", fill)
            .set("fill-rule", "evenodd")
            .set("stroke", "black")
            .set("stroke-width", 1)
            .set("vector-effect", "non-scaling-stroke")
            .set("data-value", format!("{:?}", feature.value));
        doc = doc.add(path);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
