//! Region outline tracing: turn labelled cells into polygons.
//!
//! Every cell side that separates a region from anything else (another
//! region, a masked-out cell, or the edge of the grid) becomes a directed
//! boundary edge, oriented so the region lies on a fixed side. Following
//! edges head-to-tail yields closed rings. In grid space (rows growing
//! downwards) outer rings have positive signed area and holes negative,
//! which is how shells and holes are told apart.
//!
//! # Pinch vertices
//!
//! Where two cells of the same region meet only at a corner, two boundary
//! edges enter and two leave the shared vertex. Linking always continues
//! along the cell the ring was already following, so a ring never jumps
//! diagonally between cells. A walk can still return to a vertex it has
//! passed, for example when a hole touches the outer boundary at a corner
//! or two holes touch each other. Such walks are cut into simple rings at
//! every repeated vertex, and each piece becomes a shell or a hole by its
//! signed area. Rings of one region therefore meet only at single points:
//!
//! - a hole touching its shell at a corner stays a separate hole;
//! - holes touching each other at a corner stay separate holes;
//! - cells joined only diagonally under [`Connectivity::Eight`] come out as
//!   separate parts of a `MultiPolygon`.

use std::collections::HashMap;

use geo::{
    AffineOps, Area, Contains, Coord, Geometry, LineString, MultiPolygon, Polygon,
    orient::{Direction, Orient},
};
use serde::{Deserialize, Serialize};

use crate::label::{LabelImage, label_regions};
use crate::mask::Mask;
use crate::transform::Affine;
use crate::types::{Band, CellValue, ConvertError, Feature};

/// Which neighbouring cells count as adjacent when growing regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Cells sharing a side.
    #[default]
    Four,
    /// Cells sharing a side or a corner.
    Eight,
}

impl From<Connectivity> for imageproc::region_labelling::Connectivity {
    fn from(connectivity: Connectivity) -> Self {
        match connectivity {
            Connectivity::Four => Self::Four,
            Connectivity::Eight => Self::Eight,
        }
    }
}

/// Grid corner position `(col, row)`.
type Vertex = (u32, u32);

/// One cell side on a region boundary, with the region on its right when
/// viewed with rows growing downwards.
#[derive(Debug, Clone, Copy)]
struct Edge {
    start: Vertex,
    end: Vertex,
    /// The region cell this side belongs to.
    cell: Vertex,
    label: u32,
}

/// A closed boundary ring in grid coordinates (first vertex not repeated).
#[derive(Debug, Clone)]
struct Ring {
    label: u32,
    vertices: Vec<Vertex>,
}

/// Shells and holes belonging to one region.
#[derive(Debug, Default)]
struct RegionRings {
    shells: Vec<Vec<Vertex>>,
    holes: Vec<Vec<Vertex>>,
}

/// Trace one polygon (or multi-polygon) per contiguous same-valued region.
///
/// Cells excluded by `mask` are skipped entirely. Corner positions are
/// mapped to map coordinates through `transform`; outer rings come out
/// counter-clockwise and holes clockwise. Features are ordered by the
/// raster-scan position of each region's first cell.
///
/// # Errors
///
/// Returns [`ConvertError::MaskShape`] if the mask does not match the
/// band, [`ConvertError::DegenerateTransform`] if `transform` is singular
/// or non-finite, and [`ConvertError::Geometry`] if region boundaries
/// cannot be closed into rings.
pub fn shapes<T: CellValue>(
    band: &Band<T>,
    mask: Option<&Mask>,
    transform: &Affine,
    connectivity: Connectivity,
) -> Result<Vec<Feature<T>>, ConvertError> {
    if let Some(mask) = mask
        && mask.dimensions() != band.dimensions()
    {
        return Err(ConvertError::MaskShape {
            expected: band.dimensions(),
            actual: mask.dimensions(),
        });
    }
    if transform.is_degenerate() {
        return Err(ConvertError::DegenerateTransform(*transform));
    }

    let regions = label_regions(band, mask, connectivity);
    if regions.is_empty() {
        return Ok(Vec::new());
    }

    let edges = boundary_edges(&regions.labels);
    let rings = link_rings(&edges)?;
    log::debug!(
        "linked {} boundary edges into {} rings for {} regions",
        edges.len(),
        rings.len(),
        regions.len(),
    );

    let mut grouped: Vec<RegionRings> = std::iter::repeat_with(RegionRings::default)
        .take(regions.len())
        .collect();
    for ring in rings {
        let region = ring
            .label
            .checked_sub(1)
            .and_then(|i| grouped.get_mut(i as usize))
            .ok_or_else(|| {
                ConvertError::Geometry(format!("ring for unknown region {}", ring.label))
            })?;
        for piece in split_at_repeats(&ring.vertices) {
            let vertices = drop_collinear(&piece);
            if doubled_signed_area(&vertices) > 0 {
                region.shells.push(vertices);
            } else {
                region.holes.push(vertices);
            }
        }
    }

    let geo_transform = transform.to_geo();
    grouped
        .into_iter()
        .zip(regions.values)
        .enumerate()
        .map(|(index, (rings, value))| {
            let polygons = assemble_polygons(rings).ok_or_else(|| {
                ConvertError::Geometry(format!("region {} has no outer boundary", index + 1))
            })?;
            let mut placed: Vec<Polygon<f64>> = polygons
                .into_iter()
                .map(|p| p.affine_transform(&geo_transform).orient(Direction::Default))
                .collect();
            let geometry = if placed.len() == 1 {
                Geometry::Polygon(placed.remove(0))
            } else {
                Geometry::MultiPolygon(MultiPolygon::new(placed))
            };
            Ok(Feature { geometry, value })
        })
        .collect()
}

/// Collect every directed cell side that borders a different label.
fn boundary_edges(labels: &LabelImage) -> Vec<Edge> {
    let (width, height) = labels.dimensions();
    let label_at = |col: Option<u32>, row: Option<u32>| match (col, row) {
        (Some(col), Some(row)) if col < width && row < height => {
            labels.get_pixel(col, row).0[0]
        }
        _ => 0,
    };

    let mut edges = Vec::new();
    for (col, row, pixel) in labels.enumerate_pixels() {
        let label = pixel.0[0];
        if label == 0 {
            continue;
        }
        let cell = (col, row);
        let mut push = |start: Vertex, end: Vertex| {
            edges.push(Edge {
                start,
                end,
                cell,
                label,
            });
        };

        if label_at(Some(col), row.checked_sub(1)) != label {
            push((col, row), (col + 1, row));
        }
        if label_at(col.checked_add(1), Some(row)) != label {
            push((col + 1, row), (col + 1, row + 1));
        }
        if label_at(Some(col), row.checked_add(1)) != label {
            push((col + 1, row + 1), (col, row + 1));
        }
        if label_at(col.checked_sub(1), Some(row)) != label {
            push((col, row + 1), (col, row));
        }
    }
    edges
}

/// Link boundary edges head-to-tail into closed rings.
fn link_rings(edges: &[Edge]) -> Result<Vec<Ring>, ConvertError> {
    let mut outgoing: HashMap<(u32, Vertex), Vec<usize>> = HashMap::new();
    for (i, edge) in edges.iter().enumerate() {
        outgoing.entry((edge.label, edge.start)).or_default().push(i);
    }

    let mut visited = vec![false; edges.len()];
    let mut rings = Vec::new();
    for first in 0..edges.len() {
        if visited[first] {
            continue;
        }
        let mut vertices = Vec::new();
        let mut current = first;
        loop {
            if visited[current] {
                return Err(ConvertError::Geometry(format!(
                    "boundary of region {} does not close",
                    edges[first].label,
                )));
            }
            visited[current] = true;
            vertices.push(edges[current].start);
            current = next_edge(edges, &outgoing, current)?;
            if current == first {
                break;
            }
        }
        rings.push(Ring {
            label: edges[first].label,
            vertices,
        });
    }
    Ok(rings)
}

/// Pick the edge that continues the ring after `current`. At a pinch
/// vertex this is the edge of the same cell.
fn next_edge(
    edges: &[Edge],
    outgoing: &HashMap<(u32, Vertex), Vec<usize>>,
    current: usize,
) -> Result<usize, ConvertError> {
    let edge = edges[current];
    let candidates = outgoing
        .get(&(edge.label, edge.end))
        .map_or(&[][..], Vec::as_slice);
    match *candidates {
        [only] => Ok(only),
        [first, second] => {
            if edges[first].cell == edge.cell {
                Ok(first)
            } else {
                Ok(second)
            }
        }
        _ => Err(ConvertError::Geometry(format!(
            "{} boundary edges leave corner {:?} of region {}",
            candidates.len(),
            edge.end,
            edge.label,
        ))),
    }
}

/// Cut a closed walk into simple rings at every vertex it visits twice.
///
/// Each loop between two visits of the same vertex is split off as its
/// own ring; what remains after the last cut is the ring through the
/// walk's first vertex.
fn split_at_repeats(vertices: &[Vertex]) -> Vec<Vec<Vertex>> {
    let mut pieces = Vec::new();
    let mut path: Vec<Vertex> = Vec::with_capacity(vertices.len());
    let mut seen: HashMap<Vertex, usize> = HashMap::new();
    for &vertex in vertices {
        if let Some(&at) = seen.get(&vertex) {
            let piece: Vec<Vertex> = path.drain(at..).collect();
            for v in &piece {
                seen.remove(v);
            }
            pieces.push(piece);
        }
        seen.insert(vertex, path.len());
        path.push(vertex);
    }
    pieces.push(path);
    pieces
}

/// Remove vertices that lie on a straight run between their neighbours.
fn drop_collinear(vertices: &[Vertex]) -> Vec<Vertex> {
    let n = vertices.len();
    (0..n)
        .filter(|&i| {
            let prev = vertices[(i + n - 1) % n];
            let next = vertices[(i + 1) % n];
            !is_collinear(prev, vertices[i], next)
        })
        .map(|i| vertices[i])
        .collect()
}

fn is_collinear(a: Vertex, b: Vertex, c: Vertex) -> bool {
    let (ax, ay) = (i64::from(a.0), i64::from(a.1));
    let (bx, by) = (i64::from(b.0), i64::from(b.1));
    let (cx, cy) = (i64::from(c.0), i64::from(c.1));
    (bx - ax) * (cy - by) == (by - ay) * (cx - bx)
}

/// Twice the shoelace area in grid space (rows downwards).
fn doubled_signed_area(vertices: &[Vertex]) -> i128 {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = vertices[i];
            let (x1, y1) = vertices[(i + 1) % n];
            i128::from(x0) * i128::from(y1) - i128::from(x1) * i128::from(y0)
        })
        .sum()
}

fn to_line_string(vertices: &[Vertex]) -> LineString<f64> {
    vertices
        .iter()
        .map(|&(col, row)| Coord {
            x: f64::from(col),
            y: f64::from(row),
        })
        .collect()
}

/// A point strictly inside the first unit edge of a ring. It lies on this
/// ring and on no other ring of the same region.
fn point_on_ring(vertices: &[Vertex]) -> Coord<f64> {
    let (x0, y0) = vertices[0];
    let (x1, y1) = vertices[1 % vertices.len()];
    let step = |from: u32, to: u32| match to.cmp(&from) {
        std::cmp::Ordering::Greater => 0.5,
        std::cmp::Ordering::Less => -0.5,
        std::cmp::Ordering::Equal => 0.0,
    };
    Coord {
        x: f64::from(x0) + step(x0, x1),
        y: f64::from(y0) + step(y0, y1),
    }
}

/// Build grid-space polygons for one region, giving each hole to the
/// smallest shell that encloses it. Returns `None` if the region has no
/// shell.
fn assemble_polygons(rings: RegionRings) -> Option<Vec<Polygon<f64>>> {
    if rings.shells.is_empty() {
        return None;
    }

    let shells: Vec<Polygon<f64>> = rings
        .shells
        .iter()
        .map(|s| Polygon::new(to_line_string(s), Vec::new()))
        .collect();
    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];

    for hole in &rings.holes {
        let owner = if shells.len() == 1 {
            0
        } else {
            let point = point_on_ring(hole);
            shells
                .iter()
                .enumerate()
                .filter(|(_, shell)| shell.contains(&point))
                .min_by(|(_, a), (_, b)| a.unsigned_area().total_cmp(&b.unsigned_area()))
                .map_or(0, |(i, _)| i)
        };
        interiors[owner].push(to_line_string(hole));
    }

    Some(
        shells
            .into_iter()
            .zip(interiors)
            .map(|(shell, holes)| Polygon::new(shell.into_inner().0, holes))
            .collect(),
    )
}
