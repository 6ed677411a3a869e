//! Connected-component labelling of equal-valued cells.
//!
//! Cell values are first mapped to dense class ids (0 is reserved for
//! masked-out cells) so that `imageproc`'s labeller can run on any
//! [`CellValue`], floats included. Labels are then renumbered so that
//! region 1 is the one whose first cell comes first in raster-scan order.

use std::collections::HashMap;

use image::{ImageBuffer, Luma};
use imageproc::region_labelling::connected_components;

use crate::mask::Mask;
use crate::trace::Connectivity;
use crate::types::{Band, CellValue};

/// Per-cell region labels; 0 marks excluded cells.
pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Result of labelling a band.
#[derive(Debug, Clone)]
pub struct Regions<T> {
    /// Region label of every cell, 1-based and dense.
    pub labels: LabelImage,
    /// Value of each region; `values[label - 1]`.
    pub values: Vec<T>,
}

impl<T> Regions<T> {
    /// Number of regions found.
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no cell was labelled.
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Label contiguous same-valued regions of `band`, skipping cells the
/// mask excludes.
///
/// The caller guarantees the mask, if any, has the band's shape.
pub fn label_regions<T: CellValue>(
    band: &Band<T>,
    mask: Option<&Mask>,
    connectivity: Connectivity,
) -> Regions<T> {
    let dims = band.dimensions();
    if dims.is_empty() {
        return Regions {
            labels: LabelImage::new(dims.width, dims.height),
            values: Vec::new(),
        };
    }

    let mut classes: HashMap<u64, u32> = HashMap::new();
    let class_image = LabelImage::from_fn(dims.width, dims.height, |col, row| {
        let included = mask.is_none_or(|m| m.includes(col, row));
        match band.get(col, row) {
            Some(value) if included => {
                let next = u32::try_from(classes.len() + 1).unwrap_or(u32::MAX);
                Luma([*classes.entry(value.class_key()).or_insert(next)])
            }
            _ => Luma([0]),
        }
    });

    let raw = connected_components(&class_image, connectivity.into(), Luma([0_u32]));

    // Renumber in scan order and record each region's value.
    let mut renumber: HashMap<u32, u32> = HashMap::new();
    let mut values = Vec::new();
    let labels = LabelImage::from_fn(dims.width, dims.height, |col, row| {
        let label = raw.get_pixel(col, row).0[0];
        if label == 0 {
            return Luma([0]);
        }
        let dense = *renumber.entry(label).or_insert_with(|| {
            if let Some(value) = band.get(col, row) {
                values.push(value);
            }
            u32::try_from(values.len()).unwrap_or(u32::MAX)
        });
        Luma([dense])
    });

    log::debug!(
        "labelled {} regions from {} value classes in a {dims} band",
        values.len(),
        classes.len(),
    );

    Regions { labels, values }
}
