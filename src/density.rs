// src/density.rs
//
// Edge-density aggregation: walks the edge raster once per frame and counts,
// for every region, how many cells inside it carry an edge and how many are
// empty. The scan is the hot loop of a pass; it is restricted to the union
// bounding box of all regions and parallelized over raster rows. Workers
// accumulate into per-worker tally vectors that are merged in a final
// reduction, so no counter is ever shared mutably across threads. Row order
// is irrelevant because the counts are commutative sums.

use crate::error::CoreError;
use crate::region::{min_max_many, Point, Rect, Region};
use image::GrayImage;
use rayon::prelude::*;

/// Edge/empty cell counts for one region, owned by a single classification
/// pass and consumed exactly once by the classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionTally {
    pub edge: u64,
    pub empty: u64,
}

impl RegionTally {
    fn merge(&mut self, other: &RegionTally) {
        self.edge += other.edge;
        self.empty += other.empty;
    }
}

/// Scans the raster and tallies edge/empty cells per region.
///
/// `empty_value` is the sentinel for "no edge detected"; every other cell
/// value counts as an edge. `scale` maps raster cell coordinates into the
/// region coordinate space (cell `(x, y)` tests the point
/// `(x·scale, y·scale)`). A cell belonging to several overlapping regions
/// increments each of them.
///
/// Returns one tally per region, in region order. Fails with a
/// configuration error when the region envelope is not covered by the
/// raster, which aborts the pass for this frame.
pub fn scan(
    raster: &GrayImage,
    empty_value: u8,
    scale: f64,
    regions: &[Region],
) -> Result<Vec<RegionTally>, CoreError> {
    if !(scale > 0.0) {
        return Err(CoreError::Configuration(format!(
            "raster scale must be positive, got {scale}"
        )));
    }
    if regions.is_empty() {
        return Ok(Vec::new());
    }

    let zero = || vec![RegionTally::default(); regions.len()];

    // Regions without a bounding box (vertex-less polygons) never match a
    // cell; their tallies stay zero and the classifier marks them
    // indeterminate.
    let Some(envelope) = min_max_many(regions) else {
        return Ok(zero());
    };

    if raster.width() == 0 || raster.height() == 0 {
        return Err(CoreError::Configuration(
            "edge raster has zero dimensions".to_string(),
        ));
    }

    let covered_w = raster.width() as f64 * scale;
    let covered_h = raster.height() as f64 * scale;
    if envelope.min.x < 0.0
        || envelope.min.y < 0.0
        || envelope.max.x > covered_w
        || envelope.max.y > covered_h
    {
        return Err(CoreError::Configuration(format!(
            "region envelope ({:.0},{:.0})-({:.0},{:.0}) exceeds the raster coverage {:.0}x{:.0}",
            envelope.min.x, envelope.min.y, envelope.max.x, envelope.max.y, covered_w, covered_h,
        )));
    }

    let pruned: Vec<(usize, Rect, &Region)> = regions
        .iter()
        .enumerate()
        .filter_map(|(idx, region)| region.bounding_box().map(|bb| (idx, bb, region)))
        .collect();

    // Cells whose mapped point can fall inside the envelope.
    let x0 = (envelope.min.x / scale).ceil() as u32;
    let y0 = (envelope.min.y / scale).ceil() as u32;
    let x1 = ((envelope.max.x / scale).floor() as u32).min(raster.width() - 1);
    let y1 = ((envelope.max.y / scale).floor() as u32).min(raster.height() - 1);

    let tallies = (y0..y1 + 1)
        .into_par_iter()
        .fold(zero, |mut acc, y| {
            for x in x0..=x1 {
                let p = Point::new(x as f64 * scale, y as f64 * scale);
                let is_empty = raster.get_pixel(x, y)[0] == empty_value;
                for (idx, bbox, region) in &pruned {
                    if bbox.contains(p) && region.contains(p) {
                        let tally = &mut acc[*idx];
                        if is_empty {
                            tally.empty += 1;
                        } else {
                            tally.edge += 1;
                        }
                    }
                }
            }
            acc
        })
        .reduce(zero, |mut a, b| {
            for (tally, partial) in a.iter_mut().zip(&b) {
                tally.merge(partial);
            }
            a
        });

    Ok(tallies)
}
