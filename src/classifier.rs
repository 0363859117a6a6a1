// src/classifier.rs
//
// Converts per-region edge/empty tallies into percentage-empty scores and
// occupancy decisions.

use crate::density::RegionTally;
use crate::region::Region;
use crate::types::{Decision, OccupancyResult};
use tracing::debug;

/// Output of one classification pass.
#[derive(Debug, Clone)]
pub struct Classification {
    /// One record per determinate region, in region order.
    pub results: Vec<OccupancyResult>,
    /// Ids of regions excluded by the empty-sample policy (`empty == 0`).
    pub indeterminate: Vec<usize>,
}

impl Classification {
    pub fn count(&self, decision: Decision) -> usize {
        self.results.iter().filter(|r| r.decision == decision).count()
    }
}

/// Classifies every region against its effective threshold.
///
/// The effective threshold is the region's own override when present,
/// otherwise `profile_threshold`. A region whose scan saw no empty cells has
/// no meaningful ratio and is marked indeterminate instead of dividing by
/// zero; it is excluded from the result sequence and from drawing.
pub fn classify(
    regions: &[Region],
    tallies: &[RegionTally],
    profile_threshold: f64,
) -> Classification {
    let mut results = Vec::with_capacity(regions.len());
    let mut indeterminate = Vec::new();

    for (region, tally) in regions.iter().zip(tallies) {
        if tally.empty == 0 {
            debug!(region = region.id, "no empty samples, skipping region");
            indeterminate.push(region.id);
            continue;
        }

        let percentage_empty = percentage_empty(tally);
        let threshold = region.threshold.unwrap_or(profile_threshold);
        let decision = if percentage_empty > threshold {
            Decision::Empty
        } else {
            Decision::Occupied
        };

        debug!(
            region = region.id,
            edge = tally.edge,
            empty = tally.empty,
            percentage_empty,
            threshold,
            ?decision,
            "region classified"
        );

        results.push(OccupancyResult {
            region_id: region.id,
            percentage_empty,
            decision,
        });
    }

    Classification {
        results,
        indeterminate,
    }
}

/// `100 − edge/empty·100`, floored at zero. A region denser in edges than
/// in empty cells reads as fully occupied rather than negatively empty.
fn percentage_empty(tally: &RegionTally) -> f64 {
    (100.0 - (tally.edge as f64 / tally.empty as f64) * 100.0).max(0.0)
}
