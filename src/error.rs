// src/error.rs

use thiserror::Error;

/// Failure conditions of the classification core.
///
/// Application-level code wraps these in `anyhow::Error`; they exist as a
/// typed enum so callers can tell a setup fault apart from a degenerate
/// geometry case.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The polygon's signed area is zero, so the shoelace centroid would
    /// divide by zero. Callers skip label placement for the region.
    #[error("undefined centroid: polygon has zero signed area")]
    UndefinedCentroid,

    /// Region, raster, and canvas coordinate spaces do not line up. This is
    /// a setup-time fault and aborts the classification pass for the frame.
    #[error("configuration error: {0}")]
    Configuration(String),
}
