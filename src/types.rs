// src/types.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub transform: TransformConfig,
    pub raster: RasterConfig,
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub annotate: AnnotateConfig,
    pub regions: Vec<RegionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotateConfig {
    /// Draw outlines with the jittered double-draw stroke.
    pub jitter: bool,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self { jitter: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for uploaded frames, in bytes.
    pub max_upload_bytes: u64,
}

/// Parameters of the decode → rotate → resize → edge-detect → crop chain
/// that turns the uploaded camera still into a canvas and an edge raster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Rotation about the image center, in degrees.
    pub rotate_degrees: f32,
    /// Uniform resize factor applied after rotation.
    pub resize_scale: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Crop window in resized-image coordinates. Regions are defined in the
    /// coordinate space of this window.
    pub crop: CropConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CropConfig {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterConfig {
    /// Maps raster cell coordinates to canvas/region coordinates. 1.0 when
    /// the edge raster has the same dimensions as the canvas; 2.0 when the
    /// raster was computed from an image downsampled by half, and so on.
    pub scale: f64,
    /// Cell value meaning "no edge detected". The pipeline inverts the edge
    /// image, so empty cells come out white.
    pub empty_value: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Profile used when a request does not pick one (e.g. "night").
    pub default_profile: String,
    /// Scene profiles: percentage-empty cutoffs keyed by profile name.
    pub profiles: BTreeMap<String, f64>,
}

impl ThresholdConfig {
    pub fn resolve(&self, profile: &str) -> Option<f64> {
        self.profiles.get(profile).copied()
    }
}

/// One configured region of interest, as written in `config.yaml`.
///
/// Converted into a [`crate::region::Region`] at startup; kept separate so
/// the classifier core stays independent of any specific installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RegionConfig {
    Rect {
        min: [f64; 2],
        max: [f64; 2],
        #[serde(default)]
        threshold: Option<f64>,
    },
    Polygon {
        points: Vec<[f64; 2]>,
        #[serde(default)]
        threshold: Option<f64>,
    },
}

/// Outcome for a single region after a classification pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OccupancyResult {
    /// 1-based ordinal matching the drawn label.
    pub region_id: usize,
    pub percentage_empty: f64,
    pub decision: Decision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Empty,
    Occupied,
    Indeterminate,
}
