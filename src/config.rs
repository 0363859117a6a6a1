// src/config.rs

use crate::error::CoreError;
use crate::region::{Point, Polygon, Rect, Region, Shape};
use crate::types::{Config, RegionConfig};
use anyhow::{Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
        let config: Config =
            serde_yaml::from_str(&contents).with_context(|| format!("failed to parse {path}"))?;
        Ok(config)
    }
}

/// Converts configured region definitions into the runtime model, assigning
/// 1-based display ordinals in config order.
pub fn build_regions(configs: &[RegionConfig]) -> Vec<Region> {
    configs
        .iter()
        .enumerate()
        .map(|(i, rc)| {
            let (shape, threshold) = match rc {
                RegionConfig::Rect {
                    min,
                    max,
                    threshold,
                } => (
                    Shape::Rect(Rect::new(
                        Point::new(min[0], min[1]),
                        Point::new(max[0], max[1]),
                    )),
                    *threshold,
                ),
                RegionConfig::Polygon { points, threshold } => (
                    Shape::Polygon(Polygon::new(
                        points.iter().map(|p| Point::new(p[0], p[1])).collect(),
                    )),
                    *threshold,
                ),
            };
            Region {
                id: i + 1,
                shape,
                threshold,
            }
        })
        .collect()
}

/// Setup-time checks for the coordinate-space contract: the default scene
/// profile must exist, the raster scale must be positive, and every region
/// must lie inside the canvas (the crop window). Faults here abort startup
/// rather than surfacing per frame.
pub fn validate(config: &Config, regions: &[Region]) -> Result<(), CoreError> {
    if config
        .thresholds
        .resolve(&config.thresholds.default_profile)
        .is_none()
    {
        return Err(CoreError::Configuration(format!(
            "default threshold profile '{}' is not defined",
            config.thresholds.default_profile
        )));
    }

    if !(config.raster.scale > 0.0) {
        return Err(CoreError::Configuration(format!(
            "raster scale must be positive, got {}",
            config.raster.scale
        )));
    }

    let canvas_w = config.transform.crop.width as f64;
    let canvas_h = config.transform.crop.height as f64;
    for region in regions {
        let Some(bb) = region.bounding_box() else {
            continue;
        };
        if bb.min.x < 0.0 || bb.min.y < 0.0 || bb.max.x > canvas_w || bb.max.y > canvas_h {
            return Err(CoreError::Configuration(format!(
                "region {} bounding box ({:.0},{:.0})-({:.0},{:.0}) lies outside the {}x{} canvas",
                region.id, bb.min.x, bb.min.y, bb.max.x, bb.max.y, canvas_w, canvas_h,
            )));
        }
    }

    Ok(())
}
