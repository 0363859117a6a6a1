// src/frame_pipeline.rs
//
// Turns an uploaded camera still into the two inputs of a classification
// pass: the RGBA output canvas and the grayscale edge raster, both cropped
// to the configured window. Thin invocation of the image/imageproc stack:
// decode, rotate about center, resize, grayscale, Canny, invert, crop.

use crate::error::CoreError;
use crate::types::TransformConfig;
use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, Rgba, RgbaImage};
use imageproc::edges::canny;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use tracing::debug;

/// Canvas and edge raster for one frame, in the same coordinate space.
pub struct PreparedFrame {
    pub canvas: RgbaImage,
    /// Inverted Canny output: empty cells are white (255), edges dark.
    pub raster: GrayImage,
}

/// Runs the full transform chain on an encoded image.
pub fn prepare(bytes: &[u8], cfg: &TransformConfig) -> Result<PreparedFrame> {
    let decoded = image::load_from_memory(bytes)
        .context("failed to decode uploaded frame")?
        .to_rgba8();
    debug!(
        width = decoded.width(),
        height = decoded.height(),
        "frame decoded"
    );

    let rotated = if cfg.rotate_degrees != 0.0 {
        rotate_about_center(
            &decoded,
            cfg.rotate_degrees.to_radians(),
            Interpolation::Nearest,
            Rgba([0, 0, 0, 255]),
        )
    } else {
        decoded
    };

    if !(cfg.resize_scale > 0.0) {
        return Err(CoreError::Configuration(format!(
            "resize scale must be positive, got {}",
            cfg.resize_scale
        ))
        .into());
    }
    let new_w = (rotated.width() as f32 * cfg.resize_scale).round() as u32;
    let new_h = (rotated.height() as f32 * cfg.resize_scale).round() as u32;
    if new_w == 0 || new_h == 0 {
        return Err(CoreError::Configuration(format!(
            "resize scale {} collapses a {}x{} frame",
            cfg.resize_scale,
            rotated.width(),
            rotated.height()
        ))
        .into());
    }
    let resized = imageops::resize(&rotated, new_w, new_h, FilterType::Nearest);

    let gray = imageops::grayscale(&resized);
    let mut edges = canny(&gray, cfg.canny_low, cfg.canny_high);
    // Invert so the sentinel "no edge" value is white.
    imageops::invert(&mut edges);

    let crop = cfg.crop;
    if crop.width == 0
        || crop.height == 0
        || crop.x + crop.width > resized.width()
        || crop.y + crop.height > resized.height()
    {
        return Err(CoreError::Configuration(format!(
            "crop window {}x{}+{}+{} does not fit the {}x{} transformed frame",
            crop.width,
            crop.height,
            crop.x,
            crop.y,
            resized.width(),
            resized.height()
        ))
        .into());
    }

    let canvas = imageops::crop_imm(&resized, crop.x, crop.y, crop.width, crop.height).to_image();
    let raster = imageops::crop_imm(&edges, crop.x, crop.y, crop.width, crop.height).to_image();

    debug!(
        canvas_width = canvas.width(),
        canvas_height = canvas.height(),
        "frame prepared"
    );

    Ok(PreparedFrame { canvas, raster })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CropConfig;
    use image::DynamicImage;
    use std::io::Cursor;

    fn encoded_uniform_frame(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            w,
            h,
            Rgba([100, 120, 140, 255]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn transform(crop: CropConfig) -> TransformConfig {
        TransformConfig {
            rotate_degrees: 0.0,
            resize_scale: 1.0,
            canny_low: 50.0,
            canny_high: 100.0,
            crop,
        }
    }

    #[test]
    fn test_uniform_frame_yields_all_empty_raster() {
        let bytes = encoded_uniform_frame(64, 64);
        let cfg = transform(CropConfig {
            x: 8,
            y: 8,
            width: 32,
            height: 32,
        });

        let frame = prepare(&bytes, &cfg).unwrap();
        assert_eq!(frame.canvas.dimensions(), (32, 32));
        assert_eq!(frame.raster.dimensions(), (32, 32));
        // No edges anywhere in a uniform image; after inversion every cell
        // is the white sentinel.
        assert!(frame.raster.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_resize_scale_shrinks_before_crop() {
        let bytes = encoded_uniform_frame(64, 64);
        let mut cfg = transform(CropConfig {
            x: 0,
            y: 0,
            width: 32,
            height: 32,
        });
        cfg.resize_scale = 0.5;

        let frame = prepare(&bytes, &cfg).unwrap();
        assert_eq!(frame.canvas.dimensions(), (32, 32));
    }

    #[test]
    fn test_crop_outside_frame_is_a_configuration_error() {
        let bytes = encoded_uniform_frame(64, 64);
        let cfg = transform(CropConfig {
            x: 48,
            y: 48,
            width: 32,
            height: 32,
        });

        assert!(prepare(&bytes, &cfg).is_err());
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let cfg = transform(CropConfig {
            x: 0,
            y: 0,
            width: 8,
            height: 8,
        });
        assert!(prepare(b"not an image", &cfg).is_err());
    }
}
