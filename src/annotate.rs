// src/annotate.rs
//
// Draws classification results back onto the output canvas: region outlines
// rasterized edge by edge with an incremental midpoint line algorithm, and
// a "<ordinal> <percent>%" label per region, green for empty and red for
// occupied. Indeterminate regions are not drawn at all.

use crate::classifier::Classification;
use crate::region::{Region, Shape};
use crate::types::Decision;
use image::{Rgba, RgbaImage};
use rand::Rng;

pub mod colors {
    use image::Rgba;

    pub const EMPTY_GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    pub const OCCUPIED_RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
}

/// Draws outlines and labels for every determinate region.
///
/// With `jitter` set, outlines use the double-draw variant for a thicker,
/// softer stroke; the classification itself is unaffected.
pub fn annotate(
    canvas: &mut RgbaImage,
    regions: &[Region],
    classification: &Classification,
    jitter: bool,
) {
    let mut rng = rand::thread_rng();

    for result in &classification.results {
        let Some(region) = regions.iter().find(|r| r.id == result.region_id) else {
            continue;
        };
        let color = match result.decision {
            Decision::Empty => colors::EMPTY_GREEN,
            Decision::Occupied => colors::OCCUPIED_RED,
            Decision::Indeterminate => continue,
        };

        if jitter {
            draw_outline_jittered(canvas, region, color, &mut rng);
        } else {
            draw_outline(canvas, region, color);
        }

        if let Some((lx, ly)) = label_anchor(region) {
            let label = format!("{} {:.0}%", result.region_id, result.percentage_empty);
            draw_label(canvas, lx, ly, &label, color);
        }
    }
}

/// Rasterizes the region boundary, including the closing edge from the last
/// vertex back to the first.
pub fn draw_outline(canvas: &mut RgbaImage, region: &Region, color: Rgba<u8>) {
    let vertices = region.outline();
    for i in 0..vertices.len() {
        let a = vertices[i];
        let b = vertices[(i + 1) % vertices.len()];
        trace_line(
            a.x as i32,
            a.y as i32,
            b.x as i32,
            b.y as i32,
            |x, y| put_pixel_checked(canvas, x, y, color),
        );
    }
}

/// Double-draw variant: each line point is plotted twice with a ±1 pixel
/// offset, a cheap thickening/anti-aliasing effect. Cosmetic only.
pub fn draw_outline_jittered<R: Rng>(
    canvas: &mut RgbaImage,
    region: &Region,
    color: Rgba<u8>,
    rng: &mut R,
) {
    let vertices = region.outline();
    for i in 0..vertices.len() {
        let a = vertices[i];
        let b = vertices[(i + 1) % vertices.len()];
        trace_line(a.x as i32, a.y as i32, b.x as i32, b.y as i32, |x, y| {
            for _ in 0..2 {
                let jx = x + rng.gen_range(-1..=1);
                let jy = y + rng.gen_range(-1..=1);
                put_pixel_checked(canvas, jx, jy, color);
            }
        });
    }
}

/// Incremental midpoint line rasterization.
///
/// Classifies the line as shallow or steep, reorders endpoints so the
/// primary axis increases, then steps the secondary axis with an error term
/// that gains the secondary delta per step and sheds the primary delta on a
/// unit step. Every step advances the primary coordinate by exactly one, so
/// the output is connected and monotonic with no axis-aligned gaps.
pub fn trace_line<F: FnMut(i32, i32)>(
    mut ax: i32,
    mut ay: i32,
    mut bx: i32,
    mut by: i32,
    mut plot: F,
) {
    let steep = (by - ay).abs() > (bx - ax).abs();
    if steep {
        std::mem::swap(&mut ax, &mut ay);
        std::mem::swap(&mut bx, &mut by);
    }
    if ax > bx {
        std::mem::swap(&mut ax, &mut bx);
        std::mem::swap(&mut ay, &mut by);
    }

    let dx = bx - ax;
    let dy = (by - ay).abs();
    let mut err = dx / 2;
    let y_step = if ay < by { 1 } else { -1 };

    let mut y = ay;
    for x in ax..=bx {
        if steep {
            plot(y, x);
        } else {
            plot(x, y);
        }

        err -= dy;
        if err < 0 {
            y += y_step;
            err += dx;
        }
    }
}

/// Anchor point for a region's percentage label: a small inset from the
/// bounding box corner for rectangles, the shoelace centroid for polygons.
/// `None` when the centroid is undefined; the caller skips the label.
pub fn label_anchor(region: &Region) -> Option<(i32, i32)> {
    match &region.shape {
        Shape::Rect(r) => Some((r.min.x as i32 + 2, r.max.y as i32 - 2)),
        Shape::Polygon(p) => {
            let c = p.centroid().ok()?;
            Some((c.x as i32 - 14, c.y as i32 + 7))
        }
    }
}

// ----------------------------------------------------------------------------
// Label rendering
// ----------------------------------------------------------------------------
//
// Labels only ever contain digits, spaces and a percent sign, so they are
// stamped from a small embedded 5x7 stencil scaled 2x instead of going
// through a font rasterizer.

const GLYPH_W: i32 = 5;
const GLYPH_H: i32 = 7;
const GLYPH_SCALE: i32 = 2;

/// Stamps `text` onto the canvas with its top-left corner at `(x, y)`.
/// Characters outside the stencil alphabet advance the cursor but draw
/// nothing; pixels falling outside the canvas are dropped.
pub fn draw_label(canvas: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>) {
    let advance = (GLYPH_W + 1) * GLYPH_SCALE;
    for (i, ch) in text.chars().enumerate() {
        let Some(rows) = glyph(ch) else { continue };
        let gx = x + i as i32 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                    continue;
                }
                for sy in 0..GLYPH_SCALE {
                    for sx in 0..GLYPH_SCALE {
                        put_pixel_checked(
                            canvas,
                            gx + col * GLYPH_SCALE + sx,
                            y + row as i32 * GLYPH_SCALE + sy,
                            color,
                        );
                    }
                }
            }
        }
    }
}

fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '%' => [0b11001, 0b11010, 0b00010, 0b00100, 0b01000, 0b01011, 0b10011],
        ' ' => [0; 7],
        _ => return None,
    };
    Some(rows)
}

fn put_pixel_checked(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}
