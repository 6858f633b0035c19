use std::fs;
use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};

use crate::error::Result;
use crate::io::lightcurve::LightCurvePoint;

const PLOT_WIDTH: u32 = 640;
const PLOT_HEIGHT: u32 = 320;
const MARGIN: u32 = 20;
const BACKGROUND: u8 = 255;
const INK: u8 = 40;

/// Render per-image metric values as a column chart into an 8-bit
/// grayscale PNG. A quick-look diagnostic, not publication plotting.
pub fn plot_metric_values(values: &[f64], path: &Path) -> Result<()> {
    let mut img = GrayImage::from_pixel(PLOT_WIDTH, PLOT_HEIGHT, Luma([BACKGROUND]));
    if !values.is_empty() {
        let (lo, hi) = value_range(values);
        let span = (hi - lo).max(f64::EPSILON);
        let plot_w = PLOT_WIDTH - 2 * MARGIN;
        let plot_h = PLOT_HEIGHT - 2 * MARGIN;
        let column_w = (plot_w / values.len() as u32).clamp(1, 40);

        for (i, value) in values.iter().enumerate() {
            let frac = ((value - lo) / span) as f32;
            let height = ((plot_h as f32) * frac).round() as u32;
            let x0 = MARGIN + i as u32 * column_w;
            for x in x0..(x0 + column_w).saturating_sub(1).min(PLOT_WIDTH - 1) {
                for y in (PLOT_HEIGHT - MARGIN - height)..(PLOT_HEIGHT - MARGIN) {
                    img.put_pixel(x, y, Luma([INK]));
                }
            }
        }
        draw_axes(&mut img);
    }
    save_png(&img, path)
}

/// Render a light curve as a magnitude scatter, brighter (smaller
/// magnitude) plotted higher.
pub fn plot_light_curve(points: &[LightCurvePoint], path: &Path) -> Result<()> {
    let mut img = GrayImage::from_pixel(PLOT_WIDTH, PLOT_HEIGHT, Luma([BACKGROUND]));
    if !points.is_empty() {
        let mjds: Vec<f64> = points.iter().map(|p| p.mjd).collect();
        let mags: Vec<f64> = points.iter().map(|p| p.mag).collect();
        let (mjd_lo, mjd_hi) = value_range(&mjds);
        let (mag_lo, mag_hi) = value_range(&mags);
        let mjd_span = (mjd_hi - mjd_lo).max(f64::EPSILON);
        let mag_span = (mag_hi - mag_lo).max(f64::EPSILON);
        let plot_w = (PLOT_WIDTH - 2 * MARGIN) as f64;
        let plot_h = (PLOT_HEIGHT - 2 * MARGIN) as f64;

        for point in points {
            let x = MARGIN as f64 + (point.mjd - mjd_lo) / mjd_span * plot_w;
            // Magnitudes grow downward: the brightest point sits on top.
            let y = MARGIN as f64 + (point.mag - mag_lo) / mag_span * plot_h;
            draw_dot(&mut img, x as u32, y as u32);
        }
        draw_axes(&mut img);
    }
    save_png(&img, path)
}

fn value_range(values: &[f64]) -> (f64, f64) {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lo, hi)
}

fn draw_dot(img: &mut GrayImage, cx: u32, cy: u32) {
    for dx in 0..3u32 {
        for dy in 0..3u32 {
            let x = (cx + dx).saturating_sub(1).min(PLOT_WIDTH - 1);
            let y = (cy + dy).saturating_sub(1).min(PLOT_HEIGHT - 1);
            img.put_pixel(x, y, Luma([INK]));
        }
    }
}

fn draw_axes(img: &mut GrayImage) {
    for x in MARGIN..PLOT_WIDTH - MARGIN {
        img.put_pixel(x, PLOT_HEIGHT - MARGIN, Luma([INK]));
    }
    for y in MARGIN..PLOT_HEIGHT - MARGIN {
        img.put_pixel(MARGIN, y, Luma([INK]));
    }
}

fn save_png(img: &GrayImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
