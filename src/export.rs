//! File output: the timestamped takeoff CSV and the flattened page PNG.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use image::{Rgba, RgbaImage};

use crate::geometry::Point;
use crate::project::{PageMarkups, Symbol};
use crate::session::LineDraft;

const RUN_STROKE: [u8; 4] = [0x2a, 0xa3, 0xff, 0xff];
const CALIBRATION_FILL: [u8; 4] = [0xff, 0xd3, 0x5a, 0xff];
const FALLBACK_FILL: [u8; 4] = [0xff, 0x4b, 0x4b, 0xff];
const RING: [u8; 4] = [0xff, 0xff, 0xff, 0xff];

const COUNT_RADIUS: i64 = 7;
const CALIBRATION_RADIUS: i64 = 6;
const RUN_THICKNESS: f64 = 3.0;

/// CSV filename stamped with local time, e.g. `takeoff_20260822141523.csv`.
pub fn csv_filename() -> String {
    format!("takeoff_{}.csv", Local::now().format("%Y%m%d%H%M%S"))
}

/// PNG filename carrying the 1-based page number.
pub fn png_filename(page: u16) -> String {
    format!("takeoff_marked_page{}.png", page + 1)
}

pub fn write_csv(path: &Path, csv: &str) -> Result<()> {
    fs::write(path, csv).with_context(|| format!("failed to write CSV to {}", path.display()))
}

pub fn write_png(path: &Path, img: &RgbaImage) -> Result<()> {
    img.save(path)
        .with_context(|| format!("failed to write PNG to {}", path.display()))
}

/// Copy the page raster and rasterize the overlay onto it: count dots in
/// their symbol colors, runs and the draft as blue polylines, calibration
/// clicks as yellow dots. Text labels are not rasterized; drawing text needs
/// a font rasterizer, which the stack does not carry.
pub fn flatten_page(
    raster: &RgbaImage,
    markups: Option<&PageMarkups>,
    symbols: &[Symbol],
    draft: Option<&LineDraft>,
    calibration: &[Point],
) -> RgbaImage {
    let mut img = raster.clone();
    if let Some(markups) = markups {
        for run in &markups.runs {
            draw_polyline(&mut img, &run.points, RUN_STROKE);
        }
        for mark in &markups.counts {
            let fill = symbols
                .iter()
                .find(|s| s.key == mark.symbol)
                .map(|s| [s.color[0], s.color[1], s.color[2], 0xff])
                .unwrap_or(FALLBACK_FILL);
            draw_dot(&mut img, mark.pos, COUNT_RADIUS, fill);
        }
    }
    if let Some(draft) = draft {
        draw_polyline(&mut img, &draft.vertices, RUN_STROKE);
    }
    for point in calibration {
        draw_dot(&mut img, *point, CALIBRATION_RADIUS, CALIBRATION_FILL);
    }
    img
}

fn draw_polyline(img: &mut RgbaImage, points: &[Point], color: [u8; 4]) {
    for pair in points.windows(2) {
        draw_segment(img, pair[0], pair[1], RUN_THICKNESS, color);
    }
}

fn draw_segment(img: &mut RgbaImage, a: Point, b: Point, thickness: f64, color: [u8; 4]) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    let steps = (len * 2.0) as i64;
    let half = ((thickness / 2.0).max(0.5)) as i64;
    let (w, h) = (img.width() as i64, img.height() as i64);

    for i in 0..=steps {
        let t = i as f64 / steps.max(1) as f64;
        let cx = (a.x + dx * t) as i64;
        let cy = (a.y + dy * t) as i64;
        for oy in -half..=half {
            for ox in -half..=half {
                let px = cx + ox;
                let py = cy + oy;
                if px >= 0 && px < w && py >= 0 && py < h {
                    img.put_pixel(px as u32, py as u32, Rgba(color));
                }
            }
        }
    }
}

/// Filled disc with a one-pixel white ring, clipped to the image.
fn draw_dot(img: &mut RgbaImage, center: Point, radius: i64, fill: [u8; 4]) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let cx = center.x.round() as i64;
    let cy = center.y.round() as i64;
    let fill_r2 = radius * radius;
    let ring_r2 = (radius + 1) * (radius + 1);

    for oy in -(radius + 1)..=(radius + 1) {
        for ox in -(radius + 1)..=(radius + 1) {
            let px = cx + ox;
            let py = cy + oy;
            if px < 0 || px >= w || py < 0 || py >= h {
                continue;
            }
            let d2 = ox * ox + oy * oy;
            if d2 <= fill_r2 {
                img.put_pixel(px as u32, py as u32, Rgba(fill));
            } else if d2 <= ring_r2 {
                img.put_pixel(px as u32, py as u32, Rgba(RING));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;

    fn blank(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([0xff, 0xff, 0xff, 0xff]))
    }

    #[test]
    fn test_csv_filename_shape() {
        let name = csv_filename();
        assert!(name.starts_with("takeoff_"));
        assert!(name.ends_with(".csv"));
        let stamp = &name["takeoff_".len()..name.len() - ".csv".len()];
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_png_filename_is_one_based() {
        assert_eq!(png_filename(0), "takeoff_marked_page1.png");
        assert_eq!(png_filename(11), "takeoff_marked_page12.png");
    }

    #[test]
    fn test_flatten_keeps_dimensions() {
        let raster = blank(200, 100);
        let out = flatten_page(&raster, None, &[], None, &[]);
        assert_eq!(out.dimensions(), (200, 100));
        assert_eq!(out.as_raw(), raster.as_raw());
    }

    #[test]
    fn test_flatten_draws_count_dot_in_symbol_color() {
        let raster = blank(100, 100);
        let mut project = Project::new();
        project.add_count(0, "GFCI", Point::new(50.0, 50.0));

        let out = flatten_page(&raster, project.page(0), &project.symbols, None, &[]);
        assert_eq!(out.get_pixel(50, 50), &Rgba([0x2a, 0xa3, 0xff, 0xff]));
        assert_eq!(out.get_pixel(5, 5), &Rgba([0xff, 0xff, 0xff, 0xff]));
    }

    #[test]
    fn test_flatten_draws_run_stroke() {
        let raster = blank(100, 100);
        let mut project = Project::new();
        project.add_run(
            0,
            crate::project::LinearRun::measured(
                "EMT",
                vec![Point::new(10.0, 20.0), Point::new(90.0, 20.0)],
                1.0,
            ),
        );

        let out = flatten_page(&raster, project.page(0), &project.symbols, None, &[]);
        assert_eq!(out.get_pixel(50, 20), &Rgba(RUN_STROKE));
    }

    #[test]
    fn test_flatten_clips_out_of_bounds_shapes() {
        let raster = blank(40, 40);
        let calibration = [Point::new(-3.0, -3.0), Point::new(39.0, 39.0)];
        let out = flatten_page(&raster, None, &[], None, &calibration);
        assert_eq!(out.dimensions(), (40, 40));
        assert_eq!(out.get_pixel(39, 39), &Rgba(CALIBRATION_FILL));
    }

    #[test]
    fn test_write_csv_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(csv_filename());
        write_csv(&path, "Type,Item,Qty/Length,Units,Page,Notes\nCOUNT,DUP,1,ea,1,").unwrap();
        let body = fs::read_to_string(&path).unwrap();
        assert!(body.ends_with("COUNT,DUP,1,ea,1,"));
    }
}
