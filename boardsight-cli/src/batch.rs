//! Offline scan of a screenshot directory.

use crate::config::BatchJson;
use crate::detect::{load_rgb, Detector};
use crate::report::{BatchReport, ScreenshotResult, Size};
use boardsight::image::io::has_image_extension;
use boardsight::Match;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// Box colours, cycled per template.
const PALETTE: [[u8; 3]; 5] = [
    [0, 255, 0],
    [0, 0, 255],
    [255, 0, 0],
    [0, 255, 255],
    [255, 0, 255],
];
const BOX_THICKNESS: i32 = 3;
const CENTER_RADIUS: i32 = 8;
const CENTER_COLOR: [u8; 3] = [255, 0, 0];

/// Image files directly inside `dir`, sorted by path.
pub fn list_screenshots(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_image_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Draws each match box and its center point.
pub fn highlight(img: &mut RgbImage, matches: &[&Match], color: [u8; 3]) {
    for m in matches {
        for t in 0..BOX_THICKNESS {
            let rect = Rect::at(m.x as i32 - t, m.y as i32 - t)
                .of_size(m.width as u32 + 2 * t as u32, m.height as u32 + 2 * t as u32);
            draw_hollow_rect_mut(img, rect, Rgb(color));
        }
        let (cx, cy) = m.center();
        draw_filled_circle_mut(img, (cx as i32, cy as i32), CENTER_RADIUS, Rgb(CENTER_COLOR));
    }
}

/// Processes every screenshot and writes the JSON report.
///
/// Screenshots that cannot be decoded or processed are skipped with a
/// warning; frames too small for the search region get an empty record.
pub fn run(detector: &Detector, opts: &BatchJson) -> Result<BatchReport, Box<dyn Error>> {
    let screenshots = list_screenshots(&opts.screenshots_dir)?;
    fs::create_dir_all(&opts.output_dir)?;
    tracing::info!(
        screenshots = screenshots.len(),
        templates = detector.cache().len(),
        "starting batch"
    );

    let mut results = Vec::with_capacity(screenshots.len());
    for path in screenshots {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut rgb = match load_rgb(&path) {
            Ok(rgb) => rgb,
            Err(err) => {
                tracing::warn!("skipping {name}: {err}");
                continue;
            }
        };

        let out = match detector.detect(&rgb) {
            Ok((out, _board)) => out,
            Err(err) => {
                tracing::warn!("skipping {name}: {err}");
                continue;
            }
        };
        let size = Size {
            width: rgb.width() as usize,
            height: rgb.height() as usize,
        };
        let mut result = ScreenshotResult::from_cycle(name.clone(), size, &out);
        for icon in &result.icons_detected {
            if icon.matches_found == 0 {
                tracing::debug!(
                    "{name}: no {} (best confidence {:.3})",
                    icon.icon_name,
                    icon.best_confidence
                );
            }
        }

        if opts.highlight && result.total_matches > 0 {
            for (idx, tpl) in out.templates.iter().enumerate() {
                let matches: Vec<&Match> = out
                    .matches
                    .iter()
                    .filter(|m| m.template_id == tpl.template_id)
                    .collect();
                highlight(&mut rgb, &matches, PALETTE[idx % PALETTE.len()]);
            }
            let file_name = format!("detected_{name}");
            rgb.save(opts.output_dir.join(&file_name))?;
            result.highlighted_image = Some(file_name);
        }

        tracing::info!(
            screenshot = %name,
            matches = result.total_matches,
            "screenshot processed"
        );
        results.push(result);
    }

    let report = BatchReport::new(results, detector.config().matching.threshold);
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(opts.output_dir.join(&opts.report_name), json)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{highlight, list_screenshots, run};
    use crate::config::{BatchJson, Config};
    use crate::detect::Detector;
    use boardsight::Match;
    use image::{Rgb, RgbImage};

    #[test]
    fn lists_only_image_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.jpg", "notes.txt", "c.BMP"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let names: Vec<String> = list_screenshots(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png", "c.BMP"]);
    }

    #[test]
    fn highlight_draws_box_and_center() {
        let mut img = RgbImage::new(100, 100);
        let m = Match {
            template_id: "knight".into(),
            x: 20,
            y: 30,
            width: 40,
            height: 20,
            confidence: 0.9,
            scale: 1.0,
            cell: None,
        };
        highlight(&mut img, &[&m], [0, 255, 0]);
        assert_eq!(img.get_pixel(20, 30).0, [0, 255, 0]);
        assert_eq!(img.get_pixel(18, 28).0, [0, 255, 0]);
        assert_eq!(img.get_pixel(40, 40).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(5, 5).0, [0, 0, 0]);
    }

    #[test]
    fn tiny_screenshot_does_not_abort_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let shots = dir.path().join("shots");
        std::fs::create_dir_all(&shots).unwrap();
        RgbImage::from_fn(200, 200, |x, y| Rgb([(x * 7 + y * 13) as u8, (x ^ y) as u8, 90]))
            .save(shots.join("a_normal.png"))
            .unwrap();
        RgbImage::new(1, 1).save(shots.join("b_tiny.png")).unwrap();

        let config = Config {
            templates_dir: dir.path().join("templates"),
            ..Config::default()
        };
        let detector = Detector::from_config(&config).unwrap();
        let opts = BatchJson {
            screenshots_dir: shots,
            output_dir: dir.path().join("out"),
            highlight: false,
            ..BatchJson::default()
        };
        let report = run(&detector, &opts).unwrap();

        assert!(opts.output_dir.join(&opts.report_name).is_file());
        let names: Vec<&str> = report.results.iter().map(|r| r.screenshot.as_str()).collect();
        assert_eq!(names, vec!["a_normal.png", "b_tiny.png"]);
        assert_eq!(report.results[1].total_matches, 0);
    }
}
