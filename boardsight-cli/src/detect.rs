//! Template cache, detection settings and board calibration bundled for the
//! subcommands.

use crate::config::Config;
use boardsight::{
    run_cycle, BoardGeometry, BoardSightResult, BoardState, Calibration, CycleOutput,
    DetectionConfig, Frame, PixelRect, SearchRegion, TemplateCache,
};
use image::RgbImage;
use std::path::Path;

pub struct Detector {
    cache: TemplateCache,
    cfg: DetectionConfig,
    calibration: Calibration,
    board_region: SearchRegion,
}

impl Detector {
    /// Resolves the config and loads the templates it names.
    pub fn from_config(config: &Config) -> BoardSightResult<Self> {
        let cfg = config.detection_config()?;
        let calibration = Calibration::from(&config.calibration);
        calibration.validate()?;
        let board_region = SearchRegion::from(config.calibration.board_region);
        board_region.validate()?;

        let cache = cfg.build_cache(&config.templates_dir)?;
        tracing::info!(
            templates = cache.len(),
            variants = cache.variant_count(),
            dir = %config.templates_dir.display(),
            "template cache ready"
        );
        Ok(Self {
            cache,
            cfg,
            calibration,
            board_region,
        })
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.cfg
    }

    /// Board geometry for a `width x height` frame.
    pub fn geometry(&self, width: u32, height: u32) -> BoardSightResult<BoardGeometry> {
        let board = self
            .board_region
            .resolve(width as usize, height as usize)?;
        BoardGeometry::build(board, &self.calibration)
    }

    /// Geometry over a one-pixel board, for frames too small to hold the
    /// board region.
    fn placeholder_geometry(&self) -> BoardSightResult<BoardGeometry> {
        let board = PixelRect {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
        };
        BoardGeometry::build(board, &self.calibration)
    }

    /// Runs one cycle over `rgb`, refilling `board`.
    ///
    /// A frame too small for the board region is skipped: the board is
    /// cleared and the output is empty.
    pub fn detect_into(
        &self,
        rgb: &RgbImage,
        board: &mut BoardState,
    ) -> BoardSightResult<CycleOutput> {
        let geometry = match self.geometry(rgb.width(), rgb.height()) {
            Ok(geometry) => geometry,
            Err(err) => {
                tracing::warn!("skipping {}x{} frame: {err}", rgb.width(), rgb.height());
                board.clear();
                return Ok(CycleOutput::default());
            }
        };
        let frame = Frame::new(rgb.as_raw(), rgb.width() as usize, rgb.height() as usize, 3);
        run_cycle(&frame, &self.cache, &geometry, board, &self.cfg)
    }

    /// Runs one cycle over `rgb` with a fresh board.
    pub fn detect(&self, rgb: &RgbImage) -> BoardSightResult<(CycleOutput, BoardState)> {
        let geometry = match self.geometry(rgb.width(), rgb.height()) {
            Ok(geometry) => geometry,
            Err(_) => self.placeholder_geometry()?,
        };
        let mut board = BoardState::new(&geometry);
        let out = self.detect_into(rgb, &mut board)?;
        Ok((out, board))
    }
}

/// Decodes an image file into RGB.
pub fn load_rgb(path: &Path) -> BoardSightResult<RgbImage> {
    let img = image::open(path).map_err(|err| boardsight::BoardSightError::ImageIo {
        reason: format!("{}: {err}", path.display()),
    })?;
    Ok(img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::Detector;
    use crate::config::Config;
    use image::RgbImage;

    #[test]
    fn frame_smaller_than_the_board_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            templates_dir: dir.path().join("templates"),
            ..Config::default()
        };
        let detector = Detector::from_config(&config).unwrap();

        let (out, board) = detector.detect(&RgbImage::new(1, 1)).unwrap();
        assert!(out.is_skipped());
        assert_eq!(board.total_assigned(), 0);

        let (out, _) = detector.detect(&RgbImage::new(200, 200)).unwrap();
        assert!(!out.is_skipped());
    }
}
