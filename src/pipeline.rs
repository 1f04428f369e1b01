//! One detection cycle: match, suppress overlaps, map onto the board.
//!
//! [`run_cycle`] is synchronous and processes exactly one frame. It keeps no
//! state of its own; the caller owns the template cache, the board geometry
//! and the [`BoardState`] that every cycle clears and refills.

use crate::board::{BoardGeometry, BoardState};
use crate::cache::{PreprocessOptions, ScaleSet, TemplateCache};
use crate::candidate::nms::{best_per_template, suppress, suppress_per_template};
use crate::image::frame::Frame;
use crate::region::{PixelRect, SearchRegion};
use crate::search::{Match, MatchConfig, Matcher, TemplateBest};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::math::linspace;
use crate::util::{BoardSightError, BoardSightResult};

/// Everything a detection cycle needs besides the frame and the cache.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionConfig {
    /// Area of the frame to search.
    pub region: SearchRegion,
    /// Threshold, scale mode and scan options.
    pub matching: MatchConfig,
    /// Scale factors to precompute when building the cache.
    pub scales: ScaleSet,
    /// Template preprocessing used when building the cache.
    pub preprocess: PreprocessOptions,
    /// Overlap ratio above which matches of the same template are merged.
    pub overlap_threshold: f32,
    /// Overlap ratio for a second pass across all templates.
    pub global_overlap_threshold: Option<f32>,
    /// Keep only the best match of each template.
    pub single_instance: bool,
    /// Upper bound on the matches kept per cycle.
    pub max_matches_per_cycle: Option<usize>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self::field_board()
    }
}

impl DetectionConfig {
    /// Troops standing on the hex battlefield.
    pub fn field_board() -> Self {
        Self {
            region: SearchRegion::field_board(),
            matching: MatchConfig {
                threshold: 0.7,
                max_region_fraction: 0.9,
                ..MatchConfig::default()
            },
            scales: ScaleSet::from_sorted(vec![0.8, 0.9, 1.0, 1.1, 1.2]),
            preprocess: PreprocessOptions {
                color: true,
                ..PreprocessOptions::default()
            },
            overlap_threshold: 0.5,
            global_overlap_threshold: None,
            single_instance: false,
            max_matches_per_cycle: None,
        }
    }

    /// Cards offered in the shop bar; each card appears at most once.
    pub fn shop_bar() -> Self {
        Self {
            region: SearchRegion::shop_bar(),
            matching: MatchConfig {
                threshold: 0.8,
                ..MatchConfig::default()
            },
            scales: ScaleSet::from_sorted(vec![0.22, 0.24, 0.26, 0.28, 0.30]),
            preprocess: PreprocessOptions {
                equalize: true,
                min_template_px: 5,
                ..PreprocessOptions::default()
            },
            overlap_threshold: 0.3,
            global_overlap_threshold: None,
            single_instance: true,
            max_matches_per_cycle: Some(3),
        }
    }

    /// Offline scan of the bottom quarter of a screenshot over a wide scale range.
    pub fn bottom_scan() -> Self {
        Self {
            region: SearchRegion::bottom_band(0.25),
            matching: MatchConfig {
                threshold: 0.6,
                max_region_fraction: 1.0,
                ..MatchConfig::default()
            },
            scales: ScaleSet::from_sorted(linspace(0.2, 1.0, 15)),
            preprocess: PreprocessOptions::default(),
            overlap_threshold: 0.3,
            global_overlap_threshold: None,
            single_instance: false,
            max_matches_per_cycle: None,
        }
    }

    /// Checks every nested setting.
    pub fn validate(&self) -> BoardSightResult<()> {
        self.region.validate()?;
        self.matching.validate()?;
        self.preprocess.validate()?;
        if self.scales.is_empty() {
            return Err(BoardSightError::InvalidScaleSet {
                reason: "scale set is empty",
            });
        }
        let thresholds =
            std::iter::once(self.overlap_threshold).chain(self.global_overlap_threshold);
        for threshold in thresholds {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(BoardSightError::InvalidConfig {
                    reason: "overlap thresholds must be within [0, 1]",
                });
            }
        }
        if self.max_matches_per_cycle == Some(0) {
            return Err(BoardSightError::InvalidConfig {
                reason: "max_matches_per_cycle must be >= 1",
            });
        }
        Ok(())
    }

    /// Loads the templates in `dir` with this configuration's scales and
    /// preprocessing.
    #[cfg(feature = "image-io")]
    pub fn build_cache<P: AsRef<std::path::Path>>(
        &self,
        dir: P,
    ) -> BoardSightResult<TemplateCache> {
        TemplateCache::build(dir, self.scales.clone(), self.preprocess.clone())
    }
}

/// Result of one detection cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleOutput {
    /// Region that was searched; `None` when the frame was skipped.
    pub region: Option<PixelRect>,
    /// Surviving matches by descending confidence, with their cells.
    pub matches: Vec<Match>,
    /// Number of raw matches before overlap suppression.
    pub raw_count: usize,
    /// Number of surviving matches outside every cell.
    pub unassigned: usize,
    /// Best score per template, including scores below threshold.
    pub templates: Vec<TemplateBest>,
}

impl CycleOutput {
    /// Returns true when the frame could not be processed.
    pub fn is_skipped(&self) -> bool {
        self.region.is_none()
    }
}

/// Reduces raw matches to the final set, sorted by descending confidence.
///
/// Overlaps are suppressed per template, then optionally across templates,
/// then optionally down to one match per template, and finally capped.
pub fn resolve_matches(raw: Vec<Match>, cfg: &DetectionConfig) -> Vec<Match> {
    let mut kept = suppress_per_template(raw, cfg.overlap_threshold);
    if let Some(threshold) = cfg.global_overlap_threshold {
        kept = suppress(kept, threshold);
    }
    if cfg.single_instance {
        kept = best_per_template(kept);
    }
    if let Some(cap) = cfg.max_matches_per_cycle {
        kept.truncate(cap);
    }
    kept
}

/// Runs one detection cycle over `frame`.
///
/// `board` is reset to `geometry` first and then holds exactly the returned
/// matches that landed in a cell. Frames that are malformed or too small for
/// the region produce an empty output and a cleared board instead of an
/// error; invalid configuration is still an error.
pub fn run_cycle(
    frame: &Frame<'_>,
    cache: &TemplateCache,
    geometry: &BoardGeometry,
    board: &mut BoardState,
    cfg: &DetectionConfig,
) -> BoardSightResult<CycleOutput> {
    cfg.validate()?;
    let _span = trace_span!(
        "run_cycle",
        width = frame.width(),
        height = frame.height(),
        templates = cache.len()
    )
    .entered();

    board.reset(geometry);

    if let Err(err) = frame.validate() {
        trace_warn!("skipping malformed frame: {err}");
        return Ok(CycleOutput::default());
    }
    if let Err(err) = cfg.region.resolve(frame.width(), frame.height()) {
        trace_warn!("skipping frame: {err}");
        return Ok(CycleOutput::default());
    }

    let scan = Matcher::new(cache)
        .with_config(cfg.matching.clone())
        .scan_frame(frame, &cfg.region)?;
    let raw_count = scan.matches.len();

    let mut matches = resolve_matches(scan.matches, cfg);
    for m in &mut matches {
        board.place(geometry, m);
    }
    let unassigned = board.unassigned().len();

    trace_event!(
        "cycle_done",
        raw = raw_count,
        kept = matches.len(),
        assigned = board.total_assigned(),
        unassigned = unassigned
    );

    Ok(CycleOutput {
        region: scan.region,
        matches,
        raw_count,
        unassigned,
        templates: scan.templates,
    })
}

#[cfg(test)]
mod tests {
    use super::{resolve_matches, run_cycle, DetectionConfig};
    use crate::board::{BoardGeometry, BoardState, Calibration, CalibrationOrigin};
    use crate::cache::{PreprocessOptions, ScaleSet, TemplateCache};
    use crate::image::frame::Frame;
    use crate::region::{PixelRect, SearchRegion};
    use crate::search::Match;
    use crate::template::Template;

    const W: usize = 400;
    const H: usize = 300;

    fn noise(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed.max(1);
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect()
    }

    fn paste(dst: &mut [u8], src: &[u8], size: usize, x: usize, y: usize) {
        for row in 0..size {
            let start = (y + row) * W + x;
            dst[start..start + size].copy_from_slice(&src[row * size..(row + 1) * size]);
        }
    }

    fn geometry() -> BoardGeometry {
        let board = PixelRect {
            x: 0,
            y: 0,
            width: W,
            height: H,
        };
        let calibration = Calibration {
            row_y: [20.0, 50.0, 80.0, 110.0, 140.0, 170.0, 200.0, 230.0],
            x_start_even: 40.0,
            x_start_odd: 10.0,
            spacing: 60.0,
            origin: CalibrationOrigin::BoardRelative,
            radius_factor: 1.5,
        };
        BoardGeometry::build(board, &calibration).unwrap()
    }

    fn config() -> DetectionConfig {
        DetectionConfig {
            region: SearchRegion::FULL,
            scales: ScaleSet::identity(),
            ..DetectionConfig::field_board()
        }
    }

    fn cache(tpl: Vec<u8>) -> TemplateCache {
        TemplateCache::from_templates(
            vec![Template::new("knight", tpl, 24, 24).unwrap()],
            ScaleSet::identity(),
            PreprocessOptions::default(),
        )
        .unwrap()
    }

    fn m(id: &str, x: usize, confidence: f32) -> Match {
        Match {
            template_id: id.into(),
            x,
            y: 0,
            width: 20,
            height: 20,
            confidence,
            scale: 1.0,
            cell: None,
        }
    }

    #[test]
    fn cycle_assigns_matches_to_cells() {
        let tpl = noise(24 * 24, 9);
        let mut frame = vec![0u8; W * H];
        // Center (130, 170) is the center of row 5, column 2.
        paste(&mut frame, &tpl, 24, 118, 158);
        // Center (372, 282) is too far from every cell.
        paste(&mut frame, &tpl, 24, 360, 270);

        let geo = geometry();
        let mut board = BoardState::new(&geo);
        let out = run_cycle(
            &Frame::gray(&frame, W, H),
            &cache(tpl),
            &geo,
            &mut board,
            &config(),
        )
        .unwrap();

        assert_eq!(out.matches.len(), 2);
        assert_eq!(out.raw_count, 2);
        assert_eq!(board.matches_at(5, 2).len(), 1);
        assert_eq!(board.occupied_cells().count(), 1);
        assert_eq!(out.unassigned, 1);
        assert_eq!(board.total_assigned() + out.unassigned, out.matches.len());
        assert!(out.matches.iter().any(|m| m.cell == Some((5, 2))));
        assert!(out.templates[0].best_confidence.unwrap() > 0.99);
    }

    #[test]
    fn empty_cache_leaves_board_empty() {
        let frame = noise(W * H, 4);
        let geo = geometry();
        let mut board = BoardState::new(&geo);
        let empty = TemplateCache::from_templates(
            Vec::new(),
            ScaleSet::identity(),
            PreprocessOptions::default(),
        )
        .unwrap();
        let frame = Frame::gray(&frame, W, H);
        let out = run_cycle(&frame, &empty, &geo, &mut board, &config()).unwrap();
        assert!(out.matches.is_empty());
        assert!(!out.is_skipped());
        assert_eq!(board.occupied_cells().count(), 0);
    }

    #[test]
    fn malformed_frame_is_a_cleared_noop() {
        let geo = geometry();
        let mut board = BoardState::new(&geo);
        let mut stale = m("knight", 120, 0.9);
        stale.y = 160;
        board.place(&geo, &mut stale);
        assert_eq!(board.total_assigned(), 1);

        let cache = cache(noise(24 * 24, 2));
        let bad = [0u8; 5];
        let bad = Frame::new(&bad, 2, 1, 3);
        let out = run_cycle(&bad, &cache, &geo, &mut board, &config()).unwrap();
        assert!(out.is_skipped());
        assert_eq!(board.total_assigned(), 0);

        let tiny = [0u8; 1];
        let cfg = DetectionConfig::field_board();
        let out = run_cycle(&Frame::gray(&tiny, 1, 1), &cache, &geo, &mut board, &cfg).unwrap();
        assert!(out.is_skipped());
    }

    #[test]
    fn invalid_config_is_an_error() {
        let geo = geometry();
        let mut board = BoardState::new(&geo);
        let frame = vec![0u8; W * H];
        let cfg = DetectionConfig {
            overlap_threshold: 1.5,
            ..config()
        };
        let result = run_cycle(
            &Frame::gray(&frame, W, H),
            &cache(noise(24 * 24, 2)),
            &geo,
            &mut board,
            &cfg,
        );
        assert!(result.is_err());
    }

    #[test]
    fn resolve_applies_global_pass_single_instance_and_cap() {
        let raw = vec![
            m("archer", 0, 0.95),
            m("knight", 5, 0.90),
            m("knight", 100, 0.85),
            m("bomber", 200, 0.80),
        ];

        let per_template = resolve_matches(raw.clone(), &config());
        assert_eq!(per_template.len(), 4);

        let global = DetectionConfig {
            global_overlap_threshold: Some(0.5),
            ..config()
        };
        let kept = resolve_matches(raw.clone(), &global);
        let ids: Vec<&str> = kept.iter().map(|m| m.template_id.as_str()).collect();
        assert_eq!(ids, vec!["archer", "knight", "bomber"]);

        let single = DetectionConfig {
            single_instance: true,
            max_matches_per_cycle: Some(2),
            ..config()
        };
        let kept = resolve_matches(raw, &single);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].template_id, "archer");
        assert_eq!((kept[1].template_id.as_str(), kept[1].x), ("knight", 5));
    }

    #[test]
    fn presets_are_valid() {
        for cfg in [
            DetectionConfig::field_board(),
            DetectionConfig::shop_bar(),
            DetectionConfig::bottom_scan(),
        ] {
            assert!(cfg.validate().is_ok());
        }
        assert_eq!(DetectionConfig::bottom_scan().scales.len(), 15);
        let shop = DetectionConfig::shop_bar().preprocess;
        assert!(shop.equalize);
        assert_eq!(shop.min_template_px, 5);
        assert!(DetectionConfig::field_board().preprocess.color);
    }
}
