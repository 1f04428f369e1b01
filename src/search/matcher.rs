use crate::cache::{
    adaptive_scales, CachedTemplate, ScaleMode, ScaleVariant, TemplateCache, VariantPlan,
};
use crate::image::color::ColorView;
use crate::image::equalize::equalize_hist;
use crate::image::frame::Frame;
use crate::kernel::scalar::{ZnccColorScalar, ZnccMaskedScalar};
use crate::kernel::{Kernel, ScanOutput, ScanParams};
use crate::region::{PixelRect, SearchRegion};
use crate::search::{Match, MatchConfig};
use crate::template::ColorTemplatePlan;
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::{BoardSightError, BoardSightResult};
use crate::ImageView;
use std::borrow::Cow;

#[cfg(not(feature = "simd"))]
use crate::kernel::scalar::ZnccUnmaskedScalar as ZnccUnmasked;
#[cfg(feature = "simd")]
use crate::kernel::simd::ZnccUnmaskedSimd as ZnccUnmasked;

/// Per-template summary of a region scan.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateBest {
    /// Template id.
    pub template_id: String,
    /// Template width before scaling.
    pub width: usize,
    /// Template height before scaling.
    pub height: usize,
    /// Highest score seen at any scale, including scores below threshold.
    /// `None` when no variant could be scanned.
    pub best_confidence: Option<f32>,
    /// Number of raw matches the template produced.
    pub raw_matches: usize,
}

/// Raw matches of a region scan plus per-template statistics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionScan {
    /// Region in frame pixels.
    pub region: Option<PixelRect>,
    /// Raw matches ordered by template id, scale, then row-major position.
    pub matches: Vec<Match>,
    /// One entry per cached template, in id order.
    pub templates: Vec<TemplateBest>,
}

struct TemplateScan {
    matches: Vec<Match>,
    best: TemplateBest,
}

/// Preprocessed region pixels in the cache's matching mode.
#[derive(Clone, Copy)]
enum RegionPixels<'a> {
    Gray(ImageView<'a, u8>),
    Color(ColorView<'a>),
}

/// Multi-scale ZNCC matcher over a shared template cache.
pub struct Matcher<'c> {
    cache: &'c TemplateCache,
    cfg: MatchConfig,
}

impl<'c> Matcher<'c> {
    /// Creates a matcher with default configuration.
    pub fn new(cache: &'c TemplateCache) -> Self {
        Self {
            cache,
            cfg: MatchConfig::default(),
        }
    }

    /// Replaces the matcher configuration.
    pub fn with_config(mut self, cfg: MatchConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Returns the raw matches in `region` of `frame`.
    pub fn match_region(
        &self,
        frame: &Frame<'_>,
        region: &SearchRegion,
    ) -> BoardSightResult<Vec<Match>> {
        Ok(self.scan_frame(frame, region)?.matches)
    }

    /// Scans `region` of `frame`, converting it to luma or to colour planes
    /// depending on how the cache was built.
    pub fn scan_frame(
        &self,
        frame: &Frame<'_>,
        region: &SearchRegion,
    ) -> BoardSightResult<RegionScan> {
        if self.cache.preprocess().color {
            let color = frame.to_color()?;
            self.scan_color_region(color.view(), region)
        } else {
            let gray = frame.to_gray()?;
            self.scan_region(gray.view(), region)
        }
    }

    /// Scans `region` of a grayscale image.
    ///
    /// Every returned match has `confidence >= threshold`. The template cache's
    /// equalization setting is applied to the region before scanning; a colour
    /// cache sees the image as three equal planes.
    pub fn scan_region(
        &self,
        image: ImageView<'_, u8>,
        region: &SearchRegion,
    ) -> BoardSightResult<RegionScan> {
        self.cfg.validate()?;
        let rect = region.resolve(image.width(), image.height())?;
        let roi = image.roi(rect.x, rect.y, rect.width, rect.height)?;
        if self.cache.preprocess().color {
            self.scan_color_roi(ColorView::replicate(roi), rect)
        } else {
            self.scan_gray_roi(roi, rect)
        }
    }

    /// Scans `region` of a colour image; a grayscale cache sees its luma.
    pub fn scan_color_region(
        &self,
        image: ColorView<'_>,
        region: &SearchRegion,
    ) -> BoardSightResult<RegionScan> {
        self.cfg.validate()?;
        let rect = region.resolve(image.width(), image.height())?;
        let roi = image.roi(rect.x, rect.y, rect.width, rect.height)?;
        if self.cache.preprocess().color {
            self.scan_color_roi(roi, rect)
        } else {
            let gray = roi.to_gray();
            self.scan_gray_roi(gray.view(), rect)
        }
    }

    fn scan_gray_roi(
        &self,
        roi: ImageView<'_, u8>,
        rect: PixelRect,
    ) -> BoardSightResult<RegionScan> {
        if self.cache.preprocess().equalize {
            let equalized = equalize_hist(roi);
            self.scan_pixels(RegionPixels::Gray(equalized.view()), rect)
        } else {
            self.scan_pixels(RegionPixels::Gray(roi), rect)
        }
    }

    fn scan_color_roi(
        &self,
        roi: ColorView<'_>,
        rect: PixelRect,
    ) -> BoardSightResult<RegionScan> {
        if self.cache.preprocess().equalize {
            let equalized = roi.equalized();
            self.scan_pixels(RegionPixels::Color(equalized.view()), rect)
        } else {
            self.scan_pixels(RegionPixels::Color(roi), rect)
        }
    }

    fn scan_pixels(
        &self,
        pixels: RegionPixels<'_>,
        rect: PixelRect,
    ) -> BoardSightResult<RegionScan> {
        let _span = trace_span!(
            "match_region",
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height
        )
        .entered();

        let scans = self.scan_templates(pixels, rect)?;
        let mut out = RegionScan {
            region: Some(rect),
            matches: Vec::new(),
            templates: Vec::with_capacity(scans.len()),
        };
        for scan in scans {
            out.matches.extend(scan.matches);
            out.templates.push(scan.best);
        }

        trace_event!(
            "region_scanned",
            templates = out.templates.len(),
            raw_matches = out.matches.len()
        );
        Ok(out)
    }

    #[cfg(feature = "rayon")]
    fn scan_templates(
        &self,
        pixels: RegionPixels<'_>,
        rect: PixelRect,
    ) -> BoardSightResult<Vec<TemplateScan>> {
        use rayon::prelude::*;

        let templates = self.cache.templates();
        if self.cfg.parallel && templates.len() > 1 {
            return templates
                .par_iter()
                .map(|tpl| self.scan_template(pixels, rect, tpl, false))
                .collect();
        }
        templates
            .iter()
            .map(|tpl| self.scan_template(pixels, rect, tpl, self.cfg.parallel))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn scan_templates(
        &self,
        pixels: RegionPixels<'_>,
        rect: PixelRect,
    ) -> BoardSightResult<Vec<TemplateScan>> {
        self.cache
            .templates()
            .iter()
            .map(|tpl| self.scan_template(pixels, rect, tpl, false))
            .collect()
    }

    fn variants_for<'t>(
        &self,
        tpl: &'t CachedTemplate,
        rect: PixelRect,
    ) -> Vec<Cow<'t, ScaleVariant>> {
        match self.cfg.scale_mode {
            ScaleMode::Fixed => tpl.variants().iter().map(Cow::Borrowed).collect(),
            ScaleMode::Adaptive {
                min_icon_px,
                max_region_fraction,
                steps,
            } => {
                let Some(scales) = adaptive_scales(
                    tpl.width(),
                    tpl.height(),
                    rect.width,
                    rect.height,
                    min_icon_px,
                    max_region_fraction,
                    steps,
                ) else {
                    trace_debug!(
                        "template {} does not fit the region at any scale",
                        tpl.id()
                    );
                    return Vec::new();
                };
                let mut variants = Vec::with_capacity(scales.len());
                for scale in scales.iter() {
                    let built = ScaleVariant::build(
                        tpl.base_view(),
                        tpl.base_color_view(),
                        scale,
                        self.cache.preprocess(),
                    );
                    match built {
                        Ok(Some(variant)) => variants.push(Cow::Owned(variant)),
                        Ok(None) => {}
                        Err(err) => {
                            trace_debug!(
                                "template {} skipped at scale {scale:.3}: {err}",
                                tpl.id()
                            );
                        }
                    }
                }
                variants
            }
        }
    }

    fn scan_template(
        &self,
        pixels: RegionPixels<'_>,
        rect: PixelRect,
        tpl: &CachedTemplate,
        row_parallel: bool,
    ) -> BoardSightResult<TemplateScan> {
        let params = ScanParams {
            max_peaks: self.cfg.max_matches_per_variant,
            min_var_i: self.cfg.min_var_i,
            min_score: self.cfg.threshold,
        };
        let max_width = self.cfg.max_region_fraction * rect.width as f32;
        let max_height = self.cfg.max_region_fraction * rect.height as f32;

        let mut matches = Vec::new();
        let mut best_confidence: Option<f32> = None;
        for (idx, variant) in self.variants_for(tpl, rect).iter().enumerate() {
            if variant.width() as f32 > max_width || variant.height() as f32 > max_height {
                trace_debug!(
                    "template {} at scale {:.3} exceeds the region",
                    tpl.id(),
                    variant.scale()
                );
                continue;
            }

            let out = scan_variant(pixels, variant, idx, params, row_parallel)?;
            if let Some(score) = out.best_score {
                best_confidence = Some(best_confidence.map_or(score, |best| best.max(score)));
            }

            let mut reached_early_exit = false;
            for peak in out.peaks {
                if self.cfg.early_exit.is_some_and(|score| peak.score >= score) {
                    reached_early_exit = true;
                }
                matches.push(Match {
                    template_id: tpl.id().to_string(),
                    x: rect.x + peak.x,
                    y: rect.y + peak.y,
                    width: variant.width(),
                    height: variant.height(),
                    confidence: peak.score,
                    scale: variant.scale(),
                    cell: None,
                });
            }
            if reached_early_exit {
                trace_debug!(
                    "template {} reached early exit at scale {:.3}",
                    tpl.id(),
                    variant.scale()
                );
                break;
            }
        }

        let best = TemplateBest {
            template_id: tpl.id().to_string(),
            width: tpl.width(),
            height: tpl.height(),
            best_confidence,
            raw_matches: matches.len(),
        };
        Ok(TemplateScan { matches, best })
    }
}

fn scan_variant(
    pixels: RegionPixels<'_>,
    variant: &ScaleVariant,
    idx: usize,
    params: ScanParams,
    row_parallel: bool,
) -> BoardSightResult<ScanOutput> {
    match (variant.plan(), pixels) {
        (VariantPlan::Unmasked(plan), RegionPixels::Gray(view)) => {
            run_kernel::<ZnccUnmasked>(view, plan, idx, params, row_parallel)
        }
        (VariantPlan::Masked(plan), RegionPixels::Gray(view)) => {
            run_kernel::<ZnccMaskedScalar>(view, plan, idx, params, row_parallel)
        }
        (VariantPlan::Color(plan), RegionPixels::Color(view)) => {
            run_color_kernel(view, plan, idx, params, row_parallel)
        }
        _ => Err(BoardSightError::InvalidConfig {
            reason: "variant and region colour modes differ",
        }),
    }
}

#[cfg(feature = "rayon")]
fn run_color_kernel(
    view: ColorView<'_>,
    plan: &ColorTemplatePlan,
    idx: usize,
    params: ScanParams,
    row_parallel: bool,
) -> BoardSightResult<ScanOutput> {
    if row_parallel {
        crate::kernel::rayon::scan_color_par(view, plan, idx, params)
    } else {
        ZnccColorScalar::scan(view, plan, idx, params)
    }
}

#[cfg(not(feature = "rayon"))]
fn run_color_kernel(
    view: ColorView<'_>,
    plan: &ColorTemplatePlan,
    idx: usize,
    params: ScanParams,
    _row_parallel: bool,
) -> BoardSightResult<ScanOutput> {
    ZnccColorScalar::scan(view, plan, idx, params)
}

#[cfg(feature = "rayon")]
fn run_kernel<K>(
    view: ImageView<'_, u8>,
    plan: &K::Plan,
    idx: usize,
    params: ScanParams,
    row_parallel: bool,
) -> BoardSightResult<ScanOutput>
where
    K: Kernel,
    K::Plan: Sync,
{
    if row_parallel {
        crate::kernel::rayon::scan_par::<K>(view, plan, idx, params)
    } else {
        K::scan(view, plan, idx, params)
    }
}

#[cfg(not(feature = "rayon"))]
fn run_kernel<K: Kernel>(
    view: ImageView<'_, u8>,
    plan: &K::Plan,
    idx: usize,
    params: ScanParams,
    _row_parallel: bool,
) -> BoardSightResult<ScanOutput> {
    K::scan(view, plan, idx, params)
}

#[cfg(test)]
mod tests {
    use super::Matcher;
    use crate::cache::{PreprocessOptions, ScaleMode, ScaleSet, TemplateCache};
    use crate::image::frame::Frame;
    use crate::region::SearchRegion;
    use crate::search::MatchConfig;
    use crate::template::Template;

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

    fn paste(dst: &mut [u8], dst_width: usize, src: &[u8], w: usize, h: usize, x: usize, y: usize) {
        for row in 0..h {
            let start = (y + row) * dst_width + x;
            dst[start..start + w].copy_from_slice(&src[row * w..(row + 1) * w]);
        }
    }

    #[test]
    fn single_copy_yields_single_exact_match() {
        let tpl = noise(24 * 24, 3);
        let mut frame = vec![0u8; 200 * 200];
        paste(&mut frame, 200, &tpl, 24, 24, 50, 60);

        let cache = TemplateCache::from_templates(
            vec![Template::new("knight", tpl, 24, 24).unwrap()],
            ScaleSet::identity(),
            PreprocessOptions::default(),
        )
        .unwrap();
        let matcher = Matcher::new(&cache);
        let matches = matcher
            .match_region(&Frame::gray(&frame, 200, 200), &SearchRegion::FULL)
            .unwrap();
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!((m.x, m.y, m.width, m.height), (50, 60, 24, 24));
        assert!(m.confidence >= 0.99);
        assert_eq!(m.template_id, "knight");
    }

    #[test]
    fn coordinates_are_offset_by_the_region() {
        let tpl = noise(16 * 16, 11);
        let mut frame = vec![0u8; 100 * 100];
        paste(&mut frame, 100, &tpl, 16, 16, 60, 70);
        let cache = TemplateCache::from_templates(
            vec![Template::new("goblin", tpl, 16, 16).unwrap()],
            ScaleSet::identity(),
            PreprocessOptions::default(),
        )
        .unwrap();

        let region = SearchRegion::new(0.5, 0.5, 1.0, 1.0).unwrap();
        let scan = Matcher::new(&cache)
            .scan_region(Frame::gray(&frame, 100, 100).to_gray().unwrap().view(), &region)
            .unwrap();
        assert_eq!(scan.matches.len(), 1);
        assert_eq!((scan.matches[0].x, scan.matches[0].y), (60, 70));
        assert_eq!(scan.templates[0].raw_matches, 1);
    }

    #[test]
    fn oversized_variants_are_not_scanned() {
        // 40x40 template, 45x45 region: 40 > 0.8 * 45.
        let tpl = noise(40 * 40, 5);
        let mut frame = vec![0u8; 45 * 45];
        paste(&mut frame, 45, &tpl, 40, 40, 2, 2);
        let cache = TemplateCache::from_templates(
            vec![Template::new("pekka", tpl, 40, 40).unwrap()],
            ScaleSet::identity(),
            PreprocessOptions::default(),
        )
        .unwrap();
        let scan = Matcher::new(&cache)
            .scan_region(
                Frame::gray(&frame, 45, 45).to_gray().unwrap().view(),
                &SearchRegion::FULL,
            )
            .unwrap();
        assert!(scan.matches.is_empty());
        assert_eq!(scan.templates[0].best_confidence, None);
    }

    #[test]
    fn threshold_bounds_every_match() {
        let tpl = noise(12 * 12, 21);
        let frame = noise(80 * 60, 99);
        let cache = TemplateCache::from_templates(
            vec![Template::new("bomber", tpl, 12, 12).unwrap()],
            ScaleSet::new(vec![1.0, 1.5]).unwrap(),
            PreprocessOptions::default(),
        )
        .unwrap();
        for threshold in [-0.2f32, 0.0, 0.15] {
            let cfg = MatchConfig {
                threshold,
                ..MatchConfig::default()
            };
            let matches = Matcher::new(&cache)
                .with_config(cfg)
                .match_region(&Frame::gray(&frame, 80, 60), &SearchRegion::FULL)
                .unwrap();
            assert!(!matches.is_empty());
            assert!(matches.iter().all(|m| m.confidence >= threshold));
        }
    }

    #[test]
    fn adaptive_mode_finds_scaled_copy() {
        let tpl = noise(20 * 20, 8);
        let mut frame = vec![0u8; 60 * 60];
        paste(&mut frame, 60, &tpl, 20, 20, 20, 25);
        let cache = TemplateCache::from_templates(
            vec![Template::new("prince", tpl, 20, 20).unwrap()],
            ScaleSet::identity(),
            PreprocessOptions::default(),
        )
        .unwrap();
        // Range [0.5, 2.4] in 20 steps of 0.1 contains 1.0.
        let cfg = MatchConfig {
            threshold: 0.99,
            scale_mode: ScaleMode::Adaptive {
                min_icon_px: 10,
                max_region_fraction: 0.8,
                steps: 20,
            },
            ..MatchConfig::default()
        };
        let matches = Matcher::new(&cache)
            .with_config(cfg)
            .match_region(&Frame::gray(&frame, 60, 60), &SearchRegion::FULL)
            .unwrap();
        assert!(matches
            .iter()
            .any(|m| (m.x, m.y, m.width) == (20, 25, 20)));
    }

    #[test]
    fn early_exit_skips_larger_scales() {
        let tpl = noise(16 * 16, 4);
        let mut frame = vec![0u8; 100 * 100];
        paste(&mut frame, 100, &tpl, 16, 16, 10, 10);
        let cache = TemplateCache::from_templates(
            vec![Template::new("archer", tpl, 16, 16).unwrap()],
            ScaleSet::new(vec![1.0, 1.25, 1.5]).unwrap(),
            PreprocessOptions::default(),
        )
        .unwrap();
        let cfg = MatchConfig {
            threshold: 0.5,
            early_exit: Some(0.95),
            ..MatchConfig::default()
        };
        let matches = Matcher::new(&cache)
            .with_config(cfg)
            .match_region(&Frame::gray(&frame, 100, 100), &SearchRegion::FULL)
            .unwrap();
        assert!(!matches.is_empty());
        assert!(matches.iter().all(|m| (m.scale - 1.0).abs() < 1e-6));
    }
}
