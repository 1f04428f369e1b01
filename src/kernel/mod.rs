//! Correlation kernel implementations.
//!
//! A kernel scores one template placement at a time; [`Kernel::scan`] walks
//! every valid top-left placement of the template inside the image and keeps
//! the placements that pass the score threshold.

use crate::candidate::topk::{Peak, PeakCollector};
use crate::util::{BoardSightError, BoardSightResult};
use crate::ImageView;

/// Scan configuration for kernel evaluations.
#[derive(Clone, Copy, Debug)]
pub struct ScanParams {
    /// Keep only the best `n` placements; `None` keeps all of them.
    pub max_peaks: Option<usize>,
    /// Per-pixel variance floor for the image window; flatter windows are
    /// skipped because their correlation is undefined.
    pub min_var_i: f32,
    /// Minimum score threshold (inclusive).
    pub min_score: f32,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            max_peaks: None,
            min_var_i: 1e-3,
            min_score: f32::NEG_INFINITY,
        }
    }
}

/// Result of a full scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanOutput {
    /// Placements at or above the score threshold, in raster order.
    pub peaks: Vec<Peak>,
    /// Best finite score over all placements, thresholded or not.
    pub best_score: Option<f32>,
}

/// Kernel trait for scoring and scan operations.
pub trait Kernel {
    type Plan;

    /// Returns `(width, height)` of the planned template.
    fn plan_size(plan: &Self::Plan) -> (usize, usize);

    /// Computes the score at a single placement (top-left coordinates).
    ///
    /// Returns `f32::NEG_INFINITY` for placements outside the image and for
    /// windows whose variance is at or below `min_var_i`.
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &Self::Plan,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> f32;

    /// Scans the full valid placement range.
    fn scan(
        image: ImageView<'_, u8>,
        plan: &Self::Plan,
        variant_idx: usize,
        params: ScanParams,
    ) -> BoardSightResult<ScanOutput> {
        let (tpl_width, tpl_height) = Self::plan_size(plan);
        let (max_x, max_y) =
            placement_range(image.width(), image.height(), tpl_width, tpl_height)?;
        Ok(scan_placements(max_x, max_y, variant_idx, params, |x, y| {
            Self::score_at(image, plan, x, y, params.min_var_i)
        }))
    }
}

/// Scores every placement up to `(max_x, max_y)` in raster order.
pub(crate) fn scan_placements<F>(
    max_x: usize,
    max_y: usize,
    variant_idx: usize,
    params: ScanParams,
    score_at: F,
) -> ScanOutput
where
    F: Fn(usize, usize) -> f32,
{
    let mut collector = PeakCollector::new(params.max_peaks);
    let mut best_score: Option<f32> = None;
    for y in 0..=max_y {
        for x in 0..=max_x {
            let score = score_at(x, y);
            if !score.is_finite() {
                continue;
            }
            best_score = Some(best_score.map_or(score, |best| best.max(score)));
            if score >= params.min_score {
                collector.push(Peak {
                    x,
                    y,
                    score,
                    variant_idx,
                });
            }
        }
    }
    ScanOutput {
        peaks: collector.into_raster_order(),
        best_score,
    }
}

/// Returns the largest valid top-left placement `(max_x, max_y)`.
pub(crate) fn placement_range(
    img_width: usize,
    img_height: usize,
    tpl_width: usize,
    tpl_height: usize,
) -> BoardSightResult<(usize, usize)> {
    if tpl_width == 0 || tpl_height == 0 || img_width < tpl_width || img_height < tpl_height {
        return Err(BoardSightError::RoiOutOfBounds {
            x: 0,
            y: 0,
            width: tpl_width,
            height: tpl_height,
            img_width,
            img_height,
        });
    }
    Ok((img_width - tpl_width, img_height - tpl_height))
}

/// Finishes a ZNCC evaluation from accumulated window sums.
#[inline]
pub(crate) fn zncc_from_sums(
    dot: f64,
    sum_i: f64,
    sum_i2: f64,
    count: f64,
    var_t: f64,
    min_var_i: f32,
) -> f32 {
    let var_i = sum_i2 - (sum_i * sum_i) / count;
    zncc_from_energy(dot, var_i, count, var_t, min_var_i)
}

/// Finishes a ZNCC evaluation from the window energy `var_i` over `samples`
/// values.
#[inline]
pub(crate) fn zncc_from_energy(
    dot: f64,
    var_i: f64,
    samples: f64,
    var_t: f64,
    min_var_i: f32,
) -> f32 {
    if var_i / samples <= f64::from(min_var_i) {
        return f32::NEG_INFINITY;
    }
    let score = dot / (var_t * var_i).sqrt();
    if score.is_finite() {
        score.clamp(-1.0, 1.0) as f32
    } else {
        f32::NEG_INFINITY
    }
}

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(feature = "rayon")]
pub mod rayon;
