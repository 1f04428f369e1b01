//! Rayon-parallel scans (feature-gated).
//!
//! Rows of placements are scored in parallel and merged back in row order, so
//! the output is identical to the serial [`Kernel::scan`].

use crate::candidate::topk::{Peak, PeakCollector};
use crate::image::color::ColorView;
use crate::kernel::scalar::ZnccColorScalar;
use crate::kernel::{placement_range, Kernel, ScanOutput, ScanParams};
use crate::template::ColorTemplatePlan;
use crate::util::BoardSightResult;
use crate::ImageView;
use rayon::prelude::*;

/// Row-parallel full scan for any kernel.
pub fn scan_par<K>(
    image: ImageView<'_, u8>,
    plan: &K::Plan,
    variant_idx: usize,
    params: ScanParams,
) -> BoardSightResult<ScanOutput>
where
    K: Kernel,
    K::Plan: Sync,
{
    let (tpl_width, tpl_height) = K::plan_size(plan);
    let (max_x, max_y) = placement_range(image.width(), image.height(), tpl_width, tpl_height)?;
    Ok(scan_rows_par(max_x, max_y, variant_idx, params, |x, y| {
        K::score_at(image, plan, x, y, params.min_var_i)
    }))
}

/// Row-parallel counterpart of [`ZnccColorScalar::scan`].
pub fn scan_color_par(
    image: ColorView<'_>,
    plan: &ColorTemplatePlan,
    variant_idx: usize,
    params: ScanParams,
) -> BoardSightResult<ScanOutput> {
    let (max_x, max_y) =
        placement_range(image.width(), image.height(), plan.width(), plan.height())?;
    Ok(scan_rows_par(max_x, max_y, variant_idx, params, |x, y| {
        ZnccColorScalar::score_at(image, plan, x, y, params.min_var_i)
    }))
}

fn scan_rows_par<F>(
    max_x: usize,
    max_y: usize,
    variant_idx: usize,
    params: ScanParams,
    score_at: F,
) -> ScanOutput
where
    F: Fn(usize, usize) -> f32 + Sync,
{
    let row_results: Vec<(Vec<Peak>, Option<f32>)> = (0..=max_y)
        .into_par_iter()
        .map(|y| {
            let mut row_peaks = Vec::new();
            let mut row_best: Option<f32> = None;
            for x in 0..=max_x {
                let score = score_at(x, y);
                if !score.is_finite() {
                    continue;
                }
                row_best = Some(row_best.map_or(score, |best| best.max(score)));
                if score >= params.min_score {
                    row_peaks.push(Peak {
                        x,
                        y,
                        score,
                        variant_idx,
                    });
                }
            }
            (row_peaks, row_best)
        })
        .collect();

    let mut collector = PeakCollector::new(params.max_peaks);
    let mut best_score: Option<f32> = None;
    for (peaks, row_best) in row_results {
        for peak in peaks {
            collector.push(peak);
        }
        if let Some(row_best) = row_best {
            best_score = Some(best_score.map_or(row_best, |best| best.max(row_best)));
        }
    }
    ScanOutput {
        peaks: collector.into_raster_order(),
        best_score,
    }
}

#[cfg(test)]
mod tests {
    use super::{scan_color_par, scan_par};
    use crate::image::color::ColorView;
    use crate::kernel::scalar::{ZnccColorScalar, ZnccMaskedScalar, ZnccUnmaskedScalar};
    use crate::kernel::{Kernel, ScanParams};
    use crate::template::{ColorTemplatePlan, MaskRect, MaskedTemplatePlan, TemplatePlan};
    use crate::ImageView;

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

    #[test]
    fn parallel_scan_matches_serial() {
        let (width, height) = (40, 30);
        let image = noise(width * height, 7);
        let view = ImageView::from_slice(&image, width, height).unwrap();
        let tpl = view.roi(11, 9, 8, 6).unwrap();
        let params = ScanParams {
            min_score: 0.2,
            ..ScanParams::default()
        };

        let plan = TemplatePlan::from_view(tpl).unwrap();
        let serial = ZnccUnmaskedScalar::scan(view, &plan, 1, params).unwrap();
        let parallel = scan_par::<ZnccUnmaskedScalar>(view, &plan, 1, params).unwrap();
        assert_eq!(serial, parallel);

        let mask = MaskRect::top_right(0.3).build(8, 6);
        let masked = MaskedTemplatePlan::from_view(tpl, mask).unwrap();
        let serial = ZnccMaskedScalar::scan(view, &masked, 2, params).unwrap();
        let parallel = scan_par::<ZnccMaskedScalar>(view, &masked, 2, params).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn parallel_color_scan_matches_serial() {
        let (width, height) = (30, 24);
        let planes = [3, 4, 5].map(|seed| noise(width * height, seed));
        let views = [
            ImageView::from_slice(&planes[0], width, height).unwrap(),
            ImageView::from_slice(&planes[1], width, height).unwrap(),
            ImageView::from_slice(&planes[2], width, height).unwrap(),
        ];
        let image = ColorView::new(views).unwrap();
        let plan = ColorTemplatePlan::from_view(image.roi(6, 4, 7, 7).unwrap(), None).unwrap();
        let params = ScanParams {
            min_score: 0.1,
            ..ScanParams::default()
        };
        let serial = ZnccColorScalar::scan(image, &plan, 0, params).unwrap();
        let parallel = scan_color_par(image, &plan, 0, params).unwrap();
        assert_eq!(serial, parallel);
        assert!(serial.peaks.iter().any(|p| (p.x, p.y) == (6, 4)));
    }
}
