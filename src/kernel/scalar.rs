//! Scalar reference kernels for score evaluation.

use crate::image::color::{ColorView, PLANES};
use crate::kernel::{
    placement_range, scan_placements, zncc_from_energy, zncc_from_sums, Kernel, ScanOutput,
    ScanParams,
};
use crate::template::{ColorTemplatePlan, MaskedTemplatePlan, TemplatePlan};
use crate::util::BoardSightResult;
use crate::ImageView;

/// Scalar ZNCC kernel that ignores masked-out template pixels.
pub struct ZnccMaskedScalar;

/// Scalar ZNCC kernel over the full template rectangle.
pub struct ZnccUnmaskedScalar;

/// Scalar ZNCC kernel over R, G, B planes.
///
/// Not a [`Kernel`]: it scores [`ColorView`] windows instead of single-plane
/// views, but follows the same placement and threshold rules.
pub struct ZnccColorScalar;

fn fits(image: &ImageView<'_, u8>, x: usize, y: usize, width: usize, height: usize) -> bool {
    image.width() >= width
        && image.height() >= height
        && x <= image.width() - width
        && y <= image.height() - height
}

impl Kernel for ZnccMaskedScalar {
    type Plan = MaskedTemplatePlan;

    fn plan_size(plan: &Self::Plan) -> (usize, usize) {
        (plan.width(), plan.height())
    }

    fn score_at(
        image: ImageView<'_, u8>,
        tpl: &Self::Plan,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> f32 {
        let tpl_width = tpl.width();
        let tpl_height = tpl.height();
        if !fits(&image, x, y, tpl_width, tpl_height) {
            return f32::NEG_INFINITY;
        }

        let t_prime = tpl.t_prime();
        let mask = tpl.mask();

        let mut dot = 0.0f64;
        let mut sum_i = 0.0f64;
        let mut sum_i2 = 0.0f64;
        for ty in 0..tpl_height {
            let Some(img_row) = image.row(y + ty) else {
                return f32::NEG_INFINITY;
            };
            let base = ty * tpl_width;
            let window = &img_row[x..x + tpl_width];
            for (tx, &pixel) in window.iter().enumerate() {
                let idx = base + tx;
                if mask[idx] == 0 {
                    continue;
                }
                let value = f64::from(pixel);
                dot += f64::from(t_prime[idx]) * value;
                sum_i += value;
                sum_i2 += value * value;
            }
        }

        zncc_from_sums(
            dot,
            sum_i,
            sum_i2,
            f64::from(tpl.sum_w()),
            f64::from(tpl.var_t()),
            min_var_i,
        )
    }
}

impl Kernel for ZnccUnmaskedScalar {
    type Plan = TemplatePlan;

    fn plan_size(plan: &Self::Plan) -> (usize, usize) {
        (plan.width(), plan.height())
    }

    fn score_at(
        image: ImageView<'_, u8>,
        tpl: &Self::Plan,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> f32 {
        let tpl_width = tpl.width();
        let tpl_height = tpl.height();
        if !fits(&image, x, y, tpl_width, tpl_height) {
            return f32::NEG_INFINITY;
        }

        let t_prime = tpl.t_prime();
        let mut dot = 0.0f64;
        let mut sum_i = 0.0f64;
        let mut sum_i2 = 0.0f64;
        for ty in 0..tpl_height {
            let Some(img_row) = image.row(y + ty) else {
                return f32::NEG_INFINITY;
            };
            let tpl_row = &t_prime[ty * tpl_width..(ty + 1) * tpl_width];
            for (&t, &pixel) in tpl_row.iter().zip(&img_row[x..x + tpl_width]) {
                let value = f64::from(pixel);
                dot += f64::from(t) * value;
                sum_i += value;
                sum_i2 += value * value;
            }
        }

        zncc_from_sums(
            dot,
            sum_i,
            sum_i2,
            (tpl_width * tpl_height) as f64,
            f64::from(tpl.var_t()),
            min_var_i,
        )
    }
}

impl ZnccColorScalar {
    /// Computes the colour score at a single placement (top-left coordinates).
    ///
    /// Planes are centered separately; cross terms and window energies are
    /// summed over the planes before normalizing. Returns `f32::NEG_INFINITY`
    /// outside the image and for windows whose per-sample variance is at or
    /// below `min_var_i`.
    pub fn score_at(
        image: ColorView<'_>,
        tpl: &ColorTemplatePlan,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> f32 {
        let tpl_width = tpl.width();
        let tpl_height = tpl.height();
        if image.width() < tpl_width
            || image.height() < tpl_height
            || x > image.width() - tpl_width
            || y > image.height() - tpl_height
        {
            return f32::NEG_INFINITY;
        }

        let mask = tpl.mask();
        let count = f64::from(tpl.sum_w());
        let mut dot = 0.0f64;
        let mut var_i = 0.0f64;
        for (channel, plane) in image.planes().iter().enumerate() {
            let t_prime = tpl.t_prime(channel);
            let mut sum_i = 0.0f64;
            let mut sum_i2 = 0.0f64;
            for ty in 0..tpl_height {
                let Some(img_row) = plane.row(y + ty) else {
                    return f32::NEG_INFINITY;
                };
                let base = ty * tpl_width;
                for (tx, &pixel) in img_row[x..x + tpl_width].iter().enumerate() {
                    let idx = base + tx;
                    if mask.is_some_and(|m| m[idx] == 0) {
                        continue;
                    }
                    let value = f64::from(pixel);
                    dot += f64::from(t_prime[idx]) * value;
                    sum_i += value;
                    sum_i2 += value * value;
                }
            }
            var_i += sum_i2 - (sum_i * sum_i) / count;
        }

        zncc_from_energy(
            dot,
            var_i,
            count * PLANES as f64,
            f64::from(tpl.var_t()),
            min_var_i,
        )
    }

    /// Scans the full valid placement range.
    pub fn scan(
        image: ColorView<'_>,
        plan: &ColorTemplatePlan,
        variant_idx: usize,
        params: ScanParams,
    ) -> BoardSightResult<ScanOutput> {
        let (max_x, max_y) =
            placement_range(image.width(), image.height(), plan.width(), plan.height())?;
        Ok(scan_placements(max_x, max_y, variant_idx, params, |x, y| {
            Self::score_at(image, plan, x, y, params.min_var_i)
        }))
    }
}
