//! SIMD-accelerated kernels using the `wide` crate.
//!
//! The inner template row loop of unmasked ZNCC is vectorized to process
//! 8 pixels at a time using `f32x8`. Row sums are widened to `f64` before they
//! are accumulated across rows.

use crate::kernel::{zncc_from_sums, Kernel};
use crate::template::TemplatePlan;
use crate::ImageView;
use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn load_u8x8_as_f32x8(slice: &[u8]) -> f32x8 {
    f32x8::from([
        slice[0] as f32,
        slice[1] as f32,
        slice[2] as f32,
        slice[3] as f32,
        slice[4] as f32,
        slice[5] as f32,
        slice[6] as f32,
        slice[7] as f32,
    ])
}

#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

#[inline]
fn hsum(v: f32x8) -> f64 {
    v.to_array().iter().map(|&lane| f64::from(lane)).sum()
}

/// SIMD-accelerated unmasked ZNCC kernel.
pub struct ZnccUnmaskedSimd;

impl Kernel for ZnccUnmaskedSimd {
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
        if image.width() < tpl_width || image.height() < tpl_height {
            return f32::NEG_INFINITY;
        }
        if x > image.width() - tpl_width || y > image.height() - tpl_height {
            return f32::NEG_INFINITY;
        }

        let t_prime = tpl.t_prime();
        let simd_end = tpl_width / LANES * LANES;

        let mut dot = 0.0f64;
        let mut sum_i = 0.0f64;
        let mut sum_i2 = 0.0f64;
        for ty in 0..tpl_height {
            let img_row = match image.row(y + ty) {
                Some(row) => &row[x..x + tpl_width],
                None => return f32::NEG_INFINITY,
            };
            let tpl_row = &t_prime[ty * tpl_width..(ty + 1) * tpl_width];

            let mut dot_vec = f32x8::ZERO;
            let mut sum_i_vec = f32x8::ZERO;
            let mut sum_i2_vec = f32x8::ZERO;
            let mut tx = 0;
            while tx < simd_end {
                let img_vals = load_u8x8_as_f32x8(&img_row[tx..]);
                let tpl_vals = load_f32x8(&tpl_row[tx..]);
                dot_vec += tpl_vals * img_vals;
                sum_i_vec += img_vals;
                sum_i2_vec += img_vals * img_vals;
                tx += LANES;
            }
            dot += hsum(dot_vec);
            sum_i += hsum(sum_i_vec);
            sum_i2 += hsum(sum_i2_vec);

            for (&t, &pixel) in tpl_row[simd_end..].iter().zip(&img_row[simd_end..]) {
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
