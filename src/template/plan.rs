//! Template plan precomputation for ZNCC.
//!
//! A plan stores the zero-mean template `t'` and its energy `var_t = Σ t'²` so
//! the scan only has to accumulate `Σ t'·I`, `Σ I` and `Σ I²` per placement.

use crate::image::color::{ColorView, PLANES};
use crate::image::ImageView;
use crate::util::{BoardSightError, BoardSightResult};

/// Per-pixel variance below which a template is treated as flat.
const MIN_TEMPLATE_VARIANCE: f64 = 1e-8;

fn template_row<'a>(tpl: &ImageView<'a, u8>, y: usize) -> BoardSightResult<&'a [u8]> {
    tpl.row(y).ok_or_else(|| BoardSightError::BufferTooSmall {
        needed: (y + 1)
            .checked_mul(tpl.stride())
            .and_then(|v| v.checked_add(tpl.width()))
            .unwrap_or(usize::MAX),
        got: tpl.as_slice().len(),
    })
}

/// Precomputed statistics for unmasked ZNCC.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    mean: f32,
    var_t: f32,
    t_prime: Vec<f32>,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    pub fn from_view(tpl: ImageView<'_, u8>) -> BoardSightResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .ok_or(BoardSightError::InvalidDimensions { width, height })?;

        let mut sum = 0.0f64;
        for y in 0..height {
            sum += template_row(&tpl, y)?
                .iter()
                .map(|&v| f64::from(v))
                .sum::<f64>();
        }
        let mean = sum / count as f64;

        let mut t_prime = Vec::with_capacity(count);
        let mut var_t = 0.0f64;
        for y in 0..height {
            for &value in template_row(&tpl, y)? {
                let centered = f64::from(value) - mean;
                var_t += centered * centered;
                t_prime.push(centered as f32);
            }
        }
        if var_t / count as f64 <= MIN_TEMPLATE_VARIANCE {
            return Err(BoardSightError::DegenerateTemplate {
                reason: "zero variance",
            });
        }

        Ok(Self {
            width,
            height,
            mean: mean as f32,
            var_t: var_t as f32,
            t_prime,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the mean intensity of the template.
    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// Returns `Σ (t - mean)²`.
    pub fn var_t(&self) -> f32 {
        self.var_t
    }

    /// Returns the zero-mean template in row-major order.
    pub fn t_prime(&self) -> &[f32] {
        &self.t_prime
    }
}

/// Precomputed statistics for ZNCC restricted to a pixel mask.
///
/// Masked-out pixels have `t' = 0` and do not contribute to the window
/// statistics either, so overlays drawn over part of an icon do not affect
/// its score.
#[derive(Clone, Debug)]
pub struct MaskedTemplatePlan {
    width: usize,
    height: usize,
    sum_w: f32,
    var_t: f32,
    t_prime: Vec<f32>,
    mask: Vec<u8>,
}

impl MaskedTemplatePlan {
    /// Builds a plan from a template view and a row-major 0/1 mask.
    pub fn from_view(tpl: ImageView<'_, u8>, mask: Vec<u8>) -> BoardSightResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .ok_or(BoardSightError::InvalidDimensions { width, height })?;
        if mask.len() != count {
            return Err(BoardSightError::BufferTooSmall {
                needed: count,
                got: mask.len(),
            });
        }

        let mut sum = 0.0f64;
        let mut sum_w = 0usize;
        for y in 0..height {
            let row = template_row(&tpl, y)?;
            for (x, &value) in row.iter().enumerate() {
                if mask[y * width + x] != 0 {
                    sum += f64::from(value);
                    sum_w += 1;
                }
            }
        }
        if sum_w == 0 {
            return Err(BoardSightError::DegenerateTemplate {
                reason: "mask excludes every pixel",
            });
        }
        let mean = sum / sum_w as f64;

        let mut t_prime = Vec::with_capacity(count);
        let mut var_t = 0.0f64;
        for y in 0..height {
            let row = template_row(&tpl, y)?;
            for (x, &value) in row.iter().enumerate() {
                if mask[y * width + x] == 0 {
                    t_prime.push(0.0);
                    continue;
                }
                let centered = f64::from(value) - mean;
                var_t += centered * centered;
                t_prime.push(centered as f32);
            }
        }
        if var_t / sum_w as f64 <= MIN_TEMPLATE_VARIANCE {
            return Err(BoardSightError::DegenerateTemplate {
                reason: "zero variance under mask",
            });
        }

        let mask = mask.into_iter().map(|m| u8::from(m != 0)).collect();
        Ok(Self {
            width,
            height,
            sum_w: sum_w as f32,
            var_t: var_t as f32,
            t_prime,
            mask,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of active mask pixels.
    pub fn sum_w(&self) -> f32 {
        self.sum_w
    }

    /// Returns `Σ w (t - mean_w)²`.
    pub fn var_t(&self) -> f32 {
        self.var_t
    }

    /// Returns the masked zero-mean template (0 where masked out).
    pub fn t_prime(&self) -> &[f32] {
        &self.t_prime
    }

    /// Returns the 0/1 mask in row-major order.
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }
}

/// Precomputed statistics for colour ZNCC.
///
/// Each plane is centered on its own mean; the correlation sums the planes'
/// cross terms and energies, so hue differences that leave luma unchanged
/// still lower the score. An optional mask applies to all planes.
#[derive(Clone, Debug)]
pub struct ColorTemplatePlan {
    width: usize,
    height: usize,
    sum_w: f32,
    var_t: f32,
    t_prime: [Vec<f32>; PLANES],
    mask: Option<Vec<u8>>,
}

impl ColorTemplatePlan {
    /// Builds a plan from colour planes and an optional row-major 0/1 mask.
    pub fn from_view(tpl: ColorView<'_>, mask: Option<Vec<u8>>) -> BoardSightResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .ok_or(BoardSightError::InvalidDimensions { width, height })?;
        if let Some(mask) = &mask {
            if mask.len() != count {
                return Err(BoardSightError::BufferTooSmall {
                    needed: count,
                    got: mask.len(),
                });
            }
        }
        let active = |idx: usize| mask.as_ref().map_or(true, |m| m[idx] != 0);
        let sum_w = (0..count).filter(|&idx| active(idx)).count();
        if sum_w == 0 {
            return Err(BoardSightError::DegenerateTemplate {
                reason: "mask excludes every pixel",
            });
        }

        let mut var_t = 0.0f64;
        let mut t_prime: [Vec<f32>; PLANES] = Default::default();
        for (plane, out) in tpl.planes().iter().zip(t_prime.iter_mut()) {
            let mut sum = 0.0f64;
            for y in 0..height {
                let row = template_row(plane, y)?;
                for (x, &value) in row.iter().enumerate() {
                    if active(y * width + x) {
                        sum += f64::from(value);
                    }
                }
            }
            let mean = sum / sum_w as f64;

            out.reserve_exact(count);
            for y in 0..height {
                let row = template_row(plane, y)?;
                for (x, &value) in row.iter().enumerate() {
                    if !active(y * width + x) {
                        out.push(0.0);
                        continue;
                    }
                    let centered = f64::from(value) - mean;
                    var_t += centered * centered;
                    out.push(centered as f32);
                }
            }
        }
        if var_t / (sum_w * PLANES) as f64 <= MIN_TEMPLATE_VARIANCE {
            return Err(BoardSightError::DegenerateTemplate {
                reason: "zero colour variance",
            });
        }

        let mask = mask.map(|m| m.into_iter().map(|v| u8::from(v != 0)).collect());
        Ok(Self {
            width,
            height,
            sum_w: sum_w as f32,
            var_t: var_t as f32,
            t_prime,
            mask,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of active pixels per plane.
    pub fn sum_w(&self) -> f32 {
        self.sum_w
    }

    /// Returns the template energy summed over all planes.
    pub fn var_t(&self) -> f32 {
        self.var_t
    }

    /// Returns the zero-mean plane `channel` (0 = R, 1 = G, 2 = B).
    pub fn t_prime(&self, channel: usize) -> &[f32] {
        &self.t_prime[channel]
    }

    /// Returns the 0/1 mask, if any.
    pub fn mask(&self) -> Option<&[u8]> {
        self.mask.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::{ColorTemplatePlan, MaskedTemplatePlan, TemplatePlan};
    use crate::image::color::ColorView;
    use crate::image::ImageView;
    use crate::util::BoardSightError;

    #[test]
    fn plan_matches_known_stats() {
        let data = [0u8, 1, 2, 3];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        let plan = TemplatePlan::from_view(view).unwrap();
        assert!((plan.mean() - 1.5).abs() < 1e-6);
        assert!((plan.var_t() - 5.0).abs() < 1e-6);
        let expected = [-1.5f32, -0.5, 0.5, 1.5];
        for (value, expected) in plan.t_prime().iter().zip(expected.iter()) {
            assert!((value - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn flat_template_is_degenerate() {
        let data = [9u8; 16];
        let view = ImageView::from_slice(&data, 4, 4).unwrap();
        let err = TemplatePlan::from_view(view).unwrap_err();
        assert_eq!(
            err,
            BoardSightError::DegenerateTemplate {
                reason: "zero variance"
            }
        );
    }

    #[test]
    fn masked_plan_ignores_masked_pixels() {
        // The masked-out corner is the only textured pixel.
        let data = [5u8, 5, 5, 200];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        let err = MaskedTemplatePlan::from_view(view, vec![1, 1, 1, 0]).unwrap_err();
        assert!(matches!(err, BoardSightError::DegenerateTemplate { .. }));

        let data = [0u8, 10, 20, 250];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        let plan = MaskedTemplatePlan::from_view(view, vec![1, 1, 1, 0]).unwrap();
        assert_eq!(plan.sum_w(), 3.0);
        assert!((plan.var_t() - 200.0).abs() < 1e-4);
        assert_eq!(plan.t_prime()[3], 0.0);
        assert_eq!(plan.mask(), &[1, 1, 1, 0]);
    }

    #[test]
    fn color_plan_centers_each_plane() {
        let r = [0u8, 10, 20, 30];
        let g = [50u8; 4];
        let b = [9u8, 9, 9, 1];
        let view = ColorView::new([
            ImageView::from_slice(&r, 2, 2).unwrap(),
            ImageView::from_slice(&g, 2, 2).unwrap(),
            ImageView::from_slice(&b, 2, 2).unwrap(),
        ])
        .unwrap();
        let plan = ColorTemplatePlan::from_view(view, None).unwrap();
        assert_eq!(plan.t_prime(0), &[-15.0, -5.0, 5.0, 15.0]);
        assert!(plan.t_prime(1).iter().all(|&v| v == 0.0));
        // 500 from red, 48 from blue.
        assert!((plan.var_t() - 548.0).abs() < 1e-3);

        let masked = ColorTemplatePlan::from_view(view, Some(vec![1, 1, 1, 0])).unwrap();
        assert_eq!(masked.sum_w(), 3.0);
        assert_eq!(masked.t_prime(2), &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn flat_color_plan_is_degenerate() {
        let flat = [77u8; 9];
        let view = ColorView::replicate(ImageView::from_slice(&flat, 3, 3).unwrap());
        let err = ColorTemplatePlan::from_view(view, None).unwrap_err();
        assert!(matches!(err, BoardSightError::DegenerateTemplate { .. }));
    }

    #[test]
    fn masked_plan_rejects_mismatched_mask() {
        let data = [0u8, 1, 2, 3];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        let err = MaskedTemplatePlan::from_view(view, vec![1; 3]).unwrap_err();
        assert_eq!(err, BoardSightError::BufferTooSmall { needed: 4, got: 3 });
        let err = MaskedTemplatePlan::from_view(view, vec![0; 4]).unwrap_err();
        assert!(matches!(err, BoardSightError::DegenerateTemplate { .. }));
    }
}
