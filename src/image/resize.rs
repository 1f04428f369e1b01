//! Bilinear resampling for template scale variants.

use crate::image::{ImageView, OwnedImage};
use crate::util::{BoardSightError, BoardSightResult};

/// Slack absorbed before truncating, so `10 * 0.7f32` gives 7 and not 6.
const SIZE_ROUNDING_SLACK: f64 = 1e-3;

/// Output size of a `scale` resize, truncated toward zero.
pub fn scaled_size(width: usize, height: usize, scale: f32) -> (usize, usize) {
    if !scale.is_finite() || scale <= 0.0 {
        return (0, 0);
    }
    let side = |len: usize| (len as f64 * f64::from(scale) + SIZE_ROUNDING_SLACK).floor() as usize;
    (side(width), side(height))
}

/// Resizes a grayscale image to `dst_width x dst_height` with bilinear sampling.
///
/// Destination pixel centers map to source coordinates with the half-pixel
/// convention `src = (dst + 0.5) * (src_len / dst_len) - 0.5`, clamped to the
/// source bounds, so a resize to the same size is the identity.
pub fn resize_bilinear(
    src: ImageView<'_, u8>,
    dst_width: usize,
    dst_height: usize,
) -> BoardSightResult<OwnedImage> {
    if dst_width == 0 || dst_height == 0 {
        return Err(BoardSightError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        });
    }
    let width = src.width();
    let height = src.height();
    let fx_scale = width as f32 / dst_width as f32;
    let fy_scale = height as f32 / dst_height as f32;
    let max_x = width as f32 - 1.0;
    let max_y = height as f32 - 1.0;

    let x_taps: Vec<(usize, usize, f32)> = (0..dst_width)
        .map(|x| {
            let sx = ((x as f32 + 0.5) * fx_scale - 0.5).clamp(0.0, max_x);
            let x0 = sx.floor() as usize;
            (x0, (x0 + 1).min(width - 1), sx - x0 as f32)
        })
        .collect();

    let mut out = Vec::with_capacity(dst_width * dst_height);
    for y in 0..dst_height {
        let sy = ((y as f32 + 0.5) * fy_scale - 0.5).clamp(0.0, max_y);
        let y0 = sy.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let fy = sy - y0 as f32;
        let row0 = src.row(y0).ok_or(BoardSightError::BufferTooSmall {
            needed: (y0 + 1) * src.stride(),
            got: src.as_slice().len(),
        })?;
        let row1 = src.row(y1).ok_or(BoardSightError::BufferTooSmall {
            needed: (y1 + 1) * src.stride(),
            got: src.as_slice().len(),
        })?;

        for &(x0, x1, fx) in &x_taps {
            let a = f32::from(row0[x0]);
            let b = f32::from(row0[x1]);
            let c = f32::from(row1[x0]);
            let d = f32::from(row1[x1]);
            let value = a * (1.0 - fx) * (1.0 - fy)
                + b * fx * (1.0 - fy)
                + c * (1.0 - fx) * fy
                + d * fx * fy;
            out.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }

    OwnedImage::new(out, dst_width, dst_height)
}

/// Resizes by a uniform factor; `None` when the result would be empty.
pub fn resize_by(src: ImageView<'_, u8>, scale: f32) -> Option<OwnedImage> {
    let (w, h) = scaled_size(src.width(), src.height(), scale);
    if w == 0 || h == 0 {
        return None;
    }
    resize_bilinear(src, w, h).ok()
}

#[cfg(test)]
mod tests {
    use super::{resize_bilinear, resize_by, scaled_size};
    use crate::image::ImageView;

    #[test]
    fn scaled_size_truncates() {
        assert_eq!(scaled_size(40, 30, 0.25), (10, 7));
        assert_eq!(scaled_size(40, 30, 1.0), (40, 30));
        assert_eq!(scaled_size(10, 10, 0.7), (7, 7));
        assert_eq!(scaled_size(40, 30, 0.0), (0, 0));
        assert_eq!(scaled_size(40, 30, f32::NAN), (0, 0));
    }

    #[test]
    fn same_size_resize_is_identity() {
        let data: Vec<u8> = (0u8..20).collect();
        let view = ImageView::from_slice(&data, 5, 4).unwrap();
        let out = resize_bilinear(view, 5, 4).unwrap();
        assert_eq!(out.data(), data.as_slice());
    }

    #[test]
    fn halving_averages_pairs() {
        let data = [0u8, 100, 200, 40, 0, 100, 200, 40];
        let view = ImageView::from_slice(&data, 4, 2).unwrap();
        let out = resize_bilinear(view, 2, 1).unwrap();
        assert_eq!(out.data(), &[50, 120]);
    }

    #[test]
    fn upscaling_a_constant_stays_constant() {
        let data = [77u8; 9];
        let view = ImageView::from_slice(&data, 3, 3).unwrap();
        let out = resize_by(view, 2.0).unwrap();
        assert_eq!((out.width(), out.height()), (6, 6));
        assert!(out.data().iter().all(|&v| v == 77));
        assert!(resize_by(view, 0.1).is_none());
    }
}
