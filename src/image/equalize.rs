//! Histogram equalization for grayscale buffers.
//!
//! Game icons are rendered greyed out or dimmed depending on UI state.
//! Equalizing both the template and the search region before correlation
//! stretches each to the full intensity range so those states still score.

use crate::image::{ImageView, OwnedImage};

/// Builds the equalization lookup table for a 256-bin histogram.
///
/// The darkest occupied bin maps to 0 and the cumulative distribution of the
/// remaining bins is stretched to 255. A single-valued image keeps its value.
fn equalize_lut(hist: &[u32; 256], total: u32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let first = match hist.iter().position(|&count| count > 0) {
        Some(first) => first,
        None => return lut,
    };
    if hist[first] == total {
        lut.iter_mut().for_each(|v| *v = first as u8);
        return lut;
    }

    let scale = 255.0f32 / (total - hist[first]) as f32;
    let mut cumulative = 0u32;
    for (value, &count) in hist.iter().enumerate().skip(first + 1) {
        cumulative += count;
        lut[value] = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Returns an equalized copy of `src`.
pub fn equalize_hist(src: ImageView<'_, u8>) -> OwnedImage {
    let mut hist = [0u32; 256];
    for y in 0..src.height() {
        if let Some(row) = src.row(y) {
            for &value in row {
                hist[value as usize] += 1;
            }
        }
    }
    let total = (src.width() * src.height()) as u32;
    let lut = equalize_lut(&hist, total);

    let mut out = OwnedImage::from_view(src);
    out.map_in_place(|value| lut[value as usize]);
    out
}

impl OwnedImage {
    pub(crate) fn map_in_place(&mut self, f: impl Fn(u8) -> u8) {
        self.data.iter_mut().for_each(|v| *v = f(*v));
    }
}

#[cfg(test)]
mod tests {
    use super::equalize_hist;
    use crate::image::ImageView;

    #[test]
    fn two_levels_stretch_to_full_range() {
        let data = [100u8, 100, 120, 120];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        let out = equalize_hist(view);
        assert_eq!(out.data(), &[0, 0, 255, 255]);
    }

    #[test]
    fn constant_image_is_unchanged() {
        let data = [42u8; 6];
        let view = ImageView::from_slice(&data, 3, 2).unwrap();
        assert_eq!(equalize_hist(view).data(), &data);
    }

    #[test]
    fn equalization_preserves_order() {
        let data: Vec<u8> = (0..64).map(|v| (v * 2 + 30) as u8).collect();
        let view = ImageView::from_slice(&data, 8, 8).unwrap();
        let out = equalize_hist(view);
        assert_eq!(out.data()[0], 0);
        assert_eq!(out.data()[63], 255);
        assert!(out.data().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn strided_roi_is_equalized_without_padding() {
        let data = [0u8, 10, 99, 20, 30, 99];
        let view = ImageView::new(&data, 2, 2, 3).unwrap();
        let out = equalize_hist(view);
        assert_eq!((out.width(), out.height()), (2, 2));
        assert_eq!(out.data(), &[0, 85, 170, 255]);
    }
}
