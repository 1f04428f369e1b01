//! Fractional template masks for regions obscured by UI overlays.

use crate::util::{BoardSightError, BoardSightResult};

/// Sub-rectangle of a template to exclude from correlation, in fractions of
/// the template size (`0.0..=1.0`, `left < right`, `top < bottom`).
///
/// Shop icons carry a cost badge and a cooldown swipe in their top-right
/// corner; masking that corner keeps those overlays from lowering the score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaskRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl MaskRect {
    /// Square-ish corner covering `fraction` of the width and height.
    pub fn top_right(fraction: f32) -> Self {
        Self {
            left: 1.0 - fraction,
            top: 0.0,
            right: 1.0,
            bottom: fraction,
        }
    }

    /// Checks that the fractions describe a non-empty rectangle.
    pub fn validate(&self) -> BoardSightResult<()> {
        let fractions = [self.left, self.top, self.right, self.bottom];
        if fractions
            .iter()
            .any(|f| !f.is_finite() || *f < 0.0 || *f > 1.0)
        {
            return Err(BoardSightError::InvalidConfig {
                reason: "mask fractions must lie in [0, 1]",
            });
        }
        if self.left >= self.right || self.top >= self.bottom {
            return Err(BoardSightError::InvalidConfig {
                reason: "mask rectangle is empty",
            });
        }
        Ok(())
    }

    /// Row-major 0/1 mask for a `width x height` template; masked pixels are 0.
    pub fn build(&self, width: usize, height: usize) -> Vec<u8> {
        let x0 = (width as f32 * self.left).floor() as usize;
        let x1 = ((width as f32 * self.right).floor() as usize).min(width);
        let y0 = (height as f32 * self.top).floor() as usize;
        let y1 = ((height as f32 * self.bottom).floor() as usize).min(height);

        let mut mask = vec![1u8; width * height];
        for y in y0..y1 {
            for x in x0..x1 {
                mask[y * width + x] = 0;
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::MaskRect;

    #[test]
    fn top_right_masks_the_corner() {
        let mask = MaskRect::top_right(0.5).build(4, 4);
        assert_eq!(
            mask,
            vec![
                1, 1, 0, 0, //
                1, 1, 0, 0, //
                1, 1, 1, 1, //
                1, 1, 1, 1,
            ]
        );
    }

    #[test]
    fn validation_rejects_bad_fractions() {
        assert!(MaskRect::top_right(0.3).validate().is_ok());
        assert!(MaskRect::top_right(0.0).validate().is_err());
        assert!(MaskRect {
            left: -0.1,
            top: 0.0,
            right: 0.5,
            bottom: 0.5
        }
        .validate()
        .is_err());
    }
}
