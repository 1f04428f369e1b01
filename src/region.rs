//! Fractional search regions resolved against a frame size.

use crate::util::{BoardSightError, BoardSightResult};

/// Area of the frame to search, as fractions of the frame size.
///
/// Fractions are resolved with truncation, so a region never extends past
/// the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchRegion {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// Absolute pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelRect {
    /// Returns `(x, y, width, height)`.
    pub fn as_tuple(&self) -> (usize, usize, usize, usize) {
        (self.x, self.y, self.width, self.height)
    }
}

impl SearchRegion {
    /// The whole frame.
    pub const FULL: SearchRegion = SearchRegion {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };

    /// Creates a region from fractional bounds.
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> BoardSightResult<Self> {
        let region = Self {
            left,
            top,
            right,
            bottom,
        };
        region.validate()?;
        Ok(region)
    }

    /// The hex battlefield in the reference layout.
    pub fn field_board() -> Self {
        Self {
            left: 0.40,
            top: 0.37,
            right: 0.60,
            bottom: 0.71,
        }
    }

    /// The shop bar along the bottom of the reference layout.
    pub fn shop_bar() -> Self {
        Self {
            left: 0.39,
            top: 0.85,
            right: 0.57,
            bottom: 1.0,
        }
    }

    /// The bottom `fraction` of the frame, full width.
    pub fn bottom_band(fraction: f32) -> Self {
        Self {
            left: 0.0,
            top: 1.0 - fraction,
            right: 1.0,
            bottom: 1.0,
        }
    }

    /// Checks that all fractions are in `[0, 1]` and the area is non-empty.
    pub fn validate(&self) -> BoardSightResult<()> {
        let fractions = [self.left, self.top, self.right, self.bottom];
        if fractions
            .iter()
            .any(|f| !f.is_finite() || *f < 0.0 || *f > 1.0)
        {
            return Err(BoardSightError::InvalidRegion {
                reason: "fractions must lie in [0, 1]",
            });
        }
        if self.left >= self.right || self.top >= self.bottom {
            return Err(BoardSightError::InvalidRegion {
                reason: "region is empty",
            });
        }
        Ok(())
    }

    /// Resolves the fractions against a `frame_width x frame_height` frame.
    ///
    /// Each edge is `floor(size * fraction)`.
    pub fn resolve(
        &self,
        frame_width: usize,
        frame_height: usize,
    ) -> BoardSightResult<PixelRect> {
        self.validate()?;
        let edge =
            |size: usize, fraction: f32| (size as f64 * f64::from(fraction)).floor() as usize;
        let x0 = edge(frame_width, self.left);
        let y0 = edge(frame_height, self.top);
        let x1 = edge(frame_width, self.right).min(frame_width);
        let y1 = edge(frame_height, self.bottom).min(frame_height);
        if x1 <= x0 || y1 <= y0 {
            return Err(BoardSightError::InvalidRegion {
                reason: "region resolves to zero pixels",
            });
        }
        Ok(PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

impl Default for SearchRegion {
    fn default() -> Self {
        Self::FULL
    }
}

#[cfg(test)]
mod tests {
    use super::{PixelRect, SearchRegion};

    #[test]
    fn field_board_resolves_on_reference_capture() {
        let rect = SearchRegion::field_board().resolve(2560, 1440).unwrap();
        assert_eq!(
            rect,
            PixelRect {
                x: 1024,
                y: 532,
                width: 512,
                height: 490,
            }
        );
    }

    #[test]
    fn full_region_covers_frame() {
        let rect = SearchRegion::FULL.resolve(7, 5).unwrap();
        assert_eq!(rect.as_tuple(), (0, 0, 7, 5));
    }

    #[test]
    fn invalid_regions_are_rejected() {
        assert!(SearchRegion::new(0.5, 0.0, 0.5, 1.0).is_err());
        assert!(SearchRegion::new(-0.1, 0.0, 0.5, 1.0).is_err());
        assert!(SearchRegion::new(0.0, 0.0, 1.1, 1.0).is_err());
        // Valid fractions, but too thin to cover a pixel.
        let thin = SearchRegion::new(0.50, 0.0, 0.51, 1.0).unwrap();
        assert!(thin.resolve(10, 10).is_err());
    }
}
