//! Planar RGB images for colour correlation.
//!
//! Colour data is kept as three grayscale planes (R, G, B) so every plane can
//! reuse the strided [`ImageView`] machinery: ROIs stay zero-copy, resizing and
//! equalization run per plane, and a grayscale view can stand in for a colour
//! one by repeating the same plane three times.

use crate::image::equalize::equalize_hist;
use crate::image::frame::{luma, ChannelOrder};
use crate::image::resize::resize_bilinear;
use crate::image::{ImageView, OwnedImage};
use crate::util::{BoardSightError, BoardSightResult};

/// Number of colour planes.
pub const PLANES: usize = 3;

fn check_same_size(widths: [usize; PLANES], heights: [usize; PLANES]) -> BoardSightResult<()> {
    if widths.iter().any(|&w| w != widths[0]) || heights.iter().any(|&h| h != heights[0]) {
        return Err(BoardSightError::InvalidDimensions {
            width: widths[0],
            height: heights[0],
        });
    }
    Ok(())
}

/// Borrowed planar RGB view; all planes share one size.
#[derive(Copy, Clone, Debug)]
pub struct ColorView<'a> {
    planes: [ImageView<'a, u8>; PLANES],
}

impl<'a> ColorView<'a> {
    /// Combines three equally sized planes in R, G, B order.
    pub fn new(planes: [ImageView<'a, u8>; PLANES]) -> BoardSightResult<Self> {
        check_same_size(planes.map(|p| p.width()), planes.map(|p| p.height()))?;
        Ok(Self { planes })
    }

    /// Uses a grayscale view for all three planes.
    pub fn replicate(gray: ImageView<'a, u8>) -> Self {
        Self {
            planes: [gray, gray, gray],
        }
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> usize {
        self.planes[0].width()
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> usize {
        self.planes[0].height()
    }

    /// Returns the planes in R, G, B order.
    pub fn planes(&self) -> &[ImageView<'a, u8>; PLANES] {
        &self.planes
    }

    /// Zero-copy ROI of every plane.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> BoardSightResult<ColorView<'a>> {
        let [r, g, b] = self.planes;
        Ok(Self {
            planes: [
                r.roi(x, y, width, height)?,
                g.roi(x, y, width, height)?,
                b.roi(x, y, width, height)?,
            ],
        })
    }

    /// Luma of every pixel with the frame conversion weights.
    pub fn to_gray(&self) -> OwnedImage {
        let [r, g, b] = self.planes;
        let mut data = Vec::with_capacity(self.width() * self.height());
        for y in 0..self.height() {
            if let (Some(rr), Some(gr), Some(br)) = (r.row(y), g.row(y), b.row(y)) {
                data.extend(
                    rr.iter()
                        .zip(gr)
                        .zip(br)
                        .map(|((&r, &g), &b)| luma(r, g, b)),
                );
            }
        }
        OwnedImage::from_parts(data, self.width(), self.height())
    }

    /// Copies the planes into contiguous storage.
    pub fn to_image(&self) -> ColorImage {
        ColorImage {
            planes: self.planes.map(OwnedImage::from_view),
        }
    }

    /// Histogram-equalizes each plane independently.
    pub fn equalized(&self) -> ColorImage {
        ColorImage {
            planes: self.planes.map(equalize_hist),
        }
    }

    /// Bilinear resize of each plane.
    pub fn resized(&self, width: usize, height: usize) -> BoardSightResult<ColorImage> {
        let [r, g, b] = self.planes;
        Ok(ColorImage {
            planes: [
                resize_bilinear(r, width, height)?,
                resize_bilinear(g, width, height)?,
                resize_bilinear(b, width, height)?,
            ],
        })
    }
}

/// Owned planar RGB image.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorImage {
    planes: [OwnedImage; PLANES],
}

impl ColorImage {
    /// Combines three equally sized planes in R, G, B order.
    pub fn from_planes(planes: [OwnedImage; PLANES]) -> BoardSightResult<Self> {
        check_same_size(
            [planes[0].width(), planes[1].width(), planes[2].width()],
            [planes[0].height(), planes[1].height(), planes[2].height()],
        )?;
        Ok(Self { planes })
    }

    /// Splits an interleaved 3- or 4-channel buffer into planes.
    pub fn from_interleaved(
        data: &[u8],
        width: usize,
        height: usize,
        channels: usize,
        order: ChannelOrder,
    ) -> BoardSightResult<Self> {
        if !matches!(channels, 3 | 4) {
            return Err(BoardSightError::UnsupportedChannels { channels });
        }
        let count = width
            .checked_mul(height)
            .ok_or(BoardSightError::InvalidDimensions { width, height })?;
        let needed = count
            .checked_mul(channels)
            .ok_or(BoardSightError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(BoardSightError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        let (ri, bi) = match order {
            ChannelOrder::Rgb => (0, 2),
            ChannelOrder::Bgr => (2, 0),
        };
        let mut planes = [
            Vec::with_capacity(count),
            Vec::with_capacity(count),
            Vec::with_capacity(count),
        ];
        for px in data.chunks_exact(channels) {
            planes[0].push(px[ri]);
            planes[1].push(px[1]);
            planes[2].push(px[bi]);
        }
        let [r, g, b] = planes;
        Ok(Self {
            planes: [
                OwnedImage::new(r, width, height)?,
                OwnedImage::new(g, width, height)?,
                OwnedImage::new(b, width, height)?,
            ],
        })
    }

    /// Repeats a grayscale image in all three planes.
    pub fn from_gray(gray: &OwnedImage) -> Self {
        Self {
            planes: [gray.clone(), gray.clone(), gray.clone()],
        }
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> usize {
        self.planes[0].width()
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> usize {
        self.planes[0].height()
    }

    /// Returns one plane (0 = R, 1 = G, 2 = B).
    pub fn plane(&self, channel: usize) -> Option<&OwnedImage> {
        self.planes.get(channel)
    }

    /// Returns a borrowed view of all planes.
    pub fn view(&self) -> ColorView<'_> {
        ColorView {
            planes: [
                self.planes[0].view(),
                self.planes[1].view(),
                self.planes[2].view(),
            ],
        }
    }
}
