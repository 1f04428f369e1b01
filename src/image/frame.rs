//! Raw captured frames and their grayscale conversion.
//!
//! Capture backends hand over interleaved 8-bit buffers in a handful of
//! layouts. Everything downstream works on single-channel luma, so frames are
//! converted once per cycle with the ITU-R BT.601 weights
//! (`0.299 R + 0.587 G + 0.114 B`) in 16.16 fixed point. Templates loaded from
//! disk go through the same conversion so their statistics line up. Colour
//! matching instead splits the frame into R, G, B planes.

use crate::image::color::ColorImage;
use crate::image::OwnedImage;
use crate::util::{BoardSightError, BoardSightResult};

/// Order of the colour channels in a 3- or 4-channel buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Red first (`RGB` / `RGBA`).
    #[default]
    Rgb,
    /// Blue first (`BGR` / `BGRA`).
    Bgr,
}

/// Borrowed interleaved frame buffer (`width * height * channels` bytes).
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    channels: usize,
    order: ChannelOrder,
}

const R_WEIGHT: u32 = 19_595;
const G_WEIGHT: u32 = 38_470;
const B_WEIGHT: u32 = 7_471;

impl<'a> Frame<'a> {
    /// Wraps a buffer without validating it; see [`Frame::validate`].
    pub fn new(data: &'a [u8], width: usize, height: usize, channels: usize) -> Self {
        Self {
            data,
            width,
            height,
            channels,
            order: ChannelOrder::Rgb,
        }
    }

    /// Single-channel frame.
    pub fn gray(data: &'a [u8], width: usize, height: usize) -> Self {
        Self::new(data, width, height, 1)
    }

    /// Sets the channel order for colour frames.
    pub fn with_order(mut self, order: ChannelOrder) -> Self {
        self.order = order;
        self
    }

    /// Returns the frame width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the frame height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of interleaved channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Checks dimensions, channel count and buffer length.
    pub fn validate(&self) -> BoardSightResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BoardSightError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !matches!(self.channels, 1 | 3 | 4) {
            return Err(BoardSightError::UnsupportedChannels {
                channels: self.channels,
            });
        }
        let needed = self
            .width
            .checked_mul(self.height)
            .and_then(|v| v.checked_mul(self.channels))
            .ok_or(BoardSightError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        if self.data.len() != needed {
            return Err(BoardSightError::BufferTooSmall {
                needed,
                got: self.data.len(),
            });
        }
        Ok(())
    }

    /// Converts the frame to a contiguous grayscale image.
    pub fn to_gray(&self) -> BoardSightResult<OwnedImage> {
        self.validate()?;
        let data = if self.channels == 1 {
            self.data.to_vec()
        } else {
            let (ri, bi) = match self.order {
                ChannelOrder::Rgb => (0, 2),
                ChannelOrder::Bgr => (2, 0),
            };
            self.data
                .chunks_exact(self.channels)
                .map(|px| luma(px[ri], px[1], px[bi]))
                .collect()
        };
        OwnedImage::new(data, self.width, self.height)
    }

    /// Splits the frame into R, G, B planes; gray frames fill all three.
    pub fn to_color(&self) -> BoardSightResult<ColorImage> {
        self.validate()?;
        if self.channels == 1 {
            let gray = OwnedImage::new(self.data.to_vec(), self.width, self.height)?;
            return Ok(ColorImage::from_gray(&gray));
        }
        ColorImage::from_interleaved(
            self.data,
            self.width,
            self.height,
            self.channels,
            self.order,
        )
    }
}

#[inline]
pub(crate) fn luma(r: u8, g: u8, b: u8) -> u8 {
    let sum = R_WEIGHT * u32::from(r) + G_WEIGHT * u32::from(g) + B_WEIGHT * u32::from(b);
    ((sum + (1 << 15)) >> 16).min(255) as u8
}
