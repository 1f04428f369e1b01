//! Scale factor sets and adaptive scale selection.

use crate::util::math::linspace;
use crate::util::{BoardSightError, BoardSightResult};

/// Two scales closer than this are considered the same factor.
pub const SCALE_EPSILON: f32 = 1e-4;

/// Sorted, de-duplicated set of positive scale factors.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleSet {
    scales: Vec<f32>,
}

impl ScaleSet {
    /// Creates a set from arbitrary factors; they are sorted ascending and
    /// near-duplicates (within [`SCALE_EPSILON`]) are merged.
    pub fn new(mut scales: Vec<f32>) -> BoardSightResult<Self> {
        if scales.is_empty() {
            return Err(BoardSightError::InvalidScaleSet {
                reason: "scale set is empty",
            });
        }
        if scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(BoardSightError::InvalidScaleSet {
                reason: "scales must be finite and > 0",
            });
        }
        scales.sort_by(|a, b| a.total_cmp(b));
        scales.dedup_by(|b, a| (*b - *a).abs() < SCALE_EPSILON);
        Ok(Self { scales })
    }

    /// `steps` linearly spaced factors over `[min, max]`, both ends included.
    pub fn linspace(min: f32, max: f32, steps: usize) -> BoardSightResult<Self> {
        if steps == 0 {
            return Err(BoardSightError::InvalidScaleSet {
                reason: "steps must be >= 1",
            });
        }
        if min.is_nan() || max.is_nan() || min > max {
            return Err(BoardSightError::InvalidScaleSet {
                reason: "min scale must not exceed max scale",
            });
        }
        Self::new(linspace(min, max, steps))
    }

    /// Wraps factors that are already sorted, distinct and positive.
    pub(crate) fn from_sorted(scales: Vec<f32>) -> Self {
        debug_assert!(scales.windows(2).all(|w| w[0] < w[1]));
        Self { scales }
    }

    /// Returns the identity scale set `[1.0]`.
    pub fn identity() -> Self {
        Self { scales: vec![1.0] }
    }

    /// Returns the number of distinct factors.
    pub fn len(&self) -> usize {
        self.scales.len()
    }

    /// Returns true if the set holds no factors.
    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// Returns the factors in ascending order.
    pub fn as_slice(&self) -> &[f32] {
        &self.scales
    }

    /// Iterates over the factors in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.scales.iter().copied()
    }

    /// Index of the factor equal to `scale` within [`SCALE_EPSILON`].
    pub fn position(&self, scale: f32) -> Option<usize> {
        self.scales
            .iter()
            .position(|s| (s - scale).abs() < SCALE_EPSILON)
    }
}

impl Default for ScaleSet {
    fn default() -> Self {
        Self::identity()
    }
}

/// How the matcher picks template scales for a region.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ScaleMode {
    /// Use the variants precomputed by the template cache.
    #[default]
    Fixed,
    /// Derive a scale range from the template and region sizes.
    ///
    /// The smallest scale makes the shorter template side `min_icon_px`
    /// pixels; the largest makes the template fill `max_region_fraction` of
    /// the region along its tighter axis.
    Adaptive {
        min_icon_px: usize,
        max_region_fraction: f32,
        steps: usize,
    },
}

impl ScaleMode {
    /// Validates adaptive parameters; `Fixed` is always valid.
    pub fn validate(&self) -> BoardSightResult<()> {
        match *self {
            ScaleMode::Fixed => Ok(()),
            ScaleMode::Adaptive {
                min_icon_px,
                max_region_fraction,
                steps,
            } => {
                if min_icon_px == 0 {
                    return Err(BoardSightError::InvalidScaleSet {
                        reason: "min_icon_px must be >= 1",
                    });
                }
                if !(max_region_fraction > 0.0 && max_region_fraction <= 1.0) {
                    return Err(BoardSightError::InvalidScaleSet {
                        reason: "max_region_fraction must be in (0, 1]",
                    });
                }
                if steps == 0 {
                    return Err(BoardSightError::InvalidScaleSet {
                        reason: "steps must be >= 1",
                    });
                }
                Ok(())
            }
        }
    }
}

/// Scales to try for a `tpl_w x tpl_h` template inside a `region_w x region_h`
/// region, or `None` when even the smallest scale does not fit.
pub fn adaptive_scales(
    tpl_w: usize,
    tpl_h: usize,
    region_w: usize,
    region_h: usize,
    min_icon_px: usize,
    max_region_fraction: f32,
    steps: usize,
) -> Option<ScaleSet> {
    if tpl_w == 0 || tpl_h == 0 || region_w == 0 || region_h == 0 || steps == 0 {
        return None;
    }
    let s_min = min_icon_px as f32 / tpl_w.min(tpl_h) as f32;
    let fit_w = region_w as f32 / tpl_w as f32;
    let fit_h = region_h as f32 / tpl_h as f32;
    let s_max = max_region_fraction * fit_w.min(fit_h);
    if s_max < s_min {
        return None;
    }
    ScaleSet::linspace(s_min, s_max, steps).ok()
}
