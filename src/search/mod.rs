//! Multi-scale template search over a frame region.
//!
//! [`Matcher`] scans every cached template at every applicable scale and
//! returns raw (unsuppressed) matches above the confidence threshold.

mod matcher;

pub use matcher::{Matcher, RegionScan, TemplateBest};

use crate::cache::ScaleMode;
use crate::util::{BoardSightError, BoardSightResult};

/// One placement of a template variant in frame coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Match {
    /// Id of the matched template.
    pub template_id: String,
    /// Left edge of the box in frame pixels.
    pub x: usize,
    /// Top edge of the box in frame pixels.
    pub y: usize,
    /// Box width (the variant width).
    pub width: usize,
    /// Box height (the variant height).
    pub height: usize,
    /// ZNCC score in `[-1, 1]`.
    pub confidence: f32,
    /// Scale factor of the variant that matched.
    pub scale: f32,
    /// Board cell `(row, col)` once the match has been assigned.
    pub cell: Option<(usize, usize)>,
}

impl Match {
    /// Box center using integer division.
    pub fn center(&self) -> (usize, usize) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Returns `(x, y, width, height)`.
    pub fn rect(&self) -> (usize, usize, usize, usize) {
        (self.x, self.y, self.width, self.height)
    }

    /// Box area in pixels.
    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

/// Configuration for region matching.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchConfig {
    /// Minimum ZNCC score for a placement to become a match.
    pub threshold: f32,
    /// Where the scale factors come from.
    pub scale_mode: ScaleMode,
    /// Variants wider or taller than this fraction of the region are skipped.
    pub max_region_fraction: f32,
    /// Stop trying larger scales of a template once a match reaches this score.
    pub early_exit: Option<f32>,
    /// Keep only the best `n` placements per variant.
    pub max_matches_per_variant: Option<usize>,
    /// Per-pixel variance floor for image windows.
    pub min_var_i: f32,
    /// Scan templates in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            scale_mode: ScaleMode::Fixed,
            max_region_fraction: 0.8,
            early_exit: None,
            max_matches_per_variant: None,
            min_var_i: 1e-3,
            parallel: false,
        }
    }
}

impl MatchConfig {
    /// Checks thresholds and fractions.
    pub fn validate(&self) -> BoardSightResult<()> {
        if !self.threshold.is_finite() || self.threshold > 1.0 || self.threshold < -1.0 {
            return Err(BoardSightError::InvalidConfig {
                reason: "threshold must be within [-1, 1]",
            });
        }
        if !(self.max_region_fraction > 0.0 && self.max_region_fraction <= 1.0) {
            return Err(BoardSightError::InvalidConfig {
                reason: "max_region_fraction must be in (0, 1]",
            });
        }
        if let Some(score) = self.early_exit {
            if !score.is_finite() {
                return Err(BoardSightError::InvalidConfig {
                    reason: "early_exit score must be finite",
                });
            }
        }
        if !self.min_var_i.is_finite() || self.min_var_i < 0.0 {
            return Err(BoardSightError::InvalidConfig {
                reason: "min_var_i must be finite and >= 0",
            });
        }
        self.scale_mode.validate()
    }
}
