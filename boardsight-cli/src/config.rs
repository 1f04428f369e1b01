//! JSON configuration mirrors of the library settings.
//!
//! Every section is `#[serde(default)]`, so a config file only needs the keys
//! it changes. Detection settings start from a named preset and apply the
//! overrides present in the file.

use boardsight::{
    BoardSightResult, Calibration, CalibrationOrigin, DetectionConfig, MaskRect, ScaleMode,
    ScaleSet, SearchRegion,
};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresetConfig {
    #[default]
    FieldBoard,
    ShopBar,
    BottomScan,
}

impl From<PresetConfig> for DetectionConfig {
    fn from(value: PresetConfig) -> Self {
        match value {
            PresetConfig::FieldBoard => DetectionConfig::field_board(),
            PresetConfig::ShopBar => DetectionConfig::shop_bar(),
            PresetConfig::BottomScan => DetectionConfig::bottom_scan(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct RegionJson {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl From<RegionJson> for SearchRegion {
    fn from(value: RegionJson) -> Self {
        SearchRegion {
            left: value.left,
            top: value.top,
            right: value.right,
            bottom: value.bottom,
        }
    }
}

impl From<SearchRegion> for RegionJson {
    fn from(value: SearchRegion) -> Self {
        Self {
            left: value.left,
            top: value.top,
            right: value.right,
            bottom: value.bottom,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct ScaleRangeJson {
    pub min: f32,
    pub max: f32,
    pub steps: usize,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ScaleModeJson {
    Fixed,
    Adaptive {
        min_icon_px: usize,
        max_region_fraction: f32,
        steps: usize,
    },
}

impl From<ScaleModeJson> for ScaleMode {
    fn from(value: ScaleModeJson) -> Self {
        match value {
            ScaleModeJson::Fixed => ScaleMode::Fixed,
            ScaleModeJson::Adaptive {
                min_icon_px,
                max_region_fraction,
                steps,
            } => ScaleMode::Adaptive {
                min_icon_px,
                max_region_fraction,
                steps,
            },
        }
    }
}

/// Overrides applied on top of the selected preset.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionJson {
    pub region: Option<RegionJson>,
    pub threshold: Option<f32>,
    pub scales: Option<Vec<f32>>,
    pub scale_range: Option<ScaleRangeJson>,
    pub scale_mode: Option<ScaleModeJson>,
    pub max_region_fraction: Option<f32>,
    pub early_exit: Option<f32>,
    pub max_matches_per_variant: Option<usize>,
    pub min_var_i: Option<f32>,
    pub parallel: Option<bool>,
    /// Correlate R, G, B planes instead of luma.
    pub color: Option<bool>,
    pub equalize: Option<bool>,
    /// Fraction of the template's top-right corner ignored during matching.
    pub mask_top_right: Option<f32>,
    pub min_template_px: Option<usize>,
    pub overlap_threshold: Option<f32>,
    pub global_overlap_threshold: Option<f32>,
    pub single_instance: Option<bool>,
    pub max_matches_per_cycle: Option<usize>,
}

impl DetectionJson {
    /// Applies the overrides to `preset`.
    pub fn apply(&self, preset: PresetConfig) -> BoardSightResult<DetectionConfig> {
        let mut cfg = DetectionConfig::from(preset);
        if let Some(region) = self.region {
            cfg.region = region.into();
        }
        if let Some(scales) = &self.scales {
            cfg.scales = ScaleSet::new(scales.clone())?;
        }
        if let Some(range) = self.scale_range {
            cfg.scales = ScaleSet::linspace(range.min, range.max, range.steps)?;
        }
        if let Some(mode) = self.scale_mode {
            cfg.matching.scale_mode = mode.into();
        }
        if let Some(threshold) = self.threshold {
            cfg.matching.threshold = threshold;
        }
        if let Some(fraction) = self.max_region_fraction {
            cfg.matching.max_region_fraction = fraction;
        }
        if self.early_exit.is_some() {
            cfg.matching.early_exit = self.early_exit;
        }
        if self.max_matches_per_variant.is_some() {
            cfg.matching.max_matches_per_variant = self.max_matches_per_variant;
        }
        if let Some(min_var_i) = self.min_var_i {
            cfg.matching.min_var_i = min_var_i;
        }
        if let Some(parallel) = self.parallel {
            cfg.matching.parallel = parallel;
        }
        if let Some(color) = self.color {
            cfg.preprocess.color = color;
        }
        if let Some(equalize) = self.equalize {
            cfg.preprocess.equalize = equalize;
        }
        if let Some(fraction) = self.mask_top_right {
            cfg.preprocess.mask = Some(MaskRect::top_right(fraction));
        }
        if let Some(px) = self.min_template_px {
            cfg.preprocess.min_template_px = px;
        }
        if let Some(threshold) = self.overlap_threshold {
            cfg.overlap_threshold = threshold;
        }
        if self.global_overlap_threshold.is_some() {
            cfg.global_overlap_threshold = self.global_overlap_threshold;
        }
        if let Some(single) = self.single_instance {
            cfg.single_instance = single;
        }
        if self.max_matches_per_cycle.is_some() {
            cfg.max_matches_per_cycle = self.max_matches_per_cycle;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OriginConfig {
    #[default]
    Absolute,
    BoardRelative,
}

impl From<OriginConfig> for CalibrationOrigin {
    fn from(value: OriginConfig) -> Self {
        match value {
            OriginConfig::Absolute => CalibrationOrigin::Absolute,
            OriginConfig::BoardRelative => CalibrationOrigin::BoardRelative,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalibrationJson {
    /// Board rectangle the cell pitch is derived from.
    pub board_region: RegionJson,
    pub row_y: [f32; 8],
    pub x_start_even: f32,
    pub x_start_odd: f32,
    pub spacing: f32,
    pub origin: OriginConfig,
    pub radius_factor: f32,
}

impl Default for CalibrationJson {
    fn default() -> Self {
        let cal = Calibration::default();
        Self {
            board_region: SearchRegion::field_board().into(),
            row_y: cal.row_y,
            x_start_even: cal.x_start_even,
            x_start_odd: cal.x_start_odd,
            spacing: cal.spacing,
            origin: OriginConfig::Absolute,
            radius_factor: cal.radius_factor,
        }
    }
}

impl From<&CalibrationJson> for Calibration {
    fn from(value: &CalibrationJson) -> Self {
        Calibration {
            row_y: value.row_y,
            x_start_even: value.x_start_even,
            x_start_odd: value.x_start_odd,
            spacing: value.spacing,
            origin: value.origin.into(),
            radius_factor: value.radius_factor,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchJson {
    pub screenshots_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Save `detected_<name>` copies with the matches drawn in.
    pub highlight: bool,
    pub report_name: String,
}

impl Default for BatchJson {
    fn default() -> Self {
        Self {
            screenshots_dir: PathBuf::from("screenshots"),
            output_dir: PathBuf::from("highlighted_screenshots"),
            highlight: true,
            report_name: "detection_results.json".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchJson {
    /// Image file rewritten by the capture tool.
    pub frame_path: PathBuf,
    pub interval_ms: u64,
    /// Upper bound for the delay after consecutive failed cycles.
    pub max_backoff_ms: u64,
}

impl Default for WatchJson {
    fn default() -> Self {
        Self {
            frame_path: PathBuf::from("frame.png"),
            interval_ms: 1000,
            max_backoff_ms: 30_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub templates_dir: PathBuf,
    pub preset: PresetConfig,
    pub detection: DetectionJson,
    pub calibration: CalibrationJson,
    pub batch: BatchJson,
    pub watch: WatchJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            preset: PresetConfig::default(),
            detection: DetectionJson::default(),
            calibration: CalibrationJson::default(),
            batch: BatchJson::default(),
            watch: WatchJson::default(),
        }
    }
}

impl Config {
    /// Resolves the detection settings.
    pub fn detection_config(&self) -> BoardSightResult<DetectionConfig> {
        self.detection.apply(self.preset)
    }
}
