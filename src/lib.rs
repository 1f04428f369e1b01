//! BoardSight finds known game icons in captured frames and maps them onto a
//! hexagonal board.
//!
//! A detection cycle scans a fractional region of the frame with every cached
//! template at several scales using zero-mean normalized cross-correlation
//! (ZNCC), suppresses overlapping hits, and assigns the survivors to the
//! nearest cell of an 8x5 hex grid. Templates can be correlated on luma or on
//! all three colour planes. Template-parallel scanning is available via the
//! `rayon` feature and a vectorized kernel via `simd`.

pub mod board;
pub mod cache;
mod candidate;
pub mod catalog;
pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod pipeline;
pub mod region;
pub mod search;
pub mod template;
mod trace;
pub mod util;

pub use board::{
    BoardGeometry, BoardState, BoardSummary, Calibration, CalibrationOrigin, CellSummary, HexCell,
};
pub use cache::{PreprocessOptions, ScaleMode, ScaleSet, ScaleVariant, TemplateCache};
pub use candidate::nms::{best_per_template, overlap_ratio, suppress, suppress_per_template};
pub use catalog::{MergeLevel, Trait, Troop, TroopCatalog};
pub use image::frame::{ChannelOrder, Frame};
pub use image::color::{ColorImage, ColorView};
pub use image::{ImageView, OwnedImage};
pub use pipeline::{resolve_matches, run_cycle, CycleOutput, DetectionConfig};
pub use region::{PixelRect, SearchRegion};
pub use search::{Match, MatchConfig, Matcher, RegionScan, TemplateBest};
pub use template::{MaskRect, Template};
pub use util::{BoardSightError, BoardSightResult};
