//! Low-level building blocks for custom matching loops.
//!
//! These expose template plans, the kernel trait and scan helpers for hosts
//! that drive scanning themselves instead of going through [`crate::Matcher`]
//! or [`crate::run_cycle`].

pub use crate::cache::{adaptive_scales, CachedTemplate, SCALE_EPSILON};
pub use crate::candidate::nms::sort_matches_desc;
pub use crate::candidate::topk::{Peak, TopK};
pub use crate::image::equalize::equalize_hist;
pub use crate::image::resize::{resize_bilinear, scaled_size};
pub use crate::kernel::scalar::{ZnccColorScalar, ZnccMaskedScalar, ZnccUnmaskedScalar};
pub use crate::kernel::{Kernel, ScanOutput, ScanParams};
pub use crate::template::{ColorTemplatePlan, MaskedTemplatePlan, TemplatePlan};

#[cfg(feature = "rayon")]
pub use crate::kernel::rayon::{scan_color_par, scan_par};
#[cfg(feature = "simd")]
pub use crate::kernel::simd::ZnccUnmaskedSimd;
