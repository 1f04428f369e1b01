//! Template cache: named icons preprocessed once into per-scale variants.
//!
//! The cache is built once from a directory (or in-memory templates) and is
//! immutable afterwards, so it can be shared across threads behind `&` or
//! `Arc`. Each retained variant carries its ZNCC plan, ready for scanning.

mod scales;

pub use scales::{adaptive_scales, ScaleMode, ScaleSet, SCALE_EPSILON};

use crate::image::color::{ColorImage, ColorView};
use crate::image::equalize::equalize_hist;
use crate::image::resize::{resize_bilinear, scaled_size};
use crate::image::{ImageView, OwnedImage};
use crate::template::{ColorTemplatePlan, MaskRect, MaskedTemplatePlan, Template, TemplatePlan};
use crate::trace::{trace_debug, trace_event, trace_span, trace_warn};
use crate::util::{BoardSightError, BoardSightResult};

/// Preprocessing applied to templates (and mirrored on search regions).
#[derive(Clone, Debug, PartialEq)]
pub struct PreprocessOptions {
    /// Correlate R, G, B planes instead of luma.
    pub color: bool,
    /// Histogram-equalize templates before scaling and regions before matching
    /// (per plane in colour mode).
    pub equalize: bool,
    /// Optional template area excluded from correlation.
    pub mask: Option<MaskRect>,
    /// Variants narrower or shorter than this are dropped.
    pub min_template_px: usize,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            color: false,
            equalize: false,
            mask: None,
            min_template_px: 10,
        }
    }
}

impl PreprocessOptions {
    /// Checks the mask rectangle and size floor.
    pub fn validate(&self) -> BoardSightResult<()> {
        if self.min_template_px == 0 {
            return Err(BoardSightError::InvalidConfig {
                reason: "min_template_px must be >= 1",
            });
        }
        if let Some(mask) = &self.mask {
            mask.validate()?;
        }
        Ok(())
    }
}

/// ZNCC plan of a variant: colour, or luma with or without a mask.
#[derive(Clone, Debug)]
pub(crate) enum VariantPlan {
    Unmasked(TemplatePlan),
    Masked(MaskedTemplatePlan),
    Color(ColorTemplatePlan),
}

/// One template resized to one scale factor.
#[derive(Clone, Debug)]
pub struct ScaleVariant {
    scale: f32,
    img: OwnedImage,
    color: Option<ColorImage>,
    plan: VariantPlan,
}

impl ScaleVariant {
    /// Resizes `base` (and `base_color`, when given) by `scale` and plans it.
    ///
    /// Returns `Ok(None)` when the variant falls below `min_template_px`, and
    /// `Err(DegenerateTemplate)` when it has no contrast to correlate.
    pub(crate) fn build(
        base: ImageView<'_, u8>,
        base_color: Option<ColorView<'_>>,
        scale: f32,
        opts: &PreprocessOptions,
    ) -> BoardSightResult<Option<Self>> {
        let (width, height) = scaled_size(base.width(), base.height(), scale);
        if width < opts.min_template_px || height < opts.min_template_px {
            return Ok(None);
        }
        let img = resize_bilinear(base, width, height)?;
        let mask = opts.mask.as_ref().map(|mask| mask.build(width, height));
        let (color, plan) = match base_color {
            Some(base_color) => {
                let color = base_color.resized(width, height)?;
                let plan = ColorTemplatePlan::from_view(color.view(), mask)?;
                (Some(color), VariantPlan::Color(plan))
            }
            None => {
                let plan = match mask {
                    Some(mask) => {
                        VariantPlan::Masked(MaskedTemplatePlan::from_view(img.view(), mask)?)
                    }
                    None => VariantPlan::Unmasked(TemplatePlan::from_view(img.view())?),
                };
                (None, plan)
            }
        };
        Ok(Some(Self {
            scale,
            img,
            color,
            plan,
        }))
    }

    /// Returns the scale factor this variant was built for.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Returns the variant width in pixels.
    pub fn width(&self) -> usize {
        self.img.width()
    }

    /// Returns the variant height in pixels.
    pub fn height(&self) -> usize {
        self.img.height()
    }

    /// Returns the resized (and preprocessed) luma pixels.
    pub fn view(&self) -> ImageView<'_, u8> {
        self.img.view()
    }

    /// Returns the resized colour planes of a colour variant.
    pub fn color_view(&self) -> Option<ColorView<'_>> {
        self.color.as_ref().map(ColorImage::view)
    }

    /// Returns true if correlation ignores part of the variant.
    pub fn is_masked(&self) -> bool {
        match &self.plan {
            VariantPlan::Unmasked(_) => false,
            VariantPlan::Masked(_) => true,
            VariantPlan::Color(plan) => plan.mask().is_some(),
        }
    }

    /// Returns true if the variant is correlated in colour.
    pub fn is_color(&self) -> bool {
        matches!(self.plan, VariantPlan::Color(_))
    }

    pub(crate) fn plan(&self) -> &VariantPlan {
        &self.plan
    }
}

/// A template with its preprocessed base image and scale variants.
#[derive(Clone, Debug)]
pub struct CachedTemplate {
    id: String,
    base: OwnedImage,
    base_color: Option<ColorImage>,
    variants: Vec<ScaleVariant>,
}

impl CachedTemplate {
    fn build(tpl: Template, scales: &ScaleSet, opts: &PreprocessOptions) -> Self {
        let base = if opts.equalize {
            equalize_hist(tpl.view())
        } else {
            OwnedImage::from_view(tpl.view())
        };
        // Grayscale templates take part in colour matching as three equal planes.
        let base_color = opts.color.then(|| {
            let color = tpl
                .color_view()
                .unwrap_or_else(|| ColorView::replicate(tpl.view()));
            if opts.equalize {
                color.equalized()
            } else {
                color.to_image()
            }
        });

        let mut variants = Vec::with_capacity(scales.len());
        for scale in scales.iter() {
            let color = base_color.as_ref().map(ColorImage::view);
            match ScaleVariant::build(base.view(), color, scale, opts) {
                Ok(Some(variant)) => variants.push(variant),
                Ok(None) => {
                    trace_debug!("template {} too small at scale {scale:.3}", tpl.id());
                }
                Err(err) => {
                    trace_warn!("template {} excluded at scale {scale:.3}: {err}", tpl.id());
                }
            }
        }

        Self {
            id: tpl.id().to_string(),
            base,
            base_color,
            variants,
        }
    }

    /// Returns the template id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the original template width in pixels.
    pub fn width(&self) -> usize {
        self.base.width()
    }

    /// Returns the original template height in pixels.
    pub fn height(&self) -> usize {
        self.base.height()
    }

    /// Returns the preprocessed template at its original size.
    pub fn base_view(&self) -> ImageView<'_, u8> {
        self.base.view()
    }

    /// Returns the preprocessed colour planes when the cache matches in colour.
    pub fn base_color_view(&self) -> Option<ColorView<'_>> {
        self.base_color.as_ref().map(ColorImage::view)
    }

    /// Returns the retained variants in ascending scale order.
    pub fn variants(&self) -> &[ScaleVariant] {
        &self.variants
    }

    /// Returns the variant for `scale` (within [`SCALE_EPSILON`]).
    pub fn variant(&self, scale: f32) -> Option<&ScaleVariant> {
        self.variants
            .iter()
            .find(|v| (v.scale - scale).abs() < SCALE_EPSILON)
    }
}

/// Immutable set of templates and their precomputed scale variants.
#[derive(Clone, Debug)]
pub struct TemplateCache {
    scales: ScaleSet,
    preprocess: PreprocessOptions,
    templates: Vec<CachedTemplate>,
}

impl TemplateCache {
    /// Loads every image file in `dir` as a template (file stem = id).
    ///
    /// A missing directory yields an empty cache, and files that cannot be
    /// decoded are skipped; both are logged as warnings.
    #[cfg(feature = "image-io")]
    pub fn build<P: AsRef<std::path::Path>>(
        dir: P,
        scales: ScaleSet,
        preprocess: PreprocessOptions,
    ) -> BoardSightResult<Self> {
        let dir = dir.as_ref();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                trace_warn!("template directory {} not found", dir.display());
                return Self::from_templates(Vec::new(), scales, preprocess);
            }
            Err(err) => return Err(err.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && crate::image::io::has_image_extension(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut templates: Vec<Template> = Vec::with_capacity(paths.len());
        for path in paths {
            match Template::load(&path) {
                Ok(tpl) => templates.push(tpl),
                Err(err) => {
                    trace_warn!("skipping template {}: {err}", path.display());
                }
            }
        }

        Self::from_templates(templates, scales, preprocess)
    }

    /// Builds a cache from in-memory templates.
    ///
    /// Templates are ordered by id; a repeated id keeps its first occurrence.
    pub fn from_templates(
        templates: Vec<Template>,
        scales: ScaleSet,
        preprocess: PreprocessOptions,
    ) -> BoardSightResult<Self> {
        preprocess.validate()?;
        let _span = trace_span!("cache_build", templates = templates.len()).entered();

        let mut templates = templates;
        templates.sort_by(|a, b| a.id().cmp(b.id()));

        let mut cached: Vec<CachedTemplate> = Vec::with_capacity(templates.len());
        for tpl in templates {
            if cached.last().is_some_and(|prev| prev.id() == tpl.id()) {
                trace_warn!("duplicate template id {}; keeping the first", tpl.id());
                continue;
            }
            let entry = CachedTemplate::build(tpl, &scales, &preprocess);
            if entry.variants.is_empty() {
                trace_warn!("template {} has no usable scale variant", entry.id);
            }
            cached.push(entry);
        }

        let variants: usize = cached.iter().map(|t| t.variants.len()).sum();
        trace_event!(
            "cache_built",
            templates = cached.len(),
            scales = scales.len(),
            variants = variants
        );

        Ok(Self {
            scales,
            preprocess,
            templates: cached,
        })
    }

    /// Returns the variant of `template_id` at `scale`, if retained.
    pub fn get(&self, template_id: &str, scale: f32) -> Option<&ScaleVariant> {
        self.template(template_id)?.variant(scale)
    }

    /// Returns the cached template with the given id.
    pub fn template(&self, template_id: &str) -> Option<&CachedTemplate> {
        self.templates
            .binary_search_by(|t| t.id.as_str().cmp(template_id))
            .ok()
            .map(|idx| &self.templates[idx])
    }

    /// Returns all templates in id order.
    pub fn templates(&self) -> &[CachedTemplate] {
        &self.templates
    }

    /// Iterates over template ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.templates.iter().map(|t| t.id.as_str())
    }

    /// Returns the number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true if the cache holds no templates.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Returns the total number of retained variants.
    pub fn variant_count(&self) -> usize {
        self.templates.iter().map(|t| t.variants.len()).sum()
    }

    /// Returns the scale factors the cache was built with.
    pub fn scales(&self) -> &ScaleSet {
        &self.scales
    }

    /// Returns the preprocessing options the cache was built with.
    pub fn preprocess(&self) -> &PreprocessOptions {
        &self.preprocess
    }
}
