//! Named templates, plans and masks.

use crate::image::color::{ColorImage, ColorView};
use crate::image::{ImageView, OwnedImage};
use crate::util::BoardSightResult;

mod mask;
mod plan;

pub use mask::MaskRect;
pub use plan::{ColorTemplatePlan, MaskedTemplatePlan, TemplatePlan};

/// Named template image: grayscale, plus colour planes when the source had
/// them.
#[derive(Clone, Debug)]
pub struct Template {
    id: String,
    img: OwnedImage,
    color: Option<ColorImage>,
}

impl Template {
    /// Creates a template from a contiguous grayscale buffer.
    pub fn new(
        id: impl Into<String>,
        data: Vec<u8>,
        width: usize,
        height: usize,
    ) -> BoardSightResult<Self> {
        let img = OwnedImage::new(data, width, height)?;
        Ok(Self::from_image(id, img))
    }

    /// Wraps an already decoded grayscale image.
    pub fn from_image(id: impl Into<String>, img: OwnedImage) -> Self {
        Self {
            id: id.into(),
            img,
            color: None,
        }
    }

    /// Wraps colour planes; the grayscale image is their luma.
    pub fn from_color(id: impl Into<String>, color: ColorImage) -> Self {
        Self {
            id: id.into(),
            img: color.view().to_gray(),
            color: Some(color),
        }
    }

    /// Loads a template from disk; the file stem becomes its id.
    #[cfg(feature = "image-io")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> BoardSightResult<Self> {
        let path = path.as_ref();
        let id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let color = crate::image::io::load_color_image(path)?;
        Ok(Self::from_color(id, color))
    }

    /// Returns the template id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.img.width()
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.img.height()
    }

    /// Returns a borrowed view of the grayscale data.
    pub fn view(&self) -> ImageView<'_, u8> {
        self.img.view()
    }

    /// Returns the colour planes, if the template was built from colour data.
    pub fn color_view(&self) -> Option<ColorView<'_>> {
        self.color.as_ref().map(ColorImage::view)
    }
}
