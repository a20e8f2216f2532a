//! Label font.

use crate::PanoramaError;
use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use imageproc::drawing;

static DEJAVU_SANS: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// The embedded sans-serif face at one pixel size.
#[derive(Debug, Clone)]
pub struct LabelFont {
    font: FontRef<'static>,
    scale: PxScale,
}

impl LabelFont {
    pub fn new(size_px: f32) -> Result<Self, PanoramaError> {
        if !(size_px.is_finite() && size_px > 0.0) {
            return Err(PanoramaError::Config(format!("font size {size_px} is not positive")));
        }
        Ok(Self {
            font: FontRef::try_from_slice(DEJAVU_SANS)?,
            scale: PxScale::from(size_px),
        })
    }

    pub fn font(&self) -> &FontRef<'static> {
        &self.font
    }

    pub fn scale(&self) -> PxScale {
        self.scale
    }

    /// Ascender to descender, pixels.
    pub fn line_height(&self) -> u32 {
        let scaled = self.font.as_scaled(self.scale);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let height = (scaled.ascent() - scaled.descent()).ceil().max(0.0) as u32;
        height
    }

    /// Width and height of the box `text` is drawn in, pixels. Every
    /// glyph stays inside it, descenders included.
    pub fn text_size(&self, text: &str) -> (u32, u32) {
        let (width, _) = drawing::text_size(self.scale, &self.font, text);
        (width, self.line_height())
    }
}
