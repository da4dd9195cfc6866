//! Thumbnail raster pipeline: base64 decode, resize, annotation overlay,
//! flattening, and re-embedding as a slicer-style thumbnail block.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use rusttype::{point, Font, Scale};
use tracing::{debug, warn};

use neptune_thumb_core::ThumbnailFormat;

use crate::error::{RasterError, RasterResult};
use crate::font;

/// Base64 payload characters per `; `-prefixed line when re-embedding.
const EMBED_LINE_WIDTH: usize = 78;
/// Opacity of the annotation bands.
const BAND_ALPHA: f32 = 0.5;

/// The up-to-four annotation fields and their corners.
#[derive(Debug, Clone, Default)]
pub struct AnnotationText {
    /// Top-left: formatted print duration.
    pub duration: Option<String>,
    /// Top-right: maximum Z height.
    pub max_height: Option<String>,
    /// Bottom-left: filament weight.
    pub filament_weight: Option<String>,
    /// Bottom-right: filament length.
    pub filament_length: Option<String>,
}

impl AnnotationText {
    pub fn is_empty(&self) -> bool {
        self.duration.is_none()
            && self.max_height.is_none()
            && self.filament_weight.is_none()
            && self.filament_length.is_none()
    }

    fn top_used(&self) -> bool {
        self.duration.is_some() || self.max_height.is_some()
    }

    fn bottom_used(&self) -> bool {
        self.filament_weight.is_some() || self.filament_length.is_some()
    }
}

/// Annotation color scheme, chosen by the source image's background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    /// Dimming band, white text.
    #[default]
    Dark,
    /// Lightening band, black text.
    Light,
}

impl Theme {
    fn band_color(self) -> [u8; 3] {
        match self {
            Theme::Dark => [0, 0, 0],
            Theme::Light => [255, 255, 255],
        }
    }

    fn text_color(self) -> [u8; 3] {
        match self {
            Theme::Dark => [255, 255, 255],
            Theme::Light => [0, 0, 0],
        }
    }

    fn background(self) -> [u8; 3] {
        match self {
            Theme::Dark => [0, 0, 0],
            Theme::Light => [255, 255, 255],
        }
    }
}

/// Thin wrapper over the `image` crate; owns theme and debug settings for
/// the duration of one run.
pub struct ImagePipeline {
    theme: Theme,
    debug_dir: Option<PathBuf>,
}

impl ImagePipeline {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            debug_dir: None,
        }
    }

    /// Persist intermediate rasters into `dir` (debug mode).
    pub fn with_debug_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.debug_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Decodes accumulated base64 text into an RGBA raster.
    pub fn decode(&self, text: &str) -> RasterResult<RgbaImage> {
        if text.is_empty() {
            return Err(RasterError::EmptyPayload);
        }
        debug!("decoding thumbnail from base64 ({} chars)", text.len());

        let cleaned: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = BASE64.decode(cleaned.as_bytes())?;
        let img = image::load_from_memory(&bytes)?;
        Ok(img.to_rgba8())
    }

    /// Aspect-preserving fit into a `target_edge` square. A same-size call
    /// still returns an independent raster, never an alias of the input.
    pub fn resize(&self, img: &RgbaImage, target_edge: u32) -> RgbaImage {
        let (width, height) = img.dimensions();
        let (new_width, new_height) = fit_dimensions(width, height, target_edge);
        if (new_width, new_height) == (width, height) {
            return img.clone();
        }
        debug!(
            "scaling image from {}x{} to {}x{}",
            width, height, new_width, new_height
        );
        imageops::resize(img, new_width, new_height, FilterType::Triangle)
    }

    /// Draws the annotation fields onto translucent bands across the top and
    /// bottom strips of the raster. With no fields set (or no usable system
    /// font) the input is returned unchanged.
    pub fn annotate(&self, img: &RgbaImage, texts: &AnnotationText) -> RgbaImage {
        if texts.is_empty() {
            return img.clone();
        }
        let Some(font) = font::system_font() else {
            warn!("no usable system font found, skipping image annotation");
            return img.clone();
        };

        let mut out = img.clone();
        let (width, height) = out.dimensions();
        let font_size = height / 14;
        if font_size == 0 {
            return out;
        }
        debug!("adding texts to {}x{} image", width, height);

        let band_height = font_size + font_size / 4;
        if texts.top_used() {
            self.draw_band(&mut out, 0, band_height);
        }
        if texts.bottom_used() {
            self.draw_band(&mut out, height.saturating_sub(band_height), height);
        }

        let scale = Scale::uniform(font_size as f32);
        let v_metrics = font.v_metrics(scale);
        let margin = (font_size / 4) as f32;
        let top_baseline = v_metrics.ascent + (band_height as f32 - font_size as f32) / 2.0;
        let bottom_baseline = height as f32 - (font_size as f32) / 3.0;

        if let Some(text) = &texts.duration {
            self.draw_text(&mut out, font, scale, margin, top_baseline, text);
        }
        if let Some(text) = &texts.max_height {
            let x = width as f32 - margin - text_width(font, scale, text);
            self.draw_text(&mut out, font, scale, x, top_baseline, text);
        }
        if let Some(text) = &texts.filament_weight {
            self.draw_text(&mut out, font, scale, margin, bottom_baseline, text);
        }
        if let Some(text) = &texts.filament_length {
            let x = width as f32 - margin - text_width(font, scale, text);
            self.draw_text(&mut out, font, scale, x, bottom_baseline, text);
        }

        out
    }

    /// Composites the raster over an opaque background. RGB565 has no alpha
    /// channel, so this has to happen before encoding.
    pub fn flatten(&self, img: &RgbaImage) -> RgbaImage {
        let bg = self.theme.background();
        let mut out = img.clone();
        for px in out.pixels_mut() {
            let alpha = px[3] as f32 / 255.0;
            let inv = 1.0 - alpha;
            for c in 0..3 {
                px[c] = (px[c] as f32 * alpha + bg[c] as f32 * inv).round() as u8;
            }
            px[3] = 255;
        }
        out
    }

    /// Re-encodes a raster as a slicer-style embedded thumbnail block
    /// (`; thumbnail[_JPG] begin WxH <len>` ... `end`), newline-terminated.
    pub fn encode_embedded(
        &self,
        img: &RgbaImage,
        format: ThumbnailFormat,
    ) -> RasterResult<String> {
        let mut bytes = Vec::new();
        match format {
            ThumbnailFormat::Png => {
                img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
            }
            ThumbnailFormat::Jpg => {
                // JPEG has no alpha channel.
                let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
                rgb.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)?;
            }
        }
        let payload = BASE64.encode(&bytes);

        let (width, height) = img.dimensions();
        let suffix = format.marker_suffix();
        let mut block = format!(
            "; thumbnail{} begin {}x{} {}\n",
            suffix,
            width,
            height,
            payload.len()
        );
        for chunk in payload.as_bytes().chunks(EMBED_LINE_WIDTH) {
            block.push_str("; ");
            // Chunks of an ASCII string are valid UTF-8.
            block.push_str(std::str::from_utf8(chunk).unwrap_or_default());
            block.push('\n');
        }
        block.push_str(&format!("; thumbnail{} end\n", suffix));
        Ok(block)
    }

    /// Saves an intermediate raster when a debug directory is configured.
    pub fn save_debug(&self, img: &RgbaImage, label: &str) -> RasterResult<()> {
        if let Some(dir) = &self.debug_dir {
            let (width, height) = img.dimensions();
            let path = dir.join(format!("img-{}x{}-{}.png", width, height, label));
            debug!("saving intermediate image to {}", path.display());
            img.save(&path)?;
        }
        Ok(())
    }

    fn draw_band(&self, img: &mut RgbaImage, from_row: u32, to_row: u32) {
        let color = self.theme.band_color();
        let (width, height) = img.dimensions();
        for y in from_row..to_row.min(height) {
            for x in 0..width {
                blend(img.get_pixel_mut(x, y), color, BAND_ALPHA);
            }
        }
    }

    fn draw_text(
        &self,
        img: &mut RgbaImage,
        font: &Font<'_>,
        scale: Scale,
        x: f32,
        baseline: f32,
        text: &str,
    ) {
        let color = self.theme.text_color();
        let (width, height) = img.dimensions();
        for glyph in font.layout(text, scale, point(x.max(0.0), baseline)) {
            if let Some(bounding_box) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, coverage| {
                    let px = gx as i32 + bounding_box.min.x;
                    let py = gy as i32 + bounding_box.min.y;
                    if px >= 0 && px < width as i32 && py >= 0 && py < height as i32 {
                        blend(img.get_pixel_mut(px as u32, py as u32), color, coverage);
                    }
                });
            }
        }
    }
}

/// Scales `width x height` to fit a `target_edge` square, preserving aspect.
fn fit_dimensions(width: u32, height: u32, target_edge: u32) -> (u32, u32) {
    let scale = target_edge as f64 / width.max(height).max(1) as f64;
    let new_width = ((width as f64 * scale).round() as u32).max(1);
    let new_height = ((height as f64 * scale).round() as u32).max(1);
    (new_width, new_height)
}

/// Advance width of `text` at `scale`, for the right-aligned corners.
fn text_width(font: &Font<'_>, scale: Scale, text: &str) -> f32 {
    font.layout(text, scale, point(0.0, 0.0))
        .map(|glyph| glyph.unpositioned().h_metrics().advance_width)
        .sum()
}

fn blend(dst: &mut Rgba<u8>, color: [u8; 3], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    let inv = 1.0 - alpha;
    for c in 0..3 {
        dst[c] = (color[c] as f32 * alpha + dst[c] as f32 * inv).round() as u8;
    }
    let dst_alpha = dst[3] as f32 / 255.0;
    dst[3] = ((alpha + dst_alpha * inv) * 255.0).round() as u8;
}
