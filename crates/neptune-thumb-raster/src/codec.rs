//! RGB565 packing and the two printer wire formats.
//!
//! Both firmware generations take the preview as RGB565 samples wrapped in
//! G-code comment lines. Older printers (Neptune 2 era) read plain hex with
//! a per-row `M10086 ;` sentinel; newer ones read the output of the vendor
//! ColPic color-stream compressor reframed into fixed-width `;gimage:` /
//! `;simage:` lines.

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::error::{RasterError, RasterResult};

/// Payload characters per wire line, prefix and terminator accounted for.
const EACH_MAX: usize = 1024 - 8 - 1;
/// Row sentinel older firmware needs to rate-limit its line buffering.
const ROW_SENTINEL: &str = "\rM10086 ;";
/// Color palette cap the ColPic delegate is called with.
pub const MAX_COLORS: u32 = 1024;

/// Which encoder produced a wire text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderKind {
    Legacy,
    Compressed,
}

/// Which firmware slot the encoded preview fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailRole {
    /// Large preview shown on the print-details screen.
    Gimage,
    /// Small preview shown in the file list.
    Simage,
}

impl ThumbnailRole {
    /// Comment prefix the firmware keys on.
    pub fn prefix(self) -> &'static str {
        match self {
            ThumbnailRole::Gimage => ";gimage:",
            ThumbnailRole::Simage => ";simage:",
        }
    }
}

/// An encoded preview, immutable once produced.
#[derive(Debug, Clone)]
pub struct EncodedThumbnail {
    pub wire_text: String,
    pub encoder: EncoderKind,
    pub role: ThumbnailRole,
}

/// Packs an RGBA sample into RGB565 (`r<<11 | g<<5 | b`). Alpha is
/// discarded; compositing onto an opaque background has to happen first.
pub fn rgb565(pixel: &Rgba<u8>) -> u16 {
    let r = (pixel[0] >> 3) as u16;
    let g = (pixel[1] >> 2) as u16;
    let b = (pixel[2] >> 3) as u16;
    (r << 11) | (g << 5) | b
}

/// Packs a whole raster into RGB565 samples, row-major.
pub fn pack_rgb565(img: &RgbaImage) -> Vec<u16> {
    img.pixels().map(rgb565).collect()
}

/// Encoder for older printer firmware: raw byte-swapped hex with row
/// sentinels, no compression.
pub struct LegacyEncoder;

impl LegacyEncoder {
    /// Serializes each pixel as four lowercase hex digits, low byte pair
    /// first to match firmware endianness, one `M10086 ;` sentinel per row
    /// and a trailing line break after the last row.
    pub fn encode(&self, img: &RgbaImage, role: ThumbnailRole) -> EncodedThumbnail {
        let (width, height) = img.dimensions();
        debug!("encoding {}x{} image for old printers ({})", width, height, role.prefix());

        let mut wire_text = String::with_capacity((width * height * 4) as usize);
        wire_text.push_str(role.prefix());
        for row in 0..height {
            for col in 0..width {
                let hex = format!("{:04x}", rgb565(img.get_pixel(col, row)));
                wire_text.push_str(&hex[2..4]);
                wire_text.push_str(&hex[0..2]);
            }
            wire_text.push_str(ROW_SENTINEL);
            if row == height - 1 {
                wire_text.push('\r');
            }
        }

        EncodedThumbnail {
            wire_text,
            encoder: EncoderKind::Legacy,
            role,
        }
    }
}

/// External color-stream compressor the new-format encoder delegates to.
///
/// Returns the encoded bytes and a status; status <= 0 signals failure.
/// Production uses the vendor ColPic shared library, tests substitute fakes.
pub trait ColorStreamCompressor {
    fn encode(&self, pixels: &[u16], width: u32, height: u32, max_colors: u32) -> (Vec<u8>, i32);
}

/// Encoder for newer printer firmware, delegating the heavy lifting to a
/// [`ColorStreamCompressor`].
pub struct CompressedEncoder<'a> {
    compressor: &'a dyn ColorStreamCompressor,
}

impl<'a> CompressedEncoder<'a> {
    pub fn new(compressor: &'a dyn ColorStreamCompressor) -> Self {
        Self { compressor }
    }

    /// Compresses the raster and reframes the result as firmware comment
    /// lines: fixed-width lines of [`EACH_MAX`] payload characters, the tail
    /// line padded with `'0'` so every physical line has uniform length.
    ///
    /// Returns [`RasterError::EncodingFailed`] when the delegate reports
    /// zero or negative bytes encoded; callers are expected to degrade to an
    /// empty block rather than abort the run.
    pub fn encode(&self, img: &RgbaImage, role: ThumbnailRole) -> RasterResult<EncodedThumbnail> {
        let (width, height) = img.dimensions();
        debug!("encoding {}x{} image for new printers ({})", width, height, role.prefix());

        let pixels = pack_rgb565(img);
        let (encoded, status) = self.compressor.encode(&pixels, width, height, MAX_COLORS);
        if status <= 0 {
            return Err(RasterError::EncodingFailed { status });
        }

        // The delegate writes into a fixed-size buffer; the 0x00 padding it
        // leaves behind is not payload. Assumes the encoding never emits a
        // meaningful zero byte, which matches the vendor text format.
        let data: String = encoded
            .into_iter()
            .filter(|&b| b != 0)
            .map(char::from)
            .collect();

        let prefix = role.prefix();
        let maxline = data.len() / EACH_MAX;
        let appendlen = (EACH_MAX - 3).saturating_sub(data.len() % EACH_MAX);

        let mut wire_text = String::with_capacity(data.len() + data.len() / EACH_MAX * 10 + 16);
        for (i, ch) in data.chars().enumerate() {
            if i == maxline * EACH_MAX {
                wire_text.push_str("\r;");
                wire_text.push_str(prefix);
            } else if i == 0 {
                wire_text.push_str(prefix);
            } else if i % EACH_MAX == 0 {
                wire_text.push('\r');
                wire_text.push_str(prefix);
            }
            wire_text.push(ch);
        }
        wire_text.push_str("\r;");
        for _ in 0..appendlen {
            wire_text.push('0');
        }
        wire_text.push('\r');

        Ok(EncodedThumbnail {
            wire_text,
            encoder: EncoderKind::Compressed,
            role,
        })
    }
}
