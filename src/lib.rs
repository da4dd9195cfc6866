//! # NeptuneThumb
//!
//! Rewrites the header of a PrusaSlicer G-code file so Elegoo Neptune
//! printers show a preview thumbnail and live print-progress metadata:
//!
//! 1. **neptune-thumb-core** - scanning, metadata extraction, duration
//!    formatting, time-progress rewrite, header splicing
//! 2. **neptune-thumb-raster** - thumbnail decode/annotate, RGB565 wire
//!    encoders, ColPic compressor collaborator
//! 3. **neptune-thumb** - the `thumbnail` binary tying both together
//!
//! The whole pipeline is one synchronous pass per invocation: scan, decode,
//! resize, annotate, encode, splice, atomic replace. Any fatal error leaves
//! the input file untouched.

use std::path::PathBuf;

use anyhow::{Context, Result};
use image::RgbaImage;
use tracing::{debug, info, warn};

use neptune_thumb_core::{format_duration, GcodeScanner, GcodeSplicer, ScanResult};
use neptune_thumb_raster::{
    AnnotationText, ColPicLibrary, CompressedEncoder, EncodedThumbnail, EncoderKind, ImagePipeline,
    LegacyEncoder, Theme, ThumbnailRole,
};

/// Edge length of the large (`gimage`) preview.
const GIMAGE_EDGE: u32 = 200;
/// Edge length of the small (`simage`) preview.
const SIMAGE_EDGE: u32 = 160;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Everything one invocation needs, straight from the CLI.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// G-code file to rewrite in place.
    pub input_file: PathBuf,
    /// Use the uncompressed hex encoding older firmware expects.
    pub old_printer: bool,
    /// Exact `WxH` thumbnail size to select instead of "first >= 100x100".
    pub image_size: Option<String>,
    /// Render the duration as `DDd HH:MM` instead of `DDd HH:MM:SS`.
    pub short_duration_format: bool,
    /// Re-encode the annotated image into the embedded thumbnail block.
    pub update_original_image: bool,
    /// Annotate for a light image background.
    pub light_theme: bool,
    /// Persist intermediate images next to the input file.
    pub debug: bool,
}

/// Runs the whole pipeline for one G-code file.
pub fn run(options: &RunOptions) -> Result<()> {
    info!("input file: {}", options.input_file.display());
    match &options.image_size {
        None => info!("the first thumbnail larger than 100x100 will be used"),
        Some(size) => info!("will try to find thumbnail with specified size: {}", size),
    }
    if options.old_printer {
        info!("using older printer settings");
    }
    if options.short_duration_format {
        info!("using short print duration format");
    }

    let scanner = GcodeScanner::new(options.image_size.clone());
    let scan = scanner
        .scan_file(&options.input_file)
        .with_context(|| format!("failed to scan {}", options.input_file.display()))?;

    if !scan.has_thumbnail() {
        info!("thumbnail not found in g-code, nothing to do");
        return Ok(());
    }
    if let Some(cost) = scan.filament_cost {
        debug!("total filament cost: {}", cost);
    }

    let theme = if options.light_theme {
        Theme::Light
    } else {
        Theme::Dark
    };
    let mut pipeline = ImagePipeline::new(theme);
    if options.debug {
        let debug_dir = options
            .input_file
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        pipeline = pipeline.with_debug_dir(debug_dir);
    }

    let image = pipeline
        .decode(&scan.thumbnail_base64)
        .with_context(|| format!("failed to decode thumbnail from {}", options.input_file.display()))?;

    let texts = annotation_text(&scan, options.short_duration_format);
    let large = pipeline.annotate(&pipeline.resize(&image, GIMAGE_EDGE), &texts);
    let small = pipeline.annotate(&pipeline.resize(&image, SIMAGE_EDGE), &texts);
    if options.debug {
        pipeline.save_debug(&large, "gimage")?;
        pipeline.save_debug(&small, "simage")?;
    }

    let (gimage, simage) = encode_previews(options, &pipeline, &large, &small);

    // Best-effort re-embedding: a broken re-encode must not lose the run.
    let replacement = if options.update_original_image {
        let annotated = pipeline.annotate(&image, &texts);
        if options.debug {
            pipeline.save_debug(&annotated, "embedded")?;
        }
        match pipeline.encode_embedded(&annotated, scan.thumbnail_format) {
            Ok(block) => Some(block),
            Err(e) => {
                warn!("failed to re-encode embedded thumbnail, keeping original: {}", e);
                None
            }
        }
    } else {
        None
    };

    let splicer = GcodeSplicer::new(&scan);
    let header = splicer.build_header(&[gimage.wire_text.as_str(), simage.wire_text.as_str()]);
    splicer
        .splice(&options.input_file, &header, replacement.as_deref())
        .with_context(|| format!("failed to rewrite {}", options.input_file.display()))?;

    info!("g-code file modification completed");
    Ok(())
}

/// Encodes the two preview roles for the selected firmware generation.
/// Encoding failures degrade to empty blocks; the G-code itself is never
/// sacrificed for a preview.
fn encode_previews(
    options: &RunOptions,
    pipeline: &ImagePipeline,
    large: &RgbaImage,
    small: &RgbaImage,
) -> (EncodedThumbnail, EncodedThumbnail) {
    let large = pipeline.flatten(large);
    let small = pipeline.flatten(small);

    if options.old_printer {
        return (
            LegacyEncoder.encode(&large, ThumbnailRole::Gimage),
            LegacyEncoder.encode(&small, ThumbnailRole::Simage),
        );
    }

    let colpic = match ColPicLibrary::load() {
        Ok(lib) => lib,
        Err(e) => {
            warn!("{}; emitting empty preview blocks", e);
            return (
                empty_block(ThumbnailRole::Gimage),
                empty_block(ThumbnailRole::Simage),
            );
        }
    };
    let encoder = CompressedEncoder::new(&colpic);
    (
        encode_or_empty(&encoder, &large, ThumbnailRole::Gimage),
        encode_or_empty(&encoder, &small, ThumbnailRole::Simage),
    )
}

fn encode_or_empty(
    encoder: &CompressedEncoder<'_>,
    img: &RgbaImage,
    role: ThumbnailRole,
) -> EncodedThumbnail {
    match encoder.encode(img, role) {
        Ok(encoded) => encoded,
        Err(e) => {
            warn!("{} preview encoding failed: {}", role.prefix(), e);
            empty_block(role)
        }
    }
}

fn empty_block(role: ThumbnailRole) -> EncodedThumbnail {
    EncodedThumbnail {
        wire_text: String::new(),
        encoder: EncoderKind::Compressed,
        role,
    }
}

/// Formats the scanned metadata into the four annotation corners.
fn annotation_text(scan: &ScanResult, short_duration: bool) -> AnnotationText {
    AnnotationText {
        duration: scan
            .print_duration_raw
            .as_deref()
            .map(|raw| format_duration(raw, short_duration))
            .filter(|s| !s.is_empty()),
        max_height: (scan.max_z_mm > 0.0).then(|| format!("{}mm", scan.max_z_mm)),
        filament_weight: scan.filament_weight_g.map(|g| format!("{}g", g.round())),
        filament_length: scan
            .filament_length_mm
            .map(|mm| format!("{}m", (mm / 1000.0).round())),
    }
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output on stderr
/// - RUST_LOG environment variable support
/// - DEBUG default level when `--debug` is given, INFO otherwise
pub fn init_logging(debug: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = EnvFilter::from_default_env().add_directive(default_level.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_text_formatting() {
        let scan = ScanResult {
            print_duration_raw: Some("1d 2h 3m 4s".to_string()),
            filament_weight_g: Some(8.47),
            filament_length_mm: Some(2839.4),
            max_z_mm: 12.6,
            ..Default::default()
        };
        let texts = annotation_text(&scan, true);
        assert_eq!(texts.duration.as_deref(), Some("1d 02:03"));
        assert_eq!(texts.max_height.as_deref(), Some("12.6mm"));
        assert_eq!(texts.filament_weight.as_deref(), Some("8g"));
        assert_eq!(texts.filament_length.as_deref(), Some("3m"));
    }

    #[test]
    fn test_annotation_text_absent_fields() {
        let texts = annotation_text(&ScanResult::default(), false);
        assert!(texts.is_empty());
    }
}
