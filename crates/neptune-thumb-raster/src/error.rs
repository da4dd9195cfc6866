//! Error types for thumbnail decoding and encoding.

use std::io;
use thiserror::Error;

/// Errors that can occur on the raster side of the pipeline.
#[derive(Error, Debug)]
pub enum RasterError {
    /// The accumulated thumbnail base64 text was empty.
    #[error("thumbnail payload is empty")]
    EmptyPayload,

    /// The thumbnail payload is not valid base64.
    #[error("invalid base64 thumbnail payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes are not a readable image.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The color-stream compressor reported a failure. Non-fatal at the
    /// pipeline level: the run degrades to an empty encoded block.
    #[error("thumbnail encoding failed, compressor returned status {status}")]
    EncodingFailed { status: i32 },

    /// The ColPic shared library could not be loaded or is missing symbols.
    #[error("ColPic library unavailable: {0}")]
    CompressorUnavailable(String),

    /// I/O error while persisting debug images.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for raster operations.
pub type RasterResult<T> = Result<T, RasterError>;
