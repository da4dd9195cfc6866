//! Raster side of NeptuneThumb: thumbnail decode/annotate (via the `image`
//! crate) and the two proprietary RGB565 wire encodings the Neptune printer
//! firmware generations understand.

pub mod codec;
pub mod colpic;
pub mod error;
pub mod font;
pub mod pipeline;

pub use codec::{
    pack_rgb565, rgb565, ColorStreamCompressor, CompressedEncoder, EncodedThumbnail, EncoderKind,
    LegacyEncoder, ThumbnailRole,
};
pub use colpic::ColPicLibrary;
pub use error::{RasterError, RasterResult};
pub use pipeline::{AnnotationText, ImagePipeline, Theme};
