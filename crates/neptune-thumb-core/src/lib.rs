//! G-code side of NeptuneThumb: scanning, metadata extraction, duration
//! formatting, the time-progress rewrite, and header splicing.
//!
//! The raster side (decode/annotate/encode) lives in `neptune-thumb-raster`;
//! this crate deals only in text.

pub mod duration;
pub mod error;
pub mod fields;
pub mod progress;
pub mod scanner;
pub mod splicer;

pub use duration::format_duration;
pub use error::{GcodeError, GcodeResult};
pub use progress::TimeProgressState;
pub use scanner::{GcodeScanner, ScanResult, ThumbnailFormat};
pub use splicer::{output_path_for, GcodeSplicer};
