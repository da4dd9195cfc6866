//! Error types for G-code scanning and splicing.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while scanning or rewriting a G-code file.
#[derive(Error, Debug)]
pub enum GcodeError {
    /// A thumbnail of the requested size was asked for but no matching
    /// begin marker exists in the file.
    #[error("thumbnail begin marker for size {size} not found in {}", path.display())]
    ThumbnailBeginNotFound { path: PathBuf, size: String },

    /// A thumbnail begin marker was matched but its end marker never appeared.
    #[error("thumbnail end marker not found in {}", path.display())]
    ThumbnailEndNotFound { path: PathBuf },

    /// The temporary output file was missing after the write phase; the
    /// original file has not been modified.
    #[error("output file {} does not exist after write, original left untouched", path.display())]
    OutputWriteIncomplete { path: PathBuf },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for G-code operations.
pub type GcodeResult<T> = Result<T, GcodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GcodeError::ThumbnailBeginNotFound {
            path: PathBuf::from("part.gcode"),
            size: "200x200".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "thumbnail begin marker for size 200x200 not found in part.gcode"
        );

        let err = GcodeError::ThumbnailEndNotFound {
            path: PathBuf::from("part.gcode"),
        };
        assert_eq!(err.to_string(), "thumbnail end marker not found in part.gcode");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: GcodeError = io_err.into();
        assert!(matches!(err, GcodeError::Io(_)));
    }
}
