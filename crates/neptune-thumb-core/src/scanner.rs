//! Single-pass G-code scanner.
//!
//! Walks the input file once, collecting slicer metadata fields and the
//! base64 payload of the embedded thumbnail block. Line patterns follow
//! PrusaSlicer output: metadata is `;`-prefixed `key = value` comments,
//! thumbnails are `; thumbnail[_JPG] begin WxH <len>` ... `; thumbnail[_JPG]
//! end` blocks with `; <base64-chunk>` body lines.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{GcodeError, GcodeResult};
use crate::fields::{extract_number, extract_value};

const HEADER_MARKER: &str = "; generated by ";
const DURATION_MARKER: &str = "; estimated printing time (normal mode) =";
const WEIGHT_MARKER: &str = "; total filament used [g] =";
const LENGTH_MARKER: &str = "; filament used [mm] =";
const COST_MARKER: &str = "; total filament cost =";
const MAX_Z_MARKER: &str = ";Z:";
const THUMBNAIL_MARKER: &str = "; thumbnail";
const JPG_TAG: &str = "thumbnail_JPG";

/// Raster format of the embedded thumbnail block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailFormat {
    #[default]
    Png,
    Jpg,
}

impl ThumbnailFormat {
    /// Marker suffix distinguishing JPG blocks (`; thumbnail_JPG begin/end`).
    pub fn marker_suffix(self) -> &'static str {
        match self {
            ThumbnailFormat::Png => "",
            ThumbnailFormat::Jpg => "_JPG",
        }
    }
}

/// Everything the scanner collects in one pass over the file.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// The `; generated by ...` header line, without its line terminator.
    pub header_text: String,
    /// Zero-based line index of the header line.
    pub header_line: Option<usize>,
    /// Estimated print duration, verbatim (e.g. `1h 32m 12s`).
    pub print_duration_raw: Option<String>,
    /// Total filament used in grams.
    pub filament_weight_g: Option<f64>,
    /// Filament used in millimeters.
    pub filament_length_mm: Option<f64>,
    /// Total filament cost.
    pub filament_cost: Option<f64>,
    /// Running maximum over all `;Z:` markers.
    pub max_z_mm: f64,
    /// Format of the selected thumbnail block.
    pub thumbnail_format: ThumbnailFormat,
    /// Declared size of the selected block.
    pub thumbnail_size: Option<(u32, u32)>,
    /// The exact `WxH` token from the begin marker.
    pub thumbnail_size_token: Option<String>,
    /// Zero-based line index of the begin marker.
    pub thumbnail_begin_line: Option<usize>,
    /// Zero-based line index of the end marker. Set only after the begin line.
    pub thumbnail_end_line: Option<usize>,
    /// Accumulated base64 payload, comment prefixes stripped.
    pub thumbnail_base64: String,
}

impl ScanResult {
    /// Whether a complete thumbnail block was found.
    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail_end_line.is_some() && !self.thumbnail_base64.is_empty()
    }
}

fn size_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)x(\d+)").unwrap())
}

/// Single forward-pass scanner over a G-code file.
pub struct GcodeScanner {
    requested_size: Option<String>,
}

impl GcodeScanner {
    /// Creates a scanner. With `requested_size` set (a `WxH` token), only the
    /// thumbnail block declaring exactly that size is selected and its
    /// absence is an error; otherwise the first block at least 100x100 wins
    /// and absence is not an error.
    pub fn new(requested_size: Option<String>) -> Self {
        Self { requested_size }
    }

    /// Scans a file from disk.
    pub fn scan_file(&self, path: &Path) -> GcodeResult<ScanResult> {
        let reader = BufReader::new(File::open(path)?);
        self.scan(reader, path)
    }

    /// Scans any line source. `path` is used for error context only.
    pub fn scan<R: BufRead>(&self, reader: R, path: &Path) -> GcodeResult<ScanResult> {
        let mut result = ScanResult::default();
        // WxH token of the block being matched against; starts as the
        // requested size and is locked in when a block is auto-selected.
        let mut wanted_size = self.requested_size.clone();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;

            if line.contains(HEADER_MARKER) {
                result.header_text = line.clone();
                result.header_line = Some(index);
                debug!("slicer header found at line {}", index);
            } else if line.contains(DURATION_MARKER) {
                result.print_duration_raw = extract_value(&line).map(str::to_string);
                debug!(
                    "print duration {:?} found at line {}",
                    result.print_duration_raw, index
                );
            } else if line.contains(WEIGHT_MARKER) {
                result.filament_weight_g = extract_number(&line);
                debug!(
                    "filament used [g] {:?} found at line {}",
                    result.filament_weight_g, index
                );
            } else if line.contains(LENGTH_MARKER) {
                result.filament_length_mm = extract_number(&line);
                debug!(
                    "filament used [mm] {:?} found at line {}",
                    result.filament_length_mm, index
                );
            } else if line.contains(COST_MARKER) {
                result.filament_cost = extract_number(&line);
                debug!("filament cost {:?} found at line {}", result.filament_cost, index);
            } else if line.starts_with(MAX_Z_MARKER) {
                if let Some(z) = extract_number(&line) {
                    if z > result.max_z_mm {
                        result.max_z_mm = z;
                    }
                }
            } else if result.thumbnail_begin_line.is_none()
                && line.contains(THUMBNAIL_MARKER)
                && line.contains(" begin")
            {
                if let Some((width, height, token)) = self.match_begin(&line, &wanted_size) {
                    wanted_size = Some(token.clone());
                    result.thumbnail_size = Some((width, height));
                    result.thumbnail_size_token = Some(token);
                    result.thumbnail_begin_line = Some(index);
                    if line.contains(JPG_TAG) {
                        result.thumbnail_format = ThumbnailFormat::Jpg;
                    }
                    debug!(
                        "{:?} thumbnail begin found at line {}",
                        result.thumbnail_format, index
                    );
                }
            } else if result.thumbnail_begin_line.is_some()
                && result.thumbnail_end_line.is_none()
                && line.contains(&format!(
                    "; thumbnail{} end",
                    result.thumbnail_format.marker_suffix()
                ))
            {
                result.thumbnail_end_line = Some(index);
                debug!(
                    "{:?} thumbnail end found at line {}",
                    result.thumbnail_format, index
                );
            } else if result.thumbnail_begin_line.is_some() && result.thumbnail_end_line.is_none() {
                result.thumbnail_base64.push_str(line.trim_matches([';', ' ']));
            }

            // Early exit once everything is collected. With an explicitly
            // requested size the whole file is examined instead.
            if self.requested_size.is_none()
                && result.print_duration_raw.is_some()
                && result.filament_weight_g.is_some()
                && result.thumbnail_begin_line.is_some()
                && result.thumbnail_end_line.is_some()
            {
                return Ok(result);
            }
        }

        if result.thumbnail_begin_line.is_none() {
            if let Some(size) = &self.requested_size {
                return Err(GcodeError::ThumbnailBeginNotFound {
                    path: path.to_path_buf(),
                    size: size.clone(),
                });
            }
        } else if result.thumbnail_end_line.is_none() {
            return Err(GcodeError::ThumbnailEndNotFound {
                path: path.to_path_buf(),
            });
        }

        Ok(result)
    }

    /// Decides whether a begin-marker line selects a block, returning its
    /// dimensions and exact `WxH` token.
    fn match_begin(&self, line: &str, wanted: &Option<String>) -> Option<(u32, u32, String)> {
        match wanted {
            None => {
                let caps = size_regex().captures(line)?;
                let width: u32 = caps[1].parse().ok()?;
                let height: u32 = caps[2].parse().ok()?;
                if width >= 100 && height >= 100 {
                    Some((width, height, caps[0].to_string()))
                } else {
                    None
                }
            }
            Some(size) => {
                // The token must stand alone, surrounded by whitespace.
                if !line.contains(&format!(" {} ", size)) {
                    return None;
                }
                let (w, h) = size.split_once('x')?;
                Some((w.parse().ok()?, h.parse().ok()?, size.clone()))
            }
        }
    }
}
