//! Output assembly: replacement header, body copy, atomic replace.
//!
//! The splicer writes the generated header, streams the original file
//! through byte-identical (minus the original header line and, when
//! re-embedding, the original thumbnail block), applies the time-progress
//! rewrite, and lands on a sibling temporary file that atomically replaces
//! the input.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{GcodeError, GcodeResult};
use crate::progress::TimeProgressState;
use crate::scanner::ScanResult;

/// Slicer name firmware allow-lists key on.
const VENDOR_NAME: &str = "PrusaSlicer";
/// Substitution that defeats the allow-list without losing the version info.
const VENDOR_MASK: &str = "Prusa-Slicer";
const CURA_MARKER: &str = "; Cura_SteamEngine X.X to trick printer into thinking this is Cura";
const GENERATED_MARKER: &str = "; Thumbnail Generated by NeptuneThumb";

/// Assembles the new file around a [`ScanResult`].
pub struct GcodeSplicer<'a> {
    scan: &'a ScanResult,
}

impl<'a> GcodeSplicer<'a> {
    pub fn new(scan: &'a ScanResult) -> Self {
        Self { scan }
    }

    /// Builds the replacement header block: the vendor-masked original
    /// header line, the Cura identity marker, the encoded thumbnail blocks
    /// (gimage before simage), and the generated-by marker. The injected
    /// region uses `\r` separators, which is what the firmware parser eats.
    pub fn build_header(&self, encoded: &[&str]) -> String {
        let mut header = self.scan.header_text.replace(VENDOR_NAME, VENDOR_MASK);
        header.push('\n');
        header.push('\r');
        header.push_str(CURA_MARKER);
        header.push('\r');
        for block in encoded {
            header.push_str(block);
        }
        header.push('\r');
        header.push_str(GENERATED_MARKER);
        header.push_str("\r\r");
        header
    }

    /// Streams the original file into `<input>.output` with the new header
    /// prepended, then atomically replaces the input.
    ///
    /// With `replacement_block` set the original thumbnail block lines are
    /// dropped and the block is written in their place (re-embedding).
    /// On any failure the original is untouched; an orphaned `.output` file
    /// is left behind for inspection rather than deleted.
    pub fn splice(
        &self,
        path: &Path,
        header: &str,
        replacement_block: Option<&str>,
    ) -> GcodeResult<()> {
        let output_path = output_path_for(path);
        debug!("writing new header and body into {}", output_path.display());
        {
            let mut reader = BufReader::new(File::open(path)?);
            let mut writer = BufWriter::new(File::create(&output_path)?);
            writer.write_all(header.as_bytes())?;
            self.copy_body(&mut reader, &mut writer, replacement_block)?;
            writer.flush()?;
        }
        commit(&output_path, path)
    }

    fn copy_body<R: BufRead, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        replacement_block: Option<&str>,
    ) -> GcodeResult<()> {
        let block_range = match (
            replacement_block,
            self.scan.thumbnail_begin_line,
            self.scan.thumbnail_end_line,
        ) {
            (Some(_), Some(begin), Some(end)) => Some((begin, end)),
            _ => None,
        };

        let mut progress = TimeProgressState::new();
        let mut raw = Vec::new();
        let mut index = 0usize;
        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw)? == 0 {
                break;
            }

            if Some(index) == self.scan.header_line {
                index += 1;
                continue;
            }
            if let Some((begin, end)) = block_range {
                if index >= begin && index <= end {
                    if index == begin {
                        if let Some(block) = replacement_block {
                            writer.write_all(block.as_bytes())?;
                        }
                    }
                    index += 1;
                    continue;
                }
            }

            let text = String::from_utf8_lossy(&raw);
            if let Some(extra) = progress.rewrite(text.trim_end_matches(['\r', '\n'])) {
                writer.write_all(extra.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            writer.write_all(&raw)?;
            index += 1;
        }
        Ok(())
    }
}

/// Replaces `path` with the fully staged `output_path`. Refuses to touch the
/// original when the staged file is missing.
fn commit(output_path: &Path, path: &Path) -> GcodeResult<()> {
    if !output_path.is_file() {
        return Err(GcodeError::OutputWriteIncomplete {
            path: output_path.to_path_buf(),
        });
    }
    debug!("renaming {} over {}", output_path.display(), path.display());
    fs::rename(output_path, path)?;
    Ok(())
}

/// Sibling temporary path the output is staged on before the rename.
pub fn output_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".output");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_header_masks_vendor_name() {
        let scan = ScanResult {
            header_text: "; generated by PrusaSlicer 2.7.0 on 2024-01-01".to_string(),
            ..Default::default()
        };
        let splicer = GcodeSplicer::new(&scan);
        let header = splicer.build_header(&[";gimage:abc\r", ";simage:def\r"]);

        assert!(header.starts_with("; generated by Prusa-Slicer 2.7.0"));
        assert!(!header.contains("PrusaSlicer"));
        assert!(header.contains(CURA_MARKER));
        assert!(header.contains(";gimage:abc"));
        assert!(header.contains(";simage:def"));
        assert!(header.ends_with("; Thumbnail Generated by NeptuneThumb\r\r"));
    }

    #[test]
    fn test_gimage_precedes_simage() {
        let scan = ScanResult::default();
        let splicer = GcodeSplicer::new(&scan);
        let header = splicer.build_header(&[";gimage:abc\r", ";simage:def\r"]);
        assert!(header.find(";gimage:").unwrap() < header.find(";simage:").unwrap());
    }

    #[test]
    fn test_output_path_is_sibling() {
        let out = output_path_for(Path::new("/tmp/part.gcode"));
        assert_eq!(out, PathBuf::from("/tmp/part.gcode.output"));
    }

    #[test]
    fn test_commit_refuses_when_staged_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.gcode");
        fs::write(&path, "G1 X1 Y1\n").unwrap();

        // The staged file vanished between write and commit.
        let output_path = output_path_for(&path);
        let err = commit(&output_path, &path).unwrap_err();
        assert!(matches!(err, GcodeError::OutputWriteIncomplete { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "G1 X1 Y1\n");
    }

    #[test]
    fn test_commit_renames_staged_file_over_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.gcode");
        fs::write(&path, "old\n").unwrap();
        let output_path = output_path_for(&path);
        fs::write(&output_path, "new\n").unwrap();

        commit(&output_path, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        assert!(!output_path.exists());
    }
}
