use std::fs;

use neptune_thumb_core::splicer::output_path_for;
use neptune_thumb_core::{GcodeScanner, GcodeSplicer};

const INPUT: &str = "\
; thumbnail begin 200x200 24\n\
; aGVsbG8g\n\
; d29ybGQ=\n\
; thumbnail end\n\
; generated by PrusaSlicer 2.7.0 on 2024-01-01\n\
; estimated printing time (normal mode) = 1h 2m\n\
; total filament used [g] = 8.47\n\
M73 P10 R50\n\
G1 X1 Y1 E0.5\n\
M73 P20 R40\n\
;LAYER_CHANGE\n\
;Z:0.4\n\
G1 X2 Y2 E1.0\n";

fn run_splice(replacement: Option<&str>) -> String {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("part.gcode");
    fs::write(&path, INPUT).unwrap();

    let scan = GcodeScanner::new(None).scan_file(&path).unwrap();
    let splicer = GcodeSplicer::new(&scan);
    let header = splicer.build_header(&[";gimage:AA\r", ";simage:BB\r"]);
    splicer.splice(&path, &header, replacement).unwrap();

    assert!(!output_path_for(&path).exists(), "temp file should be renamed away");
    fs::read_to_string(&path).unwrap()
}

#[test]
fn test_splice_rewrites_header_in_place() {
    let result = run_splice(None);

    assert!(result.starts_with("; generated by Prusa-Slicer 2.7.0"));
    assert!(result.contains("; Cura_SteamEngine X.X"));
    assert!(result.contains(";gimage:AA"));
    assert!(result.contains(";simage:BB"));
    // The original header line appears exactly once, masked.
    assert!(!result.contains("PrusaSlicer"));
}

#[test]
fn test_splice_keeps_original_thumbnail_by_default() {
    let result = run_splice(None);
    assert!(result.contains("; thumbnail begin 200x200 24"));
    assert!(result.contains("; d29ybGQ="));
    assert!(result.contains("; thumbnail end"));
}

#[test]
fn test_splice_replaces_thumbnail_block() {
    let block = "; thumbnail begin 200x200 8\n; bmV3\n; thumbnail end\n";
    let result = run_splice(Some(block));

    assert!(result.contains("; bmV3"));
    assert!(!result.contains("; d29ybGQ="));
    // The replacement sits where the old block began, before the metadata.
    assert!(result.find("; bmV3").unwrap() < result.find("estimated printing time").unwrap());
}

#[test]
fn test_splice_rewrites_time_progress() {
    let result = run_splice(None);

    let time_pos = result.find(";TIME:3000\nM73 P10 R50").unwrap();
    let elapsed_pos = result.find(";TIME_ELAPSED:600\n;LAYER_CHANGE").unwrap();
    assert!(time_pos < elapsed_pos);
    // The elapsed comment is not attached to the M73 line itself.
    assert!(!result.contains(";TIME_ELAPSED:600\nM73"));
}

#[test]
fn test_body_lines_pass_through_unchanged() {
    let result = run_splice(None);
    assert!(result.contains("G1 X1 Y1 E0.5\n"));
    assert!(result.contains("G1 X2 Y2 E1.0\n"));
    assert!(result.contains(";Z:0.4\n"));
}

#[test]
fn test_scan_failure_leaves_original_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("part.gcode");
    fs::write(&path, INPUT).unwrap();

    let err = GcodeScanner::new(Some("300x300".to_string())).scan_file(&path);
    assert!(err.is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), INPUT);
    assert!(!output_path_for(&path).exists());
}
