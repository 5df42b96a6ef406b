//! File-level comparison contract: the RMS metric against the tolerance,
//! the diff artifact, and the failure modes that are errors rather than
//! mismatches.

use image::{Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

use plotcheck::image_compare::compare_files;

fn write_solid(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 4]) -> PathBuf {
  let path = dir.join(name);
  RgbaImage::from_pixel(width, height, Rgba(color))
    .save(&path)
    .expect("write png");
  path
}

#[test]
fn identical_images_produce_an_empty_payload() {
  let tmp = tempfile::tempdir().expect("tempdir");
  let expected = write_solid(tmp.path(), "expected.png", 20, 20, [120, 40, 200, 255]);
  let actual = write_solid(tmp.path(), "actual.png", 20, 20, [120, 40, 200, 255]);

  let mismatch = compare_files(&expected, &actual, 0.0).expect("compare");
  assert!(mismatch.is_none());
}

#[test]
fn tolerance_bounds_the_rms_metric() {
  let tmp = tempfile::tempdir().expect("tempdir");
  // RGB offset by 10: rms = sqrt(3 * 100 / 4) ~= 8.66.
  let expected = write_solid(tmp.path(), "shade-expected.png", 10, 10, [100, 100, 100, 255]);
  let actual = write_solid(tmp.path(), "shade.png", 10, 10, [110, 110, 110, 255]);

  let within = compare_files(&expected, &actual, 17.0).expect("compare within");
  assert!(within.is_none());

  let beyond = compare_files(&expected, &actual, 5.0)
    .expect("compare beyond")
    .expect("payload");
  assert!((beyond.rms - 75.0f64.sqrt()).abs() < 1e-9);
  assert_eq!(beyond.tolerance, 5.0);
  assert_eq!(beyond.statistics.max_red_diff, 10);
  assert_eq!(beyond.statistics.differing_pixels, 100);
  assert_eq!(beyond.actual, actual);
  assert_eq!(beyond.expected, expected);
}

#[test]
fn mismatch_writes_the_failed_diff_artifact() {
  let tmp = tempfile::tempdir().expect("tempdir");
  let expected = write_solid(tmp.path(), "box-expected.png", 8, 8, [0, 0, 0, 255]);
  let actual = write_solid(tmp.path(), "box.png", 8, 8, [255, 255, 255, 255]);

  let mismatch = compare_files(&expected, &actual, 17.0)
    .expect("compare")
    .expect("payload");

  let diff = mismatch.diff.expect("diff path");
  assert_eq!(diff, tmp.path().join("box-failed-diff.png"));
  assert!(diff.exists());

  let diff_img = image::open(&diff).expect("decode diff").to_rgba8();
  assert_eq!(diff_img.dimensions(), (8, 8));
  // Fully saturated difference, amplified and clamped.
  assert_eq!(diff_img.get_pixel(0, 0).0, [255, 255, 255, 255]);
}

#[test]
fn size_mismatch_is_an_error_not_a_payload() {
  let tmp = tempfile::tempdir().expect("tempdir");
  let expected = write_solid(tmp.path(), "expected.png", 10, 10, [0, 0, 0, 255]);
  let actual = write_solid(tmp.path(), "actual.png", 10, 12, [0, 0, 0, 255]);

  let err = compare_files(&expected, &actual, 1000.0).unwrap_err();
  let msg = err.to_string();
  assert!(msg.contains("sizes do not match"));
  assert!(msg.contains("10x12"));
  assert!(msg.contains("10x10"));
}

#[test]
fn undecodable_input_is_an_error() {
  let tmp = tempfile::tempdir().expect("tempdir");
  let expected = write_solid(tmp.path(), "expected.png", 4, 4, [0, 0, 0, 255]);
  let garbage = tmp.path().join("actual.png");
  fs::write(&garbage, b"not a png").expect("write garbage");

  let err = compare_files(&expected, &garbage, 17.0).unwrap_err();
  assert!(err.to_string().contains("failed to decode"));
}
