//! Pixel comparison of a result image against an expected image
//!
//! The metric is the root-mean-square difference over all channels of all
//! pixels, on the 0-255 scale; a comparison passes when the RMS does not
//! exceed the tolerance. Success is an empty payload; a mismatch produces a
//! [`Mismatch`] carrying the metric, the paths involved and per-channel
//! statistics, plus an amplified-difference image written next to the
//! result for visual inspection.

use crate::error::{CompareError, RenderError, Result};
use crate::warnings::{self, WarningKind};
use image::RgbaImage;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Per-channel and aggregate statistics for one comparison.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffStatistics {
  /// Total number of pixels compared.
  pub total_pixels: u64,
  /// Number of pixels differing in at least one channel.
  pub differing_pixels: u64,
  /// Maximum difference in red channel.
  pub max_red_diff: u8,
  /// Maximum difference in green channel.
  pub max_green_diff: u8,
  /// Maximum difference in blue channel.
  pub max_blue_diff: u8,
  /// Maximum difference in alpha channel.
  pub max_alpha_diff: u8,
  /// Root-mean-square difference over all channels (0-255 scale).
  pub rms: f64,
}

/// Diagnostic payload for a failed comparison.
///
/// Read by the failure-message formatter ([`std::fmt::Display`]) and
/// serializable for report tooling. An empty payload (`None` at the call
/// site) means the images matched.
#[derive(Debug, Clone, Serialize)]
pub struct Mismatch {
  /// The RMS metric that exceeded the tolerance.
  pub rms: f64,
  /// The tolerance the comparison ran with.
  pub tolerance: f64,
  /// The freshly rendered image.
  pub actual: PathBuf,
  /// The expected-copy the result was compared against.
  pub expected: PathBuf,
  /// The amplified-difference image, when it could be written.
  pub diff: Option<PathBuf>,
  pub statistics: DiffStatistics,
}

impl Mismatch {
  /// Serializes the payload for report tooling.
  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }
}

impl std::fmt::Display for Mismatch {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "images not close: {} vs. {} (RMS {:.2})",
      self.actual.display(),
      self.expected.display(),
      self.rms
    )
  }
}

/// Decodes a PNG file into an RGBA buffer.
pub fn load_png(path: &Path) -> Result<RgbaImage> {
  let img = image::open(path).map_err(|e| CompareError::DecodeFailed {
    path: path.to_path_buf(),
    reason: e.to_string(),
  })?;
  Ok(img.to_rgba8())
}

/// Computes comparison statistics for two equally-sized RGBA buffers.
pub fn diff_statistics(
  expected: &RgbaImage,
  actual: &RgbaImage,
) -> std::result::Result<DiffStatistics, CompareError> {
  if expected.dimensions() != actual.dimensions() {
    return Err(CompareError::SizeMismatch {
      actual: actual.dimensions(),
      expected: expected.dimensions(),
    });
  }

  let total_pixels = (expected.width() as u64) * (expected.height() as u64);
  let mut differing_pixels = 0u64;
  let mut max_diff = [0u8; 4];
  let mut sum_squared = 0.0f64;

  for (expected_px, actual_px) in expected.pixels().zip(actual.pixels()) {
    let mut any_differ = false;
    for channel in 0..4 {
      let diff =
        (expected_px[channel] as i16 - actual_px[channel] as i16).unsigned_abs() as u8;
      if diff > 0 {
        any_differ = true;
      }
      max_diff[channel] = max_diff[channel].max(diff);
      sum_squared += (diff as f64) * (diff as f64);
    }
    if any_differ {
      differing_pixels += 1;
    }
  }

  let samples = total_pixels as f64 * 4.0;
  let rms = if total_pixels > 0 {
    (sum_squared / samples).sqrt()
  } else {
    0.0
  };

  Ok(DiffStatistics {
    total_pixels,
    differing_pixels,
    max_red_diff: max_diff[0],
    max_green_diff: max_diff[1],
    max_blue_diff: max_diff[2],
    max_alpha_diff: max_diff[3],
    rms,
  })
}

/// Path of the visual diff artifact for a result image:
/// `<base>-failed-diff<ext>` next to the result.
fn failed_diff_path(result: &Path) -> PathBuf {
  let stem = result
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "result".to_string());
  let ext = result
    .extension()
    .map(|e| e.to_string_lossy().into_owned())
    .unwrap_or_else(|| "png".to_string());
  result.with_file_name(format!("{stem}-failed-diff.{ext}"))
}

/// Writes the amplified absolute difference of two buffers.
fn write_diff_image(expected: &RgbaImage, actual: &RgbaImage, path: &Path) -> Result<()> {
  let (width, height) = expected.dimensions();
  let mut diff = RgbaImage::new(width, height);
  for (x, y, pixel) in diff.enumerate_pixels_mut() {
    let e = expected.get_pixel(x, y);
    let a = actual.get_pixel(x, y);
    let amplified = |channel: usize| -> u8 {
      let d = (e[channel] as i16 - a[channel] as i16).unsigned_abs();
      (d.saturating_mul(10)).min(255) as u8
    };
    pixel.0 = [amplified(0), amplified(1), amplified(2), 255];
  }
  diff.save(path).map_err(|e| RenderError::EncodeFailed {
    format: "PNG".to_string(),
    reason: e.to_string(),
  })?;
  Ok(())
}

/// Compares the result image at `actual` against the image at `expected`
/// under an RMS tolerance.
///
/// Returns `Ok(None)` on a match. On a mismatch, writes the visual diff
/// artifact (best effort) and returns the diagnostic payload. Decode
/// failures and dimension mismatches are errors: the comparison never ran.
pub fn compare_files(expected: &Path, actual: &Path, tolerance: f64) -> Result<Option<Mismatch>> {
  let expected_img = load_png(expected)?;
  let actual_img = load_png(actual)?;
  let statistics = diff_statistics(&expected_img, &actual_img)?;

  if statistics.rms <= tolerance {
    return Ok(None);
  }

  let diff_path = failed_diff_path(actual);
  let diff = match write_diff_image(&expected_img, &actual_img, &diff_path) {
    Ok(()) => Some(diff_path),
    Err(e) => {
      warnings::warn(
        WarningKind::Comparison,
        format!("could not write diff image {}: {e}", diff_path.display()),
      );
      None
    }
  };

  Ok(Some(Mismatch {
    rms: statistics.rms,
    tolerance,
    actual: actual.to_path_buf(),
    expected: expected.to_path_buf(),
    diff,
    statistics,
  }))
}
