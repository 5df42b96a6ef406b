//! Filename derivation for comparison tests
//!
//! One comparison identifier maps to three paths:
//!
//! ```text
//! <test-dir>/baseline_images/<subdir>/<name>   read-only fixture
//! result_images/<subdir>/<name>                freshly rendered image
//! result_images/<subdir>/<base>-expected<ext>  copy of the baseline
//! ```
//!
//! `<subdir>` is the invoking test file's base name with its extension
//! stripped, so every test module keeps its images together. The result
//! directory lives under the process working directory and is created on
//! first use; the expected-copy sits next to the result so a failure can be
//! inspected side by side.

use crate::error::{FixtureError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// The three paths derived for one comparison identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFilenames {
  /// The accepted-reference image the result is compared against.
  pub baseline: PathBuf,
  /// The image rendered by the current test run.
  pub result: PathBuf,
  /// Copy of the baseline placed alongside the result.
  pub expected: PathBuf,
}

/// Appends `.png` unless the name already ends with it.
fn ensure_png_suffix(name: &str) -> String {
  if name.ends_with(".png") {
    name.to_string()
  } else {
    format!("{name}.png")
  }
}

/// Splits a filename at its last dot. Embedded dots stay in the base.
fn split_extension(name: &str) -> (&str, &str) {
  match name.rsplit_once('.') {
    Some((base, ext)) => (base, ext),
    None => (name, ""),
  }
}

fn test_subdir(test_file: &Path) -> String {
  test_file
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_else(|| "unknown".to_string())
}

/// Derives the filename bundle for a comparison identifier.
///
/// `name` may omit the `.png` extension; `test_file` is the path of the
/// invoking test source file (typically `file!()`). Creates the result
/// directory if absent; creation is idempotent. The only error path is a
/// directory-creation failure.
pub fn test_image_filenames(name: &str, test_file: &Path) -> Result<ImageFilenames> {
  let name = ensure_png_suffix(name);
  let subdir = test_subdir(test_file);
  let test_dir = test_file.parent().unwrap_or_else(|| Path::new("."));

  let baseline = test_dir.join("baseline_images").join(&subdir).join(&name);

  let result_dir = Path::new("result_images").join(&subdir);
  fs::create_dir_all(&result_dir)?;

  let (base, ext) = split_extension(&name);
  let expected = result_dir.join(format!("{base}-expected.{ext}"));
  let result = result_dir.join(&name);

  Ok(ImageFilenames {
    baseline,
    result,
    expected,
  })
}

/// Verifies that the baseline tree for a test file exists at all.
///
/// A missing `baseline_images` directory means the test data is not
/// installed; failing here gives a clearer message than a per-image
/// missing-baseline error for every single test.
pub fn ensure_baseline_tree(test_file: &Path) -> Result<PathBuf> {
  let dir = test_file
    .parent()
    .unwrap_or_else(|| Path::new("."))
    .join("baseline_images");
  if dir.is_dir() {
    Ok(dir)
  } else {
    Err(FixtureError::BaselineTreeMissing { dir }.into())
  }
}
