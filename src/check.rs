//! The comparison check itself
//!
//! [`check_plot`] is the explicit replacement for an equality-operator
//! hook: tests call it (usually through [`assert_plot_eq!`]) with a plot
//! and an expectation, and get back an outcome whose diagnostic payload is
//! empty exactly when the images matched.
//!
//! The result image is saved *before* the baseline lookup on purpose:
//! writing a new test first produces its result image, which can then be
//! copied into `baseline_images/` to bless it.

use crate::error::{FixtureError, Result};
use crate::filenames::{test_image_filenames, ImageFilenames};
use crate::image_compare::{self, Mismatch};
use crate::plot::Plot;
use std::fs;
use std::path::Path;

/// Default RMS tolerance for image comparisons.
pub const TOLERANCE: f64 = 17.0;

/// What a plot is expected to look like: a comparison identifier plus the
/// tolerance to compare under.
///
/// Converts from a bare identifier (default tolerance) or an
/// `(identifier, tolerance)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
  pub name: String,
  pub tolerance: f64,
}

impl From<&str> for Expectation {
  fn from(name: &str) -> Self {
    Self {
      name: name.to_string(),
      tolerance: TOLERANCE,
    }
  }
}

impl From<String> for Expectation {
  fn from(name: String) -> Self {
    Self {
      name,
      tolerance: TOLERANCE,
    }
  }
}

impl From<(&str, f64)> for Expectation {
  fn from((name, tolerance): (&str, f64)) -> Self {
    Self {
      name: name.to_string(),
      tolerance,
    }
  }
}

impl From<(String, f64)> for Expectation {
  fn from((name, tolerance): (String, f64)) -> Self {
    Self { name, tolerance }
  }
}

/// Outcome of one comparison check.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
  /// The paths the check worked with.
  pub filenames: ImageFilenames,
  /// Diagnostic payload; empty on a match.
  pub mismatch: Option<Mismatch>,
}

impl CheckOutcome {
  /// True iff the diagnostic payload is empty.
  pub fn is_match(&self) -> bool {
    self.mismatch.is_none()
  }

  /// Formatted failure message with the RMS metric, `None` on a match.
  pub fn failure_message(&self) -> Option<String> {
    self.mismatch.as_ref().map(|m| m.to_string())
  }
}

/// Renders a plot and compares it against its baseline image.
///
/// `test_file` is the path of the invoking test source file; it determines
/// the baseline and result directories (see [`crate::filenames`]). The
/// baseline must pre-exist: its absence is a fatal missing-fixture error,
/// not a comparison failure. The baseline is copied next to the result
/// (`-expected`) for side-by-side inspection before the comparison runs.
pub fn check_plot<P: Plot + ?Sized>(
  plot: &P,
  expected: impl Into<Expectation>,
  test_file: impl AsRef<Path>,
) -> Result<CheckOutcome> {
  let Expectation { name, tolerance } = expected.into();
  let filenames = test_image_filenames(&name, test_file.as_ref())?;

  let fig = plot.draw()?;
  // Save before the baseline check so a new test's output exists and can
  // be blessed into a baseline by copying.
  fig.save_png(&filenames.result)?;

  if !filenames.baseline.exists() {
    return Err(
      FixtureError::MissingBaseline {
        path: filenames.baseline.clone(),
      }
      .into(),
    );
  }
  fs::copy(&filenames.baseline, &filenames.expected)?;

  let mismatch = image_compare::compare_files(&filenames.expected, &filenames.result, tolerance)?;

  Ok(CheckOutcome {
    filenames,
    mismatch,
  })
}

/// Asserts that a plot matches its baseline image.
///
/// Supplies the invoking file path via `file!()` and panics with the
/// formatted mismatch message on failure:
///
/// ```rust,ignore
/// let plot = ScatterPlot::new(&data);
/// assert_plot_eq!(plot, "scatter");
/// assert_plot_eq!(plot, ("scatter", 5.0));
/// ```
#[macro_export]
macro_rules! assert_plot_eq {
  ($plot:expr, $expected:expr $(,)?) => {{
    let outcome = match $crate::check::check_plot(&$plot, $expected, file!()) {
      Ok(outcome) => outcome,
      Err(e) => panic!("plot comparison could not run: {e}"),
    };
    if let Some(message) = outcome.failure_message() {
      panic!("{message}");
    }
  }};
}
