//! Error types for plotcheck
//!
//! This module provides typed errors for every subsystem of the harness:
//! - Fixture errors (missing baseline images or baseline trees)
//! - Backend errors (the active backend is not the deterministic one)
//! - Figure-state errors (figures leaked across tests)
//! - Render errors (surface creation, encoding)
//! - Comparison errors (decode failures, dimension mismatches)
//!
//! An image *mismatch* is deliberately not an error: it is a diagnostic
//! payload carried by the check outcome (see [`crate::image_compare`]).
//!
//! All errors use the `thiserror` crate for minimal boilerplate and proper
//! error trait implementations.

use crate::backend::Backend;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for plotcheck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for plotcheck.
///
/// Each variant wraps a more specific error type for that subsystem.
#[derive(Error, Debug)]
pub enum Error {
  /// Missing baseline image or baseline tree
  #[error("Fixture error: {0}")]
  Fixture(#[from] FixtureError),

  /// The rendering backend is misconfigured
  #[error("Backend error: {0}")]
  Backend(#[from] BackendError),

  /// Figure state leaked across tests
  #[error("Figure state error: {0}")]
  State(#[from] StateError),

  /// Surface creation or image encoding error
  #[error("Render error: {0}")]
  Render(#[from] RenderError),

  /// Image comparison could not run
  #[error("Comparison error: {0}")]
  Compare(#[from] CompareError),

  /// Diagnostic report serialization error
  #[error("Report error: {0}")]
  Report(#[from] serde_json::Error),

  /// I/O error (directory creation, file copy, etc.)
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors caused by missing test fixtures.
///
/// These indicate an incomplete checkout or a brand-new test whose baseline
/// has not been blessed yet. They are distinct from an image mismatch: a
/// missing fixture means the comparison never ran.
#[derive(Error, Debug, Clone)]
pub enum FixtureError {
  /// The baseline image for a comparison does not exist on disk.
  #[error("Baseline image {} is missing", .path.display())]
  MissingBaseline { path: PathBuf },

  /// The whole `baseline_images` directory is absent.
  #[error(
    "the baseline image directory {} does not exist; the test data is not installed",
    .dir.display()
  )]
  BaselineTreeMissing { dir: PathBuf },
}

/// Errors caused by a misconfigured rendering backend.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
  /// After forcing the deterministic raster backend, something else is
  /// still active. Comparison images produced in this state are invalid.
  #[error("using a wrong rendering backend ({active}), which will not produce proper images")]
  WrongBackend { active: Backend },
}

/// Errors caused by render state leaking across tests.
#[derive(Error, Debug, Clone)]
pub enum StateError {
  /// Figures were still open when setup ran. The test that created them is
  /// missing a cleanup guard.
  #[error(
    "figures {ids:?} left open by a previous test; add a cleanup guard to the test that created them"
  )]
  LeakedFigures { ids: Vec<u32> },
}

/// Errors during figure rendering or output.
#[derive(Error, Debug, Clone)]
pub enum RenderError {
  /// The raster surface could not be allocated.
  #[error("failed to create a {width}x{height} render surface")]
  SurfaceCreation { width: u32, height: u32 },

  /// Encoding the figure to an image file failed.
  #[error("failed to encode figure to {format}: {reason}")]
  EncodeFailed { format: String, reason: String },
}

/// Errors that prevent an image comparison from running at all.
#[derive(Error, Debug, Clone)]
pub enum CompareError {
  /// One of the two images could not be decoded.
  #[error("failed to decode image {}: {reason}", .path.display())]
  DecodeFailed { path: PathBuf, reason: String },

  /// The images have different dimensions, so a pixel-wise metric is
  /// meaningless.
  #[error(
    "image sizes do not match: actual {}x{}, expected {}x{}",
    .actual.0, .actual.1, .expected.0, .expected.1
  )]
  SizeMismatch {
    actual: (u32, u32),
    expected: (u32, u32),
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_baseline_message_names_the_path() {
    let err = FixtureError::MissingBaseline {
      path: PathBuf::from("baseline_images/test_plots/scatter.png"),
    };
    let msg = err.to_string();
    assert!(msg.contains("Baseline image"));
    assert!(msg.contains("scatter.png"));
    assert!(msg.contains("is missing"));
  }

  #[test]
  fn wrong_backend_message_names_the_backend() {
    let err = BackendError::WrongBackend {
      active: Backend::Pdf,
    };
    assert!(err.to_string().contains("pdf"));
  }

  #[test]
  fn leaked_figures_message_names_the_ids() {
    let err = StateError::LeakedFigures { ids: vec![3, 7] };
    let msg = err.to_string();
    assert!(msg.contains('3'));
    assert!(msg.contains('7'));
  }
}
