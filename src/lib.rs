//! plotcheck: image-comparison test harness for plot rendering
//!
//! Renders a plot object to an image file and compares it pixel-wise
//! against a stored baseline image under an RMS tolerance. The pieces:
//!
//! - [`filenames`]: baseline / result / expected-copy path derivation
//! - [`harness`]: deterministic-environment setup and RAII cleanup
//! - [`check`]: the comparison check and the [`assert_plot_eq!`] macro
//! - [`image_compare`]: the RMS metric and its diagnostic payload
//! - [`backend`], [`figure`], [`params`], [`warnings`]: the process-wide
//!   render state the harness normalizes between tests

pub mod backend;
pub mod check;
pub mod error;
pub mod figure;
pub mod filenames;
pub mod harness;
pub mod image_compare;
pub mod params;
pub mod plot;
pub mod warnings;

pub use backend::Backend;
pub use check::{check_plot, CheckOutcome, Expectation, TOLERANCE};
pub use error::{Error, Result};
pub use figure::Figure;
pub use filenames::{test_image_filenames, ImageFilenames};
pub use harness::{cleanup, setup, CleanupGuard};
pub use image_compare::Mismatch;
pub use plot::Plot;

/// Serializes unit tests that touch the process-wide harness state.
#[cfg(test)]
pub(crate) fn test_guard() -> std::sync::MutexGuard<'static, ()> {
  static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
  LOCK.lock().unwrap_or_else(|e| e.into_inner())
}
