//! Environment normalization and per-test cleanup
//!
//! Comparison tests only mean something when every render happens in the
//! same environment. [`setup`] forces that environment:
//!
//! 1. process locale pinned to English/US (warning when unavailable),
//! 2. the deterministic offscreen raster backend, verified after the
//!    switch; a different active backend invalidates the whole run,
//! 3. render parameters reset to defaults with the text hinting and
//!    antialiasing flags pinned,
//! 4. all backend font caches cleared so hinting state cannot travel
//!    between tests,
//! 5. no figures left open by a previous test; a leak aborts loudly,
//!    naming the leaked ids.
//!
//! Setup returns a [`CleanupGuard`]; its drop closes every figure and
//! resets warning filters, and runs even when the test body panics. The
//! [`cleanup`] wrapper composes the guard around a test closure.

use crate::backend::{self, Backend};
use crate::error::{BackendError, Result, StateError};
use crate::figure;
use crate::params;
use crate::warnings::{self, WarningKind};
use std::ffi::CString;

/// Locale spellings tried in order. The baseline images were produced
/// under an English/US locale; date-formatted labels drift under others.
const LOCALE_CANDIDATES: [&str; 2] = ["en_US.UTF-8", "English_United States.1252"];

fn set_process_locale(name: &str) -> bool {
  let Ok(c_name) = CString::new(name) else {
    return false;
  };
  // SAFETY: setlocale only reads the string during the call; the returned
  // pointer is checked for null and never dereferenced.
  let ret = unsafe { libc::setlocale(libc::LC_ALL, c_name.as_ptr()) };
  !ret.is_null()
}

pub(crate) fn normalize_locale() {
  if !LOCALE_CANDIDATES.iter().any(|name| set_process_locale(name)) {
    warnings::warn(
      WarningKind::Locale,
      "could not set locale to English/United States; date-formatted labels may differ from the baselines",
    );
  }
}

/// Guard returned by [`setup`]. Dropping it runs teardown: every open
/// figure is closed and warning filters installed by the test are reset.
#[must_use = "teardown runs when the guard drops; binding it to _ tears down immediately"]
#[derive(Debug)]
pub struct CleanupGuard {
  _private: (),
}

impl Drop for CleanupGuard {
  fn drop(&mut self) {
    teardown();
  }
}

fn teardown() {
  figure::close_all_figures();
  warnings::reset_filters();
}

/// Normalizes the rendering environment for one comparison test.
///
/// Locale failures are downgraded to a warning; a wrong active backend and
/// leaked figures are fatal. See the module docs for the exact sequence.
pub fn setup() -> Result<CleanupGuard> {
  normalize_locale();

  backend::switch_backend(Backend::Raster);
  let active = backend::active_backend();
  if active != Backend::Raster {
    return Err(BackendError::WrongBackend { active }.into());
  }

  // These flags must be pinned for comparisons; defaults alone are not
  // enough because a previous test may have changed them.
  params::rc_defaults();
  params::update(|p| {
    p.text_hinting = true;
    p.text_antialiased = true;
  });

  backend::clear_font_caches();

  let open = figure::open_figure_ids();
  if !open.is_empty() {
    return Err(StateError::LeakedFigures { ids: open }.into());
  }

  Ok(CleanupGuard { _private: () })
}

/// Runs a test closure between setup and teardown.
///
/// Setup failures are fatal configuration or programmer errors, so this
/// panics with their message instead of returning them. Teardown runs even
/// when the closure panics.
pub fn cleanup<F: FnOnce()>(testfn: F) {
  let guard = match setup() {
    Ok(guard) => guard,
    Err(e) => panic!("harness setup failed: {e}"),
  };
  testfn();
  drop(guard);
}
