//! Harness warning channel
//!
//! Non-fatal conditions (an unavailable locale, a diff image that could not
//! be written) are reported here instead of failing the test. Warnings go to
//! stderr unless a filter suppresses them.
//!
//! Tests may install filters; [`reset_filters`] is called by harness
//! teardown so filter state never leaks from one test into the next. A
//! capture mode exists so the crate's own tests can observe emitted
//! warnings without scraping stderr.

use std::sync::{Mutex, OnceLock};

/// Category of a harness warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
  /// The requested locale could not be set.
  Locale,
  /// A comparison side artifact (e.g. the diff image) could not be produced.
  Comparison,
  /// Anything else.
  Other,
}

/// A single emitted warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
  pub kind: WarningKind,
  pub message: String,
}

/// Suppression rule. A warning is suppressed when every populated field
/// matches it.
#[derive(Debug, Clone, Default)]
pub struct WarningFilter {
  /// Suppress only this kind; `None` matches any kind.
  pub kind: Option<WarningKind>,
  /// Suppress only messages containing this substring; `None` matches any.
  pub contains: Option<String>,
}

impl WarningFilter {
  fn matches(&self, warning: &Warning) -> bool {
    if let Some(kind) = self.kind {
      if kind != warning.kind {
        return false;
      }
    }
    if let Some(ref needle) = self.contains {
      if !warning.message.contains(needle.as_str()) {
        return false;
      }
    }
    true
  }
}

struct WarningState {
  filters: Vec<WarningFilter>,
  capture: Option<Vec<Warning>>,
}

fn state() -> &'static Mutex<WarningState> {
  static STATE: OnceLock<Mutex<WarningState>> = OnceLock::new();
  STATE.get_or_init(|| {
    Mutex::new(WarningState {
      filters: Vec::new(),
      capture: None,
    })
  })
}

fn lock() -> std::sync::MutexGuard<'static, WarningState> {
  state().lock().unwrap_or_else(|e| e.into_inner())
}

/// Emits a warning unless a filter suppresses it.
pub fn warn(kind: WarningKind, message: impl Into<String>) {
  let warning = Warning {
    kind,
    message: message.into(),
  };
  let mut state = lock();
  if state.filters.iter().any(|f| f.matches(&warning)) {
    return;
  }
  match state.capture {
    Some(ref mut captured) => captured.push(warning),
    None => eprintln!("warning: {}", warning.message),
  }
}

/// Installs a suppression filter for the current test.
pub fn push_filter(filter: WarningFilter) {
  lock().filters.push(filter);
}

/// Removes all installed filters. Harness teardown calls this so warning
/// behavior does not leak across tests.
pub fn reset_filters() {
  lock().filters.clear();
}

/// Number of currently installed filters.
pub fn filter_count() -> usize {
  lock().filters.len()
}

/// Starts capturing warnings instead of printing them.
pub fn begin_capture() {
  lock().capture = Some(Vec::new());
}

/// Stops capturing and returns everything captured since [`begin_capture`].
pub fn take_captured() -> Vec<Warning> {
  lock().capture.take().unwrap_or_default()
}
