//! Process-wide render parameters
//!
//! Comparison tests only produce stable pixels when every render uses the
//! same configuration, so the parameters live in one process-wide slot that
//! harness setup resets to defaults before each test. The two text flags
//! (`text_hinting`, `text_antialiased`) are the determinism knobs: they
//! change glyph geometry and edge coverage, and setup pins them after the
//! reset.

use std::sync::{OnceLock, RwLock};

/// Render configuration consumed by [`crate::figure::Figure`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
  /// Default figure width in pixels.
  pub figure_width: u32,
  /// Default figure height in pixels.
  pub figure_height: u32,
  /// Default figure background color, straight RGBA.
  pub background: [u8; 4],
  /// Snap glyph geometry to the pixel grid.
  pub text_hinting: bool,
  /// Antialias glyph edges.
  pub text_antialiased: bool,
  /// Default stroke width for plot lines.
  pub line_width: f32,
}

impl Default for RenderParams {
  fn default() -> Self {
    Self {
      figure_width: 640,
      figure_height: 480,
      background: [255, 255, 255, 255],
      text_hinting: true,
      text_antialiased: true,
      line_width: 1.5,
    }
  }
}

fn slot() -> &'static RwLock<RenderParams> {
  static PARAMS: OnceLock<RwLock<RenderParams>> = OnceLock::new();
  PARAMS.get_or_init(|| RwLock::new(RenderParams::default()))
}

/// Returns a snapshot of the current render parameters.
pub fn get() -> RenderParams {
  slot().read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Applies an in-place update to the render parameters.
pub fn update(f: impl FnOnce(&mut RenderParams)) {
  let mut params = slot().write().unwrap_or_else(|e| e.into_inner());
  f(&mut params);
}

/// Restores every render parameter to its default value.
pub fn rc_defaults() {
  let mut params = slot().write().unwrap_or_else(|e| e.into_inner());
  *params = RenderParams::default();
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn update_then_rc_defaults_round_trips() {
    let _guard = crate::test_guard();
    rc_defaults();
    update(|p| {
      p.text_hinting = false;
      p.figure_width = 100;
    });
    let changed = get();
    assert!(!changed.text_hinting);
    assert_eq!(changed.figure_width, 100);

    rc_defaults();
    assert_eq!(get(), RenderParams::default());
  }

  #[test]
  fn defaults_pin_the_text_determinism_flags() {
    let defaults = RenderParams::default();
    assert!(defaults.text_hinting);
    assert!(defaults.text_antialiased);
  }
}
